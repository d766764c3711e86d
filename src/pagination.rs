//! Pagination utilities for TFE API responses.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default page size for list operations.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum pages to fetch when walking a collection (safety limit).
const MAX_PAGES: u32 = 1000;

/// Full pagination block from `meta.pagination`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "current-page", default)]
    pub current_page: u32,
    #[serde(rename = "prev-page", default)]
    pub previous_page: Option<u32>,
    #[serde(rename = "next-page", default)]
    pub next_page: Option<u32>,
    #[serde(rename = "total-pages", default)]
    pub total_pages: u32,
    #[serde(rename = "total-count", default)]
    pub total_count: u64,
}

/// Reduced pagination block for endpoints that don't report totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationNextPrev {
    #[serde(rename = "current-page", default)]
    pub current_page: u32,
    #[serde(rename = "prev-page", default)]
    pub previous_page: Option<u32>,
    #[serde(rename = "next-page", default)]
    pub next_page: Option<u32>,
}

/// Common view over both pagination blocks.
pub trait PageInfo {
    fn current_page(&self) -> u32;
    fn next_page(&self) -> Option<u32>;
}

impl PageInfo for Pagination {
    fn current_page(&self) -> u32 {
        self.current_page
    }

    fn next_page(&self) -> Option<u32> {
        self.next_page
    }
}

impl PageInfo for PaginationNextPrev {
    fn current_page(&self) -> u32 {
        self.current_page
    }

    fn next_page(&self) -> Option<u32> {
        self.next_page
    }
}

/// A page of results from the TFE API.
///
/// Items keep the order the server returned them in.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize, P: Serialize")]
pub struct Page<T, P = Pagination> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Pagination metadata (zero-valued when the response carried none).
    pub pagination: P,
}

impl<T, P> Page<T, P> {
    /// Create a new page from items and pagination info.
    #[must_use]
    pub fn new(items: Vec<T>, pagination: P) -> Self {
        Self { items, pagination }
    }

    /// Map the items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U, P> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    /// Returns true if this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns an iterator over the items in this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T, P: PageInfo> Page<T, P> {
    /// Whether the server reported another page after this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pagination.next_page().is_some()
    }
}

impl<T, P> IntoIterator for Page<T, P> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T, P> IntoIterator for &'a Page<T, P> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Query parameters for paginated requests.
///
/// Flattened into every list options struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    /// Page number (1-indexed).
    #[serde(rename = "page[number]", skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Number of items per page.
    #[serde(rename = "page[size]", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl ListOptions {
    /// Create pagination params for a specific page.
    #[must_use]
    pub fn for_page(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number: Some(page_number),
            page_size: Some(page_size),
        }
    }
}

/// Options types that carry a [`ListOptions`] block.
pub trait Paginated {
    fn list_options_mut(&mut self) -> &mut ListOptions;
}

impl Paginated for ListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        self
    }
}

/// Fetch every page of a collection, starting from page 1.
///
/// `fetch` is called with a copy of `options` pointing at each page in turn
/// until the server reports no next page.
///
/// # Example
///
/// ```ignore
/// let all = collect_all(WorkspaceListOptions::default(), |opts| async move {
///     client.workspaces().list("my-org", &opts).await
/// })
/// .await?;
/// ```
pub async fn collect_all<T, P, O, F, Fut>(mut options: O, mut fetch: F) -> Result<Vec<T>>
where
    P: PageInfo,
    O: Paginated + Clone,
    F: FnMut(O) -> Fut,
    Fut: Future<Output = Result<Page<T, P>>>,
{
    let mut all_items = Vec::new();
    let mut page = 1;

    loop {
        let list = options.list_options_mut();
        list.page_number = Some(page);
        if list.page_size.is_none() {
            list.page_size = Some(MAX_PAGE_SIZE);
        }

        let result = fetch(options.clone()).await?;
        let next = result.pagination.next_page();
        all_items.extend(result.items);

        match next {
            Some(n) if n > page => page = n,
            _ => break,
        }

        // Safety limit to prevent infinite loops
        if page > MAX_PAGES {
            tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
            break;
        }
    }

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(current: u32, next: Option<u32>) -> Pagination {
        Pagination {
            current_page: current,
            previous_page: current.checked_sub(1).filter(|p| *p > 0),
            next_page: next,
            total_pages: 3,
            total_count: 5,
        }
    }

    #[test]
    fn test_page_has_more() {
        let page: Page<i32> = Page::new(vec![1, 2], pagination(1, Some(2)));
        assert!(page.has_more());

        let page: Page<i32> = Page::new(vec![5], pagination(3, None));
        assert!(!page.has_more());
    }

    #[test]
    fn test_page_map() {
        let page: Page<i32> = Page::new(vec![1, 2, 3], pagination(1, None));
        let mapped = page.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.pagination.current_page, 1);
    }

    #[test]
    fn test_list_options_serialize_bracketed_keys() {
        let opts = ListOptions::for_page(2, 50);
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value, serde_json::json!({ "page[number]": 2, "page[size]": 50 }));
    }

    #[tokio::test]
    async fn test_collect_all_walks_next_pages() {
        let pages = vec![
            Page::new(vec![1, 2], pagination(1, Some(2))),
            Page::new(vec![3, 4], pagination(2, Some(3))),
            Page::new(vec![5], pagination(3, None)),
        ];

        let mut requested = Vec::new();
        let all = collect_all(ListOptions::default(), |opts: ListOptions| {
            let n = opts.page_number.unwrap_or(1);
            requested.push((n, opts.page_size));
            let page = pages[(n - 1) as usize].clone();
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            requested,
            vec![(1, Some(100)), (2, Some(100)), (3, Some(100))]
        );
    }
}
