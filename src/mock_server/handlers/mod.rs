//! HTTP request handlers for the mock server.
//!
//! Responses are JSON:API documents: resources carry their `type`, lists
//! carry `meta.pagination`, and failures are `errors` arrays.

pub mod organizations;
pub mod workspaces;

pub use organizations::*;
pub use workspaces::*;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::jsonapi::{ResourceObject, ResourceType, MEDIA_TYPE_JSONAPI};
use crate::mock_server::state::MockState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// `page[number]` / `page[size]` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "page[number]")]
    pub number: Option<u32>,
    #[serde(rename = "page[size]")]
    pub size: Option<u32>,
}

impl PageQuery {
    fn bounds(&self) -> (u32, u32) {
        let number = self.number.unwrap_or(1).max(1);
        let size = self
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (number, size)
    }
}

/// A JSON:API request document with a single resource.
#[derive(Debug, Deserialize)]
pub struct Incoming<A> {
    pub data: IncomingResource<A>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingResource<A> {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: A,
}

/// Serialize a resource with its `type` member.
pub fn resource_value<A>(resource: &ResourceObject<A>) -> Value
where
    A: ResourceType + Serialize,
{
    let mut value = serde_json::to_value(resource).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = value {
        map.insert("type".to_string(), Value::String(A::TYPE.to_string()));
    }
    value
}

/// A single-resource document.
pub fn document<A>(status: StatusCode, resource: &ResourceObject<A>) -> Response
where
    A: ResourceType + Serialize,
{
    jsonapi(status, json!({ "data": resource_value(resource) }))
}

/// One page of `items` as a list document.
pub fn list_document<A>(items: &[&ResourceObject<A>], query: &PageQuery) -> Response
where
    A: ResourceType + Serialize,
{
    let (number, size) = query.bounds();
    let total = items.len() as u64;
    let total_pages = total.div_ceil(u64::from(size)) as u32;

    let start = ((number - 1) as usize).saturating_mul(size as usize);
    let data: Vec<Value> = items
        .iter()
        .skip(start)
        .take(size as usize)
        .map(|r| resource_value(r))
        .collect();

    let prev = (number > 1).then(|| number - 1);
    let next = (number < total_pages).then(|| number + 1);

    jsonapi(
        StatusCode::OK,
        json!({
            "data": data,
            "meta": {
                "pagination": {
                    "current-page": number,
                    "prev-page": prev,
                    "next-page": next,
                    "total-pages": total_pages,
                    "total-count": total,
                }
            }
        }),
    )
}

/// A JSON:API error document.
pub fn error_response(status: StatusCode, title: &str, detail: &str) -> Response {
    jsonapi(
        status,
        json!({
            "errors": [{
                "status": status.as_u16().to_string(),
                "title": title,
                "detail": detail,
            }]
        }),
    )
}

pub fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found", "")
}

fn jsonapi(status: StatusCode, body: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, MEDIA_TYPE_JSONAPI)],
        Json(body),
    )
        .into_response()
}

/// Reject the request with 401 unless it carries the required token.
pub fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(ref token) = state.required_token else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(token.as_str()) {
        Ok(())
    } else {
        Err(error_response(StatusCode::UNAUTHORIZED, "unauthorized", ""))
    }
}

/// Decode a path segment the client percent-encoded.
pub fn decode_segment(raw: String) -> String {
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::Fixtures;

    #[test]
    fn test_resource_value_carries_type() {
        let org = Fixtures::organization("acme");
        let value = resource_value(&org);
        assert_eq!(value["type"], "organizations");
        assert_eq!(value["id"], "acme");
    }

    #[test]
    fn test_page_bounds() {
        let query = PageQuery {
            number: Some(0),
            size: Some(500),
        };
        assert_eq!(query.bounds(), (1, MAX_PAGE_SIZE));
        assert_eq!(PageQuery::default().bounds(), (1, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_authorize() {
        let state = MockState::new().with_required_token("secret");
        let mut headers = HeaderMap::new();
        assert!(authorize(&state, &headers).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
        assert!(authorize(&state, &headers).is_ok());
        assert!(authorize(&MockState::new(), &HeaderMap::new()).is_ok());
    }
}
