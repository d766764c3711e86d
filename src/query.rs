//! Query-string encoding for list and read options.
//!
//! Options structs derive [`Serialize`] with the API's bracketed key names
//! (`page[number]`, `filter[status]`, `include`, ...). They are flattened
//! into a [`QueryParams`] map and encoded with keys in sorted order.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, TfeError};

/// Name of the query parameter used to side-load related resources.
pub const INCLUDE_PARAM: &str = "include";

/// A set of query parameters, each key mapping to one or more values.
///
/// Keys are kept sorted so that encoding is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a serializable options struct into query parameters.
    ///
    /// `null` fields are skipped, arrays become repeated values, and scalars
    /// become a single value. Nested objects are not representable and are
    /// rejected.
    pub fn from_options<T: Serialize + ?Sized>(options: &T) -> Result<Self> {
        let mut params = Self::new();

        let fields = match serde_json::to_value(options)? {
            Value::Null => return Ok(params),
            Value::Object(fields) => fields,
            other => {
                return Err(TfeError::InvalidQuery(format!(
                    "options must serialize to an object, got {other}"
                )))
            }
        };

        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = scalar_to_string(&key, item)? {
                            params.append(&key, v);
                        }
                    }
                }
                scalar => {
                    if let Some(v) = scalar_to_string(&key, scalar)? {
                        params.append(&key, v);
                    }
                }
            }
        }

        Ok(params)
    }

    /// Add a value for `key`, keeping any values already present.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Merge every value of `other` into this set.
    pub fn extend(&mut self, other: QueryParams) {
        for (key, values) in other.params {
            self.params.entry(key).or_default().extend(values);
        }
    }

    /// Returns the values recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Returns true if no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Encode into a query string (without the leading `?`).
    ///
    /// Keys appear in lexicographic order. List-valued keys (see
    /// [`is_list_key`]) with several values collapse into a single
    /// comma-joined value; all other keys produce one pair per value.
    pub fn encode(&self) -> String {
        let mut pairs = Vec::new();

        for (key, values) in &self.params {
            let key_escaped = urlencoding::encode(key);

            if values.len() > 1 && is_list_key(key) {
                let joined = values.join(",");
                pairs.push(format!("{key_escaped}={}", urlencoding::encode(&joined)));
                continue;
            }

            for value in values {
                pairs.push(format!("{key_escaped}={}", urlencoding::encode(value)));
            }
        }

        pairs.join("&")
    }
}

/// Whether multiple values for `key` are sent comma-joined.
pub fn is_list_key(key: &str) -> bool {
    key == INCLUDE_PARAM || key.contains("filter[")
}

fn scalar_to_string(key: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(TfeError::InvalidQuery(format!(
            "field '{key}' must be a scalar or a list of scalars"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Default)]
    struct Options {
        #[serde(rename = "page[number]", skip_serializing_if = "Option::is_none")]
        page_number: Option<u32>,
        #[serde(rename = "search[name]", skip_serializing_if = "Option::is_none")]
        search: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        include: Vec<String>,
        #[serde(rename = "filter[status]", skip_serializing_if = "Vec::is_empty")]
        status: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tag: Vec<String>,
    }

    #[test]
    fn test_empty_params_encode_to_empty_string() {
        assert_eq!(QueryParams::new().encode(), "");
        let params = QueryParams::from_options(&Options::default()).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.encode(), "");
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut params = QueryParams::new();
        params.append("zeta", "1");
        params.append("alpha", "2");
        params.append("mid", "3");
        assert_eq!(params.encode(), "alpha=2&mid=3&zeta=1");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let options = Options {
            page_number: Some(3),
            search: Some("prod web".to_string()),
            include: vec!["organization".to_string(), "current_run".to_string()],
            status: vec!["applied".to_string()],
            tag: vec!["a".to_string(), "b".to_string()],
        };
        let first = QueryParams::from_options(&options).unwrap().encode();
        let second = QueryParams::from_options(&options).unwrap().encode();
        assert_eq!(first, second);
    }

    #[test]
    fn test_include_values_are_comma_joined() {
        let options = Options {
            include: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..Default::default()
        };
        let encoded = QueryParams::from_options(&options).unwrap().encode();
        assert_eq!(encoded, "include=a%2Cb%2Cc");
    }

    #[test]
    fn test_filter_values_are_comma_joined() {
        let mut params = QueryParams::new();
        params.append("filter[status]", "planned");
        params.append("filter[status]", "applied");
        assert_eq!(params.encode(), "filter%5Bstatus%5D=planned%2Capplied");
    }

    #[test]
    fn test_other_keys_repeat() {
        let options = Options {
            tag: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let encoded = QueryParams::from_options(&options).unwrap().encode();
        assert_eq!(encoded, "tag=a&tag=b");
    }

    #[test]
    fn test_keys_and_values_are_escaped() {
        let options = Options {
            page_number: Some(2),
            search: Some("a b&c".to_string()),
            ..Default::default()
        };
        let encoded = QueryParams::from_options(&options).unwrap().encode();
        assert_eq!(encoded, "page%5Bnumber%5D=2&search%5Bname%5D=a%20b%26c");
    }

    #[test]
    fn test_nested_objects_are_rejected() {
        let value = serde_json::json!({ "outer": { "inner": 1 } });
        let err = QueryParams::from_options(&value).unwrap_err();
        assert!(matches!(err, TfeError::InvalidQuery(_)));
    }
}
