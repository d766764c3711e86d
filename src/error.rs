//! Error types for TFE API operations.
//!
//! Most variants are fixed sentinels that callers are expected to branch on
//! (compare with `matches!`). Server-reported failures that don't map to a
//! sentinel are carried by [`TfeError::Api`] with the joined error message.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur during TFE API operations.
#[derive(Debug, Error)]
pub enum TfeError {
    /// Configuration is missing or incomplete.
    #[error("TFE configuration required: {0}")]
    ConfigMissing(String),

    // -------------------------------------------------------------------------
    // Server response sentinels
    // -------------------------------------------------------------------------
    /// The request was rejected as unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// The requested resource does not exist or is not visible (HTTP 404).
    #[error("resource not found")]
    ResourceNotFound,

    /// The server rejected the `include` query parameter.
    #[error("invalid value for include field")]
    InvalidIncludeValue,

    /// API request failed with one or more server-reported errors.
    ///
    /// `message` holds the error titles/details joined by newlines, or the
    /// HTTP status line when the payload could not be decoded.
    #[error("{message}")]
    Api { message: String, status: u16 },

    // -------------------------------------------------------------------------
    // Local validation sentinels
    // -------------------------------------------------------------------------
    #[error("invalid value for organization")]
    InvalidOrg,

    #[error("invalid value for workspace ID")]
    InvalidWorkspaceId,

    #[error("invalid value for workspace")]
    InvalidWorkspaceValue,

    #[error("invalid value for project ID")]
    InvalidProjectId,

    #[error("invalid value for run ID")]
    InvalidRunId,

    #[error("invalid value for plan ID")]
    InvalidPlanId,

    #[error("invalid value for apply ID")]
    InvalidApplyId,

    #[error("invalid value for variable ID")]
    InvalidVariableId,

    #[error("invalid variable set ID")]
    InvalidVariableSetId,

    #[error("invalid value for notification configuration ID")]
    InvalidNotificationConfigId,

    #[error("invalid value for policy ID")]
    InvalidPolicyId,

    #[error("invalid value for registry provider name")]
    InvalidProviderName,

    #[error("invalid value for registry module name")]
    InvalidModuleName,

    #[error("invalid value for namespace")]
    InvalidNamespace,

    #[error("invalid value for name")]
    InvalidName,

    #[error("name is required")]
    RequiredName,

    #[error("email is required")]
    RequiredEmail,

    #[error("key is required")]
    RequiredKey,

    #[error("category is required")]
    RequiredCategory,

    #[error("url is required")]
    RequiredUrl,

    #[error("destination type is required")]
    RequiredDestinationType,

    #[error("enabled is required")]
    RequiredEnabled,

    #[error("workspace is required")]
    RequiredWorkspace,

    #[error("workspaces is required")]
    RequiredWorkspacesList,

    #[error("policy enforcement is required")]
    RequiredEnforce,

    #[error("registry name is required")]
    RequiredRegistryName,

    /// A plan or apply did not expose a log URL.
    #[error("log URL is not available")]
    LogUrlUnavailable,

    // -------------------------------------------------------------------------
    // Programmer errors
    // -------------------------------------------------------------------------
    /// The request body could not be encoded as a resource document.
    #[error("invalid request body")]
    InvalidRequestBody,

    /// The response document did not hold a list of resources.
    #[error("expected a list document: data must be an array")]
    InvalidListDocument,

    /// An options struct could not be flattened into query parameters.
    #[error("invalid query options: {0}")]
    InvalidQuery(String),

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------
    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl TfeError {
    /// HTTP status code associated with this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TfeError::Unauthorized => Some(401),
            TfeError::ResourceNotFound => Some(404),
            TfeError::InvalidIncludeValue => Some(400),
            TfeError::Api { status, .. } => Some(*status),
            TfeError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// JSON:API error document.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    errors: Vec<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Decode the error messages of a JSON:API error document.
///
/// Returns `None` when the body isn't an error document or lists no errors.
fn decode_error_payload(body: &[u8]) -> Option<Vec<String>> {
    let payload: ErrorPayload = serde_json::from_slice(body).ok()?;
    if payload.errors.is_empty() {
        return None;
    }

    let messages = payload
        .errors
        .into_iter()
        .map(|e| match e.detail {
            Some(detail) if !detail.is_empty() => format!("{}\n\n{}", e.title, detail),
            _ => e.title,
        })
        .collect();

    Some(messages)
}

/// Translate a non-success response into an error.
///
/// 401 and 404 map to sentinels without reading the body. A 400 whose errors
/// mention the include parameter maps to [`TfeError::InvalidIncludeValue`].
/// Everything else carries the joined error messages, or the status line
/// when the body can't be decoded.
pub(crate) fn translate_error_response(status: StatusCode, body: &[u8]) -> TfeError {
    match status {
        StatusCode::UNAUTHORIZED => return TfeError::Unauthorized,
        StatusCode::NOT_FOUND => return TfeError::ResourceNotFound,
        _ => {}
    }

    let Some(messages) = decode_error_payload(body) else {
        return TfeError::Api {
            message: status.to_string(),
            status: status.as_u16(),
        };
    };

    if status == StatusCode::BAD_REQUEST
        && messages.iter().any(|m| m.contains("include parameter"))
    {
        return TfeError::InvalidIncludeValue;
    }

    TfeError::Api {
        message: messages.join("\n"),
        status: status.as_u16(),
    }
}

/// Result type alias for TFE operations.
pub type Result<T> = core::result::Result<T, TfeError>;
