//! TFE API resource models and services.

mod apply;
mod notification;
mod organization;
mod plan;
mod policy;
mod project;
mod registry;
mod run;
mod variable;
mod variable_set;
mod workspace;

pub use apply::*;
pub use notification::*;
pub use organization::*;
pub use plan::*;
pub use policy::*;
pub use project::*;
pub use registry::*;
pub use run::*;
pub use variable::*;
pub use variable_set::*;
pub use workspace::*;

/// Whether `v` is set and non-empty.
pub fn valid_string(v: Option<&str>) -> bool {
    v.is_some_and(|s| !s.is_empty())
}

/// Whether `v` can be used as an identifier inside a URL path.
///
/// Identifiers are non-empty and limited to ASCII letters, digits, `-`,
/// `_` and `.`.
pub fn valid_string_id(v: &str) -> bool {
    !v.is_empty()
        && v
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Percent-encode one path segment.
pub(crate) fn segment(v: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(v)
}
