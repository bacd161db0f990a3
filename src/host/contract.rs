//! Wire contract for the search bridge.
//!
//! One JSON object per line in each direction. Requests carry a caller
//! chosen `request_id` that is echoed on the matching response.

use profile_search::{SearchError, SearchFilters, SearchPage};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Request id used when a line cannot be parsed far enough to read one.
pub const PARSE_ERROR_ID: &str = "parse-error";

/// Commands understood by the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[default]
    #[serde(rename = "search.query")]
    SearchQuery,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

/// One request line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default = "protocol_version")]
    pub v: u32,
    pub request_id: String,
    #[serde(default)]
    pub command: CommandName,
    #[serde(default)]
    pub filters: SearchFilters,
    /// Falls back to the configured default page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// `next_cursor` of the previous page; absent for the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

fn protocol_version() -> u32 {
    PROTOCOL_VERSION
}

impl SearchRequest {
    /// A first-page search request.
    pub fn new(request_id: impl Into<String>, filters: SearchFilters) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            command: CommandName::SearchQuery,
            filters,
            page_size: None,
            cursor: None,
        }
    }

    /// Check the envelope before dispatch.
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.v != PROTOCOL_VERSION {
            return Err(ErrorBody::new(
                "unsupported_version",
                format!(
                    "unsupported protocol version {}; expected {}",
                    self.v, PROTOCOL_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ErrorBody::new("invalid_request", "request_id must not be empty"));
        }
        Ok(())
    }
}

/// Machine-readable failure carried on an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable identifier, e.g. `invalid_cursor` or `unavailable`.
    pub kind: String,
    pub message: String,
    /// Whether repeating the same request may succeed.
    #[serde(default)]
    pub retryable: bool,
}

impl ErrorBody {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<&SearchError> for ErrorBody {
    fn from(err: &SearchError) -> Self {
        Self {
            kind: err.kind().to_owned(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<SearchPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl SearchResponse {
    pub fn ok(request_id: impl Into<String>, page: Option<SearchPage>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            ok: true,
            page,
            error: None,
        }
    }

    pub fn error(request_id: impl Into<String>, error: ErrorBody) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            request_id: request_id.into(),
            ok: false,
            page: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_request_uses_defaults() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"request_id":"r1"}"#).expect("deserialize in test");
        assert_eq!(req.v, PROTOCOL_VERSION);
        assert_eq!(req.command, CommandName::SearchQuery);
        assert_eq!(req.filters, SearchFilters::default());
        assert!(req.page_size.is_none());
        assert!(req.cursor.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn filters_use_camel_case() {
        let req: SearchRequest = serde_json::from_str(
            r#"{"request_id":"r1","filters":{"freeTextQuery":"kabul","minAge":20,"interestsRequired":["music"]},"page_size":5}"#,
        )
        .expect("deserialize in test");
        assert_eq!(req.filters.free_text_query.as_deref(), Some("kabul"));
        assert_eq!(req.filters.min_age, Some(20));
        assert!(req.filters.interests_required.contains("music"));
        assert_eq!(req.page_size, Some(5));
    }

    #[test]
    fn stop_command_parses() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"request_id":"r9","command":"runtime.stop"}"#)
                .expect("deserialize in test");
        assert_eq!(req.command, CommandName::RuntimeStop);
    }

    #[test]
    fn validate_rejects_version_and_blank_id() {
        let mut req = SearchRequest::new("r1", SearchFilters::default());
        req.v = 2;
        assert_eq!(req.validate().unwrap_err().kind, "unsupported_version");

        let req = SearchRequest::new("  ", SearchFilters::default());
        assert_eq!(req.validate().unwrap_err().kind, "invalid_request");
    }

    #[test]
    fn error_body_from_search_error() {
        let body = ErrorBody::from(&SearchError::Unavailable("users: down".into()));
        assert_eq!(body.kind, "unavailable");
        assert!(body.retryable);
        assert!(body.message.contains("users: down"));

        let body = ErrorBody::from(&SearchError::InvalidCursor("bad".into()));
        assert_eq!(body.kind, "invalid_cursor");
        assert!(!body.retryable);
    }

    #[test]
    fn error_response_omits_page() {
        let resp = SearchResponse::error("r1", ErrorBody::new("invalid_request", "nope"));
        let json = serde_json::to_value(&resp).expect("serialize in test");
        assert_eq!(json["ok"], false);
        assert!(json.get("page").is_none());
        assert_eq!(json["error"]["kind"], "invalid_request");
    }
}
