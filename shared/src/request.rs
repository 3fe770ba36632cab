use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Methods that do not change server state and never carry a CSRF token.
    pub fn is_safe(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }

    pub fn allows_body(self) -> bool {
        !matches!(self, Self::Get | Self::Head)
    }
}

/// Append an already-encoded query string to `url`.
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Text,
}

impl ContentKind {
    pub fn from_header(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains("application/json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// JSON bodies pass through; text is wrapped as `{"message": text}`.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => {
                let mut map = Map::new();
                map.insert("message".into(), Value::String(text));
                Value::Object(map)
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        match self {
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|e| RequestError::UnexpectedPayload(e.to_string())),
            Self::Text(text) => Err(RequestError::UnexpectedPayload(format!(
                "expected JSON, got {} bytes of text",
                text.len()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Status { status: u16, body: Value },
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
}

impl RequestError {
    pub fn from_status(status: u16, body: Payload) -> Self {
        Self::Status {
            status,
            body: body.into_json(),
        }
    }

    /// Message to surface to the user: the body's `error`, then its
    /// `message`, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Self::Status { body, .. } = self {
            for key in ["error", "message"] {
                if let Some(text) = body.get(key).and_then(Value::as_str)
                    && !text.is_empty()
                {
                    return text.to_string();
                }
            }
        }
        fallback.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn only_state_changing_methods_need_csrf() {
        assert!(Method::Get.is_safe());
        assert!(Method::Head.is_safe());
        assert!(Method::Options.is_safe());
        assert!(!Method::Post.is_safe());
        assert!(!Method::Delete.is_safe());
    }

    #[test]
    fn append_query_picks_separator() {
        assert_eq!(append_query("/towns/", "city=Taipei"), "/towns/?city=Taipei");
        assert_eq!(append_query("/towns/?a=1", "city=Taipei"), "/towns/?a=1&city=Taipei");
        assert_eq!(append_query("/towns/", ""), "/towns/");
    }

    #[test]
    fn content_kind_matches_json_with_charset() {
        assert_eq!(
            ContentKind::from_header(Some("application/json; charset=utf-8")),
            ContentKind::Json
        );
        assert_eq!(ContentKind::from_header(Some("text/html")), ContentKind::Text);
        assert_eq!(ContentKind::from_header(None), ContentKind::Text);
    }

    #[test]
    fn text_error_body_is_wrapped_as_message() {
        let err = RequestError::from_status(500, Payload::Text("boom".into()));
        assert_eq!(
            err,
            RequestError::Status {
                status: 500,
                body: json!({ "message": "boom" })
            }
        );
        assert_eq!(err.user_message("failed"), "boom");
    }

    #[test]
    fn user_message_prefers_error_field() {
        let err = RequestError::from_status(
            400,
            Payload::Json(json!({ "error": "bad city", "message": "ignored" })),
        );
        assert_eq!(err.user_message("failed"), "bad city");
        assert_eq!(
            RequestError::Network("offline".into()).user_message("failed"),
            "failed"
        );
        let blank = RequestError::from_status(500, Payload::Json(json!({ "error": "" })));
        assert_eq!(blank.user_message("failed"), "failed");
    }

    #[test]
    fn decode_maps_shape_mismatch_to_unexpected_payload() {
        #[derive(Debug, Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            html: String,
        }
        let err = Payload::Json(json!({ "success": true }))
            .decode::<Needs>()
            .unwrap_err();
        assert!(matches!(err, RequestError::UnexpectedPayload(_)));

        let err = Payload::Text("<html>".into()).decode::<Needs>().unwrap_err();
        assert!(matches!(err, RequestError::UnexpectedPayload(_)));
    }
}
