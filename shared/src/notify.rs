use serde::{Deserialize, Serialize};

use crate::timing::SELF_UPDATE_WINDOW_MS;

/// Local-storage key holding the [`SelfUpdateToken`].
pub const SELF_UPDATE_KEY: &str = "ws_my_update_timestamp";

/// Broadcast frame pushed over the list-update socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsNotification {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Stamped when this client submits a change, so the broadcast it causes
/// is not shown back to it. One-shot: the first matching notification
/// consumes it whether or not it is still fresh. Stored as the bare
/// millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelfUpdateToken {
    pub issued_at_ms: i64,
}

impl SelfUpdateToken {
    pub fn issued_at(now_ms: i64) -> Self {
        Self {
            issued_at_ms: now_ms,
        }
    }

    /// Within the suppression window on either side of `now_ms`; another
    /// tab's clock may run slightly ahead.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        let age = now_ms.saturating_sub(self.issued_at_ms);
        age.unsigned_abs() < SELF_UPDATE_WINDOW_MS.unsigned_abs()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Not the event type this page listens for.
    Ignored,
    /// Triggered by this client; no toast.
    Suppressed,
    Toast(String),
}

impl Delivery {
    /// Whether routing this frame must consume the stored token.
    pub fn consumes_token(notification: &WsNotification, target_type: &str) -> bool {
        notification.kind == target_type
    }
}

/// Decide what to do with a frame. `token` is the value just taken out of
/// storage for a matching frame.
pub fn route(
    notification: WsNotification,
    target_type: &str,
    token: Option<SelfUpdateToken>,
    now_ms: i64,
) -> Delivery {
    if notification.kind != target_type {
        return Delivery::Ignored;
    }
    if token.is_some_and(|t| t.is_fresh(now_ms)) {
        return Delivery::Suppressed;
    }
    Delivery::Toast(notification.message)
}

/// `ws(s)://<host>/ws/<endpoint_path>/`, secure when the page is https.
pub fn ws_url(page_protocol: &str, host: &str, endpoint_path: &str) -> String {
    let scheme = if page_protocol == "https:" { "wss" } else { "ws" };
    let path = endpoint_path.trim_matches('/');
    format!("{scheme}://{host}/ws/{path}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: &str, message: &str) -> WsNotification {
        WsNotification {
            kind: kind.into(),
            message: message.into(),
        }
    }

    #[test]
    fn parses_broadcast_frame() {
        let parsed: WsNotification =
            serde_json::from_str(r#"{"type":"house_update","message":"房屋已更新"}"#).unwrap();
        assert_eq!(parsed, frame("house_update", "房屋已更新"));
    }

    #[test]
    fn other_types_are_ignored() {
        assert_eq!(
            route(frame("agent_update", "x"), "house_update", None, 0),
            Delivery::Ignored
        );
        assert!(!Delivery::consumes_token(&frame("agent_update", "x"), "house_update"));
    }

    #[test]
    fn fresh_token_suppresses_toast() {
        let token = SelfUpdateToken::issued_at(10_000);
        assert_eq!(
            route(frame("house_update", "x"), "house_update", Some(token), 14_999),
            Delivery::Suppressed
        );
    }

    #[test]
    fn expired_token_does_not_suppress() {
        let token = SelfUpdateToken::issued_at(10_000);
        assert_eq!(
            route(frame("house_update", "hi"), "house_update", Some(token), 15_000),
            Delivery::Toast("hi".into())
        );
        assert!(!token.is_fresh(5_000));
    }

    #[test]
    fn slightly_future_token_still_suppresses() {
        let token = SelfUpdateToken::issued_at(10_000);
        assert!(token.is_fresh(9_000));
        assert!(!token.is_fresh(4_000));
    }

    #[test]
    fn extreme_stored_timestamps_are_stale() {
        let oldest = SelfUpdateToken::issued_at(i64::MIN);
        assert!(!oldest.is_fresh(1_700_000_000_000));
        let newest = SelfUpdateToken::issued_at(i64::MAX);
        assert!(!newest.is_fresh(-1_700_000_000_000));
    }

    #[test]
    fn no_token_toasts() {
        assert_eq!(
            route(frame("house_update", "hi"), "house_update", None, 0),
            Delivery::Toast("hi".into())
        );
    }

    #[test]
    fn token_is_stored_as_bare_timestamp() {
        let token = SelfUpdateToken::issued_at(1_700_000_000_000);
        assert_eq!(serde_json::to_string(&token).unwrap(), "1700000000000");
        let parsed: SelfUpdateToken = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn ws_url_follows_page_scheme() {
        assert_eq!(
            ws_url("https:", "smartval.tw", "houses"),
            "wss://smartval.tw/ws/houses/"
        );
        assert_eq!(
            ws_url("http:", "localhost:8000", "/agents/"),
            "ws://localhost:8000/ws/agents/"
        );
    }
}
