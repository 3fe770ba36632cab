//! Live-update notifications over a WebSocket, suppressed for changes this
//! client made itself.

use std::cell::RefCell;

use futures::StreamExt;
use futures::future::{AbortHandle, abortable};
use gloo_net::websocket::Message;
use gloo_net::websocket::futures::WebSocket;
use gloo_storage::{LocalStorage, Storage};
use wasm_bindgen_futures::spawn_local;

use smartval_shared::notify::{
    Delivery, SELF_UPDATE_KEY, SelfUpdateToken, WsNotification, route, ws_url,
};

use crate::config::NotifierConfig;
use crate::dom;
use crate::toast::Toasts;

thread_local! {
    static NOTIFIER_TASK: RefCell<Option<AbortHandle>> = const { RefCell::new(None) };
}

/// Stamp the self-update token; the next matching broadcast within the
/// suppression window is not shown.
pub fn mark_as_my_update() {
    let token = SelfUpdateToken::issued_at(dom::now_ms());
    if let Err(e) = LocalStorage::set(SELF_UPDATE_KEY, token) {
        web_sys::console::warn_1(&format!("[ws] storing self-update token failed: {e}").into());
    }
}

fn take_token() -> Option<SelfUpdateToken> {
    let token = LocalStorage::get::<SelfUpdateToken>(SELF_UPDATE_KEY).ok();
    LocalStorage::delete(SELF_UPDATE_KEY);
    token
}

fn deliver(raw: &str, config: &NotifierConfig, toasts: Toasts) {
    let notification = match serde_json::from_str::<WsNotification>(raw) {
        Ok(n) => n,
        Err(e) => {
            web_sys::console::warn_1(&format!("[ws] unparsable frame skipped: {e}").into());
            return;
        }
    };
    let token = if Delivery::consumes_token(&notification, &config.target_type) {
        take_token()
    } else {
        None
    };
    match route(notification, &config.target_type, token, dom::now_ms()) {
        Delivery::Ignored => {}
        Delivery::Suppressed => {
            web_sys::console::info_1(&"[ws] own update; notification suppressed".into());
        }
        Delivery::Toast(message) => toasts.push(&config.label, message),
    }
}

/// Subscribe to `config.endpoint`. A second call replaces the first
/// subscription.
pub fn setup(config: NotifierConfig, toasts: Toasts) {
    let Some(location) = dom::window().map(|w| w.location()) else {
        return;
    };
    let protocol = location.protocol().unwrap_or_default();
    let host = location.host().unwrap_or_default();
    let url = ws_url(&protocol, &host, &config.endpoint);

    let (task, handle) = abortable(async move {
        let mut socket = match WebSocket::open(&url) {
            Ok(socket) => socket,
            Err(e) => {
                web_sys::console::error_1(&format!("[ws] connect to {url} failed: {e}").into());
                return;
            }
        };
        web_sys::console::info_1(&format!("[ws] {} channel connecting: {url}", config.label).into());
        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Text(raw)) => deliver(&raw, &config, toasts),
                Ok(Message::Bytes(_)) => {}
                Err(e) => web_sys::console::warn_1(&format!("[ws] {e}").into()),
            }
        }
        web_sys::console::warn_1(&format!("[ws] {} channel closed", config.label).into());
    });

    NOTIFIER_TASK.with(|slot| {
        if let Some(old) = slot.borrow_mut().replace(handle) {
            old.abort();
        }
    });
    spawn_local(async move {
        let _ = task.await;
    });
}
