//! Page configuration embedded in the server-rendered markup.

use web_sys::Element;

use smartval_shared::ListPageConfig;

use crate::dom;

/// Live-update channel a page subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub target_type: String,
    pub label: String,
}

/// The list page's `#list-page-config` JSON, if the page has one.
pub fn list_page() -> Option<Result<ListPageConfig, String>> {
    let script = dom::by_id::<Element>(dom::LIST_PAGE_CONFIG_ID)?;
    let raw = script.text_content().unwrap_or_default();
    Some(
        serde_json::from_str::<ListPageConfig>(&raw)
            .map_err(|e| format!("#{} is invalid: {e}", dom::LIST_PAGE_CONFIG_ID)),
    )
}

/// From the first element carrying `data-ws-endpoint`.
pub fn notifier() -> Option<NotifierConfig> {
    let root = dom::document()?.document_element()?;
    let host = dom::query::<Element>(&root, dom::WS_CONFIG_SELECTOR)?;
    let attr = |name: &str| host.get_attribute(name).filter(|v| !v.is_empty());
    let endpoint = attr("data-ws-endpoint")?;
    let target_type = attr("data-ws-type")?;
    let label = attr("data-ws-label").unwrap_or_default();
    Some(NotifierConfig {
        endpoint,
        target_type,
        label,
    })
}

/// The estimation page's towns endpoint. `Some("")` when the container is
/// present but unconfigured.
pub fn towns_url() -> Option<String> {
    let container = dom::by_id::<Element>(dom::TOWNS_URL_CONTAINER_ID)?;
    Some(container.get_attribute("data-towns-url").unwrap_or_default())
}
