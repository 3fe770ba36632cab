//! Element ids and small DOM helpers shared by the page controllers.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlInputElement, ScrollBehavior, ScrollIntoViewOptions,
    ScrollLogicalPosition, Window,
};

use smartval_shared::request::CSRF_FIELD;

pub const LIST_PAGE_CONFIG_ID: &str = "list-page-config";
pub const OPEN_CREATE_BTN_ID: &str = "open-create-modal-btn";
pub const MODAL_SUBMIT_BTN_ID: &str = "modal-submit-btn";
pub const MODAL_ERRORS_ID: &str = "modal-form-errors";
pub const MODAL_ERROR_LIST_ID: &str = "modal-error-list";
pub const CLOSE_MODAL_IDS: [&str; 2] = ["close-modal-btn-x", "close-modal-btn-cancel"];
pub const EDIT_BTN_SELECTOR: &str = ".open-edit-modal-btn";
pub const DELETE_FORM_SELECTOR: &str = ".delete-form";
pub const ROW_INDEX_SELECTOR: &str = ".row-index";
pub const INLINE_ERROR_SELECTOR: &str = ".text-red-600";

pub const CITY_SELECT_ID: &str = "id_city";
pub const TOWN_SELECT_ID: &str = "id_town";
pub const TOWNS_URL_CONTAINER_ID: &str = "ajax-url-container";
pub const SOLD_TIME_INPUT_ID: &str = "id_sold_time";
pub const BIRTH_DATE_INPUT_ID: &str = "id_birth_date";

pub const ESTIMATION_FORM_ID: &str = "estimation-form";
pub const STATUS_CARD_ID: &str = "floating-status-card";
pub const STATUS_PROCESSING_ID: &str = "status-processing";
pub const STATUS_COMPLETED_ID: &str = "status-completed";
pub const STATUS_DISMISS_ID: &str = "status-card-dismiss";
pub const GO_TO_RESULT_BTN_ID: &str = "go-to-result-btn";
pub const ERROR_MODAL_ID: &str = "error-modal";
pub const ERROR_MODAL_MESSAGE_SELECTOR: &str = ".text-slate-600";
pub const RESULT_CONTAINER_ID: &str = "result-container";
pub const RESULT_SECTION_ID: &str = "result-section";
pub const LOADING_SECTION_ID: &str = "loading-section";
pub const PREDICTED_PRICE_ID: &str = "predicted-price";

pub const MAP_CONTAINER_ID: &str = "map";
pub const MAP_DATA_ID: &str = "map-data";

pub const TOAST_CONTAINER_ID: &str = "ws-toast-container";
pub const WS_CONFIG_SELECTOR: &str = "[data-ws-endpoint]";

pub const HIDDEN_CLASS: &str = "hidden";

pub fn window() -> Option<Window> {
    web_sys::window()
}

pub fn document() -> Option<Document> {
    window()?.document()
}

pub fn by_id<T: JsCast>(id: &str) -> Option<T> {
    document()?.get_element_by_id(id)?.dyn_into::<T>().ok()
}

pub fn query<T: JsCast>(root: &Element, selector: &str) -> Option<T> {
    root.query_selector(selector).ok()??.dyn_into::<T>().ok()
}

/// Every element under `root` matching `selector`, in document order.
pub fn query_all(root: &Element, selector: &str) -> Vec<Element> {
    let Ok(nodes) = root.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn set_hidden(el: &Element, hidden: bool) {
    el.class_list().toggle_with_force(HIDDEN_CLASS, hidden).ok();
}

pub fn add_classes<'a>(el: &Element, classes: impl IntoIterator<Item = &'a str>) {
    let list = el.class_list();
    for class in classes {
        list.add_1(class).ok();
    }
}

pub fn remove_classes<'a>(el: &Element, classes: impl IntoIterator<Item = &'a str>) {
    let list = el.class_list();
    for class in classes {
        list.remove_1(class).ok();
    }
}

pub fn alert(message: &str) {
    if let Some(window) = window() {
        window.alert_with_message(message).ok();
    }
}

pub fn confirm(message: &str) -> bool {
    window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

pub fn reload() {
    if let Some(window) = window() {
        window.location().reload().ok();
    }
}

pub fn navigate(url: &str) {
    if let Some(window) = window() {
        window.location().set_href(url).ok();
    }
}

/// The page's CSRF token, from the first `csrfmiddlewaretoken` input.
pub fn csrf_token() -> Option<String> {
    let selector = format!("input[name=\"{CSRF_FIELD}\"]");
    let input = document()?
        .query_selector(&selector)
        .ok()??
        .dyn_into::<HtmlInputElement>()
        .ok()?;
    Some(input.value()).filter(|v| !v.is_empty())
}

pub fn scroll_into_view(el: &Element, block: ScrollLogicalPosition) {
    let options = ScrollIntoViewOptions::new();
    options.set_behavior(ScrollBehavior::Smooth);
    options.set_block(block);
    el.scroll_into_view_with_scroll_into_view_options(&options);
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An event listener that unregisters itself when dropped.
pub struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn new(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Option<Self> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .ok()?;
        Some(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
            .ok();
    }
}
