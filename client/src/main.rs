mod app;
mod config;
mod district;
mod dom;
mod estimate;
mod forms;
mod list_page;
mod map;
mod notifier;
mod request;
mod toast;
mod validation;

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

/// The toast container, created at the end of `<body>` when the page lacks one.
fn toast_container(document: &web_sys::Document) -> Option<web_sys::HtmlElement> {
    if let Some(existing) = document.get_element_by_id(dom::TOAST_CONTAINER_ID) {
        return existing.dyn_into::<web_sys::HtmlElement>().ok();
    }
    let body = document.body()?;
    let container = document
        .create_element("div")
        .ok()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()?;
    container.set_id(dom::TOAST_CONTAINER_ID);
    body.append_child(&container).ok()?;
    Some(container)
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let Some(target) = toast_container(&document) else {
        return;
    };

    APP_MOUNT_HANDLE.with(move |slot| {
        // Drop any previous mount so its listeners and timers stop first.
        let _old = slot.borrow_mut().take();
        let handle = mount_to(target, app::App);
        *slot.borrow_mut() = Some(Box::new(handle));
    });
}
