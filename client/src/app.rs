use leptos::prelude::*;

use crate::config;
use crate::estimate;
use crate::list_page;
use crate::map;
use crate::notifier;
use crate::toast::{Toast, ToastStack, Toasts};

/// Bind whichever page controllers this page has markup for.
fn boot(toasts: Toasts) {
    match config::list_page() {
        Some(Ok(config)) => list_page::init(config),
        Some(Err(e)) => web_sys::console::error_1(&format!("[list-page] {e}").into()),
        None => {}
    }

    estimate::init();
    map::init_result_page();

    if let Some(config) = config::notifier() {
        notifier::setup(config, toasts);
    }
}

#[component]
pub fn App() -> impl IntoView {
    let toasts: RwSignal<Vec<Toast>> = RwSignal::new(Vec::new());
    provide_context(Toasts(toasts));

    boot(Toasts(toasts));

    view! { <ToastStack /> }
}
