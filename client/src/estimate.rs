//! Valuation form: client-side checks, submission, task polling and the
//! floating status card.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Element, Event, HtmlButtonElement, HtmlFormElement, HtmlSelectElement, ScrollLogicalPosition,
};

use smartval_shared::estimate::{EstimateResponse, TaskStatus, task_status_url};
use smartval_shared::locale;
use smartval_shared::map::{MapPayload, escape_html};
use smartval_shared::timing::{
    STATUS_CARD_SLIDE_IN_MS, STATUS_CARD_SLIDE_OUT_MS, TASK_POLL_INTERVAL_MS,
};
use smartval_shared::{EstimateCommand, EstimateFlow, EstimatePhase, StatusCard};

use crate::config;
use crate::district::{self, DistrictBinding};
use crate::dom::{self, Listener};
use crate::map;
use crate::request::{self, RequestSpec};
use crate::validation;

const CARD_OFFSCREEN_CLASSES: [&str; 2] = ["translate-y-20", "opacity-0"];
const CARD_COMPLETED_ANIMATION: &str = "animate-bounce-in";
const BUTTON_BUSY_CLASSES: [&str; 2] = ["bg-slate-400", "cursor-not-allowed"];
const BUTTON_REST_CLASSES: [&str; 2] = ["bg-blue-600", "hover:bg-blue-700"];
const SUBMIT_BUTTON_SELECTOR: &str = "button[type=\"submit\"]";

struct EstimateDom {
    form: HtmlFormElement,
    submit: Option<HtmlButtonElement>,
    card: Option<Element>,
    processing: Option<Element>,
    completed: Option<Element>,
    error_modal: Option<Element>,
    result_container: Option<Element>,
    result_section: Option<Element>,
    loading_section: Option<Element>,
    price: Option<Element>,
}

impl EstimateDom {
    fn resolve(form: HtmlFormElement) -> Self {
        Self {
            submit: dom::query(&form, SUBMIT_BUTTON_SELECTOR),
            card: dom::by_id(dom::STATUS_CARD_ID),
            processing: dom::by_id(dom::STATUS_PROCESSING_ID),
            completed: dom::by_id(dom::STATUS_COMPLETED_ID),
            error_modal: dom::by_id(dom::ERROR_MODAL_ID),
            result_container: dom::by_id(dom::RESULT_CONTAINER_ID),
            result_section: dom::by_id(dom::RESULT_SECTION_ID),
            loading_section: dom::by_id(dom::LOADING_SECTION_ID),
            price: dom::by_id(dom::PREDICTED_PRICE_ID),
            form,
        }
    }

    fn render_button(&self, busy: bool, caption: &str) {
        let Some(button) = self.submit.as_ref() else {
            return;
        };
        button.set_disabled(busy);
        button.set_text_content(Some(caption));
        if busy {
            dom::add_classes(button, BUTTON_BUSY_CLASSES);
            dom::remove_classes(button, BUTTON_REST_CLASSES);
        } else {
            dom::remove_classes(button, BUTTON_BUSY_CLASSES);
            dom::add_classes(button, BUTTON_REST_CLASSES);
        }
    }

    /// Hide the card at once, without the slide-out.
    fn reset_card(&self) {
        if let Some(card) = self.card.as_ref() {
            dom::set_hidden(card, true);
            dom::add_classes(card, CARD_OFFSCREEN_CLASSES);
        }
    }

    fn reset_results(&self) {
        if let Some(section) = self.result_section.as_ref() {
            dom::set_hidden(section, true);
        }
        if let Some(price) = self.price.as_ref() {
            price.set_text_content(Some("0"));
        }
        if let Some(loading) = self.loading_section.as_ref() {
            dom::set_hidden(loading, true);
        }
    }
}

struct EstimatePage {
    dom: EstimateDom,
    flow: EstimateFlow,
    poller: Option<Interval>,
    rendered_card: StatusCard,
    card_transition: Option<Timeout>,
    _district: Option<DistrictBinding>,
}

type Page = Rc<RefCell<EstimatePage>>;

struct EstimatePageBinding {
    _page: Page,
    _listeners: Vec<Listener>,
}

thread_local! {
    static ESTIMATE_PAGE: RefCell<Option<EstimatePageBinding>> = const { RefCell::new(None) };
    static ESTIMATE_DISTRICT: RefCell<Option<DistrictBinding>> = const { RefCell::new(None) };
}

impl EstimatePage {
    fn render(&mut self) {
        self.dom
            .render_button(self.flow.submit_busy(), self.flow.submit_caption());

        if let Some(loading) = self.dom.loading_section.as_ref() {
            dom::set_hidden(loading, *self.flow.phase() != EstimatePhase::Submitting);
        }

        let card_state = self.flow.status_card();
        if card_state != self.rendered_card {
            self.transition_card(card_state);
            self.rendered_card = card_state;
        }
    }

    fn transition_card(&mut self, to: StatusCard) {
        let Some(card) = self.dom.card.clone() else {
            return;
        };
        if let Some(processing) = self.dom.processing.as_ref() {
            dom::set_hidden(processing, to != StatusCard::Processing);
        }
        if let Some(completed) = self.dom.completed.as_ref() {
            dom::set_hidden(completed, to != StatusCard::Completed);
            if to == StatusCard::Completed {
                completed.class_list().add_1(CARD_COMPLETED_ANIMATION).ok();
            }
        }

        match (self.rendered_card, to) {
            (StatusCard::Hidden, StatusCard::Hidden) => {}
            (StatusCard::Hidden, _) => {
                dom::set_hidden(&card, false);
                self.card_transition = Some(Timeout::new(STATUS_CARD_SLIDE_IN_MS, move || {
                    dom::remove_classes(&card, CARD_OFFSCREEN_CLASSES);
                }));
            }
            (_, StatusCard::Hidden) => {
                dom::add_classes(&card, CARD_OFFSCREEN_CLASSES);
                self.card_transition = Some(Timeout::new(STATUS_CARD_SLIDE_OUT_MS, move || {
                    dom::set_hidden(&card, true);
                }));
            }
            _ => {}
        }
    }

    fn show_failure(&self, message: &str) {
        let target = self.dom.error_modal.as_ref().and_then(|modal| {
            dom::query::<Element>(modal, dom::ERROR_MODAL_MESSAGE_SELECTOR).map(|m| (modal, m))
        });
        match target {
            Some((modal, container)) => {
                container.set_inner_html(&format!(
                    "<p class=\"font-medium text-red-700\">{}</p>",
                    escape_html(message)
                ));
                dom::set_hidden(modal, false);
            }
            None => dom::alert(message),
        }
    }

    fn show_estimate(&self, price: &str, payload: &MapPayload) {
        if let Some(el) = self.dom.price.as_ref() {
            el.set_text_content(Some(price));
        }
        if let Some(section) = self.dom.result_section.as_ref() {
            dom::set_hidden(section, false);
            dom::scroll_into_view(section, ScrollLogicalPosition::Nearest);
        }
        map::show(payload, Some(price));
    }
}

fn update(page: &Page, step: impl FnOnce(&mut EstimateFlow) -> Vec<EstimateCommand>) {
    let commands = {
        let mut inner = page.borrow_mut();
        let commands = step(&mut inner.flow);
        inner.render();
        commands
    };
    for command in commands {
        execute(page, command);
    }
}

fn execute(page: &Page, command: EstimateCommand) {
    match command {
        EstimateCommand::StartPolling { task_id } => {
            web_sys::console::info_1(&format!("[estimate] polling task {task_id}").into());
            let weak = Rc::downgrade(page);
            let interval = Interval::new(TASK_POLL_INTERVAL_MS, move || poll_tick(&weak));
            page.borrow_mut().poller = Some(interval);
        }
        EstimateCommand::StopPolling => {
            if let Some(interval) = page.borrow_mut().poller.take() {
                interval.cancel();
            }
        }
        EstimateCommand::Navigate { url } => dom::navigate(&url),
        EstimateCommand::Alert(message) => dom::alert(&message),
        EstimateCommand::ShowFailure(message) => page.borrow().show_failure(&message),
        EstimateCommand::ShowEstimate { price, map } => {
            page.borrow().show_estimate(&price, &map);
        }
    }
}

fn poll_tick(page: &Weak<RefCell<EstimatePage>>) {
    let Some(page) = page.upgrade() else {
        return;
    };
    let Some(task_id) = page.borrow_mut().flow.begin_poll() else {
        return;
    };
    spawn_local(async move {
        let result =
            request::send_json::<TaskStatus>(RequestSpec::get(task_status_url(&task_id))).await;
        match &result {
            Ok(status) => web_sys::console::info_1(
                &format!("[estimate] task {task_id}: {:?}", status.state).into(),
            ),
            Err(e) => web_sys::console::warn_1(&format!("[estimate] poll failed: {e}").into()),
        }
        update(&page, |flow| flow.on_poll(&task_id, result));
    });
}

fn submit_target(form: &HtmlFormElement) -> String {
    let action = form.action();
    if !action.is_empty() {
        return action;
    }
    dom::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default()
}

fn on_submit(page: &Page, event: &Event) {
    event.prevent_default();
    validation::clear_bubbles();

    let form = {
        let mut inner = page.borrow_mut();
        if !inner.flow.begin_validation() {
            return;
        }
        inner.dom.form.clone()
    };

    if !validation::validate(&form) {
        update(page, |flow| {
            flow.validation_failed();
            Vec::new()
        });
        return;
    }

    let Some(data) = request::form_data(&form) else {
        update(page, |flow| {
            flow.validation_failed();
            Vec::new()
        });
        web_sys::console::error_1(&"[estimate] form serialization failed".into());
        return;
    };

    update(page, |flow| {
        flow.begin_submit();
        Vec::new()
    });
    {
        let inner = page.borrow();
        if inner.dom.loading_section.is_some() {
            if let Some(section) = inner.dom.result_section.as_ref() {
                dom::set_hidden(section, true);
            }
            if let Some(container) = inner.dom.result_container.as_ref() {
                dom::scroll_into_view(container, ScrollLogicalPosition::Start);
            }
        }
    }

    let page = page.clone();
    let spec = RequestSpec::post(submit_target(&form)).form(data);
    spawn_local(async move {
        let result = request::send_json::<EstimateResponse>(spec).await;
        if let Err(e) = &result {
            web_sys::console::error_1(&format!("[estimate] submit failed: {e}").into());
        }
        update(&page, |flow| flow.on_submit_response(result));
    });
}

fn on_page_show(page: &Page) {
    {
        let mut inner = page.borrow_mut();
        inner.card_transition = None;
        inner.dom.reset_card();
        inner.dom.render_button(false, locale::ESTIMATE_CAPTION);
        inner.rendered_card = StatusCard::Hidden;
    }
    update(page, EstimateFlow::page_shown);
}

fn bind_district() -> Option<DistrictBinding> {
    let towns_url = config::towns_url()?;
    let city = dom::by_id::<HtmlSelectElement>(dom::CITY_SELECT_ID)?;
    let town = dom::by_id::<HtmlSelectElement>(dom::TOWN_SELECT_ID)?;
    district::bind(city, town, Some(towns_url))
}

/// Bind the estimation page. Pages without the form only get the district
/// dropdowns.
pub fn init() {
    let district = bind_district();
    let Some(form) = dom::by_id::<HtmlFormElement>(dom::ESTIMATION_FORM_ID) else {
        ESTIMATE_DISTRICT.with(|slot| {
            slot.replace(district);
        });
        return;
    };
    form.set_attribute("novalidate", "").ok();

    let page: Page = Rc::new(RefCell::new(EstimatePage {
        dom: EstimateDom::resolve(form.clone()),
        flow: EstimateFlow::new(),
        poller: None,
        rendered_card: StatusCard::Hidden,
        card_transition: None,
        _district: district,
    }));

    let mut listeners = Vec::new();

    let submit_page = page.clone();
    listeners.extend(Listener::new(form.as_ref(), "submit", move |event: Event| {
        on_submit(&submit_page, &event);
    }));

    let reset_page = page.clone();
    listeners.extend(Listener::new(form.as_ref(), "reset", move |_| {
        reset_page.borrow().dom.reset_results();
    }));

    if let Some(document) = dom::document() {
        listeners.extend(Listener::new(document.as_ref(), "click", move |event: Event| {
            let on_submit_button = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest(SUBMIT_BUTTON_SELECTOR).ok().flatten())
                .is_some();
            if !on_submit_button {
                validation::clear_bubbles();
            }
        }));
    }

    if let Some(button) = dom::by_id::<Element>(dom::GO_TO_RESULT_BTN_ID) {
        let go_page = page.clone();
        listeners.extend(Listener::new(button.as_ref(), "click", move |_| {
            let target = go_page.borrow().flow.redirect_target().map(str::to_string);
            if let Some(url) = target {
                dom::navigate(&url);
            }
        }));
    }

    if let Some(button) = dom::by_id::<Element>(dom::STATUS_DISMISS_ID) {
        let dismiss_page = page.clone();
        listeners.extend(Listener::new(button.as_ref(), "click", move |_| {
            update(&dismiss_page, |flow| {
                flow.dismiss();
                Vec::new()
            });
        }));
    }

    if let Some(window) = dom::window() {
        let show_page = page.clone();
        listeners.extend(Listener::new(window.as_ref(), "pageshow", move |_| {
            on_page_show(&show_page);
        }));
    }

    ESTIMATE_PAGE.with(|slot| {
        slot.replace(Some(EstimatePageBinding {
            _page: page,
            _listeners: listeners,
        }));
    });
    web_sys::console::info_1(&"[estimate] initialized".into());
}
