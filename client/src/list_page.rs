//! Create/edit modal and row actions of a list page.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{
    Element, Event, HtmlButtonElement, HtmlFormElement, HtmlInputElement, ScrollLogicalPosition,
};

use smartval_shared::locale;
use smartval_shared::modal::{FormContent, FragmentResponse, ListPageConfig};
use smartval_shared::rows::{RowPatch, index_labels, resolve_pk};
use smartval_shared::{ListCommand, ModalController, Payload, RequestError};

use crate::dom::{self, Listener};
use crate::forms::{self, FormBehaviours};
use crate::notifier;
use crate::request::{self, Handlers, RequestSpec};

/// Row-level actions, each reached by one delegated event on the table body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Edit,
    Delete,
}

impl RowAction {
    pub const ALL: [RowAction; 2] = [RowAction::Edit, RowAction::Delete];

    pub fn event(self) -> &'static str {
        match self {
            RowAction::Edit => "click",
            RowAction::Delete => "submit",
        }
    }

    pub fn selector(self) -> &'static str {
        match self {
            RowAction::Edit => dom::EDIT_BTN_SELECTOR,
            RowAction::Delete => dom::DELETE_FORM_SELECTOR,
        }
    }

    pub fn for_event(event: &str) -> impl Iterator<Item = RowAction> + '_ {
        Self::ALL.into_iter().filter(move |a| a.event() == event)
    }

    /// Distinct event types that need a delegated listener.
    pub fn delegated_events() -> Vec<&'static str> {
        let mut events: Vec<&'static str> = Self::ALL.iter().map(|a| a.event()).collect();
        events.dedup();
        events
    }
}

type RowHandler = fn(&Page, Element, &Event);

fn row_handlers() -> HashMap<RowAction, RowHandler> {
    HashMap::from([
        (RowAction::Edit, on_edit_row as RowHandler),
        (RowAction::Delete, on_delete_row as RowHandler),
    ])
}

struct ListPageDom {
    modal: Element,
    table_body: Element,
    form: HtmlFormElement,
    content: Element,
    title: Option<Element>,
    header: Option<Element>,
    submit: Option<HtmlButtonElement>,
    errors: Option<Element>,
    error_list: Option<Element>,
}

struct ListPage {
    dom: ListPageDom,
    controller: ModalController,
    rendered_revision: Option<u64>,
    behaviours: FormBehaviours,
}

type Page = Rc<RefCell<ListPage>>;

/// Where a delete was submitted from.
struct DeleteOrigin {
    form: HtmlFormElement,
    row_id: Option<String>,
}

struct ListPageBinding {
    _page: Page,
    _listeners: Vec<Listener>,
}

thread_local! {
    static LIST_PAGE: RefCell<Option<ListPageBinding>> = const { RefCell::new(None) };
}

const LOADING_HTML_CLASS: &str = "text-center p-8";

impl ListPage {
    fn render(&mut self) {
        let view = self.controller.view();
        let els = &self.dom;

        if let Some(title) = els.title.as_ref() {
            title.set_text_content(Some(self.controller.title()));
        }
        if let Some(header) = els.header.as_ref() {
            dom::remove_classes(header, self.controller.stale_header_classes());
            dom::add_classes(header, self.controller.header_classes());
        }
        els.form.set_action(self.controller.form_action());

        if self.rendered_revision != Some(view.content_revision) {
            let html = match &view.content {
                FormContent::Pristine => self.controller.pristine_html().to_string(),
                FormContent::Loading => {
                    format!("<p class=\"{LOADING_HTML_CLASS}\">{}</p>", locale::FORM_LOADING)
                }
                FormContent::Fragment(html) => html.clone(),
            };
            // Old bindings go before their markup does.
            self.behaviours = FormBehaviours::default();
            els.content.set_inner_html(&html);
            if view.content != FormContent::Loading {
                self.behaviours = forms::apply(&els.content, &self.controller.config().features);
            }
            self.rendered_revision = Some(view.content_revision);
        }

        if let Some(submit) = els.submit.as_ref() {
            submit.set_disabled(view.submitting);
            submit.set_text_content(Some(view.submit_caption()));
        }

        if let Some(list) = els.error_list.as_ref() {
            list.set_inner_html("");
            if let Some(document) = dom::document() {
                for message in &view.errors {
                    if let Ok(li) = document.create_element("li") {
                        li.set_text_content(Some(message));
                        list.append_child(&li).ok();
                    }
                }
            }
        }
        if let Some(errors) = els.errors.as_ref() {
            dom::set_hidden(errors, view.errors.is_empty());
        }

        dom::set_hidden(&els.modal, !view.visible);
    }

    fn patch_rows(&self, patch: RowPatch) {
        let body = &self.dom.table_body;
        let row = |row_id: &str| dom::query::<Element>(body, &format!("[id=\"{row_id}\"]"));
        match patch {
            RowPatch::InsertTop { html } => {
                body.insert_adjacent_html("afterbegin", &html).ok();
            }
            RowPatch::Replace { row_id, html } => match row(&row_id) {
                Some(old) => old.set_outer_html(&html),
                None => {
                    web_sys::console::warn_1(
                        &format!("[list-page] row #{row_id} not found; inserting at top").into(),
                    );
                    body.insert_adjacent_html("afterbegin", &html).ok();
                }
            },
            RowPatch::Remove { row_id } => {
                if let Some(old) = row(&row_id) {
                    old.remove();
                }
            }
        }
        self.renumber_rows();
    }

    fn renumber_rows(&self) {
        let rows = dom::query_all(&self.dom.table_body, "tr");
        for (row, label) in rows.iter().zip(index_labels(rows.len())) {
            if let Some(cell) = dom::query::<Element>(row, dom::ROW_INDEX_SELECTOR) {
                cell.set_text_content(Some(&label));
            }
        }
    }
}

/// Run a controller transition, render the new view, then execute what it
/// asked for. The borrow is released before any command runs.
fn update(page: &Page, step: impl FnOnce(&mut ModalController) -> Vec<ListCommand>) {
    let commands = {
        let mut inner = page.borrow_mut();
        let commands = step(&mut inner.controller);
        inner.render();
        commands
    };
    for command in commands {
        execute(page, command, None);
    }
}

fn execute(page: &Page, command: ListCommand, origin: Option<&DeleteOrigin>) {
    match command {
        ListCommand::FetchEditForm { url } => fetch_edit_form(page, url),
        ListCommand::SubmitForm { action } => submit_form(page, action),
        ListCommand::SubmitDelete { action } => match origin {
            Some(origin) => submit_delete(page, action, origin),
            None => web_sys::console::warn_1(&"[list-page] delete without a row form".into()),
        },
        ListCommand::PatchRows(patch) => page.borrow().patch_rows(patch),
        ListCommand::ReloadPage => dom::reload(),
        ListCommand::ScrollToFirstError => {
            let content = page.borrow().dom.content.clone();
            if let Some(first) = dom::query::<Element>(&content, dom::INLINE_ERROR_SELECTOR) {
                dom::scroll_into_view(&first, ScrollLogicalPosition::Center);
            }
        }
        ListCommand::Alert(message) => dom::alert(&message),
        ListCommand::MarkSelfUpdate => notifier::mark_as_my_update(),
    }
}

fn fragment(payload: Payload) -> Result<FragmentResponse, RequestError> {
    payload.decode::<FragmentResponse>()
}

fn fetch_edit_form(page: &Page, url: String) {
    let on_success_page = page.clone();
    let on_error_page = page.clone();
    let success_url = url.clone();
    let error_url = url.clone();
    request::dispatch(
        RequestSpec::get(url),
        Handlers {
            on_success: Box::new(move |payload: Payload| {
                let result = fragment(payload);
                update(&on_success_page, |m| m.on_edit_form(&success_url, result));
            }),
            on_error: Box::new(move |e: RequestError| {
                web_sys::console::error_1(
                    &format!("[list-page] loading edit form failed: {e}").into(),
                );
                update(&on_error_page, |m| m.on_edit_form(&error_url, Err(e)));
            }),
            on_complete: None,
        },
    );
}

fn submitted_pk(form: &HtmlFormElement, data: &web_sys::FormData, field: &str) -> Option<String> {
    let form_value = request::form_value(data, field);
    let input_value = dom::query::<HtmlInputElement>(form, &format!("input[name=\"{field}\"]"))
        .map(|input| input.value());
    resolve_pk(form_value.as_deref(), input_value.as_deref())
}

fn submit_form(page: &Page, action: String) {
    let (form, pk_field) = {
        let inner = page.borrow();
        (
            inner.dom.form.clone(),
            inner.controller.config().pk_form_field.clone(),
        )
    };
    let Some(data) = request::form_data(&form) else {
        let e = RequestError::Network("form serialization failed".into());
        update(page, |m| m.on_submit_result(Err(e), None));
        return;
    };
    let pk = submitted_pk(&form, &data, &pk_field);

    let on_success_page = page.clone();
    let on_error_page = page.clone();
    request::dispatch(
        RequestSpec::post(action).form(data),
        Handlers {
            on_success: Box::new(move |payload: Payload| {
                let result = fragment(payload);
                if let Err(e) = &result {
                    web_sys::console::error_1(&format!("[list-page] save failed: {e}").into());
                }
                update(&on_success_page, |m| m.on_submit_result(result, pk));
            }),
            on_error: Box::new(move |e: RequestError| {
                web_sys::console::error_1(&format!("[list-page] save failed: {e}").into());
                update(&on_error_page, |m| m.on_submit_result(Err(e), None));
            }),
            on_complete: None,
        },
    );
}

fn submit_delete(page: &Page, action: String, origin: &DeleteOrigin) {
    let Some(data) = request::form_data(&origin.form) else {
        dom::alert(locale::DELETE_FAILED);
        return;
    };
    let on_success_page = page.clone();
    let on_error_page = page.clone();
    let row_id = origin.row_id.clone();
    let error_row_id = origin.row_id.clone();
    request::dispatch(
        RequestSpec::post(action).form(data),
        Handlers {
            on_success: Box::new(move |_: Payload| {
                update(&on_success_page, |m| m.on_delete_result(row_id, Ok(())));
            }),
            on_error: Box::new(move |e: RequestError| {
                web_sys::console::error_1(&format!("[list-page] delete failed: {e}").into());
                update(&on_error_page, |m| m.on_delete_result(error_row_id, Err(e)));
            }),
            on_complete: None,
        },
    );
}

fn on_edit_row(page: &Page, button: Element, _event: &Event) {
    let Some(url) = button.get_attribute("data-url").filter(|u| !u.is_empty()) else {
        web_sys::console::warn_1(&"[list-page] edit button without data-url".into());
        return;
    };
    update(page, |m| m.switch_to_edit_mode(&url));
}

fn on_delete_row(page: &Page, form: Element, event: &Event) {
    event.prevent_default();
    let Ok(form) = form.dyn_into::<HtmlFormElement>() else {
        return;
    };
    let row_id = form
        .closest("tr")
        .ok()
        .flatten()
        .map(|row| row.id())
        .filter(|id| !id.is_empty());
    let confirmed = dom::confirm(locale::DELETE_CONFIRM);
    let commands = page
        .borrow()
        .controller
        .request_delete(confirmed, &form.action());
    let origin = DeleteOrigin { form, row_id };
    for command in commands {
        execute(page, command, Some(&origin));
    }
}

fn delegate(page: &Page, table_body: &Element) -> Vec<Listener> {
    let handlers = Rc::new(row_handlers());
    RowAction::delegated_events()
        .into_iter()
        .filter_map(|event_name| {
            let page = page.clone();
            let handlers = handlers.clone();
            Listener::new(table_body.as_ref(), event_name, move |event: Event| {
                let Some(target) = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                else {
                    return;
                };
                let kind = event.type_();
                for action in RowAction::for_event(&kind) {
                    if let Ok(Some(matched)) = target.closest(action.selector())
                        && let Some(handler) = handlers.get(&action)
                    {
                        handler(&page, matched, &event);
                        return;
                    }
                }
            })
        })
        .collect()
}

fn resolve_dom(config: &ListPageConfig) -> Result<ListPageDom, String> {
    let modal = dom::by_id::<Element>(&config.modal_id)
        .ok_or_else(|| format!("modal #{} not found", config.modal_id))?;
    let table_body = dom::by_id::<Element>(&config.table_body_id)
        .ok_or_else(|| format!("table body #{} not found", config.table_body_id))?;
    let form = dom::by_id::<HtmlFormElement>(&config.form_id)
        .ok_or_else(|| format!("form #{} not found", config.form_id))?;
    let content = dom::by_id::<Element>(&config.form_content_id)
        .ok_or_else(|| format!("form content #{} not found", config.form_content_id))?;
    Ok(ListPageDom {
        title: dom::by_id(&config.modal_title_id),
        header: dom::by_id(&config.modal_header_id),
        submit: dom::query(&modal, &format!("#{}", dom::MODAL_SUBMIT_BTN_ID)),
        errors: dom::query(&modal, &format!("#{}", dom::MODAL_ERRORS_ID)),
        error_list: dom::query(&modal, &format!("#{}", dom::MODAL_ERROR_LIST_ID)),
        modal,
        table_body,
        form,
        content,
    })
}

/// Bind the list page described by `config`. Re-initialising replaces the
/// previous binding.
pub fn init(mut config: ListPageConfig) {
    let dom = match resolve_dom(&config) {
        Ok(dom) => dom,
        Err(e) => {
            web_sys::console::error_1(&format!("[list-page] init failed: {e}").into());
            return;
        }
    };
    let Some(open_create) = dom::by_id::<Element>(dom::OPEN_CREATE_BTN_ID) else {
        web_sys::console::error_1(&"[list-page] init failed: create button not found".into());
        return;
    };
    if config.create.form_html.is_empty() {
        config.create.form_html = dom.content.inner_html();
    }
    let table_body_id = config.table_body_id.clone();

    let page: Page = Rc::new(RefCell::new(ListPage {
        dom,
        controller: ModalController::new(config),
        rendered_revision: None,
        behaviours: FormBehaviours::default(),
    }));
    page.borrow_mut().render();

    let mut listeners = Vec::new();

    let create_page = page.clone();
    listeners.extend(Listener::new(open_create.as_ref(), "click", move |_| {
        update(&create_page, |m| {
            m.switch_to_create_mode();
            Vec::new()
        });
    }));

    let (modal, form, table_body) = {
        let inner = page.borrow();
        (
            inner.dom.modal.clone(),
            inner.dom.form.clone(),
            inner.dom.table_body.clone(),
        )
    };
    for id in dom::CLOSE_MODAL_IDS {
        if let Some(button) = dom::query::<Element>(&modal, &format!("#{id}")) {
            let close_page = page.clone();
            listeners.extend(Listener::new(button.as_ref(), "click", move |_| {
                update(&close_page, |m| {
                    m.close();
                    Vec::new()
                });
            }));
        }
    }

    let submit_page = page.clone();
    listeners.extend(Listener::new(form.as_ref(), "submit", move |event: Event| {
        event.prevent_default();
        update(&submit_page, ModalController::begin_submit);
    }));

    listeners.extend(delegate(&page, &table_body));

    LIST_PAGE.with(|slot| {
        slot.replace(Some(ListPageBinding {
            _page: page,
            _listeners: listeners,
        }));
    });
    web_sys::console::info_1(&format!("[list-page] #{table_body_id} initialized").into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clicks_route_to_edit_and_submits_to_delete() {
        assert_eq!(
            RowAction::for_event("click").collect::<Vec<_>>(),
            vec![RowAction::Edit]
        );
        assert_eq!(
            RowAction::for_event("submit").collect::<Vec<_>>(),
            vec![RowAction::Delete]
        );
        assert_eq!(RowAction::for_event("input").count(), 0);
    }

    #[test]
    fn one_listener_per_event_type() {
        assert_eq!(RowAction::delegated_events(), vec!["click", "submit"]);
    }

    #[test]
    fn every_action_has_a_handler() {
        let handlers = row_handlers();
        for action in RowAction::ALL {
            assert!(handlers.contains_key(&action), "{action:?} unhandled");
        }
    }

    #[test]
    fn selectors_match_row_markup() {
        assert_eq!(RowAction::Edit.selector(), ".open-edit-modal-btn");
        assert_eq!(RowAction::Delete.selector(), ".delete-form");
    }
}
