//! Constraint checks with inline bubbles next to the offending inputs.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Element, HtmlElement, HtmlInputElement, HtmlSelectElement,
    ValidityState,
};

use smartval_shared::map::escape_html;
use smartval_shared::validation::{Constraints, ValidityFlags, Violation};

use crate::dom;

const INPUT_ERROR_CLASS: &str = "input-error";
const BUBBLE_CLASS: &str = "validation-bubble";

fn flags(validity: &ValidityState) -> ValidityFlags {
    ValidityFlags {
        value_missing: validity.value_missing(),
        type_mismatch: validity.type_mismatch(),
        range_underflow: validity.range_underflow(),
        range_overflow: validity.range_overflow(),
        step_mismatch: validity.step_mismatch(),
        too_short: validity.too_short(),
        too_long: validity.too_long(),
        bad_input: validity.bad_input(),
        pattern_mismatch: validity.pattern_mismatch(),
        custom_error: validity.custom_error(),
    }
}

fn violation_of(field: &Element) -> Option<Violation> {
    if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
        if input.type_() == "hidden" || input.check_validity() {
            return None;
        }
        let constraints = Constraints {
            min: input.min(),
            max: input.max(),
            min_length: input.min_length(),
            max_length: input.max_length(),
        };
        let browser = input.validation_message().unwrap_or_default();
        return Violation::classify(&flags(&input.validity()), &constraints, &browser);
    }
    if let Some(select) = field.dyn_ref::<HtmlSelectElement>() {
        if select.check_validity() {
            return None;
        }
        let browser = select.validation_message().unwrap_or_default();
        return Violation::classify(
            &flags(&select.validity()),
            &Constraints::default(),
            &browser,
        );
    }
    None
}

/// Check every visible `input`/`select` of `form`, showing a bubble for each
/// violation. Returns whether the form may be submitted.
pub fn validate(form: &Element) -> bool {
    let mut valid = true;
    for field in dom::query_all(form, "input, select") {
        if let Some(violation) = violation_of(&field) {
            valid = false;
            show_bubble(&field, &violation.message());
        }
    }
    valid
}

fn show_bubble(field: &Element, message: &str) {
    let Some(document) = dom::document() else {
        return;
    };
    field.class_list().add_1(INPUT_ERROR_CLASS).ok();

    let Ok(bubble) = document.create_element("div") else {
        return;
    };
    bubble.set_class_name(BUBBLE_CLASS);
    bubble.set_inner_html(&format!(
        "<i class=\"fas fa-exclamation-circle mr-1\"></i>{}",
        escape_html(message)
    ));

    if let Some(parent) = field.parent_element() {
        let is_static = dom::window()
            .and_then(|w| w.get_computed_style(&parent).ok().flatten())
            .and_then(|style| style.get_property_value("position").ok())
            .is_some_and(|position| position == "static");
        if is_static && let Some(parent) = parent.dyn_ref::<HtmlElement>() {
            parent.style().set_property("position", "relative").ok();
        }
        parent.append_child(&bubble).ok();
    }

    // The first edit of the field dismisses its bubble.
    let field_for_input = field.clone();
    let dismiss = Closure::once_into_js(move || {
        field_for_input.class_list().remove_1(INPUT_ERROR_CLASS).ok();
        bubble.remove();
    });
    let options = AddEventListenerOptions::new();
    options.set_once(true);
    field
        .add_event_listener_with_callback_and_add_event_listener_options(
            "input",
            dismiss.unchecked_ref(),
            &options,
        )
        .ok();
}

/// Remove every bubble and error outline on the page.
pub fn clear_bubbles() {
    let Some(root) = dom::document().and_then(|d| d.document_element()) else {
        return;
    };
    for field in dom::query_all(&root, &format!(".{INPUT_ERROR_CLASS}")) {
        field.class_list().remove_1(INPUT_ERROR_CLASS).ok();
    }
    for bubble in dom::query_all(&root, &format!(".{BUBBLE_CLASS}")) {
        bubble.remove();
    }
}
