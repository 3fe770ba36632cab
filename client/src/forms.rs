//! Behaviours re-applied to form markup every time it is rendered.

use js_sys::{Function, Reflect};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlInputElement, HtmlSelectElement};

use smartval_shared::modal::FormFeatures;

use crate::district::{self, DistrictBinding};
use crate::dom;

const DATE_PLACEHOLDER: &str = "yyyy-mm-dd";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatePickerOptions {
    date_format: &'static str,
    allow_input: bool,
    locale: &'static str,
}

const DATE_PICKER_OPTIONS: DatePickerOptions = DatePickerOptions {
    date_format: "Y-m-d",
    allow_input: true,
    locale: "zh_tw",
};

/// Bindings that live as long as the markup they were applied to.
#[derive(Default)]
pub struct FormBehaviours {
    _district: Option<DistrictBinding>,
}

pub fn apply(root: &Element, features: &FormFeatures) -> FormBehaviours {
    let mut behaviours = FormBehaviours::default();

    if let Some(towns_url) = features.towns_url.as_ref() {
        let city = dom::query::<HtmlSelectElement>(root, &format!("#{}", dom::CITY_SELECT_ID));
        let town = dom::query::<HtmlSelectElement>(root, &format!("#{}", dom::TOWN_SELECT_ID));
        if let (Some(city), Some(town)) = (city, town) {
            behaviours._district = district::bind(city, town, Some(towns_url.clone()));
        }
    }

    if features.date_picker {
        attach_date_pickers(root);
    }

    behaviours
}

fn date_picker() -> Option<Function> {
    let window = dom::window()?;
    Reflect::get(window.as_ref(), &JsValue::from_str("flatpickr"))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

fn attach_date_pickers(root: &Element) {
    let sold_time =
        dom::query::<HtmlInputElement>(root, &format!("#{}", dom::SOLD_TIME_INPUT_ID));
    if let Some(input) = sold_time.as_ref()
        && input.value().is_empty()
    {
        input.set_placeholder(DATE_PLACEHOLDER);
    }
    let birth_date =
        dom::query::<HtmlInputElement>(root, &format!("#{}", dom::BIRTH_DATE_INPUT_ID));

    let inputs: Vec<HtmlInputElement> = sold_time.into_iter().chain(birth_date).collect();
    if inputs.is_empty() {
        return;
    }

    let Some(flatpickr) = date_picker() else {
        web_sys::console::warn_1(&"[forms] flatpickr not loaded; date inputs left plain".into());
        return;
    };
    let options = match serde_wasm_bindgen::to_value(&DATE_PICKER_OPTIONS) {
        Ok(options) => options,
        Err(e) => {
            web_sys::console::warn_1(&format!("[forms] date picker options: {e}").into());
            return;
        }
    };
    for input in inputs {
        if let Err(e) = flatpickr.call2(&JsValue::NULL, input.as_ref(), &options) {
            web_sys::console::warn_1(&format!("[forms] date picker attach failed: {e:?}").into());
        }
    }
}
