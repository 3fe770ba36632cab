use std::cell::RefCell;
use std::rc::Rc;

use web_sys::{Event, HtmlOptionElement, HtmlSelectElement};

use smartval_shared::{DistrictSelect, Payload, RequestError, TownsResponse};

use crate::dom::Listener;
use crate::request::{self, Handlers, RequestSpec};

/// A city dropdown driving its district dropdown. Dropping it unbinds the
/// change listener.
pub struct DistrictBinding {
    _on_change: Listener,
}

struct Bound {
    town: HtmlSelectElement,
    select: DistrictSelect,
    /// District chosen in the server-rendered markup, restored once the
    /// first district list arrives.
    restore: Option<String>,
}

fn render(town: &HtmlSelectElement, select: &DistrictSelect, restore: Option<&str>) {
    town.set_length(0);
    for option in select.options() {
        if let Ok(el) = HtmlOptionElement::new_with_text_and_value(&option.label, &option.value) {
            town.add_with_html_option_element(&el).ok();
        }
    }
    if let Some(value) = restore
        && select.options().iter().any(|o| o.value == value)
    {
        town.set_value(value);
    }
    town.set_disabled(select.disabled());
}

/// Bind `city` → `town`. With no towns URL the district dropdown is put in
/// its error state and nothing is bound.
pub fn bind(
    city: HtmlSelectElement,
    town: HtmlSelectElement,
    towns_url: Option<String>,
) -> Option<DistrictBinding> {
    let Some(towns_url) = towns_url.filter(|u| !u.is_empty()) else {
        web_sys::console::error_1(&"[district] towns URL not configured".into());
        render(&town, &DistrictSelect::misconfigured(), None);
        return None;
    };

    let placeholder = town.get_attribute("data-placeholder");
    let restore = Some(town.value()).filter(|v| !v.is_empty());
    let state = Rc::new(RefCell::new(Bound {
        town,
        select: DistrictSelect::new(placeholder.as_deref()),
        restore,
    }));

    let handler_state = state.clone();
    let city_el = city.clone();
    let on_change = Listener::new(city.as_ref(), "change", move |_: Event| {
        let requested = {
            let mut bound = handler_state.borrow_mut();
            let requested = bound.select.on_city_change(&city_el.value());
            render(&bound.town, &bound.select, None);
            requested
        };
        let Some(city_name) = requested else {
            return;
        };

        let on_success_state = handler_state.clone();
        let on_error_state = handler_state.clone();
        let success_city = city_name.clone();
        let error_city = city_name.clone();
        request::dispatch(
            RequestSpec::get(towns_url.clone()).param("city", city_name),
            Handlers {
                on_success: Box::new(move |payload: Payload| {
                    let result = payload.decode::<TownsResponse>();
                    apply(&on_success_state, &success_city, result);
                }),
                on_error: Box::new(move |e: RequestError| {
                    web_sys::console::error_1(
                        &format!("[district] loading towns for {error_city} failed: {e}").into(),
                    );
                    apply(&on_error_state, &error_city, Err(e));
                }),
                on_complete: None,
            },
        );
    })?;

    // A city already chosen (e.g. a form re-rendered with errors) loads its
    // districts through the same change path.
    if !city.value().is_empty()
        && let Ok(event) = Event::new("change")
    {
        city.dispatch_event(&event).ok();
    }

    Some(DistrictBinding {
        _on_change: on_change,
    })
}

fn apply(state: &Rc<RefCell<Bound>>, city: &str, result: Result<TownsResponse, RequestError>) {
    let mut bound = state.borrow_mut();
    if !bound.select.on_towns(city, result) {
        return;
    }
    let restore = bound.restore.take();
    render(&bound.town, &bound.select, restore.as_deref());
}
