//! Leaflet map of the valued property and its comparables.

use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use js_sys::{Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use smartval_shared::map::{
    COMPARABLE_COLOR, COMPARABLE_FILL_OPACITY, COMPARABLE_RADIUS_PX, COMPARABLE_WEIGHT_PX,
    CLUSTER_ICON_SIZE_PX, ClusterSize, DEFAULT_ZOOM, LatLng, MAX_CLUSTER_RADIUS_PX, MapPayload,
    MarkerPlan, TARGET_ICON_ANCHOR_PX, TARGET_ICON_CLASS, TARGET_ICON_HTML, TARGET_ICON_SIZE_PX,
    TARGET_POPUP_ANCHOR_PX, TARGET_Z_INDEX_OFFSET, TILE_ATTRIBUTION, TILE_URL, cluster_icon_html,
    plan_markers,
};
use smartval_shared::timing::MAP_INVALIDATE_DELAY_MS;

use crate::dom;

#[wasm_bindgen]
extern "C" {
    #[derive(Clone)]
    type LeafletMap;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    fn leaflet_map(container_id: &str) -> Result<LeafletMap, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &LeafletMap, center: &JsValue, zoom: f64) -> LeafletMap;

    #[wasm_bindgen(method)]
    fn remove(this: &LeafletMap);

    #[wasm_bindgen(method, js_name = invalidateSize)]
    fn invalidate_size(this: &LeafletMap);

    #[wasm_bindgen(method, js_name = addLayer)]
    fn add_layer(this: &LeafletMap, layer: &Layer);

    type Layer;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &Layer, map: &LeafletMap) -> Layer;

    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &Layer, html: &str) -> Layer;

    #[wasm_bindgen(method, js_name = openPopup)]
    fn open_popup(this: &Layer) -> Layer;

    #[wasm_bindgen(method, js_name = addLayer)]
    fn add_child(this: &Layer, child: &Layer) -> Layer;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    fn tile_layer(url: &str, options: &JsValue) -> Layer;

    #[wasm_bindgen(js_namespace = L, js_name = marker)]
    fn marker(at: &JsValue, options: &JsValue) -> Layer;

    #[wasm_bindgen(js_namespace = L, js_name = divIcon)]
    fn div_icon(options: &JsValue) -> JsValue;

    #[wasm_bindgen(js_namespace = L, js_name = circleMarker)]
    fn circle_marker(at: &JsValue, options: &JsValue) -> Layer;

    #[wasm_bindgen(catch, js_namespace = L, js_name = markerClusterGroup)]
    fn marker_cluster_group(options: &JsValue) -> Result<Layer, JsValue>;

    type MarkerCluster;

    #[wasm_bindgen(method, js_name = getChildCount)]
    fn get_child_count(this: &MarkerCluster) -> u32;
}

#[derive(Serialize)]
struct TileOptions {
    attribution: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DivIconOptions {
    class_name: String,
    html: String,
    icon_size: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_anchor: Option<[i32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    popup_anchor: Option<[i32; 2]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CircleOptions {
    color: &'static str,
    fill_color: &'static str,
    fill_opacity: f64,
    radius: u32,
    weight: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterOptions {
    spiderfy_on_max_zoom: bool,
    show_coverage_on_hover: bool,
    zoom_to_bounds_on_click: bool,
    max_cluster_radius: u32,
}

const CIRCLE_OPTIONS: CircleOptions = CircleOptions {
    color: COMPARABLE_COLOR,
    fill_color: COMPARABLE_COLOR,
    fill_opacity: COMPARABLE_FILL_OPACITY,
    radius: COMPARABLE_RADIUS_PX,
    weight: COMPARABLE_WEIGHT_PX,
};

const CLUSTER_OPTIONS: ClusterOptions = ClusterOptions {
    spiderfy_on_max_zoom: true,
    show_coverage_on_hover: false,
    zoom_to_bounds_on_click: true,
    max_cluster_radius: MAX_CLUSTER_RADIUS_PX,
};

type ClusterIconFn = Closure<dyn Fn(MarkerCluster) -> JsValue>;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    serde_wasm_bindgen::to_value(value).map_err(|e| format!("options encoding failed: {e}"))
}

fn lat_lng(at: LatLng) -> Result<JsValue, String> {
    to_js(&[at.lat, at.lng])
}

fn leaflet_global(name: &str) -> Option<JsValue> {
    let window = dom::window()?;
    let leaflet = Reflect::get(window.as_ref(), &JsValue::from_str("L")).ok()?;
    if leaflet.is_undefined() || leaflet.is_null() {
        return None;
    }
    let member = Reflect::get(&leaflet, &JsValue::from_str(name)).ok()?;
    member.is_instance_of::<Function>().then_some(member)
}

fn cluster_icon(cluster: MarkerCluster) -> JsValue {
    let count = cluster.get_child_count();
    let options = DivIconOptions {
        class_name: ClusterSize::for_count(count).class_name().to_string(),
        html: cluster_icon_html(count),
        icon_size: CLUSTER_ICON_SIZE_PX,
        icon_anchor: None,
        popup_anchor: None,
    };
    match to_js(&options) {
        Ok(options) => div_icon(&options),
        Err(e) => {
            web_sys::console::warn_1(&format!("[map] cluster icon: {e}").into());
            JsValue::UNDEFINED
        }
    }
}

struct LiveMap {
    map: LeafletMap,
    _cluster_icon: Option<ClusterIconFn>,
    _invalidate: Timeout,
}

/// Owns at most one live map; rendering again disposes the previous one.
#[derive(Default)]
pub struct MapOverlay {
    live: Option<LiveMap>,
}

impl MapOverlay {
    pub fn dispose(&mut self) {
        if let Some(live) = self.live.take() {
            live.map.remove();
        }
    }

    /// Draw `payload` into `#container_id`. Missing target coordinates, a
    /// missing container or an unloaded Leaflet are logged and skipped.
    pub fn render(&mut self, container_id: &str, payload: &MapPayload, price_text: Option<&str>) {
        self.dispose();

        let Some(plan) = plan_markers(payload, price_text) else {
            web_sys::console::warn_1(&"[map] no usable target coordinates".into());
            return;
        };
        if dom::by_id::<Element>(container_id).is_none() {
            web_sys::console::warn_1(&format!("[map] container #{container_id} not found").into());
            return;
        }
        if leaflet_global("map").is_none() {
            web_sys::console::warn_1(&"[map] Leaflet not loaded".into());
            return;
        }

        match draw(container_id, &plan) {
            Ok(live) => {
                web_sys::console::info_1(
                    &format!(
                        "[map] {} comparables drawn, {} skipped",
                        plan.comparables.len(),
                        plan.skipped
                    )
                    .into(),
                );
                self.live = Some(live);
            }
            Err(e) => web_sys::console::error_1(&format!("[map] render failed: {e}").into()),
        }
    }
}

impl Drop for MapOverlay {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn draw(container_id: &str, plan: &MarkerPlan) -> Result<LiveMap, String> {
    let map = leaflet_map(container_id).map_err(|e| format!("L.map: {e:?}"))?;
    map.set_view(&lat_lng(plan.target)?, DEFAULT_ZOOM);
    tile_layer(
        TILE_URL,
        &to_js(&TileOptions {
            attribution: TILE_ATTRIBUTION,
        })?,
    )
    .add_to(&map);

    let invalidate_map = map.clone();
    let invalidate = Timeout::new(MAP_INVALIDATE_DELAY_MS, move || {
        invalidate_map.invalidate_size();
    });

    let icon = div_icon(&to_js(&DivIconOptions {
        class_name: TARGET_ICON_CLASS.to_string(),
        html: TARGET_ICON_HTML.to_string(),
        icon_size: TARGET_ICON_SIZE_PX,
        icon_anchor: Some(TARGET_ICON_ANCHOR_PX),
        popup_anchor: Some(TARGET_POPUP_ANCHOR_PX),
    })?);
    let marker_options = Object::new();
    Reflect::set(&marker_options, &JsValue::from_str("icon"), &icon)
        .map_err(|e| format!("marker options: {e:?}"))?;
    Reflect::set(
        &marker_options,
        &JsValue::from_str("zIndexOffset"),
        &JsValue::from(TARGET_Z_INDEX_OFFSET),
    )
    .map_err(|e| format!("marker options: {e:?}"))?;
    marker(&lat_lng(plan.target)?, &marker_options)
        .add_to(&map)
        .bind_popup(&plan.target_popup_html)
        .open_popup();

    if plan.comparables.is_empty() {
        return Ok(LiveMap {
            map,
            _cluster_icon: None,
            _invalidate: invalidate,
        });
    }

    let circle_options = to_js(&CIRCLE_OPTIONS)?;
    let circles = plan
        .comparables
        .iter()
        .map(|c| -> Result<Layer, String> {
            let circle = circle_marker(&lat_lng(c.at)?, &circle_options);
            circle.bind_popup(&c.popup_html);
            Ok(circle)
        })
        .collect::<Result<Vec<Layer>, String>>()?;

    let cluster_icon_fn: Option<ClusterIconFn> = if leaflet_global("markerClusterGroup").is_some() {
        let icon_fn = ClusterIconFn::new(cluster_icon);
        let options = to_js(&CLUSTER_OPTIONS)?;
        Reflect::set(
            &options,
            &JsValue::from_str("iconCreateFunction"),
            icon_fn.as_ref(),
        )
        .map_err(|e| format!("cluster options: {e:?}"))?;
        let group = marker_cluster_group(&options).map_err(|e| format!("cluster: {e:?}"))?;
        for circle in &circles {
            group.add_child(circle);
        }
        map.add_layer(&group);
        Some(icon_fn)
    } else {
        web_sys::console::warn_1(&"[map] marker cluster plugin missing; adding markers directly".into());
        for circle in &circles {
            map.add_layer(circle);
        }
        None
    };

    Ok(LiveMap {
        map,
        _cluster_icon: cluster_icon_fn,
        _invalidate: invalidate,
    })
}

/// Map data embedded in a result page, if any.
pub fn embedded_payload() -> Option<MapPayload> {
    let script = dom::by_id::<Element>(dom::MAP_DATA_ID)?;
    let raw = script.text_content()?;
    match serde_json::from_str::<MapPayload>(&raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            web_sys::console::error_1(&format!("[map] #{} is not valid: {e}", dom::MAP_DATA_ID).into());
            None
        }
    }
}

/// The displayed predicted price, quoted in the target popup.
pub fn displayed_price() -> Option<String> {
    dom::by_id::<Element>(dom::PREDICTED_PRICE_ID)?.text_content()
}

thread_local! {
    /// The one overlay drawing into the page's `#map`.
    static PAGE_MAP: RefCell<MapOverlay> = RefCell::new(MapOverlay::default());
}

fn with_page_map<R>(f: impl FnOnce(&mut MapOverlay) -> R) -> R {
    PAGE_MAP.with(|slot| f(&mut slot.borrow_mut()))
}

/// Draw into the page's `#map`, replacing whatever map it showed.
pub fn show(payload: &MapPayload, price_text: Option<&str>) {
    with_page_map(|overlay| overlay.render(dom::MAP_CONTAINER_ID, payload, price_text));
}

/// Render the map of a result page from its embedded data.
pub fn init_result_page() {
    let Some(payload) = embedded_payload() else {
        return;
    };
    show(&payload, displayed_price().as_deref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_caller_shares_one_overlay() {
        let first = with_page_map(|overlay| overlay as *const MapOverlay);
        let second = with_page_map(|overlay| overlay as *const MapOverlay);
        assert_eq!(first, second);
        assert!(with_page_map(|overlay| overlay.live.is_none()));
    }

    #[test]
    fn disposing_an_empty_overlay_is_a_no_op() {
        let mut overlay = MapOverlay::default();
        overlay.dispose();
        assert!(overlay.live.is_none());
    }
}
