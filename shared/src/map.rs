use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::locale;

pub const DEFAULT_ZOOM: f64 = 15.0;
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
pub const MAX_CLUSTER_RADIUS_PX: u32 = 80;
pub const TARGET_Z_INDEX_OFFSET: i32 = 1000;
pub const COMPARABLE_COLOR: &str = "rgb(220, 38, 38)";
pub const COMPARABLE_RADIUS_PX: u32 = 8;
pub const COMPARABLE_FILL_OPACITY: f64 = 0.7;
pub const COMPARABLE_WEIGHT_PX: u32 = 2;

pub const TARGET_ICON_CLASS: &str = "custom-target-marker";
pub const TARGET_ICON_HTML: &str =
    "<div class=\"target-marker-pin\"><span class=\"target-marker-glyph\">🏠</span></div>";
pub const TARGET_ICON_SIZE_PX: [u32; 2] = [40, 40];
pub const TARGET_ICON_ANCHOR_PX: [i32; 2] = [20, 40];
pub const TARGET_POPUP_ANCHOR_PX: [i32; 2] = [0, -40];

pub const CLUSTER_ICON_SIZE_PX: [u32; 2] = [40, 40];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Coordinates as sent by the server; either half may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Coordinates {
    pub fn point(&self) -> Option<LatLng> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(LatLng { lat, lng })
            }
            _ => None,
        }
    }
}

/// A comparable sold property near the target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NearbyHouse {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub area: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub distance_km: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPayload {
    #[serde(default)]
    pub target_coords: Option<Coordinates>,
    #[serde(default)]
    pub nearby_houses: Vec<NearbyHouse>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparableMarker {
    pub at: LatLng,
    pub popup_html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPlan {
    pub target: LatLng,
    pub target_popup_html: String,
    pub comparables: Vec<ComparableMarker>,
    /// Comparables dropped for missing coordinates.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterSize {
    Small,
    Medium,
    Large,
}

impl ClusterSize {
    pub fn for_count(count: u32) -> Self {
        match count {
            0..=4 => Self::Small,
            5..=9 => Self::Medium,
            _ => Self::Large,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Self::Small => "marker-cluster marker-cluster-small",
            Self::Medium => "marker-cluster marker-cluster-medium",
            Self::Large => "marker-cluster marker-cluster-large",
        }
    }
}

/// Inner markup of a cluster bubble.
pub fn cluster_icon_html(count: u32) -> String {
    format!("<div class=\"marker-cluster-count\">{count}</div>")
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Popup text for a loosely-typed field, `N/A` when absent or empty.
fn display_value(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        locale::NOT_AVAILABLE.to_string()
    } else {
        escape_html(&text)
    }
}

pub fn target_popup_html(price_text: Option<&str>) -> String {
    let price = price_text
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(escape_html)
        .unwrap_or_else(|| locale::MAP_UNKNOWN_PRICE.to_string());
    format!(
        "<div class=\"map-popup map-popup-target\"><b>{}</b><br>{}: <b>{} {}</b></div>",
        locale::MAP_TARGET_TITLE,
        locale::MAP_PREDICTED_PRICE,
        price,
        locale::UNIT_TEN_THOUSAND,
    )
}

pub fn comparable_popup_html(house: &NearbyHouse) -> String {
    let address = house
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(escape_html)
        .unwrap_or_else(|| locale::MAP_UNKNOWN_ADDRESS.to_string());
    format!(
        "<div class=\"map-popup\"><b>{address}</b><hr>\
         {}: <b>{}</b> {}<br>\
         {}: {} {}<br>\
         {}: {}<br>\
         {}: {} {}<br>\
         <span class=\"map-popup-distance\">{}: {} km</span></div>",
        locale::MAP_PRICE,
        display_value(house.price.as_ref()),
        locale::UNIT_TEN_THOUSAND,
        locale::MAP_AREA,
        display_value(house.area.as_ref()),
        locale::UNIT_PING,
        locale::MAP_TYPE,
        display_value(house.kind.as_ref()),
        locale::MAP_AGE,
        display_value(house.age.as_ref()),
        locale::UNIT_YEARS,
        locale::MAP_DISTANCE,
        display_value(house.distance_km.as_ref()),
    )
}

/// Lay out the markers for a payload. `None` when there is no usable target.
pub fn plan_markers(payload: &MapPayload, price_text: Option<&str>) -> Option<MarkerPlan> {
    let target = payload.target_coords.as_ref()?.point()?;

    let mut comparables = Vec::with_capacity(payload.nearby_houses.len());
    let mut skipped = 0;
    for house in &payload.nearby_houses {
        let coords = Coordinates {
            lat: house.lat,
            lng: house.lng,
        };
        let Some(at) = coords.point() else {
            skipped += 1;
            continue;
        };
        comparables.push(ComparableMarker {
            at,
            popup_html: comparable_popup_html(house),
        });
    }

    Some(MarkerPlan {
        target,
        target_popup_html: target_popup_html(price_text),
        comparables,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparables_missing_coordinates_are_skipped() {
        let payload: MapPayload = serde_json::from_value(json!({
            "target_coords": { "lat": 25.03, "lng": 121.56 },
            "nearby_houses": [
                { "lat": 25.04, "lng": 121.55, "address": "信義路", "price": 1800 },
                { "lat": 25.05, "address": "no lng" },
                { "address": "no coords" },
                { "lat": 25.02, "lng": 121.57 }
            ]
        }))
        .unwrap();

        let plan = plan_markers(&payload, Some("1,234")).unwrap();
        assert_eq!(plan.target, LatLng { lat: 25.03, lng: 121.56 });
        assert_eq!(plan.comparables.len(), 2);
        assert_eq!(plan.skipped, 2);
        assert!(plan.target_popup_html.contains("1,234"));
    }

    #[test]
    fn missing_target_yields_no_plan() {
        let payload: MapPayload = serde_json::from_value(json!({
            "target_coords": {},
            "nearby_houses": [{ "lat": 1.0, "lng": 2.0 }]
        }))
        .unwrap();
        assert!(plan_markers(&payload, None).is_none());
        assert!(plan_markers(&MapPayload::default(), None).is_none());
    }

    #[test]
    fn zero_coordinates_are_valid() {
        let coords = Coordinates {
            lat: Some(0.0),
            lng: Some(0.0),
        };
        assert_eq!(coords.point(), Some(LatLng { lat: 0.0, lng: 0.0 }));
        let nan = Coordinates {
            lat: Some(f64::NAN),
            lng: Some(1.0),
        };
        assert_eq!(nan.point(), None);
    }

    #[test]
    fn cluster_size_thresholds() {
        assert_eq!(ClusterSize::for_count(1), ClusterSize::Small);
        assert_eq!(ClusterSize::for_count(4), ClusterSize::Small);
        assert_eq!(ClusterSize::for_count(5), ClusterSize::Medium);
        assert_eq!(ClusterSize::for_count(9), ClusterSize::Medium);
        assert_eq!(ClusterSize::for_count(10), ClusterSize::Large);
        assert!(ClusterSize::Large.class_name().ends_with("marker-cluster-large"));
        assert!(cluster_icon_html(12).contains(">12<"));
    }

    #[test]
    fn comparable_popup_escapes_and_defaults() {
        let house = NearbyHouse {
            address: Some("<script>".into()),
            price: Some(json!(1500)),
            kind: Some(json!("")),
            ..NearbyHouse::default()
        };
        let html = comparable_popup_html(&house);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<b>1500</b>"));
        assert!(html.contains(&format!("{}: {}", locale::MAP_TYPE, locale::NOT_AVAILABLE)));
    }

    #[test]
    fn target_popup_without_price_uses_placeholder() {
        assert!(target_popup_html(None).contains(locale::MAP_UNKNOWN_PRICE));
        assert!(target_popup_html(Some("  ")).contains(locale::MAP_UNKNOWN_PRICE));
    }
}
