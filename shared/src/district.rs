use serde::{Deserialize, Serialize};

use crate::locale;
use crate::request::RequestError;

/// `GET <towns_url>?city=<city>` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TownsResponse {
    #[serde(default)]
    pub towns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    fn blank(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: String::new(),
        }
    }

    fn town(name: &str) -> Self {
        Self {
            label: name.to_string(),
            value: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistrictState {
    Empty,
    Loading { city: String },
    Populated(Vec<String>),
    NoOptions,
    Error { url_missing: bool },
}

/// The district dropdown that depends on the selected city.
#[derive(Debug, Clone)]
pub struct DistrictSelect {
    state: DistrictState,
    placeholder: String,
}

impl DistrictSelect {
    pub fn new(placeholder: Option<&str>) -> Self {
        let placeholder = placeholder
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(locale::DISTRICT_PLACEHOLDER);
        Self {
            state: DistrictState::Empty,
            placeholder: placeholder.to_string(),
        }
    }

    /// A selector whose towns endpoint is not configured.
    pub fn misconfigured() -> Self {
        Self {
            state: DistrictState::Error { url_missing: true },
            placeholder: locale::DISTRICT_PLACEHOLDER.to_string(),
        }
    }

    pub fn state(&self) -> &DistrictState {
        &self.state
    }

    /// Returns the city to request districts for, if any.
    pub fn on_city_change(&mut self, city: &str) -> Option<String> {
        if matches!(self.state, DistrictState::Error { url_missing: true }) {
            return None;
        }
        let city = city.trim();
        if city.is_empty() {
            self.state = DistrictState::Empty;
            return None;
        }
        self.state = DistrictState::Loading {
            city: city.to_string(),
        };
        Some(city.to_string())
    }

    /// Apply a towns response. Responses for a city that is no longer
    /// loading are dropped; returns whether the response was applied.
    pub fn on_towns(&mut self, city: &str, result: Result<TownsResponse, RequestError>) -> bool {
        match &self.state {
            DistrictState::Loading { city: loading } if loading == city => {}
            _ => return false,
        }
        self.state = match result {
            Ok(resp) if resp.towns.is_empty() => DistrictState::NoOptions,
            Ok(resp) => DistrictState::Populated(resp.towns),
            Err(_) => DistrictState::Error { url_missing: false },
        };
        true
    }

    pub fn disabled(&self) -> bool {
        !matches!(self.state, DistrictState::Populated(_))
    }

    pub fn options(&self) -> Vec<SelectOption> {
        match &self.state {
            DistrictState::Empty => vec![SelectOption::blank(&self.placeholder)],
            DistrictState::Loading { .. } => vec![SelectOption::blank(locale::DISTRICT_LOADING)],
            DistrictState::Populated(towns) => {
                let mut options = Vec::with_capacity(towns.len() + 1);
                options.push(SelectOption::blank(&self.placeholder));
                options.extend(towns.iter().map(|t| SelectOption::town(t)));
                options
            }
            DistrictState::NoOptions => vec![
                SelectOption::blank(&self.placeholder),
                SelectOption::blank(locale::DISTRICT_NONE),
            ],
            DistrictState::Error { url_missing: true } => {
                vec![SelectOption::blank(locale::DISTRICT_URL_MISSING)]
            }
            DistrictState::Error { url_missing: false } => {
                vec![SelectOption::blank(locale::DISTRICT_FAILED)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(select: &DistrictSelect) -> Vec<String> {
        select.options().into_iter().map(|o| o.label).collect()
    }

    #[test]
    fn taipei_populates_placeholder_then_towns_in_order() {
        let mut select = DistrictSelect::new(None);
        assert_eq!(select.on_city_change("Taipei").as_deref(), Some("Taipei"));
        assert!(select.disabled());

        let applied = select.on_towns(
            "Taipei",
            Ok(TownsResponse {
                towns: vec!["Daan".into(), "Xinyi".into()],
            }),
        );
        assert!(applied);
        assert!(!select.disabled());

        let options = select.options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].value, "");
        assert_eq!(options[0].label, locale::DISTRICT_PLACEHOLDER);
        assert_eq!(options[1].value, "Daan");
        assert_eq!(options[2].value, "Xinyi");
    }

    #[test]
    fn clearing_city_returns_to_empty_without_request() {
        let mut select = DistrictSelect::new(Some("Pick one"));
        select.on_city_change("Taipei");
        assert_eq!(select.on_city_change(""), None);
        assert_eq!(select.state(), &DistrictState::Empty);
        assert_eq!(labels(&select), vec!["Pick one"]);
        assert!(select.disabled());
    }

    #[test]
    fn loading_clears_previous_options() {
        let mut select = DistrictSelect::new(None);
        select.on_city_change("Taipei");
        select.on_towns("Taipei", Ok(TownsResponse { towns: vec!["Daan".into()] }));
        select.on_city_change("Tainan");
        assert_eq!(labels(&select), vec![locale::DISTRICT_LOADING]);
    }

    #[test]
    fn empty_result_shows_sentinel_and_stays_disabled() {
        let mut select = DistrictSelect::new(None);
        select.on_city_change("Nowhere");
        select.on_towns("Nowhere", Ok(TownsResponse::default()));
        assert_eq!(select.state(), &DistrictState::NoOptions);
        assert!(select.disabled());
        assert_eq!(labels(&select).last().map(String::as_str), Some(locale::DISTRICT_NONE));
    }

    #[test]
    fn failure_shows_error_placeholder() {
        let mut select = DistrictSelect::new(None);
        select.on_city_change("Taipei");
        select.on_towns("Taipei", Err(RequestError::Network("offline".into())));
        assert!(select.disabled());
        assert_eq!(labels(&select), vec![locale::DISTRICT_FAILED]);
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut select = DistrictSelect::new(None);
        select.on_city_change("Taipei");
        select.on_city_change("Tainan");
        let applied = select.on_towns("Taipei", Ok(TownsResponse { towns: vec!["Daan".into()] }));
        assert!(!applied);
        assert_eq!(
            select.state(),
            &DistrictState::Loading {
                city: "Tainan".into()
            }
        );
    }

    #[test]
    fn misconfigured_selector_never_requests() {
        let mut select = DistrictSelect::misconfigured();
        assert_eq!(select.on_city_change("Taipei"), None);
        assert_eq!(labels(&select), vec![locale::DISTRICT_URL_MISSING]);
    }
}
