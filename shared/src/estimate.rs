//! Valuation estimate submission and task polling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::locale;
use crate::map::MapPayload;
use crate::request::RequestError;

pub fn task_status_url(task_id: &str) -> String {
    format!("/task-status/{task_id}/")
}

/// Response to posting the estimate form. The server answers with one of
/// several shapes; [`EstimateResponse::classify`] sorts them out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimateResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(flatten)]
    pub map: MapPayload,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    ValidationError,
    Redirect { url: String },
    Task { task_id: String },
    /// Synchronous estimate: the price and map data came back directly.
    Estimated { price: String, map: MapPayload },
    Rejected { message: String },
    Unrecognized,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn price_text(price: &Value) -> String {
    match price {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl EstimateResponse {
    pub fn classify(self) -> SubmitOutcome {
        match self.status.as_deref() {
            Some("validation_error") => return SubmitOutcome::ValidationError,
            Some("redirect") => {
                if let Some(url) = non_empty(self.url) {
                    return SubmitOutcome::Redirect { url };
                }
                return SubmitOutcome::Unrecognized;
            }
            _ => {}
        }

        if let Some(task_id) = non_empty(self.task_id) {
            return SubmitOutcome::Task { task_id };
        }

        match self.success {
            Some(true) => match self.price {
                Some(price) => SubmitOutcome::Estimated {
                    price: price_text(&price),
                    map: self.map,
                },
                None => SubmitOutcome::Unrecognized,
            },
            Some(false) => {
                let mut message = format!(
                    "{}{}",
                    locale::ESTIMATE_REJECTED_PREFIX,
                    non_empty(self.error).unwrap_or_else(|| locale::ESTIMATE_REJECTED_DEFAULT.into())
                );
                if let Some(errors) = self.errors.filter(|e| !e.is_null()) {
                    message.push('\n');
                    message.push_str(&errors.to_string());
                }
                SubmitOutcome::Rejected { message }
            }
            None => SubmitOutcome::Unrecognized,
        }
    }
}

/// `GET /task-status/<id>/` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Completed { redirect_url: String },
    Failed { message: String },
}

fn error_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

impl TaskStatus {
    pub fn classify(&self) -> PollStep {
        if self.status.as_deref() == Some("completed")
            && let Some(redirect_url) = self.redirect_url.as_ref().filter(|u| !u.is_empty())
        {
            return PollStep::Completed {
                redirect_url: redirect_url.clone(),
            };
        }

        let data_error = error_text(self.data.as_ref().and_then(|d| d.get("error")));
        if self.state.as_deref() == Some("FAILURE") || data_error.is_some() {
            let message = error_text(self.error.as_ref())
                .or(data_error)
                .unwrap_or_else(|| locale::ESTIMATE_LOCATE_FAILED.into());
            return PollStep::Failed { message };
        }

        PollStep::Continue
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimatePhase {
    Idle,
    Validating,
    Submitting,
    Processing { task_id: String },
    Completed { redirect_url: String },
    Failed { message: String },
}

/// Which face of the floating status card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCard {
    Hidden,
    Processing,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EstimateCommand {
    StartPolling { task_id: String },
    StopPolling,
    Navigate { url: String },
    Alert(String),
    /// Terminal task failure: error modal if the page has one, else alert.
    ShowFailure(String),
    ShowEstimate { price: String, map: MapPayload },
}

#[derive(Debug, Clone)]
pub struct EstimateFlow {
    phase: EstimatePhase,
    /// Phase to fall back to when client-side checks fail. Keeps a finished
    /// task's card and redirect until a new submission actually starts.
    before_validation: Option<EstimatePhase>,
    poll_in_flight: bool,
}

impl Default for EstimateFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateFlow {
    pub fn new() -> Self {
        Self {
            phase: EstimatePhase::Idle,
            before_validation: None,
            poll_in_flight: false,
        }
    }

    pub fn phase(&self) -> &EstimatePhase {
        &self.phase
    }

    /// The phase whose outcome is on display: while validating, the one
    /// that preceded it.
    fn settled_phase(&self) -> &EstimatePhase {
        match (&self.phase, &self.before_validation) {
            (EstimatePhase::Validating, Some(previous)) => previous,
            (phase, _) => phase,
        }
    }

    pub fn status_card(&self) -> StatusCard {
        match self.settled_phase() {
            EstimatePhase::Submitting | EstimatePhase::Processing { .. } => StatusCard::Processing,
            EstimatePhase::Completed { .. } => StatusCard::Completed,
            _ => StatusCard::Hidden,
        }
    }

    pub fn submit_busy(&self) -> bool {
        matches!(
            self.phase,
            EstimatePhase::Submitting | EstimatePhase::Processing { .. }
        )
    }

    pub fn submit_caption(&self) -> &'static str {
        if self.submit_busy() {
            locale::ESTIMATE_BUSY_CAPTION
        } else {
            locale::ESTIMATE_CAPTION
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.phase, EstimatePhase::Processing { .. })
    }

    /// Enter validation. Refused while a submission is already running.
    pub fn begin_validation(&mut self) -> bool {
        if self.submit_busy() {
            return false;
        }
        let previous = std::mem::replace(&mut self.phase, EstimatePhase::Validating);
        self.before_validation = Some(previous);
        true
    }

    /// Back to whatever was showing before the checks ran.
    pub fn validation_failed(&mut self) {
        if self.phase == EstimatePhase::Validating {
            self.phase = self
                .before_validation
                .take()
                .unwrap_or(EstimatePhase::Idle);
        }
    }

    pub fn begin_submit(&mut self) -> bool {
        if self.phase != EstimatePhase::Validating {
            return false;
        }
        self.phase = EstimatePhase::Submitting;
        self.before_validation = None;
        true
    }

    pub fn on_submit_response(
        &mut self,
        result: Result<EstimateResponse, RequestError>,
    ) -> Vec<EstimateCommand> {
        if self.phase != EstimatePhase::Submitting {
            return Vec::new();
        }
        self.phase = EstimatePhase::Idle;

        let outcome = match result {
            Ok(resp) => resp.classify(),
            Err(e) => {
                return vec![EstimateCommand::Alert(
                    e.user_message(locale::ESTIMATE_CONNECTION_FAILED),
                )];
            }
        };

        match outcome {
            SubmitOutcome::ValidationError => {
                vec![EstimateCommand::Alert(locale::ESTIMATE_INVALID.into())]
            }
            SubmitOutcome::Redirect { url } => vec![EstimateCommand::Navigate { url }],
            SubmitOutcome::Task { task_id } => {
                self.phase = EstimatePhase::Processing {
                    task_id: task_id.clone(),
                };
                self.poll_in_flight = false;
                vec![EstimateCommand::StartPolling { task_id }]
            }
            SubmitOutcome::Estimated { price, map } => {
                vec![EstimateCommand::ShowEstimate { price, map }]
            }
            SubmitOutcome::Rejected { message } => vec![EstimateCommand::Alert(message)],
            SubmitOutcome::Unrecognized => {
                vec![EstimateCommand::Alert(locale::ESTIMATE_CONNECTION_FAILED.into())]
            }
        }
    }

    /// Task id to poll on this tick; `None` once terminal or while the
    /// previous poll is still in flight.
    pub fn begin_poll(&mut self) -> Option<String> {
        match &self.phase {
            EstimatePhase::Processing { task_id } if !self.poll_in_flight => {
                self.poll_in_flight = true;
                Some(task_id.clone())
            }
            _ => None,
        }
    }

    pub fn on_poll(
        &mut self,
        task_id: &str,
        result: Result<TaskStatus, RequestError>,
    ) -> Vec<EstimateCommand> {
        match &self.phase {
            EstimatePhase::Processing { task_id: current } if current == task_id => {}
            _ => return Vec::new(),
        }
        self.poll_in_flight = false;

        let Ok(status) = result else {
            return Vec::new();
        };

        match status.classify() {
            PollStep::Continue => Vec::new(),
            PollStep::Completed { redirect_url } => {
                self.phase = EstimatePhase::Completed { redirect_url };
                vec![EstimateCommand::StopPolling]
            }
            PollStep::Failed { message } => {
                self.phase = EstimatePhase::Failed {
                    message: message.clone(),
                };
                vec![
                    EstimateCommand::StopPolling,
                    EstimateCommand::ShowFailure(message),
                ]
            }
        }
    }

    /// Stored redirect of a completed task, for a user-initiated navigation.
    pub fn redirect_target(&self) -> Option<&str> {
        match self.settled_phase() {
            EstimatePhase::Completed { redirect_url } => Some(redirect_url),
            _ => None,
        }
    }

    pub fn dismiss(&mut self) {
        if matches!(
            self.phase,
            EstimatePhase::Completed { .. } | EstimatePhase::Failed { .. }
        ) {
            self.phase = EstimatePhase::Idle;
        }
    }

    /// The page was shown again (e.g. from the back/forward cache).
    pub fn page_shown(&mut self) -> Vec<EstimateCommand> {
        let was_polling = self.is_polling();
        self.phase = EstimatePhase::Idle;
        self.before_validation = None;
        self.poll_in_flight = false;
        if was_polling {
            vec![EstimateCommand::StopPolling]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(value: Value) -> TaskStatus {
        serde_json::from_value(value).unwrap()
    }

    fn response(value: Value) -> EstimateResponse {
        serde_json::from_value(value).unwrap()
    }

    fn processing(task_id: &str) -> EstimateFlow {
        let mut flow = EstimateFlow::new();
        assert!(flow.begin_validation());
        assert!(flow.begin_submit());
        let commands = flow.on_submit_response(Ok(response(json!({ "task_id": task_id }))));
        assert_eq!(
            commands,
            vec![EstimateCommand::StartPolling {
                task_id: task_id.into()
            }]
        );
        flow
    }

    #[test]
    fn classify_submit_shapes() {
        assert_eq!(
            response(json!({ "status": "validation_error", "errors": {} })).classify(),
            SubmitOutcome::ValidationError
        );
        assert_eq!(
            response(json!({ "status": "redirect", "url": "/accounts/login/" })).classify(),
            SubmitOutcome::Redirect {
                url: "/accounts/login/".into()
            }
        );
        assert_eq!(
            response(json!({ "task_id": "abc" })).classify(),
            SubmitOutcome::Task {
                task_id: "abc".into()
            }
        );
        assert_eq!(response(json!({})).classify(), SubmitOutcome::Unrecognized);
    }

    #[test]
    fn synchronous_estimate_carries_price_and_map() {
        let outcome = response(json!({
            "success": true,
            "price": 1234.5,
            "target_coords": { "lat": 25.0, "lng": 121.5 },
            "nearby_houses": [{ "lat": 25.01, "lng": 121.51 }]
        }))
        .classify();
        let SubmitOutcome::Estimated { price, map } = outcome else {
            panic!("expected estimate, got {outcome:?}");
        };
        assert_eq!(price, "1234.5");
        assert!(map.target_coords.is_some());
        assert_eq!(map.nearby_houses.len(), 1);
    }

    #[test]
    fn rejected_estimate_message_includes_errors() {
        let outcome = response(json!({
            "success": false,
            "errors": { "area": ["required"] }
        }))
        .classify();
        let SubmitOutcome::Rejected { message } = outcome else {
            panic!("expected rejection");
        };
        assert!(message.starts_with(locale::ESTIMATE_REJECTED_PREFIX));
        assert!(message.contains(locale::ESTIMATE_REJECTED_DEFAULT));
        assert!(message.contains("area"));
    }

    #[test]
    fn classify_poll_results() {
        assert_eq!(
            status(json!({ "status": "completed", "redirect_url": "/result/42/" })).classify(),
            PollStep::Completed {
                redirect_url: "/result/42/".into()
            }
        );
        assert_eq!(
            status(json!({ "status": "completed" })).classify(),
            PollStep::Continue
        );
        assert_eq!(
            status(json!({ "state": "PENDING" })).classify(),
            PollStep::Continue
        );
        assert_eq!(
            status(json!({ "state": "FAILURE", "error": "geocoder down" })).classify(),
            PollStep::Failed {
                message: "geocoder down".into()
            }
        );
        assert_eq!(
            status(json!({ "state": "SUCCESS", "data": { "error": "no match" } })).classify(),
            PollStep::Failed {
                message: "no match".into()
            }
        );
        assert_eq!(
            status(json!({ "state": "FAILURE" })).classify(),
            PollStep::Failed {
                message: locale::ESTIMATE_LOCATE_FAILED.into()
            }
        );
        assert_eq!(
            status(json!({ "state": "SUCCESS", "data": { "error": null } })).classify(),
            PollStep::Continue
        );
    }

    #[test]
    fn completed_poll_stops_and_waits_for_user() {
        let mut flow = processing("t-1");
        assert_eq!(flow.status_card(), StatusCard::Processing);
        assert!(flow.submit_busy());

        assert_eq!(flow.begin_poll().as_deref(), Some("t-1"));
        let commands = flow.on_poll(
            "t-1",
            Ok(status(json!({ "status": "completed", "redirect_url": "/result/42/" }))),
        );

        assert_eq!(commands, vec![EstimateCommand::StopPolling]);
        assert!(
            !commands
                .iter()
                .any(|c| matches!(c, EstimateCommand::Navigate { .. }))
        );
        assert_eq!(flow.status_card(), StatusCard::Completed);
        assert!(!flow.submit_busy());
        assert_eq!(flow.redirect_target(), Some("/result/42/"));
    }

    #[test]
    fn no_poll_after_terminal_result() {
        let mut flow = processing("t-1");
        flow.begin_poll();
        flow.on_poll("t-1", Ok(status(json!({ "state": "FAILURE", "error": "x" }))));
        assert_eq!(flow.begin_poll(), None);
        assert_eq!(flow.begin_poll(), None);

        // A straggling response after the terminal one changes nothing.
        let commands = flow.on_poll(
            "t-1",
            Ok(status(json!({ "status": "completed", "redirect_url": "/r/" }))),
        );
        assert!(commands.is_empty());
        assert_eq!(flow.redirect_target(), None);
    }

    #[test]
    fn failure_stops_polling_once_and_hides_card() {
        let mut flow = processing("t-1");
        flow.begin_poll();
        let commands = flow.on_poll(
            "t-1",
            Ok(status(json!({ "state": "FAILURE", "error": "no match" }))),
        );
        let stops = commands
            .iter()
            .filter(|c| **c == EstimateCommand::StopPolling)
            .count();
        assert_eq!(stops, 1);
        assert!(commands.contains(&EstimateCommand::ShowFailure("no match".into())));
        assert_eq!(flow.status_card(), StatusCard::Hidden);
        assert!(!flow.submit_busy());
    }

    #[test]
    fn pending_and_transport_errors_keep_polling() {
        let mut flow = processing("t-1");
        flow.begin_poll();
        assert!(flow.on_poll("t-1", Ok(status(json!({ "state": "STARTED" })))).is_empty());
        assert_eq!(flow.begin_poll().as_deref(), Some("t-1"));
        assert!(
            flow.on_poll("t-1", Err(RequestError::Network("timeout".into())))
                .is_empty()
        );
        assert!(flow.is_polling());
        assert_eq!(flow.begin_poll().as_deref(), Some("t-1"));
    }

    #[test]
    fn overlapping_ticks_do_not_stack_requests() {
        let mut flow = processing("t-1");
        assert!(flow.begin_poll().is_some());
        assert_eq!(flow.begin_poll(), None);
    }

    #[test]
    fn submit_failures_return_to_idle() {
        for (result, expected) in [
            (
                Ok(response(json!({ "status": "validation_error" }))),
                locale::ESTIMATE_INVALID,
            ),
            (
                Err(RequestError::Network("offline".into())),
                locale::ESTIMATE_CONNECTION_FAILED,
            ),
        ] {
            let mut flow = EstimateFlow::new();
            flow.begin_validation();
            flow.begin_submit();
            let commands = flow.on_submit_response(result);
            assert_eq!(commands, vec![EstimateCommand::Alert(expected.into())]);
            assert_eq!(flow.phase(), &EstimatePhase::Idle);
            assert_eq!(flow.submit_caption(), locale::ESTIMATE_CAPTION);
        }
    }

    #[test]
    fn busy_flow_refuses_resubmission() {
        let mut flow = processing("t-1");
        assert!(!flow.begin_validation());
        assert!(flow.is_polling());
    }

    #[test]
    fn validation_failure_never_submits() {
        let mut flow = EstimateFlow::new();
        flow.begin_validation();
        flow.validation_failed();
        assert_eq!(flow.phase(), &EstimatePhase::Idle);
        assert!(!flow.begin_submit());
    }

    fn completed(task_id: &str, redirect_url: &str) -> EstimateFlow {
        let mut flow = processing(task_id);
        flow.begin_poll();
        flow.on_poll(
            task_id,
            Ok(status(json!({ "status": "completed", "redirect_url": redirect_url }))),
        );
        flow
    }

    #[test]
    fn failed_recheck_keeps_completed_card_and_redirect() {
        let mut flow = completed("t-1", "/result/42/");
        assert!(flow.begin_validation());
        assert_eq!(flow.status_card(), StatusCard::Completed);
        flow.validation_failed();

        assert_eq!(
            flow.phase(),
            &EstimatePhase::Completed {
                redirect_url: "/result/42/".into()
            }
        );
        assert_eq!(flow.status_card(), StatusCard::Completed);
        assert_eq!(flow.redirect_target(), Some("/result/42/"));
        assert!(!flow.submit_busy());
    }

    #[test]
    fn new_submission_replaces_completed_task() {
        let mut flow = completed("t-1", "/result/42/");
        assert!(flow.begin_validation());
        assert!(flow.begin_submit());
        assert_eq!(flow.status_card(), StatusCard::Processing);
        assert_eq!(flow.redirect_target(), None);

        flow.on_submit_response(Ok(response(json!({ "status": "validation_error" }))));
        assert_eq!(flow.phase(), &EstimatePhase::Idle);
        assert_eq!(flow.redirect_target(), None);
    }

    #[test]
    fn server_error_message_reaches_the_alert() {
        let mut flow = EstimateFlow::new();
        flow.begin_validation();
        flow.begin_submit();
        let commands = flow.on_submit_response(Err(RequestError::Status {
            status: 500,
            body: json!({ "success": false, "error": "系統維護中，無法進行估價" }),
        }));
        assert_eq!(
            commands,
            vec![EstimateCommand::Alert("系統維護中，無法進行估價".into())]
        );
        assert_eq!(flow.phase(), &EstimatePhase::Idle);
    }

    #[test]
    fn page_shown_resets_transient_state() {
        let mut flow = processing("t-1");
        assert_eq!(flow.page_shown(), vec![EstimateCommand::StopPolling]);
        assert_eq!(flow.status_card(), StatusCard::Hidden);
        assert!(!flow.submit_busy());
        assert!(flow.page_shown().is_empty());
    }
}
