//! AJAX helper: every call carries `X-Requested-With`, state-changing calls
//! carry the CSRF token, and failures of any kind come back as
//! [`RequestError`] rather than escaping to the caller.

use gloo_net::http::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen_futures::spawn_local;
use web_sys::{FormData, UrlSearchParams};

use smartval_shared::request::{
    CSRF_FIELD, CSRF_HEADER, ContentKind, Method, Payload, REQUESTED_WITH_HEADER,
    REQUESTED_WITH_VALUE, RequestError, append_query,
};

use crate::dom;

pub enum Body {
    Empty,
    Form(FormData),
    Json(Value),
}

pub struct RequestSpec {
    url: String,
    method: Method,
    params: Vec<(String, String)>,
    body: Body,
}

impl RequestSpec {
    fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            params: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, Method::Get)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url, Method::Post)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn form(mut self, data: FormData) -> Self {
        self.body = Body::Form(data);
        self
    }

    // No current page sends a JSON body.
    #[allow(dead_code)]
    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    fn full_url(&self) -> Result<String, RequestError> {
        if self.params.is_empty() {
            return Ok(self.url.clone());
        }
        let search = UrlSearchParams::new()
            .map_err(|e| RequestError::Network(format!("query encoding failed: {e:?}")))?;
        for (key, value) in &self.params {
            search.append(key, value);
        }
        let query: String = search.to_string().into();
        Ok(append_query(&self.url, &query))
    }
}

fn transport_method(method: Method) -> gloo_net::http::Method {
    use gloo_net::http::Method as M;
    match method {
        Method::Get => M::GET,
        Method::Head => M::HEAD,
        Method::Options => M::OPTIONS,
        Method::Post => M::POST,
        Method::Put => M::PUT,
        Method::Patch => M::PATCH,
        Method::Delete => M::DELETE,
    }
}

async fn decode(response: &Response) -> Result<Payload, RequestError> {
    let content_type = response.headers().get("content-type");
    match ContentKind::from_header(content_type.as_deref()) {
        ContentKind::Json => response
            .json::<Value>()
            .await
            .map(Payload::Json)
            .map_err(|e| RequestError::UnexpectedPayload(format!("invalid JSON: {e}"))),
        ContentKind::Text => response
            .text()
            .await
            .map(Payload::Text)
            .map_err(|e| RequestError::Network(format!("body read failed: {e}"))),
    }
}

/// Perform one request and decode its body by content type.
pub async fn send(spec: RequestSpec) -> Result<Payload, RequestError> {
    let url = spec.full_url()?;
    let csrf = dom::csrf_token();

    let mut builder = RequestBuilder::new(&url)
        .method(transport_method(spec.method))
        .header("Accept", "application/json")
        .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE);
    if !spec.method.is_safe()
        && let Some(token) = csrf.as_deref()
    {
        builder = builder.header(CSRF_HEADER, token);
    }

    let body = if spec.method.allows_body() {
        spec.body
    } else {
        Body::Empty
    };
    let request = match body {
        Body::Empty => builder.build(),
        Body::Form(data) => {
            if let Some(token) = csrf.as_deref()
                && !data.has(CSRF_FIELD)
            {
                data.append_with_str(CSRF_FIELD, token).ok();
            }
            builder.body(data)
        }
        Body::Json(value) => builder.json(&value),
    }
    .map_err(|e| RequestError::Network(format!("request build failed: {e}")))?;

    let response = request
        .send()
        .await
        .map_err(|e| RequestError::Network(format!("fetch error: {e}")))?;

    let payload = decode(&response).await?;
    if !response.ok() {
        return Err(RequestError::from_status(response.status(), payload));
    }
    Ok(payload)
}

/// [`send`], then decode the JSON body into `T`.
pub async fn send_json<T: DeserializeOwned>(spec: RequestSpec) -> Result<T, RequestError> {
    send(spec).await?.decode()
}

/// Callback form of [`send`]: exactly one of `on_success`/`on_error` runs,
/// then `on_complete` if set.
pub struct Handlers {
    pub on_success: Box<dyn FnOnce(Payload)>,
    pub on_error: Box<dyn FnOnce(RequestError)>,
    pub on_complete: Option<Box<dyn FnOnce()>>,
}

fn settle(outcome: Result<Payload, RequestError>, handlers: Handlers) {
    let Handlers {
        on_success,
        on_error,
        on_complete,
    } = handlers;
    match outcome {
        Ok(payload) => on_success(payload),
        Err(e) => on_error(e),
    }
    if let Some(on_complete) = on_complete {
        on_complete();
    }
}

pub fn dispatch(spec: RequestSpec, handlers: Handlers) {
    spawn_local(async move {
        let outcome = send(spec).await;
        if let Err(e) = &outcome {
            web_sys::console::warn_1(&format!("[request] failed: {e}").into());
        }
        settle(outcome, handlers);
    });
}

/// `FormData` of a form, or `None` when the browser refuses.
pub fn form_data(form: &web_sys::HtmlFormElement) -> Option<FormData> {
    FormData::new_with_form(form).ok()
}

/// A single text field of a `FormData`.
pub fn form_value(data: &FormData, name: &str) -> Option<String> {
    data.get(name).as_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(log: &Rc<RefCell<Vec<String>>>, with_complete: bool) -> Handlers {
        let success_log = log.clone();
        let error_log = log.clone();
        let complete_log = log.clone();
        Handlers {
            on_success: Box::new(move |payload: Payload| {
                success_log.borrow_mut().push(format!("success {payload:?}"));
            }),
            on_error: Box::new(move |e: RequestError| {
                error_log.borrow_mut().push(format!("error {e}"));
            }),
            on_complete: with_complete.then(|| -> Box<dyn FnOnce()> {
                Box::new(move || complete_log.borrow_mut().push("complete".into()))
            }),
        }
    }

    #[test]
    fn success_runs_success_then_complete() {
        let log = Rc::new(RefCell::new(Vec::new()));
        settle(Ok(Payload::Text("ok".into())), recording(&log, true));
        assert_eq!(
            *log.borrow(),
            vec!["success Text(\"ok\")".to_string(), "complete".to_string()]
        );
    }

    #[test]
    fn failure_runs_error_then_complete() {
        let log = Rc::new(RefCell::new(Vec::new()));
        settle(
            Err(RequestError::Network("offline".into())),
            recording(&log, true),
        );
        assert_eq!(
            *log.borrow(),
            vec![
                "error network error: offline".to_string(),
                "complete".to_string()
            ]
        );
    }

    #[test]
    fn complete_is_optional() {
        let log = Rc::new(RefCell::new(Vec::new()));
        settle(
            Err(RequestError::UnexpectedPayload("html".into())),
            recording(&log, false),
        );
        assert_eq!(log.borrow().len(), 1);
    }
}
