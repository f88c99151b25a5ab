//! Request timing and counting.
//!
//! Every request passing through [`instrument_requests`] is timed from
//! before dispatch to after the handler returns. The response carries the
//! elapsed time and a short request id as headers.

use axum::{
    body::HttpBody as _,
    extract::{MatchedPath, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use shared::storage::TimeSeriesStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::HandlerFault;

/// Response header carrying the elapsed time in seconds.
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// State captured before a request is dispatched.
///
/// Inserted into the request extensions so handlers can read the id.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Short opaque identifier of the request.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Endpoint name derived from the matched route.
    pub endpoint: String,
    /// When the before-hook ran.
    pub started: Instant,
}

/// What the after-hook hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTiming {
    /// Request id from the before-hook.
    pub request_id: String,
    /// Time from the before-hook to the after-hook.
    pub elapsed: Duration,
}

impl ResponseTiming {
    /// Elapsed seconds with millisecond precision, as sent in the header.
    #[must_use]
    pub fn response_time_header(&self) -> String {
        format!("{:.3}", self.elapsed.as_secs_f64())
    }
}

/// Before and after hooks writing request observations into the store.
#[derive(Debug, Clone)]
pub struct RequestInstrumentation {
    store: Arc<TimeSeriesStore>,
}

impl RequestInstrumentation {
    /// Creates hooks writing into `store`.
    #[must_use]
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Records the start of a request and returns its context.
    pub fn before(&self, method: &Method, endpoint: impl Into<String>, path: &str) -> RequestContext {
        let endpoint = endpoint.into();
        self.store.record(
            "http.requests.started",
            1.0,
            [
                ("method", method.as_str()),
                ("endpoint", endpoint.as_str()),
                ("path", path),
            ],
        );

        RequestContext {
            request_id: new_request_id(),
            method: method.to_string(),
            endpoint,
            started: Instant::now(),
        }
    }

    /// Records the completion of a request.
    ///
    /// Returns `None` and records nothing when `context` is missing.
    pub fn after(
        &self,
        context: Option<&RequestContext>,
        status: StatusCode,
        response_size: Option<u64>,
        fault: Option<&HandlerFault>,
    ) -> Option<ResponseTiming> {
        let context = context?;
        let elapsed = context.started.elapsed();
        let endpoint = context.endpoint.as_str();
        let status_code = status.as_u16().to_string();
        let status_class = format!("{}xx", status.as_u16() / 100);

        self.record_request(endpoint, elapsed, status);
        self.store.record(
            "http.request.duration",
            elapsed.as_secs_f64(),
            [
                ("method", context.method.as_str()),
                ("endpoint", endpoint),
                ("status_code", status_code.as_str()),
                ("status_class", status_class.as_str()),
            ],
        );

        if let Some(size) = response_size {
            #[allow(clippy::cast_precision_loss)]
            let size = size as f64;
            self.store
                .record("http.response.size", size, [("endpoint", endpoint)]);
        }

        if let Some(fault) = fault {
            self.store.record(
                "http.errors.count",
                1.0,
                [("error_type", fault.kind), ("endpoint", endpoint)],
            );
        }

        Some(ResponseTiming {
            request_id: context.request_id.clone(),
            elapsed,
        })
    }

    /// Records one completed call of an endpoint.
    pub fn record_request(&self, endpoint: &str, duration: Duration, status: StatusCode) {
        let status_code = status.as_u16().to_string();
        let tags = [("endpoint", endpoint), ("status_code", status_code.as_str())];

        self.store.record(
            format!("api.{endpoint}.response_time"),
            duration.as_secs_f64(),
            tags,
        );
        self.store
            .record(format!("api.{endpoint}.requests"), 1.0, tags);
    }
}

/// Derives an endpoint name from a matched route pattern.
///
/// `/api/overview` becomes `api_overview`, `/` becomes `root`, and an
/// unmatched request is `unknown`.
#[must_use]
pub fn endpoint_name(matched: Option<&str>) -> String {
    match matched {
        None => "unknown".to_string(),
        Some(path) => {
            let trimmed = path.trim_start_matches('/');
            if trimmed.is_empty() {
                "root".to_string()
            } else {
                trimmed.replace('/', "_")
            }
        }
    }
}

fn new_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn response_size(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| response.body().size_hint().exact())
}

/// Axum middleware timing every request.
pub async fn instrument_requests(
    State(instrumentation): State<RequestInstrumentation>,
    mut request: Request,
    next: Next,
) -> Response {
    let endpoint = endpoint_name(
        request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
    );
    let context = instrumentation.before(request.method(), endpoint, request.uri().path());
    request.extensions_mut().insert(context.clone());

    let mut response = next.run(request).await;

    let size = response_size(&response);
    let fault = response.extensions().get::<HandlerFault>().cloned();
    let timing = instrumentation.after(Some(&context), response.status(), size, fault.as_ref());

    if let Some(timing) = timing {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&timing.response_time_header()) {
            headers.insert(RESPONSE_TIME_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&timing.request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }

    response
}
