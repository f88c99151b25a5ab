//! HTTP middleware.

mod instrumentation;

pub use instrumentation::{
    endpoint_name, instrument_requests, RequestContext, RequestInstrumentation, ResponseTiming,
    REQUEST_ID_HEADER, RESPONSE_TIME_HEADER,
};
