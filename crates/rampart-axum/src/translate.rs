//! Translation of engine verdicts into HTTP responses.
//!
//! Every interruption, however malformed, maps to a valid response: a
//! `deny` keeps its own status when that status is a real HTTP code and
//! falls back to 403 otherwise; every other action gets the gateway's
//! configured blocking status. Block responses are marked with an
//! `X-WAF-Blocked: true` header so upstream proxies and tests can tell a
//! gateway block from an application 403.

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rampart_core::Interruption;
use serde::Serialize;

/// Marker header carried by every block response.
pub const BLOCKED_HEADER: HeaderName = HeaderName::from_static("x-waf-blocked");

/// Wire shape of block and error payloads.
#[derive(Debug, Serialize)]
struct VerdictBody {
    code: i32,
    msg: String,
}

/// Maps an interruption to the response status.
pub fn status_for(interruption: &Interruption, fallback: StatusCode) -> StatusCode {
    if interruption.is_deny() {
        interruption
            .status
            .and_then(|status| StatusCode::from_u16(status).ok())
            .unwrap_or(StatusCode::FORBIDDEN)
    } else {
        fallback
    }
}

/// Builds the response for a blocked request.
pub fn blocked_response(status: StatusCode, message: &str) -> Response {
    let mut response = (
        status,
        Json(VerdictBody {
            code: 0,
            msg: message.to_owned(),
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(BLOCKED_HEADER, HeaderValue::from_static("true"));
    response
}

/// Builds the response for a gateway-side failure.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(VerdictBody {
            code: 0,
            msg: message.to_owned(),
        }),
    )
        .into_response()
}
