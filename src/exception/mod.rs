//! Uncaught failure handling.
//!
//! Everything that escapes request processing ends up here: errors returned by
//! a stage, panics, and handlers that give up with [`Unhandled`]. The
//! [`CatchAllLayer`] turns each of them into one uniform 500 response:
//!
//! ```text
//! {"detail": {"message": "...", "traceback": ["...", ...]}}
//! ```
//!
//! `traceback` is only present in debug mode.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;

pub mod http;
pub mod layer;

pub use http::InternalServerErrorFilter;
pub use layer::{CatchAllLayer, CatchAllMiddleware, LogSink};

/// The user-safe message returned when debug mode is off.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Unknown Internal Server Error. Please contact support and provide them with the details of your request.";

/// Payload of a caught failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<Vec<String>>,
}

/// The JSON body of every 500 produced by the catch-all layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

/// A failure caught while processing a request.
///
/// Holds the failure's display string and a formatted traceback: the error
/// itself, every `source()` in its chain, and the captured backtrace when
/// one is available (`RUST_BACKTRACE=1`).
#[derive(Debug, Clone)]
pub struct RequestFailure {
    message: String,
    traceback: Vec<String>,
}

impl RequestFailure {
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let message = error.to_string();
        let causes =
            std::iter::successors(error.source(), |&e| e.source()).map(|e| e.to_string());
        Self {
            traceback: chain_lines(&message, causes),
            message,
        }
    }

    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let message = error.to_string();
        let mut traceback = chain_lines(&message, error.chain().skip(1).map(|e| e.to_string()));
        traceback.extend(backtrace_lines(error.backtrace()));
        Self { message, traceback }
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        // The panicking stack is gone once the unwind is caught.
        Self {
            traceback: vec![format!("Panicked: {message}")],
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn traceback(&self) -> &[String] {
        &self.traceback
    }

    /// Remove a failure marker left on a response by [`Unhandled`]
    pub(crate) fn take_from(response: &mut Response) -> Option<Self> {
        response.extensions_mut().remove::<RequestFailure>()
    }
}

fn chain_lines(message: &str, causes: impl Iterator<Item = String>) -> Vec<String> {
    let mut lines = vec![format!("Error: {message}")];
    lines.extend(causes.map(|cause| format!("Caused by: {cause}")));
    lines
}

fn backtrace_lines(backtrace: &Backtrace) -> Vec<String> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    std::iter::once("Stack backtrace:".to_string())
        .chain(backtrace.to_string().lines().map(str::to_string))
        .collect()
}

/// A failure the handler does not know how to recover from.
///
/// Return it from handlers (or build it with `?`) to leave the response to
/// the catch-all layer:
///
/// ```rust,ignore
/// async fn report() -> Result<Json<Report>, Unhandled> {
///     let report = build_report().context("building report")?;
///     Ok(Json(report))
/// }
/// ```
///
/// Without a [`CatchAllLayer`] in the stack this renders as an empty 500.
#[derive(Debug)]
pub struct Unhandled(anyhow::Error);

impl Unhandled {
    pub fn into_inner(self) -> anyhow::Error {
        self.0
    }
}

impl<E> From<E> for Unhandled
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for Unhandled {
    fn into_response(self) -> Response {
        let failure = RequestFailure::from_anyhow(&self.0);
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

/// The ExceptionFilter trait
///
/// Filters turn a caught failure into the response sent to the client.
/// They must return a valid Response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch a failure and return a response
    fn catch(&self, failure: &RequestFailure) -> Response;
}
