use crate::exception::{
    ErrorBody, ErrorDetail, ExceptionFilter, GENERIC_ERROR_MESSAGE, RequestFailure,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// The default exception filter: a 500 with an [`ErrorBody`].
///
/// With `debug` off the message is always [`GENERIC_ERROR_MESSAGE`] and no
/// traceback is sent. With `debug` on the failure's own message and
/// traceback are exposed.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalServerErrorFilter {
    debug: bool,
}

impl InternalServerErrorFilter {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn detail(&self, failure: &RequestFailure) -> ErrorDetail {
        if self.debug {
            ErrorDetail {
                message: failure.message().to_string(),
                traceback: Some(failure.traceback().to_vec()),
            }
        } else {
            ErrorDetail {
                message: GENERIC_ERROR_MESSAGE.to_string(),
                traceback: None,
            }
        }
    }
}

impl ExceptionFilter for InternalServerErrorFilter {
    fn catch(&self, failure: &RequestFailure) -> Response {
        let body = ErrorBody {
            detail: self.detail(failure),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
