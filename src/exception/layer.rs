use crate::exception::{ExceptionFilter, InternalServerErrorFilter, RequestFailure};
use axum::{
    BoxError,
    body::Body,
    http::{Request, header},
    response::Response,
};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Dispatch;

/// Where the catch-all layer reports caught failures
#[derive(Clone, Debug, Default)]
pub enum LogSink {
    /// Do not log
    Disabled,
    /// Log through whatever dispatcher is current when the failure happens
    #[default]
    Current,
    /// Log through a specific dispatcher
    Dispatch(Dispatch),
}

impl LogSink {
    fn report(&self, failure: &RequestFailure) {
        match self {
            LogSink::Disabled => {}
            LogSink::Current => emit(failure),
            LogSink::Dispatch(dispatch) => {
                tracing::dispatcher::with_default(dispatch, || emit(failure))
            }
        }
    }
}

fn emit(failure: &RequestFailure) {
    tracing::error!(
        traceback = ?failure.traceback(),
        "Uncaught exception: {}",
        failure.message()
    );
}

/// Tower Layer that converts every uncaught failure into a 500 response.
///
/// The layer only protects what it wraps. Install it as the outermost
/// stage; [`crate::App`] does this automatically.
///
/// ```text
/// CatchAllLayer            <- sees failures from every stage below
///   InterceptorLayer
///     Router
/// ```
///
/// A stage wrapped *around* the catch-all layer is outside its reach and its
/// failures propagate unchanged.
#[derive(Clone)]
pub struct CatchAllLayer {
    filter: Arc<dyn ExceptionFilter>,
    logger: LogSink,
}

impl Default for CatchAllLayer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl CatchAllLayer {
    pub fn new(debug: bool) -> Self {
        Self {
            filter: Arc::new(InternalServerErrorFilter::new(debug)),
            logger: LogSink::Current,
        }
    }

    pub fn logger(mut self, logger: LogSink) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the response builder; the default is [`InternalServerErrorFilter`]
    pub fn filter<F: ExceptionFilter>(mut self, filter: F) -> Self {
        self.filter = Arc::new(filter);
        self
    }
}

impl<S> Layer<S> for CatchAllLayer {
    type Service = CatchAllMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CatchAllMiddleware {
            inner,
            filter: self.filter.clone(),
            logger: self.logger.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CatchAllMiddleware<S> {
    inner: S,
    filter: Arc<dyn ExceptionFilter>,
    logger: LogSink,
}

impl<S> Service<Request<Body>> for CatchAllMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
{
    type Response = Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Call the instance `poll_ready` was driven on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        // Upgraded connections are not request/response exchanges.
        if is_websocket_upgrade(&request) {
            return Box::pin(async move { inner.call(request).await.map_err(Into::into) });
        }

        let filter = self.filter.clone();
        let logger = self.logger.clone();

        Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { inner.call(request).await })
                .catch_unwind()
                .await;

            let failure = match outcome {
                Ok(Ok(mut response)) => match RequestFailure::take_from(&mut response) {
                    Some(failure) => failure,
                    None => return Ok(response),
                },
                Ok(Err(error)) => {
                    let error: BoxError = error.into();
                    RequestFailure::from_error(&*error)
                }
                Err(panic) => RequestFailure::from_panic(panic),
            };

            logger.report(&failure);
            Ok(filter.catch(&failure))
        })
    }
}

fn is_websocket_upgrade<B>(request: &Request<B>) -> bool {
    let header_value = |name| {
        request
            .headers()
            .get(name)
            .and_then(|v: &header::HeaderValue| v.to_str().ok())
    };

    let upgrade =
        header_value(header::UPGRADE).is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
    let connection = header_value(header::CONNECTION).is_some_and(|v| {
        v.split(',')
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    });
    upgrade && connection
}
