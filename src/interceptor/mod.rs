//! Request-processing stages.
//!
//! An [`Interceptor`] sees every request on its way in and every response
//! (or failure) on its way out. Stages registered on an [`crate::App`] are
//! nested so that the last registered stage is the outermost one:
//!
//! ```text
//! app.interceptor(A).interceptor(B)
//!
//!   request  -> B -> A -> router
//!   response <- B <- A <- router
//! ```
//!
//! A stage may fail by returning `Err`. The failure keeps travelling outward
//! until the catch-all layer turns it into a 500.

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

pub mod layer;
pub mod logging;

pub use layer::{InterceptorLayer, InterceptorMiddleware};
pub use logging::TraceInterceptor;

/// standard return type for Interceptors
pub type InterceptorResult = Result<Response, InterceptorError>;

/// A type-erased error for interceptors
pub type InterceptorError = Box<dyn std::error::Error + Send + Sync>;

type BoxedFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;
type BoxedRun = Box<dyn FnOnce(Request<Body>) -> BoxedFuture + Send>;

/// Represents the next handler in the chain
pub struct Next {
    run: BoxedRun,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> Pin<Box<dyn Future<Output = InterceptorResult> + Send>>
            + Send
            + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the next handler
    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// The Interceptor trait
///
/// # Example
/// ```rust,ignore
/// struct RequireJson;
///
/// #[async_trait]
/// impl Interceptor for RequireJson {
///     async fn intercept(&self, req: Request<Body>, next: Next) -> InterceptorResult {
///         if req.headers().get(CONTENT_TYPE).is_none() {
///             return Err("missing content type".into());
///         }
///         next.run(req).await
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
