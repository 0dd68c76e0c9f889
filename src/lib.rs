//! # Bulwark
//!
//! Uniform failure handling and OpenAPI error documentation for axum
//! applications.
//!
//! - **Catch-all layer**: every failure that escapes request processing
//!   (stage errors, panics, unhandled handler errors) becomes one logged 500
//!   response with a fixed JSON body. Debug mode exposes the message and a
//!   traceback.
//! - **Dependencies**: per-route checks that run before the handler and
//!   document the error responses they can produce.
//! - **OpenAPI enrichment**: dependency error responses are merged into each
//!   operation and every operation documents the catch-all 500.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bulwark::prelude::*;
//!
//! struct ApiKey;
//!
//! #[async_trait]
//! impl Dependency for ApiKey {
//!     async fn resolve(&self, parts: &Parts) -> DependencyResult {
//!         match parts.headers.get("x-api-key") {
//!             Some(_) => Ok(()),
//!             None => Err(DependencyError::Unauthorized("missing api key".into())),
//!         }
//!     }
//!
//!     fn declared_responses(&self) -> Option<&dyn DeclaresErrorResponses> {
//!         Some(self)
//!     }
//! }
//!
//! impl DeclaresErrorResponses for ApiKey {
//!     fn error_responses(&self) -> ErrorResponses {
//!         ErrorResponses::new().with(401, ResponseDecl::new("Unauthorized"))
//!     }
//! }
//!
//! async fn ping() -> &'static str {
//!     "pong"
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::builder()
//!         .config(AppConfig::from_env())
//!         .interceptor(TraceInterceptor)
//!         .route(RouteSpec::get("/ping").depends(ApiKey), ping)
//!         .build();
//!
//!     // Fail fast on a misconfigured document.
//!     app.openapi().await?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app.router()).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod dependency;
pub mod error;
pub mod exception;
pub mod interceptor;
pub mod openapi;

#[cfg(test)]
mod test_support;

// Re-export core types
pub use app::{App, AppBuilder, HttpMethod, RouteSpec};
pub use config::{AppConfig, ConfigService};
pub use error::{BulwarkError, Result};
pub use exception::{CatchAllLayer, LogSink, Unhandled};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use bulwark::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{App, AppBuilder, HttpMethod, RouteSpec};
    pub use crate::config::{AppConfig, ConfigService};
    pub use crate::dependency::{
        DeclaresErrorResponses, Dependency, DependencyError, DependencyNode, DependencyResult,
    };
    pub use crate::error::{BulwarkError, Result};
    pub use crate::exception::{
        CatchAllLayer, ErrorBody, ErrorDetail, ExceptionFilter, LogSink, RequestFailure, Unhandled,
    };
    pub use crate::interceptor::{Interceptor, InterceptorResult, Next, TraceInterceptor};
    pub use crate::openapi::{ErrorResponses, ModelRef, Parameter, ResponseDecl};
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        http::{StatusCode, request::Parts},
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
