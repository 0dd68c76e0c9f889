//! Request-time dependencies.
//!
//! A route declares a tree of dependencies. Before the handler runs, every
//! node is resolved against the request (sub-dependencies before their
//! parent). A dependency may also document how it fails by exposing
//! [`DeclaresErrorResponses`]; those responses are merged into the route's
//! OpenAPI operation.

use crate::exception::Unhandled;
use crate::openapi::ErrorResponses;
use async_trait::async_trait;
use axum::{
    Json,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

mod layer;

pub use layer::{DependencyLayer, DependencyMiddleware};

/// Standard Result type for dependencies
/// Ok(()) means the request may proceed
pub type DependencyResult = Result<(), DependencyError>;

#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The dependency itself broke. Reported as an uncaught failure.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl IntoResponse for DependencyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            DependencyError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            DependencyError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            DependencyError::Rejected { status, message } => (status, message),
            DependencyError::Failed(error) => return Unhandled::from(error).into_response(),
        };
        (status, Json(json!({ "detail": message }))).into_response()
    }
}

/// Capability of a dependency that documents its failure responses.
///
/// ```rust,ignore
/// impl DeclaresErrorResponses for ApiKey {
///     fn error_responses(&self) -> ErrorResponses {
///         ErrorResponses::new().with(401, ResponseDecl::new("Unauthorized"))
///     }
/// }
/// ```
pub trait DeclaresErrorResponses: Send + Sync {
    fn error_responses(&self) -> ErrorResponses;
}

/// The Dependency trait
/// Implement this to run per-request checks before a handler
#[async_trait]
pub trait Dependency: Send + Sync + 'static {
    async fn resolve(&self, parts: &Parts) -> DependencyResult;

    /// Return `Some(self)` when the dependency implements
    /// [`DeclaresErrorResponses`].
    fn declared_responses(&self) -> Option<&dyn DeclaresErrorResponses> {
        None
    }
}

/// A node in a route's dependency tree
#[derive(Clone, Default)]
pub struct DependencyNode {
    call: Option<Arc<dyn Dependency>>,
    dependencies: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn new<D: Dependency>(dependency: D) -> Self {
        Self::from_arc(Arc::new(dependency))
    }

    pub fn from_arc(dependency: Arc<dyn Dependency>) -> Self {
        Self {
            call: Some(dependency),
            dependencies: Vec::new(),
        }
    }

    /// A node with no callable of its own, only sub-dependencies
    pub fn group() -> Self {
        Self::default()
    }

    pub fn depends_on(mut self, node: DependencyNode) -> Self {
        self.dependencies.push(node);
        self
    }

    pub fn call(&self) -> Option<&Arc<dyn Dependency>> {
        self.call.as_ref()
    }

    pub fn dependencies(&self) -> &[DependencyNode] {
        &self.dependencies
    }

    /// Callables in resolution order: sub-dependencies first, in
    /// declaration order, then the node itself.
    pub fn resolution_order(&self) -> Vec<Arc<dyn Dependency>> {
        let mut order = Vec::new();
        self.collect(&mut order);
        order
    }

    fn collect(&self, order: &mut Vec<Arc<dyn Dependency>>) {
        for sub in &self.dependencies {
            sub.collect(order);
        }
        if let Some(call) = &self.call {
            order.push(call.clone());
        }
    }
}
