use crate::dependency::{Dependency, DependencyNode};
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer resolving a route's dependencies before its handler
#[derive(Clone)]
pub struct DependencyLayer {
    resolvers: Arc<Vec<Arc<dyn Dependency>>>,
}

impl DependencyLayer {
    pub fn new(nodes: &[DependencyNode]) -> Self {
        let resolvers = nodes.iter().flat_map(DependencyNode::resolution_order).collect();
        Self {
            resolvers: Arc::new(resolvers),
        }
    }
}

impl<S> Layer<S> for DependencyLayer {
    type Service = DependencyMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DependencyMiddleware {
            inner,
            resolvers: self.resolvers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DependencyMiddleware<S> {
    inner: S,
    resolvers: Arc<Vec<Arc<dyn Dependency>>>,
}

impl<S> Service<Request<Body>> for DependencyMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let resolvers = self.resolvers.clone();
        // Call the instance `poll_ready` was driven on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            for dependency in resolvers.iter() {
                if let Err(rejection) = dependency.resolve(&parts).await {
                    return Ok(rejection.into_response());
                }
            }
            inner.call(Request::from_parts(parts, body)).await
        })
    }
}
