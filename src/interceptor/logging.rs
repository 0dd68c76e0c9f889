use crate::interceptor::{Interceptor, InterceptorResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request};
use std::time::Instant;

/// An interceptor that logs request timing and status
#[derive(Clone, Default)]
pub struct TraceInterceptor;

#[async_trait]
impl Interceptor for TraceInterceptor {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let start = Instant::now();

        tracing::debug!(%method, %uri, "request started");

        match next.run(request).await {
            Ok(response) => {
                tracing::info!(
                    %method,
                    %uri,
                    status = response.status().as_u16(),
                    elapsed = ?start.elapsed(),
                    "request finished"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    %method,
                    %uri,
                    error = %e,
                    elapsed = ?start.elapsed(),
                    "request failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorLayer;
    use crate::test_support::{CapturedLogs, get};
    use axum::response::Response;
    use tower::{BoxError, Layer, ServiceExt, service_fn};

    #[tokio::test]
    async fn test_logs_finished_request() {
        let logs = CapturedLogs::default();
        let _guard = tracing::dispatcher::set_default(&logs.dispatch());

        let service = InterceptorLayer::new(vec![Box::new(TraceInterceptor)]).layer(service_fn(
            |_req: Request<Body>| async { Ok::<_, BoxError>(Response::new(Body::empty())) },
        ));
        service.oneshot(get("/items?page=2")).await.unwrap();

        let contents = logs.contents();
        assert!(contents.contains("request finished"));
        assert!(contents.contains("/items?page=2"));
        assert!(contents.contains("status=200"));
    }

    #[tokio::test]
    async fn test_passes_failures_through() {
        let logs = CapturedLogs::default();
        let _guard = tracing::dispatcher::set_default(&logs.dispatch());

        let service = InterceptorLayer::new(vec![Box::new(TraceInterceptor)]).layer(service_fn(
            |_req: Request<Body>| async { Err::<Response, BoxError>("Boom!".into()) },
        ));
        let error = service.oneshot(get("/boom")).await.unwrap_err();

        assert_eq!(error.to_string(), "Boom!");
        assert!(logs.contents().contains("request failed"));
    }
}
