//! Application assembly.
//!
//! [`App`] owns the routes, the processing stages and the OpenAPI document.
//! Its router always has the same shape:
//!
//! ```text
//! HandleErrorLayer         <- residual transport errors, bare 500
//!   CatchAllLayer          <- every failure from below becomes a 500 body
//!     InterceptorLayer     <- last registered interceptor first
//!       Router             <- routes, each behind its DependencyLayer
//! ```

use crate::config::{AppConfig, normalize_route_path};
use crate::dependency::{DependencyLayer, DependencyNode};
use crate::error::Result;
use crate::exception::{CatchAllLayer, LogSink, Unhandled};
use crate::interceptor::{Interceptor, InterceptorLayer};
use crate::openapi::enrich::ensure_component_name_free;
use crate::openapi::{DocumentBuilder, ModelRegistry, OperationRef, enrich};
use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    handler::Handler,
    http::StatusCode,
    routing::{MethodRouter, get, on},
};
use schemars::JsonSchema;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower::ServiceBuilder;

mod route;

pub use route::{HttpMethod, RouteSpec};

/// Builder for [`App`]
///
/// # Example
///
/// ```rust,ignore
/// let app = App::builder()
///     .config(AppConfig::from_env())
///     .route(RouteSpec::get("/ping").depends(ApiKey), ping)
///     .interceptor(TraceInterceptor)
///     .build();
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app.router()).await?;
/// ```
pub struct AppBuilder {
    config: AppConfig,
    router: Router,
    routes: Vec<RouteSpec>,
    interceptors: Vec<Box<dyn Interceptor>>,
    models: ModelRegistry,
    component_schemas: Vec<(String, Value)>,
    logger: LogSink,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            router: Router::new(),
            routes: Vec::new(),
            interceptors: Vec::new(),
            models: ModelRegistry::new(),
            component_schemas: Vec::new(),
            logger: LogSink::Current,
        }
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Where to serve the document; `None` or a blank path disables the route
    pub fn openapi_url(mut self, url: Option<&str>) -> Self {
        self.config.openapi_url = url.and_then(normalize_route_path);
        self
    }

    /// Register a route and its handler
    pub fn route<H, T>(mut self, spec: RouteSpec, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let Some(filter) = spec.method_filter() else {
            tracing::warn!(path = %spec.path(), "route has no methods; skipped");
            return self;
        };

        let mut method_router: MethodRouter = on(filter, handler);
        if !spec.dependencies.is_empty() {
            method_router = method_router.layer(DependencyLayer::new(&spec.dependencies));
        }

        tracing::debug!(path = %spec.path(), methods = ?spec.methods(), "route registered");
        self.router = self.router.route(spec.path(), method_router);
        self.routes.push(spec);
        self
    }

    /// Add a processing stage. The last one added is the outermost.
    pub fn interceptor<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    /// Make a model available to `"model": "<name>"` response declarations
    pub fn model<T: JsonSchema>(self) -> Self {
        self.models.register::<T>();
        self
    }

    /// Seed `components.schemas` of the document
    pub fn component_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.component_schemas.push((name.into(), schema));
        self
    }

    /// Where the catch-all layer logs caught failures
    pub fn logger(mut self, logger: LogSink) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> App {
        let mut builder = DocumentBuilder::new(&self.config.title, &self.config.version);
        let mut targets = Vec::new();

        for spec in self.routes.iter().filter(|spec| !spec.hidden) {
            for operation in spec.operation_docs() {
                targets.push(DocumentTarget {
                    path: operation.path.clone(),
                    method: operation.method.clone(),
                    dependencies: spec.dependencies.clone(),
                });
                builder = builder.operation(operation);
            }
        }
        for (name, schema) in self.component_schemas {
            builder = builder.component_schema(name, schema);
        }

        let mut interceptors = self.interceptors;
        interceptors.reverse();

        App {
            config: self.config,
            routes: self.router,
            interceptors: InterceptorLayer::new(interceptors),
            logger: self.logger,
            document: Arc::new(DocumentState {
                builder,
                targets,
                models: self.models,
                cache: OnceCell::new(),
            }),
        }
    }
}

struct DocumentTarget {
    path: String,
    method: String,
    dependencies: Vec<DependencyNode>,
}

struct DocumentState {
    builder: DocumentBuilder,
    targets: Vec<DocumentTarget>,
    models: ModelRegistry,
    cache: OnceCell<Arc<Value>>,
}

impl DocumentState {
    async fn get(&self) -> Result<Arc<Value>> {
        self.cache
            .get_or_try_init(|| async { self.build() })
            .await
            .cloned()
    }

    fn build(&self) -> Result<Arc<Value>> {
        tracing::debug!(operations = self.targets.len(), "building OpenAPI document");

        // Checked before any operation is materialized.
        ensure_component_name_free(&self.builder.skeleton())?;

        let mut document = self.builder.build(&self.models)?;
        let operations = self.targets.iter().map(|target| OperationRef {
            path: &target.path,
            method: &target.method,
            dependencies: &target.dependencies,
        });
        enrich(&mut document, operations, &self.models)?;

        tracing::info!(operations = self.targets.len(), "OpenAPI document built");
        Ok(Arc::new(document))
    }
}

/// An application: routes, processing stages and their OpenAPI document
#[derive(Clone)]
pub struct App {
    config: AppConfig,
    routes: Router,
    interceptors: InterceptorLayer,
    logger: LogSink,
    document: Arc<DocumentState>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The enriched OpenAPI document.
    ///
    /// Built on first use and cached; later calls return the same document.
    /// A failed build is not cached.
    pub async fn openapi(&self) -> Result<Arc<Value>> {
        self.document.get().await
    }

    /// The axum router, with the catch-all layer outermost
    pub fn router(&self) -> Router {
        let mut routes = self.routes.clone();
        // `AppConfig` fields may be set directly.
        let url = self.config.openapi_url.as_deref().and_then(normalize_route_path);
        if let Some(url) = url {
            let document = self.document.clone();
            routes = routes.route(&url, get(move || serve_openapi(document.clone())));
        }

        let stack = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_residual_error))
            .layer(CatchAllLayer::new(self.config.debug).logger(self.logger.clone()))
            .layer(self.interceptors.clone())
            .service(routes);

        Router::new().fallback_service(stack)
    }
}

async fn serve_openapi(
    document: Arc<DocumentState>,
) -> std::result::Result<Json<Value>, Unhandled> {
    let document = document.get().await?;
    Ok(Json(Value::clone(&document)))
}

async fn handle_residual_error(_error: BoxError) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}
