use crate::dependency::{Dependency, DependencyNode};
use crate::openapi::document::default_operation_id;
use crate::openapi::{ErrorResponses, OperationDoc, Parameter, ResponseDecl, StatusKey};
use axum::routing::MethodFilter;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Lowercase name, as used for OpenAPI path item keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }

    pub(crate) fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
            HttpMethod::Head => MethodFilter::HEAD,
            HttpMethod::Options => MethodFilter::OPTIONS,
            HttpMethod::Trace => MethodFilter::TRACE,
        }
    }
}

/// A route as seen by both the router and the OpenAPI document.
///
/// ```rust,ignore
/// let spec = RouteSpec::get("/users/{id}")
///     .summary("Fetch a user")
///     .param(Parameter::path("id", json!({ "type": "integer" })))
///     .depends(ApiKey)
///     .response(404, ResponseDecl::new("Not Found"));
/// ```
#[derive(Clone)]
pub struct RouteSpec {
    pub(crate) path: String,
    pub(crate) methods: Vec<HttpMethod>,
    operation_id: Option<String>,
    summary: Option<String>,
    tags: Vec<String>,
    parameters: Vec<Parameter>,
    success_status: StatusKey,
    success: ResponseDecl,
    responses: ErrorResponses,
    pub(crate) dependencies: Vec<DependencyNode>,
    pub(crate) hidden: bool,
}

impl RouteSpec {
    pub fn new(path: impl Into<String>, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        let mut unique = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }

        Self {
            path: path.into(),
            methods: unique,
            operation_id: None,
            summary: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            success_status: StatusKey::from(200u16),
            success: ResponseDecl::new("Successful Response")
                .content("application/json", json!({})),
            responses: ErrorResponses::new(),
            dependencies: Vec::new(),
            hidden: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path, [HttpMethod::Get])
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path, [HttpMethod::Post])
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(path, [HttpMethod::Put])
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(path, [HttpMethod::Patch])
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path, [HttpMethod::Delete])
    }

    /// Override the generated `operationId`. With several methods the
    /// method name is appended to keep ids unique.
    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Replace the default `200` response
    pub fn success(mut self, status: impl Into<StatusKey>, response: ResponseDecl) -> Self {
        self.success_status = status.into();
        self.success = response;
        self
    }

    /// Document an additional response of the route itself
    pub fn response(mut self, status: impl Into<StatusKey>, response: ResponseDecl) -> Self {
        self.responses.insert(status, response);
        self
    }

    /// Add a top-level dependency
    pub fn depends<D: Dependency>(self, dependency: D) -> Self {
        self.depends_on(DependencyNode::new(dependency))
    }

    /// Add a top-level dependency tree
    pub fn depends_on(mut self, node: DependencyNode) -> Self {
        self.dependencies.push(node);
        self
    }

    /// Serve the route but leave it out of the OpenAPI document
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub(crate) fn method_filter(&self) -> Option<MethodFilter> {
        self.methods
            .iter()
            .map(HttpMethod::filter)
            .reduce(MethodFilter::or)
    }

    /// One document operation per method, in declaration order
    pub(crate) fn operation_docs(&self) -> Vec<OperationDoc> {
        let several = self.methods.len() > 1;
        self.methods
            .iter()
            .map(|method| {
                let method = method.as_str();
                let operation_id = match &self.operation_id {
                    Some(id) if several => format!("{id}_{method}"),
                    Some(id) => id.clone(),
                    None => default_operation_id(method, &self.path),
                };
                OperationDoc {
                    path: self.path.clone(),
                    method: method.to_string(),
                    operation_id,
                    summary: self.summary.clone(),
                    tags: self.tags.clone(),
                    parameters: self.parameters.clone(),
                    success_status: self.success_status.clone(),
                    success: self.success.clone(),
                    responses: self.responses.clone(),
                }
            })
            .collect()
    }
}
