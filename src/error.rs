use thiserror::Error;

pub type Result<T> = std::result::Result<T, BulwarkError>;

/// Errors raised while assembling the OpenAPI document.
///
/// Every variant describes a misconfigured application. None of them is
/// recoverable at runtime, so the document build aborts on the first one.
#[derive(Debug, Error)]
pub enum BulwarkError {
    #[error("Component schema '{name}' is already defined in the OpenAPI components")]
    ComponentCollision { name: String },

    #[error("Merging {field} is not supported")]
    UnsupportedMerge { field: String },

    #[error("Invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Invalid response declaration: {0}")]
    InvalidResponse(String),

    #[error("Unknown model '{model}': register it with AppBuilder::model")]
    UnknownModel { model: String },

    #[error("Operation {method} {path} is missing from the OpenAPI document")]
    OperationMissing { path: String, method: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BulwarkError {
    pub(crate) fn unsupported_merge(field: impl Into<String>) -> Self {
        Self::UnsupportedMerge {
            field: field.into(),
        }
    }

    pub(crate) fn invalid_model(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was caused by how the application was put together,
    /// as opposed to an internal serialization problem.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, BulwarkError::Serialization(_))
    }
}
