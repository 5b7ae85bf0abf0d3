use crate::param::BindingSource;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Misconfiguration detected while a handler is being registered.
///
/// Every variant is fatal to startup: the handler is never turned into an endpoint.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("parameter #{index} has no name")]
    UnnamedParameter { index: usize },

    #[error("parameter `{name}` declares conflicting bindings: {first} and {second}")]
    ConflictingAnnotations { name: String, first: BindingSource, second: BindingSource },

    #[error("parameter `{name}` of type `{type_name}` cannot be bound {source_kind}: {reason}")]
    UnsupportedAnnotation { name: String, type_name: &'static str, source_kind: BindingSource, reason: &'static str },

    #[error("handler reads the request body twice, through `{first}` and `{second}`")]
    MultipleBodyParameters { first: String, second: String },

    #[error("handler takes {expected} parameters but {actual} were described")]
    ParameterCountMismatch { expected: usize, actual: usize },

    #[error("handler declares {arity} parameters, the limit is {max}")]
    ArityExceeded { arity: usize, max: usize },

    #[error("no binder applies to parameter `{name}` of type `{type_name}`")]
    NoApplicableBinder { name: String, type_name: &'static str },
}

impl ConfigError {
    pub fn unsupported_annotation(
        name: impl Into<String>,
        type_name: &'static str,
        source_kind: BindingSource,
        reason: &'static str,
    ) -> Self {
        Self::UnsupportedAnnotation { name: name.into(), type_name, source_kind, reason }
    }

    pub fn no_applicable_binder(name: impl Into<String>, type_name: &'static str) -> Self {
        Self::NoApplicableBinder { name: name.into(), type_name }
    }
}

/// Failure that aborts a single request and escapes to the host.
///
/// Bad input never ends up here, it is answered with `400 Bad Request` instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("service `{type_name}` is not registered")]
    ServiceResolution { type_name: &'static str },

    #[error("service registered as `{type_name}` resolved to another type")]
    ServiceType { type_name: &'static str },

    #[error("failed to serialize response: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl DispatchError {
    pub fn service_resolution(type_name: &'static str) -> Self {
        Self::ServiceResolution { type_name }
    }

    pub fn service_type(type_name: &'static str) -> Self {
        Self::ServiceType { type_name }
    }
}

/// Reasons a request body could not produce a parameter value.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("request body has been consumed")]
    Consumed,

    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {reason}")]
    Io { reason: String },

    #[error("request body is empty")]
    Empty,

    #[error("malformed request body: {source}")]
    Malformed {
        #[from]
        source: serde_json::Error,
    },

    #[error("`{type_name}` cannot be read from a request body")]
    Unsupported { type_name: &'static str },
}

impl BodyError {
    pub fn io<S: ToString>(reason: S) -> Self {
        Self::Io { reason: reason.to_string() }
    }

    pub fn unsupported(type_name: &'static str) -> Self {
        Self::Unsupported { type_name }
    }
}
