//! Registration-time parameter metadata.

use crate::bindable::DeclaredType;
use crate::error::ConfigError;
use std::borrow::Cow;
use std::fmt;

/// Where a parameter explicitly asks to be bound from.
///
/// Route, query and header sources may rename the key that is looked up; by default it is the
/// parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    FromRoute { name: Option<Cow<'static, str>> },
    FromQuery { name: Option<Cow<'static, str>> },
    FromHeader { name: Option<Cow<'static, str>> },
    FromBody { allow_empty: bool },
    FromService,
}

impl BindingSource {
    fn key_override(&self) -> Option<&str> {
        match self {
            BindingSource::FromRoute { name } | BindingSource::FromQuery { name } | BindingSource::FromHeader { name } => {
                name.as_deref()
            }
            BindingSource::FromBody { .. } | BindingSource::FromService => None,
        }
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingSource::FromRoute { name: Some(name) } => write!(f, "from route value `{name}`"),
            BindingSource::FromRoute { name: None } => f.write_str("from route"),
            BindingSource::FromQuery { name: Some(name) } => write!(f, "from query value `{name}`"),
            BindingSource::FromQuery { name: None } => f.write_str("from query"),
            BindingSource::FromHeader { name: Some(name) } => write!(f, "from header `{name}`"),
            BindingSource::FromHeader { name: None } => f.write_str("from header"),
            BindingSource::FromBody { allow_empty: true } => f.write_str("from body (empty allowed)"),
            BindingSource::FromBody { allow_empty: false } => f.write_str("from body"),
            BindingSource::FromService => f.write_str("from services"),
        }
    }
}

/// A handler parameter as described by the caller registering the handler.
///
/// ```
/// use micro_dispatch::param;
///
/// let id = param("id").from_route();
/// let trace = param("trace_id").from_header_named("x-trace-id");
/// let todo = param("todo").from_body();
/// # let _ = (id, trace, todo);
/// ```
#[derive(Debug, Clone)]
pub struct Param {
    name: Cow<'static, str>,
    annotations: Vec<BindingSource>,
}

pub fn param(name: impl Into<Cow<'static, str>>) -> Param {
    Param::new(name)
}

impl Param {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into(), annotations: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotations(&self) -> &[BindingSource] {
        &self.annotations
    }

    #[must_use]
    pub fn annotate(mut self, source: BindingSource) -> Self {
        self.annotations.push(source);
        self
    }

    #[must_use]
    pub fn from_route(self) -> Self {
        self.annotate(BindingSource::FromRoute { name: None })
    }

    #[must_use]
    pub fn from_route_named(self, key: impl Into<Cow<'static, str>>) -> Self {
        self.annotate(BindingSource::FromRoute { name: Some(key.into()) })
    }

    #[must_use]
    pub fn from_query(self) -> Self {
        self.annotate(BindingSource::FromQuery { name: None })
    }

    #[must_use]
    pub fn from_query_named(self, key: impl Into<Cow<'static, str>>) -> Self {
        self.annotate(BindingSource::FromQuery { name: Some(key.into()) })
    }

    #[must_use]
    pub fn from_header(self) -> Self {
        self.annotate(BindingSource::FromHeader { name: None })
    }

    #[must_use]
    pub fn from_header_named(self, key: impl Into<Cow<'static, str>>) -> Self {
        self.annotate(BindingSource::FromHeader { name: Some(key.into()) })
    }

    #[must_use]
    pub fn from_body(self) -> Self {
        self.annotate(BindingSource::FromBody { allow_empty: false })
    }

    /// Reads the body, binding `None` when it is empty. The parameter must be an `Option`.
    #[must_use]
    pub fn from_body_or_empty(self) -> Self {
        self.annotate(BindingSource::FromBody { allow_empty: true })
    }

    #[must_use]
    pub fn from_service(self) -> Self {
        self.annotate(BindingSource::FromService)
    }
}

impl From<&'static str> for Param {
    fn from(name: &'static str) -> Self {
        Param::new(name)
    }
}

/// A validated parameter: non-empty name, its declared type and at most one binding source.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    name: Cow<'static, str>,
    declared_type: DeclaredType,
    binding: Option<BindingSource>,
}

impl ParameterDescriptor {
    /// Validates `param`, the `index`-th parameter of a handler.
    pub fn new(index: usize, param: Param, declared_type: DeclaredType) -> Result<Self, ConfigError> {
        if param.name.is_empty() {
            return Err(ConfigError::UnnamedParameter { index });
        }

        let mut annotations = param.annotations.into_iter();
        let binding = annotations.next();
        if let Some(first) = &binding {
            // repeating the same annotation is harmless
            if let Some(second) = annotations.find(|other| other != first) {
                return Err(ConfigError::ConflictingAnnotations {
                    name: param.name.into_owned(),
                    first: first.clone(),
                    second,
                });
            }
        }

        Ok(Self { name: param.name, declared_type, binding })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared_type
    }

    pub fn binding(&self) -> Option<&BindingSource> {
        self.binding.as_ref()
    }

    /// The key looked up in route values, query string or headers.
    pub fn lookup_key(&self) -> &str {
        self.binding.as_ref().and_then(BindingSource::key_override).unwrap_or(&self.name)
    }
}
