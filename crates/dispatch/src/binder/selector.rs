use super::{Binder, BinderKind};
use crate::bindable::{Bindable, TypeKind};
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::param::{BindingSource, ParameterDescriptor};
use crate::services::ServiceProvider;
use std::fmt;
use std::sync::Arc;

/// How much of a descriptor the selection looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPath {
    /// Annotations first, then the declared type.
    Full,
    /// Only the declared type. Used when no parameter of a handler is annotated.
    ShapeOnly,
}

/// Picks the [`Binder`] for each handler parameter at registration time.
#[derive(Clone)]
pub struct BinderSelector {
    services: Arc<dyn ServiceProvider>,
    diagnostics: Diagnostics,
    body_limit: usize,
}

impl BinderSelector {
    pub fn new(services: Arc<dyn ServiceProvider>, diagnostics: Diagnostics, body_limit: usize) -> Self {
        Self { services, diagnostics, body_limit }
    }

    pub fn select<T: Bindable>(
        &self,
        descriptor: ParameterDescriptor,
        path: SelectionPath,
    ) -> Result<Binder<T>, ConfigError> {
        let kind = self.select_kind(&descriptor, path)?;
        Ok(Binder::new(descriptor, kind, self.diagnostics.clone(), self.body_limit))
    }

    pub fn select_kind(&self, descriptor: &ParameterDescriptor, path: SelectionPath) -> Result<BinderKind, ConfigError> {
        if path == SelectionPath::Full
            && let Some(source) = descriptor.binding()
        {
            return annotated_kind(descriptor, source);
        }

        let declared = descriptor.declared_type();
        match declared.kind() {
            TypeKind::RequestContext => Ok(BinderKind::RequestContext),
            TypeKind::CancellationSignal => Ok(BinderKind::CancellationSignal),
            kind if kind.is_simple() => Ok(BinderKind::RouteOrQuery),
            _ if self.services.is_registered(declared.type_id()) => Ok(BinderKind::Service),
            kind if kind.has_payload() => Ok(BinderKind::Body { allow_empty: declared.is_nullable() }),
            _ => Err(ConfigError::no_applicable_binder(descriptor.name(), declared.type_name())),
        }
    }
}

fn annotated_kind(descriptor: &ParameterDescriptor, source: &BindingSource) -> Result<BinderKind, ConfigError> {
    let declared = descriptor.declared_type();
    let unsupported = |reason| {
        Err(ConfigError::unsupported_annotation(descriptor.name(), declared.type_name(), source.clone(), reason))
    };

    let kind = match source {
        BindingSource::FromRoute { .. } => BinderKind::Route,
        BindingSource::FromQuery { .. } => BinderKind::Query,
        BindingSource::FromHeader { .. } => BinderKind::Header,
        BindingSource::FromService => return Ok(BinderKind::Service),
        BindingSource::FromBody { allow_empty } => {
            if !declared.kind().has_payload() {
                return unsupported("the type has no payload form");
            }
            if *allow_empty && !declared.is_nullable() {
                return unsupported("an empty body needs an `Option` parameter");
            }
            return Ok(BinderKind::Body { allow_empty: *allow_empty });
        }
    };

    if declared.kind().is_simple() { Ok(kind) } else { unsupported("the type has no string form") }
}

impl fmt::Debug for BinderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderSelector").field("body_limit", &self.body_limit).finish_non_exhaustive()
    }
}
