//! Parameter binders.
//!
//! A [`Binder`] is chosen once per handler parameter by the [`BinderSelector`] and then produces
//! that parameter's value for every request. Only [`BinderKind::Body`] performs I/O, which is
//! why it is the only kind that needs the asynchronous path.

mod selector;

pub use selector::{BinderSelector, SelectionPath};

use crate::bindable::Bindable;
use crate::context::HttpContext;
use crate::diagnostics::Diagnostics;
use crate::error::{BodyError, DispatchError};
use crate::param::ParameterDescriptor;
use crate::services::ServiceProviderExt;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Where a bound parameter takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinderKind {
    Route,
    Query,
    /// Route values first, then the query string.
    RouteOrQuery,
    Header,
    Service,
    RequestContext,
    CancellationSignal,
    Body { allow_empty: bool },
}

impl BinderKind {
    pub const fn is_body(self) -> bool {
        matches!(self, BinderKind::Body { .. })
    }
}

/// The result of a single binding attempt.
#[derive(Debug)]
pub enum BindOutcome<T> {
    Bound(T),
    /// The request does not carry a usable value, answered with `400 Bad Request`.
    NotBound,
    /// Binding hit a failure that is not the client's fault.
    Fault(DispatchError),
}

impl<T> BindOutcome<T> {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound(_))
    }

    pub fn bound(self) -> Option<T> {
        match self {
            BindOutcome::Bound(value) => Some(value),
            BindOutcome::NotBound | BindOutcome::Fault(_) => None,
        }
    }
}

impl<T> From<Option<T>> for BindOutcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(BindOutcome::NotBound, BindOutcome::Bound)
    }
}

pub struct Binder<T> {
    descriptor: ParameterDescriptor,
    kind: BinderKind,
    diagnostics: Diagnostics,
    body_limit: usize,
    _value: PhantomData<fn() -> T>,
}

impl<T: Bindable> Binder<T> {
    pub(crate) fn new(
        descriptor: ParameterDescriptor,
        kind: BinderKind,
        diagnostics: Diagnostics,
        body_limit: usize,
    ) -> Self {
        Self { descriptor, kind, diagnostics, body_limit, _value: PhantomData }
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> BinderKind {
        self.kind
    }

    /// Binds without touching the request body.
    ///
    /// Body binders always report [`BindOutcome::NotBound`] here, they need [`Binder::bind_body_or_value`].
    pub fn try_bind_value(&self, ctx: &HttpContext) -> BindOutcome<T> {
        let key = self.descriptor.lookup_key();
        match self.kind {
            BinderKind::Route => parse_value(ctx.route_value(key)),
            BinderKind::Query => parse_value(ctx.query_value(key)),
            BinderKind::RouteOrQuery => parse_value(ctx.route_value(key).or_else(|| ctx.query_value(key))),
            BinderKind::Header => match ctx.headers().get(key).map(|value| value.to_str()) {
                None => parse_value(None),
                Some(Ok(raw)) => parse_value(Some(raw)),
                // not visible ASCII
                Some(Err(_)) => BindOutcome::NotBound,
            },
            BinderKind::Service => match ctx.services().get_required::<T>() {
                Ok(service) => BindOutcome::Bound(service),
                Err(e) => BindOutcome::Fault(e),
            },
            BinderKind::RequestContext | BinderKind::CancellationSignal => T::from_context(ctx).into(),
            BinderKind::Body { .. } => BindOutcome::NotBound,
        }
    }

    /// Binds the parameter, reading the request body if this is a body binder.
    ///
    /// Body read failures are logged and reported as [`BindOutcome::NotBound`], they never escape.
    pub async fn bind_body_or_value(&self, ctx: &HttpContext) -> BindOutcome<T> {
        let BinderKind::Body { allow_empty } = self.kind else {
            return self.try_bind_value(ctx);
        };

        match self.read_payload(ctx, allow_empty).await {
            Ok(value) => BindOutcome::Bound(value),
            Err(e) => {
                self.diagnostics.emit(|| {
                    debug!(
                        parameter = self.descriptor.name(),
                        declared_type = self.descriptor.declared_type().type_name(),
                        cause = %e,
                        "failed to read parameter from request body"
                    );
                });
                BindOutcome::NotBound
            }
        }
    }

    async fn read_payload(&self, ctx: &HttpContext, allow_empty: bool) -> Result<T, BodyError> {
        let payload = match ctx.read_body(self.body_limit).await {
            Ok(payload) => payload,
            // a request without payload reads as an empty one
            Err(BodyError::Consumed) if allow_empty => return T::from_payload(&[]),
            Err(e) => return Err(e),
        };

        if payload.is_empty() && !allow_empty {
            return Err(BodyError::Empty);
        }
        T::from_payload(&payload)
    }
}

fn parse_value<T: Bindable>(raw: Option<&str>) -> BindOutcome<T> {
    match raw {
        Some(raw) => T::parse(raw).into(),
        None => T::missing().into(),
    }
}

impl<T> fmt::Debug for Binder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("parameter", &self.descriptor.name())
            .field("declared_type", &self.descriptor.declared_type().type_name())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
