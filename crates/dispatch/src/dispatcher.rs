//! Turns handler functions into [`Endpoint`]s.
//!
//! ```
//! use micro_dispatch::{Dispatcher, EntryPoint, HttpContext, param};
//!
//! # futures::executor::block_on(async {
//! let dispatcher = Dispatcher::builder().build();
//! let endpoint = dispatcher.map(|name: String| format!("hello {name}"), [param("name")]).unwrap();
//! assert_eq!(endpoint.entry_point(), EntryPoint::Immediate);
//!
//! let ctx = HttpContext::builder().route_value("name", "Ada").build().unwrap();
//! endpoint.call(&ctx).await.unwrap();
//! assert_eq!(ctx.take_response().body().as_ref(), b"hello Ada");
//! # });
//! ```

use crate::binder::{BinderKind, BinderSelector, SelectionPath};
use crate::closure::{BindArgs, RequestClosure, RequestHandler};
use crate::completion::Completion;
use crate::context::HttpContext;
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::fn_trait::HandlerFn;
use crate::param::{Param, ParameterDescriptor};
use crate::result::ProcessorKind;
use crate::services::{ServiceCollection, ServiceProvider};
use std::fmt;
use std::sync::Arc;
use tracing::{Dispatch, debug};

/// The most parameters a handler may declare.
pub const MAX_ARITY: usize = 16;

/// Default limit for request bodies read by body binders, 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

pub struct DispatcherBuilder {
    services: Option<Arc<dyn ServiceProvider>>,
    diagnostics: Diagnostics,
    max_body_size: usize,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { services: None, diagnostics: Diagnostics::default(), max_body_size: DEFAULT_MAX_BODY_SIZE }
    }

    /// The provider consulted at registration to recognise service parameters.
    ///
    /// Requests resolve services through their own [`HttpContext::services`].
    #[must_use]
    pub fn services(mut self, services: Arc<dyn ServiceProvider>) -> Self {
        self.services = Some(services);
        self
    }

    /// Routes binding diagnostics to `dispatch` instead of the current default subscriber.
    #[must_use]
    pub fn diagnostics(mut self, dispatch: Dispatch) -> Self {
        self.diagnostics = Diagnostics::new(dispatch);
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn build(self) -> Dispatcher {
        let services = self.services.unwrap_or_else(|| Arc::new(ServiceCollection::new()));
        let selector = BinderSelector::new(services, self.diagnostics.clone(), self.max_body_size);
        Dispatcher { selector, diagnostics: self.diagnostics }
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder").field("max_body_size", &self.max_body_size).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    selector: BinderSelector,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Builds the endpoint for `handler`, one [`Param`] per handler parameter in declared order.
    ///
    /// Every strategy is chosen here: a misconfigured parameter fails now, never per request.
    pub fn map<F, M>(&self, handler: F, params: impl IntoIterator<Item = Param>) -> Result<Endpoint, ConfigError>
    where
        F: HandlerFn<M>,
        M: 'static,
    {
        let params: Vec<Param> = params.into_iter().collect();
        if params.len() > MAX_ARITY {
            return Err(ConfigError::ArityExceeded { arity: params.len(), max: MAX_ARITY });
        }

        let arity = <F::Args as BindArgs>::ARITY;
        if params.len() != arity {
            return Err(ConfigError::ParameterCountMismatch { expected: arity, actual: params.len() });
        }

        let descriptors = params
            .into_iter()
            .zip(<F::Args as BindArgs>::declared_types())
            .enumerate()
            .map(|(index, (param, declared))| ParameterDescriptor::new(index, param, declared))
            .collect::<Result<Vec<_>, _>>()?;

        let path = if descriptors.iter().any(|descriptor| descriptor.binding().is_some()) {
            SelectionPath::Full
        } else {
            SelectionPath::ShapeOnly
        };

        let closure = RequestClosure::new(handler, descriptors, &self.selector, path, self.diagnostics.clone())?;
        let endpoint = Endpoint::new(Arc::new(closure));

        self.diagnostics.emit(|| {
            debug!(
                handler = std::any::type_name::<F>(),
                arity,
                entry_point = ?endpoint.entry_point(),
                result = ?endpoint.result_kind(),
                "handler mapped"
            );
        });
        Ok(endpoint)
    }
}

/// Which entry point an [`Endpoint`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Binds synchronously, the completion is resolved unless the handler returns a future.
    Immediate,
    /// Reads the request body before invoking the handler.
    BodyAware,
}

type Entry = fn(&Arc<dyn RequestHandler>, &HttpContext) -> Completion;

/// A registered handler, ready to be called for every matching request.
#[derive(Clone)]
pub struct Endpoint {
    handler: Arc<dyn RequestHandler>,
    entry_point: EntryPoint,
    entry: Entry,
}

impl Endpoint {
    fn new(handler: Arc<dyn RequestHandler>) -> Self {
        let (entry_point, entry): (EntryPoint, Entry) = if handler.has_body() {
            (EntryPoint::BodyAware, call_body_aware)
        } else {
            (EntryPoint::Immediate, call_immediate)
        };
        Self { handler, entry_point, entry }
    }

    /// Dispatches the request in `ctx`, writing the response back into it.
    ///
    /// A parameter without a usable value answers `400 Bad Request` and resolves `Ok`. Only
    /// service and serialization failures resolve to an error.
    #[inline]
    pub fn call(&self, ctx: &HttpContext) -> Completion {
        (self.entry)(&self.handler, ctx)
    }

    pub fn entry_point(&self) -> EntryPoint {
        self.entry_point
    }

    /// The binder chosen for each parameter, in declared order.
    pub fn binder_kinds(&self) -> Vec<(&str, BinderKind)> {
        self.handler.binder_kinds().into_iter().map(|(descriptor, kind)| (descriptor.name(), kind)).collect()
    }

    pub fn result_kind(&self) -> ProcessorKind {
        self.handler.result_kind()
    }
}

fn call_immediate(handler: &Arc<dyn RequestHandler>, ctx: &HttpContext) -> Completion {
    handler.invoke(ctx)
}

fn call_body_aware(handler: &Arc<dyn RequestHandler>, ctx: &HttpContext) -> Completion {
    Completion::from_boxed(Arc::clone(handler).invoke_with_body(ctx.clone()))
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("entry_point", &self.entry_point)
            .field("binders", &self.binder_kinds())
            .field("result", &self.result_kind())
            .finish_non_exhaustive()
    }
}
