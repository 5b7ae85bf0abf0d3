//! The per-handler request closure.
//!
//! A [`RequestClosure`] owns a handler, the binders selected for its parameters and the processor
//! selected for its return type. It is immutable once built and shared by all requests.

mod args;

pub use args::{BindArgs, Rejected};

use crate::binder::{BinderKind, BinderSelector, SelectionPath};
use crate::completion::Completion;
use crate::context::HttpContext;
use crate::diagnostics::Diagnostics;
use crate::error::{ConfigError, DispatchError};
use crate::fn_trait::HandlerFn;
use crate::param::ParameterDescriptor;
use crate::result::{ProcessorKind, ResultProcessor};
use futures::future::BoxFuture;
use http::StatusCode;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A handler ready to serve requests, independent of its signature.
pub trait RequestHandler: Send + Sync {
    /// Binds without reading the body, invokes the handler and processes its result.
    fn invoke(&self, ctx: &HttpContext) -> Completion;

    /// Like [`RequestHandler::invoke`], but body binders read the request payload first.
    fn invoke_with_body(self: Arc<Self>, ctx: HttpContext) -> BoxFuture<'static, Result<(), DispatchError>>;

    /// Whether any parameter reads the request body.
    fn has_body(&self) -> bool;

    fn binder_kinds(&self) -> Vec<(&ParameterDescriptor, BinderKind)>;

    fn result_kind(&self) -> ProcessorKind;
}

pub struct RequestClosure<F, M>
where
    F: HandlerFn<M>,
{
    handler: F,
    binders: <F::Args as BindArgs>::Binders,
    processor: ResultProcessor<F::Output>,
    diagnostics: Diagnostics,
    has_body: bool,
    _marker: PhantomData<fn() -> M>,
}

impl<F, M> RequestClosure<F, M>
where
    F: HandlerFn<M>,
{
    /// Selects binders for `descriptors` and builds the closure.
    ///
    /// Fails when the descriptors do not fit the handler or a handler reads the body twice.
    pub fn new(
        handler: F,
        descriptors: Vec<ParameterDescriptor>,
        selector: &BinderSelector,
        path: SelectionPath,
        diagnostics: Diagnostics,
    ) -> Result<Self, ConfigError> {
        let binders = <F::Args as BindArgs>::select(descriptors, selector, path)?;

        let has_body = {
            let mut body_parameters =
                <F::Args as BindArgs>::inspect(&binders).into_iter().filter(|(_, kind)| kind.is_body());
            match (body_parameters.next(), body_parameters.next()) {
                (Some((first, _)), Some((second, _))) => {
                    return Err(ConfigError::MultipleBodyParameters {
                        first: first.name().to_owned(),
                        second: second.name().to_owned(),
                    });
                }
                (first, _) => first.is_some(),
            }
        };

        Ok(Self { handler, binders, processor: F::PROCESSOR, diagnostics, has_body, _marker: PhantomData })
    }

    fn reject(&self, rejected: Rejected<'_>, ctx: &HttpContext) -> Result<(), DispatchError> {
        match rejected {
            Rejected::Unbound(descriptor) => {
                self.diagnostics.emit(|| {
                    debug!(
                        parameter = descriptor.name(),
                        declared_type = descriptor.declared_type().type_name(),
                        "failed to bind parameter, responding with 400"
                    );
                });
                ctx.set_status(StatusCode::BAD_REQUEST);
                Ok(())
            }
            Rejected::Fault(e) => Err(e),
        }
    }
}

impl<F, M> RequestHandler for RequestClosure<F, M>
where
    F: HandlerFn<M>,
    M: 'static,
{
    fn invoke(&self, ctx: &HttpContext) -> Completion {
        match <F::Args as BindArgs>::try_bind(&self.binders, ctx) {
            Ok(args) => self.processor.process(self.handler.call(args), ctx),
            Err(rejected) => Completion::ready(self.reject(rejected, ctx)),
        }
    }

    fn invoke_with_body(self: Arc<Self>, ctx: HttpContext) -> BoxFuture<'static, Result<(), DispatchError>> {
        Box::pin(async move {
            let completion = match <F::Args as BindArgs>::bind_async(&self.binders, &ctx).await {
                Ok(args) => self.processor.process(self.handler.call(args), &ctx),
                Err(rejected) => return self.reject(rejected, &ctx),
            };
            completion.await
        })
    }

    fn has_body(&self) -> bool {
        self.has_body
    }

    fn binder_kinds(&self) -> Vec<(&ParameterDescriptor, BinderKind)> {
        <F::Args as BindArgs>::inspect(&self.binders)
    }

    fn result_kind(&self) -> ProcessorKind {
        self.processor.kind()
    }
}

impl<F, M> fmt::Debug for RequestClosure<F, M>
where
    F: HandlerFn<M>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClosure")
            .field("handler", &std::any::type_name::<F>())
            .field("processor", &self.processor)
            .field("has_body", &self.has_body)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestClosure, RequestHandler};
    use crate::binder::{BinderSelector, SelectionPath};
    use crate::bindable::{Bindable, DeclaredType};
    use crate::context::HttpContext;
    use crate::diagnostics::Diagnostics;
    use crate::error::ConfigError;
    use crate::fn_trait::HandlerFn;
    use crate::param::{Param, ParameterDescriptor, param};
    use crate::result::ProcessorKind;
    use crate::services::ServiceCollection;
    use http::StatusCode;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Deserialize)]
    struct Todo {
        title: String,
    }

    crate::bindable!(object Todo);

    fn closure<F, M>(handler: F, params: Vec<(Param, DeclaredType)>) -> Result<Arc<RequestClosure<F, M>>, ConfigError>
    where
        F: HandlerFn<M>,
        M: 'static,
    {
        let selector = BinderSelector::new(Arc::new(ServiceCollection::new()), Diagnostics::default(), 1024);
        let descriptors = params
            .into_iter()
            .enumerate()
            .map(|(index, (param, declared))| ParameterDescriptor::new(index, param, declared))
            .collect::<Result<Vec<_>, _>>()?;
        RequestClosure::new(handler, descriptors, &selector, SelectionPath::Full, Diagnostics::default()).map(Arc::new)
    }

    fn typed<T: Bindable>(param: Param) -> (Param, DeclaredType) {
        (param, DeclaredType::of::<T>())
    }

    #[test]
    fn immediate_handler_completes_without_polling() {
        let closure = closure(|a: i32, b: i32| a + b, vec![typed::<i32>(param("a")), typed::<i32>(param("b"))]).unwrap();
        let ctx = HttpContext::builder().uri("/?a=2&b=40").build().unwrap();

        assert!(!closure.has_body());
        assert_eq!(closure.result_kind(), ProcessorKind::Serialize);

        let completion = closure.invoke(&ctx);
        assert!(completion.is_ready());
        completion.into_ready().unwrap().unwrap();
        assert_eq!(ctx.take_response().body().as_ref(), b"42");
    }

    #[test]
    fn unbound_parameter_skips_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = move |id: u64| {
            counter.fetch_add(1, Ordering::SeqCst);
            id.to_string()
        };
        let closure = closure(handler, vec![typed::<u64>(param("id").from_route())]).unwrap();
        let ctx = HttpContext::builder().route_value("id", "-1").build().unwrap();

        closure.invoke(&ctx).into_ready().unwrap().unwrap();
        assert_eq!(ctx.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn body_handler_reads_the_payload() {
        let closure =
            closure(|todo: Todo| async move { todo.title }, vec![typed::<Todo>(param("todo").from_body())]).unwrap();
        let ctx = HttpContext::builder().body(r#"{"title":"from body"}"#).build().unwrap();

        assert!(closure.has_body());
        assert_eq!(closure.result_kind(), ProcessorKind::AwaitText);

        Arc::clone(&closure).invoke_with_body(ctx.clone()).await.unwrap();
        assert_eq!(ctx.take_response().body().as_ref(), b"from body");
    }

    #[test]
    fn two_body_parameters_are_rejected() {
        let error = closure(
            |_first: Todo, _second: Todo| (),
            vec![typed::<Todo>(param("first")), typed::<Todo>(param("second").from_body())],
        )
        .unwrap_err();

        match error {
            ConfigError::MultipleBodyParameters { first, second } => {
                assert_eq!((first.as_str(), second.as_str()), ("first", "second"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
