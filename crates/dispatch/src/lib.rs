//! Typed request dispatch for HTTP handlers
//!
//! This crate turns plain functions, synchronous or `async`, of up to 16 parameters into
//! uniform request endpoints. Where each parameter comes from (route values, query string,
//! headers, the request body, injected services or the request itself) and how the return
//! value is written to the response is decided once, when the handler is mapped. Serving a
//! request then only runs the chosen binders and result processor.
//!
//! # Features
//!
//! - Binder selection from explicit [`Param`] annotations or from the parameter type alone
//! - Handlers without a body parameter complete without any allocation or polling
//! - Body parameters are read once, size limited, and decoded as JSON
//! - Missing or malformed input answers `400 Bad Request` without invoking the handler
//! - Misconfigured handlers are rejected at registration with a [`ConfigError`]
//!
//! # Example
//!
//! ```
//! use micro_dispatch::{Dispatcher, EntryPoint, HttpContext, bindable, param, serialized_output};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct Todo {
//!     title: String,
//!     done: bool,
//! }
//!
//! bindable!(object Todo);
//! serialized_output!(Todo);
//!
//! async fn create(todo: Todo) -> Todo {
//!     Todo { done: false, ..todo }
//! }
//!
//! # futures::executor::block_on(async {
//! let dispatcher = Dispatcher::builder().build();
//! let endpoint = dispatcher.map(create, [param("todo").from_body()]).unwrap();
//! assert_eq!(endpoint.entry_point(), EntryPoint::BodyAware);
//!
//! let ctx = HttpContext::builder().body(r#"{"title":"write docs","done":true}"#).build().unwrap();
//! endpoint.call(&ctx).await.unwrap();
//!
//! let response = ctx.take_response();
//! assert_eq!(response.body().as_ref(), br#"{"title":"write docs","done":false}"#);
//! # });
//! ```

mod body;
mod completion;
mod diagnostics;
mod dispatcher;
mod error;
mod fn_trait;
mod param;

pub mod bindable;
pub mod binder;
pub mod closure;
pub mod context;
pub mod result;
pub mod services;

pub use bindable::{Bindable, DeclaredType, NamedEnum, TryParse, TypeKind, decode_json, parse_enum};
pub use body::{RequestBody, full_body, request_body};
pub use completion::Completion;
pub use context::{HttpContext, HttpContextBuilder, QueryValues, RouteValues};
pub use diagnostics::Diagnostics;
pub use dispatcher::{DEFAULT_MAX_BODY_SIZE, Dispatcher, DispatcherBuilder, Endpoint, EntryPoint, MAX_ARITY};
pub use error::{BodyError, BoxError, ConfigError, DispatchError};
pub use fn_trait::{Deferred, HandlerFn, Immediate};
pub use param::{BindingSource, Param, ParameterDescriptor, param};
pub use result::{HandlerOutput, IntoResult, Json, ProcessorKind, ResultProcessor, Text};
pub use services::{ServiceCollection, ServiceProvider, ServiceProviderExt};
