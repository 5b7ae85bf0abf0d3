//! Result processors turn a handler's return value into response output.
//!
//! The processor for a return type is a compile-time constant, [`HandlerOutput::PROCESSOR`]:
//! choosing it costs nothing at request time and no processor is ever allocated. A processor
//! is a [`ProcessorKind`] tag plus a function pointer monomorphized for the return type.
//!
//! | return type                                   | kind        |
//! |-----------------------------------------------|-------------|
//! | `()`                                          | `NoValue`   |
//! | any [`IntoResult`]                            | `Execute`   |
//! | `String`, `&'static str`, `Cow<'static, str>` | `Text`      |
//! | numbers, `bool`, `Option`, `Vec`, maps, JSON  | `Serialize` |
//!
//! A future resolving to one of the above gets the matching `Await*` kind. User types choose
//! serialization with [`serialized_output!`](crate::serialized_output!) or implement
//! [`IntoResult`] themselves.

mod into_result;

pub use into_result::{IntoResult, Json, Text};

use crate::completion::Completion;
use crate::context::HttpContext;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorKind {
    NoValue,
    Execute,
    Text,
    Serialize,
    AwaitNoValue,
    AwaitExecute,
    AwaitText,
    AwaitSerialize,
}

impl ProcessorKind {
    /// The kind used when a value of this kind arrives through a future.
    pub const fn awaited(self) -> Self {
        match self {
            ProcessorKind::NoValue | ProcessorKind::AwaitNoValue => ProcessorKind::AwaitNoValue,
            ProcessorKind::Execute | ProcessorKind::AwaitExecute => ProcessorKind::AwaitExecute,
            ProcessorKind::Text | ProcessorKind::AwaitText => ProcessorKind::AwaitText,
            ProcessorKind::Serialize | ProcessorKind::AwaitSerialize => ProcessorKind::AwaitSerialize,
        }
    }

    pub const fn is_awaited(self) -> bool {
        matches!(
            self,
            ProcessorKind::AwaitNoValue
                | ProcessorKind::AwaitExecute
                | ProcessorKind::AwaitText
                | ProcessorKind::AwaitSerialize
        )
    }
}

/// Writes a handler's return value of type `R` to the response.
pub struct ResultProcessor<R> {
    kind: ProcessorKind,
    process: fn(R, &HttpContext) -> Completion,
}

impl<R> ResultProcessor<R> {
    pub const fn kind(&self) -> ProcessorKind {
        self.kind
    }

    /// Processes `value`. The completion is resolved unless the kind is an `Await*` one.
    #[inline]
    pub fn process(&self, value: R, ctx: &HttpContext) -> Completion {
        (self.process)(value, ctx)
    }
}

impl<R> Clone for ResultProcessor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ResultProcessor<R> {}

impl<R> fmt::Debug for ResultProcessor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultProcessor").field("kind", &self.kind).finish_non_exhaustive()
    }
}

impl ResultProcessor<()> {
    pub const NO_VALUE: Self = Self { kind: ProcessorKind::NoValue, process: process_no_value };
}

impl<R: IntoResult> ResultProcessor<R> {
    pub const EXECUTE: Self = Self { kind: ProcessorKind::Execute, process: process_execute::<R> };
}

impl<R: AsRef<str>> ResultProcessor<R> {
    pub const TEXT: Self = Self { kind: ProcessorKind::Text, process: process_text::<R> };
}

impl<R: Serialize> ResultProcessor<R> {
    pub const SERIALIZE: Self = Self { kind: ProcessorKind::Serialize, process: process_serialize::<R> };
}

impl<F> ResultProcessor<F>
where
    F: Future + Send + 'static,
    F::Output: HandlerOutput,
{
    /// Awaits the future, then hands its output to the output's own processor.
    pub const AWAIT: Self =
        Self { kind: <F::Output as HandlerOutput>::PROCESSOR.kind.awaited(), process: process_await::<F> };
}

fn process_no_value((): (), _ctx: &HttpContext) -> Completion {
    Completion::done()
}

fn process_execute<R: IntoResult>(value: R, ctx: &HttpContext) -> Completion {
    Completion::ready(value.execute(ctx))
}

fn process_text<R: AsRef<str>>(value: R, ctx: &HttpContext) -> Completion {
    ctx.write_text(value.as_ref());
    Completion::done()
}

fn process_serialize<R: Serialize>(value: R, ctx: &HttpContext) -> Completion {
    Completion::ready(ctx.write_json(&value))
}

fn process_await<F>(future: F, ctx: &HttpContext) -> Completion
where
    F: Future + Send + 'static,
    F::Output: HandlerOutput,
{
    let ctx = ctx.clone();
    Completion::pending(async move {
        let output = future.await;
        <F::Output as HandlerOutput>::PROCESSOR.process(output, &ctx).await
    })
}

/// A value a handler may return, together with the processor that writes it.
///
/// Futures are not handler outputs themselves, a handler returning a future is processed with
/// [`ResultProcessor::AWAIT`] over the future's output.
pub trait HandlerOutput: Sized + Send + 'static {
    const PROCESSOR: ResultProcessor<Self>;
}

impl<R: IntoResult> HandlerOutput for R {
    const PROCESSOR: ResultProcessor<Self> = ResultProcessor::EXECUTE;
}

impl HandlerOutput for () {
    const PROCESSOR: ResultProcessor<Self> = ResultProcessor::NO_VALUE;
}

macro_rules! impl_text_output {
    ($($ty:ty),* $(,)?) => {
        $(
        impl HandlerOutput for $ty {
            const PROCESSOR: ResultProcessor<Self> = ResultProcessor::TEXT;
        }
        )*
    };
}

impl_text_output! { String, &'static str, Cow<'static, str> }

macro_rules! impl_serialize_output {
    ($($ty:ty),* $(,)?) => {
        $(
        impl HandlerOutput for $ty {
            const PROCESSOR: ResultProcessor<Self> = ResultProcessor::SERIALIZE;
        }
        )*
    };
}

impl_serialize_output! {
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, serde_json::Value,
}

impl<T: Serialize + Send + 'static> HandlerOutput for Option<T> {
    const PROCESSOR: ResultProcessor<Self> = ResultProcessor::SERIALIZE;
}

impl<T: Serialize + Send + 'static> HandlerOutput for Vec<T> {
    const PROCESSOR: ResultProcessor<Self> = ResultProcessor::SERIALIZE;
}

impl<K, V> HandlerOutput for HashMap<K, V>
where
    K: Serialize + Send + 'static,
    V: Serialize + Send + 'static,
{
    const PROCESSOR: ResultProcessor<Self> = ResultProcessor::SERIALIZE;
}

impl<K, V> HandlerOutput for BTreeMap<K, V>
where
    K: Serialize + Send + 'static,
    V: Serialize + Send + 'static,
{
    const PROCESSOR: ResultProcessor<Self> = ResultProcessor::SERIALIZE;
}

/// Makes user types returned by handlers serialize as JSON.
///
/// ```
/// use micro_dispatch::serialized_output;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Todo {
///     id: u64,
///     title: String,
/// }
///
/// serialized_output!(Todo);
/// ```
#[macro_export]
macro_rules! serialized_output {
    ($($ty:ty),+ $(,)?) => {
        $(
        impl $crate::HandlerOutput for $ty {
            const PROCESSOR: $crate::ResultProcessor<Self> = $crate::ResultProcessor::<$ty>::SERIALIZE;
        }
        )+
    };
}
