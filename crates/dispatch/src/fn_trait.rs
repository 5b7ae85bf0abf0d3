use crate::bindable::Bindable;
use crate::closure::BindArgs;
use crate::result::{HandlerOutput, ResultProcessor};

/// Marks handlers that return their value directly.
#[derive(Debug)]
pub enum Immediate {}

/// Marks handlers that return a future.
#[derive(Debug)]
pub enum Deferred {}

/// Represents a handler function of 0 to 16 [`Bindable`] parameters.
///
/// `Marker` is `(Immediate, A, B, ..)` or `(Deferred, A, B, ..)` and is inferred: exactly one
/// of the two applies to a given function, depending on whether it returns a future.
pub trait HandlerFn<Marker>: Send + Sync + 'static {
    type Args: BindArgs;
    type Output: Send + 'static;

    /// Writes the return value, chosen when the handler is compiled.
    const PROCESSOR: ResultProcessor<Self::Output>;

    fn call(&self, args: Self::Args) -> Self::Output;
}

/// impl `Fn` for `HandlerFn`, from 0 parameters to 16 parameters
///
/// for example, it will impl Fn(A, B) like this:
///```ignore
/// impl<Func, Ret, A, B> HandlerFn<(Immediate, A, B)> for Func
/// where
///     Func: Fn(A, B) -> Ret + Send + Sync + 'static,
///     Ret: HandlerOutput,
///     A: Bindable,
///     B: Bindable,
/// {
///     type Args = (A, B);
///     type Output = Ret;
///     const PROCESSOR: ResultProcessor<Ret> = Ret::PROCESSOR;
///
///     #[inline]
///     #[allow(non_snake_case)]
///     fn call(&self, (A, B): (A, B)) -> Ret {
///         (self)(A, B)
///     }
/// }
///```
/// and the same for `(Deferred, A, B)` with `Func: Fn(A, B) -> Fut` where `Fut::Output: HandlerOutput`.
macro_rules! impl_handler_fn_for_fn ({ $($param:ident)* } => {
    impl<Func, Ret, $($param,)*> HandlerFn<(Immediate, $($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Ret + Send + Sync + 'static,
        Ret: HandlerOutput,
        $($param: Bindable,)*
    {
        type Args = ($($param,)*);
        type Output = Ret;
        const PROCESSOR: ResultProcessor<Ret> = Ret::PROCESSOR;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): Self::Args) -> Ret {
            (self)($($param,)*)
        }
    }

    impl<Func, Fut, $($param,)*> HandlerFn<(Deferred, $($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
        $($param: Bindable,)*
    {
        type Args = ($($param,)*);
        type Output = Fut;
        const PROCESSOR: ResultProcessor<Fut> = ResultProcessor::AWAIT;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): Self::Args) -> Fut {
            (self)($($param,)*)
        }
    }
});

impl_handler_fn_for_fn! {}
impl_handler_fn_for_fn! { A }
impl_handler_fn_for_fn! { A B }
impl_handler_fn_for_fn! { A B C }
impl_handler_fn_for_fn! { A B C D }
impl_handler_fn_for_fn! { A B C D E }
impl_handler_fn_for_fn! { A B C D E F }
impl_handler_fn_for_fn! { A B C D E F G }
impl_handler_fn_for_fn! { A B C D E F G H }
impl_handler_fn_for_fn! { A B C D E F G H I }
impl_handler_fn_for_fn! { A B C D E F G H I J }
impl_handler_fn_for_fn! { A B C D E F G H I J K }
impl_handler_fn_for_fn! { A B C D E F G H I J K L }
impl_handler_fn_for_fn! { A B C D E F G H I J K L M }
impl_handler_fn_for_fn! { A B C D E F G H I J K L M N }
impl_handler_fn_for_fn! { A B C D E F G H I J K L M N O }
impl_handler_fn_for_fn! { A B C D E F G H I J K L M N O P }
