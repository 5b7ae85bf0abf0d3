use crate::bindable::{Bindable, DeclaredType};
use crate::binder::{BindOutcome, Binder, BinderKind, BinderSelector, SelectionPath};
use crate::context::HttpContext;
use crate::error::{ConfigError, DispatchError};
use crate::param::ParameterDescriptor;

/// Why binding stopped before the handler could be invoked.
#[derive(Debug)]
pub enum Rejected<'a> {
    /// The parameter had no usable value in the request.
    Unbound(&'a ParameterDescriptor),
    Fault(DispatchError),
}

impl<T> BindOutcome<T> {
    #[inline]
    fn or_reject(self, descriptor: &ParameterDescriptor) -> Result<T, Rejected<'_>> {
        match self {
            BindOutcome::Bound(value) => Ok(value),
            BindOutcome::NotBound => Err(Rejected::Unbound(descriptor)),
            BindOutcome::Fault(e) => Err(Rejected::Fault(e)),
        }
    }
}

/// A tuple of handler arguments together with the binders producing it.
///
/// Implemented for tuples of 0 to 16 [`Bindable`] types. Binders run in declared order and the
/// first one that fails stops binding.
pub trait BindArgs: Sized + Send + 'static {
    type Binders: Send + Sync + 'static;

    const ARITY: usize;

    fn declared_types() -> Vec<DeclaredType>;

    /// Selects one binder per descriptor. `descriptors` must hold exactly [`BindArgs::ARITY`] entries.
    fn select(
        descriptors: Vec<ParameterDescriptor>,
        selector: &BinderSelector,
        path: SelectionPath,
    ) -> Result<Self::Binders, ConfigError>;

    fn inspect(binders: &Self::Binders) -> Vec<(&ParameterDescriptor, BinderKind)>;

    /// Binds every argument without reading the request body.
    fn try_bind<'a>(binders: &'a Self::Binders, ctx: &HttpContext) -> Result<Self, Rejected<'a>>;

    /// Binds every argument, body binders included, one after the other.
    fn bind_async<'a>(
        binders: &'a Self::Binders,
        ctx: &'a HttpContext,
    ) -> impl Future<Output = Result<Self, Rejected<'a>>> + Send + 'a;
}

macro_rules! count_params {
    () => { 0 };
    ($head:ident $($tail:ident)*) => { 1 + count_params!($($tail)*) };
}

macro_rules! impl_bind_args_for_tuple ({ $($param:ident)* } => {
    impl<$($param,)*> BindArgs for ($($param,)*)
    where
        $($param: Bindable,)*
    {
        type Binders = ($(Binder<$param>,)*);

        const ARITY: usize = count_params!($($param)*);

        fn declared_types() -> Vec<DeclaredType> {
            vec![$(DeclaredType::of::<$param>(),)*]
        }

        #[allow(unused_mut, unused_variables)]
        fn select(
            descriptors: Vec<ParameterDescriptor>,
            selector: &BinderSelector,
            path: SelectionPath,
        ) -> Result<Self::Binders, ConfigError> {
            let actual = descriptors.len();
            let mismatch = || ConfigError::ParameterCountMismatch { expected: Self::ARITY, actual };
            if actual != Self::ARITY {
                return Err(mismatch());
            }
            let mut descriptors = descriptors.into_iter();
            Ok(($(selector.select::<$param>(descriptors.next().ok_or_else(mismatch)?, path)?,)*))
        }

        #[allow(non_snake_case)]
        fn inspect(binders: &Self::Binders) -> Vec<(&ParameterDescriptor, BinderKind)> {
            let ($($param,)*) = binders;
            vec![$(($param.descriptor(), $param.kind()),)*]
        }

        #[allow(non_snake_case, unused_variables)]
        fn try_bind<'a>(binders: &'a Self::Binders, ctx: &HttpContext) -> Result<Self, Rejected<'a>> {
            let ($($param,)*) = binders;
            Ok(($($param.try_bind_value(ctx).or_reject($param.descriptor())?,)*))
        }

        #[allow(non_snake_case, unused_variables)]
        fn bind_async<'a>(
            binders: &'a Self::Binders,
            ctx: &'a HttpContext,
        ) -> impl Future<Output = Result<Self, Rejected<'a>>> + Send + 'a {
            async move {
                let ($($param,)*) = binders;
                Ok(($($param.bind_body_or_value(ctx).await.or_reject($param.descriptor())?,)*))
            }
        }
    }
});

impl_bind_args_for_tuple! {}
impl_bind_args_for_tuple! { A }
impl_bind_args_for_tuple! { A B }
impl_bind_args_for_tuple! { A B C }
impl_bind_args_for_tuple! { A B C D }
impl_bind_args_for_tuple! { A B C D E }
impl_bind_args_for_tuple! { A B C D E F }
impl_bind_args_for_tuple! { A B C D E F G }
impl_bind_args_for_tuple! { A B C D E F G H }
impl_bind_args_for_tuple! { A B C D E F G H I }
impl_bind_args_for_tuple! { A B C D E F G H I J }
impl_bind_args_for_tuple! { A B C D E F G H I J K }
impl_bind_args_for_tuple! { A B C D E F G H I J K L }
impl_bind_args_for_tuple! { A B C D E F G H I J K L M }
impl_bind_args_for_tuple! { A B C D E F G H I J K L M N }
impl_bind_args_for_tuple! { A B C D E F G H I J K L M N O }
impl_bind_args_for_tuple! { A B C D E F G H I J K L M N O P }
