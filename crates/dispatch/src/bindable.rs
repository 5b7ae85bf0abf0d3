//! Declared parameter types and how their values are produced.
//!
//! Every handler parameter type implements [`Bindable`]. The implementation declares the type's
//! shape through [`Bindable::KIND`], which the binder selection inspects once at registration,
//! and supplies the conversions the selected binder needs at request time.
//!
//! Scalars, `String`, `Uuid`, the chrono date types, `Option<T>`, `Arc<T>`, [`HttpContext`] and
//! [`CancellationToken`] are covered here. User types opt in with the [`bindable!`](crate::bindable!)
//! macro:
//!
//! ```
//! use micro_dispatch::{NamedEnum, TryParse, bindable};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Todo {
//!     title: String,
//! }
//!
//! #[derive(Clone, Copy)]
//! enum Priority {
//!     Low,
//!     High,
//! }
//!
//! impl NamedEnum for Priority {
//!     const MEMBERS: &'static [(&'static str, Self)] = &[("Low", Priority::Low), ("High", Priority::High)];
//! }
//!
//! struct Point(i32, i32);
//!
//! impl TryParse for Point {
//!     fn try_parse(raw: &str) -> Option<Self> {
//!         let (x, y) = raw.split_once(',')?;
//!         Some(Point(x.parse().ok()?, y.parse().ok()?))
//!     }
//! }
//!
//! bindable!(object Todo);
//! bindable!(enum Priority);
//! bindable!(parsable Point);
//! ```

use crate::context::HttpContext;
use crate::error::BodyError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use std::any::{TypeId, type_name};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The shape of a declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Numbers, `bool`, `char`, `Uuid` and date/time values.
    Primitive,
    String,
    /// A fieldless enum parsed from its member names.
    Enum,
    /// A user type with its own [`TryParse`] implementation.
    Parsable,
    RequestContext,
    CancellationSignal,
    /// A structured payload read from the request body.
    Object,
    /// A type with neither a string nor a payload form, it can only be injected as a service.
    Opaque,
}

impl TypeKind {
    /// Whether values of this kind are parsed from a single string.
    pub const fn is_simple(self) -> bool {
        matches!(self, TypeKind::Primitive | TypeKind::String | TypeKind::Enum | TypeKind::Parsable)
    }

    pub const fn has_payload(self) -> bool {
        matches!(self, TypeKind::Object)
    }
}

/// Everything registration needs to know about a parameter's Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredType {
    type_name: &'static str,
    type_id: TypeId,
    kind: TypeKind,
    nullable: bool,
}

impl DeclaredType {
    pub fn of<T: Bindable>() -> Self {
        Self { type_name: type_name::<T>(), type_id: TypeId::of::<T>(), kind: T::KIND, nullable: T::NULLABLE }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A type that can appear as a handler parameter.
///
/// Only the conversion matching [`Bindable::KIND`] is ever called: `parse` for simple kinds,
/// `from_context` for the request context and cancellation kinds, `from_payload` for objects.
/// Service injection needs no conversion at all.
pub trait Bindable: Sized + Send + 'static {
    const KIND: TypeKind;

    /// `Option<T>` sets this, a missing value then binds to `None`.
    const NULLABLE: bool = false;

    fn parse(_raw: &str) -> Option<Self> {
        None
    }

    /// The value bound when the source has no entry for the parameter.
    fn missing() -> Option<Self> {
        None
    }

    fn from_context(_ctx: &HttpContext) -> Option<Self> {
        None
    }

    fn from_payload(_payload: &[u8]) -> Result<Self, BodyError> {
        Err(BodyError::unsupported(type_name::<Self>()))
    }
}

/// A user type that parses itself from a route, query or header value.
pub trait TryParse: Sized {
    fn try_parse(raw: &str) -> Option<Self>;
}

/// A fieldless enum bound from its member names.
pub trait NamedEnum: Copy + 'static {
    const MEMBERS: &'static [(&'static str, Self)];
}

/// Matches `raw` against the member names of `E`, ignoring ASCII case.
pub fn parse_enum<E: NamedEnum>(raw: &str) -> Option<E> {
    E::MEMBERS.iter().find(|(name, _)| name.eq_ignore_ascii_case(raw)).map(|(_, member)| *member)
}

/// Decodes a JSON payload, the codec used for [`TypeKind::Object`] parameters.
pub fn decode_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T, BodyError> {
    serde_json::from_slice(payload).map_err(BodyError::from)
}

macro_rules! impl_bindable_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
        impl Bindable for $ty {
            const KIND: TypeKind = TypeKind::Primitive;

            #[inline]
            fn parse(raw: &str) -> Option<Self> {
                raw.parse().ok()
            }
        }
        )*
    };
}

impl_bindable_from_str! { bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64 }
impl_bindable_from_str! { Uuid, NaiveDate, NaiveTime, NaiveDateTime }

impl Bindable for DateTime<FixedOffset> {
    const KIND: TypeKind = TypeKind::Primitive;

    fn parse(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw).ok()
    }
}

impl Bindable for DateTime<Utc> {
    const KIND: TypeKind = TypeKind::Primitive;

    fn parse(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw).ok().map(|date_time| date_time.with_timezone(&Utc))
    }
}

impl Bindable for String {
    const KIND: TypeKind = TypeKind::String;

    fn parse(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

impl<T: Bindable> Bindable for Option<T> {
    const KIND: TypeKind = T::KIND;
    const NULLABLE: bool = true;

    /// An empty value counts as missing.
    fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() { Some(None) } else { T::parse(raw).map(Some) }
    }

    fn missing() -> Option<Self> {
        Some(None)
    }

    fn from_context(ctx: &HttpContext) -> Option<Self> {
        Some(T::from_context(ctx))
    }

    /// An empty or `null` payload binds `None`.
    fn from_payload(payload: &[u8]) -> Result<Self, BodyError> {
        if payload.is_empty() || payload.trim_ascii() == b"null" { Ok(None) } else { T::from_payload(payload).map(Some) }
    }
}

impl<T> Bindable for Vec<T>
where
    T: DeserializeOwned + Send + 'static,
{
    const KIND: TypeKind = TypeKind::Object;

    fn from_payload(payload: &[u8]) -> Result<Self, BodyError> {
        decode_json(payload)
    }
}

impl Bindable for serde_json::Value {
    const KIND: TypeKind = TypeKind::Object;

    fn from_payload(payload: &[u8]) -> Result<Self, BodyError> {
        decode_json(payload)
    }
}

/// Shared handles are usually services.
impl<T: ?Sized + Send + Sync + 'static> Bindable for Arc<T> {
    const KIND: TypeKind = TypeKind::Opaque;
}

impl Bindable for HttpContext {
    const KIND: TypeKind = TypeKind::RequestContext;

    fn from_context(ctx: &HttpContext) -> Option<Self> {
        Some(ctx.clone())
    }
}

impl Bindable for CancellationToken {
    const KIND: TypeKind = TypeKind::CancellationSignal;

    fn from_context(ctx: &HttpContext) -> Option<Self> {
        Some(ctx.cancellation().clone())
    }
}

/// Implements [`Bindable`] for user types.
///
/// - `object`: the type is read from a JSON request body, it must implement `Deserialize`.
/// - `enum`: the type implements [`NamedEnum`] and is parsed from its member names.
/// - `parsable`: the type implements [`TryParse`].
/// - `opaque`: the type can only be injected as a service.
#[macro_export]
macro_rules! bindable {
    (object $($ty:ty),+ $(,)?) => {
        $(
        impl $crate::Bindable for $ty {
            const KIND: $crate::TypeKind = $crate::TypeKind::Object;

            fn from_payload(payload: &[u8]) -> ::std::result::Result<Self, $crate::BodyError> {
                $crate::decode_json(payload)
            }
        }
        )+
    };
    (enum $($ty:ty),+ $(,)?) => {
        $(
        impl $crate::Bindable for $ty {
            const KIND: $crate::TypeKind = $crate::TypeKind::Enum;

            fn parse(raw: &str) -> ::std::option::Option<Self> {
                $crate::parse_enum::<$ty>(raw)
            }
        }
        )+
    };
    (parsable $($ty:ty),+ $(,)?) => {
        $(
        impl $crate::Bindable for $ty {
            const KIND: $crate::TypeKind = $crate::TypeKind::Parsable;

            fn parse(raw: &str) -> ::std::option::Option<Self> {
                <$ty as $crate::TryParse>::try_parse(raw)
            }
        }
        )+
    };
    (opaque $($ty:ty),+ $(,)?) => {
        $(
        impl $crate::Bindable for $ty {
            const KIND: $crate::TypeKind = $crate::TypeKind::Opaque;
        }
        )+
    };
}
