//! Return values that know how to write themselves to the response.
//!
//! Any [`IntoResult`] type returned by a handler is executed against the request context as is,
//! and combinators like `Result<T, E>` or `(StatusCode, T)` compose them.

use crate::context::HttpContext;
use crate::error::DispatchError;
use bytes::Bytes;
use http::{Response, StatusCode};
use serde::Serialize;
use std::borrow::Cow;
use std::convert::Infallible;

/// A return value that writes itself to the response.
pub trait IntoResult: Send + 'static {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError>;
}

/// Serializes the wrapped value as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Writes the wrapped string verbatim as `text/plain`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text(pub Cow<'static, str>);

impl From<String> for Text {
    fn from(text: String) -> Self {
        Text(Cow::Owned(text))
    }
}

impl From<&'static str> for Text {
    fn from(text: &'static str) -> Self {
        Text(Cow::Borrowed(text))
    }
}

impl IntoResult for StatusCode {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        ctx.set_status(self);
        Ok(())
    }
}

impl<T: Serialize + Send + 'static> IntoResult for Json<T> {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        ctx.write_json(&self.0)
    }
}

impl IntoResult for Text {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        ctx.write_text(&self.0);
        Ok(())
    }
}

/// Both variants must write themselves.
impl<T: IntoResult, E: IntoResult> IntoResult for Result<T, E> {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        match self {
            Ok(t) => t.execute(ctx),
            Err(e) => e.execute(ctx),
        }
    }
}

impl<T: IntoResult> IntoResult for (StatusCode, T) {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        let (status, result) = self;
        ctx.set_status(status);
        result.execute(ctx)
    }
}

impl IntoResult for (StatusCode, String) {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        (self.0, Text::from(self.1)).execute(ctx)
    }
}

impl IntoResult for (StatusCode, &'static str) {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        (self.0, Text::from(self.1)).execute(ctx)
    }
}

impl<T: IntoResult> IntoResult for Box<T> {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        (*self).execute(ctx)
    }
}

/// Passes a pre-built response through.
impl IntoResult for Response<Bytes> {
    fn execute(self, ctx: &HttpContext) -> Result<(), DispatchError> {
        let (parts, body) = self.into_parts();
        ctx.set_status(parts.status);
        ctx.extend_response_headers(parts.headers);
        ctx.write_bytes(&body);
        Ok(())
    }
}

impl IntoResult for Infallible {
    fn execute(self, _ctx: &HttpContext) -> Result<(), DispatchError> {
        match self {}
    }
}
