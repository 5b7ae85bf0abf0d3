use crate::error::{BodyError, BoxError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The request payload as the host hands it over, a stream of bytes that can be read once.
///
/// Stream errors are carried as [`io::Error`] whatever the host body reports.
pub type RequestBody = UnsyncBoxBody<Bytes, io::Error>;

/// Converts any [`HttpBody`] into a [`RequestBody`].
pub fn request_body<B>(body: B) -> RequestBody
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(io::Error::other).boxed_unsync()
}

/// Buffers `bytes` as a [`RequestBody`].
pub fn full_body(bytes: impl Into<Bytes>) -> RequestBody {
    Full::new(bytes.into()).map_err(|never: Infallible| -> io::Error { match never {} }).boxed_unsync()
}

/// Single-consumption slot holding the request payload.
///
/// The first reader takes the body out; every later reader observes [`BodyError::Consumed`].
#[derive(Clone)]
pub(crate) struct PayloadSlot {
    inner: Arc<Mutex<Option<RequestBody>>>,
}

impl PayloadSlot {
    pub(crate) fn new(body: Option<RequestBody>) -> Self {
        Self { inner: Arc::new(Mutex::new(body)) }
    }

    pub(crate) async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    pub(crate) async fn take(&self) -> Option<RequestBody> {
        let mut guard = self.inner.lock().await;
        guard.take()
    }

    /// Reads the whole payload, failing once more than `limit` bytes arrive.
    pub(crate) async fn read_to_bytes(&self, limit: usize) -> Result<Bytes, BodyError> {
        let body = self.take().await.ok_or(BodyError::Consumed)?;

        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.is::<LengthLimitError>() => Err(BodyError::TooLarge { limit }),
            Err(e) => Err(BodyError::io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PayloadSlot, full_body, request_body};
    use crate::error::BodyError;
    use bytes::Bytes;
    use futures::stream;
    use http_body::Frame;
    use http_body_util::StreamBody;
    use std::io;

    #[tokio::test]
    async fn body_can_be_read_once() {
        let slot = PayloadSlot::new(Some(full_body("hello")));
        assert!(slot.can_consume().await);

        let bytes = slot.read_to_bytes(64).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello"));

        assert!(!slot.can_consume().await);
        assert!(matches!(slot.read_to_bytes(64).await, Err(BodyError::Consumed)));
    }

    #[tokio::test]
    async fn body_over_limit_is_rejected() {
        let slot = PayloadSlot::new(Some(full_body(vec![b'x'; 32])));
        assert!(matches!(slot.read_to_bytes(16).await, Err(BodyError::TooLarge { limit: 16 })));
    }

    #[tokio::test]
    async fn stream_error_is_reported_as_io() {
        let chunks: Vec<Result<Frame<Bytes>, io::Error>> =
            vec![Ok(Frame::data(Bytes::from_static(b"{"))), Err(io::Error::other("connection reset"))];
        let slot = PayloadSlot::new(Some(request_body(StreamBody::new(stream::iter(chunks)))));

        match slot.read_to_bytes(1024).await {
            Err(BodyError::Io { reason }) => assert!(reason.contains("connection reset")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_body_reads_as_consumed() {
        let slot = PayloadSlot::new(None);
        assert!(matches!(slot.read_to_bytes(16).await, Err(BodyError::Consumed)));
    }
}
