use crate::error::DispatchError;
use futures::future::BoxFuture;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The outcome of dispatching one request.
///
/// Handlers that return a plain value complete without allocating: the completion is already
/// resolved when it is handed back and the host may inspect it with [`Completion::is_ready`]
/// instead of polling. Asynchronous handlers produce a boxed future.
#[must_use = "a completion does nothing unless it is polled or inspected"]
pub struct Completion {
    state: State,
}

enum State {
    Ready(Option<Result<(), DispatchError>>),
    Pending(BoxFuture<'static, Result<(), DispatchError>>),
}

impl Completion {
    /// A completion that already succeeded.
    #[inline]
    pub fn done() -> Self {
        Self::ready(Ok(()))
    }

    #[inline]
    pub fn ready(result: Result<(), DispatchError>) -> Self {
        Self { state: State::Ready(Some(result)) }
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        Self::from_boxed(Box::pin(future))
    }

    pub fn from_boxed(future: BoxFuture<'static, Result<(), DispatchError>>) -> Self {
        Self { state: State::Pending(future) }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(Some(_)))
    }

    /// Takes the result out of a resolved completion, handing a pending one back.
    pub fn into_ready(self) -> Result<Result<(), DispatchError>, Self> {
        match self.state {
            State::Ready(Some(result)) => Ok(result),
            state => Err(Self { state }),
        }
    }
}

/// # Panics
///
/// Polling a resolved completion again panics, like `futures::future::Ready`.
impl Future for Completion {
    type Output = Result<(), DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Ready(result) => Poll::Ready(result.take().expect("Completion polled after it resolved")),
            State::Pending(future) => future.as_mut().poll(cx),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Ready(result) => f.debug_tuple("Completion::Ready").field(result).finish(),
            State::Pending(_) => f.write_str("Completion::Pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Completion;
    use crate::error::DispatchError;

    #[test]
    fn ready_completion_does_not_need_polling() {
        let completion = Completion::done();
        assert!(completion.is_ready());
        assert!(matches!(completion.into_ready(), Ok(Ok(()))));
    }

    #[tokio::test]
    async fn pending_completion_resolves_when_awaited() {
        let completion = Completion::pending(async { Err(DispatchError::service_resolution("Clock")) });
        assert!(!completion.is_ready());

        let completion = completion.into_ready().unwrap_err();
        assert!(matches!(completion.await, Err(DispatchError::ServiceResolution { type_name: "Clock" })));
    }

    #[tokio::test]
    async fn ready_completion_can_be_awaited() {
        assert!(Completion::done().await.is_ok());
    }
}
