use tracing::Dispatch;

/// Where binding diagnostics are reported.
///
/// Without an explicit [`Dispatch`] events go to whatever subscriber is current for the calling
/// thread, usually the global default.
#[derive(Clone, Default, Debug)]
pub struct Diagnostics {
    dispatch: Option<Dispatch>,
}

impl Diagnostics {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch: Some(dispatch) }
    }

    /// Runs `f`, routing every event it records to the configured dispatch.
    #[inline]
    pub fn emit<F: FnOnce()>(&self, f: F) {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}
