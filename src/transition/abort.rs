//! Cooperative abort signal.

use tokio_util::sync::CancellationToken;

/// Marker returned by [`AbortSignal::check`] once the signal has fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbortObserved;

/// Cancellation capability owned by a transition and handed to resolution.
///
/// Aborting never interrupts work in progress. The resolution routine calls
/// [`check`](Self::check) at its own suspension points and stops there.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Raising it again has no effect.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with [`AbortObserved`] if the flag has been raised.
    pub fn check(&self) -> Result<(), AbortObserved> {
        if self.is_aborted() {
            Err(AbortObserved)
        } else {
            Ok(())
        }
    }
}
