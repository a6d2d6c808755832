//! Data-source lifecycle state machine
//!
//! `Preparing -> Ready` on successful setup, `Preparing -> Error` on
//! failure. Both target states are terminal; retrying requires a fresh
//! instance. Waiters are explicit oneshot channels resolved exactly
//! once on the transition; there is no event bus.

use std::sync::Mutex;

use tokio::sync::oneshot;

use super::errors::AdapterError;

/// Lifecycle state of a data source
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterState {
    /// Created; backing-resource setup not yet finished
    Preparing,
    /// Setup succeeded; operations may proceed
    Ready,
    /// Setup failed; the error is sticky and every call observes it
    Error(AdapterError),
}

struct Inner {
    state: AdapterState,
    waiters: Vec<oneshot::Sender<Result<(), AdapterError>>>,
}

/// Explicit readiness signal with suspended waiters
pub struct ReadinessGate {
    inner: Mutex<Inner>,
}

impl ReadinessGate {
    /// A gate in the `Preparing` state
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: AdapterState::Preparing,
                waiters: Vec::new(),
            }),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> AdapterState {
        self.inner.lock().expect("gate lock poisoned").state.clone()
    }

    /// Transition `Preparing -> Ready`, waking every waiter.
    /// Ignored from a terminal state.
    pub fn mark_ready(&self) {
        let waiters = {
            let mut inner = self.inner.lock().expect("gate lock poisoned");
            if inner.state != AdapterState::Preparing {
                return;
            }
            inner.state = AdapterState::Ready;
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(Ok(()));
        }
    }

    /// Transition `Preparing -> Error`, rejecting every waiter.
    /// Ignored from a terminal state.
    pub fn mark_failed(&self, error: AdapterError) {
        let waiters = {
            let mut inner = self.inner.lock().expect("gate lock poisoned");
            if inner.state != AdapterState::Preparing {
                return;
            }
            inner.state = AdapterState::Error(error.clone());
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    /// Resolve immediately when `Ready`, reject immediately with the
    /// stored error when `Error`, otherwise suspend until a transition.
    pub async fn wait(&self) -> Result<(), AdapterError> {
        let receiver = {
            let mut inner = self.inner.lock().expect("gate lock poisoned");
            match &inner.state {
                AdapterState::Ready => return Ok(()),
                AdapterState::Error(error) => return Err(error.clone()),
                AdapterState::Preparing => {
                    let (sender, receiver) = oneshot::channel();
                    inner.waiters.push(sender);
                    receiver
                }
            }
        };
        receiver.await.unwrap_or(Err(AdapterError::Setup(
            "data source dropped before setup finished".to_string(),
        )))
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_resolves_pending_and_future_waiters() {
        let gate = std::sync::Arc::new(ReadinessGate::new());
        assert_eq!(gate.state(), AdapterState::Preparing);

        let pending = {
            let gate = std::sync::Arc::clone(&gate);
            tokio::spawn(async move { gate.wait().await })
        };
        tokio::task::yield_now().await;

        gate.mark_ready();
        assert!(pending.await.unwrap().is_ok());
        // Already ready: resolves immediately
        assert!(gate.wait().await.is_ok());
        assert_eq!(gate.state(), AdapterState::Ready);
    }

    #[tokio::test]
    async fn test_failure_is_sticky() {
        let gate = ReadinessGate::new();
        gate.mark_failed(AdapterError::Setup("no disk".to_string()));

        let err = gate.wait().await.unwrap_err();
        assert_eq!(err, AdapterError::Setup("no disk".to_string()));

        // No transition out of Error
        gate.mark_ready();
        assert!(matches!(gate.state(), AdapterState::Error(_)));
    }

    #[tokio::test]
    async fn test_ready_is_terminal() {
        let gate = ReadinessGate::new();
        gate.mark_ready();
        gate.mark_failed(AdapterError::Setup("late".to_string()));
        assert_eq!(gate.state(), AdapterState::Ready);
    }
}
