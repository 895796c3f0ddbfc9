//! A cloneable handle for observing and interrupting the engine from UI code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::events::ChatEvent;

/// A cloneable handle for poking the engine from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct EngineHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) is_sending: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_sending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the send in flight, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a send is in flight.
    pub fn is_sending(&self) -> bool {
        self.is_sending.load(Ordering::Acquire)
    }

    /// Replace the cancellation token and return a clone for the new send.
    pub(crate) fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }
}

/// Holds the sending flag for the lifetime of one send.
///
/// Dropping the guard clears the flag, whichever way the send ended.
pub(crate) struct SendingGuard {
    flag: Arc<AtomicBool>,
    events: broadcast::Sender<ChatEvent>,
}

impl SendingGuard {
    /// Take the flag. Returns `None` if a send already holds it.
    pub(crate) fn acquire(
        handle: &EngineHandle,
        events: &broadcast::Sender<ChatEvent>,
    ) -> Option<Self> {
        if handle
            .is_sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _ = events.send(ChatEvent::Sending { active: true });
        Some(Self {
            flag: Arc::clone(&handle.is_sending),
            events: events.clone(),
        })
    }
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        let _ = self.events.send(ChatEvent::Sending { active: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_sets_and_clears_flag() {
        let handle = EngineHandle::new();
        let (tx, mut rx) = broadcast::channel(8);

        let guard = SendingGuard::acquire(&handle, &tx).unwrap();
        assert!(handle.is_sending());
        assert!(SendingGuard::acquire(&handle, &tx).is_none());

        drop(guard);
        assert!(!handle.is_sending());
        assert!(matches!(rx.try_recv(), Ok(ChatEvent::Sending { active: true })));
        assert!(matches!(rx.try_recv(), Ok(ChatEvent::Sending { active: false })));
    }

    #[test]
    fn test_abort_cancels_current_token() {
        let handle = EngineHandle::new();
        let token = handle.fresh_token();
        assert!(!token.is_cancelled());
        handle.abort();
        assert!(token.is_cancelled());

        // A fresh token is not affected by the earlier abort
        let next = handle.fresh_token();
        assert!(!next.is_cancelled());
    }
}
