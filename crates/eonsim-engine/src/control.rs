//! Cooperative pause / cancel control for the sequential loop
//!
//! The loop checks the handle between demands only; there is no
//! preemption and no timeout. Cancelling also wakes a paused loop so
//! cancellation always takes effect at the next demand boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Cloneable handle shared between the simulation loop and its
/// supervisor.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    inner: Arc<ControlInner>,
}

#[derive(Debug, Default)]
struct ControlInner {
    cancelled: AtomicBool,
    paused: Mutex<bool>,
    unpaused: Condvar,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the loop at its next demand boundary.
    pub fn pause(&self) {
        let mut paused = self
            .inner
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *paused = true;
    }

    /// Let a paused loop continue.
    pub fn resume(&self) {
        let mut paused = self
            .inner
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *paused = false;
        self.inner.unpaused.notify_all();
    }

    /// Stop the loop after the current demand.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // wake a paused loop so it can observe the cancellation
        self.resume();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        *self
            .inner
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while paused; returns immediately once cancelled.
    pub fn wait_while_paused(&self) {
        let mut paused = self
            .inner
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *paused && !self.is_cancelled() {
            paused = self
                .inner
                .unpaused
                .wait(paused)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pause_resume_cancel_flags() {
        let control = ControlHandle::new();
        assert!(!control.is_paused());
        assert!(!control.is_cancelled());

        control.pause();
        assert!(control.is_paused());
        control.resume();
        assert!(!control.is_paused());

        control.cancel();
        assert!(control.is_cancelled());
    }

    #[test]
    fn test_cancel_wakes_paused_waiter() {
        let control = ControlHandle::new();
        control.pause();

        let waiter = control.clone();
        let handle = std::thread::spawn(move || waiter.wait_while_paused());

        std::thread::sleep(Duration::from_millis(20));
        control.cancel();
        handle.join().unwrap();
        assert!(control.is_cancelled());
    }

    #[test]
    fn test_resume_wakes_paused_waiter() {
        let control = ControlHandle::new();
        control.pause();

        let waiter = control.clone();
        let handle = std::thread::spawn(move || waiter.wait_while_paused());

        std::thread::sleep(Duration::from_millis(20));
        control.resume();
        handle.join().unwrap();
        assert!(!control.is_cancelled());
    }
}
