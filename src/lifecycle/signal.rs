//! Single-slot, level-triggered cancellation signal

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct CancellationSignal {
    set: Mutex<bool>,
    changed: Condvar,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Returns true only for the call that set it.
    pub fn set(&self) -> bool {
        let mut set = self.lock();
        if *set {
            return false;
        }
        *set = true;
        self.changed.notify_all();
        true
    }

    #[allow(dead_code)]
    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Block until the signal is set. Returns immediately if it already is.
    pub fn wait(&self) {
        let mut set = self.lock();
        while !*set {
            set = self.changed.wait(set).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
