use crate::error::ErrorDetail;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// First-write-wins error slot shared by the caller and the streaming worker.
///
/// Once an error is stored it is never replaced or cleared. Readers only ever
/// receive a copy.
#[derive(Debug, Default)]
pub struct ErrorState {
    slot: Mutex<Option<ErrorDetail>>,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `detail` unless an error is already recorded.
    ///
    /// Returns true if `detail` became the recorded error.
    pub fn set_if_empty(&self, detail: ErrorDetail) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(detail);
        true
    }

    /// Copy of the recorded error, if any.
    pub fn snapshot(&self) -> Option<ErrorDetail> {
        self.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ErrorDetail>> {
        // the slot is a plain value, a panic elsewhere cannot leave it half written
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
