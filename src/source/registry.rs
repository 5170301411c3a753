//! Process-wide ownership of sink names
//!
//! Two live sources claiming the same sink name would be indistinguishable
//! to anything addressing sinks by name, so the second claim is refused.

use crate::error::Error;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

static CLAIMED: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn claimed() -> MutexGuard<'static, HashSet<String>> {
    CLAIMED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive claim on a sink name, given back on drop.
#[derive(Debug)]
pub struct SinkClaim {
    name: String,
}

impl SinkClaim {
    pub fn acquire(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::Config("sink name must not be empty".into()));
        }
        if !claimed().insert(name.to_owned()) {
            return Err(Error::SinkNameInUse(name.to_owned()));
        }
        Ok(Self {
            name: name.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SinkClaim {
    fn drop(&mut self) {
        claimed().remove(&self.name);
    }
}

/// Whether a live source currently holds `name`.
pub fn is_claimed(name: &str) -> bool {
    claimed().contains(name)
}
