//! In-flight build registry.
//!
//! Two sessions building the same `<repo>-<branch>` would delete each
//! other's clone. A build holds a `BuildLease` for its clone directory
//! name; a second build for the same name is rejected until the lease is
//! dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct BuildLeases {
    active: Arc<Mutex<HashSet<String>>>,
}

impl BuildLeases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, key: &str) -> Result<BuildLease> {
        let mut active = self.active.lock().map_err(|_| AppError::lock_poisoned())?;
        if !active.insert(key.to_string()) {
            return Err(AppError::Conflict(format!(
                "A build of {} is already running in another session. Try again when it finishes.",
                key
            )));
        }

        Ok(BuildLease {
            key: key.to_string(),
            active: Arc::clone(&self.active),
        })
    }
}

#[derive(Debug)]
pub struct BuildLease {
    key: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for BuildLease {
    fn drop(&mut self) {
        // Release even if another holder panicked
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.key);
    }
}
