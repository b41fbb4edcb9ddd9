//! Shared "current status" label
//!
//! Written by the build worker, read by the front end on its render tick.
//! Only eventually consistent with the log: a reader may still see the
//! previous label for one tick after the matching log line arrived.

use std::sync::Arc;

use parking_lot::RwLock;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_DONE: &str = "Done";
pub const STATUS_ERROR: &str = "Error";

#[derive(Clone, Debug)]
pub struct StatusCell {
    label: Arc<RwLock<String>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self {
            label: Arc::new(RwLock::new(STATUS_READY.to_string())),
        }
    }

    pub fn set(&self, label: impl Into<String>) {
        *self.label.write() = label.into();
    }

    pub fn get(&self) -> String {
        self.label.read().clone()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
