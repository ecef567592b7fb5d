// src/exec/gate.rs

//! Named counting gate that bounds how many holders may be active at once.
//!
//! Unlike a fixed-size semaphore, the limit is supplied on every
//! [`ConcurrencyGate::acquire`] call. Lowering the configured maximum
//! therefore only affects callers that arrive afterwards; holders admitted
//! under the old limit keep their slots until they finish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
struct Resource {
    active: Mutex<usize>,
    released: Notify,
}

impl Resource {
    fn lock_active(&self) -> MutexGuard<'_, usize> {
        // The counter is a plain integer, a poisoned lock cannot leave it
        // half-updated.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self, limit: usize) -> bool {
        let mut active = self.lock_active();
        if *active < limit.max(1) {
            *active += 1;
            true
        } else {
            false
        }
    }

    fn release(&self) {
        {
            let mut active = self.lock_active();
            *active = active.saturating_sub(1);
        }
        self.released.notify_waiters();
    }
}

/// Registry of named resources, each with its own active-holder count.
#[derive(Debug, Default)]
pub struct ConcurrencyGate {
    resources: Mutex<HashMap<String, Arc<Resource>>>,
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn resource(&self, name: &str) -> Arc<Resource> {
        let mut resources = self
            .resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(resources.entry(name.to_string()).or_default())
    }

    /// Wait until fewer than `limit` holders are active for `name`, then take
    /// a slot. A `limit` of zero is treated as one.
    ///
    /// Dropping the returned future before it resolves holds nothing.
    pub async fn acquire(&self, name: &str, limit: usize) -> ConcurrencySlot {
        let resource = self.resource(name);

        loop {
            // Register interest before checking so a release between the
            // check and the await is not missed.
            let released = resource.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if resource.try_acquire(limit) {
                return ConcurrencySlot {
                    name: name.to_string(),
                    resource: Arc::clone(&resource),
                };
            }

            debug!(resource = %name, limit, "concurrency limit reached; waiting for a slot");
            released.await;
        }
    }

    /// Number of slots currently held for `name`.
    pub fn active(&self, name: &str) -> usize {
        let resource = self.resource(name);
        let active = *resource.lock_active();
        active
    }
}

/// A held slot. Released when dropped.
#[derive(Debug)]
pub struct ConcurrencySlot {
    name: String,
    resource: Arc<Resource>,
}

impl ConcurrencySlot {
    pub fn resource_name(&self) -> &str {
        &self.name
    }
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        self.resource.release();
    }
}
