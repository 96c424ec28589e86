//! Action leases.
//!
//! A lease is a short-lived exclusivity marker that enforces at-most-one
//! in-flight action per container name. Acquisition is a non-blocking
//! attempt: a held lease means the caller fails immediately with a
//! conflict rather than queuing; actions complete in seconds, so
//! fail-fast beats waiting for this interactive use case. Leases carry a
//! hard expiry so the table self-heals if a worker crashes mid-action.

use crate::action::Action;
use crate::error::CoreError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Lease {
    token: Uuid,
    action: Action,
    expires_at: Instant,
}

/// Lease table keyed by container name.
#[derive(Debug, Clone)]
pub struct LeaseTable {
    inner: Arc<Mutex<HashMap<String, Lease>>>,
    ttl: Duration,
}

impl LeaseTable {
    /// Creates a table whose leases expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Attempts to acquire the lease for `name`.
    ///
    /// An expired lease left behind by a crashed worker is reaped here.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a live lease is already held for the name.
    pub fn acquire(&self, name: &str, action: Action) -> Result<LeaseGuard, CoreError> {
        let mut leases = self
            .inner
            .lock()
            .map_err(|_| CoreError::internal("lease table lock poisoned"))?;

        let now = Instant::now();
        if let Some(existing) = leases.get(name) {
            if existing.expires_at > now {
                return Err(CoreError::conflict(format!(
                    "action {} already in flight for container {name}",
                    existing.action
                )));
            }
            tracing::warn!(container = name, "reaping expired action lease");
        }

        let token = Uuid::new_v4();
        leases.insert(
            name.to_string(),
            Lease {
                token,
                action,
                expires_at: now + self.ttl,
            },
        );

        Ok(LeaseGuard {
            table: Arc::clone(&self.inner),
            name: name.to_string(),
            token,
        })
    }

    /// Returns whether a live lease is held for `name`.
    #[must_use]
    pub fn held(&self, name: &str) -> bool {
        self.inner
            .lock()
            .map(|leases| {
                leases
                    .get(name)
                    .is_some_and(|l| l.expires_at > Instant::now())
            })
            .unwrap_or(false)
    }
}

/// Releases the lease on drop.
///
/// The guard only removes the entry it created: if the lease expired and
/// another worker re-acquired the name, the newer lease stays put.
#[derive(Debug)]
pub struct LeaseGuard {
    table: Arc<Mutex<HashMap<String, Lease>>>,
    name: String,
    token: Uuid,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Ok(mut leases) = self.table.lock() {
            if leases.get(&self.name).map(|l| l.token) == Some(self.token) {
                leases.remove(&self.name);
            }
        }
    }
}
