//! Fixed-size pool of upstream credential slots.
//!
//! Each upstream credential may back exactly one in-flight request, so the
//! pool tracks a single occupied/free flag per credential. Slot identities are
//! zero-based indices that stay stable for the life of the pool.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Identity of a credential slot (index into the pool).
pub type SlotId = usize;

/// An upstream-issued secret. `Debug` and `Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the secret for use in an upstream request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Occupancy-tracked credential slots.
///
/// `acquire` and `release` share one `parking_lot::Mutex` over the occupancy
/// vector, so concurrent callers can never be handed the same slot.
#[derive(Debug)]
pub struct CredentialPool {
    occupied: Mutex<Vec<bool>>,
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Pool of `size` anonymous slots (minimum 1).
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            occupied: Mutex::new(vec![false; size.max(1)]),
            credentials: Vec::new(),
        }
    }

    /// One slot per credential. An empty list degenerates to a single
    /// credential-less slot, which makes scheduling strictly serial.
    #[must_use]
    pub fn with_credentials(credentials: Vec<Credential>) -> Self {
        Self {
            occupied: Mutex::new(vec![false; credentials.len().max(1)]),
            credentials,
        }
    }

    /// Claim the first free slot.
    pub fn acquire(&self) -> Option<SlotId> {
        let mut occupied = self.occupied.lock();
        let id = occupied.iter().position(|busy| !busy)?;
        occupied[id] = true;
        drop(occupied);
        tracing::trace!(slot = id, "credential slot acquired");
        Some(id)
    }

    /// Mark a slot free. Unknown or already-free ids are ignored.
    pub fn release(&self, id: SlotId) {
        let mut occupied = self.occupied.lock();
        match occupied.get_mut(id) {
            Some(busy) if *busy => {
                *busy = false;
                drop(occupied);
                tracing::trace!(slot = id, "credential slot released");
            }
            Some(_) => tracing::debug!(slot = id, "release of free slot ignored"),
            None => tracing::debug!(slot = id, "release of unknown slot ignored"),
        }
    }

    /// Claim a slot that is released automatically when the lease drops.
    pub fn lease(self: &Arc<Self>) -> Option<SlotLease> {
        self.acquire().map(|slot| SlotLease {
            pool: Arc::clone(self),
            slot,
        })
    }

    /// Credential bound to a slot, if the pool was built with credentials.
    #[must_use]
    pub fn credential(&self, id: SlotId) -> Option<&Credential> {
        self.credentials.get(id)
    }

    /// Number of slots.
    #[must_use]
    pub fn size(&self) -> usize {
        self.occupied.lock().len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.occupied.lock().iter().filter(|busy| **busy).count()
    }

    /// Number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        let occupied = self.occupied.lock();
        occupied.len() - occupied.iter().filter(|busy| **busy).count()
    }
}

/// RAII claim on one credential slot.
#[derive(Debug)]
pub struct SlotLease {
    pool: Arc<CredentialPool>,
    slot: SlotId,
}

impl SlotLease {
    /// The leased slot.
    #[must_use]
    pub const fn slot(&self) -> SlotId {
        self.slot
    }

    /// Credential behind the leased slot.
    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.pool.credential(self.slot)
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}
