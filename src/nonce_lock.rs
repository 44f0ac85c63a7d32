//! Per-address serialisation of transaction assembly and signing

use alloy_primitives::Address;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed mutex registry. Entries are created on first use and kept for the
/// lifetime of the locker; the key space is bounded by active signers.
///
/// A locker is owned by whoever constructs the façade and injected into it,
/// so independent instances never contend.
#[derive(Debug, Default)]
pub struct AddrLocker {
    locks: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
}

/// Exclusive ownership of one address. Dropping the guard releases it.
#[derive(Debug)]
pub struct AddrGuard {
    address: Address,
    _guard: OwnedMutexGuard<()>,
}

impl AddrGuard {
    pub fn address(&self) -> Address {
        self.address
    }
}

impl AddrLocker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, address: Address) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(address)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Waits until `address` is free and takes it. There is no timeout.
    pub async fn lock(&self, address: Address) -> AddrGuard {
        let lock = self.entry(address);
        AddrGuard {
            address,
            _guard: lock.lock_owned().await,
        }
    }

    /// Takes `address` only if nobody holds it.
    pub fn try_lock(&self, address: Address) -> Option<AddrGuard> {
        let lock = self.entry(address);
        lock.try_lock_owned().ok().map(|guard| AddrGuard {
            address,
            _guard: guard,
        })
    }

    /// Number of addresses that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
