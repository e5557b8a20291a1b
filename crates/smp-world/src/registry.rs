use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use parking_lot::{RwLock, RwLockReadGuard};
use smp_core::{SharedBody, SystemKey, Transform};

use crate::error::{StepError, StepResult};

/// One registered body plus the flags the stepping core keeps for it.
pub struct SystemEntry {
    key: SystemKey,
    body: SharedBody,
    active: AtomicBool,
    faulted: AtomicBool,
}

impl std::fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEntry")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .field("faulted", &self.is_faulted())
            .finish()
    }
}

impl SystemEntry {
    fn new(key: SystemKey, body: SharedBody) -> Self {
        Self {
            key,
            body,
            active: AtomicBool::new(true),
            faulted: AtomicBool::new(false),
        }
    }

    /// Root-node key of this system.
    pub fn key(&self) -> SystemKey {
        self.key
    }

    /// The shared body.
    pub fn body(&self) -> &SharedBody {
        &self.body
    }

    /// Whether the host wants this system simulated.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Whether the system diverged and is held at its last good transforms.
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    /// Active and not faulted.
    pub fn is_steppable(&self) -> bool {
        self.is_active() && !self.is_faulted()
    }

    /// Freeze this system until the next reset.
    pub fn mark_faulted(&self) {
        self.faulted.store(true, Ordering::Release);
    }
}

/// The set of simulated systems, keyed by skeleton root.
///
/// Stepping holds the read lock for a whole sub-step fan-out; add, remove
/// and reset take the write lock and therefore wait for an in-flight
/// sub-step to finish. A frame additionally pins membership with
/// [`pin_membership`](Self::pin_membership), which keeps add, remove and
/// clear waiting until the frame boundary.
///
/// Bodies must not add or remove systems from inside
/// [`SimulationBody::advance`](smp_core::SimulationBody::advance) on the
/// stepping thread; that call would wait on its own frame.
#[derive(Debug, Default)]
pub struct SystemRegistry {
    membership: RwLock<()>,
    entries: RwLock<HashMap<SystemKey, SystemEntry>>,
}

impl SystemRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body under its root key. Fails if the key is taken.
    pub fn add(&self, body: SharedBody) -> StepResult<SystemKey> {
        let key = body.lock().root_key();
        let _membership = self.membership.write();
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(StepError::IllegalState(format!(
                "system {key} is already registered"
            )));
        }
        entries.insert(key, SystemEntry::new(key, body));
        tracing::debug!(%key, systems = entries.len(), "system added");
        Ok(key)
    }

    /// Unregister the given body. Returns whether it was registered.
    pub fn remove(&self, body: &SharedBody) -> bool {
        let _membership = self.membership.write();
        let mut entries = self.entries.write();
        let key = entries
            .iter()
            .find(|(_, entry)| Arc::ptr_eq(&entry.body, body))
            .map(|(key, _)| *key);
        match key {
            Some(key) => {
                entries.remove(&key);
                tracing::debug!(%key, systems = entries.len(), "system removed");
                true
            }
            None => false,
        }
    }

    /// Unregister whatever system simulates `key`.
    pub fn remove_by_key(&self, key: SystemKey) -> bool {
        let _membership = self.membership.write();
        let removed = self.entries.write().remove(&key).is_some();
        if removed {
            tracing::debug!(%key, "system removed by node");
        }
        removed
    }

    /// Put every system back to its original pose and clear fault flags.
    /// Returns the number of systems reset.
    pub fn reset_all(&self) -> usize {
        let entries = self.entries.write();
        for entry in entries.values() {
            entry.body.lock().reset_to_original();
            entry.faulted.store(false, Ordering::Release);
        }
        entries.len()
    }

    /// Drop every system.
    pub fn clear(&self) {
        let _membership = self.membership.write();
        self.entries.write().clear();
    }

    /// Hold the current set of systems fixed until the guard drops. Add,
    /// remove and clear block meanwhile; stepping, snapshots and resets do
    /// not.
    pub fn pin_membership(&self) -> RwLockReadGuard<'_, ()> {
        self.membership.read()
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// True if a system with `key` is registered.
    pub fn contains(&self, key: SystemKey) -> bool {
        self.entries.read().contains_key(&key)
    }

    /// Registered keys in ascending order.
    pub fn keys(&self) -> Vec<SystemKey> {
        let mut keys: Vec<SystemKey> = self.entries.read().keys().copied().collect();
        keys.sort();
        keys
    }

    /// Keys of systems currently held because they diverged.
    pub fn faulted_keys(&self) -> Vec<SystemKey> {
        let mut keys: Vec<SystemKey> = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.is_faulted())
            .map(SystemEntry::key)
            .collect();
        keys.sort();
        keys
    }

    /// Refresh each system's active flag from its body. Returns how many
    /// are active.
    pub fn update_active(&self) -> usize {
        let entries = self.entries.read();
        let mut active = 0;
        for entry in entries.values() {
            let wants = entry.body.lock().wants_simulation();
            entry.active.store(wants, Ordering::Release);
            active += usize::from(wants);
        }
        active
    }

    /// Run `f` over all entries while holding the read lock.
    pub fn with_entries<R>(&self, f: impl FnOnce(&[&SystemEntry]) -> R) -> R {
        let entries = self.entries.read();
        let view: Vec<&SystemEntry> = entries.values().collect();
        f(&view)
    }

    /// Current transforms of every system.
    pub fn snapshot_transforms(&self) -> HashMap<SystemKey, Vec<Transform>> {
        self.entries
            .read()
            .values()
            .map(|entry| (entry.key, entry.body.lock().transforms()))
            .collect()
    }

    /// Write back transforms captured by [`snapshot_transforms`](Self::snapshot_transforms).
    /// Systems missing from the snapshot are left alone.
    pub fn restore_transforms(&self, snapshot: &HashMap<SystemKey, Vec<Transform>>) {
        for entry in self.entries.read().values() {
            if let Some(transforms) = snapshot.get(&entry.key) {
                entry.body.lock().set_transforms(transforms);
            }
        }
    }

    /// Move every system by `offset`.
    pub fn translate_all(&self, offset: Vec3) {
        self.translate_where(offset, |_| true);
    }

    /// Move the systems whose key passes `filter` by `offset`.
    pub fn translate_where(&self, offset: Vec3, filter: impl Fn(SystemKey) -> bool) {
        for entry in self.entries.read().values() {
            if filter(entry.key) {
                entry.body.lock().translate(offset);
            }
        }
    }
}
