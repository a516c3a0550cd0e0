//! Mutex-guarded store generic over where snapshots go.

use crate::service::{Capability, ChannelId, RoleId, ScopeStore, StandingRecord};
use crate::storage::{JsonFile, Persistence, StoreData, StoreError};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Keeps nothing beyond process memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct Volatile;

impl Persistence for Volatile {
    fn save(&self, _data: &StoreData) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store data plus a persistence backend.
pub struct Store<P: Persistence> {
    data: Mutex<StoreData>,
    persistence: P,
}

/// In-memory store (tests, throwaway runs).
pub type MemoryStore = Store<Volatile>;
/// Store saved to a JSON file after every change.
pub type JsonFileStore = Store<JsonFile>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(StoreData::default(), Volatile)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFileStore {
    /// Load from the backend's file (empty store if it does not exist yet).
    pub fn open(file: JsonFile) -> Result<Self, StoreError> {
        let data = file.load()?;
        Ok(Self::with_data(data, file))
    }
}

impl<P: Persistence> Store<P> {
    pub fn with_data(data: StoreData, persistence: P) -> Self {
        Self {
            data: Mutex::new(data),
            persistence,
        }
    }

    /// Copy of everything currently held.
    pub fn snapshot(&self) -> StoreData {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> T {
        f(&*self.lock())
    }

    /// Apply a change, then save while still holding the lock. A failed save
    /// keeps the in-memory change.
    fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T, StoreError> {
        let mut data = self.lock();
        let out = f(&mut *data);
        self.persistence.save(&data)?;
        Ok(out)
    }
}

impl<P: Persistence> ScopeStore for Store<P> {
    fn points(&self, scope: &str, participant: &str) -> i64 {
        self.read(|d| d.points(scope, participant))
    }

    fn add_points(&self, scope: &str, participant: &str, delta: i64) -> Result<i64, StoreError> {
        self.update(|d| d.add_points(scope, participant, delta))
    }

    fn trophies(&self, scope: &str, participant: &str) -> i64 {
        self.read(|d| d.trophies(scope, participant))
    }

    fn add_trophies(
        &self,
        scope: &str,
        participant: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        self.update(|d| d.add_trophies(scope, participant, delta))
    }

    fn tags(&self, scope: &str, participant: &str) -> Vec<String> {
        self.read(|d| d.tags(scope, participant))
    }

    fn add_tag(&self, scope: &str, participant: &str, tag: &str) -> Result<bool, StoreError> {
        self.update(|d| d.add_tag(scope, participant, tag))
    }

    fn remove_tag(
        &self,
        scope: &str,
        participant: &str,
        tag: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.update(|d| d.remove_tag(scope, participant, tag))
    }

    fn set_name(&self, scope: &str, participant: &str, name: &str) -> Result<(), StoreError> {
        self.update(|d| d.set_name(scope, participant, name))
    }

    fn standings(&self, scope: &str) -> Vec<StandingRecord> {
        self.read(|d| d.standings(scope))
    }

    fn reset_scope(&self, scope: &str) -> Result<(), StoreError> {
        self.update(|d| d.reset_scope(scope))
    }

    fn granted_roles(&self, scope: &str, capability: Capability) -> Vec<RoleId> {
        self.read(|d| d.granted_roles(scope, capability))
    }

    fn grant_role(
        &self,
        scope: &str,
        capability: Capability,
        role: &str,
    ) -> Result<bool, StoreError> {
        self.update(|d| d.grant_role(scope, capability, role))
    }

    fn revoke_role(
        &self,
        scope: &str,
        capability: Capability,
        role: &str,
    ) -> Result<bool, StoreError> {
        self.update(|d| d.revoke_role(scope, capability, role))
    }

    fn leaderboard_channel(&self, scope: &str) -> Option<ChannelId> {
        self.read(|d| d.leaderboard_channel(scope))
    }

    fn set_leaderboard_channel(
        &self,
        scope: &str,
        channel: Option<&str>,
    ) -> Result<(), StoreError> {
        self.update(|d| d.set_leaderboard_channel(scope, channel))
    }
}
