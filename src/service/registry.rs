//! Per-scope tournament registry.

use crate::models::{Tournament, TournamentState};
use crate::service::ScopeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// One independent tournament per scope, created by the first command that
/// touches it and released again once it is back to Idle.
///
/// Each tournament has its own mutex: commands for the same scope run one at
/// a time, commands for different scopes never wait on each other.
#[derive(Default)]
pub struct ScopeRegistry {
    scopes: RwLock<HashMap<ScopeId, Arc<Mutex<Tournament>>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scope's tournament, creating an Idle one if the scope is new.
    pub fn get_or_create(&self, scope: &str) -> Arc<Mutex<Tournament>> {
        if let Some(t) = self
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
        {
            return Arc::clone(t);
        }
        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            scopes
                .entry(scope.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Tournament::new()))),
        )
    }

    /// Run `f` with exclusive access to the scope's tournament.
    pub fn with_scope<T>(&self, scope: &str, f: impl FnOnce(&mut Tournament) -> T) -> T {
        let entry = self.get_or_create(scope);
        let mut tournament = entry.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *tournament)
    }

    /// Copy of the scope's current tournament. Unknown scopes read as a fresh
    /// Idle tournament and are not added.
    pub fn snapshot(&self, scope: &str) -> Tournament {
        let entry = self
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned();
        match entry {
            Some(t) => t.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Tournament::new(),
        }
    }

    /// Drop the scope's entry if its tournament is Idle and no command holds
    /// it. Returns true if the entry was removed.
    pub fn release_if_idle(&self, scope: &str) -> bool {
        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);
        let idle = match scopes.get(scope) {
            // Clones are only handed out under the map lock, so a count of one
            // means no other command is working on this tournament.
            Some(t) if Arc::strong_count(t) == 1 => {
                t.lock().unwrap_or_else(PoisonError::into_inner).state == TournamentState::Idle
            }
            _ => false,
        };
        if idle {
            scopes.remove(scope);
            log::debug!("scope {}: idle, released", scope);
        }
        idle
    }

    /// Scopes currently held, sorted.
    pub fn scopes(&self) -> Vec<ScopeId> {
        let mut ids: Vec<ScopeId> = self
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
