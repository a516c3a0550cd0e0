//! Serialized store layout, keyed by scope then participant.

use crate::models::ParticipantId;
use crate::service::{Capability, ChannelId, RoleId, ScopeId, StandingRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

type PerParticipant<T> = BTreeMap<ScopeId, BTreeMap<ParticipantId, T>>;

/// Everything the store persists. `tp_data` is read as an alias of `rp_data`
/// for files written before points were renamed.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default, alias = "tp_data")]
    pub rp_data: PerParticipant<i64>,
    #[serde(default)]
    pub crown_data: PerParticipant<i64>,
    #[serde(default)]
    pub bracket_roles: PerParticipant<Vec<String>>,
    /// scope -> capability name -> role ids
    #[serde(default)]
    pub role_permissions: BTreeMap<ScopeId, BTreeMap<String, Vec<RoleId>>>,
    #[serde(default)]
    pub log_channels: BTreeMap<ScopeId, ChannelId>,
    #[serde(default)]
    pub names: PerParticipant<String>,
}

fn add_to(map: &mut PerParticipant<i64>, scope: &str, participant: &str, delta: i64) -> i64 {
    let total = map
        .entry(scope.to_string())
        .or_default()
        .entry(participant.to_string())
        .or_insert(0);
    *total += delta;
    *total
}

fn read_from(map: &PerParticipant<i64>, scope: &str, participant: &str) -> i64 {
    map.get(scope)
        .and_then(|m| m.get(participant))
        .copied()
        .unwrap_or(0)
}

impl StoreData {
    pub fn points(&self, scope: &str, participant: &str) -> i64 {
        read_from(&self.rp_data, scope, participant)
    }

    pub fn add_points(&mut self, scope: &str, participant: &str, delta: i64) -> i64 {
        add_to(&mut self.rp_data, scope, participant, delta)
    }

    pub fn trophies(&self, scope: &str, participant: &str) -> i64 {
        read_from(&self.crown_data, scope, participant)
    }

    pub fn add_trophies(&mut self, scope: &str, participant: &str, delta: i64) -> i64 {
        add_to(&mut self.crown_data, scope, participant, delta)
    }

    pub fn tags(&self, scope: &str, participant: &str) -> Vec<String> {
        self.bracket_roles
            .get(scope)
            .and_then(|m| m.get(participant))
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_tag(&mut self, scope: &str, participant: &str, tag: &str) -> bool {
        let tags = self
            .bracket_roles
            .entry(scope.to_string())
            .or_default()
            .entry(participant.to_string())
            .or_default();
        if tags.iter().any(|t| t == tag) {
            return false;
        }
        tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, scope: &str, participant: &str, tag: Option<&str>) -> bool {
        let Some(by_participant) = self.bracket_roles.get_mut(scope) else {
            return false;
        };
        let Some(tags) = by_participant.get_mut(participant) else {
            return false;
        };
        let before = tags.len();
        match tag {
            Some(tag) => tags.retain(|t| t != tag),
            None => tags.clear(),
        }
        let removed = tags.len() != before;
        if tags.is_empty() {
            by_participant.remove(participant);
        }
        removed
    }

    pub fn set_name(&mut self, scope: &str, participant: &str, name: &str) {
        self.names
            .entry(scope.to_string())
            .or_default()
            .insert(participant.to_string(), name.to_string());
    }

    pub fn standings(&self, scope: &str) -> Vec<StandingRecord> {
        let ids: BTreeSet<&ParticipantId> = [&self.rp_data, &self.crown_data]
            .into_iter()
            .filter_map(|m| m.get(scope))
            .flat_map(|m| m.keys())
            .chain(self.bracket_roles.get(scope).into_iter().flat_map(|m| m.keys()))
            .collect();

        ids.into_iter()
            .map(|id| StandingRecord {
                participant_id: id.clone(),
                name: self.names.get(scope).and_then(|m| m.get(id)).cloned(),
                points: self.points(scope, id),
                trophies: self.trophies(scope, id),
                tags: self.tags(scope, id),
            })
            .collect()
    }

    /// Points, trophies and tags go; names, grants and routing stay.
    pub fn reset_scope(&mut self, scope: &str) {
        self.rp_data.remove(scope);
        self.crown_data.remove(scope);
        self.bracket_roles.remove(scope);
    }

    pub fn granted_roles(&self, scope: &str, capability: Capability) -> Vec<RoleId> {
        self.role_permissions
            .get(scope)
            .and_then(|m| m.get(capability.as_str()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn grant_role(&mut self, scope: &str, capability: Capability, role: &str) -> bool {
        let roles = self
            .role_permissions
            .entry(scope.to_string())
            .or_default()
            .entry(capability.as_str().to_string())
            .or_default();
        if roles.iter().any(|r| r == role) {
            return false;
        }
        roles.push(role.to_string());
        true
    }

    pub fn revoke_role(&mut self, scope: &str, capability: Capability, role: &str) -> bool {
        let Some(roles) = self
            .role_permissions
            .get_mut(scope)
            .and_then(|m| m.get_mut(capability.as_str()))
        else {
            return false;
        };
        let before = roles.len();
        roles.retain(|r| r != role);
        roles.len() != before
    }

    pub fn leaderboard_channel(&self, scope: &str) -> Option<ChannelId> {
        self.log_channels.get(scope).cloned()
    }

    pub fn set_leaderboard_channel(&mut self, scope: &str, channel: Option<&str>) {
        match channel {
            Some(c) => {
                self.log_channels.insert(scope.to_string(), c.to_string());
            }
            None => {
                self.log_channels.remove(scope);
            }
        }
    }
}
