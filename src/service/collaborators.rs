//! Interfaces to the world outside the bracket: who may do what, where
//! rewards live, and how events are shown.

use crate::logic::WinnerOutcome;
use crate::models::{Match, Participant, ParticipantId, Placement, Round, TournamentSettings};
use crate::service::leaderboard::Leaderboard;
use crate::storage::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Isolation boundary (one chat server). One tournament per scope.
pub type ScopeId = String;
/// Chat-platform role id.
pub type RoleId = String;
/// Chat-platform channel id.
pub type ChannelId = String;

/// Whoever issued a command.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// Server administrators hold every capability.
    #[serde(default)]
    pub administrator: bool,
}

impl Actor {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
            administrator: false,
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn admin(mut self) -> Self {
        self.administrator = true;
        self
    }

    /// The actor as a bracket entrant.
    pub fn participant(&self) -> Participant {
        Participant::real(self.id.clone(), self.name.clone())
    }
}

/// Named permissions checked before mutating commands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "can_configure_tournament")]
    ConfigureTournament,
    #[serde(rename = "can_start_tournament")]
    StartTournament,
    #[serde(rename = "can_record_winner")]
    RecordWinner,
    #[serde(rename = "can_manage_rewards")]
    ManageRewards,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ConfigureTournament,
        Capability::StartTournament,
        Capability::RecordWinner,
        Capability::ManageRewards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ConfigureTournament => "can_configure_tournament",
            Capability::StartTournament => "can_start_tournament",
            Capability::RecordWinner => "can_record_winner",
            Capability::ManageRewards => "can_manage_rewards",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers "may this actor do X in this scope".
pub trait Authorizer: Send + Sync {
    fn has_capability(&self, actor: &Actor, scope: &str, capability: Capability) -> bool;
}

/// Grants capabilities by chat role, using the grants kept in the store.
/// Administrators always pass.
pub struct RoleAuthorizer {
    store: Arc<dyn ScopeStore>,
}

impl RoleAuthorizer {
    pub fn new(store: Arc<dyn ScopeStore>) -> Self {
        Self { store }
    }
}

impl Authorizer for RoleAuthorizer {
    fn has_capability(&self, actor: &Actor, scope: &str, capability: Capability) -> bool {
        if actor.administrator {
            return true;
        }
        let granted = self.store.granted_roles(scope, capability);
        actor.roles.iter().any(|r| granted.contains(r))
    }
}

/// Everything the store knows about one participant in a scope.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StandingRecord {
    pub participant_id: ParticipantId,
    pub name: Option<String>,
    pub points: i64,
    pub trophies: i64,
    pub tags: Vec<String>,
}

/// Durable per-scope auxiliary data: points, trophies, decorative tags, role
/// grants and leaderboard routing. Last write wins per (scope, participant).
pub trait ScopeStore: Send + Sync {
    fn points(&self, scope: &str, participant: &str) -> i64;
    /// Returns the new total.
    fn add_points(&self, scope: &str, participant: &str, delta: i64) -> Result<i64, StoreError>;
    fn trophies(&self, scope: &str, participant: &str) -> i64;
    /// Returns the new total.
    fn add_trophies(&self, scope: &str, participant: &str, delta: i64)
        -> Result<i64, StoreError>;
    fn tags(&self, scope: &str, participant: &str) -> Vec<String>;
    /// False if the participant already had the tag.
    fn add_tag(&self, scope: &str, participant: &str, tag: &str) -> Result<bool, StoreError>;
    /// Removes one tag, or every tag when `tag` is None. False if nothing was removed.
    fn remove_tag(
        &self,
        scope: &str,
        participant: &str,
        tag: Option<&str>,
    ) -> Result<bool, StoreError>;
    /// Remember the latest display name, used to sort and show leaderboards.
    fn set_name(&self, scope: &str, participant: &str, name: &str) -> Result<(), StoreError>;
    /// Every participant the scope has any data for.
    fn standings(&self, scope: &str) -> Vec<StandingRecord>;
    /// Clear points, trophies and tags for the scope.
    fn reset_scope(&self, scope: &str) -> Result<(), StoreError>;

    fn granted_roles(&self, scope: &str, capability: Capability) -> Vec<RoleId>;
    fn grant_role(
        &self,
        scope: &str,
        capability: Capability,
        role: &str,
    ) -> Result<bool, StoreError>;
    fn revoke_role(
        &self,
        scope: &str,
        capability: Capability,
        role: &str,
    ) -> Result<bool, StoreError>;

    fn leaderboard_channel(&self, scope: &str) -> Option<ChannelId>;
    fn set_leaderboard_channel(
        &self,
        scope: &str,
        channel: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Something the presentation layer should show.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BracketEvent {
    Configured {
        settings: TournamentSettings,
    },
    RegistrationOpened {
        settings: TournamentSettings,
    },
    Registered {
        participant: Participant,
        roster_size: usize,
        cap: usize,
    },
    Unregistered {
        participant_id: ParticipantId,
        roster_size: usize,
        cap: usize,
    },
    Started {
        title: String,
        round: Round,
    },
    MatchDecided {
        decided: Match,
    },
    RoundAdvanced {
        completed: Round,
        next: Round,
    },
    TournamentFinished {
        title: String,
        completed: Round,
        placements: Vec<Placement>,
        finished_at: DateTime<Utc>,
    },
    Cancelled,
    /// Published to the scope's leaderboard channel.
    LeaderboardUpdated {
        channel: ChannelId,
        leaderboard: Leaderboard,
    },
}

impl BracketEvent {
    pub(crate) fn from_outcome(
        outcome: &WinnerOutcome,
        title: &str,
        finished_at: DateTime<Utc>,
    ) -> Self {
        match outcome {
            WinnerOutcome::RoundInProgress { decided } => BracketEvent::MatchDecided {
                decided: decided.clone(),
            },
            WinnerOutcome::RoundAdvanced { completed, next } => BracketEvent::RoundAdvanced {
                completed: completed.clone(),
                next: next.clone(),
            },
            WinnerOutcome::TournamentFinished {
                completed,
                placements,
            } => BracketEvent::TournamentFinished {
                title: title.to_string(),
                completed: completed.clone(),
                placements: placements.clone(),
                finished_at,
            },
        }
    }
}

/// Emission failure from a notifier. Logged by the caller, never retried.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderError(pub String);

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "render failed: {}", self.0)
    }
}

impl std::error::Error for RenderError {}

/// Turns events into whatever the chat platform displays.
pub trait Notifier: Send + Sync {
    fn publish(&self, scope: &str, event: &BracketEvent) -> Result<(), RenderError>;
}
