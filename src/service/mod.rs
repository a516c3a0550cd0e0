//! Tournament service: per-scope registry, authorization, rewards and
//! leaderboards around the bracket engine.

mod collaborators;
mod errors;
pub mod leaderboard;
mod manager;
mod registry;
pub mod rewards;

pub use collaborators::{
    Actor, Authorizer, BracketEvent, Capability, ChannelId, Notifier, RenderError, RoleAuthorizer,
    RoleId, ScopeId, ScopeStore, StandingRecord,
};
pub use errors::{ServiceError, ServiceResult};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use manager::{CompletedTournament, TournamentService};
pub use registry::ScopeRegistry;
pub use rewards::RewardGrant;
