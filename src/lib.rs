//! Single-elimination bracket manager for chat-bot scopes: library with the
//! bracket engine, the per-scope service and its storage/rendering adapters.

pub mod config;
pub mod logic;
pub mod models;
pub mod render;
pub mod service;
pub mod storage;

pub use logic::{
    compute_placements, configure, open_registration, pair_off, record_winner,
    record_winner_with_rng, start_tournament, start_tournament_with_rng, WinnerOutcome,
};
pub use models::{
    Elimination, Match, MatchId, Participant, ParticipantId, Placement, RewardTable, Round, Slot,
    Tournament, TournamentError, TournamentId, TournamentSettings, TournamentState,
    MAX_PARTICIPANT_CAP, MIN_PARTICIPANTS_TO_START, MIN_PARTICIPANT_CAP,
};
pub use service::{
    Actor, Authorizer, BracketEvent, Capability, Leaderboard, Notifier, RoleAuthorizer, ScopeStore,
    ServiceError, TournamentService,
};
