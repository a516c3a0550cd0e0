//! Data structures for the bracket: participants, matches, rounds, tournament state.

mod bracket;
mod participant;
mod tournament;

pub use bracket::{Elimination, Match, MatchId, Placement, Round, Slot};
pub use participant::{Participant, ParticipantId};
pub use tournament::{
    RewardTable, Tournament, TournamentError, TournamentId, TournamentSettings, TournamentState,
    MAX_PARTICIPANT_CAP, MIN_PARTICIPANTS_TO_START, MIN_PARTICIPANT_CAP,
};
