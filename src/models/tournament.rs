//! Tournament, TournamentState, settings and the engine error type.

use crate::models::bracket::{Elimination, Placement, Round};
use crate::models::participant::{Participant, ParticipantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest allowed participant cap.
pub const MIN_PARTICIPANT_CAP: usize = 2;
/// Largest allowed participant cap.
pub const MAX_PARTICIPANT_CAP: usize = 64;
/// Registrants needed before the bracket can start.
pub const MIN_PARTICIPANTS_TO_START: usize = 2;

/// Errors that can occur during bracket operations. None of these are fatal;
/// the caller decides how to report them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    /// Operation not legal in the current lifecycle state.
    InvalidState(TournamentState),
    /// Participant is not on the roster.
    NotFound(ParticipantId),
    /// Roster is already at the configured cap.
    CapacityExceeded { cap: usize },
    /// A participant with this id is already registered.
    AlreadyRegistered(ParticipantId),
    /// Not enough registrants to start.
    InsufficientPlayers { required: usize, registered: usize },
    /// Participant has no undecided match in the current round.
    PlayerNotInRound(ParticipantId),
    /// Settings rejected (cap out of range, empty title).
    InvalidSettings(String),
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::InvalidState(state) => {
                write!(f, "Not allowed while the tournament is {}", state)
            }
            TournamentError::NotFound(_) => write!(f, "Player is not registered"),
            TournamentError::CapacityExceeded { cap } => {
                write!(f, "Tournament is full ({} players)", cap)
            }
            TournamentError::AlreadyRegistered(_) => write!(f, "You are already registered"),
            TournamentError::InsufficientPlayers {
                required,
                registered,
            } => write!(
                f,
                "Need at least {} players to start (have {})",
                required, registered
            ),
            TournamentError::PlayerNotInRound(_) => write!(f, "Player not found in current round"),
            TournamentError::InvalidSettings(reason) => write!(f, "Invalid settings: {}", reason),
        }
    }
}

impl std::error::Error for TournamentError {}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Lifecycle of a scope's tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// Nothing running.
    #[default]
    Idle,
    /// Settings being edited; nobody can join yet.
    Configuring,
    /// Accepting registrations.
    Registering,
    /// Bracket running; winners are being recorded.
    Active,
    /// Champion decided; waiting for reset.
    Complete,
}

impl std::fmt::Display for TournamentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TournamentState::Idle => "idle",
            TournamentState::Configuring => "being configured",
            TournamentState::Registering => "open for registration",
            TournamentState::Active => "in progress",
            TournamentState::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Reward points per placement.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RewardTable {
    pub first: i64,
    pub second: i64,
    pub third: i64,
    pub fourth: i64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            first: 100,
            second: 50,
            third: 30,
            fourth: 30,
        }
    }
}

impl RewardTable {
    /// Points for a rank; 0 outside 1..=4.
    pub fn amount_for(&self, rank: u8) -> i64 {
        match rank {
            1 => self.first,
            2 => self.second,
            3 => self.third,
            4 => self.fourth,
            _ => 0,
        }
    }
}

/// Host-provided settings for one tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentSettings {
    pub title: String,
    pub map: String,
    pub abilities: String,
    pub max_participants: usize,
    pub prize: String,
    #[serde(default)]
    pub rewards: RewardTable,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            title: "Tournament".to_string(),
            map: "Default Map".to_string(),
            abilities: "Enabled".to_string(),
            max_participants: 16,
            prize: "Victory Crown".to_string(),
            rewards: RewardTable::default(),
        }
    }
}

impl TournamentSettings {
    /// Cap must be within [2, 64] and the title non-empty.
    pub fn validate(&self) -> Result<(), TournamentError> {
        if !(MIN_PARTICIPANT_CAP..=MAX_PARTICIPANT_CAP).contains(&self.max_participants) {
            return Err(TournamentError::InvalidSettings(format!(
                "max players must be between {} and {}",
                MIN_PARTICIPANT_CAP, MAX_PARTICIPANT_CAP
            )));
        }
        if self.title.trim().is_empty() {
            return Err(TournamentError::InvalidSettings(
                "title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full bracket state for one scope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub state: TournamentState,
    pub settings: TournamentSettings,
    /// Registration order; unique by participant id.
    pub roster: Vec<Participant>,
    /// Append-only; `rounds[0]` is round 1.
    pub rounds: Vec<Round>,
    /// Real participants in the order they were knocked out.
    pub elimination_order: Vec<Elimination>,
    /// Filled on completion.
    pub placements: Vec<Placement>,
}

impl Default for Tournament {
    fn default() -> Self {
        Self::new()
    }
}

impl Tournament {
    /// Create an Idle tournament with default settings.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: TournamentState::Idle,
            settings: TournamentSettings::default(),
            roster: Vec::new(),
            rounds: Vec::new(),
            elimination_order: Vec::new(),
            placements: Vec::new(),
        }
    }

    /// The round currently being played (last appended).
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.roster.iter().any(|p| p.id() == id)
    }

    /// Register a participant (Registering only). Returns the new roster size.
    pub fn register(&mut self, participant: Participant) -> Result<usize, TournamentError> {
        if self.state != TournamentState::Registering {
            return Err(TournamentError::InvalidState(self.state));
        }
        if self.is_registered(participant.id()) {
            return Err(TournamentError::AlreadyRegistered(
                participant.id().to_string(),
            ));
        }
        let cap = self.settings.max_participants;
        if self.roster.len() >= cap {
            return Err(TournamentError::CapacityExceeded { cap });
        }
        self.roster.push(participant);
        Ok(self.roster.len())
    }

    /// Remove a participant by id (Registering only). Returns the new roster size.
    pub fn unregister(&mut self, id: &str) -> Result<usize, TournamentError> {
        if self.state != TournamentState::Registering {
            return Err(TournamentError::InvalidState(self.state));
        }
        let idx = self
            .roster
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| TournamentError::NotFound(id.to_string()))?;
        self.roster.remove(idx);
        Ok(self.roster.len())
    }

    /// Drop everything and go back to Idle. Allowed from any state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
