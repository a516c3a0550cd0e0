//! Bracket pieces: slots, matches, rounds, eliminations and placements.

use crate::models::participant::{Participant, ParticipantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// One side of a match: a participant or the explicit "no opponent" marker.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum Slot {
    Player(Participant),
    Bye,
}

impl Slot {
    pub fn participant(&self) -> Option<&Participant> {
        match self {
            Slot::Player(p) => Some(p),
            Slot::Bye => None,
        }
    }

    fn holds(&self, id: &str) -> bool {
        self.participant().is_some_and(|p| p.id() == id)
    }
}

/// A single 1v1 match. A match with a `Bye` slot is won by the other side as
/// soon as it is created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub home: Slot,
    pub away: Slot,
    /// None until decided.
    pub winner: Option<Participant>,
}

impl Match {
    pub fn new(home: Slot, away: Slot) -> Self {
        let winner = match (&home, &away) {
            (Slot::Player(p), Slot::Bye) | (Slot::Bye, Slot::Player(p)) => Some(p.clone()),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            home,
            away,
            winner,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }

    /// True when one side is the `Bye` marker (auto-advance).
    pub fn is_bye(&self) -> bool {
        matches!(self.home, Slot::Bye) || matches!(self.away, Slot::Bye)
    }

    pub fn involves(&self, id: &str) -> bool {
        self.home.holds(id) || self.away.holds(id)
    }

    /// The slot facing `id`, if `id` plays in this match.
    pub fn opponent_of(&self, id: &str) -> Option<&Slot> {
        if self.home.holds(id) {
            Some(&self.away)
        } else if self.away.holds(id) {
            Some(&self.home)
        } else {
            None
        }
    }

    /// Both participants (byes skipped).
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.home
            .participant()
            .into_iter()
            .chain(self.away.participant())
    }
}

/// An ordered set of matches played at the same bracket depth.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based.
    pub index: usize,
    pub matches: Vec<Match>,
}

impl Round {
    pub fn is_complete(&self) -> bool {
        self.matches.iter().all(Match::is_resolved)
    }

    /// Winners in match order (unresolved matches skipped).
    pub fn winners(&self) -> Vec<Participant> {
        self.matches.iter().filter_map(|m| m.winner.clone()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.matches.iter().any(|m| m.involves(id))
    }
}

/// A participant knocked out, with the round it happened in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Elimination {
    pub participant: Participant,
    pub round: usize,
}

/// Final rank (1..=4) awarded when the tournament completes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub rank: u8,
    pub participant: Participant,
}

impl Placement {
    pub fn participant_id(&self) -> &ParticipantId {
        match &self.participant {
            Participant::RealActor { id, .. } | Participant::ByeFiller { id, .. } => id,
        }
    }
}
