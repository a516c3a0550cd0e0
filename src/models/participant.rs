//! Participant: a real chat actor or a synthetic bye-filler.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable external identity of a participant (chat user id, or `filler-<uuid>`).
pub type ParticipantId = String;

/// Someone occupying a bracket slot.
///
/// Identity is the external id only; two participants with the same display
/// name are still different people.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    /// A real user of the chat platform.
    RealActor { id: ParticipantId, name: String },
    /// Synthetic entrant used to fill out test brackets. Never rewarded.
    ByeFiller { id: ParticipantId, name: String },
}

impl Participant {
    pub fn real(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Participant::RealActor {
            id: id.into(),
            name: name.into(),
        }
    }

    /// New bye-filler with a fresh `filler-<uuid>` id.
    pub fn filler(name: impl Into<String>) -> Self {
        Participant::ByeFiller {
            id: format!("filler-{}", Uuid::new_v4()),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Participant::RealActor { id, .. } | Participant::ByeFiller { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Participant::RealActor { name, .. } | Participant::ByeFiller { name, .. } => name,
        }
    }

    pub fn is_real(&self) -> bool {
        match self {
            Participant::RealActor { .. } => true,
            Participant::ByeFiller { .. } => false,
        }
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl std::hash::Hash for Participant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
