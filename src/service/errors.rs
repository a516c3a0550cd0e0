//! Service errors. `Display` is the message shown to the user.

use crate::models::TournamentError;
use crate::service::Capability;
use crate::storage::StoreError;

#[derive(Debug)]
pub enum ServiceError {
    /// Actor lacks the capability for this command.
    Unauthorized { capability: Capability },
    /// Command only administrators may run.
    AdministratorOnly,
    /// The bracket rejected the command.
    Engine(TournamentError),
    /// A store write failed.
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Unauthorized { capability } => write!(
                f,
                "You don't have permission to do that ({} required)",
                capability
            ),
            ServiceError::AdministratorOnly => {
                write!(f, "Only server administrators can do that")
            }
            ServiceError::Engine(e) => write!(f, "{}", e),
            ServiceError::Store(e) => write!(f, "Could not save data: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Engine(e) => Some(e),
            ServiceError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TournamentError> for ServiceError {
    fn from(e: TournamentError) -> Self {
        ServiceError::Engine(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}
