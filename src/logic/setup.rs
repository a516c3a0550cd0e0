//! Setup phase: configure, open registration, start the bracket.

use crate::logic::pairing::pair_off;
use crate::models::{
    Round, Tournament, TournamentError, TournamentSettings, TournamentState,
    MIN_PARTICIPANTS_TO_START,
};
use rand::Rng;

/// Apply settings (Idle or Configuring). Idle moves to Configuring; calling it
/// again before registration opens replaces the settings.
pub fn configure(
    tournament: &mut Tournament,
    settings: TournamentSettings,
) -> Result<(), TournamentError> {
    if !matches!(
        tournament.state,
        TournamentState::Idle | TournamentState::Configuring
    ) {
        return Err(TournamentError::InvalidState(tournament.state));
    }
    settings.validate()?;
    tournament.settings = settings;
    tournament.state = TournamentState::Configuring;
    Ok(())
}

/// Configuring -> Registering.
pub fn open_registration(tournament: &mut Tournament) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Configuring {
        return Err(TournamentError::InvalidState(tournament.state));
    }
    tournament.state = TournamentState::Registering;
    Ok(())
}

/// Start the bracket with the thread-local RNG. See [`start_tournament_with_rng`].
pub fn start_tournament(tournament: &mut Tournament) -> Result<Round, TournamentError> {
    start_tournament_with_rng(tournament, &mut rand::thread_rng())
}

/// Freeze the roster and build round 1: shuffle, pair consecutively, odd one
/// out gets a bye. Registering -> Active.
pub fn start_tournament_with_rng<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    rng: &mut R,
) -> Result<Round, TournamentError> {
    if tournament.state != TournamentState::Registering {
        return Err(TournamentError::InvalidState(tournament.state));
    }
    let registered = tournament.roster.len();
    if registered < MIN_PARTICIPANTS_TO_START {
        return Err(TournamentError::InsufficientPlayers {
            required: MIN_PARTICIPANTS_TO_START,
            registered,
        });
    }

    let round = pair_off(tournament.roster.clone(), 1, rng);
    tournament.rounds.push(round.clone());
    tournament.state = TournamentState::Active;
    Ok(round)
}
