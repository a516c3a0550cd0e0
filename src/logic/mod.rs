//! Bracket engine: setup, pairing, winner submission and placements.

mod advancement;
mod pairing;
mod setup;

pub use advancement::{compute_placements, record_winner, record_winner_with_rng, WinnerOutcome};
pub use pairing::pair_off;
pub use setup::{configure, open_registration, start_tournament, start_tournament_with_rng};
