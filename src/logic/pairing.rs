//! Random pairing shared by the first round and every later round.

use crate::models::{Match, Participant, Round, Slot};
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle `entrants` and pair them off consecutively into round `index`.
///
/// Every permutation is equally likely. With an odd count the leftover entrant
/// is matched against `Slot::Bye` and advances immediately.
pub fn pair_off<R: Rng + ?Sized>(
    mut entrants: Vec<Participant>,
    index: usize,
    rng: &mut R,
) -> Round {
    entrants.shuffle(rng);

    let matches: Vec<Match> = entrants
        .chunks(2)
        .map(|pair| {
            let away = pair.get(1).cloned().map_or(Slot::Bye, Slot::Player);
            Match::new(Slot::Player(pair[0].clone()), away)
        })
        .collect();

    log::debug!(
        "round {}: {} matches from {} entrants",
        index,
        matches.len(),
        entrants.len()
    );

    Round { index, matches }
}
