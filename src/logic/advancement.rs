//! Winner submission, round advancement and final placements.

use crate::logic::pairing::pair_off;
use crate::models::{
    Elimination, Match, Participant, Placement, Round, Slot, Tournament, TournamentError,
    TournamentState,
};
use rand::Rng;
use serde::Serialize;

/// What happened after a winner was recorded.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WinnerOutcome {
    /// Match decided; other matches in the round are still open.
    RoundInProgress { decided: Match },
    /// Round finished with 2+ winners; `next` has been appended.
    RoundAdvanced { completed: Round, next: Round },
    /// Round finished with a single winner. Tournament is Complete.
    TournamentFinished {
        completed: Round,
        placements: Vec<Placement>,
    },
}

/// Record a winner with the thread-local RNG. See [`record_winner_with_rng`].
pub fn record_winner(
    tournament: &mut Tournament,
    participant_id: &str,
) -> Result<WinnerOutcome, TournamentError> {
    record_winner_with_rng(tournament, participant_id, &mut rand::thread_rng())
}

/// Mark `participant_id` as winner of its undecided match in the current round.
///
/// The opponent (unless a bye or a bye-filler) is appended to the elimination
/// order. When the round completes, either the next round is paired from its
/// winners or, with a single winner left, placements are computed and the
/// tournament becomes Complete. Fails without mutating anything if the
/// participant has no undecided match in the current round.
pub fn record_winner_with_rng<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    participant_id: &str,
    rng: &mut R,
) -> Result<WinnerOutcome, TournamentError> {
    if tournament.state != TournamentState::Active {
        return Err(TournamentError::InvalidState(tournament.state));
    }
    let not_in_round = || TournamentError::PlayerNotInRound(participant_id.to_string());

    let round = tournament.rounds.last_mut().ok_or_else(not_in_round)?;
    let round_index = round.index;
    let m = round
        .matches
        .iter_mut()
        .find(|m| !m.is_resolved() && m.involves(participant_id))
        .ok_or_else(not_in_round)?;

    let winner = m
        .participants()
        .find(|p| p.id() == participant_id)
        .cloned()
        .ok_or_else(not_in_round)?;
    let loser = match m.opponent_of(participant_id) {
        Some(Slot::Player(p)) if p.is_real() => Some(p.clone()),
        _ => None,
    };
    m.winner = Some(winner);
    let decided = m.clone();

    if let Some(participant) = loser {
        tournament.elimination_order.push(Elimination {
            participant,
            round: round_index,
        });
    }

    let round = &tournament.rounds[tournament.rounds.len() - 1];
    if !round.is_complete() {
        return Ok(WinnerOutcome::RoundInProgress { decided });
    }

    let completed = round.clone();
    let winners = completed.winners();
    if winners.len() == 1 {
        let placements = compute_placements(tournament, &winners[0]);
        tournament.placements = placements.clone();
        tournament.state = TournamentState::Complete;
        log::info!(
            "tournament {} complete after {} rounds, champion {}",
            tournament.id,
            tournament.rounds.len(),
            winners[0].name()
        );
        return Ok(WinnerOutcome::TournamentFinished {
            completed,
            placements,
        });
    }

    let next = pair_off(winners, round_index + 1, rng);
    tournament.rounds.push(next.clone());
    log::info!(
        "tournament {} advanced to round {} ({} matches)",
        tournament.id,
        next.index,
        next.matches.len()
    );
    Ok(WinnerOutcome::RoundAdvanced { completed, next })
}

/// Placements from the champion and the elimination order.
///
/// Rank 2 is whoever was knocked out in the last round; ranks 3 and 4 are the
/// knock-outs of the round before it, most recent first. Ranks with nobody to
/// fill them are left out. Byes can make the second-to-last round lopsided,
/// so 3rd and 4th are ordered by elimination time only.
pub fn compute_placements(tournament: &Tournament, champion: &Participant) -> Vec<Placement> {
    let mut placements = vec![Placement {
        rank: 1,
        participant: champion.clone(),
    }];
    let last = tournament.rounds.len();
    if last == 0 {
        return placements;
    }

    let knocked_out_in = |round: usize| {
        tournament
            .elimination_order
            .iter()
            .rev()
            .filter(move |e| e.round == round)
            .map(|e| e.participant.clone())
    };

    if let Some(runner_up) = knocked_out_in(last).next() {
        placements.push(Placement {
            rank: 2,
            participant: runner_up,
        });
    }
    if last >= 2 {
        for (rank, participant) in (3u8..=4).zip(knocked_out_in(last - 1)) {
            placements.push(Placement { rank, participant });
        }
    }
    placements
}
