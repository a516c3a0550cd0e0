//! Leaderboard, always recomputed in full from stored totals.

use crate::models::ParticipantId;
use crate::service::{ScopeId, StandingRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub position: usize,
    pub participant_id: ParticipantId,
    pub name: String,
    pub points: i64,
    pub trophies: i64,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Leaderboard {
    pub scope: ScopeId,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<LeaderboardEntry>,
}

/// Rows shown on the trophy leaderboard.
pub const TROPHY_BOARD_SIZE: usize = 10;

/// Build a leaderboard from store records.
///
/// Only participants with points, trophies or a tag are listed. Order is
/// points desc, trophies desc, then name asc (case-insensitive), then id so
/// the result is fully determined by the records.
pub fn compute(scope: &str, records: Vec<StandingRecord>) -> Leaderboard {
    let mut listed = named(records, |r| r.points > 0 || r.trophies > 0 || !r.tags.is_empty());

    listed.sort_by(|(a, a_name), (b, b_name)| {
        b.points
            .cmp(&a.points)
            .then(b.trophies.cmp(&a.trophies))
            .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });

    number(scope, listed)
}

/// Trophy leaderboard: only participants holding trophies, most trophies
/// first (points, then name and id break ties), capped at
/// [`TROPHY_BOARD_SIZE`] rows.
pub fn compute_trophies(scope: &str, records: Vec<StandingRecord>) -> Leaderboard {
    let mut listed = named(records, |r| r.trophies > 0);
    listed.sort_by(|(a, a_name), (b, b_name)| {
        b.trophies
            .cmp(&a.trophies)
            .then(b.points.cmp(&a.points))
            .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    listed.truncate(TROPHY_BOARD_SIZE);
    number(scope, listed)
}

fn named(
    records: Vec<StandingRecord>,
    keep: impl Fn(&StandingRecord) -> bool,
) -> Vec<(StandingRecord, String)> {
    records
        .into_iter()
        .filter(|r| keep(r))
        .map(|r| {
            let name = r.name.clone().unwrap_or_else(|| r.participant_id.clone());
            (r, name)
        })
        .collect()
}

fn number(scope: &str, listed: Vec<(StandingRecord, String)>) -> Leaderboard {
    let entries = listed
        .into_iter()
        .enumerate()
        .map(|(i, (r, name))| LeaderboardEntry {
            position: i + 1,
            participant_id: r.participant_id,
            name,
            points: r.points,
            trophies: r.trophies,
            tags: r.tags,
        })
        .collect();

    Leaderboard {
        scope: scope.to_string(),
        generated_at: Utc::now(),
        entries,
    }
}
