//! Reward distribution for finished tournaments.

use crate::models::{Participant, ParticipantId, Placement, RewardTable};
use crate::service::ScopeStore;
use serde::Serialize;

/// Tag given to the champion.
pub const CHAMPION_TAG: &str = "🥇";
/// Tag given to the runner-up.
pub const RUNNER_UP_TAG: &str = "🥈";

/// Points (and trophy) handed to one placed participant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RewardGrant {
    pub rank: u8,
    pub participant_id: ParticipantId,
    pub points: i64,
    pub trophy: bool,
}

/// Credit each real placed participant with the points for their rank; the
/// champion also gets a trophy and both finalists get a tag. Bye-fillers are
/// skipped. Store failures are logged and do not stop the remaining grants.
pub fn distribute(
    store: &dyn ScopeStore,
    scope: &str,
    placements: &[Placement],
    table: &RewardTable,
) -> Vec<RewardGrant> {
    let mut grants = Vec::new();
    for placement in placements {
        let (id, name) = match &placement.participant {
            Participant::RealActor { id, name } => (id, name),
            Participant::ByeFiller { name, .. } => {
                log::debug!("no reward for bye-filler {} (rank {})", name, placement.rank);
                continue;
            }
        };
        let points = table.amount_for(placement.rank);
        let champion = placement.rank == 1;

        let mut ops = vec![
            store.set_name(scope, id, name),
            store.add_points(scope, id, points).map(drop),
        ];
        if champion {
            ops.push(store.add_trophies(scope, id, 1).map(drop));
            ops.push(store.add_tag(scope, id, CHAMPION_TAG).map(drop));
        } else if placement.rank == 2 {
            ops.push(store.add_tag(scope, id, RUNNER_UP_TAG).map(drop));
        }
        for err in ops.into_iter().filter_map(Result::err) {
            log::warn!(
                "reward for {} (rank {}) in scope {} not fully saved: {}",
                name,
                placement.rank,
                scope,
                err
            );
        }

        grants.push(RewardGrant {
            rank: placement.rank,
            participant_id: id.clone(),
            points,
            trophy: champion,
        });
    }
    grants
}
