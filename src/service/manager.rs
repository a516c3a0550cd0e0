//! TournamentService: turns chat commands into bracket operations and
//! reward side effects.

use crate::logic::{self, WinnerOutcome};
use crate::models::{
    Participant, Placement, RewardTable, Round, Tournament, TournamentError, TournamentId,
    TournamentSettings,
};
use crate::service::errors::{ServiceError, ServiceResult};
use crate::service::leaderboard::{self, Leaderboard};
use crate::service::registry::ScopeRegistry;
use crate::service::rewards::{self, RewardGrant};
use crate::service::{
    Actor, Authorizer, BracketEvent, Capability, Notifier, RoleId, ScopeId, ScopeStore,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Summary of the last tournament a scope finished.
#[derive(Clone, Debug, Serialize)]
pub struct CompletedTournament {
    pub tournament_id: TournamentId,
    pub title: String,
    pub rounds_played: usize,
    pub placements: Vec<Placement>,
    pub rewards: Vec<RewardGrant>,
    pub finished_at: DateTime<Utc>,
}

/// Facts captured from a tournament just before it is reset.
struct Finish {
    tournament_id: TournamentId,
    rewards: RewardTable,
    rounds_played: usize,
}

/// Owns every scope's bracket and the collaborators around it.
///
/// Each command locks only its own scope for the state transition. Rewards,
/// notifications and leaderboard refreshes run after the lock is released; if
/// they fail the transition stands and the failure is logged.
pub struct TournamentService {
    registry: ScopeRegistry,
    store: Arc<dyn ScopeStore>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    last_results: RwLock<HashMap<ScopeId, CompletedTournament>>,
}

impl TournamentService {
    pub fn new(
        store: Arc<dyn ScopeStore>,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry: ScopeRegistry::new(),
            store,
            authorizer,
            notifier,
            last_results: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// Copy of the scope's current tournament.
    pub fn tournament(&self, scope: &str) -> Tournament {
        self.registry.snapshot(scope)
    }

    pub fn last_result(&self, scope: &str) -> Option<CompletedTournament> {
        self.last_results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned()
    }

    fn authorize(&self, actor: &Actor, scope: &str, capability: Capability) -> ServiceResult<()> {
        if self.authorizer.has_capability(actor, scope, capability) {
            Ok(())
        } else {
            log::info!(
                "{} ({}) denied {} in scope {}",
                actor.name,
                actor.id,
                capability,
                scope
            );
            Err(ServiceError::Unauthorized { capability })
        }
    }

    fn require_admin(&self, actor: &Actor) -> ServiceResult<()> {
        if actor.administrator {
            Ok(())
        } else {
            Err(ServiceError::AdministratorOnly)
        }
    }

    /// Run `f` on the scope's tournament, then let the registry forget the
    /// scope if it was left Idle.
    fn in_scope<T>(&self, scope: &str, f: impl FnOnce(&mut Tournament) -> T) -> T {
        let out = self.registry.with_scope(scope, f);
        self.registry.release_if_idle(scope);
        out
    }

    fn publish(&self, scope: &str, event: &BracketEvent) {
        if let Err(e) = self.notifier.publish(scope, event) {
            log::warn!("scope {}: {}", scope, e);
        }
    }

    // ------------------------------------------------------------------
    // Bracket lifecycle
    // ------------------------------------------------------------------

    /// Idle/Configuring -> Configuring with new settings.
    pub fn configure(
        &self,
        actor: &Actor,
        scope: &str,
        settings: TournamentSettings,
    ) -> ServiceResult<()> {
        self.authorize(actor, scope, Capability::ConfigureTournament)?;
        self.in_scope(scope, |t| logic::configure(t, settings.clone()))?;
        log::info!("scope {}: configured \"{}\"", scope, settings.title);
        self.publish(scope, &BracketEvent::Configured { settings });
        Ok(())
    }

    /// Configuring -> Registering.
    pub fn open_registration(&self, actor: &Actor, scope: &str) -> ServiceResult<()> {
        self.authorize(actor, scope, Capability::ConfigureTournament)?;
        let settings = self.in_scope(scope, |t| {
            logic::open_registration(t).map(|()| t.settings.clone())
        })?;
        log::info!("scope {}: registration open", scope);
        self.publish(scope, &BracketEvent::RegistrationOpened { settings });
        Ok(())
    }

    /// The actor joins the bracket themselves. Returns the new roster size.
    pub fn register(&self, actor: &Actor, scope: &str) -> ServiceResult<usize> {
        self.enter(scope, actor.participant())
    }

    /// Add a synthetic entrant (for trying out brackets).
    pub fn add_bye_filler(
        &self,
        actor: &Actor,
        scope: &str,
        name: &str,
    ) -> ServiceResult<Participant> {
        self.authorize(actor, scope, Capability::ConfigureTournament)?;
        let filler = Participant::filler(name);
        self.enter(scope, filler.clone())?;
        Ok(filler)
    }

    fn enter(&self, scope: &str, participant: Participant) -> ServiceResult<usize> {
        let (roster_size, cap) = self.in_scope(scope, |t| {
            t.register(participant.clone())
                .map(|n| (n, t.settings.max_participants))
        })?;
        log::info!(
            "scope {}: {} registered ({}/{})",
            scope,
            participant.name(),
            roster_size,
            cap
        );
        self.publish(
            scope,
            &BracketEvent::Registered {
                participant,
                roster_size,
                cap,
            },
        );
        Ok(roster_size)
    }

    /// The actor leaves the bracket. Returns the new roster size.
    pub fn unregister(&self, actor: &Actor, scope: &str) -> ServiceResult<usize> {
        let (roster_size, cap) = self.in_scope(scope, |t| {
            t.unregister(&actor.id)
                .map(|n| (n, t.settings.max_participants))
        })?;
        log::info!("scope {}: {} unregistered", scope, actor.name);
        self.publish(
            scope,
            &BracketEvent::Unregistered {
                participant_id: actor.id.clone(),
                roster_size,
                cap,
            },
        );
        Ok(roster_size)
    }

    /// Registering -> Active. Returns round 1.
    pub fn start(&self, actor: &Actor, scope: &str) -> ServiceResult<Round> {
        self.authorize(actor, scope, Capability::StartTournament)?;
        let (round, title) = self.in_scope(scope, |t| {
            logic::start_tournament(t).map(|round| (round, t.settings.title.clone()))
        })?;
        log::info!(
            "scope {}: \"{}\" started with {} matches",
            scope,
            title,
            round.matches.len()
        );
        self.publish(
            scope,
            &BracketEvent::Started {
                title,
                round: round.clone(),
            },
        );
        Ok(round)
    }

    /// Record a match winner. When this decides the champion, rewards are
    /// handed out and the scope goes back to Idle.
    pub fn record_winner(
        &self,
        actor: &Actor,
        scope: &str,
        participant_id: &str,
    ) -> ServiceResult<WinnerOutcome> {
        self.authorize(actor, scope, Capability::RecordWinner)?;

        let (outcome, title, finish) = self.in_scope(scope, |t| {
            let outcome = logic::record_winner(t, participant_id)?;
            let title = t.settings.title.clone();
            let finish = match outcome {
                WinnerOutcome::TournamentFinished { .. } => {
                    let finish = Finish {
                        tournament_id: t.id,
                        rewards: t.settings.rewards,
                        rounds_played: t.rounds.len(),
                    };
                    t.reset();
                    Some(finish)
                }
                _ => None,
            };
            Ok::<_, TournamentError>((outcome, title, finish))
        })?;

        let finished_at = Utc::now();
        self.publish(
            scope,
            &BracketEvent::from_outcome(&outcome, &title, finished_at),
        );

        if let (Some(finish), WinnerOutcome::TournamentFinished { placements, .. }) =
            (finish, &outcome)
        {
            let grants =
                rewards::distribute(self.store.as_ref(), scope, placements, &finish.rewards);
            log::info!(
                "scope {}: \"{}\" finished, {} placements rewarded",
                scope,
                title,
                grants.len()
            );
            self.last_results
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(
                    scope.to_string(),
                    CompletedTournament {
                        tournament_id: finish.tournament_id,
                        title,
                        rounds_played: finish.rounds_played,
                        placements: placements.clone(),
                        rewards: grants,
                        finished_at,
                    },
                );
            self.refresh_leaderboard(scope);
        }

        Ok(outcome)
    }

    /// Throw away the scope's tournament, whatever state it is in.
    pub fn cancel(&self, actor: &Actor, scope: &str) -> ServiceResult<()> {
        self.authorize(actor, scope, Capability::ConfigureTournament)?;
        self.in_scope(scope, Tournament::reset);
        log::info!("scope {}: tournament cancelled by {}", scope, actor.name);
        self.publish(scope, &BracketEvent::Cancelled);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rewards and leaderboard
    // ------------------------------------------------------------------

    /// Full recomputation from stored totals.
    pub fn leaderboard(&self, scope: &str) -> Leaderboard {
        leaderboard::compute(scope, self.store.standings(scope))
    }

    /// Trophy holders only, most trophies first, top ten.
    pub fn trophy_leaderboard(&self, scope: &str) -> Leaderboard {
        leaderboard::compute_trophies(scope, self.store.standings(scope))
    }

    /// Publish the leaderboard to the scope's leaderboard channel, if any.
    fn refresh_leaderboard(&self, scope: &str) {
        if let Some(channel) = self.store.leaderboard_channel(scope) {
            let leaderboard = self.leaderboard(scope);
            self.publish(
                scope,
                &BracketEvent::LeaderboardUpdated {
                    channel,
                    leaderboard,
                },
            );
        }
    }

    fn remember_name(&self, scope: &str, target: &Participant) -> ServiceResult<()> {
        if let Participant::RealActor { id, name } = target {
            self.store.set_name(scope, id, name)?;
        }
        Ok(())
    }

    /// Add (or with a negative delta, remove) points. Returns the new total.
    pub fn adjust_points(
        &self,
        actor: &Actor,
        scope: &str,
        target: &Participant,
        delta: i64,
    ) -> ServiceResult<i64> {
        self.authorize(actor, scope, Capability::ManageRewards)?;
        self.remember_name(scope, target)?;
        let total = self.store.add_points(scope, target.id(), delta)?;
        self.refresh_leaderboard(scope);
        Ok(total)
    }

    /// Add (or remove) trophies. Returns the new total.
    pub fn adjust_trophies(
        &self,
        actor: &Actor,
        scope: &str,
        target: &Participant,
        delta: i64,
    ) -> ServiceResult<i64> {
        self.authorize(actor, scope, Capability::ManageRewards)?;
        self.remember_name(scope, target)?;
        let total = self.store.add_trophies(scope, target.id(), delta)?;
        self.refresh_leaderboard(scope);
        Ok(total)
    }

    /// False if the target already had the tag.
    pub fn add_tag(
        &self,
        actor: &Actor,
        scope: &str,
        target: &Participant,
        tag: &str,
    ) -> ServiceResult<bool> {
        self.authorize(actor, scope, Capability::ManageRewards)?;
        self.remember_name(scope, target)?;
        let added = self.store.add_tag(scope, target.id(), tag)?;
        if added {
            self.refresh_leaderboard(scope);
        }
        Ok(added)
    }

    /// Remove one tag, or all of them when `tag` is None.
    pub fn remove_tag(
        &self,
        actor: &Actor,
        scope: &str,
        participant_id: &str,
        tag: Option<&str>,
    ) -> ServiceResult<bool> {
        self.authorize(actor, scope, Capability::ManageRewards)?;
        let removed = self.store.remove_tag(scope, participant_id, tag)?;
        if removed {
            self.refresh_leaderboard(scope);
        }
        Ok(removed)
    }

    /// Wipe points, trophies and tags for the scope.
    pub fn reset_stats(&self, actor: &Actor, scope: &str) -> ServiceResult<()> {
        self.authorize(actor, scope, Capability::ManageRewards)?;
        self.store.reset_scope(scope)?;
        log::info!("scope {}: stats reset by {}", scope, actor.name);
        self.refresh_leaderboard(scope);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Let members of `role` use `capability` in this scope.
    pub fn grant_capability(
        &self,
        actor: &Actor,
        scope: &str,
        capability: Capability,
        role: &str,
    ) -> ServiceResult<bool> {
        self.require_admin(actor)?;
        let granted = self.store.grant_role(scope, capability, role)?;
        log::info!("scope {}: role {} granted {}", scope, role, capability);
        Ok(granted)
    }

    /// Roles that currently unlock `capability` in this scope. Anyone may
    /// look, so members can see what they need to host.
    pub fn granted_roles(&self, scope: &str, capability: Capability) -> Vec<RoleId> {
        self.store.granted_roles(scope, capability)
    }

    pub fn revoke_capability(
        &self,
        actor: &Actor,
        scope: &str,
        capability: Capability,
        role: &str,
    ) -> ServiceResult<bool> {
        self.require_admin(actor)?;
        Ok(self.store.revoke_role(scope, capability, role)?)
    }

    /// Route leaderboard updates to `channel` (None stops them) and publish
    /// the current leaderboard there right away.
    pub fn set_leaderboard_channel(
        &self,
        actor: &Actor,
        scope: &str,
        channel: Option<&str>,
    ) -> ServiceResult<()> {
        self.require_admin(actor)?;
        self.store.set_leaderboard_channel(scope, channel)?;
        self.refresh_leaderboard(scope);
        Ok(())
    }
}
