//! Integration tests for TournamentService: authorization, reward side
//! effects, leaderboard routing and per-scope isolation.

use scoped_bracket::render::{leaderboard_csv, TextNotifier};
use scoped_bracket::service::leaderboard;
use scoped_bracket::service::rewards::{CHAMPION_TAG, RUNNER_UP_TAG};
use scoped_bracket::service::{
    Actor, BracketEvent, Capability, Notifier, RenderError, RoleAuthorizer, ScopeRegistry,
    ScopeStore, ServiceError, StandingRecord, TournamentService,
};
use scoped_bracket::storage::MemoryStore;
use scoped_bracket::{
    Participant, TournamentError, TournamentSettings, TournamentState, WinnerOutcome,
};
use std::sync::{Arc, Mutex};
use std::thread;

const SCOPE: &str = "guild-1";

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<(String, BracketEvent)>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<(String, BracketEvent)> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, scope: &str, event: &BracketEvent) -> Result<(), RenderError> {
        self.events
            .lock()
            .unwrap()
            .push((scope.to_string(), event.clone()));
        Ok(())
    }
}

struct BrokenNotifier;

impl Notifier for BrokenNotifier {
    fn publish(&self, _scope: &str, _event: &BracketEvent) -> Result<(), RenderError> {
        Err(RenderError("chat platform unreachable".to_string()))
    }
}

struct Harness {
    service: TournamentService,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = TournamentService::new(
        store.clone(),
        Arc::new(RoleAuthorizer::new(store.clone())),
        notifier.clone(),
    );
    Harness {
        service,
        store,
        notifier,
    }
}

fn admin() -> Actor {
    Actor::new("admin", "Admin").admin()
}

fn member(i: usize) -> Actor {
    Actor::new(format!("u{i}"), format!("User {i}"))
}

fn settings(cap: usize) -> TournamentSettings {
    TournamentSettings {
        title: "Weekly Bracket".to_string(),
        max_participants: cap,
        ..TournamentSettings::default()
    }
}

/// Configure, open and fill a bracket with `n` members.
fn open_bracket(service: &TournamentService, scope: &str, n: usize) {
    service.configure(&admin(), scope, settings(16)).unwrap();
    service.open_registration(&admin(), scope).unwrap();
    for i in 1..=n {
        service.register(&member(i), scope).unwrap();
    }
}

/// Report the home side of every open match until someone is champion.
fn play_out(service: &TournamentService, scope: &str) -> WinnerOutcome {
    loop {
        let t = service.tournament(scope);
        let open: Vec<String> = t
            .current_round()
            .unwrap()
            .matches
            .iter()
            .filter(|m| !m.is_resolved())
            .map(|m| m.home.participant().unwrap().id().to_string())
            .collect();
        for id in open {
            let outcome = service.record_winner(&admin(), scope, &id).unwrap();
            if matches!(outcome, WinnerOutcome::TournamentFinished { .. }) {
                return outcome;
            }
        }
    }
}

#[test]
fn members_without_a_granted_role_are_refused() {
    let h = harness();
    let err = h
        .service
        .configure(&member(1), SCOPE, settings(8))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Unauthorized {
            capability: Capability::ConfigureTournament
        }
    ));
    assert_eq!(h.service.tournament(SCOPE).state, TournamentState::Idle);
    assert!(h.notifier.events().is_empty());
}

#[test]
fn granted_role_unlocks_the_capability_in_that_scope_only() {
    let h = harness();
    let organiser = member(1).with_role("organisers");
    assert!(h
        .service
        .grant_capability(&admin(), SCOPE, Capability::ConfigureTournament, "organisers")
        .unwrap());

    h.service.configure(&organiser, SCOPE, settings(8)).unwrap();
    assert!(matches!(
        h.service.configure(&organiser, "guild-2", settings(8)),
        Err(ServiceError::Unauthorized { .. })
    ));
    assert!(matches!(
        h.service.start(&organiser, SCOPE),
        Err(ServiceError::Unauthorized {
            capability: Capability::StartTournament
        })
    ));

    assert!(h
        .service
        .revoke_capability(&admin(), SCOPE, Capability::ConfigureTournament, "organisers")
        .unwrap());
    assert!(h.service.configure(&organiser, SCOPE, settings(8)).is_err());
}

#[test]
fn only_administrators_manage_grants() {
    let h = harness();
    let err = h
        .service
        .grant_capability(&member(1), SCOPE, Capability::RecordWinner, "everyone")
        .unwrap_err();
    assert!(matches!(err, ServiceError::AdministratorOnly));
    assert!(h
        .store
        .granted_roles(SCOPE, Capability::RecordWinner)
        .is_empty());
}

#[test]
fn engine_errors_pass_through() {
    let h = harness();
    open_bracket(&h.service, SCOPE, 1);
    let err = h.service.register(&member(1), SCOPE).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(TournamentError::AlreadyRegistered(_))
    ));
    let err = h.service.start(&admin(), SCOPE).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(TournamentError::InsufficientPlayers { .. })
    ));
}

#[test]
fn finished_tournament_rewards_top_four_and_resets_scope() {
    let h = harness();
    open_bracket(&h.service, SCOPE, 4);
    h.service.start(&admin(), SCOPE).unwrap();

    let placements = match play_out(&h.service, SCOPE) {
        WinnerOutcome::TournamentFinished { placements, .. } => placements,
        other => panic!("expected finish, got {other:?}"),
    };
    assert_eq!(placements.len(), 4);

    let champion = placements[0].participant.id();
    let runner_up = placements[1].participant.id();
    assert_eq!(h.store.points(SCOPE, champion), 100);
    assert_eq!(h.store.trophies(SCOPE, champion), 1);
    assert_eq!(h.store.tags(SCOPE, champion), vec![CHAMPION_TAG.to_string()]);
    assert_eq!(h.store.points(SCOPE, runner_up), 50);
    assert_eq!(h.store.trophies(SCOPE, runner_up), 0);
    assert_eq!(h.store.tags(SCOPE, runner_up), vec![RUNNER_UP_TAG.to_string()]);
    for p in &placements[2..] {
        assert_eq!(h.store.points(SCOPE, p.participant.id()), 30);
        assert!(h.store.tags(SCOPE, p.participant.id()).is_empty());
    }

    let t = h.service.tournament(SCOPE);
    assert_eq!(t.state, TournamentState::Idle);
    assert!(t.roster.is_empty());
    assert!(h.service.registry().scopes().is_empty());

    let result = h.service.last_result(SCOPE).unwrap();
    assert_eq!(result.title, "Weekly Bracket");
    assert_eq!(result.rounds_played, 2);
    assert_eq!(result.placements, placements);
    assert_eq!(result.rewards.len(), 4);
    assert!(result.rewards[0].trophy);

    let finished = h
        .notifier
        .events()
        .into_iter()
        .filter(|(_, e)| matches!(e, BracketEvent::TournamentFinished { .. }))
        .count();
    assert_eq!(finished, 1);
}

#[test]
fn custom_reward_table_is_used() {
    let h = harness();
    let mut custom = settings(4);
    custom.rewards.first = 500;
    custom.rewards.second = 7;
    h.service.configure(&admin(), SCOPE, custom).unwrap();
    h.service.open_registration(&admin(), SCOPE).unwrap();
    h.service.register(&member(1), SCOPE).unwrap();
    h.service.register(&member(2), SCOPE).unwrap();
    h.service.start(&admin(), SCOPE).unwrap();
    h.service.record_winner(&admin(), SCOPE, "u2").unwrap();

    assert_eq!(h.store.points(SCOPE, "u2"), 500);
    assert_eq!(h.store.points(SCOPE, "u1"), 7);
}

#[test]
fn bye_fillers_are_never_rewarded() {
    let h = harness();
    h.service.configure(&admin(), SCOPE, settings(4)).unwrap();
    h.service.open_registration(&admin(), SCOPE).unwrap();
    h.service.register(&member(1), SCOPE).unwrap();
    let filler = h
        .service
        .add_bye_filler(&admin(), SCOPE, "Practice Dummy")
        .unwrap();
    assert!(!filler.is_real());
    h.service.start(&admin(), SCOPE).unwrap();

    h.service.record_winner(&admin(), SCOPE, "u1").unwrap();

    let result = h.service.last_result(SCOPE).unwrap();
    assert_eq!(result.rewards.len(), 1);
    assert_eq!(h.store.points(SCOPE, "u1"), 100);
    assert_eq!(h.store.points(SCOPE, filler.id()), 0);
    assert!(h
        .store
        .standings(SCOPE)
        .iter()
        .all(|r| r.participant_id != filler.id()));
}

#[test]
fn cancel_discards_an_active_bracket() {
    let h = harness();
    open_bracket(&h.service, SCOPE, 3);
    h.service.start(&admin(), SCOPE).unwrap();
    h.service.cancel(&admin(), SCOPE).unwrap();

    assert_eq!(h.service.tournament(SCOPE).state, TournamentState::Idle);
    assert!(h.service.last_result(SCOPE).is_none());
    assert!(h.store.standings(SCOPE).is_empty());
}

#[test]
fn scopes_do_not_share_brackets() {
    let h = harness();
    open_bracket(&h.service, "a", 2);
    h.service.configure(&admin(), "b", settings(2)).unwrap();

    assert_eq!(h.service.tournament("a").state, TournamentState::Registering);
    assert_eq!(h.service.tournament("b").state, TournamentState::Configuring);
    assert!(h.service.tournament("b").roster.is_empty());
    assert_eq!(h.service.registry().scopes(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn concurrent_registration_never_exceeds_the_cap() {
    let h = harness();
    h.service.configure(&admin(), SCOPE, settings(8)).unwrap();
    h.service.open_registration(&admin(), SCOPE).unwrap();
    let service = Arc::new(h.service);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.register(&member(i), SCOPE).is_ok())
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(accepted, 8);
    assert_eq!(service.tournament(SCOPE).roster.len(), 8);
}

#[test]
fn leaderboard_orders_by_points_then_trophies_then_name() {
    let h = harness();
    let target = |id: &str, name: &str| Participant::real(id, name);

    h.service
        .adjust_points(&admin(), SCOPE, &target("z", "zed"), 40)
        .unwrap();
    h.service
        .adjust_points(&admin(), SCOPE, &target("b", "Bea"), 40)
        .unwrap();
    h.service
        .adjust_points(&admin(), SCOPE, &target("c", "Cy"), 40)
        .unwrap();
    h.service
        .adjust_trophies(&admin(), SCOPE, &target("c", "Cy"), 1)
        .unwrap();
    h.service
        .adjust_points(&admin(), SCOPE, &target("top", "Top"), 90)
        .unwrap();
    h.service
        .add_tag(&admin(), SCOPE, &target("t", "Tagged"), "🎯")
        .unwrap();
    h.service
        .adjust_points(&admin(), SCOPE, &target("gone", "Gone"), 10)
        .unwrap();
    h.service
        .adjust_points(&admin(), SCOPE, &target("gone", "Gone"), -10)
        .unwrap();

    let board = h.service.leaderboard(SCOPE);
    let order: Vec<&str> = board
        .entries
        .iter()
        .map(|e| e.participant_id.as_str())
        .collect();
    assert_eq!(order, vec!["top", "c", "b", "z", "t"]);
    let positions: Vec<usize> = board.entries.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    assert_eq!(board.entries[1].name, "Cy");
}

#[test]
fn reward_management_needs_its_capability() {
    let h = harness();
    let err = h
        .service
        .adjust_points(&member(1), SCOPE, &Participant::real("x", "X"), 5)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Unauthorized {
            capability: Capability::ManageRewards
        }
    ));
    assert_eq!(h.store.points(SCOPE, "x"), 0);
}

#[test]
fn tags_can_be_removed_one_at_a_time_or_all() {
    let h = harness();
    let target = Participant::real("x", "X");
    assert!(h.service.add_tag(&admin(), SCOPE, &target, "🔥").unwrap());
    assert!(!h.service.add_tag(&admin(), SCOPE, &target, "🔥").unwrap());
    assert!(h.service.add_tag(&admin(), SCOPE, &target, "⭐").unwrap());

    assert!(h.service.remove_tag(&admin(), SCOPE, "x", Some("🔥")).unwrap());
    assert_eq!(h.store.tags(SCOPE, "x"), vec!["⭐".to_string()]);
    assert!(h.service.remove_tag(&admin(), SCOPE, "x", None).unwrap());
    assert!(!h.service.remove_tag(&admin(), SCOPE, "x", None).unwrap());
}

#[test]
fn reset_stats_clears_only_the_scope() {
    let h = harness();
    let target = Participant::real("x", "X");
    h.service.adjust_points(&admin(), "a", &target, 10).unwrap();
    h.service.adjust_points(&admin(), "b", &target, 20).unwrap();
    h.service.reset_stats(&admin(), "a").unwrap();

    assert_eq!(h.store.points("a", "x"), 0);
    assert_eq!(h.store.points("b", "x"), 20);
}

#[test]
fn leaderboard_goes_to_the_configured_channel() {
    let h = harness();
    h.service
        .adjust_points(&admin(), SCOPE, &Participant::real("x", "X"), 10)
        .unwrap();
    assert!(!h
        .notifier
        .events()
        .iter()
        .any(|(_, e)| matches!(e, BracketEvent::LeaderboardUpdated { .. })));

    h.service
        .set_leaderboard_channel(&admin(), SCOPE, Some("standings"))
        .unwrap();
    h.service
        .adjust_points(&admin(), SCOPE, &Participant::real("y", "Y"), 5)
        .unwrap();

    let updates: Vec<_> = h
        .notifier
        .events()
        .into_iter()
        .filter_map(|(_, e)| match e {
            BracketEvent::LeaderboardUpdated {
                channel,
                leaderboard,
            } => Some((channel, leaderboard.entries.len())),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![("standings".to_string(), 1), ("standings".to_string(), 2)]
    );
    assert!(matches!(
        h.service
            .set_leaderboard_channel(&member(1), SCOPE, None),
        Err(ServiceError::AdministratorOnly)
    ));
}

#[test]
fn notifier_failures_do_not_undo_transitions() {
    let store = Arc::new(MemoryStore::new());
    let service = TournamentService::new(
        store.clone(),
        Arc::new(RoleAuthorizer::new(store.clone())),
        Arc::new(BrokenNotifier),
    );
    open_bracket(&service, SCOPE, 2);
    service.start(&admin(), SCOPE).unwrap();
    service.record_winner(&admin(), SCOPE, "u1").unwrap();

    assert_eq!(store.points(SCOPE, "u1"), 100);
    assert!(service.last_result(SCOPE).is_some());
}

#[test]
fn text_notifier_keeps_the_latest_message_per_scope() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(TextNotifier::new());
    let service = TournamentService::new(
        store.clone(),
        Arc::new(RoleAuthorizer::new(store.clone())),
        notifier.clone(),
    );
    open_bracket(&service, SCOPE, 2);

    let text = notifier.latest(SCOPE).unwrap();
    assert!(text.contains("User 2 registered"), "{text}");
    assert!(text.contains("2/16"), "{text}");
    assert!(notifier.latest("elsewhere").is_none());

    service
        .set_leaderboard_channel(&admin(), SCOPE, Some("board"))
        .unwrap();
    let board = notifier.channel("board").unwrap();
    assert!(board.starts_with("Server Leaderboard"), "{board}");
}

#[test]
fn leaderboard_exports_as_csv() {
    let records = vec![
        StandingRecord {
            participant_id: "a".to_string(),
            name: Some("Ann, Jr.".to_string()),
            points: 100,
            trophies: 1,
            tags: vec![CHAMPION_TAG.to_string()],
        },
        StandingRecord {
            participant_id: "b".to_string(),
            name: None,
            points: 0,
            trophies: 0,
            tags: Vec::new(),
        },
    ];
    let board = leaderboard::compute(SCOPE, records);
    let csv = leaderboard_csv(&board).unwrap();
    let mut lines = csv.lines();

    assert_eq!(
        lines.next(),
        Some("position,participant_id,name,points,trophies,tags")
    );
    assert_eq!(lines.next(), Some("1,a,\"Ann, Jr.\",100,1,🥇"));
    assert_eq!(lines.next(), None);
}

#[test]
fn looking_at_a_scope_does_not_keep_it() {
    let registry = ScopeRegistry::new();
    for i in 0..1000 {
        let t = registry.snapshot(&format!("scope-{i}"));
        assert_eq!(t.state, TournamentState::Idle);
    }
    assert!(registry.scopes().is_empty());

    let h = harness();
    for i in 0..100 {
        let scope = format!("scope-{i}");
        h.service.tournament(&scope);
        h.service.leaderboard(&scope);
        h.service.last_result(&scope);
    }
    assert!(h.service.registry().scopes().is_empty());
}

#[test]
fn idle_scopes_are_released() {
    let h = harness();
    assert!(matches!(
        h.service.register(&member(1), "never-configured"),
        Err(ServiceError::Engine(TournamentError::InvalidState(
            TournamentState::Idle
        )))
    ));
    assert!(h.service.registry().scopes().is_empty());

    open_bracket(&h.service, SCOPE, 2);
    assert_eq!(h.service.registry().scopes(), vec![SCOPE.to_string()]);
    h.service.cancel(&admin(), SCOPE).unwrap();
    assert!(h.service.registry().scopes().is_empty());

    h.service.configure(&admin(), SCOPE, settings(4)).unwrap();
    assert_eq!(
        h.service.tournament(SCOPE).state,
        TournamentState::Configuring
    );
}

#[test]
fn release_keeps_scopes_that_are_running() {
    let registry = ScopeRegistry::new();
    registry.with_scope("busy", |t| {
        scoped_bracket::configure(t, settings(4)).unwrap();
    });
    assert!(!registry.release_if_idle("busy"));
    assert_eq!(registry.scopes(), vec!["busy".to_string()]);

    registry.with_scope("busy", |t| t.reset());
    assert!(registry.release_if_idle("busy"));
    assert!(!registry.release_if_idle("busy"));
}

#[test]
fn trophy_leaderboard_lists_holders_by_trophies() {
    let h = harness();
    let target = |id: &str, name: &str| Participant::real(id, name);
    h.service
        .adjust_points(&admin(), SCOPE, &target("rich", "Rich"), 500)
        .unwrap();
    h.service
        .adjust_trophies(&admin(), SCOPE, &target("one", "One"), 1)
        .unwrap();
    h.service
        .adjust_trophies(&admin(), SCOPE, &target("three", "Three"), 3)
        .unwrap();
    h.service
        .adjust_trophies(&admin(), SCOPE, &target("two", "Two"), 2)
        .unwrap();

    let board = h.service.trophy_leaderboard(SCOPE);
    let order: Vec<(&str, i64)> = board
        .entries
        .iter()
        .map(|e| (e.participant_id.as_str(), e.trophies))
        .collect();
    assert_eq!(order, vec![("three", 3), ("two", 2), ("one", 1)]);
    assert_eq!(board.entries[0].position, 1);
}

#[test]
fn trophy_leaderboard_shows_the_top_ten() {
    let h = harness();
    for i in 1..=12 {
        h.service
            .adjust_trophies(&admin(), SCOPE, &Participant::real(format!("p{i:02}"), "P"), i)
            .unwrap();
    }
    let board = h.service.trophy_leaderboard(SCOPE);
    assert_eq!(board.entries.len(), leaderboard::TROPHY_BOARD_SIZE);
    assert_eq!(board.entries[0].participant_id, "p12");
    assert_eq!(board.entries[9].participant_id, "p03");
}

#[test]
fn granted_roles_can_be_listed() {
    let h = harness();
    let cap = Capability::ConfigureTournament;
    assert!(h.service.granted_roles(SCOPE, cap).is_empty());

    h.service.grant_capability(&admin(), SCOPE, cap, "hosts").unwrap();
    h.service.grant_capability(&admin(), SCOPE, cap, "mods").unwrap();
    assert_eq!(
        h.service.granted_roles(SCOPE, cap),
        vec!["hosts".to_string(), "mods".to_string()]
    );
    assert!(h
        .service
        .granted_roles(SCOPE, Capability::RecordWinner)
        .is_empty());
    assert!(h.service.granted_roles("guild-2", cap).is_empty());

    h.service.revoke_capability(&admin(), SCOPE, cap, "hosts").unwrap();
    assert_eq!(h.service.granted_roles(SCOPE, cap), vec!["mods".to_string()]);
}
