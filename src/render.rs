//! Plain-text rendering of bracket events and leaderboards, plus CSV export.

use crate::models::{Match, Placement, Round, Slot};
use crate::service::{BracketEvent, Leaderboard, Notifier, RenderError, ScopeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

fn slot_name(slot: &Slot) -> &str {
    match slot {
        Slot::Player(p) => p.name(),
        Slot::Bye => "BYE",
    }
}

fn match_line(number: usize, m: &Match) -> String {
    let (home, away) = (slot_name(&m.home), slot_name(&m.away));
    match (&m.winner, m.is_bye()) {
        (Some(w), true) => format!(
            "Match {}: {} vs {} (auto-advance) -> {}",
            number,
            home,
            away,
            w.name()
        ),
        (Some(w), false) => format!(
            "Match {}: {} vs {} -> Winner: {}",
            number,
            home,
            away,
            w.name()
        ),
        (None, _) => format!("Match {}: {} vs {}", number, home, away),
    }
}

/// Numbered match listing for one round.
pub fn render_round(round: &Round) -> String {
    let mut out = format!("Round {}\n", round.index);
    for (i, m) in round.matches.iter().enumerate() {
        out.push_str(&match_line(i + 1, m));
        out.push('\n');
    }
    out
}

fn rank_label(rank: u8) -> &'static str {
    match rank {
        1 => "1st",
        2 => "2nd",
        3 => "3rd",
        _ => "4th",
    }
}

fn render_placements(placements: &[Placement]) -> String {
    placements
        .iter()
        .map(|p| format!("{}: {}\n", rank_label(p.rank), p.participant.name()))
        .collect()
}

/// Leaderboard lines; the top three get medals when they have points.
pub fn render_leaderboard(leaderboard: &Leaderboard) -> String {
    if leaderboard.entries.is_empty() {
        return "No members with points, trophies or tags yet.".to_string();
    }
    let mut out = String::new();
    for e in &leaderboard.entries {
        let marker = match e.position {
            1 if e.points > 0 => "🥇".to_string(),
            2 if e.points > 0 => "🥈".to_string(),
            3 if e.points > 0 => "🥉".to_string(),
            n => format!("{}.", n),
        };
        out.push_str(&format!("{} {} - {} pts", marker, e.name, e.points));
        if e.trophies > 0 {
            out.push_str(&format!(", {} trophies", e.trophies));
        }
        if !e.tags.is_empty() {
            out.push(' ');
            out.push_str(&e.tags.concat());
        }
        out.push('\n');
    }
    out
}

fn csv_err(e: impl std::fmt::Display) -> RenderError {
    RenderError(format!("csv: {}", e))
}

/// CSV with one row per leaderboard entry.
pub fn leaderboard_csv(leaderboard: &Leaderboard) -> Result<String, RenderError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["position", "participant_id", "name", "points", "trophies", "tags"])
        .map_err(csv_err)?;
    for entry in &leaderboard.entries {
        wtr.write_record([
            entry.position.to_string(),
            entry.participant_id.clone(),
            entry.name.clone(),
            entry.points.to_string(),
            entry.trophies.to_string(),
            entry.tags.join(" "),
        ])
        .map_err(csv_err)?;
    }
    let bytes = wtr.into_inner().map_err(csv_err)?;
    String::from_utf8(bytes).map_err(csv_err)
}

/// Text for one event.
pub fn render_event(event: &BracketEvent) -> String {
    match event {
        BracketEvent::Configured { settings } => format!(
            "Tournament configured: {}\nMap: {}\nAbilities: {}\nMax players: {}\nPrize: {}",
            settings.title,
            settings.map,
            settings.abilities,
            settings.max_participants,
            settings.prize
        ),
        BracketEvent::RegistrationOpened { settings } => format!(
            "Registration open for {}\nRewards: 1st {} (+1 trophy), 2nd {}, 3rd {}, 4th {}\nPlayers: 0/{}",
            settings.title,
            settings.rewards.first,
            settings.rewards.second,
            settings.rewards.third,
            settings.rewards.fourth,
            settings.max_participants
        ),
        BracketEvent::Registered {
            participant,
            roster_size,
            cap,
        } => format!("{} registered. Players: {}/{}", participant.name(), roster_size, cap),
        BracketEvent::Unregistered {
            roster_size, cap, ..
        } => format!("A player left. Players: {}/{}", roster_size, cap),
        BracketEvent::Started { title, round } => {
            format!("{} has started!\n{}", title, render_round(round))
        }
        BracketEvent::MatchDecided { decided } => match &decided.winner {
            Some(w) => format!("{} wins their match!", w.name()),
            None => "Match updated.".to_string(),
        },
        BracketEvent::RoundAdvanced { completed, next } => format!(
            "Round {} complete!\n{}\nNext round\n{}",
            completed.index,
            render_round(completed),
            render_round(next)
        ),
        BracketEvent::TournamentFinished {
            title,
            completed,
            placements,
            ..
        } => {
            let champion = placements
                .iter()
                .find(|p| p.rank == 1)
                .map(|p| p.participant.name())
                .unwrap_or("nobody");
            format!(
                "{}\n{} complete! Champion: {}\n{}",
                render_round(completed),
                title,
                champion,
                render_placements(placements)
            )
        }
        BracketEvent::Cancelled => "Tournament cancelled.".to_string(),
        BracketEvent::LeaderboardUpdated { leaderboard, .. } => {
            format!("Server Leaderboard\n{}", render_leaderboard(leaderboard))
        }
    }
}

/// Renders every event to text, logs it and keeps the latest text per scope
/// (and per leaderboard channel) for whoever relays it to the chat platform.
#[derive(Default)]
pub struct TextNotifier {
    latest: RwLock<HashMap<ScopeId, String>>,
    channels: RwLock<HashMap<String, String>>,
}

impl TextNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last text rendered for a scope.
    pub fn latest(&self, scope: &str) -> Option<String> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned()
    }

    /// Last leaderboard text routed to a channel.
    pub fn channel(&self, channel: &str) -> Option<String> {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned()
    }
}

impl Notifier for TextNotifier {
    fn publish(&self, scope: &str, event: &BracketEvent) -> Result<(), RenderError> {
        let text = render_event(event);
        log::info!("[{}] {}", scope, text);
        if let BracketEvent::LeaderboardUpdated { channel, .. } = event {
            self.channels
                .write()
                .map_err(|_| RenderError("channel cache poisoned".to_string()))?
                .insert(channel.clone(), text);
            return Ok(());
        }
        self.latest
            .write()
            .map_err(|_| RenderError("scope cache poisoned".to_string()))?
            .insert(scope.to_string(), text);
        Ok(())
    }
}
