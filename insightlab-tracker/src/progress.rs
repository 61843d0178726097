//! Learning-progress state machine: streaks, badges, concept mastery.
//!
//! The state is one persisted record advanced by activity events. Advancing
//! is a pure method on [`ProgressState`]; [`ProgressTracker`] wraps it in a
//! locked read-modify-write against a [`RecordStore`].

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use insightlab_core::domain::calendar_day_opt;

use crate::store::{load_or_default, save_record, RecordStore, StoreError, PROGRESS_KEY};

// ── Activities ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Built and optimized a portfolio.
    Portfolio,
    /// Read a news analysis.
    News,
    /// Rebalanced a portfolio.
    Rebalance,
}

impl ActivityKind {
    /// Concept whose count this activity advances.
    pub fn concept_id(self) -> &'static str {
        match self {
            Self::Portfolio => "diversification",
            Self::News => "news_analysis",
            Self::Rebalance => "rebalancing",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portfolio => write!(f, "portfolio"),
            Self::News => write!(f, "news"),
            Self::Rebalance => write!(f, "rebalance"),
        }
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portfolio" => Ok(Self::Portfolio),
            "news" => Ok(Self::News),
            "rebalance" => Ok(Self::Rebalance),
            other => Err(format!(
                "unknown activity '{other}' (expected portfolio, news or rebalance)"
            )),
        }
    }
}

// ── Definitions ──────────────────────────────────────────────────────

/// What a badge is awarded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unlock {
    Portfolios(u32),
    NewsAnalyzed(u32),
    Rebalances(u32),
    Streak(u32),
}

struct BadgeDef {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    unlock: Unlock,
}

const BADGES: &[BadgeDef] = &[
    BadgeDef {
        id: "diversification_master",
        name: "Diversification Master",
        description: "Created 5+ diversified portfolios",
        unlock: Unlock::Portfolios(5),
    },
    BadgeDef {
        id: "news_reader",
        name: "News Reader",
        description: "Analyzed 10+ news articles",
        unlock: Unlock::NewsAnalyzed(10),
    },
    BadgeDef {
        id: "rebalancer",
        name: "Rebalancer",
        description: "Successfully rebalanced a portfolio",
        unlock: Unlock::Rebalances(1),
    },
    BadgeDef {
        id: "week_warrior",
        name: "Week Warrior",
        description: "7-day streak",
        unlock: Unlock::Streak(7),
    },
    BadgeDef {
        id: "month_master",
        name: "Month Master",
        description: "30-day streak",
        unlock: Unlock::Streak(30),
    },
];

const CONCEPTS: &[(&str, &str, u32)] = &[
    ("diversification", "Diversification", 5),
    ("news_analysis", "News Analysis", 10),
    ("rebalancing", "Rebalancing", 1),
];

// ── State ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub earned: bool,
    #[serde(with = "calendar_day_opt")]
    pub earned_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptProgress {
    pub id: String,
    pub name: String,
    pub current_count: u32,
    /// Zero in a partial record; `reconcile` restores the defined target.
    pub target: u32,
    /// Percent of target reached, clamped to 100.
    pub progress: f64,
}

impl ConceptProgress {
    fn recompute(&mut self) {
        self.progress = if self.target == 0 {
            100.0
        } else {
            (f64::from(self.current_count) * 100.0 / f64::from(self.target)).min(100.0)
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressState {
    pub streak_count: u32,
    #[serde(with = "calendar_day_opt")]
    pub last_activity_date: Option<NaiveDate>,
    pub badges: Vec<Badge>,
    pub concepts: Vec<ConceptProgress>,
    pub total_portfolios: u32,
    pub total_news_analyzed: u32,
    pub total_rebalances: u32,
}

impl Default for ProgressState {
    fn default() -> Self {
        let mut state = Self {
            streak_count: 0,
            last_activity_date: None,
            badges: Vec::new(),
            concepts: Vec::new(),
            total_portfolios: 0,
            total_news_analyzed: 0,
            total_rebalances: 0,
        };
        state.reconcile();
        state
    }
}

impl ProgressState {
    /// Bring an older or partial record up to the current definitions: drop
    /// entries without an id, fill blank names, descriptions and targets
    /// from the definitions, add missing badges and concepts, and refresh
    /// concept progress. Earned flags, dates and counts are kept.
    pub fn reconcile(&mut self) {
        self.badges.retain(|b| !b.id.is_empty());
        self.concepts.retain(|c| !c.id.is_empty());

        for badge in &mut self.badges {
            let Some(def) = BADGES.iter().find(|d| d.id == badge.id) else {
                continue;
            };
            if badge.name.is_empty() {
                badge.name = def.name.to_string();
            }
            if badge.description.is_empty() {
                badge.description = def.description.to_string();
            }
        }
        for concept in &mut self.concepts {
            let Some(&(_, name, target)) = CONCEPTS.iter().find(|(id, ..)| *id == concept.id)
            else {
                continue;
            };
            if concept.name.is_empty() {
                concept.name = name.to_string();
            }
            if concept.target == 0 {
                concept.target = target;
            }
        }

        for def in BADGES {
            if !self.badges.iter().any(|b| b.id == def.id) {
                self.badges.push(Badge {
                    id: def.id.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    earned: false,
                    earned_date: None,
                });
            }
        }
        for &(id, name, target) in CONCEPTS {
            if !self.concepts.iter().any(|c| c.id == id) {
                self.concepts.push(ConceptProgress {
                    id: id.to_string(),
                    name: name.to_string(),
                    current_count: 0,
                    target,
                    progress: 0.0,
                });
            }
        }
        for concept in &mut self.concepts {
            concept.recompute();
        }
    }

    pub fn badge(&self, id: &str) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == id)
    }

    pub fn concept(&self, id: &str) -> Option<&ConceptProgress> {
        self.concepts.iter().find(|c| c.id == id)
    }

    pub fn earned_badges(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter().filter(|b| b.earned)
    }

    /// Streak to display on `today`: the stored count while it is still
    /// alive (last activity today or yesterday), otherwise 0. Does not
    /// mutate the state.
    pub fn effective_streak(&self, today: NaiveDate) -> u32 {
        match self.last_activity_date {
            Some(last) if (today - last).num_days() <= 1 => self.streak_count,
            _ => 0,
        }
    }

    /// Advance the state by one activity on `today`.
    ///
    /// Returns the ids of badges this activity unlocked. Earned badges are
    /// never revoked.
    pub fn record_activity(&mut self, kind: ActivityKind, today: NaiveDate) -> Vec<String> {
        self.advance_streak(today);

        match kind {
            ActivityKind::Portfolio => {
                self.total_portfolios = self.total_portfolios.saturating_add(1)
            }
            ActivityKind::News => {
                self.total_news_analyzed = self.total_news_analyzed.saturating_add(1)
            }
            ActivityKind::Rebalance => {
                self.total_rebalances = self.total_rebalances.saturating_add(1)
            }
        }

        let concept_id = kind.concept_id();
        for concept in &mut self.concepts {
            if concept.id == concept_id {
                concept.current_count = concept.current_count.saturating_add(1);
            }
            concept.recompute();
        }

        self.unlock_badges(today)
    }

    fn advance_streak(&mut self, today: NaiveDate) {
        let Some(last) = self.last_activity_date else {
            self.last_activity_date = Some(today);
            return;
        };
        // A negative gap means the clock moved backwards: same day.
        match (today - last).num_days() {
            gap if gap <= 0 => {}
            1 => self.streak_count = self.streak_count.saturating_add(1),
            _ => self.streak_count = 1,
        }
        self.last_activity_date = Some(last.max(today));
    }

    fn unlock_badges(&mut self, today: NaiveDate) -> Vec<String> {
        let mut newly_earned = Vec::new();
        for badge in self.badges.iter_mut().filter(|b| !b.earned) {
            let Some(def) = BADGES.iter().find(|d| d.id == badge.id) else {
                continue;
            };
            let reached = match def.unlock {
                Unlock::Portfolios(n) => self.total_portfolios >= n,
                Unlock::NewsAnalyzed(n) => self.total_news_analyzed >= n,
                Unlock::Rebalances(n) => self.total_rebalances >= n,
                Unlock::Streak(n) => self.streak_count >= n,
            };
            if reached {
                badge.earned = true;
                badge.earned_date = Some(today);
                newly_earned.push(badge.id.clone());
            }
        }
        newly_earned
    }
}

// ── Tracker ──────────────────────────────────────────────────────────

/// Result of recording one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOutcome {
    pub state: ProgressState,
    /// Badges unlocked by this activity.
    pub newly_earned: Vec<String>,
    /// False when the updated state could not be saved. The state is still
    /// the updated one.
    pub persisted: bool,
}

/// Progress record bound to a store.
///
/// Read-modify-write cycles are serialized through an internal mutex, so
/// threads sharing one tracker cannot lose updates. Separate processes over
/// the same store are last-writer-wins.
pub struct ProgressTracker<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S: RecordStore> ProgressTracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current state. Missing or corrupt records load as the initial state.
    pub fn load(&self) -> ProgressState {
        let mut state: ProgressState = load_or_default(&self.store, PROGRESS_KEY);
        state.reconcile();
        state
    }

    pub fn save(&self, state: &ProgressState) -> Result<(), StoreError> {
        save_record(&self.store, PROGRESS_KEY, state)
    }

    /// Record an activity today (local calendar day).
    pub fn record(&self, kind: ActivityKind) -> ActivityOutcome {
        self.record_on(kind, Local::now().date_naive())
    }

    /// Record an activity on a given calendar day.
    pub fn record_on(&self, kind: ActivityKind, today: NaiveDate) -> ActivityOutcome {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut state = self.load();
        let newly_earned = state.record_activity(kind, today);
        for id in &newly_earned {
            info!(badge = %id, "badge unlocked");
        }

        let persisted = match self.save(&state) {
            Ok(()) => true,
            Err(e) => {
                warn!(activity = %kind, error = %e, "failed to persist progress");
                false
            }
        };

        ActivityOutcome {
            state,
            newly_earned,
            persisted,
        }
    }

    /// Overwrite the record with the initial state.
    pub fn reset(&self) -> Result<ProgressState, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let state = ProgressState::default();
        self.save(&state)?;
        Ok(state)
    }
}
