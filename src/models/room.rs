// src/models/room.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::question::QuestionRecord;

/// Lifecycle state of a room.
/// `Ended` only occurs in single-round mode, where it replaces
/// `Review`/`RoundEnd`/`TotalEnd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    #[default]
    Settings,
    Lobby,
    Playing,
    Review,
    RoundEnd,
    TotalEnd,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    #[default]
    MultiRound,
    SingleRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Correct,
    Skipped,
}

impl Outcome {
    pub fn toggled(self) -> Self {
        match self {
            Outcome::Correct => Outcome::Skipped,
            Outcome::Skipped => Outcome::Correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub term: String,
    pub outcome: Outcome,
}

/// Confirmed tally of one finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScore {
    pub round: u32,
    pub score: u32,
}

/// The shared, mutable record of one room.
///
/// Every connected client observes snapshots of this struct. `score` is
/// always derived from `history` and `version` is owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub state: RoomStatus,
    #[serde(default)]
    pub mode: GameMode,
    pub subject: String,
    pub category: String,
    pub total_rounds: u32,
    pub time_per_round: u32,
    pub allow_duplicate: bool,
    pub current_round: u32,
    pub used_ids: BTreeSet<i64>,
    pub round_scores: Vec<RoundScore>,
    pub queue: Vec<QuestionRecord>,
    pub current_index: usize,
    pub score: u32,
    pub history: Vec<HistoryEntry>,
    pub time_left: u32,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RoomState {
    pub fn new(mode: GameMode, time_per_round: u32) -> Self {
        Self {
            state: RoomStatus::Settings,
            mode,
            subject: String::new(),
            category: crate::game::round::ALL_CATEGORIES.to_string(),
            total_rounds: 1,
            time_per_round,
            allow_duplicate: false,
            current_round: 1,
            used_ids: BTreeSet::new(),
            round_scores: Vec::new(),
            queue: Vec::new(),
            current_index: 0,
            score: 0,
            history: Vec::new(),
            time_left: time_per_round,
            version: 0,
            updated_at: None,
        }
    }

    /// The term currently on the display, if a round is in progress.
    pub fn current_question(&self) -> Option<&QuestionRecord> {
        match self.state {
            RoomStatus::Playing => self.queue.get(self.current_index),
            _ => None,
        }
    }
}

/// Values saved from the settings screen.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    #[validate(length(max = 100))]
    #[serde(default)]
    pub subject: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub total_rounds: u32,
    #[validate(range(min = 1, max = 3600))]
    pub time_per_round: u32,
    #[serde(default)]
    pub allow_duplicate: bool,
    pub mode: Option<GameMode>,
}

/// A partial write to a room. Only fields that are `Some` are merged;
/// everything else keeps whatever value the store already holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RoomStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GameMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_per_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_ids: Option<BTreeSet<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_scores: Option<Vec<RoundScore>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<Vec<QuestionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

macro_rules! diff_field {
    ($patch:ident, $before:ident, $after:ident, $($field:ident),+ $(,)?) => {
        $(
            if $before.$field != $after.$field {
                $patch.$field = Some($after.$field.clone());
            }
        )+
    };
}

macro_rules! merge_field {
    ($patch:ident, $state:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $state.$field = value.clone();
            }
        )+
    };
}

impl RoomPatch {
    /// Patch containing exactly the fields that differ between two snapshots.
    pub fn diff(before: &RoomState, after: &RoomState) -> Self {
        let mut patch = RoomPatch::default();
        diff_field!(
            patch, before, after,
            state, mode, subject, category, total_rounds, time_per_round,
            allow_duplicate, current_round, used_ids, round_scores, queue,
            current_index, score, history, time_left,
        );
        patch
    }

    /// Patch that overwrites every game field.
    pub fn full(state: &RoomState) -> Self {
        Self {
            state: Some(state.state),
            mode: Some(state.mode),
            subject: Some(state.subject.clone()),
            category: Some(state.category.clone()),
            total_rounds: Some(state.total_rounds),
            time_per_round: Some(state.time_per_round),
            allow_duplicate: Some(state.allow_duplicate),
            current_round: Some(state.current_round),
            used_ids: Some(state.used_ids.clone()),
            round_scores: Some(state.round_scores.clone()),
            queue: Some(state.queue.clone()),
            current_index: Some(state.current_index),
            score: Some(state.score),
            history: Some(state.history.clone()),
            time_left: Some(state.time_left),
            updated_at: state.updated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == RoomPatch::default()
    }

    /// Field-level merge onto `state`. Does not touch `version`.
    pub fn merge_into(&self, state: &mut RoomState) {
        let patch = self;
        merge_field!(
            patch, state,
            state, mode, subject, category, total_rounds, time_per_round,
            allow_duplicate, current_round, used_ids, round_scores, queue,
            current_index, score, history, time_left,
        );
        if self.updated_at.is_some() {
            state.updated_at = self.updated_at;
        }
    }
}

/// Response body for every room command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    /// False when the command was not valid from the room's state.
    pub applied: bool,
    pub room: RoomState,
}

/// Body of the manual advance endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub outcome: Outcome,
    /// Index of the term the client was looking at.
    pub expected_index: Option<usize>,
}
