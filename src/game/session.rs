// src/game/session.rs

use rand::Rng;

use crate::{
    error::AppError,
    game::{advance::advance, round::build_queue},
    models::{
        question::QuestionRecord,
        room::{GameMode, Outcome, RoomSettings, RoomState, RoomStatus, RoundScore},
    },
};

/// Operator and controller commands, one per lifecycle transition.
#[derive(Debug, Clone)]
pub enum Command {
    SaveSettings(RoomSettings),
    StartRound,
    Tick,
    Advance {
        outcome: Outcome,
        expected_index: Option<usize>,
    },
    ConfirmTally,
    ToggleHistory {
        index: usize,
    },
    Reset,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SaveSettings(_) => "save-settings",
            Command::StartRound => "start-round",
            Command::Tick => "tick",
            Command::Advance { .. } => "advance",
            Command::ConfirmTally => "confirm-tally",
            Command::ToggleHistory { .. } => "toggle-history",
            Command::Reset => "reset",
        }
    }
}

impl RoomState {
    /// Applies one command.
    ///
    /// Returns `Ok(false)` and leaves the room untouched when the command is
    /// not valid from the current state. `pool` is only read by `StartRound`;
    /// a failing round build returns an error and also leaves the room untouched.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        command: &Command,
        pool: &[QuestionRecord],
        rng: &mut R,
    ) -> Result<bool, AppError> {
        let applied = match command {
            Command::SaveSettings(settings) => self.save_settings(settings),
            Command::StartRound => self.start_round(pool, rng)?,
            Command::Tick => self.tick(),
            Command::Advance {
                outcome,
                expected_index,
            } => advance(self, *outcome, *expected_index),
            Command::ConfirmTally => self.confirm_tally(),
            Command::ToggleHistory { index } => self.toggle_history(*index),
            Command::Reset => {
                self.reset();
                true
            }
        };
        Ok(applied)
    }

    pub(crate) fn recompute_score(&mut self) {
        self.score = self
            .history
            .iter()
            .filter(|entry| entry.outcome == Outcome::Correct)
            .count() as u32;
    }

    /// PLAYING -> REVIEW, or ENDED in single-round mode.
    pub(crate) fn finish_round(&mut self) {
        self.state = match self.mode {
            GameMode::MultiRound => RoomStatus::Review,
            GameMode::SingleRound => RoomStatus::Ended,
        };
    }

    fn save_settings(&mut self, settings: &RoomSettings) -> bool {
        if self.state != RoomStatus::Settings {
            return false;
        }
        let mode = settings.mode.unwrap_or(self.mode);

        self.mode = mode;
        self.subject = settings.subject.trim().to_string();
        self.category = settings
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(super::round::ALL_CATEGORIES)
            .to_string();
        self.total_rounds = match mode {
            GameMode::MultiRound => settings.total_rounds.max(1),
            GameMode::SingleRound => 1,
        };
        self.time_per_round = settings.time_per_round.max(1);
        self.allow_duplicate = settings.allow_duplicate;
        self.current_round = 1;
        self.time_left = self.time_per_round;
        self.state = RoomStatus::Lobby;
        true
    }

    fn start_round<R: Rng + ?Sized>(
        &mut self,
        pool: &[QuestionRecord],
        rng: &mut R,
    ) -> Result<bool, AppError> {
        let next_round = match (self.state, self.mode) {
            (RoomStatus::Lobby, _) => self.current_round,
            (RoomStatus::RoundEnd, GameMode::MultiRound) => self.current_round + 1,
            (RoomStatus::Ended, GameMode::SingleRound) => self.current_round,
            _ => return Ok(false),
        };

        let queue = build_queue(
            pool,
            &self.category,
            self.allow_duplicate,
            &self.used_ids,
            rng,
        )?;

        self.current_round = next_round;
        self.queue = queue;
        self.current_index = 0;
        self.history.clear();
        self.score = 0;
        self.time_left = self.time_per_round;
        self.state = RoomStatus::Playing;
        Ok(true)
    }

    fn tick(&mut self) -> bool {
        if self.state != RoomStatus::Playing {
            return false;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.finish_round();
        }
        true
    }

    fn confirm_tally(&mut self) -> bool {
        if self.state != RoomStatus::Review {
            return false;
        }
        self.recompute_score();
        self.round_scores.push(RoundScore {
            round: self.current_round,
            score: self.score,
        });

        let presented = self.current_index.min(self.queue.len());
        self.used_ids
            .extend(self.queue[..presented].iter().map(|q| q.id));

        self.state = if self.current_round < self.total_rounds {
            RoomStatus::RoundEnd
        } else {
            RoomStatus::TotalEnd
        };
        true
    }

    fn toggle_history(&mut self, index: usize) -> bool {
        if self.state != RoomStatus::Review {
            return false;
        }
        let Some(entry) = self.history.get_mut(index) else {
            return false;
        };
        entry.outcome = entry.outcome.toggled();
        self.recompute_score();
        true
    }

    /// Back to SETTINGS. Saved settings are kept as the form's starting values;
    /// every round-scoped and cross-round field is cleared.
    fn reset(&mut self) {
        let mut fresh = RoomState::new(self.mode, self.time_per_round);
        fresh.subject = std::mem::take(&mut self.subject);
        fresh.category = std::mem::take(&mut self.category);
        fresh.total_rounds = self.total_rounds;
        fresh.allow_duplicate = self.allow_duplicate;
        fresh.version = self.version;
        fresh.updated_at = self.updated_at;
        *self = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn tagged_pool(count: i64, tag: &str) -> Vec<QuestionRecord> {
        (1..=count)
            .map(|id| QuestionRecord {
                id,
                term: format!("term {}", id),
                book: "Book 1".to_string(),
                category: tag.to_string(),
                keywords: String::new(),
            })
            .collect()
    }

    fn settings(category: &str, total_rounds: u32, seconds: u32) -> RoomSettings {
        RoomSettings {
            subject: "History".to_string(),
            category: Some(category.to_string()),
            total_rounds,
            time_per_round: seconds,
            allow_duplicate: false,
            mode: None,
        }
    }

    fn run(room: &mut RoomState, command: Command, pool: &[QuestionRecord]) -> bool {
        let mut rng = StdRng::seed_from_u64(42);
        room.apply(&command, pool, &mut rng).unwrap()
    }

    fn correct() -> Command {
        Command::Advance {
            outcome: Outcome::Correct,
            expected_index: None,
        }
    }

    fn skip() -> Command {
        Command::Advance {
            outcome: Outcome::Skipped,
            expected_index: None,
        }
    }

    /// One room parked in every reachable multi-round state.
    fn room_in_each_state(pool: &[QuestionRecord]) -> Vec<RoomState> {
        let settings_room = RoomState::new(GameMode::MultiRound, 60);

        let mut lobby = settings_room.clone();
        run(&mut lobby, Command::SaveSettings(settings("X", 2, 60)), pool);

        let mut playing = lobby.clone();
        run(&mut playing, Command::StartRound, pool);

        let mut review = playing.clone();
        while review.state == RoomStatus::Playing {
            run(&mut review, correct(), pool);
        }

        let mut round_end = review.clone();
        run(&mut round_end, Command::ConfirmTally, pool);

        let mut total_end = round_end.clone();
        total_end.allow_duplicate = true;
        run(&mut total_end, Command::StartRound, pool);
        while total_end.state == RoomStatus::Playing {
            run(&mut total_end, skip(), pool);
        }
        run(&mut total_end, Command::ConfirmTally, pool);

        vec![settings_room, lobby, playing, review, round_end, total_end]
    }

    fn valid_from(state: RoomStatus, command: &Command) -> bool {
        matches!(
            (state, command),
            (RoomStatus::Settings, Command::SaveSettings(_))
                | (RoomStatus::Lobby, Command::StartRound)
                | (RoomStatus::RoundEnd, Command::StartRound)
                | (RoomStatus::Playing, Command::Tick)
                | (RoomStatus::Playing, Command::Advance { .. })
                | (RoomStatus::Review, Command::ConfirmTally)
                | (RoomStatus::Review, Command::ToggleHistory { .. })
                | (_, Command::Reset)
        )
    }

    #[test]
    fn test_invalid_commands_are_noops() {
        let pool = tagged_pool(5, "X");
        let commands = vec![
            Command::SaveSettings(settings("X", 3, 30)),
            Command::StartRound,
            Command::Tick,
            correct(),
            Command::ConfirmTally,
            Command::ToggleHistory { index: 0 },
        ];

        let rooms = room_in_each_state(&pool);
        let states: Vec<RoomStatus> = rooms.iter().map(|r| r.state).collect();
        assert_eq!(
            states,
            vec![
                RoomStatus::Settings,
                RoomStatus::Lobby,
                RoomStatus::Playing,
                RoomStatus::Review,
                RoomStatus::RoundEnd,
                RoomStatus::TotalEnd,
            ]
        );

        for room in rooms {
            for command in &commands {
                if valid_from(room.state, command) {
                    continue;
                }
                let mut copy = room.clone();
                let applied = run(&mut copy, command.clone(), &pool);
                assert!(!applied, "{} applied from {:?}", command.name(), room.state);
                assert_eq!(copy, room, "{} mutated {:?}", command.name(), room.state);
            }
        }
    }

    #[test]
    fn test_single_round_invalid_commands() {
        let pool = tagged_pool(2, "X");
        let mut room = RoomState::new(GameMode::SingleRound, 60);
        run(&mut room, Command::SaveSettings(settings("X", 5, 60)), &pool);
        assert_eq!(room.total_rounds, 1);
        run(&mut room, Command::StartRound, &pool);
        run(&mut room, correct(), &pool);
        run(&mut room, skip(), &pool);
        assert_eq!(room.state, RoomStatus::Ended);

        for command in [Command::ConfirmTally, Command::ToggleHistory { index: 0 }, Command::Tick] {
            let mut copy = room.clone();
            assert!(!run(&mut copy, command, &pool));
            assert_eq!(copy, room);
        }

        // Play again from ENDED.
        let mut again = room.clone();
        again.allow_duplicate = true;
        assert!(run(&mut again, Command::StartRound, &pool));
        assert_eq!(again.state, RoomStatus::Playing);
        assert!(again.history.is_empty());
        assert!(again.used_ids.is_empty());
    }

    #[test]
    fn test_two_round_game_excludes_presented_terms() {
        let pool = tagged_pool(5, "X");
        let mut room = RoomState::new(GameMode::MultiRound, 60);

        assert!(run(&mut room, Command::SaveSettings(settings("X", 2, 60)), &pool));
        assert_eq!(room.state, RoomStatus::Lobby);

        assert!(run(&mut room, Command::StartRound, &pool));
        assert_eq!(room.queue.len(), 5);
        assert_eq!(room.time_left, 60);

        run(&mut room, correct(), &pool);
        run(&mut room, skip(), &pool);
        run(&mut room, correct(), &pool);
        let presented: Vec<i64> = room.queue[..3].iter().map(|q| q.id).collect();

        // Time runs out with two terms never shown.
        room.time_left = 1;
        assert!(run(&mut room, Command::Tick, &pool));
        assert_eq!(room.state, RoomStatus::Review);

        assert!(run(&mut room, Command::ConfirmTally, &pool));
        assert_eq!(room.state, RoomStatus::RoundEnd);
        assert_eq!(room.round_scores, vec![RoundScore { round: 1, score: 2 }]);
        assert_eq!(room.used_ids.len(), 3);
        assert!(presented.iter().all(|id| room.used_ids.contains(id)));

        assert!(run(&mut room, Command::StartRound, &pool));
        assert_eq!(room.current_round, 2);
        assert_eq!(room.queue.len(), 2);
        assert!(room.queue.iter().all(|q| !presented.contains(&q.id)));

        run(&mut room, correct(), &pool);
        run(&mut room, correct(), &pool);
        assert_eq!(room.state, RoomStatus::Review);
        assert!(run(&mut room, Command::ConfirmTally, &pool));
        assert_eq!(room.state, RoomStatus::TotalEnd);
        assert_eq!(room.round_scores.len(), 2);
        assert_eq!(room.used_ids.len(), 5);

        // Nothing left for a third round even if one were allowed.
        let mut extra = room.clone();
        extra.state = RoomStatus::RoundEnd;
        let mut rng = StdRng::seed_from_u64(1);
        let err = extra.apply(&Command::StartRound, &pool, &mut rng).unwrap_err();
        assert!(matches!(err, AppError::RoundFilterExhausted { .. }));
        assert_eq!(extra.current_round, 2);
        assert_eq!(extra.state, RoomStatus::RoundEnd);
    }

    #[test]
    fn test_score_tracks_history_through_toggles() {
        let pool = tagged_pool(4, "X");
        let mut room = RoomState::new(GameMode::MultiRound, 60);
        run(&mut room, Command::SaveSettings(settings("ALL", 1, 60)), &pool);
        run(&mut room, Command::StartRound, &pool);
        for command in [correct(), skip(), skip(), correct()] {
            run(&mut room, command, &pool);
        }
        assert_eq!(room.state, RoomStatus::Review);

        for index in [1, 0, 1, 3, 2, 99] {
            run(&mut room, Command::ToggleHistory { index }, &pool);
            let correct = room
                .history
                .iter()
                .filter(|h| h.outcome == Outcome::Correct)
                .count() as u32;
            assert_eq!(room.score, correct);
        }
        assert_eq!(room.score, 1);
    }

    #[test]
    fn test_start_round_errors_keep_state() {
        let mut room = RoomState::new(GameMode::MultiRound, 60);
        run(&mut room, Command::SaveSettings(settings("X", 1, 60)), &[]);
        let before = room.clone();

        let mut rng = StdRng::seed_from_u64(3);
        let err = room.apply(&Command::StartRound, &[], &mut rng).unwrap_err();
        assert!(matches!(err, AppError::PoolEmpty));
        assert_eq!(room, before);

        let err = room
            .apply(&Command::StartRound, &tagged_pool(3, "Y"), &mut rng)
            .unwrap_err();
        assert!(matches!(err, AppError::RoundFilterExhausted { .. }));
        assert_eq!(room, before);
    }

    #[test]
    fn test_reset_from_total_end() {
        let pool = tagged_pool(5, "X");
        let rooms = room_in_each_state(&pool);
        let mut room = rooms.last().cloned().unwrap();
        assert_eq!(room.state, RoomStatus::TotalEnd);

        assert!(run(&mut room, Command::Reset, &pool));
        assert_eq!(room.state, RoomStatus::Settings);
        assert!(room.round_scores.is_empty());
        assert!(room.used_ids.is_empty());
        assert_eq!(room.current_round, 1);
        assert!(room.queue.is_empty());
        assert!(room.history.is_empty());
        assert_eq!(room.score, 0);
        assert_eq!(room.subject, "History");
    }

    #[test]
    fn test_tick_counts_down_only_while_playing() {
        let pool = tagged_pool(3, "X");
        let mut room = RoomState::new(GameMode::MultiRound, 60);
        run(&mut room, Command::SaveSettings(settings("X", 1, 2)), &pool);
        assert!(!run(&mut room, Command::Tick, &pool));
        assert_eq!(room.time_left, 2);

        run(&mut room, Command::StartRound, &pool);
        assert!(run(&mut room, Command::Tick, &pool));
        assert_eq!(room.time_left, 1);
        assert!(run(&mut room, Command::Tick, &pool));
        assert_eq!(room.time_left, 0);
        assert_eq!(room.state, RoomStatus::Review);
        assert!(!run(&mut room, Command::Tick, &pool));
    }
}
