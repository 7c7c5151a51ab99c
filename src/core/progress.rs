//! Score, experience and level tracking for one player.

use serde::{Deserialize, Serialize};

/// Per-session progress. Transitions take and return values; the caller
/// persists the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Current streak of correct answers.
    pub score: u32,
    /// Best streak seen so far.
    pub max_score: u32,
    pub experience: u32,
    pub level: u32,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self { score: 0, max_score: 0, experience: 0, level: 1 }
    }
}

/// Experience needed to leave `level`.
pub fn next_level_cap(level: u32) -> u32 {
    level.saturating_mul(level).saturating_mul(10)
}

/// Cap of the level below; 0 at level 1.
pub fn previous_level_cap(level: u32) -> u32 {
    next_level_cap(level.saturating_sub(1))
}

impl PlayerProgress {
    /// The streak grows by one and the new streak value is added to
    /// experience, so long streaks pay more per answer. At most one level is
    /// gained per answer, even when experience overshoots several caps.
    pub fn on_correct_answer(self) -> Self {
        let score = self.score.saturating_add(1);
        let experience = self.experience.saturating_add(score);
        let level = if experience >= next_level_cap(self.level) {
            self.level + 1
        } else {
            self.level
        };
        Self {
            score,
            max_score: self.max_score.max(score),
            experience,
            level,
        }
    }

    /// Only the streak resets.
    pub fn on_wrong_answer(self) -> Self {
        Self { score: 0, ..self }
    }

    pub fn next_level_cap(&self) -> u32 {
        next_level_cap(self.level)
    }

    /// Progress through the current level, floored. Can exceed 100 after a
    /// multi-level overshoot since only one level is gained per answer.
    pub fn progress_percent(&self) -> u32 {
        let floor = previous_level_cap(self.level);
        let span = self.next_level_cap().saturating_sub(floor);
        if span == 0 {
            return 0;
        }
        let gained = u64::from(self.experience.saturating_sub(floor));
        (gained * 100 / u64::from(span)) as u32
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            score: self.score,
            max_score: self.max_score,
            experience: self.experience,
            level: self.level,
            next_level_cap: self.next_level_cap(),
            progress_percent: self.progress_percent(),
        }
    }
}

/// Snapshot handed to the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    pub score: u32,
    pub max_score: u32,
    pub experience: u32,
    pub level: u32,
    pub next_level_cap: u32,
    pub progress_percent: u32,
}
