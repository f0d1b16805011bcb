use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative prediction record for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserScore {
    pub user_id: String,
    pub display_name: Option<String>,
    pub points: i64,
    pub correct_predictions: i64,
    pub total_predictions: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserScore {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            points: 0,
            correct_predictions: 0,
            total_predictions: 0,
            updated_at: Utc::now(),
        }
    }

    /// Percentage of settled predictions that were correct.
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            (self.correct_predictions as f64 / self.total_predictions as f64) * 100.0
        }
    }

    pub fn apply(&mut self, delta: &UserDelta) {
        self.points += delta.points;
        self.correct_predictions += delta.correct;
        self.total_predictions += delta.total;
        self.updated_at = Utc::now();
    }
}

/// Additive change to a [`UserScore`] produced by one settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDelta {
    pub user_id: String,
    pub points: i64,
    pub correct: i64,
    pub total: i64,
}

impl UserDelta {
    pub fn is_consistent(&self) -> bool {
        self.points >= 0 && self.correct >= 0 && self.correct <= self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: Option<String>,
    pub points: i64,
    pub correct_predictions: i64,
    pub total_predictions: i64,
    pub accuracy: f64,
}

impl LeaderboardEntry {
    pub fn from_ranked(scores: Vec<UserScore>) -> Vec<LeaderboardEntry> {
        scores
            .into_iter()
            .enumerate()
            .map(|(index, score)| LeaderboardEntry {
                rank: index + 1,
                accuracy: score.accuracy(),
                user_id: score.user_id,
                display_name: score.display_name,
                points: score.points,
                correct_predictions: score.correct_predictions,
                total_predictions: score.total_predictions,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_handles_users_without_predictions() {
        assert_eq!(UserScore::empty("u1").accuracy(), 0.0);
    }

    #[test]
    fn apply_adds_every_counter() {
        let mut score = UserScore::empty("u1");
        score.apply(&UserDelta { user_id: "u1".into(), points: 30, correct: 1, total: 2 });
        score.apply(&UserDelta { user_id: "u1".into(), points: 5, correct: 1, total: 1 });
        assert_eq!(score.points, 35);
        assert_eq!(score.correct_predictions, 2);
        assert_eq!(score.total_predictions, 3);
        assert!((score.accuracy() - 66.666).abs() < 0.01);
    }

    #[test]
    fn leaderboard_ranks_start_at_one() {
        let entries = LeaderboardEntry::from_ranked(vec![UserScore::empty("a"), UserScore::empty("b")]);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].rank, 2);
    }
}
