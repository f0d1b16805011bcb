use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: String,
    pub match_id: String,
    pub predicted_winner: String,
    pub points: i32,
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Prediction {
    pub fn is_settled(&self) -> bool {
        self.is_correct.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatePredictionRequest {
    pub user_id: String,
    pub match_id: String,
    pub predicted_winner: String,
    /// Shown on the leaderboard. Latest non-blank value wins.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl CreatePredictionRequest {
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Returns the first blank field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("user_id", &self.user_id),
            ("match_id", &self.match_id),
            ("predicted_winner", &self.predicted_winner),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// Scored result for one prediction, written back exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub prediction_id: Uuid,
    pub user_id: String,
    pub is_correct: bool,
    pub points: i32,
}
