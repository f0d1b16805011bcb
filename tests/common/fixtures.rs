use chrono::Utc;
use uuid::Uuid;

use courtside_backend::models::prediction::Prediction;
use courtside_backend::models::tennis_match::{MatchTransition, Round, TennisMatch};

pub fn tennis_match(id: &str, round: Round, completed: bool, winner: Option<&str>) -> TennisMatch {
    TennisMatch {
        id: id.to_string(),
        tournament_id: Some("roland-garros-2025".to_string()),
        round,
        completed,
        winner: winner.map(str::to_string),
        score: completed.then(|| "6-3 4-6 7-5".to_string()),
    }
}

/// Not completed to completed with `winner`.
pub fn completion(match_id: &str, round: Round, winner: &str) -> MatchTransition {
    MatchTransition::new(
        tennis_match(match_id, round.clone(), false, None),
        tennis_match(match_id, round, true, Some(winner)),
    )
}

pub fn prediction(user_id: &str, match_id: &str, predicted_winner: &str) -> Prediction {
    Prediction {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        match_id: match_id.to_string(),
        predicted_winner: predicted_winner.to_string(),
        points: 0,
        is_correct: None,
        created_at: Utc::now(),
        settled_at: None,
    }
}
