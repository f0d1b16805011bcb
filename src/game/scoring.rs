use std::collections::BTreeMap;

use crate::models::prediction::{Prediction, PredictionOutcome};
use crate::models::tennis_match::Round;
use crate::models::user::UserDelta;

pub const FIRST_ROUND_POINTS: i32 = 5;
pub const SECOND_ROUND_POINTS: i32 = 10;
pub const THIRD_ROUND_POINTS: i32 = 15;
pub const FOURTH_ROUND_POINTS: i32 = 20;
pub const QUARTER_FINAL_POINTS: i32 = 30;
pub const SEMI_FINAL_POINTS: i32 = 50;
pub const FINAL_POINTS: i32 = 100;

/// Points awarded for a correct prediction in `round`.
///
/// Unrecognized rounds score as a first round match.
pub fn points_for_round(round: &Round) -> i32 {
    match round {
        Round::FirstRound => FIRST_ROUND_POINTS,
        Round::SecondRound => SECOND_ROUND_POINTS,
        Round::ThirdRound => THIRD_ROUND_POINTS,
        Round::FourthRound => FOURTH_ROUND_POINTS,
        Round::QuarterFinal => QUARTER_FINAL_POINTS,
        Round::SemiFinal => SEMI_FINAL_POINTS,
        Round::Final => FINAL_POINTS,
        Round::Unrecognized(raw) => {
            tracing::warn!("Unrecognized round '{}', scoring as First Round", raw);
            FIRST_ROUND_POINTS
        }
    }
}

pub fn score_prediction(prediction: &Prediction, winner: &str, points_per_correct: i32) -> PredictionOutcome {
    let is_correct = prediction.predicted_winner == winner;
    PredictionOutcome {
        prediction_id: prediction.id,
        user_id: prediction.user_id.clone(),
        is_correct,
        points: if is_correct { points_per_correct } else { 0 },
    }
}

/// Fold scored predictions into one delta per user, ordered by user id.
///
/// Every outcome counts towards `total`; only correct ones add points and
/// `correct`.
pub fn aggregate_user_deltas(outcomes: &[PredictionOutcome]) -> Vec<UserDelta> {
    let mut per_user: BTreeMap<&str, UserDelta> = BTreeMap::new();
    for outcome in outcomes {
        let delta = per_user
            .entry(outcome.user_id.as_str())
            .or_insert_with(|| UserDelta {
                user_id: outcome.user_id.clone(),
                ..UserDelta::default()
            });
        delta.total += 1;
        if outcome.is_correct {
            delta.correct += 1;
            delta.points += i64::from(outcome.points);
        }
    }
    per_user.into_values().collect()
}
