use crate::game::scoring::{aggregate_user_deltas, points_for_round, score_prediction};
use crate::models::prediction::{Prediction, PredictionOutcome};
use crate::models::settlement::SettlementBatch;
use crate::models::tennis_match::{MatchTransition, Round};

/// Immutable view of a match at the moment it completed. Every prediction in a
/// batch is scored against this one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedMatch {
    pub match_id: String,
    pub round: Round,
    pub winner: String,
}

/// Returns the completed match when `transition` crosses from not completed to
/// completed with a winner, `None` for every other edit.
pub fn completion_edge(transition: &MatchTransition) -> Option<CompletedMatch> {
    let MatchTransition { before, after } = transition;
    if before.completed || !after.completed || before.id != after.id {
        return None;
    }
    let winner = after.winner()?;
    Some(CompletedMatch {
        match_id: after.id.clone(),
        round: after.round.clone(),
        winner: winner.to_string(),
    })
}

/// Score every unsettled prediction and aggregate the per-user deltas.
///
/// Predictions that already carry a result are left out of the batch.
pub fn build_settlement_batch(completed: &CompletedMatch, predictions: &[Prediction]) -> SettlementBatch {
    let points_per_correct = points_for_round(&completed.round);
    let outcomes: Vec<PredictionOutcome> = predictions
        .iter()
        .filter(|prediction| !prediction.is_settled())
        .map(|prediction| score_prediction(prediction, &completed.winner, points_per_correct))
        .collect();
    let deltas = aggregate_user_deltas(&outcomes);

    SettlementBatch {
        match_id: completed.match_id.clone(),
        round: completed.round.clone(),
        winner: completed.winner.clone(),
        points_per_correct,
        predictions_found: predictions.len(),
        outcomes,
        deltas,
    }
}
