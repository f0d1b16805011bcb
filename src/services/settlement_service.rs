use std::sync::Arc;

use crate::db::settlement_store::{SettlementStore, StoreError};
use crate::game::settlement::{build_settlement_batch, completion_edge};
use crate::models::settlement::{NoOpReason, SettlementOutcome, SettlementSummary};
use crate::models::tennis_match::MatchTransition;

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("Failed to read predictions for match {match_id}: {source}")]
    AdapterRead {
        match_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to commit settlement for match {match_id}: {source}")]
    AdapterCommit {
        match_id: String,
        #[source]
        source: StoreError,
    },
}

impl SettlementError {
    pub fn match_id(&self) -> &str {
        match self {
            SettlementError::AdapterRead { match_id, .. } | SettlementError::AdapterCommit { match_id, .. } => match_id,
        }
    }
}

/// Scores every prediction on a newly completed match and commits the
/// resulting prediction and user score changes through a [`SettlementStore`].
///
/// Stateless between calls. Safe to re-run with the same transition: a
/// completed-to-completed delivery is rejected up front and a stale one is
/// neutralised by the store's compare-and-swap. Failures are returned to the
/// caller, which owns redelivery.
#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn SettlementStore>,
}

impl SettlementService {
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(
        name = "Settle match",
        skip(self, transition),
        fields(match_id = %transition.match_id())
    )]
    pub async fn settle(&self, transition: &MatchTransition) -> Result<SettlementOutcome, SettlementError> {
        let match_id = transition.match_id();
        let mut attempt = SettlementAttempt::new(match_id);

        let Some(completed) = completion_edge(transition) else {
            return Ok(attempt.no_op(NoOpReason::NotApplicable));
        };
        tracing::debug!("Match {} completed. Winner: {}", completed.match_id, completed.winner);

        let predictions = match self.store.fetch_predictions_for_match(&completed.match_id).await {
            Ok(predictions) => predictions,
            Err(source) => {
                attempt.aborted(&source);
                return Err(SettlementError::AdapterRead { match_id: match_id.to_string(), source });
            }
        };
        attempt.predictions_found = predictions.len();
        if predictions.is_empty() {
            return Ok(attempt.no_op(NoOpReason::EmptyPredictionSet));
        }

        let batch = build_settlement_batch(&completed, &predictions);
        if batch.outcomes.is_empty() {
            return Ok(attempt.no_op(NoOpReason::AlreadySettled));
        }

        let receipt = match self.store.commit_settlement(&batch).await {
            Ok(receipt) => receipt,
            Err(source) => {
                attempt.aborted(&source);
                return Err(SettlementError::AdapterCommit { match_id: match_id.to_string(), source });
            }
        };
        if !receipt.wrote_anything() {
            return Ok(attempt.no_op(NoOpReason::AlreadySettled));
        }

        attempt.predictions_scored = receipt.predictions_applied;
        attempt.users_affected = receipt.deltas_applied.len();
        let summary = SettlementSummary {
            match_id: batch.match_id.clone(),
            round: batch.round.clone(),
            winner: batch.winner.clone(),
            points_per_correct: batch.points_per_correct,
            predictions_found: batch.predictions_found,
            predictions_scored: receipt.predictions_applied,
            predictions_already_settled: receipt.predictions_already_settled,
            users_affected: receipt.deltas_applied.len(),
            points_awarded: receipt.deltas_applied.iter().map(|delta| delta.points).sum(),
            deltas: receipt.deltas_applied,
        };
        Ok(attempt.settled(summary))
    }
}

/// Counters for the one structured log line emitted per settlement attempt.
struct SettlementAttempt<'a> {
    match_id: &'a str,
    predictions_found: usize,
    predictions_scored: usize,
    users_affected: usize,
}

impl<'a> SettlementAttempt<'a> {
    fn new(match_id: &'a str) -> Self {
        Self {
            match_id,
            predictions_found: 0,
            predictions_scored: 0,
            users_affected: 0,
        }
    }

    fn no_op(&self, reason: NoOpReason) -> SettlementOutcome {
        let outcome = SettlementOutcome::no_op(reason);
        tracing::info!(
            match_id = self.match_id,
            predictions_found = self.predictions_found,
            predictions_scored = self.predictions_scored,
            users_affected = self.users_affected,
            outcome = outcome.label(),
            reason = %reason,
            "Settlement attempt finished"
        );
        outcome
    }

    fn settled(&self, summary: SettlementSummary) -> SettlementOutcome {
        tracing::info!(
            match_id = self.match_id,
            predictions_found = self.predictions_found,
            predictions_scored = self.predictions_scored,
            users_affected = self.users_affected,
            points_awarded = summary.points_awarded,
            outcome = "settled",
            "Settlement attempt finished"
        );
        SettlementOutcome::Settled(summary)
    }

    fn aborted(&self, error: &StoreError) {
        tracing::error!(
            match_id = self.match_id,
            predictions_found = self.predictions_found,
            predictions_scored = 0,
            users_affected = 0,
            outcome = "aborted",
            error = %error,
            "Settlement attempt finished"
        );
    }
}
