use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use uuid::Uuid;

use crate::game::scoring::aggregate_user_deltas;
use crate::models::prediction::PredictionOutcome;
use crate::models::tennis_match::Round;
use crate::models::user::UserDelta;

/// Everything one match completion writes. Never persisted on its own: it is
/// either applied in full by the store or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub match_id: String,
    pub round: Round,
    pub winner: String,
    pub points_per_correct: i32,
    /// Predictions on record for the match, settled or not.
    pub predictions_found: usize,
    pub outcomes: Vec<PredictionOutcome>,
    /// Sorted by `user_id`.
    pub deltas: Vec<UserDelta>,
}

impl SettlementBatch {
    pub fn predictions_scored(&self) -> usize {
        self.outcomes.len()
    }

    pub fn users_affected(&self) -> usize {
        self.deltas.len()
    }

    pub fn points_awarded(&self) -> i64 {
        self.deltas.iter().map(|delta| delta.points).sum()
    }

    pub fn correct_predictions(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_correct).count()
    }

    /// Deltas restricted to the predictions the store actually swapped.
    pub fn deltas_for(&self, applied: &HashSet<Uuid>) -> Vec<UserDelta> {
        let applied_outcomes: Vec<PredictionOutcome> = self
            .outcomes
            .iter()
            .filter(|outcome| applied.contains(&outcome.prediction_id))
            .cloned()
            .collect();
        aggregate_user_deltas(&applied_outcomes)
    }
}

/// What the store reports after a commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub predictions_applied: usize,
    /// Predictions whose compare-and-swap found them already settled.
    pub predictions_already_settled: usize,
    pub deltas_applied: Vec<UserDelta>,
    /// The match already had a settlement record; nothing was written.
    pub match_already_settled: bool,
}

impl CommitReceipt {
    pub fn already_settled() -> Self {
        Self {
            match_already_settled: true,
            ..Self::default()
        }
    }

    pub fn wrote_anything(&self) -> bool {
        !self.match_already_settled && self.predictions_applied > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// The delivery is not a not-completed to completed edge.
    NotApplicable,
    EmptyPredictionSet,
    /// A previous delivery already committed this match.
    AlreadySettled,
}

impl Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            NoOpReason::NotApplicable => "not_applicable",
            NoOpReason::EmptyPredictionSet => "empty_prediction_set",
            NoOpReason::AlreadySettled => "already_settled",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub match_id: String,
    pub round: Round,
    pub winner: String,
    pub points_per_correct: i32,
    pub predictions_found: usize,
    pub predictions_scored: usize,
    pub predictions_already_settled: usize,
    pub users_affected: usize,
    pub points_awarded: i64,
    pub deltas: Vec<UserDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Settled(SettlementSummary),
    NoOp { reason: NoOpReason },
}

impl SettlementOutcome {
    pub fn no_op(reason: NoOpReason) -> Self {
        SettlementOutcome::NoOp { reason }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, SettlementOutcome::Settled(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettlementOutcome::Settled(_) => "settled",
            SettlementOutcome::NoOp { .. } => "no-op",
        }
    }
}

/// Events published on the predictions pub/sub channel.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "event_type")]
pub enum PredictionEvent {
    #[serde(rename = "match_settled")]
    MatchSettled {
        match_id: String,
        round: Round,
        winner: String,
        predictions_scored: usize,
        users_affected: usize,
        points_awarded: i64,
        settled_at: DateTime<Utc>,
    },
}

impl PredictionEvent {
    pub fn match_settled(summary: &SettlementSummary) -> Self {
        PredictionEvent::MatchSettled {
            match_id: summary.match_id.clone(),
            round: summary.round.clone(),
            winner: summary.winner.clone(),
            predictions_scored: summary.predictions_scored,
            users_affected: summary.users_affected,
            points_awarded: summary.points_awarded,
            settled_at: Utc::now(),
        }
    }
}
