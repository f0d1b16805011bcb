use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db::prediction_queries::fetch_predictions_for_match;
use crate::models::prediction::Prediction;
use crate::models::settlement::{CommitReceipt, SettlementBatch};
use crate::models::user::UserDelta;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Rejected delta for user {user_id}: {reason}")]
    InvalidDelta { user_id: String, reason: String },
}

/// Persistence boundary of the settlement engine.
///
/// `commit_settlement` must apply the prediction updates and the user deltas
/// as one unit: either every write lands or none does. Each prediction update
/// is conditional on the prediction still being unsettled, and user deltas are
/// additive so concurrent commits for other matches compose.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn fetch_predictions_for_match(&self, match_id: &str) -> Result<Vec<Prediction>, StoreError>;

    async fn commit_settlement(&self, batch: &SettlementBatch) -> Result<CommitReceipt, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgSettlementStore {
    pool: PgPool,
}

impl PgSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettlementStore for PgSettlementStore {
    async fn fetch_predictions_for_match(&self, match_id: &str) -> Result<Vec<Prediction>, StoreError> {
        Ok(fetch_predictions_for_match(&self.pool, match_id).await?)
    }

    #[tracing::instrument(
        name = "Commit settlement batch",
        skip(self, batch),
        fields(match_id = %batch.match_id, predictions = batch.outcomes.len())
    )]
    async fn commit_settlement(&self, batch: &SettlementBatch) -> Result<CommitReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The settlement row doubles as the idempotency key for the match.
        // A concurrent commit for the same match blocks here until the
        // first one finishes, then sees the conflict.
        let claimed = sqlx::query(
            r#"
            INSERT INTO match_settlements (match_id, round, winner, predictions_found, predictions_scored, users_affected)
            VALUES ($1, $2, $3, $4, 0, 0)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(&batch.match_id)
        .bind(batch.round.label())
        .bind(&batch.winner)
        .bind(batch.predictions_found as i32)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            tracing::info!("Match {} already has a settlement record, skipping commit", batch.match_id);
            return Ok(CommitReceipt::already_settled());
        }

        let ids: Vec<Uuid> = batch.outcomes.iter().map(|o| o.prediction_id).collect();
        let correct: Vec<bool> = batch.outcomes.iter().map(|o| o.is_correct).collect();
        let points: Vec<i32> = batch.outcomes.iter().map(|o| o.points).collect();

        // Compare-and-swap: only predictions that are still unsettled change.
        let swapped: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE predictions AS p
            SET is_correct = u.is_correct,
                points = u.points,
                settled_at = NOW()
            FROM UNNEST($1::uuid[], $2::bool[], $3::int4[]) AS u(id, is_correct, points)
            WHERE p.id = u.id
              AND p.match_id = $4
              AND p.is_correct IS NULL
            RETURNING p.id
            "#,
        )
        .bind(&ids)
        .bind(&correct)
        .bind(&points)
        .bind(&batch.match_id)
        .fetch_all(&mut *tx)
        .await?;

        let applied: HashSet<Uuid> = swapped.into_iter().collect();
        let conflicts = batch.outcomes.len() - applied.len();
        if conflicts > 0 {
            tracing::warn!(
                "{} predictions for match {} were already settled, excluding them from user deltas",
                conflicts, batch.match_id
            );
        }

        let deltas = batch.deltas_for(&applied);
        for delta in &deltas {
            apply_user_delta(&mut tx, delta).await?;
        }

        sqlx::query(
            r#"
            UPDATE match_settlements
            SET predictions_scored = $2, users_affected = $3
            WHERE match_id = $1
            "#,
        )
        .bind(&batch.match_id)
        .bind(applied.len() as i32)
        .bind(deltas.len() as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommitReceipt {
            predictions_applied: applied.len(),
            predictions_already_settled: conflicts,
            deltas_applied: deltas,
            match_already_settled: false,
        })
    }
}

/// Additive upsert. Never reads the current aggregate, so commits for other
/// matches touching the same user serialize on the row lock instead of
/// overwriting each other.
async fn apply_user_delta(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    delta: &UserDelta,
) -> Result<(), StoreError> {
    if !delta.is_consistent() {
        return Err(StoreError::InvalidDelta {
            user_id: delta.user_id.clone(),
            reason: format!("points={} correct={} total={}", delta.points, delta.correct, delta.total),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO user_scores (user_id, points, correct_predictions, total_predictions, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            points = user_scores.points + EXCLUDED.points,
            correct_predictions = user_scores.correct_predictions + EXCLUDED.correct_predictions,
            total_predictions = user_scores.total_predictions + EXCLUDED.total_predictions,
            updated_at = NOW()
        "#,
    )
    .bind(&delta.user_id)
    .bind(delta.points)
    .bind(delta.correct)
    .bind(delta.total)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
