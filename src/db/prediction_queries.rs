use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::prediction::{CreatePredictionRequest, Prediction};

const PREDICTION_COLUMNS: &str =
    "id, user_id, match_id, predicted_winner, points, is_correct, created_at, settled_at";

#[tracing::instrument(name = "Fetch predictions for match", skip(pool))]
pub async fn fetch_predictions_for_match(pool: &PgPool, match_id: &str) -> Result<Vec<Prediction>, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(&format!(
        "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE match_id = $1 ORDER BY created_at"
    ))
    .bind(match_id)
    .fetch_all(pool)
    .await
}

#[tracing::instrument(name = "Fetch predictions for user", skip(pool))]
pub async fn fetch_predictions_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Prediction>, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(&format!(
        "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Insert an unsettled prediction. Returns `None` when the user already has a
/// prediction for the match.
#[tracing::instrument(
    name = "Insert prediction",
    skip(pool, request),
    fields(user_id = %request.user_id, match_id = %request.match_id)
)]
pub async fn insert_prediction(
    pool: &PgPool,
    request: &CreatePredictionRequest,
) -> Result<Option<Prediction>, sqlx::Error> {
    sqlx::query_as::<_, Prediction>(&format!(
        r#"
        INSERT INTO predictions (id, user_id, match_id, predicted_winner, points, is_correct, created_at)
        VALUES ($1, $2, $3, $4, 0, NULL, $5)
        ON CONFLICT (user_id, match_id) DO NOTHING
        RETURNING {PREDICTION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(request.user_id.trim())
    .bind(request.match_id.trim())
    .bind(request.predicted_winner.trim())
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute prediction insert query: {:?}", e);
        e
    })
}
