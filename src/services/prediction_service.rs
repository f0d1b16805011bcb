use sqlx::PgPool;

use crate::db::leaderboard_queries::upsert_display_name;
use crate::db::prediction_queries::insert_prediction;
use crate::models::prediction::{CreatePredictionRequest, Prediction};

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Field '{0}' must not be empty")]
    Validation(&'static str),

    #[error("User {user_id} already predicted match {match_id}")]
    Duplicate { user_id: String, match_id: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Record a new unsettled prediction. One prediction per user and match.
#[tracing::instrument(name = "Create prediction", skip(pool, request), fields(match_id = %request.match_id))]
pub async fn create_prediction(
    pool: &PgPool,
    request: &CreatePredictionRequest,
) -> Result<Prediction, PredictionError> {
    if let Some(field) = request.missing_field() {
        return Err(PredictionError::Validation(field));
    }

    match insert_prediction(pool, request).await? {
        Some(prediction) => {
            tracing::info!(
                "Prediction {} recorded: user {} picked {} for match {}",
                prediction.id, prediction.user_id, prediction.predicted_winner, prediction.match_id
            );
            if let Some(display_name) = request.display_name() {
                if let Err(e) = upsert_display_name(pool, &prediction.user_id, display_name).await {
                    tracing::warn!("Failed to store display name for user {}: {}", prediction.user_id, e);
                }
            }
            Ok(prediction)
        }
        None => Err(PredictionError::Duplicate {
            user_id: request.user_id.trim().to_string(),
            match_id: request.match_id.trim().to_string(),
        }),
    }
}
