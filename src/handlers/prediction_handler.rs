use actix_web::{web, HttpResponse, Result};
use sqlx::PgPool;

use crate::db::prediction_queries::fetch_predictions_for_user;
use crate::models::common::ApiResponse;
use crate::models::prediction::CreatePredictionRequest;
use crate::services::prediction_service::{create_prediction, PredictionError};

pub async fn submit_prediction(
    request: web::Json<CreatePredictionRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    match create_prediction(&pool, &request).await {
        Ok(prediction) => Ok(HttpResponse::Created().json(ApiResponse::success(
            "Prediction recorded",
            prediction,
        ))),
        Err(e @ PredictionError::Validation(_)) => Ok(HttpResponse::BadRequest().json(
            ApiResponse::<()>::error("Invalid prediction", e.to_string()),
        )),
        Err(e @ PredictionError::Duplicate { .. }) => Ok(HttpResponse::Conflict().json(
            ApiResponse::<()>::error("Prediction already exists", e.to_string()),
        )),
        Err(PredictionError::Database(e)) => {
            tracing::error!("Failed to store prediction: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Failed to store prediction",
                e.to_string(),
            )))
        }
    }
}

/// Newest first.
pub async fn get_user_predictions(
    user_id: String,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    match fetch_predictions_for_user(&pool, &user_id).await {
        Ok(predictions) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            format!("{} predictions for user {}", predictions.len(), user_id),
            predictions,
        ))),
        Err(e) => {
            tracing::error!("Failed to fetch predictions for user {}: {}", user_id, e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Failed to fetch predictions",
                e.to_string(),
            )))
        }
    }
}
