use actix_web::{get, post, web, HttpResponse, Result};
use sqlx::PgPool;

use crate::handlers::prediction_handler;
use crate::models::prediction::CreatePredictionRequest;

/// Submit a prediction for an upcoming match
#[post("")]
async fn submit_prediction(
    request: web::Json<CreatePredictionRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    prediction_handler::submit_prediction(request, pool).await
}

/// Get all predictions of a user
#[get("/user/{user_id}")]
async fn get_user_predictions(
    path: web::Path<String>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    prediction_handler::get_user_predictions(user_id, pool).await
}
