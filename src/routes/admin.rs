use actix_web::{post, web, HttpResponse, Result};
use std::sync::Arc;

use crate::config::settlement::SettlementSettings;
use crate::handlers::admin::settlement_handler;
use crate::models::tennis_match::MatchTransition;
use crate::services::SettlementService;

/// Queue a match transition for the settlement consumer
#[post("/match-transitions")]
async fn enqueue_match_transition(
    transition: web::Json<MatchTransition>,
    redis_client: web::Data<Arc<redis::Client>>,
    settings: web::Data<SettlementSettings>,
) -> Result<HttpResponse> {
    settlement_handler::enqueue_match_transition(transition, redis_client, settings).await
}

/// Settle a match transition synchronously
#[post("/match-transitions/settle")]
async fn settle_match_transition(
    transition: web::Json<MatchTransition>,
    settlement: web::Data<SettlementService>,
    redis_client: web::Data<Arc<redis::Client>>,
    settings: web::Data<SettlementSettings>,
) -> Result<HttpResponse> {
    settlement_handler::settle_match_transition(transition, settlement, redis_client, settings).await
}
