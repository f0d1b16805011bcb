use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::config::settlement::SettlementSettings;
use crate::models::common::ApiResponse;
use crate::models::settlement::SettlementOutcome;
use crate::models::tennis_match::MatchTransition;
use crate::services::match_events::publish_match_transition;
use crate::services::settlement_events::publish_match_settled;
use crate::services::SettlementService;

#[derive(Debug, Serialize)]
pub struct QueuedTransition {
    pub match_id: String,
    pub stream_entry_id: String,
}

fn validate_transition(transition: &MatchTransition) -> Option<String> {
    if transition.before.id.trim().is_empty() || transition.after.id.trim().is_empty() {
        return Some("Match id must not be empty".to_string());
    }
    if transition.before.id != transition.after.id {
        return Some(format!(
            "Transition ids differ: before '{}', after '{}'",
            transition.before.id, transition.after.id
        ));
    }
    None
}

/// Put a match transition on the stream for the background consumer.
pub async fn enqueue_match_transition(
    transition: web::Json<MatchTransition>,
    redis_client: web::Data<Arc<redis::Client>>,
    settings: web::Data<SettlementSettings>,
) -> Result<HttpResponse> {
    if let Some(reason) = validate_transition(&transition) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error("Invalid transition", reason)));
    }

    match publish_match_transition(&redis_client, &settings.stream_key, settings.stream_max_len, &transition).await {
        Ok(stream_entry_id) => Ok(HttpResponse::Accepted().json(ApiResponse::success(
            "Transition queued for settlement",
            QueuedTransition {
                match_id: transition.match_id().to_string(),
                stream_entry_id,
            },
        ))),
        Err(e) => {
            tracing::error!("Failed to queue transition for match {}: {}", transition.match_id(), e);
            Ok(HttpResponse::ServiceUnavailable().json(ApiResponse::<()>::error(
                "Failed to queue transition",
                e.to_string(),
            )))
        }
    }
}

/// Run the settlement engine inline and return its outcome.
#[tracing::instrument(name = "Admin settle match", skip_all, fields(match_id = %transition.match_id()))]
pub async fn settle_match_transition(
    transition: web::Json<MatchTransition>,
    settlement: web::Data<SettlementService>,
    redis_client: web::Data<Arc<redis::Client>>,
    settings: web::Data<SettlementSettings>,
) -> Result<HttpResponse> {
    if let Some(reason) = validate_transition(&transition) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error("Invalid transition", reason)));
    }
    tracing::info!("📋 Admin requested settlement of match {}", transition.match_id());

    match settlement.settle(&transition).await {
        Ok(outcome) => {
            if let SettlementOutcome::Settled(summary) = &outcome {
                if let Err(e) = publish_match_settled(&redis_client, &settings.events_channel, summary).await {
                    tracing::warn!("Failed to broadcast settlement of match {}: {}", summary.match_id, e);
                }
            }
            let message = match &outcome {
                SettlementOutcome::Settled(summary) => format!(
                    "Settled {} predictions for {} users",
                    summary.predictions_scored, summary.users_affected
                ),
                SettlementOutcome::NoOp { reason } => format!("Nothing to settle: {}", reason),
            };
            Ok(HttpResponse::Ok().json(ApiResponse::success(message, outcome)))
        }
        Err(e) => {
            tracing::error!("Settlement of match {} failed: {}", e.match_id(), e);
            Ok(HttpResponse::ServiceUnavailable().json(ApiResponse::<()>::error(
                "Settlement failed, retry later",
                e.to_string(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tennis_match::{Round, TennisMatch};

    fn tennis_match(id: &str) -> TennisMatch {
        TennisMatch {
            id: id.into(),
            tournament_id: None,
            round: Round::SecondRound,
            completed: false,
            winner: None,
            score: None,
        }
    }

    #[test]
    fn rejects_blank_and_mismatched_ids() {
        assert!(validate_transition(&MatchTransition::new(tennis_match(""), tennis_match(""))).is_some());
        assert!(validate_transition(&MatchTransition::new(tennis_match("m1"), tennis_match("m2"))).is_some());
        assert!(validate_transition(&MatchTransition::new(tennis_match("m1"), tennis_match("m1"))).is_none());
    }
}
