use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::leaderboard_queries::fetch_leaderboard;
use crate::models::common::ApiResponse;
use crate::models::user::LeaderboardEntry;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 20;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT)
    }
}

/// Users ranked by points, ties broken by correct predictions.
#[tracing::instrument(name = "Get leaderboard", skip(pool))]
pub async fn get_leaderboard(
    query: web::Query<LeaderboardQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let limit = query.effective_limit();

    match fetch_leaderboard(&pool, limit).await {
        Ok(scores) => {
            let entries = LeaderboardEntry::from_ranked(scores);
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                format!("Top {} users", entries.len()),
                entries,
            )))
        }
        Err(e) => {
            tracing::error!("Failed to fetch leaderboard: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Failed to fetch leaderboard",
                e.to_string(),
            )))
        }
    }
}
