use actix_web::{get, web, HttpResponse, Result};
use sqlx::PgPool;

use crate::handlers::leaderboard_handler::{self, LeaderboardQuery};

/// Get the prediction leaderboard
#[get("/leaderboard")]
async fn get_leaderboard(
    query: web::Query<LeaderboardQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    leaderboard_handler::get_leaderboard(query, pool).await
}
