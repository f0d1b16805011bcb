use sqlx::PgPool;

use crate::models::user::UserScore;

#[tracing::instrument(name = "Fetch leaderboard", skip(pool))]
pub async fn fetch_leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<UserScore>, sqlx::Error> {
    sqlx::query_as::<_, UserScore>(
        r#"
        SELECT user_id, display_name, points, correct_predictions, total_predictions, updated_at
        FROM user_scores
        ORDER BY points DESC, correct_predictions DESC, user_id ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[tracing::instrument(name = "Fetch user score", skip(pool))]
pub async fn fetch_user_score(pool: &PgPool, user_id: &str) -> Result<Option<UserScore>, sqlx::Error> {
    sqlx::query_as::<_, UserScore>(
        r#"
        SELECT user_id, display_name, points, correct_predictions, total_predictions, updated_at
        FROM user_scores
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Record the name shown for `user_id`, creating an empty score row if needed.
#[tracing::instrument(name = "Upsert display name", skip(pool))]
pub async fn upsert_display_name(pool: &PgPool, user_id: &str, display_name: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_scores (user_id, display_name, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (user_id) DO UPDATE SET display_name = EXCLUDED.display_name
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .execute(pool)
    .await?;
    Ok(())
}
