use redis::AsyncCommands;

use crate::models::settlement::{PredictionEvent, SettlementSummary};

/// Broadcast a settled match so leaderboard views can refresh.
pub async fn publish_match_settled(
    redis_client: &redis::Client,
    channel: &str,
    summary: &SettlementSummary,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = PredictionEvent::match_settled(summary);
    let mut conn = redis_client.get_multiplexed_async_connection().await?;
    let message = serde_json::to_string(&event)?;

    let result: Result<i32, redis::RedisError> = conn.publish(channel, message).await;
    match result {
        Ok(receivers) => {
            tracing::info!("📤 Published settlement of match {} to {} subscribers", summary.match_id, receivers);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Failed to publish settlement event: {}", e);
            Err(Box::new(e))
        }
    }
}
