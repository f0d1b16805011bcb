use futures::stream::{self, StreamExt};
use redis::aio::Connection;
use redis::streams::{
    StreamClaimReply, StreamId, StreamMaxlen, StreamPendingCountReply, StreamPendingId, StreamReadOptions,
    StreamReadReply,
};
use redis::{AsyncCommands, RedisError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::settlement::SettlementSettings;
use crate::models::settlement::SettlementOutcome;
use crate::models::tennis_match::MatchTransition;
use crate::services::settlement_events::publish_match_settled;
use crate::services::settlement_service::SettlementService;

/// Stream entry field carrying the JSON encoded [`MatchTransition`].
pub const TRANSITION_FIELD: &str = "transition";

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream entry {0} has no transition payload")]
    MissingPayload(String),
}

/// Append a transition to the match stream, trimming it to roughly
/// `max_len` entries. Returns the stream entry id.
pub async fn publish_match_transition(
    redis_client: &redis::Client,
    stream_key: &str,
    max_len: usize,
    transition: &MatchTransition,
) -> Result<String, ConsumerError> {
    let mut conn = redis_client.get_multiplexed_async_connection().await?;
    let payload = serde_json::to_string(transition)?;
    let entry_id: String = conn
        .xadd_maxlen(stream_key, StreamMaxlen::Approx(max_len), "*", &[(TRANSITION_FIELD, payload)])
        .await?;

    tracing::info!(
        "Queued transition for match {} (completed {} -> {}) as {}",
        transition.match_id(), transition.before.completed, transition.after.completed, entry_id
    );
    Ok(entry_id)
}

pub fn decode_transition(entry: &StreamId) -> Result<MatchTransition, ConsumerError> {
    let payload: String = entry
        .get(TRANSITION_FIELD)
        .ok_or_else(|| ConsumerError::MissingPayload(entry.id.clone()))?;
    Ok(serde_json::from_str(&payload)?)
}

/// Pending entries owned by other consumers that have been idle for at least
/// `min_idle_ms`, typically left behind by an instance that went away.
pub fn abandoned_entry_ids(pending: &[StreamPendingId], consumer_name: &str, min_idle_ms: usize) -> Vec<String> {
    pending
        .iter()
        .filter(|entry| entry.consumer != consumer_name && entry.last_delivered_ms >= min_idle_ms)
        .map(|entry| entry.id.clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Leave pending so a later sweep redelivers it.
    Retry,
}

/// Consumer-group reader that drives the settlement engine.
///
/// Entries are acknowledged only once the engine reports success. Anything
/// that fails stays in the group's pending list and is picked up again by the
/// next pending sweep, which gives at-least-once delivery without the engine
/// retrying internally.
pub struct MatchEventConsumer {
    redis_client: Arc<redis::Client>,
    settlement: SettlementService,
    settings: SettlementSettings,
}

impl MatchEventConsumer {
    pub fn new(redis_client: Arc<redis::Client>, settlement: SettlementService, settings: SettlementSettings) -> Self {
        Self { redis_client, settlement, settings }
    }

    /// Run until the task is dropped, reconnecting after Redis failures.
    pub async fn run(self) {
        let backoff = Duration::from_millis(self.settings.retry_backoff_ms);
        loop {
            if let Err(e) = self.consume().await {
                tracing::error!("❌ Match event consumer failed: {}. Reconnecting in {:?}", e, backoff);
            }
            tokio::time::sleep(backoff).await;
        }
    }

    async fn consume(&self) -> Result<(), ConsumerError> {
        let mut conn = self.redis_client.get_async_connection().await?;
        self.ensure_group(&mut conn).await?;
        tracing::info!(
            "✅ Consuming match transitions from '{}' as {}/{}",
            self.settings.stream_key, self.settings.consumer_group, self.settings.consumer_name
        );

        let backoff = Duration::from_millis(self.settings.retry_backoff_ms);
        let claim_interval = Duration::from_millis(self.settings.claim_idle_ms as u64);
        // Leftovers from a previous run are swept first.
        let mut next_sweep = Some(Instant::now());
        let mut next_claim = Instant::now();

        loop {
            if Instant::now() >= next_claim {
                if self.claim_abandoned(&mut conn).await? > 0 && next_sweep.is_none() {
                    next_sweep = Some(Instant::now() + backoff);
                }
                next_claim = Instant::now() + claim_interval.max(backoff);
                continue;
            }

            if next_sweep.is_some_and(|due| Instant::now() >= due) {
                let retried = self.sweep_pending(&mut conn).await?;
                next_sweep = (retried > 0).then(|| Instant::now() + backoff);
                continue;
            }

            let entries = self.read_entries(&mut conn, ">").await?;
            if entries.is_empty() {
                continue;
            }
            if self.process(&mut conn, entries).await? > 0 && next_sweep.is_none() {
                next_sweep = Some(Instant::now() + backoff);
            }
        }
    }

    async fn ensure_group(&self, conn: &mut Connection) -> Result<(), ConsumerError> {
        let created: Result<(), RedisError> = conn
            .xgroup_create_mkstream(&self.settings.stream_key, &self.settings.consumer_group, "0")
            .await;
        match created {
            Ok(()) => {
                tracing::info!("Created consumer group '{}'", self.settings.consumer_group);
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Walk this consumer's pending entries once. Returns how many are still
    /// pending afterwards.
    async fn sweep_pending(&self, conn: &mut Connection) -> Result<usize, ConsumerError> {
        let mut cursor = "0".to_string();
        let mut still_pending = 0;
        loop {
            let entries = self.read_entries(conn, &cursor).await?;
            let Some(last) = entries.last() else {
                break;
            };
            cursor = last.id.clone();
            still_pending += self.process(conn, entries).await?;
        }
        if still_pending > 0 {
            tracing::warn!("⚠️ {} match transitions still pending after sweep", still_pending);
        }
        Ok(still_pending)
    }

    /// Take over entries another consumer read but never acknowledged, then
    /// settle them here. Returns how many are still pending afterwards.
    async fn claim_abandoned(&self, conn: &mut Connection) -> Result<usize, ConsumerError> {
        let pending: StreamPendingCountReply = conn
            .xpending_count(
                &self.settings.stream_key,
                &self.settings.consumer_group,
                "-",
                "+",
                self.settings.batch_size * 4,
            )
            .await?;
        let ids = abandoned_entry_ids(&pending.ids, &self.settings.consumer_name, self.settings.claim_idle_ms);
        if ids.is_empty() {
            return Ok(0);
        }

        let claimed: StreamClaimReply = conn
            .xclaim(
                &self.settings.stream_key,
                &self.settings.consumer_group,
                &self.settings.consumer_name,
                self.settings.claim_idle_ms,
                &ids[..],
            )
            .await?;
        if claimed.ids.is_empty() {
            return Ok(0);
        }
        tracing::info!(
            "Claimed {} abandoned match transitions for {}",
            claimed.ids.len(), self.settings.consumer_name
        );
        self.process(conn, claimed.ids).await
    }

    async fn read_entries(&self, conn: &mut Connection, start_id: &str) -> Result<Vec<StreamId>, ConsumerError> {
        let mut options = StreamReadOptions::default()
            .group(&self.settings.consumer_group, &self.settings.consumer_name)
            .count(self.settings.batch_size);
        // Pending history never blocks; only new entries do.
        if start_id == ">" {
            options = options.block(self.settings.block_ms);
        }
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.settings.stream_key], &[start_id], &options)
            .await?;
        Ok(reply
            .map(|reply| reply.keys.into_iter().flat_map(|key| key.ids).collect())
            .unwrap_or_default())
    }

    /// Settle a batch of entries concurrently and acknowledge the finished
    /// ones. Returns how many were left pending.
    async fn process(&self, conn: &mut Connection, entries: Vec<StreamId>) -> Result<usize, ConsumerError> {
        let results: Vec<(String, Disposition)> = stream::iter(entries)
            .map(|entry| async move {
                let disposition = self.handle_entry(&entry).await;
                (entry.id, disposition)
            })
            .buffer_unordered(self.settings.max_concurrent_settlements.max(1))
            .collect()
            .await;

        let acked: Vec<&str> = results
            .iter()
            .filter(|(_, disposition)| *disposition == Disposition::Ack)
            .map(|(id, _)| id.as_str())
            .collect();
        if !acked.is_empty() {
            let _: usize = conn
                .xack(&self.settings.stream_key, &self.settings.consumer_group, &acked[..])
                .await?;
        }
        Ok(results.len() - acked.len())
    }

    pub async fn handle_entry(&self, entry: &StreamId) -> Disposition {
        let transition = match decode_transition(entry) {
            Ok(transition) => transition,
            Err(e) => {
                // Redelivering a payload that cannot be decoded never helps.
                tracing::error!("❌ Dropping malformed stream entry {}: {}", entry.id, e);
                return Disposition::Ack;
            }
        };

        match self.settlement.settle(&transition).await {
            Ok(SettlementOutcome::Settled(summary)) => {
                if let Err(e) = publish_match_settled(&self.redis_client, &self.settings.events_channel, &summary).await {
                    tracing::error!("Failed to broadcast settlement of match {}: {}", summary.match_id, e);
                }
                Disposition::Ack
            }
            Ok(SettlementOutcome::NoOp { .. }) => Disposition::Ack,
            Err(e) => {
                tracing::warn!("Settlement of match {} failed, leaving entry {} pending: {}", e.match_id(), entry.id, e);
                Disposition::Retry
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tennis_match::{Round, TennisMatch};
    use std::collections::HashMap;

    fn entry(fields: &[(&str, &str)]) -> StreamId {
        let map: HashMap<String, redis::Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), redis::Value::Data(v.as_bytes().to_vec())))
            .collect();
        StreamId { id: "1700000000000-0".into(), map }
    }

    #[test]
    fn decodes_transition_payload() {
        let transition = MatchTransition::new(
            TennisMatch {
                id: "m1".into(),
                tournament_id: None,
                round: Round::Final,
                completed: false,
                winner: None,
                score: None,
            },
            TennisMatch {
                id: "m1".into(),
                tournament_id: None,
                round: Round::Final,
                completed: true,
                winner: Some("p1".into()),
                score: Some("7-6 6-4".into()),
            },
        );
        let payload = serde_json::to_string(&transition).unwrap();
        let decoded = decode_transition(&entry(&[(TRANSITION_FIELD, &payload)])).unwrap();
        assert_eq!(decoded, transition);
    }

    fn pending(id: &str, consumer: &str, idle_ms: usize) -> StreamPendingId {
        StreamPendingId {
            id: id.into(),
            consumer: consumer.into(),
            times_delivered: 1,
            last_delivered_ms: idle_ms,
        }
    }

    #[test]
    fn only_idle_entries_of_other_consumers_are_abandoned() {
        let pending = vec![
            pending("1-0", "settlement-1", 120_000),
            pending("2-0", "settlement-2", 120_000),
            pending("3-0", "settlement-2", 500),
            pending("4-0", "settlement-3", 60_000),
        ];
        assert_eq!(abandoned_entry_ids(&pending, "settlement-1", 60_000), vec!["2-0", "4-0"]);
    }

    #[test]
    fn missing_payload_is_reported() {
        let err = decode_transition(&entry(&[("other", "x")])).unwrap_err();
        assert!(matches!(err, ConsumerError::MissingPayload(id) if id == "1700000000000-0"));
    }

    #[test]
    fn malformed_payload_is_a_serialization_error() {
        let err = decode_transition(&entry(&[(TRANSITION_FIELD, "{not json")])).unwrap_err();
        assert!(matches!(err, ConsumerError::Serialization(_)));
    }
}
