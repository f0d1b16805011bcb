use serde::Deserialize;

/// Tuning for the match transition consumer.
#[derive(Debug, Deserialize, Clone)]
pub struct SettlementSettings {
    pub stream_key: String,
    pub consumer_group: String,
    pub consumer_name: String,
    pub batch_size: usize,
    pub block_ms: usize,
    pub max_concurrent_settlements: usize,
    pub retry_backoff_ms: u64,
    /// Approximate cap on stream length. Older entries are trimmed on append.
    #[serde(default = "default_stream_max_len")]
    pub stream_max_len: usize,
    /// Pending entries of other consumers idle this long are claimed.
    #[serde(default = "default_claim_idle_ms")]
    pub claim_idle_ms: usize,
    pub events_channel: String,
}

fn default_stream_max_len() -> usize {
    10_000
}

fn default_claim_idle_ms() -> usize {
    60_000
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            stream_key: "matches:transitions".into(),
            consumer_group: "settlement".into(),
            consumer_name: "settlement-1".into(),
            batch_size: 16,
            block_ms: 5_000,
            max_concurrent_settlements: 4,
            retry_backoff_ms: 2_000,
            stream_max_len: default_stream_max_len(),
            claim_idle_ms: default_claim_idle_ms(),
            events_channel: "predictions:events:global".into(),
        }
    }
}
