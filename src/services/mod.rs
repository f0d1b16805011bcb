pub mod match_events;
pub mod prediction_service;
pub mod redis_service;
pub mod settlement_events;
pub mod settlement_service;

pub use match_events::MatchEventConsumer;
pub use prediction_service::PredictionError;
pub use redis_service::RedisService;
pub use settlement_service::{SettlementError, SettlementService};
