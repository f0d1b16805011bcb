use std::sync::Arc;
use secrecy::ExposeSecret;
use redis::Client;

use crate::config::redis::RedisSettings;

#[derive(Clone, Debug)]
pub struct RedisService {
    pub client: Arc<Client>,
}

impl RedisService {
    /// Open a client. Connections are only made when first used.
    pub fn new(settings: &RedisSettings) -> Result<Self, redis::RedisError> {
        let client = match Client::open(settings.get_redis_url().expose_secret()) {
            Ok(client) => {
                tracing::info!("Redis client created successfully");
                client
            },
            Err(e) => {
                tracing::error!("Failed to create Redis client: {}", e);
                return Err(e);
            }
        };
        Ok(Self { client: Arc::new(client) })
    }
}
