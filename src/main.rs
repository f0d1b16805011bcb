use std::net::TcpListener;
use std::sync::Arc;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use courtside_backend::run;
use courtside_backend::config::settings::get_config;
use courtside_backend::db::settlement_store::PgSettlementStore;
use courtside_backend::services::{MatchEventConsumer, RedisService, SettlementService};
use courtside_backend::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "courtside-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout
    );
    init_subscriber(subscriber);

    let redis_service = match RedisService::new(&config.redis) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to create Redis client: {}", e);
            eprintln!("Redis is required for match transitions. Please ensure Redis is running.");
            std::process::exit(1);
        }
    };

    // Only try to establish connection when actually used
    let connection_pool = PgPoolOptions::new()
        .max_connections(32)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_lazy(config.database.connection_string().expose_secret())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&connection_pool).await {
        tracing::error!("❌ Failed to run database migrations: {}", e);
        std::process::exit(1);
    }

    let store = Arc::new(PgSettlementStore::new(connection_pool.clone()));
    let settlement_service = SettlementService::new(store);

    let consumer = MatchEventConsumer::new(
        redis_service.client.clone(),
        settlement_service.clone(),
        config.settlement.clone(),
    );
    tokio::spawn(consumer.run());
    tracing::info!("✅ Match transition consumer started");

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;

    run(
        listener,
        connection_pool,
        redis_service.client,
        settlement_service,
        config.settlement,
        config.application.allowed_origins,
    )?.await
}
