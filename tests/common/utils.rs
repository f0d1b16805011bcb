use secrecy::ExposeSecret;
use sqlx::{PgPool, PgConnection, Connection, Executor};
use std::net::TcpListener;
use std::sync::Arc;
use uuid::Uuid;
use once_cell::sync::Lazy;

use courtside_backend::run;
use courtside_backend::config::settings::{get_config, get_redis_url, DatabaseSettings};
use courtside_backend::config::settlement::SettlementSettings;
use courtside_backend::db::settlement_store::PgSettlementStore;
use courtside_backend::services::SettlementService;
use courtside_backend::telemetry::{get_subscriber, init_subscriber};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::stdout
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::sink
        );
        init_subscriber(subscriber);
    }
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub redis_client: Arc<redis::Client>,
    pub settlement: SettlementSettings,
}

pub async fn spawn_app() -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);
    let mut configuration = get_config().expect("Failed to read configuration.");
    configuration.database.db_name = Uuid::new_v4().to_string();
    configuration.database.db_url = None;
    let connection_pool = configure_db(&configuration.database)
        .await;
    let redis_client = Arc::new(
        redis::Client::open(get_redis_url(&configuration).expose_secret())
            .expect("Failed to create Redis client")
    );
    // Each test app gets its own stream so consumers never see foreign entries
    let mut settlement = configuration.settlement.clone();
    settlement.stream_key = format!("test:transitions:{}", Uuid::new_v4());
    settlement.events_channel = format!("test:events:{}", Uuid::new_v4());

    let settlement_service = SettlementService::new(Arc::new(PgSettlementStore::new(connection_pool.clone())));
    let server = run(
        listener,
        connection_pool.clone(),
        redis_client.clone(),
        settlement_service,
        settlement.clone(),
        vec![],
    )
        .expect("Failed to bind address");
    // Launch the server as a background task
    let _ = tokio::spawn(server);
    TestApp {
        address,
        db_pool: connection_pool,
        redis_client,
        settlement,
    }
}

pub async fn configure_db(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(
            &config.connection_string_without_db()
        )
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.db_name).as_str())
        .await
        .expect("Failed to create database.");

    // Migrate database
    let connection_pool = PgPool::connect(config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    connection_pool
}
