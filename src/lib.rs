use actix_web::{http, web, App, HttpServer};
use actix_web::dev::Server;
use tracing_actix_web::TracingLogger;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use actix_cors::Cors;

pub mod config;
pub mod telemetry;
mod routes;
mod handlers;
pub mod models;
pub mod db;
pub mod game;
pub mod services;
use crate::routes::init_routes;
use crate::config::settlement::SettlementSettings;
use crate::services::SettlementService;

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    redis_client: Arc<redis::Client>,
    settlement_service: SettlementService,
    settlement_settings: SettlementSettings,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    // Wrap using web::Data, which boils down to an Arc smart pointer
    let db_pool_data = web::Data::new(db_pool);
    let redis_client_data = web::Data::new(redis_client);
    let settlement_service = web::Data::new(settlement_service);
    let settlement_settings = web::Data::new(settlement_settings);

    let server = HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Get a pointer copy and attach it to the application state
            .app_data(db_pool_data.clone())
            .app_data(redis_client_data.clone())
            .app_data(settlement_service.clone())
            .app_data(settlement_settings.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
