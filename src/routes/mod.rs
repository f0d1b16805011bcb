use actix_web::web;

pub mod admin;
pub mod backend_health;
pub mod leaderboard;
pub mod predictions;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health)
        .service(leaderboard::get_leaderboard);

    cfg.service(
        web::scope("/predictions")
            .service(predictions::submit_prediction)
            .service(predictions::get_user_predictions)
    );
    // Admin routes
    cfg.service(
        web::scope("/admin")
            .service(admin::enqueue_match_transition)
            .service(admin::settle_match_transition)
    );
}
