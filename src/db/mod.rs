pub mod leaderboard_queries;
pub mod prediction_queries;
pub mod settlement_store;
