pub mod common;
pub mod prediction;
pub mod settlement;
pub mod tennis_match;
pub mod user;
