pub mod scoring;
pub mod settlement;
