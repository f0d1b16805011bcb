pub mod settlement_handler;
