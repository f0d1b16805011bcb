#![allow(dead_code)]

pub mod fixtures;
pub mod in_memory_store;
pub mod utils;
