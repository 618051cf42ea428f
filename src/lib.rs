pub mod api;
pub mod candles;
pub mod config;
pub mod database;
pub mod engine;
pub mod event_listener;
pub mod pricing;
pub mod services;
pub mod types;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use types::*;
