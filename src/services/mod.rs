pub mod api_service;
pub mod event_service;
pub mod indexer;

pub use api_service::ApiService;
pub use event_service::EventService;
pub use indexer::{BatchSummary, Indexer, StateRepository};
