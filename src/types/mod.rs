pub mod models;
pub mod events;
pub mod api_types;

pub use models::*;
pub use events::*;
pub use api_types::*;
