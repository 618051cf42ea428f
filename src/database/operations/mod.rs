pub mod entity_operations;
pub mod event_operations;
pub mod query_operations;
pub mod snapshot_operations;
pub mod system_operations;

pub use entity_operations::*;
pub use event_operations::*;
pub use query_operations::*;
pub use snapshot_operations::*;
pub use system_operations::*;
