//! 同步的核心处理引擎
//!
//! 不做任何 I/O：读取通过 `EntityStore` / `ChainReader`，写入以 `ChangeSet` 返回。

pub mod chain;
pub mod error;
pub mod handlers;
pub mod store;

pub use chain::{ChainCallError, ChainReader, TokenMetadata};
pub use error::CoreError;
pub use handlers::Engine;
pub use store::{ChangeSet, EntityStore, Layered, MemoryStore, PREVIOUS_CANDLE_MAX_STEPS};
