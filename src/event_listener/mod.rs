pub mod base_listener;
pub mod chain_listener;
pub mod chain_reader;
pub mod contracts;
pub mod log_batcher;

pub use base_listener::BaseEventListener;
pub use chain_listener::ChainEventListener;
pub use chain_reader::EthersChainReader;
pub use log_batcher::{decode_pair_log, group_pair_logs, order_events, PairLog, PairLogKind};
