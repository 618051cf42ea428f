pub mod aggregator;
pub mod day_data;

pub use aggregator::{calculate_change, CandleAggregator, SwapActivity};
pub use day_data::DayDataAggregator;
