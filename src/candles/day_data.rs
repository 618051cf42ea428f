//! 日级汇总
//!
//! 代币和工厂按 UTC 天累计成交额和交易数，价格和流动性取事件处理后的最新值。

use rust_decimal::Decimal;

use super::SwapActivity;
use crate::engine::store::EntityStore;
use crate::types::{day_id, Factory, FactoryDayData, Token, TokenDayData};
use crate::utils::{safe_add, safe_mul};

pub struct DayDataAggregator;

impl DayDataAggregator {
    /// `token` 必须已经包含本次事件的更新，`swap_amount` 为该代币一侧的 in + out
    pub fn update_token_day<S: EntityStore + ?Sized>(
        store: &S,
        token: &Token,
        eth_price: Decimal,
        timestamp: i64,
        swap_amount: Option<Decimal>,
    ) -> TokenDayData {
        let day = day_id(timestamp);
        let mut day_data = store
            .load_token_day(&token.id, day)
            .unwrap_or_else(|| TokenDayData::new(&token.id, day));

        day_data.price_usd = safe_mul(token.derived_eth, eth_price);
        day_data.total_liquidity_token = token.total_liquidity;
        day_data.total_liquidity_eth = safe_mul(token.total_liquidity, token.derived_eth);
        day_data.total_liquidity_usd = safe_mul(day_data.total_liquidity_eth, eth_price);
        day_data.daily_txns += 1;

        if let Some(amount) = swap_amount {
            let amount_eth = safe_mul(amount, token.derived_eth);
            day_data.daily_volume_token = safe_add(day_data.daily_volume_token, amount);
            day_data.daily_volume_eth = safe_add(day_data.daily_volume_eth, amount_eth);
            day_data.daily_volume_usd = safe_add(day_data.daily_volume_usd, safe_mul(amount_eth, eth_price));
        }
        day_data
    }

    pub fn update_factory_day<S: EntityStore + ?Sized>(
        store: &S,
        factory: &Factory,
        timestamp: i64,
        swap: Option<&SwapActivity>,
    ) -> FactoryDayData {
        let day = day_id(timestamp);
        let mut day_data = store.load_factory_day(day).unwrap_or_else(|| FactoryDayData::new(day));

        day_data.total_volume_usd = factory.total_volume_usd;
        day_data.total_volume_eth = factory.total_volume_eth;
        day_data.total_liquidity_usd = factory.total_liquidity_usd;
        day_data.total_liquidity_eth = factory.total_liquidity_eth;
        day_data.tx_count = factory.tx_count;

        if let Some(swap) = swap {
            day_data.daily_volume_usd = safe_add(day_data.daily_volume_usd, swap.volume_usd);
            day_data.daily_volume_eth = safe_add(day_data.daily_volume_eth, swap.volume_eth);
            day_data.daily_volume_untracked = safe_add(day_data.daily_volume_untracked, swap.untracked_volume_usd);
        }
        day_data
    }
}
