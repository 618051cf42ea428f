//! 多周期K线聚合
//!
//! 每个储备变化事件更新 1m / 5m / 1h / 6h / 1d 五个周期的当前时间桶。
//! 开盘价继承上一根非空K线的收盘价，涨跌幅按事件处理后的状态计算。

use rust_decimal::Decimal;

use crate::engine::error::CoreError;
use crate::engine::store::{EntityStore, PREVIOUS_CANDLE_MAX_STEPS};
use crate::types::{Candle, CandleResolution, Pool};
use crate::utils::{safe_add, safe_div, safe_mul};
use crate::utils::TradeType;

/// 一笔 swap 对K线的贡献
#[derive(Debug, Clone, PartialEq)]
pub struct SwapActivity {
    /// amount0_in + amount0_out
    pub amount0: Decimal,
    pub amount1: Decimal,
    /// 计入统计的成交额
    pub volume_usd: Decimal,
    pub volume_eth: Decimal,
    /// 不经过白名单过滤的成交额
    pub untracked_volume_usd: Decimal,
    pub trade_type: TradeType,
}

/// (current - previous) / previous × 100，previous 为0或溢出时返回0
pub fn calculate_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    match current.checked_sub(previous) {
        Some(delta) => safe_mul(safe_div(delta, previous), Decimal::ONE_HUNDRED),
        None => Decimal::ZERO,
    }
}

pub struct CandleAggregator;

impl CandleAggregator {
    /// 更新所有周期的K线，返回需要写入的K线
    ///
    /// `store` 中的交易对必须已经包含本次事件的更新。
    pub fn update<S: EntityStore + ?Sized>(
        store: &S,
        pool_id: &str,
        timestamp: i64,
        swap: Option<&SwapActivity>,
    ) -> Result<Vec<Candle>, CoreError> {
        let pool = store
            .load_pool(pool_id)
            .ok_or_else(|| CoreError::MissingPool(pool_id.to_string()))?;

        Ok(CandleResolution::ALL
            .into_iter()
            .map(|resolution| Self::update_bucket(store, &pool, resolution, timestamp, swap))
            .collect())
    }

    fn update_bucket<S: EntityStore + ?Sized>(
        store: &S,
        pool: &Pool,
        resolution: CandleResolution,
        timestamp: i64,
        swap: Option<&SwapActivity>,
    ) -> Candle {
        let bucket_id = resolution.bucket_id(timestamp);
        let previous = store.load_previous_candle(&pool.id, resolution, bucket_id, PREVIOUS_CANDLE_MAX_STEPS);

        let mut candle = match store.load_candle(&pool.id, resolution, bucket_id) {
            Some(candle) => candle,
            None => Self::open_candle(pool, resolution, bucket_id, previous.as_ref()),
        };

        candle.txns += 1;
        if let Some(swap) = swap {
            candle.volume_token0 = safe_add(candle.volume_token0, swap.amount0);
            candle.volume_token1 = safe_add(candle.volume_token1, swap.amount1);
            candle.volume_usd = safe_add(candle.volume_usd, swap.volume_usd);
            candle.swap_txns += 1;
            match swap.trade_type {
                TradeType::Buy => {
                    candle.buy_txs += 1;
                    candle.buy_volume_usd = safe_add(candle.buy_volume_usd, swap.volume_usd);
                }
                TradeType::Sell => {
                    candle.sell_txs += 1;
                    candle.sell_volume_usd = safe_add(candle.sell_volume_usd, swap.volume_usd);
                }
            }
        }

        candle.price_usd = pool.price_usd;
        candle.close = pool.price_usd;
        candle.high = candle.high.max(candle.close);
        candle.low = candle.low.min(candle.close);
        candle.total_supply = pool.total_supply;
        candle.reserve0 = pool.reserve0;
        candle.reserve1 = pool.reserve1;
        candle.reserve_usd = pool.reserve_usd;

        match previous {
            Some(previous) => {
                candle.price_change = calculate_change(candle.price_usd, previous.price_usd);
                candle.volume_change = calculate_change(candle.volume_usd, previous.volume_usd);
            }
            None => {
                candle.price_change = calculate_change(candle.price_usd, candle.base_price_usd);
                candle.volume_change = Decimal::ZERO;
            }
        }

        candle
    }

    fn open_candle(
        pool: &Pool,
        resolution: CandleResolution,
        bucket_id: i64,
        previous: Option<&Candle>,
    ) -> Candle {
        let price = pool.price_usd;
        let open = previous.map(|c| c.close).unwrap_or(price);

        Candle {
            id: Candle::candle_id(&pool.id, resolution, bucket_id),
            pool: pool.id.clone(),
            resolution,
            bucket_id,
            start_unix: resolution.bucket_start(bucket_id),
            token0: pool.token0.clone(),
            token1: pool.token1.clone(),
            open,
            high: open.max(price),
            low: open.min(price),
            close: price,
            price_usd: price,
            base_price_usd: price,
            price_change: Decimal::ZERO,
            volume_token0: Decimal::ZERO,
            volume_token1: Decimal::ZERO,
            volume_usd: Decimal::ZERO,
            volume_change: Decimal::ZERO,
            txns: 0,
            swap_txns: 0,
            buy_txs: 0,
            sell_txs: 0,
            buy_volume_usd: Decimal::ZERO,
            sell_volume_usd: Decimal::ZERO,
            total_supply: pool.total_supply,
            reserve0: pool.reserve0,
            reserve1: pool.reserve1,
            reserve_usd: pool.reserve_usd,
        }
    }
}
