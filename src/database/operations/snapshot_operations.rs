use crate::database::utils::{safe_get_decimal, safe_get_i32, safe_get_i64, safe_get_string};
use crate::engine::{ChangeSet, MemoryStore};
use crate::types::*;
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tracing::{info, warn};

/// 每个 (pool, resolution) 加载的最新K线数量
pub const SNAPSHOT_CANDLES_PER_SERIES: i64 = 2;

pub fn token_from_row(row: &PgRow) -> Token {
    Token {
        id: safe_get_string(row, "id"),
        symbol: safe_get_string(row, "symbol"),
        name: safe_get_string(row, "name"),
        decimals: safe_get_i32(row, "decimals"),
        total_supply: safe_get_decimal(row, "total_supply"),
        derived_eth: safe_get_decimal(row, "derived_eth"),
        trade_volume: safe_get_decimal(row, "trade_volume"),
        trade_volume_usd: safe_get_decimal(row, "trade_volume_usd"),
        untracked_volume_usd: safe_get_decimal(row, "untracked_volume_usd"),
        total_liquidity: safe_get_decimal(row, "total_liquidity"),
        tx_count: safe_get_i64(row, "tx_count"),
    }
}

pub fn pool_from_row(row: &PgRow) -> Pool {
    Pool {
        id: safe_get_string(row, "id"),
        token0: safe_get_string(row, "token0"),
        token1: safe_get_string(row, "token1"),
        reserve0: safe_get_decimal(row, "reserve0"),
        reserve1: safe_get_decimal(row, "reserve1"),
        total_supply: safe_get_decimal(row, "total_supply"),
        reserve_eth: safe_get_decimal(row, "reserve_eth"),
        reserve_usd: safe_get_decimal(row, "reserve_usd"),
        tracked_reserve_eth: safe_get_decimal(row, "tracked_reserve_eth"),
        token0_price: safe_get_decimal(row, "token0_price"),
        token1_price: safe_get_decimal(row, "token1_price"),
        price_usd: safe_get_decimal(row, "price_usd"),
        volume_token0: safe_get_decimal(row, "volume_token0"),
        volume_token1: safe_get_decimal(row, "volume_token1"),
        volume_usd: safe_get_decimal(row, "volume_usd"),
        untracked_volume_usd: safe_get_decimal(row, "untracked_volume_usd"),
        tx_count: safe_get_i64(row, "tx_count"),
        liquidity_provider_count: safe_get_i64(row, "liquidity_provider_count"),
        buy_txs: safe_get_i64(row, "buy_txs"),
        sell_txs: safe_get_i64(row, "sell_txs"),
        buy_volume_usd: safe_get_decimal(row, "buy_volume_usd"),
        sell_volume_usd: safe_get_decimal(row, "sell_volume_usd"),
        initial_reserve0: safe_get_decimal(row, "initial_reserve0"),
        initial_reserve1: safe_get_decimal(row, "initial_reserve1"),
        initial_reserve: safe_get_decimal(row, "initial_reserve"),
        fdv: safe_get_decimal(row, "fdv"),
        token_total_supply: safe_get_decimal(row, "token_total_supply"),
        created_at_timestamp: safe_get_i64(row, "created_at_timestamp"),
        created_at_block_number: safe_get_i64(row, "created_at_block_number"),
    }
}

/// 周期不在支持列表里的行返回 None
pub fn candle_from_row(row: &PgRow) -> Option<Candle> {
    let resolution = CandleResolution::from_minutes(safe_get_i64(row, "resolution_minutes"))?;
    Some(Candle {
        id: safe_get_string(row, "id"),
        pool: safe_get_string(row, "pool_address"),
        resolution,
        bucket_id: safe_get_i64(row, "bucket_id"),
        start_unix: safe_get_i64(row, "start_unix"),
        token0: safe_get_string(row, "token0"),
        token1: safe_get_string(row, "token1"),
        open: safe_get_decimal(row, "open"),
        high: safe_get_decimal(row, "high"),
        low: safe_get_decimal(row, "low"),
        close: safe_get_decimal(row, "close"),
        price_usd: safe_get_decimal(row, "price_usd"),
        base_price_usd: safe_get_decimal(row, "base_price_usd"),
        price_change: safe_get_decimal(row, "price_change"),
        volume_token0: safe_get_decimal(row, "volume_token0"),
        volume_token1: safe_get_decimal(row, "volume_token1"),
        volume_usd: safe_get_decimal(row, "volume_usd"),
        volume_change: safe_get_decimal(row, "volume_change"),
        txns: safe_get_i64(row, "txns"),
        swap_txns: safe_get_i64(row, "swap_txns"),
        buy_txs: safe_get_i64(row, "buy_txs"),
        sell_txs: safe_get_i64(row, "sell_txs"),
        buy_volume_usd: safe_get_decimal(row, "buy_volume_usd"),
        sell_volume_usd: safe_get_decimal(row, "sell_volume_usd"),
        total_supply: safe_get_decimal(row, "total_supply"),
        reserve0: safe_get_decimal(row, "reserve0"),
        reserve1: safe_get_decimal(row, "reserve1"),
        reserve_usd: safe_get_decimal(row, "reserve_usd"),
    })
}

pub fn factory_from_row(row: &PgRow) -> Factory {
    Factory {
        pair_count: safe_get_i64(row, "pair_count"),
        tx_count: safe_get_i64(row, "tx_count"),
        total_volume_usd: safe_get_decimal(row, "total_volume_usd"),
        total_volume_eth: safe_get_decimal(row, "total_volume_eth"),
        untracked_volume_usd: safe_get_decimal(row, "untracked_volume_usd"),
        total_liquidity_usd: safe_get_decimal(row, "total_liquidity_usd"),
        total_liquidity_eth: safe_get_decimal(row, "total_liquidity_eth"),
    }
}

pub fn token_day_from_row(row: &PgRow) -> TokenDayData {
    TokenDayData {
        id: safe_get_string(row, "id"),
        token: safe_get_string(row, "token_address"),
        day_id: safe_get_i64(row, "day_id"),
        date: safe_get_i64(row, "date"),
        price_usd: safe_get_decimal(row, "price_usd"),
        daily_volume_token: safe_get_decimal(row, "daily_volume_token"),
        daily_volume_eth: safe_get_decimal(row, "daily_volume_eth"),
        daily_volume_usd: safe_get_decimal(row, "daily_volume_usd"),
        daily_txns: safe_get_i64(row, "daily_txns"),
        total_liquidity_token: safe_get_decimal(row, "total_liquidity_token"),
        total_liquidity_eth: safe_get_decimal(row, "total_liquidity_eth"),
        total_liquidity_usd: safe_get_decimal(row, "total_liquidity_usd"),
    }
}

pub fn factory_day_from_row(row: &PgRow) -> FactoryDayData {
    FactoryDayData {
        day_id: safe_get_i64(row, "day_id"),
        date: safe_get_i64(row, "date"),
        daily_volume_usd: safe_get_decimal(row, "daily_volume_usd"),
        daily_volume_eth: safe_get_decimal(row, "daily_volume_eth"),
        daily_volume_untracked: safe_get_decimal(row, "daily_volume_untracked"),
        total_volume_usd: safe_get_decimal(row, "total_volume_usd"),
        total_volume_eth: safe_get_decimal(row, "total_volume_eth"),
        total_liquidity_usd: safe_get_decimal(row, "total_liquidity_usd"),
        total_liquidity_eth: safe_get_decimal(row, "total_liquidity_eth"),
        tx_count: safe_get_i64(row, "tx_count"),
    }
}

pub struct SnapshotOperations;

impl SnapshotOperations {
    /// 加载某条链的工作集：全部代币、交易对、流动性标记，每个序列最新的两根K线，
    /// 以及每个代币和工厂最新一天的汇总
    pub async fn load_snapshot(pool: &PgPool, chain_id: i64) -> Result<MemoryStore> {
        let mut changes = ChangeSet::default();

        let rows = sqlx::query("SELECT * FROM tokens WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_all(pool)
            .await?;
        for row in &rows {
            changes.upsert_token(token_from_row(row));
        }

        let rows = sqlx::query("SELECT * FROM pools WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_all(pool)
            .await?;
        for row in &rows {
            changes.upsert_pool(pool_from_row(row));
        }

        let rows = sqlx::query(
            "SELECT pool_address, user_address FROM liquidity_positions WHERE chain_id = $1",
        )
        .bind(chain_id)
        .fetch_all(pool)
        .await?;
        for row in &rows {
            changes.upsert_position(LiquidityPosition::new(
                &safe_get_string(row, "pool_address"),
                &safe_get_string(row, "user_address"),
            ));
        }

        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT *, ROW_NUMBER() OVER (
                    PARTITION BY pool_address, resolution_minutes
                    ORDER BY bucket_id DESC
                ) AS rn
                FROM candles
                WHERE chain_id = $1
            ) latest
            WHERE rn <= $2
            "#,
        )
        .bind(chain_id)
        .bind(SNAPSHOT_CANDLES_PER_SERIES)
        .fetch_all(pool)
        .await?;
        for row in &rows {
            match candle_from_row(row) {
                Some(candle) => changes.upsert_candle(candle),
                None => warn!(
                    "⚠️ 跳过未知周期的K线: {} ({} 分钟)",
                    safe_get_string(row, "id"),
                    safe_get_i64(row, "resolution_minutes")
                ),
            }
        }

        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (token_address) *
            FROM token_day_data
            WHERE chain_id = $1
            ORDER BY token_address, day_id DESC
            "#,
        )
        .bind(chain_id)
        .fetch_all(pool)
        .await?;
        for row in &rows {
            changes.upsert_token_day(token_day_from_row(row));
        }

        let factory_day = sqlx::query(
            "SELECT * FROM factory_day_data WHERE chain_id = $1 ORDER BY day_id DESC LIMIT 1",
        )
        .bind(chain_id)
        .fetch_optional(pool)
        .await?;
        if let Some(row) = factory_day {
            changes.upsert_factory_day(factory_day_from_row(&row));
        }

        let bundle = sqlx::query("SELECT eth_price FROM bundles WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_optional(pool)
            .await?;
        if let Some(row) = bundle {
            changes.upsert_bundle(ReferenceBundle {
                eth_price: safe_get_decimal(&row, "eth_price"),
            });
        }

        let factory = sqlx::query("SELECT * FROM factories WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_optional(pool)
            .await?;
        if let Some(row) = factory {
            changes.upsert_factory(factory_from_row(&row));
        }

        let mut store = MemoryStore::new();
        store.apply(changes);

        info!(
            "📦 链 {} 工作集加载完成: {} 个交易对, {} 根K线",
            chain_id,
            store.pool_count(),
            store.candle_count()
        );
        Ok(store)
    }
}
