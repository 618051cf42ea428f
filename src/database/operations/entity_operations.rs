use crate::database::utils::upsert_sql;
use crate::engine::ChangeSet;
use crate::types::*;
use anyhow::Result;
use sqlx::{Postgres, Transaction};

pub const TOKEN_COLUMNS: [&str; 12] = [
    "chain_id",
    "id",
    "symbol",
    "name",
    "decimals",
    "total_supply",
    "derived_eth",
    "trade_volume",
    "trade_volume_usd",
    "untracked_volume_usd",
    "total_liquidity",
    "tx_count",
];

pub const POOL_COLUMNS: [&str; 30] = [
    "chain_id",
    "id",
    "token0",
    "token1",
    "reserve0",
    "reserve1",
    "total_supply",
    "reserve_eth",
    "reserve_usd",
    "tracked_reserve_eth",
    "token0_price",
    "token1_price",
    "price_usd",
    "volume_token0",
    "volume_token1",
    "volume_usd",
    "untracked_volume_usd",
    "tx_count",
    "liquidity_provider_count",
    "buy_txs",
    "sell_txs",
    "buy_volume_usd",
    "sell_volume_usd",
    "initial_reserve0",
    "initial_reserve1",
    "initial_reserve",
    "fdv",
    "token_total_supply",
    "created_at_timestamp",
    "created_at_block_number",
];

pub const CANDLE_COLUMNS: [&str; 29] = [
    "chain_id",
    "id",
    "pool_address",
    "resolution_minutes",
    "bucket_id",
    "start_unix",
    "token0",
    "token1",
    "open",
    "high",
    "low",
    "close",
    "price_usd",
    "base_price_usd",
    "price_change",
    "volume_token0",
    "volume_token1",
    "volume_usd",
    "volume_change",
    "txns",
    "swap_txns",
    "buy_txs",
    "sell_txs",
    "buy_volume_usd",
    "sell_volume_usd",
    "total_supply",
    "reserve0",
    "reserve1",
    "reserve_usd",
];

pub const FACTORY_COLUMNS: [&str; 8] = [
    "chain_id",
    "pair_count",
    "tx_count",
    "total_volume_usd",
    "total_volume_eth",
    "untracked_volume_usd",
    "total_liquidity_usd",
    "total_liquidity_eth",
];

pub const TOKEN_DAY_COLUMNS: [&str; 13] = [
    "chain_id",
    "id",
    "token_address",
    "day_id",
    "date",
    "price_usd",
    "daily_volume_token",
    "daily_volume_eth",
    "daily_volume_usd",
    "daily_txns",
    "total_liquidity_token",
    "total_liquidity_eth",
    "total_liquidity_usd",
];

pub const FACTORY_DAY_COLUMNS: [&str; 11] = [
    "chain_id",
    "day_id",
    "date",
    "daily_volume_usd",
    "daily_volume_eth",
    "daily_volume_untracked",
    "total_volume_usd",
    "total_volume_eth",
    "total_liquidity_usd",
    "total_liquidity_eth",
    "tx_count",
];

pub struct EntityOperations;

impl EntityOperations {
    /// 写入一批变更，调用方负责提交事务
    pub async fn write_changes(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        changes: &ChangeSet,
    ) -> Result<()> {
        for token in changes.tokens.values() {
            Self::upsert_token(tx, chain_id, token).await?;
        }
        for pool in changes.pools.values() {
            Self::upsert_pool(tx, chain_id, pool).await?;
        }
        for candle in changes.candles.values() {
            Self::upsert_candle(tx, chain_id, candle).await?;
        }
        for position in changes.positions.values() {
            Self::insert_position(tx, chain_id, position).await?;
        }
        for day in changes.token_days.values() {
            Self::upsert_token_day(tx, chain_id, day).await?;
        }
        for day in changes.factory_days.values() {
            Self::upsert_factory_day(tx, chain_id, day).await?;
        }
        if let Some(bundle) = &changes.bundle {
            Self::upsert_bundle(tx, chain_id, bundle).await?;
        }
        if let Some(factory) = &changes.factory {
            Self::upsert_factory(tx, chain_id, factory).await?;
        }
        Ok(())
    }

    pub async fn upsert_token(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        token: &Token,
    ) -> Result<()> {
        let sql = upsert_sql("tokens", &TOKEN_COLUMNS, &["chain_id", "id"]);
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(&token.id)
            .bind(&token.symbol)
            .bind(&token.name)
            .bind(token.decimals)
            .bind(token.total_supply)
            .bind(token.derived_eth)
            .bind(token.trade_volume)
            .bind(token.trade_volume_usd)
            .bind(token.untracked_volume_usd)
            .bind(token.total_liquidity)
            .bind(token.tx_count)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn upsert_pool(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        pool: &Pool,
    ) -> Result<()> {
        let sql = upsert_sql("pools", &POOL_COLUMNS, &["chain_id", "id"]);
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(&pool.id)
            .bind(&pool.token0)
            .bind(&pool.token1)
            .bind(pool.reserve0)
            .bind(pool.reserve1)
            .bind(pool.total_supply)
            .bind(pool.reserve_eth)
            .bind(pool.reserve_usd)
            .bind(pool.tracked_reserve_eth)
            .bind(pool.token0_price)
            .bind(pool.token1_price)
            .bind(pool.price_usd)
            .bind(pool.volume_token0)
            .bind(pool.volume_token1)
            .bind(pool.volume_usd)
            .bind(pool.untracked_volume_usd)
            .bind(pool.tx_count)
            .bind(pool.liquidity_provider_count)
            .bind(pool.buy_txs)
            .bind(pool.sell_txs)
            .bind(pool.buy_volume_usd)
            .bind(pool.sell_volume_usd)
            .bind(pool.initial_reserve0)
            .bind(pool.initial_reserve1)
            .bind(pool.initial_reserve)
            .bind(pool.fdv)
            .bind(pool.token_total_supply)
            .bind(pool.created_at_timestamp)
            .bind(pool.created_at_block_number)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn upsert_candle(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        candle: &Candle,
    ) -> Result<()> {
        let sql = upsert_sql(
            "candles",
            &CANDLE_COLUMNS,
            &["chain_id", "pool_address", "resolution_minutes", "bucket_id"],
        );
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(&candle.id)
            .bind(&candle.pool)
            .bind(candle.resolution.minutes())
            .bind(candle.bucket_id)
            .bind(candle.start_unix)
            .bind(&candle.token0)
            .bind(&candle.token1)
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.price_usd)
            .bind(candle.base_price_usd)
            .bind(candle.price_change)
            .bind(candle.volume_token0)
            .bind(candle.volume_token1)
            .bind(candle.volume_usd)
            .bind(candle.volume_change)
            .bind(candle.txns)
            .bind(candle.swap_txns)
            .bind(candle.buy_txs)
            .bind(candle.sell_txs)
            .bind(candle.buy_volume_usd)
            .bind(candle.sell_volume_usd)
            .bind(candle.total_supply)
            .bind(candle.reserve0)
            .bind(candle.reserve1)
            .bind(candle.reserve_usd)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn insert_position(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        position: &LiquidityPosition,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO liquidity_positions (chain_id, id, pool_address, user_address)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (chain_id, id) DO NOTHING
            "#,
        )
        .bind(chain_id)
        .bind(&position.id)
        .bind(&position.pool)
        .bind(&position.user)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_token_day(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        day: &TokenDayData,
    ) -> Result<()> {
        let sql = upsert_sql("token_day_data", &TOKEN_DAY_COLUMNS, &["chain_id", "token_address", "day_id"]);
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(&day.id)
            .bind(&day.token)
            .bind(day.day_id)
            .bind(day.date)
            .bind(day.price_usd)
            .bind(day.daily_volume_token)
            .bind(day.daily_volume_eth)
            .bind(day.daily_volume_usd)
            .bind(day.daily_txns)
            .bind(day.total_liquidity_token)
            .bind(day.total_liquidity_eth)
            .bind(day.total_liquidity_usd)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn upsert_factory_day(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        day: &FactoryDayData,
    ) -> Result<()> {
        let sql = upsert_sql("factory_day_data", &FACTORY_DAY_COLUMNS, &["chain_id", "day_id"]);
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(day.day_id)
            .bind(day.date)
            .bind(day.daily_volume_usd)
            .bind(day.daily_volume_eth)
            .bind(day.daily_volume_untracked)
            .bind(day.total_volume_usd)
            .bind(day.total_volume_eth)
            .bind(day.total_liquidity_usd)
            .bind(day.total_liquidity_eth)
            .bind(day.tx_count)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn upsert_bundle(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        bundle: &ReferenceBundle,
    ) -> Result<()> {
        let sql = upsert_sql("bundles", &["chain_id", "eth_price"], &["chain_id"]);
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(bundle.eth_price)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn upsert_factory(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        factory: &Factory,
    ) -> Result<()> {
        let sql = upsert_sql("factories", &FACTORY_COLUMNS, &["chain_id"]);
        sqlx::query(&sql)
            .bind(chain_id)
            .bind(factory.pair_count)
            .bind(factory.tx_count)
            .bind(factory.total_volume_usd)
            .bind(factory.total_volume_eth)
            .bind(factory.untracked_volume_usd)
            .bind(factory.total_liquidity_usd)
            .bind(factory.total_liquidity_eth)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
