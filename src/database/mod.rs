pub mod operations;
pub mod utils;

use crate::engine::{ChangeSet, MemoryStore};
use crate::types::*;
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use operations::*;

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_tables(&self) -> Result<()> {
        SystemOperations::create_tables(&self.pool).await
    }

    pub async fn health_check(&self) -> Result<bool> {
        Ok(SystemOperations::health_check(&self.pool).await?)
    }

    pub async fn load_snapshot(&self, chain_id: i64) -> Result<MemoryStore> {
        SnapshotOperations::load_snapshot(&self.pool, chain_id).await
    }

    pub async fn initialize_cursor(&self, chain_id: i64, start_block: u64) -> Result<()> {
        EventOperations::initialize_last_processed_block(&self.pool, chain_id, start_block).await
    }

    pub async fn load_cursor(&self, chain_id: i64) -> Result<Option<u64>> {
        EventOperations::get_last_processed_block(&self.pool, chain_id).await
    }

    /// 实体写入和游标推进在同一个事务里提交
    pub async fn persist_changes(
        &self,
        chain_id: i64,
        changes: &ChangeSet,
        last_block: u64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        EntityOperations::write_changes(&mut tx, chain_id, changes).await?;
        EventOperations::update_last_processed_block(&mut tx, chain_id, last_block).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_bundle(&self, chain_id: i64) -> Result<Option<ReferenceBundle>> {
        QueryOperations::get_bundle(&self.pool, chain_id).await
    }

    pub async fn get_factory(&self, chain_id: i64) -> Result<Option<Factory>> {
        QueryOperations::get_factory(&self.pool, chain_id).await
    }

    pub async fn get_token(&self, chain_id: i64, address: &str) -> Result<Option<Token>> {
        QueryOperations::get_token(&self.pool, chain_id, address).await
    }

    pub async fn get_pool(&self, chain_id: i64, address: &str) -> Result<Option<Pool>> {
        QueryOperations::get_pool(&self.pool, chain_id, address).await
    }

    pub async fn get_candles(
        &self,
        chain_id: i64,
        address: &str,
        resolution: CandleResolution,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<Candle>> {
        QueryOperations::get_candles(&self.pool, chain_id, address, resolution, limit, before).await
    }

    pub async fn get_token_days(
        &self,
        chain_id: i64,
        address: &str,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<TokenDayData>> {
        QueryOperations::get_token_days(&self.pool, chain_id, address, limit, before).await
    }

    pub async fn get_factory_days(&self, chain_id: i64, limit: i64, before: Option<i64>) -> Result<Vec<FactoryDayData>> {
        QueryOperations::get_factory_days(&self.pool, chain_id, limit, before).await
    }

    pub async fn get_block_statuses(&self) -> Result<Vec<ChainBlockStatus>> {
        EventOperations::get_all_last_processed_blocks(&self.pool).await
    }
}
