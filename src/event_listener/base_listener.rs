use anyhow::Result;
use ethers::{providers::{Http, Middleware, Provider}, types::BlockNumber};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

/// 时间戳缓存超过该数量时清空
const TIMESTAMP_CACHE_LIMIT: usize = 10_000;

pub struct BaseEventListener {
    pub provider: Arc<Provider<Http>>,
    pub chain_id: u64,
    pub poll_interval: Duration,
    pub last_processed_block: u64,
    pub start_block: u64,
    pub block_batch_size: u64,
    block_timestamps: HashMap<u64, i64>,
}

impl BaseEventListener {
    pub fn new(
        provider: Arc<Provider<Http>>,
        chain_id: u64,
        poll_interval: u64,
        start_block: u64,
        block_batch_size: u64,
    ) -> Self {
        Self {
            provider,
            chain_id,
            poll_interval: Duration::from_secs(poll_interval),
            last_processed_block: 0,
            start_block,
            block_batch_size: block_batch_size.max(1),
            block_timestamps: HashMap::new(),
        }
    }

    /// 没有游标时从配置的起始区块前一个开始
    pub fn resume_from(&mut self, cursor: Option<u64>) {
        match cursor {
            Some(block) if block > 0 => {
                self.last_processed_block = block;
                info!(
                    "📍 链 {}: 从数据库恢复，上次处理到区块: {}",
                    self.chain_id, self.last_processed_block
                );
            }
            _ => {
                self.last_processed_block = self.start_block.saturating_sub(1);
                info!(
                    "📍 链 {}: 使用配置的起始区块: {}",
                    self.chain_id, self.start_block
                );
            }
        }
    }

    pub async fn latest_block(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    pub async fn get_current_block_range(&self) -> Result<Option<(u64, u64)>> {
        let latest_block = self.latest_block().await?;

        if latest_block <= self.last_processed_block {
            return Ok(None);
        }

        let from_block = self.last_processed_block + 1;
        let to_block = std::cmp::min(from_block + self.block_batch_size - 1, latest_block);

        Ok(Some((from_block, to_block)))
    }

    pub async fn block_timestamp(&mut self, block_number: u64) -> Result<i64> {
        if let Some(timestamp) = self.block_timestamps.get(&block_number) {
            return Ok(*timestamp);
        }

        let block = self
            .provider
            .get_block(BlockNumber::Number(block_number.into()))
            .await?
            .ok_or_else(|| anyhow::anyhow!("区块 {} 不存在", block_number))?;
        let timestamp = block.timestamp.as_u64() as i64;

        if self.block_timestamps.len() >= TIMESTAMP_CACHE_LIMIT {
            self.block_timestamps.clear();
        }
        self.block_timestamps.insert(block_number, timestamp);
        Ok(timestamp)
    }

    pub async fn sleep_poll_interval(&self) {
        sleep(self.poll_interval).await;
    }
}
