use crate::config::{ChainConfig, Config};
use crate::database::Database;
use crate::engine::Engine;
use crate::event_listener::{ChainEventListener, EthersChainReader};
use crate::services::indexer::{Indexer, StateRepository};
use anyhow::Result;
use ethers::{providers::{Http, Provider}, types::Address};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// 批次失败后的等待时间
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

pub struct EventService {
    config: Config,
    database: Arc<Database>,
}

impl EventService {
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::connect(&config.database.url, config.database.max_connections).await?;
        database.create_tables().await?;
        info!("✅ 数据库连接成功，表结构已就绪");

        Ok(Self {
            config,
            database: Arc::new(database),
        })
    }

    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.database)
    }

    /// 每条启用的链一个索引任务，链之间互不影响
    pub async fn start(&self) -> Result<()> {
        let mut handles = Vec::new();

        for (chain_id, chain_config) in &self.config.chains {
            if !chain_config.enabled {
                info!("⏸️ 链 {} ({}) 未启用，跳过", chain_id, chain_config.name);
                continue;
            }

            let chain_config = chain_config.clone();
            let database = Arc::clone(&self.database);
            handles.push(tokio::spawn(async move {
                let chain_id = chain_config.chain_id;
                if let Err(e) = run_chain(chain_config, database).await {
                    error!("❌ 链 {} 索引任务退出: {}", chain_id, e);
                }
            }));
        }

        if handles.is_empty() {
            warn!("⚠️ 没有启用的区块链，事件服务空闲");
            return Ok(());
        }

        for handle in handles {
            handle.await?;
        }
        Ok(())
    }
}

async fn run_chain(config: ChainConfig, database: Arc<Database>) -> Result<()> {
    let provider = Arc::new(Provider::<Http>::try_from(config.rpc_url.as_str())?);
    let factory_address: Address = config.factory_address.parse()?;
    let chain_id = config.chain_id as i64;

    info!("🚀 启动链 {} ({}) 的索引服务...", config.chain_id, config.name);
    info!("📊 区块批次大小: {}", config.block_batch_size);

    let reader = EthersChainReader::new(Arc::clone(&provider), factory_address);
    let mut indexer = Indexer::new(chain_id, Engine::new(config.pricing.clone(), reader));
    indexer.hydrate(database.as_ref()).await?;

    let mut listener = ChainEventListener::new(
        Arc::clone(&provider),
        config.chain_id,
        factory_address,
        config.poll_interval,
        config.start_block,
        config.block_batch_size,
    );
    let cursor = database.load_cursor(chain_id).await?;
    listener.base_mut().resume_from(cursor);

    let latest_block = listener.base().latest_block().await?;
    let last_processed = listener.base().last_processed_block;
    if last_processed >= latest_block {
        info!("✅ 链 {}: 已处理到最新区块，等待新区块...", config.chain_id);
    } else {
        info!(
            "⏳ 链 {}: 需要处理 {} 个区块 (从 {} 到 {})",
            config.chain_id,
            latest_block - last_processed,
            last_processed + 1,
            latest_block
        );
    }

    loop {
        match poll_once(&mut listener, &mut indexer, database.as_ref()).await {
            Ok(true) => continue,
            Ok(false) => listener.base().sleep_poll_interval().await,
            Err(e) => {
                error!("❌ 链 {}: 处理批次时出错: {}", config.chain_id, e);
                sleep(RETRY_BACKOFF).await;
            }
        }
    }
}

/// 返回 true 表示还有未追上的区块
async fn poll_once<R: StateRepository + ?Sized>(
    listener: &mut ChainEventListener,
    indexer: &mut Indexer<EthersChainReader>,
    repository: &R,
) -> Result<bool> {
    let Some((from_block, to_block)) = listener.base().get_current_block_range().await? else {
        return Ok(false);
    };

    let known_pools = indexer.known_pools();
    let events = listener.fetch_events(from_block, to_block, &known_pools).await?;
    indexer.process_events(repository, &events, to_block).await?;
    listener.base_mut().last_processed_block = to_block;

    let latest_block = listener.base().latest_block().await?;
    Ok(to_block < latest_block)
}
