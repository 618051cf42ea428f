use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 代币记录
///
/// 首次出现在交易对创建事件中时创建，元数据只拉取一次，之后不会删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
    pub total_supply: Decimal,
    /// 每个代币折合多少参考资产 (ETH per token)
    pub derived_eth: Decimal,
    pub trade_volume: Decimal,
    pub trade_volume_usd: Decimal,
    pub untracked_volume_usd: Decimal,
    pub total_liquidity: Decimal,
    pub tx_count: i64,
}

impl Token {
    pub fn new(id: String, info: TokenInfo) -> Self {
        Self {
            id,
            symbol: info.symbol,
            name: info.name,
            decimals: info.decimals,
            total_supply: info.total_supply,
            derived_eth: Decimal::ZERO,
            trade_volume: Decimal::ZERO,
            trade_volume_usd: Decimal::ZERO,
            untracked_volume_usd: Decimal::ZERO,
            total_liquidity: Decimal::ZERO,
            tx_count: 0,
        }
    }
}

/// 已经应用过覆盖规则和默认值的代币元数据
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
    pub total_supply: Decimal,
}

/// 交易对记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub token0: String,
    pub token1: String,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    /// LP 代币总量
    pub total_supply: Decimal,
    pub reserve_eth: Decimal,
    pub reserve_usd: Decimal,
    pub tracked_reserve_eth: Decimal,
    /// token0 per token1
    pub token0_price: Decimal,
    /// token1 per token0
    pub token1_price: Decimal,
    pub price_usd: Decimal,
    pub volume_token0: Decimal,
    pub volume_token1: Decimal,
    pub volume_usd: Decimal,
    pub untracked_volume_usd: Decimal,
    pub tx_count: i64,
    pub liquidity_provider_count: i64,
    pub buy_txs: i64,
    pub sell_txs: i64,
    pub buy_volume_usd: Decimal,
    pub sell_volume_usd: Decimal,
    pub initial_reserve0: Decimal,
    pub initial_reserve1: Decimal,
    pub initial_reserve: Decimal,
    pub fdv: Decimal,
    pub token_total_supply: Decimal,
    pub created_at_timestamp: i64,
    pub created_at_block_number: i64,
}

impl Pool {
    pub fn new(id: String, token0: String, token1: String, timestamp: i64, block_number: i64) -> Self {
        Self {
            id,
            token0,
            token1,
            reserve0: Decimal::ZERO,
            reserve1: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            reserve_eth: Decimal::ZERO,
            reserve_usd: Decimal::ZERO,
            tracked_reserve_eth: Decimal::ZERO,
            token0_price: Decimal::ZERO,
            token1_price: Decimal::ZERO,
            price_usd: Decimal::ZERO,
            volume_token0: Decimal::ZERO,
            volume_token1: Decimal::ZERO,
            volume_usd: Decimal::ZERO,
            untracked_volume_usd: Decimal::ZERO,
            tx_count: 0,
            liquidity_provider_count: 0,
            buy_txs: 0,
            sell_txs: 0,
            buy_volume_usd: Decimal::ZERO,
            sell_volume_usd: Decimal::ZERO,
            initial_reserve0: Decimal::ZERO,
            initial_reserve1: Decimal::ZERO,
            initial_reserve: Decimal::ZERO,
            fdv: Decimal::ZERO,
            token_total_supply: Decimal::ZERO,
            created_at_timestamp: timestamp,
            created_at_block_number: block_number,
        }
    }
}

/// 参考资产 (wrapped native) 的 USD 价格，每条链只有一条记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBundle {
    pub eth_price: Decimal,
}

/// 工厂级别的汇总数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub pair_count: i64,
    pub tx_count: i64,
    pub total_volume_usd: Decimal,
    pub total_volume_eth: Decimal,
    pub untracked_volume_usd: Decimal,
    pub total_liquidity_usd: Decimal,
    pub total_liquidity_eth: Decimal,
}

/// 某个地址在某个交易对中的流动性标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub id: String,
    pub pool: String,
    pub user: String,
}

impl LiquidityPosition {
    pub fn new(pool: &str, user: &str) -> Self {
        Self {
            id: Self::position_id(pool, user),
            pool: pool.to_string(),
            user: user.to_string(),
        }
    }

    pub fn position_id(pool: &str, user: &str) -> String {
        format!("{}-{}", pool, user)
    }
}

/// K线周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleResolution {
    OneMinute,
    FiveMinutes,
    OneHour,
    SixHours,
    OneDay,
}

impl CandleResolution {
    pub const ALL: [CandleResolution; 5] = [
        CandleResolution::OneMinute,
        CandleResolution::FiveMinutes,
        CandleResolution::OneHour,
        CandleResolution::SixHours,
        CandleResolution::OneDay,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            CandleResolution::OneMinute => 1,
            CandleResolution::FiveMinutes => 5,
            CandleResolution::OneHour => 60,
            CandleResolution::SixHours => 360,
            CandleResolution::OneDay => 1440,
        }
    }

    pub fn seconds(self) -> i64 {
        self.minutes() * 60
    }

    pub fn from_minutes(minutes: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.minutes() == minutes)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CandleResolution::OneMinute => "1m",
            CandleResolution::FiveMinutes => "5m",
            CandleResolution::OneHour => "1h",
            CandleResolution::SixHours => "6h",
            CandleResolution::OneDay => "1d",
        }
    }

    /// bucket id = floor(timestamp / resolution_seconds)
    pub fn bucket_id(self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.seconds())
    }

    pub fn bucket_start(self, bucket_id: i64) -> i64 {
        bucket_id * self.seconds()
    }
}

/// 单个交易对在单个周期、单个时间桶内的聚合数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub id: String,
    pub pool: String,
    pub resolution: CandleResolution,
    pub bucket_id: i64,
    pub start_unix: i64,
    pub token0: String,
    pub token1: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub price_usd: Decimal,
    /// 创建时交易对的 USD 价格，之后不再变化
    pub base_price_usd: Decimal,
    pub price_change: Decimal,
    pub volume_token0: Decimal,
    pub volume_token1: Decimal,
    pub volume_usd: Decimal,
    pub volume_change: Decimal,
    pub txns: i64,
    pub swap_txns: i64,
    pub buy_txs: i64,
    pub sell_txs: i64,
    pub buy_volume_usd: Decimal,
    pub sell_volume_usd: Decimal,
    pub total_supply: Decimal,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    pub reserve_usd: Decimal,
}

impl Candle {
    pub fn candle_id(pool: &str, resolution: CandleResolution, bucket_id: i64) -> String {
        format!("{}-{}-{}", pool, resolution.minutes(), bucket_id)
    }

    pub fn key(&self) -> CandleKey {
        CandleKey::new(&self.pool, self.resolution, self.bucket_id)
    }
}

/// (pool, resolution, bucket) 索引键，按字典序排列
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandleKey {
    pub pool: String,
    pub resolution: CandleResolution,
    pub bucket_id: i64,
}

impl CandleKey {
    pub fn new(pool: &str, resolution: CandleResolution, bucket_id: i64) -> Self {
        Self {
            pool: pool.to_string(),
            resolution,
            bucket_id,
        }
    }
}

pub const DAY_SECONDS: i64 = 86_400;

/// UTC 天序号 = floor(timestamp / 86400)
pub fn day_id(timestamp: i64) -> i64 {
    timestamp.div_euclid(DAY_SECONDS)
}

/// 单个代币在某一天的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDayData {
    pub id: String,
    pub token: String,
    pub day_id: i64,
    /// 当天起始时间戳
    pub date: i64,
    pub price_usd: Decimal,
    pub daily_volume_token: Decimal,
    pub daily_volume_eth: Decimal,
    pub daily_volume_usd: Decimal,
    pub daily_txns: i64,
    pub total_liquidity_token: Decimal,
    pub total_liquidity_eth: Decimal,
    pub total_liquidity_usd: Decimal,
}

impl TokenDayData {
    pub fn new(token: &str, day_id: i64) -> Self {
        Self {
            id: Self::day_data_id(token, day_id),
            token: token.to_string(),
            day_id,
            date: day_id * DAY_SECONDS,
            price_usd: Decimal::ZERO,
            daily_volume_token: Decimal::ZERO,
            daily_volume_eth: Decimal::ZERO,
            daily_volume_usd: Decimal::ZERO,
            daily_txns: 0,
            total_liquidity_token: Decimal::ZERO,
            total_liquidity_eth: Decimal::ZERO,
            total_liquidity_usd: Decimal::ZERO,
        }
    }

    pub fn day_data_id(token: &str, day_id: i64) -> String {
        format!("{}-{}", token, day_id)
    }
}

/// 工厂在某一天的汇总，累计值是当天最后一次更新时的工厂快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryDayData {
    pub day_id: i64,
    pub date: i64,
    pub daily_volume_usd: Decimal,
    pub daily_volume_eth: Decimal,
    pub daily_volume_untracked: Decimal,
    pub total_volume_usd: Decimal,
    pub total_volume_eth: Decimal,
    pub total_liquidity_usd: Decimal,
    pub total_liquidity_eth: Decimal,
    pub tx_count: i64,
}

impl FactoryDayData {
    pub fn new(day_id: i64) -> Self {
        Self {
            day_id,
            date: day_id * DAY_SECONDS,
            daily_volume_usd: Decimal::ZERO,
            daily_volume_eth: Decimal::ZERO,
            daily_volume_untracked: Decimal::ZERO,
            total_volume_usd: Decimal::ZERO,
            total_volume_eth: Decimal::ZERO,
            total_liquidity_usd: Decimal::ZERO,
            total_liquidity_eth: Decimal::ZERO,
            tx_count: 0,
        }
    }
}
