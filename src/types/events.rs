use ethers::types::{Address, H256, U256};

/// 工厂合约的 PairCreated 事件
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCreated {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    pub block_number: i64,
    pub timestamp: i64,
    pub log_index: i64,
}

/// 引起储备变化的具体操作，原始数值尚未按精度换算
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveChange {
    /// 只有 Sync，没有配对的 Swap/Mint/Burn
    Sync,
    Swap {
        sender: Address,
        to: Address,
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
    },
    Mint {
        sender: Address,
        amount0: U256,
        amount1: U256,
    },
    Burn {
        sender: Address,
        to: Address,
        amount0: U256,
        amount1: U256,
    },
}

impl ReserveChange {
    pub fn kind(&self) -> &'static str {
        match self {
            ReserveChange::Sync => "sync",
            ReserveChange::Swap { .. } => "swap",
            ReserveChange::Mint { .. } => "mint",
            ReserveChange::Burn { .. } => "burn",
        }
    }
}

/// 单笔交易内某个交易对的储备更新
///
/// `reserve0/reserve1` 是 Sync 之后的最新储备，`lp_minted/lp_burned` 来自同一笔交易里的 LP Transfer。
#[derive(Debug, Clone, PartialEq)]
pub struct ReservesChanged {
    pub pool: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub change: ReserveChange,
    pub lp_minted: U256,
    pub lp_burned: U256,
    pub liquidity_providers: Vec<Address>,
    pub block_number: i64,
    pub timestamp: i64,
    pub transaction_hash: H256,
    pub log_index: i64,
}

/// 同一笔交易里没有跟随 Sync 的 LP 转账
///
/// 只影响 LP 总量和流动性地址记录，储备和价格不变。
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityTransferred {
    pub pool: Address,
    pub lp_minted: U256,
    pub lp_burned: U256,
    pub liquidity_providers: Vec<Address>,
    pub block_number: i64,
    pub timestamp: i64,
    pub transaction_hash: H256,
    /// 第一条转账日志的序号
    pub log_index: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    PoolCreated(PoolCreated),
    ReservesChanged(ReservesChanged),
    LiquidityTransferred(LiquidityTransferred),
}

impl ChainEvent {
    pub fn block_number(&self) -> i64 {
        match self {
            ChainEvent::PoolCreated(e) => e.block_number,
            ChainEvent::ReservesChanged(e) => e.block_number,
            ChainEvent::LiquidityTransferred(e) => e.block_number,
        }
    }

    pub fn log_index(&self) -> i64 {
        match self {
            ChainEvent::PoolCreated(e) => e.log_index,
            ChainEvent::ReservesChanged(e) => e.log_index,
            ChainEvent::LiquidityTransferred(e) => e.log_index,
        }
    }

    pub fn pool(&self) -> Address {
        match self {
            ChainEvent::PoolCreated(e) => e.pool,
            ChainEvent::ReservesChanged(e) => e.pool,
            ChainEvent::LiquidityTransferred(e) => e.pool,
        }
    }
}
