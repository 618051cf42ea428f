//! 基于 ethers 的 `ChainReader` 实现
//!
//! 核心逻辑是同步的，这里用 `block_in_place` 在当前 tokio 运行时上等待 RPC 结果，
//! 所以只能在多线程运行时中使用。

use crate::engine::{ChainCallError, ChainReader, TokenMetadata};
use ethers::contract::ContractError;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, BlockId, BlockNumber};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

use super::contracts::{ERC20SymbolBytes, UniswapV2Factory, ERC20};

/// 0 表示按最新区块查询
const LATEST_BLOCK: u64 = 0;

pub struct EthersChainReader {
    provider: Arc<Provider<Http>>,
    factory: UniswapV2Factory<Provider<Http>>,
    block: AtomicU64,
    handle: Handle,
}

impl EthersChainReader {
    /// 必须在 tokio 运行时内创建
    pub fn new(provider: Arc<Provider<Http>>, factory_address: Address) -> Self {
        Self {
            factory: UniswapV2Factory::new(factory_address, Arc::clone(&provider)),
            provider,
            block: AtomicU64::new(LATEST_BLOCK),
            handle: Handle::current(),
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| self.handle.block_on(future))
    }

    fn block_id(&self) -> Option<BlockId> {
        match self.block.load(Ordering::Relaxed) {
            LATEST_BLOCK => None,
            number => Some(BlockId::Number(BlockNumber::Number(number.into()))),
        }
    }

    fn string_field(&self, token: Address, field: &str) -> Option<String> {
        let contract = ERC20::new(token, Arc::clone(&self.provider));
        let mut call = match field {
            "symbol" => contract.symbol(),
            _ => contract.name(),
        };
        if let Some(block) = self.block_id() {
            call = call.block(block);
        }
        match self.block_on(call.call()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("代币 0x{:x} 的 {} 不是 string 返回值，尝试 bytes32: {}", token, field, e);
                self.bytes32_field(token, field)
            }
        }
    }

    fn bytes32_field(&self, token: Address, field: &str) -> Option<String> {
        let contract = ERC20SymbolBytes::new(token, Arc::clone(&self.provider));
        let mut call = match field {
            "symbol" => contract.symbol(),
            _ => contract.name(),
        };
        if let Some(block) = self.block_id() {
            call = call.block(block);
        }
        self.block_on(call.call()).ok().map(|raw| bytes32_to_string(&raw))
    }
}

pub fn bytes32_to_string(raw: &[u8; 32]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

fn contract_error(e: ContractError<Provider<Http>>) -> ChainCallError {
    if e.is_revert() {
        ChainCallError::Reverted(e.to_string())
    } else {
        ChainCallError::Rpc(e.to_string())
    }
}

impl ChainReader for EthersChainReader {
    fn query_pool_existence(&self, token_a: Address, token_b: Address) -> Result<Address, ChainCallError> {
        let mut call = self.factory.get_pair(token_a, token_b);
        if let Some(block) = self.block_id() {
            call = call.block(block);
        }
        self.block_on(call.call()).map_err(contract_error)
    }

    fn fetch_token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainCallError> {
        let contract = ERC20::new(token, Arc::clone(&self.provider));

        let mut decimals_call = contract.decimals();
        let mut supply_call = contract.total_supply();
        if let Some(block) = self.block_id() {
            decimals_call = decimals_call.block(block);
            supply_call = supply_call.block(block);
        }

        let decimals = match self.block_on(decimals_call.call()) {
            Ok(decimals) => Some(u32::from(decimals)),
            Err(e) if e.is_revert() => None,
            Err(e) => return Err(contract_error(e)),
        };

        Ok(TokenMetadata {
            symbol: self.string_field(token, "symbol"),
            name: self.string_field(token, "name"),
            decimals,
            total_supply: self.block_on(supply_call.call()).ok(),
        })
    }

    fn set_block_context(&self, block_number: i64) {
        self.block.store(block_number.max(0) as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes32_symbol_is_trimmed() {
        let mut raw = [0u8; 32];
        raw[..3].copy_from_slice(b"MKR");
        assert_eq!(bytes32_to_string(&raw), "MKR");
        assert_eq!(bytes32_to_string(&[0u8; 32]), "");
    }
}
