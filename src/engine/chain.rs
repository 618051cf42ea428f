//! 链上只读调用
//!
//! 核心逻辑只依赖 `ChainReader`，具体实现由宿主提供（ethers / 测试桩）。

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::config::PricingConfig;
use crate::types::TokenInfo;
use crate::utils::{address_id, AmountConverter};

use super::error::CoreError;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainCallError {
    #[error("RPC 调用失败: {0}")]
    Rpc(String),
    #[error("合约调用回滚: {0}")]
    Reverted(String),
}

/// ERC-20 元数据，每个字段单独可能缺失
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u32>,
    pub total_supply: Option<U256>,
}

pub trait ChainReader {
    /// 工厂合约 getPair，不存在时返回零地址
    fn query_pool_existence(&self, token_a: Address, token_b: Address) -> Result<Address, ChainCallError>;

    fn fetch_token_metadata(&self, token: Address) -> Result<TokenMetadata, ChainCallError>;

    /// 后续调用以该区块的状态为准
    fn set_block_context(&self, _block_number: i64) {}
}

/// 合并静态定义、跳过列表和链上数据得到最终的代币信息
///
/// 精度无法确定时返回 `CoreError::UnresolvedDecimals`。
pub fn resolve_token_info<C: ChainReader + ?Sized>(
    config: &PricingConfig,
    chain: &C,
    token: Address,
) -> Result<TokenInfo, CoreError> {
    let id = address_id(&token);
    let definition = config.token_definition(&id);
    let skip_supply = config.skips_total_supply(&id);

    // 静态定义完整且无需总供应量时不访问链
    let metadata = if definition.is_some() && skip_supply {
        TokenMetadata::default()
    } else {
        match chain.fetch_token_metadata(token) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("⚠️ 代币 {} 元数据获取失败: {}", id, e);
                TokenMetadata::default()
            }
        }
    };

    let decimals = if skip_supply {
        0
    } else if let Some(definition) = definition {
        definition.decimals
    } else {
        match metadata.decimals {
            Some(decimals) => decimals,
            None => return Err(CoreError::UnresolvedDecimals(id)),
        }
    };

    let total_supply = if skip_supply {
        Decimal::ZERO
    } else {
        metadata
            .total_supply
            .map(|raw| AmountConverter::convert_token_to_decimal(raw, decimals))
            .unwrap_or(Decimal::ZERO)
    };

    let symbol = match definition {
        Some(definition) => definition.symbol.clone(),
        None => metadata.symbol.filter(|s| !s.is_empty()).unwrap_or_else(|| UNKNOWN.to_string()),
    };
    let name = match definition {
        Some(definition) => definition.name.clone(),
        None => metadata.name.filter(|s| !s.is_empty()).unwrap_or_else(|| UNKNOWN.to_string()),
    };

    Ok(TokenInfo {
        symbol,
        name,
        decimals: decimals as i32,
        total_supply,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::StaticChain;
    use super::*;
    use crate::utils::parse_address;

    #[test]
    fn test_chain_metadata_with_fallbacks() {
        let token = Address::from_low_u64_be(0xabc);
        let mut chain = StaticChain::default();
        chain.metadata.insert(
            token,
            TokenMetadata {
                symbol: None,
                name: Some("Foo".into()),
                decimals: Some(6),
                total_supply: Some(U256::from(5_000_000u64)),
            },
        );

        let info = resolve_token_info(&PricingConfig::ethereum(), &chain, token).unwrap();
        assert_eq!(info.symbol, "unknown");
        assert_eq!(info.name, "Foo");
        assert_eq!(info.decimals, 6);
        assert_eq!(info.total_supply, Decimal::from(5));
    }

    #[test]
    fn test_missing_decimals_aborts() {
        let token = Address::from_low_u64_be(0xdead);
        let err = resolve_token_info(&PricingConfig::ethereum(), &StaticChain::default(), token).unwrap_err();
        assert_eq!(err, CoreError::UnresolvedDecimals(address_id(&token)));
    }

    #[test]
    fn test_static_definition_overrides_chain() {
        let dgd = parse_address("0xe0b7927c4af23765cb51314a0e0521a9645f0e2a").unwrap();
        let chain = StaticChain::default().with_token(dgd, "BROKEN", 18);
        let info = resolve_token_info(&PricingConfig::ethereum(), &chain, dgd).unwrap();
        assert_eq!(info.symbol, "DGD");
        assert_eq!(info.decimals, 9);
    }

    #[test]
    fn test_skip_total_supply_tokens() {
        let token = parse_address("0x0000000000bf2686748e1c0255036e7617e7e8a5").unwrap();
        let chain = StaticChain::default().with_token(token, "SKIP", 18);
        let info = resolve_token_info(&PricingConfig::ethereum(), &chain, token).unwrap();
        assert_eq!(info.decimals, 0);
        assert_eq!(info.total_supply, Decimal::ZERO);
        assert_eq!(info.symbol, "SKIP");
    }
}
