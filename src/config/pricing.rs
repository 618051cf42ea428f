//! 每条链的定价参数
//!
//! 内置 ethereum / arbitrum / bsc / polygon 四套预设，可以用 TOML 文件覆盖。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 稳定币 / 原生资产交易对，用于计算参考资产的 USD 价格
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StablecoinPool {
    pub address: String,
    /// 原生资产是否是该交易对的 token0
    pub native_is_token0: bool,
}

/// 链上元数据不可靠时使用的静态定义
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenDefinition {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
}

/// 首次创建交易对时预先写入的参考交易对
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeedPool {
    pub address: String,
    pub token0: String,
    pub token1: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PricingConfig {
    /// wrapped native 资产地址 (WETH / WBNB / WMATIC)
    pub wrapped_native: String,
    /// 有序白名单，引用价格解析按此顺序查找
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub stablecoin_pools: Vec<StablecoinPool>,
    /// 以参考资产计的最小流动性
    pub minimum_liquidity_threshold_eth: Decimal,
    /// LP 少于 5 个时，计入统计所需的最小 USD 流动性
    pub minimum_usd_threshold_new_pairs: Decimal,
    #[serde(default)]
    pub skip_blocks: Vec<i64>,
    #[serde(default)]
    pub untracked_pairs: Vec<String>,
    #[serde(default)]
    pub skip_total_supply: Vec<String>,
    #[serde(default)]
    pub token_definitions: Vec<TokenDefinition>,
    #[serde(default)]
    pub seed_pools: Vec<SeedPool>,
}

impl PricingConfig {
    /// 根据链前缀选择内置预设
    pub fn preset(prefix: &str) -> Option<Self> {
        match prefix.to_uppercase().as_str() {
            "ETH" => Some(Self::ethereum()),
            "ARB" => Some(Self::arbitrum()),
            "BSC" => Some(Self::bsc()),
            "POLYGON" => Some(Self::polygon()),
            _ => None,
        }
    }

    /// 从 TOML 文件中读取 `[<prefix 小写>]` 表，不存在时返回 None
    pub fn from_file(path: &str, prefix: &str) -> anyhow::Result<Option<Self>> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .build()
            .map_err(|e| anyhow::anyhow!("读取定价配置 {} 失败: {}", path, e))?;

        match settings.get::<PricingConfig>(&prefix.to_lowercase()) {
            Ok(pricing) => Ok(Some(pricing.normalized())),
            Err(::config::ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("定价配置 [{}] 解析失败: {}", prefix.to_lowercase(), e)),
        }
    }

    /// 所有地址统一为小写
    pub fn normalized(mut self) -> Self {
        fn lower(values: &mut [String]) {
            for value in values.iter_mut() {
                *value = value.to_lowercase();
            }
        }

        self.wrapped_native = self.wrapped_native.to_lowercase();
        lower(&mut self.whitelist);
        lower(&mut self.untracked_pairs);
        lower(&mut self.skip_total_supply);
        for pool in &mut self.stablecoin_pools {
            pool.address = pool.address.to_lowercase();
        }
        for definition in &mut self.token_definitions {
            definition.address = definition.address.to_lowercase();
        }
        for seed in &mut self.seed_pools {
            seed.address = seed.address.to_lowercase();
            seed.token0 = seed.token0.to_lowercase();
            seed.token1 = seed.token1.to_lowercase();
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let all_addresses = std::iter::once(&self.wrapped_native)
            .chain(self.whitelist.iter())
            .chain(self.untracked_pairs.iter())
            .chain(self.skip_total_supply.iter())
            .chain(self.stablecoin_pools.iter().map(|p| &p.address))
            .chain(self.token_definitions.iter().map(|d| &d.address))
            .chain(
                self.seed_pools
                    .iter()
                    .flat_map(|s| [&s.address, &s.token0, &s.token1]),
            );

        for address in all_addresses {
            if crate::utils::parse_address(address).is_none() {
                return Err(anyhow::anyhow!("定价配置中存在无效地址: {}", address));
            }
        }

        if self.minimum_liquidity_threshold_eth < Decimal::ZERO
            || self.minimum_usd_threshold_new_pairs < Decimal::ZERO
        {
            return Err(anyhow::anyhow!("定价阈值不能为负数"));
        }

        Ok(())
    }

    pub fn is_whitelisted(&self, token: &str) -> bool {
        self.whitelist.iter().any(|w| w == token)
    }

    pub fn is_wrapped_native(&self, token: &str) -> bool {
        self.wrapped_native == token
    }

    pub fn is_untracked_pair(&self, pool: &str) -> bool {
        self.untracked_pairs.iter().any(|p| p == pool)
    }

    pub fn skips_total_supply(&self, token: &str) -> bool {
        self.skip_total_supply.iter().any(|t| t == token)
    }

    pub fn is_skip_block(&self, block_number: i64) -> bool {
        self.skip_blocks.contains(&block_number)
    }

    pub fn token_definition(&self, token: &str) -> Option<&TokenDefinition> {
        self.token_definitions.iter().find(|d| d.address == token)
    }

    pub fn ethereum() -> Self {
        let weth = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
        let dai = "0x6b175474e89094c44da98b954eedeac495271d0f";
        let usdc = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
        let usdt = "0xdac17f958d2ee523a2206206994597c13d831ec7";

        Self {
            wrapped_native: weth.to_string(),
            whitelist: vec![weth.into(), dai.into(), usdc.into(), usdt.into()],
            stablecoin_pools: vec![
                stable("0xa478c2975ab1ea89e8196811f51a7b7ade33eb11", false),
                stable("0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc", false),
                stable("0x0d4a11d5eeaac28ec3f61d100daf4d40471f1852", true),
            ],
            minimum_liquidity_threshold_eth: Decimal::from(2),
            minimum_usd_threshold_new_pairs: Decimal::from(400_000),
            skip_blocks: vec![17_308_596, 18_746_374],
            untracked_pairs: vec!["0x9ea3b5b4ec044b70375236a281986106457b20ef".into()],
            skip_total_supply: vec![
                "0x0000000000bf2686748e1c0255036e7617e7e8a5".into(),
                "0x000000000000b91b6956fead1dda24c66aa6b972".into(),
            ],
            token_definitions: vec![
                TokenDefinition {
                    address: "0xe0b7927c4af23765cb51314a0e0521a9645f0e2a".into(),
                    symbol: "DGD".into(),
                    name: "DGD".into(),
                    decimals: 9,
                },
                TokenDefinition {
                    address: "0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9".into(),
                    symbol: "AAVE".into(),
                    name: "Aave Token".into(),
                    decimals: 18,
                },
            ],
            seed_pools: vec![
                seed("0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc", usdc, weth),
                seed("0xa478c2975ab1ea89e8196811f51a7b7ade33eb11", dai, weth),
                seed("0x0d4a11d5eeaac28ec3f61d100daf4d40471f1852", weth, usdt),
            ],
        }
    }

    pub fn arbitrum() -> Self {
        let weth = "0x82af49447d8a07e3bd95bd0d56f35241523fbab1";
        Self {
            wrapped_native: weth.to_string(),
            whitelist: vec![
                weth.into(),
                "0xff970a61a04b1ca14834a43f5de4533ebddb5cc8".into(), // USDC
                "0xfd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9".into(), // USDT
                "0xda10009cbd5d07dd0cecc66161fc93d7c9000da1".into(), // DAI
            ],
            stablecoin_pools: vec![
                stable("0xf64dfe17c8b87f012fcf50fbda1d62bfa148366a", false),
                stable("0xd04bc65744306a5c149414dd3cd5c984d9d3470d", false),
            ],
            minimum_liquidity_threshold_eth: Decimal::from(2),
            minimum_usd_threshold_new_pairs: Decimal::from(400_000),
            skip_blocks: vec![],
            untracked_pairs: vec![],
            skip_total_supply: vec![],
            token_definitions: vec![],
            seed_pools: vec![],
        }
    }

    pub fn bsc() -> Self {
        let wbnb = "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c";
        Self {
            wrapped_native: wbnb.to_string(),
            whitelist: vec![
                wbnb.into(),
                "0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d".into(), // USDC
                "0xe9e7cea3dedca5984780bafc599bd69add087d56".into(), // BUSD
                "0x55d398326f99059ff775485246999027b3197955".into(), // USDT
            ],
            stablecoin_pools: vec![
                stable("0x57c68f0e9e6be81fb4d9a46e1910c5daa9c4cfeb", false),
                stable("0x8a1ed8e124fdfbd534bf48baf732e26db9cc0cf4", true),
            ],
            minimum_liquidity_threshold_eth: Decimal::from(2),
            minimum_usd_threshold_new_pairs: Decimal::from(4_000),
            skip_blocks: vec![],
            untracked_pairs: vec![],
            skip_total_supply: vec![],
            token_definitions: vec![],
            seed_pools: vec![],
        }
    }

    pub fn polygon() -> Self {
        let wmatic = "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270";
        Self {
            wrapped_native: wmatic.to_string(),
            whitelist: vec![
                wmatic.into(),
                "0x2791bca1f2de4661ed88a30c99a7a9449aa84174".into(), // USDC
                "0xc2132d05d31c914a87c6611c10748aeb04b58e8f".into(), // USDT
                "0x8f3cf7ad23cd3cadbd9735aff958023239c6a063".into(), // DAI
            ],
            stablecoin_pools: vec![stable("0x1f0c5400a3c7e357cc7c9a3d2f7fe6ddf629d868", true)],
            minimum_liquidity_threshold_eth: Decimal::from(2),
            minimum_usd_threshold_new_pairs: Decimal::from(4_000),
            skip_blocks: vec![],
            untracked_pairs: vec![],
            skip_total_supply: vec![],
            token_definitions: vec![],
            seed_pools: vec![],
        }
    }
}

fn stable(address: &str, native_is_token0: bool) -> StablecoinPool {
    StablecoinPool {
        address: address.to_string(),
        native_is_token0,
    }
}

fn seed(address: &str, token0: &str, token1: &str) -> SeedPool {
    SeedPool {
        address: address.to_string(),
        token0: token0.to_string(),
        token1: token1.to_string(),
    }
}
