//! 事件处理
//!
//! 交易对创建和储备变化两类事件的完整处理流程。每个事件只读取 `EntityStore`，
//! 所有写入汇总到返回的 `ChangeSet` 中；失败时不返回任何写入。

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::chain::{resolve_token_info, ChainReader};
use super::error::CoreError;
use super::store::{ChangeSet, EntityStore, Layered};
use crate::candles::{CandleAggregator, DayDataAggregator, SwapActivity};
use crate::config::{PricingConfig, SeedPool};
use crate::pricing::{eth_price_in_usd, PoolPriceCalculator, ReferencePriceResolver, TrackedAmountCalculator, WhitelistMatch};
use crate::types::{
    ChainEvent, Factory, LiquidityPosition, LiquidityTransferred, Pool, PoolCreated, ReferenceBundle, ReserveChange,
    ReservesChanged, Token,
};
use crate::utils::{
    address_id, parse_address, safe_add, safe_div, safe_mul, safe_sub, AmountConverter, TradeAnalyzer, TradeType,
};

/// LP 代币固定 18 位精度
const LP_TOKEN_DECIMALS: u32 = 18;

pub struct Engine<C: ChainReader> {
    config: PricingConfig,
    chain: C,
}

impl<C: ChainReader> Engine<C> {
    pub fn new(config: PricingConfig, chain: C) -> Self {
        Self { config, chain }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn handle<S: EntityStore + ?Sized>(&self, store: &S, event: &ChainEvent) -> Result<ChangeSet, CoreError> {
        match event {
            ChainEvent::PoolCreated(event) => self.on_pool_created(store, event),
            ChainEvent::ReservesChanged(event) => self.on_reserves_changed(store, event),
            ChainEvent::LiquidityTransferred(event) => self.on_liquidity_transferred(store, event),
        }
    }

    /// 处理工厂合约的 PairCreated
    pub fn on_pool_created<S: EntityStore + ?Sized>(
        &self,
        store: &S,
        event: &PoolCreated,
    ) -> Result<ChangeSet, CoreError> {
        self.chain.set_block_context(event.block_number);
        let mut changes = ChangeSet::default();

        let mut factory = match store.load_factory() {
            Some(factory) => factory,
            None => {
                info!("🏭 首个交易对创建事件，初始化 factory 和 bundle");
                changes.upsert_bundle(ReferenceBundle::default());
                for seed in &self.config.seed_pools {
                    self.create_seed_pool(store, &mut changes, seed, event);
                }
                Factory::default()
            }
        };
        factory.pair_count += 1;
        changes.upsert_factory(factory);

        if self.config.is_skip_block(event.block_number) {
            info!("⏭️ 区块 {} 在跳过列表中，忽略交易对 {:?}", event.block_number, event.pool);
            return Ok(changes);
        }

        let pool_id = address_id(&event.pool);
        if Layered::new(store, &changes).load_pool(&pool_id).is_some() {
            debug!("交易对 {} 已存在，跳过创建", pool_id);
            return Ok(changes);
        }

        let created = {
            let view = Layered::new(store, &changes);
            self.ensure_token(&view, event.token0)
                .and_then(|token0| Ok((token0, self.ensure_token(&view, event.token1)?)))
        };
        let (token0, token1) = match created {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("⚠️ 交易对 {} 创建失败: {}", pool_id, e);
                return Ok(changes);
            }
        };

        info!(
            "🆕 新交易对 {} ({}/{}) 区块 {}",
            pool_id, token0.symbol, token1.symbol, event.block_number
        );
        changes.upsert_pool(Pool::new(
            pool_id,
            token0.id.clone(),
            token1.id.clone(),
            event.timestamp,
            event.block_number,
        ));
        changes.upsert_token(token0);
        changes.upsert_token(token1);
        Ok(changes)
    }

    /// 处理一笔交易内某个交易对的 Sync 及其配对的 Swap/Mint/Burn
    pub fn on_reserves_changed<S: EntityStore + ?Sized>(
        &self,
        store: &S,
        event: &ReservesChanged,
    ) -> Result<ChangeSet, CoreError> {
        self.chain.set_block_context(event.block_number);
        let pool_id = address_id(&event.pool);

        let mut pool = store
            .load_pool(&pool_id)
            .ok_or_else(|| CoreError::MissingPool(pool_id.clone()))?;
        let mut token0 = store
            .load_token(&pool.token0)
            .ok_or_else(|| CoreError::MissingToken(pool.token0.clone()))?;
        let mut token1 = store
            .load_token(&pool.token1)
            .ok_or_else(|| CoreError::MissingToken(pool.token1.clone()))?;
        let mut factory = store.load_factory().unwrap_or_else(|| {
            warn!("⚠️ factory 记录不存在，按零值处理");
            Factory::default()
        });

        let mut changes = ChangeSet::default();

        // LP Transfer 在 Sync 之前
        apply_lp_transfers(store, &mut changes, &mut pool, event.lp_minted, event.lp_burned, &event.liquidity_providers);

        // 先扣除旧的储备和流动性，计算完成后再加回
        factory.total_liquidity_eth = safe_sub(factory.total_liquidity_eth, pool.tracked_reserve_eth);
        token0.total_liquidity = safe_sub(token0.total_liquidity, pool.reserve0);
        token1.total_liquidity = safe_sub(token1.total_liquidity, pool.reserve1);

        pool.reserve0 = AmountConverter::convert_with_decimals(event.reserve0, token0.decimals);
        pool.reserve1 = AmountConverter::convert_with_decimals(event.reserve1, token1.decimals);
        pool.token0_price = safe_div(pool.reserve0, pool.reserve1);
        pool.token1_price = safe_div(pool.reserve1, pool.reserve0);

        let calculator = PoolPriceCalculator::new(&self.config);
        if pool.initial_reserve0.is_zero()
            && pool.initial_reserve1.is_zero()
            && !pool.reserve0.is_zero()
            && !pool.reserve1.is_zero()
        {
            pool.initial_reserve0 = pool.reserve0;
            pool.initial_reserve1 = pool.reserve1;
            pool.initial_reserve =
                calculator.initial_reserve(&pool.token0, &pool.token1, pool.initial_reserve0, pool.initial_reserve1);
        }
        changes.upsert_pool(pool.clone());

        let bundle = ReferenceBundle {
            eth_price: eth_price_in_usd(&self.config, &Layered::new(store, &changes)),
        };
        let eth_price = bundle.eth_price;
        changes.upsert_bundle(bundle);

        // 两个代币都基于更新前的对方价格计算
        {
            let resolver = ReferencePriceResolver::new(&self.config, &self.chain);
            let view = Layered::new(store, &changes);
            let derived0 = resolver.find_eth_per_token(&view, &token0);
            let derived1 = resolver.find_eth_per_token(&view, &token1);
            token0.derived_eth = derived0;
            token1.derived_eth = derived1;
        }

        let tracked = TrackedAmountCalculator::new(&self.config);
        let tracked_liquidity_usd =
            tracked.tracked_liquidity_usd(&pool.id, pool.reserve0, &token0, pool.reserve1, &token1, eth_price);
        pool.tracked_reserve_eth = safe_div(tracked_liquidity_usd, eth_price);
        pool.reserve_eth = safe_add(
            safe_mul(pool.reserve0, token0.derived_eth),
            safe_mul(pool.reserve1, token1.derived_eth),
        );
        pool.reserve_usd = safe_mul(pool.reserve_eth, eth_price);

        factory.total_liquidity_eth = safe_add(factory.total_liquidity_eth, pool.tracked_reserve_eth);
        factory.total_liquidity_usd = safe_mul(factory.total_liquidity_eth, eth_price);
        token0.total_liquidity = safe_add(token0.total_liquidity, pool.reserve0);
        token1.total_liquidity = safe_add(token1.total_liquidity, pool.reserve1);

        pool.price_usd =
            calculator.pool_price_usd(&pool.token0, &pool.token1, pool.reserve0, pool.reserve1, eth_price);
        pool.token_total_supply = calculator.priced_token_total_supply(
            &pool.token0,
            &pool.token1,
            token0.total_supply,
            token1.total_supply,
        );
        pool.fdv = calculator.fdv(pool.token_total_supply, pool.price_usd);

        let swap = match &event.change {
            ReserveChange::Sync => None,
            ReserveChange::Swap {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                ..
            } => Some(self.apply_swap(
                SwapAmounts {
                    amount0_in: *amount0_in,
                    amount1_in: *amount1_in,
                    amount0_out: *amount0_out,
                    amount1_out: *amount1_out,
                },
                &mut pool,
                &mut token0,
                &mut token1,
                &mut factory,
                eth_price,
            )),
            ReserveChange::Mint { .. } | ReserveChange::Burn { .. } => {
                token0.tx_count += 1;
                token1.tx_count += 1;
                pool.tx_count += 1;
                factory.tx_count += 1;
                None
            }
        };

        debug!(
            "🔄 {} {} 区块 {} price_usd={} reserve_usd={}",
            event.change.kind(),
            pool_id,
            event.block_number,
            pool.price_usd,
            pool.reserve_usd
        );

        // 日级汇总只统计 swap / mint / burn
        if !matches!(event.change, ReserveChange::Sync) {
            let (amount0, amount1) = match &swap {
                Some(swap) => (Some(swap.amount0), Some(swap.amount1)),
                None => (None, None),
            };
            changes.upsert_token_day(DayDataAggregator::update_token_day(
                store,
                &token0,
                eth_price,
                event.timestamp,
                amount0,
            ));
            changes.upsert_token_day(DayDataAggregator::update_token_day(
                store,
                &token1,
                eth_price,
                event.timestamp,
                amount1,
            ));
            changes.upsert_factory_day(DayDataAggregator::update_factory_day(
                store,
                &factory,
                event.timestamp,
                swap.as_ref(),
            ));
        }

        changes.upsert_pool(pool);
        changes.upsert_token(token0);
        changes.upsert_token(token1);
        changes.upsert_factory(factory);

        let candles = CandleAggregator::update(
            &Layered::new(store, &changes),
            &pool_id,
            event.timestamp,
            swap.as_ref(),
        )?;
        for candle in candles {
            changes.upsert_candle(candle);
        }

        Ok(changes)
    }

    /// 没有储备变化的 LP 转账：只更新 LP 总量和流动性地址
    pub fn on_liquidity_transferred<S: EntityStore + ?Sized>(
        &self,
        store: &S,
        event: &LiquidityTransferred,
    ) -> Result<ChangeSet, CoreError> {
        let pool_id = address_id(&event.pool);
        let mut pool = store
            .load_pool(&pool_id)
            .ok_or_else(|| CoreError::MissingPool(pool_id.clone()))?;

        let mut changes = ChangeSet::default();
        apply_lp_transfers(store, &mut changes, &mut pool, event.lp_minted, event.lp_burned, &event.liquidity_providers);
        debug!(
            "🔁 LP 转账 {} 区块 {} 流动性地址数 {}",
            pool_id, event.block_number, pool.liquidity_provider_count
        );
        changes.upsert_pool(pool);
        Ok(changes)
    }

    fn apply_swap(
        &self,
        amounts: SwapAmounts,
        pool: &mut Pool,
        token0: &mut Token,
        token1: &mut Token,
        factory: &mut Factory,
        eth_price: Decimal,
    ) -> SwapActivity {
        let amount0_in = AmountConverter::convert_with_decimals(amounts.amount0_in, token0.decimals);
        let amount1_in = AmountConverter::convert_with_decimals(amounts.amount1_in, token1.decimals);
        let amount0_out = AmountConverter::convert_with_decimals(amounts.amount0_out, token0.decimals);
        let amount1_out = AmountConverter::convert_with_decimals(amounts.amount1_out, token1.decimals);
        let amount0_total = safe_add(amount0_in, amount0_out);
        let amount1_total = safe_add(amount1_in, amount1_out);

        // 不经过白名单过滤的成交额
        let derived_eth = safe_div(
            safe_add(safe_mul(token1.derived_eth, amount1_total), safe_mul(token0.derived_eth, amount0_total)),
            Decimal::TWO,
        );
        let derived_usd = safe_mul(derived_eth, eth_price);

        let tracked_usd = TrackedAmountCalculator::new(&self.config).tracked_volume_usd(
            pool,
            amount0_total,
            token0,
            amount1_total,
            token1,
            eth_price,
        );
        let tracked_eth = safe_div(tracked_usd, eth_price);

        for (token, amount) in [(&mut *token0, amount0_total), (&mut *token1, amount1_total)] {
            token.trade_volume = safe_add(token.trade_volume, amount);
            token.trade_volume_usd = safe_add(token.trade_volume_usd, tracked_usd);
            token.untracked_volume_usd = safe_add(token.untracked_volume_usd, derived_usd);
            token.tx_count += 1;
        }

        pool.volume_usd = safe_add(pool.volume_usd, tracked_usd);
        pool.volume_token0 = safe_add(pool.volume_token0, amount0_total);
        pool.volume_token1 = safe_add(pool.volume_token1, amount1_total);
        pool.untracked_volume_usd = safe_add(pool.untracked_volume_usd, derived_usd);
        pool.tx_count += 1;

        let whitelist = WhitelistMatch::classify(&self.config, &token0.id, &token1.id);
        let trade_type = TradeAnalyzer::classify(
            whitelist.token0_whitelisted(),
            whitelist.token1_whitelisted(),
            amount0_in,
            amount1_in,
        );
        match trade_type {
            TradeType::Buy => {
                pool.buy_txs += 1;
                pool.buy_volume_usd = safe_add(pool.buy_volume_usd, tracked_usd);
            }
            TradeType::Sell => {
                pool.sell_txs += 1;
                pool.sell_volume_usd = safe_add(pool.sell_volume_usd, tracked_usd);
            }
        }

        factory.total_volume_usd = safe_add(factory.total_volume_usd, tracked_usd);
        factory.total_volume_eth = safe_add(factory.total_volume_eth, tracked_eth);
        factory.untracked_volume_usd = safe_add(factory.untracked_volume_usd, derived_usd);
        factory.tx_count += 1;

        SwapActivity {
            amount0: amount0_total,
            amount1: amount1_total,
            volume_usd: tracked_usd,
            volume_eth: tracked_eth,
            untracked_volume_usd: derived_usd,
            trade_type,
        }
    }

    /// 已有的代币直接返回，否则按元数据规则新建
    fn ensure_token<S: EntityStore + ?Sized>(&self, store: &S, address: Address) -> Result<Token, CoreError> {
        let id = address_id(&address);
        if let Some(token) = store.load_token(&id) {
            return Ok(token);
        }
        let info = resolve_token_info(&self.config, &self.chain, address)?;
        Ok(Token::new(id, info))
    }

    fn create_seed_pool<S: EntityStore + ?Sized>(
        &self,
        store: &S,
        changes: &mut ChangeSet,
        seed: &SeedPool,
        event: &PoolCreated,
    ) {
        let (Some(token0_address), Some(token1_address)) = (parse_address(&seed.token0), parse_address(&seed.token1))
        else {
            warn!("⚠️ 预置交易对 {} 的代币地址无效", seed.address);
            return;
        };

        let created = {
            let view = Layered::new(store, &*changes);
            if view.load_pool(&seed.address).is_some() {
                return;
            }
            self.ensure_token(&view, token0_address)
                .and_then(|token0| Ok((token0, self.ensure_token(&view, token1_address)?)))
        };

        match created {
            Ok((token0, token1)) => {
                info!("🌱 预置交易对 {} ({}/{})", seed.address, token0.symbol, token1.symbol);
                changes.upsert_pool(Pool::new(
                    seed.address.clone(),
                    token0.id.clone(),
                    token1.id.clone(),
                    event.timestamp,
                    event.block_number,
                ));
                changes.upsert_token(token0);
                changes.upsert_token(token1);
            }
            Err(e) => warn!("⚠️ 预置交易对 {} 创建失败: {}", seed.address, e),
        }
    }
}

/// 更新 LP 总量，并为首次出现的地址创建流动性记录（零地址和交易对自身除外）
fn apply_lp_transfers<S: EntityStore + ?Sized>(
    store: &S,
    changes: &mut ChangeSet,
    pool: &mut Pool,
    lp_minted: U256,
    lp_burned: U256,
    providers: &[Address],
) {
    pool.total_supply = safe_add(
        pool.total_supply,
        AmountConverter::convert_token_to_decimal(lp_minted, LP_TOKEN_DECIMALS),
    );
    pool.total_supply = safe_sub(
        pool.total_supply,
        AmountConverter::convert_token_to_decimal(lp_burned, LP_TOKEN_DECIMALS),
    );

    let pool_address = parse_address(&pool.id);
    for provider in providers {
        if provider.is_zero() || Some(*provider) == pool_address {
            continue;
        }
        let user = address_id(provider);
        let position_id = LiquidityPosition::position_id(&pool.id, &user);
        if changes.positions.contains_key(&position_id) || store.load_liquidity_position(&pool.id, &user).is_some() {
            continue;
        }
        changes.upsert_position(LiquidityPosition::new(&pool.id, &user));
        pool.liquidity_provider_count += 1;
    }
}

struct SwapAmounts {
    amount0_in: U256,
    amount1_in: U256,
    amount0_out: U256,
    amount1_out: U256,
}
