//! 实体存储
//!
//! `EntityStore` 是核心逻辑读取实体的唯一入口。事件处理把所有写入收集到 `ChangeSet`，
//! 由宿主统一落库；同一事件内的读取通过 `Layered` 看到尚未落库的写入。

use std::collections::BTreeMap;

use crate::types::{
    Candle, CandleKey, CandleResolution, Factory, FactoryDayData, LiquidityPosition, Pool, ReferenceBundle, Token,
    TokenDayData,
};

/// 最多向前回溯多少个周期寻找上一根非空K线
pub const PREVIOUS_CANDLE_MAX_STEPS: i64 = 1000;

pub trait EntityStore {
    fn load_pool(&self, id: &str) -> Option<Pool>;

    fn load_token(&self, id: &str) -> Option<Token>;

    fn load_candle(&self, pool: &str, resolution: CandleResolution, bucket_id: i64) -> Option<Candle>;

    fn load_bundle(&self) -> Option<ReferenceBundle>;

    fn load_factory(&self) -> Option<Factory>;

    fn load_liquidity_position(&self, pool: &str, user: &str) -> Option<LiquidityPosition>;

    fn load_token_day(&self, token: &str, day_id: i64) -> Option<TokenDayData>;

    fn load_factory_day(&self, day_id: i64) -> Option<FactoryDayData>;

    /// 严格早于 `bucket_id` 的最近一根K线，最多回溯 `max_steps` 个周期
    fn load_previous_candle(
        &self,
        pool: &str,
        resolution: CandleResolution,
        bucket_id: i64,
        max_steps: i64,
    ) -> Option<Candle> {
        (1..=max_steps).find_map(|step| self.load_candle(pool, resolution, bucket_id - step))
    }
}

/// 单个事件（或一批事件）产生的全部写入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub pools: BTreeMap<String, Pool>,
    pub tokens: BTreeMap<String, Token>,
    pub candles: BTreeMap<CandleKey, Candle>,
    pub positions: BTreeMap<String, LiquidityPosition>,
    pub token_days: BTreeMap<(String, i64), TokenDayData>,
    pub factory_days: BTreeMap<i64, FactoryDayData>,
    pub bundle: Option<ReferenceBundle>,
    pub factory: Option<Factory>,
}

impl ChangeSet {
    pub fn upsert_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.id.clone(), pool);
    }

    pub fn upsert_token(&mut self, token: Token) {
        self.tokens.insert(token.id.clone(), token);
    }

    pub fn upsert_candle(&mut self, candle: Candle) {
        self.candles.insert(candle.key(), candle);
    }

    pub fn upsert_position(&mut self, position: LiquidityPosition) {
        self.positions.insert(position.id.clone(), position);
    }

    pub fn upsert_token_day(&mut self, day: TokenDayData) {
        self.token_days.insert((day.token.clone(), day.day_id), day);
    }

    pub fn upsert_factory_day(&mut self, day: FactoryDayData) {
        self.factory_days.insert(day.day_id, day);
    }

    pub fn upsert_bundle(&mut self, bundle: ReferenceBundle) {
        self.bundle = Some(bundle);
    }

    pub fn upsert_factory(&mut self, factory: Factory) {
        self.factory = Some(factory);
    }

    /// 后写入的覆盖先写入的
    pub fn merge(&mut self, other: ChangeSet) {
        self.pools.extend(other.pools);
        self.tokens.extend(other.tokens);
        self.candles.extend(other.candles);
        self.positions.extend(other.positions);
        self.token_days.extend(other.token_days);
        self.factory_days.extend(other.factory_days);
        if other.bundle.is_some() {
            self.bundle = other.bundle;
        }
        if other.factory.is_some() {
            self.factory = other.factory;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
            && self.tokens.is_empty()
            && self.candles.is_empty()
            && self.positions.is_empty()
            && self.token_days.is_empty()
            && self.factory_days.is_empty()
            && self.bundle.is_none()
            && self.factory.is_none()
    }

    pub fn record_count(&self) -> usize {
        self.pools.len()
            + self.tokens.len()
            + self.candles.len()
            + self.positions.len()
            + self.token_days.len()
            + self.factory_days.len()
            + usize::from(self.bundle.is_some())
            + usize::from(self.factory.is_some())
    }
}

fn latest_before(
    candles: &BTreeMap<CandleKey, Candle>,
    pool: &str,
    resolution: CandleResolution,
    bucket_id: i64,
    max_steps: i64,
) -> Option<Candle> {
    let from = CandleKey::new(pool, resolution, bucket_id - max_steps);
    let to = CandleKey::new(pool, resolution, bucket_id);
    candles.range(from..to).next_back().map(|(_, candle)| candle.clone())
}

/// 在基础存储之上叠加未落库的变更
pub struct Layered<'a, S: EntityStore + ?Sized> {
    base: &'a S,
    changes: &'a ChangeSet,
}

impl<'a, S: EntityStore + ?Sized> Layered<'a, S> {
    pub fn new(base: &'a S, changes: &'a ChangeSet) -> Self {
        Self { base, changes }
    }
}

impl<'a, S: EntityStore + ?Sized> EntityStore for Layered<'a, S> {
    fn load_pool(&self, id: &str) -> Option<Pool> {
        self.changes.pools.get(id).cloned().or_else(|| self.base.load_pool(id))
    }

    fn load_token(&self, id: &str) -> Option<Token> {
        self.changes.tokens.get(id).cloned().or_else(|| self.base.load_token(id))
    }

    fn load_candle(&self, pool: &str, resolution: CandleResolution, bucket_id: i64) -> Option<Candle> {
        self.changes
            .candles
            .get(&CandleKey::new(pool, resolution, bucket_id))
            .cloned()
            .or_else(|| self.base.load_candle(pool, resolution, bucket_id))
    }

    fn load_bundle(&self) -> Option<ReferenceBundle> {
        self.changes.bundle.clone().or_else(|| self.base.load_bundle())
    }

    fn load_factory(&self) -> Option<Factory> {
        self.changes.factory.clone().or_else(|| self.base.load_factory())
    }

    fn load_liquidity_position(&self, pool: &str, user: &str) -> Option<LiquidityPosition> {
        self.changes
            .positions
            .get(&LiquidityPosition::position_id(pool, user))
            .cloned()
            .or_else(|| self.base.load_liquidity_position(pool, user))
    }

    fn load_token_day(&self, token: &str, day_id: i64) -> Option<TokenDayData> {
        self.changes
            .token_days
            .get(&(token.to_string(), day_id))
            .cloned()
            .or_else(|| self.base.load_token_day(token, day_id))
    }

    fn load_factory_day(&self, day_id: i64) -> Option<FactoryDayData> {
        self.changes
            .factory_days
            .get(&day_id)
            .cloned()
            .or_else(|| self.base.load_factory_day(day_id))
    }

    fn load_previous_candle(
        &self,
        pool: &str,
        resolution: CandleResolution,
        bucket_id: i64,
        max_steps: i64,
    ) -> Option<Candle> {
        let pending = latest_before(&self.changes.candles, pool, resolution, bucket_id, max_steps);
        let stored = self.base.load_previous_candle(pool, resolution, bucket_id, max_steps);
        match (pending, stored) {
            (Some(p), Some(s)) if s.bucket_id > p.bucket_id => Some(s),
            (Some(p), _) => Some(p),
            (None, s) => s,
        }
    }
}

/// 进程内工作集，启动时从数据库加载
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pools: BTreeMap<String, Pool>,
    tokens: BTreeMap<String, Token>,
    candles: BTreeMap<CandleKey, Candle>,
    positions: BTreeMap<String, LiquidityPosition>,
    token_days: BTreeMap<(String, i64), TokenDayData>,
    factory_days: BTreeMap<i64, FactoryDayData>,
    bundle: Option<ReferenceBundle>,
    factory: Option<Factory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, changes: ChangeSet) {
        self.pools.extend(changes.pools);
        self.tokens.extend(changes.tokens);
        self.candles.extend(changes.candles);
        self.positions.extend(changes.positions);
        self.token_days.extend(changes.token_days);
        self.factory_days.extend(changes.factory_days);
        if let Some(bundle) = changes.bundle {
            self.bundle = Some(bundle);
        }
        if let Some(factory) = changes.factory {
            self.factory = Some(factory);
        }
    }

    pub fn contains_pool(&self, id: &str) -> bool {
        self.pools.contains_key(id)
    }

    pub fn pool_ids(&self) -> impl Iterator<Item = &String> {
        self.pools.keys()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn candle_count(&self) -> usize {
        self.candles.len()
    }

    /// 每个 (pool, resolution) 只保留最新的 `keep` 根K线
    ///
    /// 新事件只会落在最新的时间桶或其后，所以最新两根足以支撑开盘价和涨跌幅计算。
    pub fn retain_latest_candles(&mut self, keep: usize) {
        let mut seen: BTreeMap<(String, CandleResolution), usize> = BTreeMap::new();
        let mut stale = Vec::new();
        for key in self.candles.keys().rev() {
            let count = seen.entry((key.pool.clone(), key.resolution)).or_insert(0);
            *count += 1;
            if *count > keep {
                stale.push(key.clone());
            }
        }
        for key in stale {
            self.candles.remove(&key);
        }
    }

    pub fn day_data_count(&self) -> usize {
        self.token_days.len() + self.factory_days.len()
    }

    /// 每个代币和工厂只保留最新一天的汇总
    pub fn retain_latest_days(&mut self) {
        let mut latest: BTreeMap<String, i64> = BTreeMap::new();
        for (token, day) in self.token_days.keys() {
            let entry = latest.entry(token.clone()).or_insert(*day);
            *entry = (*entry).max(*day);
        }
        self.token_days.retain(|(token, day), _| latest.get(token) == Some(day));

        if let Some(&newest) = self.factory_days.keys().next_back() {
            self.factory_days.retain(|day, _| *day == newest);
        }
    }
}

impl EntityStore for MemoryStore {
    fn load_pool(&self, id: &str) -> Option<Pool> {
        self.pools.get(id).cloned()
    }

    fn load_token(&self, id: &str) -> Option<Token> {
        self.tokens.get(id).cloned()
    }

    fn load_candle(&self, pool: &str, resolution: CandleResolution, bucket_id: i64) -> Option<Candle> {
        self.candles.get(&CandleKey::new(pool, resolution, bucket_id)).cloned()
    }

    fn load_bundle(&self) -> Option<ReferenceBundle> {
        self.bundle.clone()
    }

    fn load_factory(&self) -> Option<Factory> {
        self.factory.clone()
    }

    fn load_liquidity_position(&self, pool: &str, user: &str) -> Option<LiquidityPosition> {
        self.positions.get(&LiquidityPosition::position_id(pool, user)).cloned()
    }

    fn load_token_day(&self, token: &str, day_id: i64) -> Option<TokenDayData> {
        self.token_days.get(&(token.to_string(), day_id)).cloned()
    }

    fn load_factory_day(&self, day_id: i64) -> Option<FactoryDayData> {
        self.factory_days.get(&day_id).cloned()
    }

    fn load_previous_candle(
        &self,
        pool: &str,
        resolution: CandleResolution,
        bucket_id: i64,
        max_steps: i64,
    ) -> Option<Candle> {
        latest_before(&self.candles, pool, resolution, bucket_id, max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn candle(pool: &str, resolution: CandleResolution, bucket_id: i64, close: i64) -> Candle {
        Candle {
            id: Candle::candle_id(pool, resolution, bucket_id),
            pool: pool.to_string(),
            resolution,
            bucket_id,
            start_unix: resolution.bucket_start(bucket_id),
            token0: "0xa".into(),
            token1: "0xb".into(),
            open: Decimal::from(close),
            high: Decimal::from(close),
            low: Decimal::from(close),
            close: Decimal::from(close),
            price_usd: Decimal::from(close),
            base_price_usd: Decimal::from(close),
            price_change: Decimal::ZERO,
            volume_token0: Decimal::ZERO,
            volume_token1: Decimal::ZERO,
            volume_usd: Decimal::ZERO,
            volume_change: Decimal::ZERO,
            txns: 1,
            swap_txns: 0,
            buy_txs: 0,
            sell_txs: 0,
            buy_volume_usd: Decimal::ZERO,
            sell_volume_usd: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            reserve0: Decimal::ZERO,
            reserve1: Decimal::ZERO,
            reserve_usd: Decimal::ZERO,
        }
    }

    #[test]
    fn test_previous_candle_is_bounded() {
        let hour = CandleResolution::OneHour;
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        changes.upsert_candle(candle("0xp", hour, 10, 1));
        changes.upsert_candle(candle("0xp", CandleResolution::OneDay, 11, 9));
        changes.upsert_candle(candle("0xq", hour, 11, 9));
        store.apply(changes);

        assert_eq!(store.load_previous_candle("0xp", hour, 12, 5).map(|c| c.bucket_id), Some(10));
        assert_eq!(store.load_previous_candle("0xp", hour, 10, 5), None);
        assert_eq!(store.load_previous_candle("0xp", hour, 2000, PREVIOUS_CANDLE_MAX_STEPS), None);
        assert_eq!(store.load_previous_candle("0xp", hour, 1010, PREVIOUS_CANDLE_MAX_STEPS).map(|c| c.bucket_id), Some(10));
    }

    #[test]
    fn test_default_scan_matches_range_lookup() {
        struct ScanOnly(MemoryStore);
        impl EntityStore for ScanOnly {
            fn load_pool(&self, id: &str) -> Option<Pool> { self.0.load_pool(id) }
            fn load_token(&self, id: &str) -> Option<Token> { self.0.load_token(id) }
            fn load_candle(&self, p: &str, r: CandleResolution, b: i64) -> Option<Candle> { self.0.load_candle(p, r, b) }
            fn load_bundle(&self) -> Option<ReferenceBundle> { None }
            fn load_factory(&self) -> Option<Factory> { None }
            fn load_liquidity_position(&self, _: &str, _: &str) -> Option<LiquidityPosition> { None }
            fn load_token_day(&self, _: &str, _: i64) -> Option<TokenDayData> { None }
            fn load_factory_day(&self, _: i64) -> Option<FactoryDayData> { None }
        }

        let five = CandleResolution::FiveMinutes;
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        changes.upsert_candle(candle("0xp", five, 3, 1));
        changes.upsert_candle(candle("0xp", five, 7, 2));
        store.apply(changes);

        let scan = ScanOnly(store.clone());
        for bucket in [4, 8, 20, 1_008, 1_100] {
            assert_eq!(
                scan.load_previous_candle("0xp", five, bucket, PREVIOUS_CANDLE_MAX_STEPS),
                store.load_previous_candle("0xp", five, bucket, PREVIOUS_CANDLE_MAX_STEPS),
            );
        }
    }

    #[test]
    fn test_layered_prefers_pending_changes() {
        let hour = CandleResolution::OneHour;
        let mut store = MemoryStore::new();
        let mut base = ChangeSet::default();
        base.upsert_bundle(ReferenceBundle { eth_price: Decimal::from(1000) });
        base.upsert_candle(candle("0xp", hour, 5, 1));
        store.apply(base);

        let mut pending = ChangeSet::default();
        pending.upsert_bundle(ReferenceBundle { eth_price: Decimal::from(2000) });
        pending.upsert_candle(candle("0xp", hour, 8, 3));
        let view = Layered::new(&store, &pending);

        assert_eq!(view.load_bundle().unwrap().eth_price, Decimal::from(2000));
        assert_eq!(view.load_previous_candle("0xp", hour, 9, 100).unwrap().bucket_id, 8);
        assert_eq!(view.load_previous_candle("0xp", hour, 8, 100).unwrap().bucket_id, 5);
        assert!(view.load_factory().is_none());
    }

    #[test]
    fn test_retain_latest_candles() {
        let hour = CandleResolution::OneHour;
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        for bucket in 1..=4 {
            changes.upsert_candle(candle("0xp", hour, bucket, bucket));
        }
        changes.upsert_candle(candle("0xp", CandleResolution::OneDay, 1, 1));
        store.apply(changes);

        store.retain_latest_candles(2);
        assert_eq!(store.candle_count(), 3);
        assert!(store.load_candle("0xp", hour, 4).is_some());
        assert!(store.load_candle("0xp", hour, 3).is_some());
        assert!(store.load_candle("0xp", hour, 2).is_none());
    }

    #[test]
    fn test_merge_keeps_latest_writes() {
        let mut first = ChangeSet::default();
        first.upsert_factory(Factory { pair_count: 1, ..Default::default() });
        let mut second = ChangeSet::default();
        second.upsert_factory(Factory { pair_count: 2, ..Default::default() });
        second.upsert_position(LiquidityPosition::new("0xp", "0xu"));

        first.merge(second);
        assert_eq!(first.factory.as_ref().map(|f| f.pair_count), Some(2));
        assert_eq!(first.record_count(), 2);
        assert!(!first.is_empty());
        assert!(ChangeSet::default().is_empty());
    }

    #[test]
    fn test_retain_latest_days() {
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        for day in [3, 5, 4] {
            changes.upsert_token_day(TokenDayData::new("0xa", day));
            changes.upsert_factory_day(FactoryDayData::new(day));
        }
        changes.upsert_token_day(TokenDayData::new("0xb", 1));
        store.apply(changes);
        assert_eq!(store.day_data_count(), 7);

        store.retain_latest_days();
        assert_eq!(store.day_data_count(), 3);
        assert!(store.load_token_day("0xa", 5).is_some());
        assert!(store.load_token_day("0xa", 4).is_none());
        assert!(store.load_token_day("0xb", 1).is_some());
        assert!(store.load_factory_day(5).is_some());

        let mut pending = ChangeSet::default();
        pending.upsert_factory_day(FactoryDayData { tx_count: 9, ..FactoryDayData::new(5) });
        assert_eq!(Layered::new(&store, &pending).load_factory_day(5).map(|d| d.tx_count), Some(9));
    }
}
