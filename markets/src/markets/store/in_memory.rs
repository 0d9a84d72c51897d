//! In-memory market storage.
//!
//! Markets live in a concurrent map keyed by id. Listing clones the matching markets,
//! sorts them and applies the offset/limit window, so it is only meant for modest data
//! sets: local development, demos and tests.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use super::{MarketPage, MarketQuery, MarketStore};
use crate::markets::models::{Market, SortBy, SortOrder};

#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    markets: Arc<DashMap<String, Market>>,
}

impl InMemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markets(markets: impl IntoIterator<Item = Market>) -> Self {
        let store = Self::new();
        for market in markets {
            store.insert(market);
        }
        store
    }

    /// Load markets from a JSON file containing an array of markets.
    pub async fn from_seed_file(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read market seed file {}", path.display()))?;
        let markets: Vec<Market> =
            serde_json::from_slice(&raw).with_context(|| format!("failed to parse market seed file {}", path.display()))?;

        info!(count = markets.len(), path = %path.display(), "Seeded in-memory market store");
        Ok(Self::from_markets(markets))
    }

    /// Insert or replace a market.
    pub fn insert(&self, market: Market) {
        self.markets.insert(market.id.clone(), market);
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

fn matches(market: &Market, query: &MarketQuery) -> bool {
    if let Some(status) = &query.status
        && market.status.as_str() != status
    {
        return false;
    }
    if let Some(creator_id) = &query.creator_id
        && &market.creator_id != creator_id
    {
        return false;
    }
    true
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Ordering used for listings. Markets without a resolution time go last regardless of
/// direction, and ties fall back to ascending id so pages are stable.
fn compare(a: &Market, b: &Market, sort_by: SortBy, order: SortOrder) -> Ordering {
    let primary = match sort_by {
        SortBy::CreateTms => directed(a.create_tms.cmp(&b.create_tms), order),
        SortBy::ResolutionTime => match (a.resolution_time, b.resolution_time) {
            (Some(a_time), Some(b_time)) => directed(a_time.cmp(&b_time), order),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    #[tracing::instrument(skip_all, fields(limit = query.limit, offset = query.offset))]
    async fn list(&self, query: &MarketQuery) -> anyhow::Result<MarketPage> {
        let mut matching: Vec<Market> = self
            .markets
            .iter()
            .filter(|entry| matches(entry.value(), query))
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by(|a, b| compare(a, b, query.sort_by, query.sort_order));

        let total = i64::try_from(matching.len()).context("market count overflow")?;
        let offset = usize::try_from(query.offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX);

        let markets = matching.into_iter().skip(offset).take(limit).collect();
        Ok(MarketPage { markets, total })
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> anyhow::Result<Option<Market>> {
        Ok(self.markets.get(id).map(|entry| entry.value().clone()))
    }
}
