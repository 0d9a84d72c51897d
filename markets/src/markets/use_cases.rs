//! Use cases for reading markets.
//!
//! The HTTP layer only knows the two traits below. [`GetMarkets`] owns the paging and
//! sorting defaults; [`GetMarketById`] turns a missing market into
//! [`UseCaseError::NotFound`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Market, MarketFilters, MarketList, SortBy, SortOrder};
use super::store::{MarketQuery, MarketStore};

/// Default number of markets returned per page.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum number of markets that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Failure kinds a use case can report.
#[derive(Debug, Error)]
pub enum UseCaseError {
    /// The requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Anything else, with its full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UseCaseError {
    /// Collapse the failure kind for callers that do not distinguish between kinds.
    pub fn into_unclassified(self) -> anyhow::Error {
        match self {
            UseCaseError::NotFound(message) => anyhow::Error::msg(message),
            UseCaseError::Other(err) => err,
        }
    }
}

#[async_trait]
pub trait GetMarketsUseCase: Send + Sync {
    async fn execute(&self, filters: MarketFilters) -> Result<MarketList, UseCaseError>;
}

#[async_trait]
pub trait GetMarketByIdUseCase: Send + Sync {
    async fn execute(&self, id: &str) -> Result<Market, UseCaseError>;
}

impl From<&MarketFilters> for MarketQuery {
    /// Apply listing defaults: newest first, 20 per page, limit clamped to 1..=100 and
    /// negative offsets treated as zero.
    fn from(filters: &MarketFilters) -> Self {
        Self {
            status: filters.status.clone(),
            creator_id: filters.creator_id.clone(),
            sort_by: filters.sort_by.unwrap_or(SortBy::CreateTms),
            sort_order: filters.sort_order.unwrap_or(SortOrder::Desc),
            limit: filters.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: filters.offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Clone)]
pub struct GetMarkets {
    store: Arc<dyn MarketStore>,
}

impl GetMarkets {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl GetMarketsUseCase for GetMarkets {
    #[tracing::instrument(skip(self))]
    async fn execute(&self, filters: MarketFilters) -> Result<MarketList, UseCaseError> {
        let query = MarketQuery::from(&filters);
        let page = self.store.list(&query).await?;

        tracing::debug!(returned = page.markets.len(), total = page.total, "Listed markets");

        Ok(MarketList {
            markets: page.markets,
            total: page.total,
            limit: query.limit,
            offset: query.offset,
        })
    }
}

#[derive(Clone)]
pub struct GetMarketById {
    store: Arc<dyn MarketStore>,
}

impl GetMarketById {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl GetMarketByIdUseCase for GetMarketById {
    #[tracing::instrument(skip(self))]
    async fn execute(&self, id: &str) -> Result<Market, UseCaseError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| UseCaseError::NotFound(format!("no market {id}")))
    }
}
