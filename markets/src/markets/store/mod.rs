//! Storage backends for markets.
//!
//! The [`MarketStore`] trait is the seam between the use cases and persistence:
//!
//! - [`in_memory::InMemoryMarketStore`]: concurrent map, optionally seeded from a JSON file.
//!   Suitable for development and tests; contents are lost on restart.
//! - [`postgres::PostgresMarketStore`]: PostgreSQL via sqlx, schema in `migrations/`.

pub mod in_memory;
pub mod postgres;

use crate::markets::models::{Market, SortBy, SortOrder};
use async_trait::async_trait;

pub use in_memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;

/// A fully resolved listing query: every default has already been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketQuery {
    pub status: Option<String>,
    pub creator_id: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

/// One page of stored markets together with the unpaged match count.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketPage {
    pub markets: Vec<Market>,
    pub total: i64,
}

#[async_trait]
pub trait MarketStore: Send + Sync {
    /// List markets matching `query`, ordered and windowed as it specifies.
    async fn list(&self, query: &MarketQuery) -> anyhow::Result<MarketPage>;

    /// Fetch a single market, `None` if no market has this id.
    async fn get(&self, id: &str) -> anyhow::Result<Option<Market>>;
}
