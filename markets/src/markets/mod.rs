//! Market domain: entities, storage and the read-side use cases.
//!
//! - [`models`]: `Market`, `MarketList` and the caller-supplied `MarketFilters`
//! - [`store`]: the `MarketStore` trait with in-memory and PostgreSQL backends
//! - [`use_cases`]: `GetMarkets` and `GetMarketById`, the collaborators the HTTP layer calls

pub mod models;
pub mod store;
pub mod use_cases;
