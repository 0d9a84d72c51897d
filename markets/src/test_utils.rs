//! Test utilities: fixtures, recording mock use cases and a router-level test server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};

use crate::{
    AppState,
    config::{Config, StoreConfig},
    markets::{
        models::{Market, MarketFilters, MarketList, MarketStatus},
        use_cases::{GetMarketByIdUseCase, GetMarketsUseCase, UseCaseError},
    },
};

/// An open market with deterministic field values.
pub fn sample_market(id: &str) -> Market {
    Market {
        id: id.to_string(),
        question: format!("Will market {id} resolve yes?"),
        description: Some("Test market".to_string()),
        status: MarketStatus::Open,
        creator_id: "creator-1".to_string(),
        outcomes: vec!["yes".to_string(), "no".to_string()],
        resolved_outcome: None,
        create_tms: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        resolution_time: Some(Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap()),
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        store: StoreConfig::Memory { seed_file: None },
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

/// What a mock use case does when executed.
#[derive(Clone)]
enum Outcome<T> {
    Return(T),
    NotFound(String),
    Fail(String),
}

impl<T: Clone> Outcome<T> {
    fn to_result(&self) -> Result<T, UseCaseError> {
        match self {
            Outcome::Return(value) => Ok(value.clone()),
            Outcome::NotFound(message) => Err(UseCaseError::NotFound(message.clone())),
            Outcome::Fail(message) => Err(UseCaseError::Other(anyhow::Error::msg(message.clone()))),
        }
    }
}

/// Records every filter it receives and replies with a fixed outcome.
pub struct MockGetMarkets {
    outcome: Outcome<MarketList>,
    calls: Mutex<Vec<MarketFilters>>,
}

impl MockGetMarkets {
    fn with(outcome: Outcome<MarketList>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn returning(list: MarketList) -> Arc<Self> {
        Self::with(Outcome::Return(list))
    }

    pub fn not_found(message: &str) -> Arc<Self> {
        Self::with(Outcome::NotFound(message.to_string()))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with(Outcome::Fail(message.to_string()))
    }

    pub fn calls(&self) -> Vec<MarketFilters> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GetMarketsUseCase for MockGetMarkets {
    async fn execute(&self, filters: MarketFilters) -> Result<MarketList, UseCaseError> {
        self.calls.lock().unwrap().push(filters);
        self.outcome.to_result()
    }
}

/// Records every id it receives and replies with a fixed outcome.
pub struct MockGetMarketById {
    outcome: Outcome<Market>,
    calls: Mutex<Vec<String>>,
}

impl MockGetMarketById {
    fn with(outcome: Outcome<Market>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn returning(market: Market) -> Arc<Self> {
        Self::with(Outcome::Return(market))
    }

    pub fn not_found(message: &str) -> Arc<Self> {
        Self::with(Outcome::NotFound(message.to_string()))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with(Outcome::Fail(message.to_string()))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GetMarketByIdUseCase for MockGetMarketById {
    async fn execute(&self, id: &str) -> Result<Market, UseCaseError> {
        self.calls.lock().unwrap().push(id.to_string());
        self.outcome.to_result()
    }
}

pub fn create_test_state(get_markets: Arc<dyn GetMarketsUseCase>, get_market_by_id: Arc<dyn GetMarketByIdUseCase>) -> AppState {
    AppState::builder()
        .config(create_test_config())
        .get_markets(get_markets)
        .get_market_by_id(get_market_by_id)
        .build()
}

pub fn create_test_server(get_markets: Arc<dyn GetMarketsUseCase>, get_market_by_id: Arc<dyn GetMarketByIdUseCase>) -> TestServer {
    let state = create_test_state(get_markets, get_market_by_id);
    let router = crate::build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}
