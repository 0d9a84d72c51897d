//! API request/response models for markets.

use crate::markets::models::{Market, MarketList, MarketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

/// Raw query parameters for listing markets.
///
/// Every value is kept as the caller sent it. Turning these into typed filters is the job
/// of [`crate::api::handlers::markets::parse_market_filters`].
#[derive(Debug, Default, Clone, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListMarketsQuery {
    /// Only markets in this status (open, closed, resolved, cancelled)
    pub status: Option<String>,
    /// Only markets created by this user
    pub creator_id: Option<String>,
    /// Maximum number of markets to return (default: 20, max: 100)
    #[param(value_type = Option<i64>, default = 20, minimum = 1, maximum = 100)]
    pub limit: Option<String>,
    /// Number of markets to skip (default: 0)
    #[param(value_type = Option<i64>, default = 0, minimum = 0)]
    pub offset: Option<String>,
    /// Sort field: `createTms` or `resolutionTime`. Other values are ignored.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc`. Other values are ignored.
    pub sort_order: Option<String>,
}

impl ListMarketsQuery {
    /// Pick the recognised camelCase keys out of a decoded query string. Other keys are dropped.
    pub fn from_raw(raw: &HashMap<String, String>) -> Self {
        let value = |key: &str| raw.get(key).cloned();
        Self {
            status: value("status"),
            creator_id: value("creatorId"),
            limit: value("limit"),
            offset: value("offset"),
            sort_by: value("sortBy"),
            sort_order: value("sortOrder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketResponse {
    pub id: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: MarketStatus,
    pub creator_id: String,
    /// Possible outcomes, in display order
    pub outcomes: Vec<String>,
    /// Winning outcome, once the market has resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_outcome: Option<String>,
    /// When the market was created
    pub create_tms: DateTime<Utc>,
    /// When the market resolves or resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<DateTime<Utc>>,
}

/// Paginated market listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketListResponse {
    /// The markets for the current page
    pub markets: Vec<MarketResponse>,
    /// Total number of markets matching the filters (before pagination)
    pub total: i64,
    /// Page size that was applied
    pub limit: i64,
    /// Number of markets skipped
    pub offset: i64,
}

pub fn market_to_dto(market: Market) -> MarketResponse {
    MarketResponse {
        id: market.id,
        question: market.question,
        description: market.description,
        status: market.status,
        creator_id: market.creator_id,
        outcomes: market.outcomes,
        resolved_outcome: market.resolved_outcome,
        create_tms: market.create_tms,
        resolution_time: market.resolution_time,
    }
}

pub fn market_list_to_dto(list: MarketList) -> MarketListResponse {
    MarketListResponse {
        markets: list.markets.into_iter().map(market_to_dto).collect(),
        total: list.total,
        limit: list.limit,
        offset: list.offset,
    }
}
