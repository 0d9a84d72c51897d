//! Domain entities for prediction markets and the filters used to query them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle state of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
    Resolved,
    Cancelled,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Closed => "closed",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(MarketStatus::Open),
            "closed" => Ok(MarketStatus::Closed),
            "resolved" => Ok(MarketStatus::Resolved),
            "cancelled" => Ok(MarketStatus::Cancelled),
            other => Err(anyhow::anyhow!("unknown market status '{other}'")),
        }
    }
}

/// A single prediction market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: MarketStatus,
    pub creator_id: String,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub resolved_outcome: Option<String>,
    pub create_tms: DateTime<Utc>,
    #[serde(default)]
    pub resolution_time: Option<DateTime<Utc>>,
}

/// One page of markets plus the paging window that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketList {
    pub markets: Vec<Market>,
    /// Number of markets matching the filters before paging
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Field a market listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    CreateTms,
    ResolutionTime,
}

impl SortBy {
    /// Accepts only the exact wire names; anything else yields `None`.
    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "createTms" => Some(SortBy::CreateTms),
            "resolutionTime" => Some(SortBy::ResolutionTime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Accepts only `asc` or `desc`; anything else yields `None`.
    pub fn from_query(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Filters for listing markets, exactly as supplied by the caller.
///
/// Every field is optional and absent fields stay absent here. Defaults and clamping
/// are applied by [`crate::markets::use_cases::GetMarkets`], not by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketFilters {
    pub status: Option<String>,
    pub creator_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}
