//! PostgreSQL market storage.
//!
//! Listing queries are assembled with [`sqlx::QueryBuilder`]. Filter values are always
//! bound parameters; the `ORDER BY` column and direction come from the [`SortBy`] and
//! [`SortOrder`] enums, never from caller-supplied text.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{MarketPage, MarketQuery, MarketStore};
use crate::markets::models::{Market, MarketStatus, SortBy, SortOrder};

const MARKET_COLUMNS: &str =
    "id, question, description, status, creator_id, outcomes, resolved_outcome, create_tms, resolution_time";

#[derive(Debug, FromRow)]
struct MarketRow {
    id: String,
    question: String,
    description: Option<String>,
    status: String,
    creator_id: String,
    outcomes: Vec<String>,
    resolved_outcome: Option<String>,
    create_tms: DateTime<Utc>,
    resolution_time: Option<DateTime<Utc>>,
}

impl TryFrom<MarketRow> for Market {
    type Error = anyhow::Error;

    fn try_from(row: MarketRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<MarketStatus>().with_context(|| format!("market {} has an invalid status", row.id))?;
        Ok(Market {
            id: row.id,
            question: row.question,
            description: row.description,
            status,
            creator_id: row.creator_id,
            outcomes: row.outcomes,
            resolved_outcome: row.resolved_outcome,
            create_tms: row.create_tms,
            resolution_time: row.resolution_time,
        })
    }
}

fn sort_column(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::CreateTms => "create_tms",
        SortBy::ResolutionTime => "resolution_time",
    }
}

fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, query: &MarketQuery) {
    let mut conjunction = " WHERE ";
    if let Some(status) = &query.status {
        builder.push(conjunction).push("status = ").push_bind(status.clone());
        conjunction = " AND ";
    }
    if let Some(creator_id) = &query.creator_id {
        builder.push(conjunction).push("creator_id = ").push_bind(creator_id.clone());
    }
}

fn list_query(query: &MarketQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {MARKET_COLUMNS} FROM markets"));
    push_filters(&mut builder, query);
    builder.push(format!(
        " ORDER BY {} {} NULLS LAST, id ASC",
        sort_column(query.sort_by),
        sort_direction(query.sort_order)
    ));
    builder.push(" LIMIT ").push_bind(query.limit);
    builder.push(" OFFSET ").push_bind(query.offset);
    builder
}

fn count_query(query: &MarketQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM markets");
    push_filters(&mut builder, query);
    builder
}

#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    #[tracing::instrument(skip_all, fields(limit = query.limit, offset = query.offset))]
    async fn list(&self, query: &MarketQuery) -> anyhow::Result<MarketPage> {
        let total: i64 = count_query(query)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("failed to count markets")?;

        let rows: Vec<MarketRow> = list_query(query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("failed to list markets")?;

        let markets = rows.into_iter().map(Market::try_from).collect::<anyhow::Result<Vec<_>>>()?;
        Ok(MarketPage { markets, total })
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &str) -> anyhow::Result<Option<Market>> {
        let row: Option<MarketRow> = sqlx::query_as(&format!("SELECT {MARKET_COLUMNS} FROM markets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to fetch market {id}"))?;

        row.map(Market::try_from).transpose()
    }
}
