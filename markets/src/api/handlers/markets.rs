//! HTTP handlers for market queries.
//!
//! These handlers only translate: raw query/path parameters become typed filters or
//! identifiers, the matching use case runs, and its result or failure becomes a JSON
//! response. Paging defaults live in the use case, not here.

use crate::{
    AppState,
    api::models::markets::{ListMarketsQuery, MarketListResponse, MarketResponse, market_list_to_dto, market_to_dto},
    errors::{Error, ErrorBody, Result},
    markets::models::{MarketFilters, SortBy, SortOrder},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::PathRejection},
};
use std::collections::HashMap;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_integer(name: &str, value: &str) -> Result<i64> {
    value.parse().map_err(|_| Error::BadRequest {
        message: "Invalid query parameter".to_string(),
        detail: Some(format!("{name} must be an integer")),
    })
}

/// Build typed filters from raw query parameters.
///
/// Empty values count as absent. `sortBy` and `sortOrder` outside their allowed values
/// are dropped; `limit` and `offset` that are not integers are rejected.
pub fn parse_market_filters(query: &ListMarketsQuery) -> Result<MarketFilters> {
    Ok(MarketFilters {
        status: non_empty(&query.status).map(str::to_string),
        creator_id: non_empty(&query.creator_id).map(str::to_string),
        limit: non_empty(&query.limit).map(|v| parse_integer("limit", v)).transpose()?,
        offset: non_empty(&query.offset).map(|v| parse_integer("offset", v)).transpose()?,
        sort_by: non_empty(&query.sort_by).and_then(SortBy::from_query),
        sort_order: non_empty(&query.sort_order).and_then(SortOrder::from_query),
    })
}

#[utoipa::path(
    get,
    path = "/markets",
    tag = "markets",
    summary = "List markets",
    description = "List markets, optionally filtered by status and creator, with paging and sorting",
    params(ListMarketsQuery),
    responses(
        (status = 200, description = "Page of markets", body = MarketListResponse),
        (status = 400, description = "Malformed limit or offset", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_markets(State(state): State<AppState>, Query(raw): Query<HashMap<String, String>>) -> Result<Json<MarketListResponse>> {
    // Decoding into a map never rejects; a repeated key keeps its last value
    let filters = parse_market_filters(&ListMarketsQuery::from_raw(&raw))?;

    // Listing does not distinguish failure kinds: everything is a 500
    let markets = state
        .get_markets
        .execute(filters)
        .await
        .map_err(|e| Error::Other(e.into_unclassified()))?;

    Ok(Json(market_list_to_dto(markets)))
}

#[utoipa::path(
    get,
    path = "/markets/{market_id}",
    tag = "markets",
    summary = "Get market",
    description = "Get a single market by its ID",
    params(
        ("market_id" = String, Path, description = "Market ID"),
    ),
    responses(
        (status = 200, description = "Market found", body = MarketResponse),
        (status = 400, description = "Market ID missing or not valid UTF-8", body = ErrorBody),
        (status = 404, description = "Market not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_market(
    State(state): State<AppState>,
    market_id: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<MarketResponse>> {
    let Path(market_id) = market_id.map_err(|rejection| Error::BadRequest {
        message: "Invalid market ID".to_string(),
        detail: Some(rejection.body_text()),
    })?;
    fetch_market(&state, Some(&market_id)).await
}

/// `GET /markets/` with the identifier segment left empty.
#[tracing::instrument(skip_all)]
pub async fn get_market_without_id(State(state): State<AppState>) -> Result<Json<MarketResponse>> {
    fetch_market(&state, None).await
}

async fn fetch_market(state: &AppState, market_id: Option<&str>) -> Result<Json<MarketResponse>> {
    let market_id = market_id.filter(|id| !id.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Market ID is required".to_string(),
        detail: None,
    })?;

    let market = state.get_market_by_id.execute(market_id).await?;
    Ok(Json(market_to_dto(market)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        markets::models::MarketList,
        test_utils::{MockGetMarketById, MockGetMarkets, create_test_server, sample_market},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> ListMarketsQuery {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ListMarketsQuery::from_raw(&map)
    }

    fn empty_list() -> MarketList {
        MarketList {
            markets: vec![],
            total: 0,
            limit: 20,
            offset: 0,
        }
    }

    #[test]
    fn test_parse_copies_recognised_fields() {
        let filters = parse_market_filters(&raw(&[
            ("status", "open"),
            ("creatorId", "u1"),
            ("limit", "10"),
            ("offset", "0"),
            ("sortBy", "createTms"),
            ("sortOrder", "desc"),
        ]))
        .unwrap();

        assert_eq!(
            filters,
            MarketFilters {
                status: Some("open".to_string()),
                creator_id: Some("u1".to_string()),
                limit: Some(10),
                offset: Some(0),
                sort_by: Some(SortBy::CreateTms),
                sort_order: Some(SortOrder::Desc),
            }
        );
    }

    #[test]
    fn test_parse_treats_empty_values_as_absent() {
        let filters = parse_market_filters(&raw(&[
            ("status", ""),
            ("creatorId", ""),
            ("limit", ""),
            ("offset", ""),
            ("sortBy", ""),
            ("sortOrder", ""),
        ]))
        .unwrap();

        assert_eq!(filters, MarketFilters::default());
    }

    #[test]
    fn test_parse_drops_unsupported_sort_values() {
        for (sort_by, sort_order) in [("price", "up"), ("createtms", "ASC"), ("resolution_time", "descending")] {
            let filters = parse_market_filters(&raw(&[("sortBy", sort_by), ("sortOrder", sort_order)])).unwrap();
            assert_eq!(filters.sort_by, None, "sortBy={sort_by}");
            assert_eq!(filters.sort_order, None, "sortOrder={sort_order}");
        }

        let filters = parse_market_filters(&raw(&[("sortBy", "resolutionTime"), ("sortOrder", "asc")])).unwrap();
        assert_eq!(filters.sort_by, Some(SortBy::ResolutionTime));
        assert_eq!(filters.sort_order, Some(SortOrder::Asc));
    }

    #[test]
    fn test_parse_passes_numbers_through_without_range_checks() {
        let filters = parse_market_filters(&raw(&[("limit", "100000"), ("offset", "-3")])).unwrap();
        assert_eq!(filters.limit, Some(100000));
        assert_eq!(filters.offset, Some(-3));
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        for (key, value) in [("limit", "ten"), ("limit", "1.5"), ("offset", "0x10"), ("offset", "NaN")] {
            match parse_market_filters(&raw(&[(key, value)])) {
                Err(Error::BadRequest { message, detail }) => {
                    assert_eq!(message, "Invalid query parameter");
                    assert_eq!(detail, Some(format!("{key} must be an integer")));
                }
                other => panic!("expected BadRequest for {key}={value}, got {other:?}"),
            }
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_forwards_typed_filters() {
        let get_markets = MockGetMarkets::returning(MarketList {
            markets: vec![sample_market("m1")],
            total: 1,
            limit: 10,
            offset: 0,
        });
        let server = create_test_server(get_markets.clone(), MockGetMarketById::returning(sample_market("m1")));

        let response = server
            .get("/v1/api/markets?limit=10&offset=0&sortBy=createTms&sortOrder=desc")
            .await;

        response.assert_status_ok();
        let body: MarketListResponse = response.json();
        assert_eq!(body.markets.len(), 1);
        assert_eq!(body.markets[0].id, "m1");
        assert_eq!(body.total, 1);

        assert_eq!(
            get_markets.calls(),
            vec![MarketFilters {
                limit: Some(10),
                offset: Some(0),
                sort_by: Some(SortBy::CreateTms),
                sort_order: Some(SortOrder::Desc),
                ..Default::default()
            }]
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_never_forwards_unknown_keys() {
        let get_markets = MockGetMarkets::returning(empty_list());
        let server = create_test_server(get_markets.clone(), MockGetMarketById::returning(sample_market("m1")));

        let response = server
            .get("/v1/api/markets?status=open&foo=bar&creator_id=snake&sortBy=price&sortOrder=sideways")
            .await;

        response.assert_status_ok();
        assert_eq!(
            get_markets.calls(),
            vec![MarketFilters {
                status: Some("open".to_string()),
                ..Default::default()
            }]
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_repeated_keys_keep_last_value() {
        let get_markets = MockGetMarkets::returning(empty_list());
        let server = create_test_server(get_markets.clone(), MockGetMarketById::returning(sample_market("m1")));

        server
            .get("/v1/api/markets?status=open&status=closed")
            .await
            .assert_status_ok();
        server
            .get("/v1/api/markets?sortBy=x&sortBy=createTms")
            .await
            .assert_status_ok();

        assert_eq!(
            get_markets.calls(),
            vec![
                MarketFilters {
                    status: Some("closed".to_string()),
                    ..Default::default()
                },
                MarketFilters {
                    sort_by: Some(SortBy::CreateTms),
                    ..Default::default()
                },
            ]
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_rejects_malformed_limit_without_calling_use_case() {
        let get_markets = MockGetMarkets::returning(empty_list());
        let server = create_test_server(get_markets.clone(), MockGetMarketById::returning(sample_market("m1")));

        let response = server.get("/v1/api/markets?limit=abc").await;

        response.assert_status_bad_request();
        response.assert_json(&json!({ "error": "Invalid query parameter", "message": "limit must be an integer" }));
        assert!(get_markets.calls().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_failure_is_500() {
        let server = create_test_server(
            MockGetMarkets::failing("db down"),
            MockGetMarketById::returning(sample_market("m1")),
        );

        let response = server.get("/v1/api/markets").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Internal server error", "message": "db down" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_does_not_distinguish_not_found() {
        let server = create_test_server(
            MockGetMarkets::not_found("nothing here"),
            MockGetMarketById::returning(sample_market("m1")),
        );

        let response = server.get("/v1/api/markets").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Internal server error", "message": "nothing here" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_list_markets_empty_failure_message_falls_back() {
        let server = create_test_server(MockGetMarkets::failing(""), MockGetMarketById::returning(sample_market("m1")));

        let response = server.get("/v1/api/markets").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Internal server error", "message": "Unknown error" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_get_market_returns_item() {
        let get_by_id = MockGetMarketById::returning(sample_market("m1"));
        let server = create_test_server(MockGetMarkets::returning(empty_list()), get_by_id.clone());

        let response = server.get("/v1/api/markets/m1").await;

        response.assert_status_ok();
        let body: MarketResponse = response.json();
        assert_eq!(body, market_to_dto(sample_market("m1")));
        assert_eq!(get_by_id.calls(), vec!["m1".to_string()]);
    }

    #[test_log::test(tokio::test)]
    async fn test_get_market_without_id_is_400_and_skips_use_case() {
        let get_by_id = MockGetMarketById::returning(sample_market("m1"));
        let server = create_test_server(MockGetMarkets::returning(empty_list()), get_by_id.clone());

        let response = server.get("/v1/api/markets/").await;

        response.assert_status_bad_request();
        response.assert_json(&json!({ "error": "Market ID is required" }));
        assert!(get_by_id.calls().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_get_market_with_undecodable_id_is_json_400() {
        let get_by_id = MockGetMarketById::returning(sample_market("m1"));
        let server = create_test_server(MockGetMarkets::returning(empty_list()), get_by_id.clone());

        let response = server.get("/v1/api/markets/%FF").await;

        response.assert_status_bad_request();
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "Invalid market ID");
        assert!(body.message.is_some());
        assert!(get_by_id.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_market_rejects_empty_and_absent_ids() {
        let get_by_id = MockGetMarketById::returning(sample_market("m1"));
        let state = crate::test_utils::create_test_state(MockGetMarkets::returning(empty_list()), get_by_id.clone());

        for market_id in [Some(""), None] {
            match fetch_market(&state, market_id).await {
                Err(err @ Error::BadRequest { .. }) => {
                    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
                    assert_eq!(
                        err.body(),
                        ErrorBody {
                            error: "Market ID is required".to_string(),
                            message: None
                        }
                    );
                }
                other => panic!("expected BadRequest for {market_id:?}, got {other:?}"),
            }
        }
        assert!(get_by_id.calls().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_get_market_not_found_is_404() {
        let server = create_test_server(
            MockGetMarkets::returning(empty_list()),
            MockGetMarketById::not_found("no market m1"),
        );

        let response = server.get("/v1/api/markets/m1").await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "error": "Market not found", "message": "no market m1" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_get_market_other_failure_is_500() {
        let server = create_test_server(MockGetMarkets::returning(empty_list()), MockGetMarketById::failing("db down"));

        let response = server.get("/v1/api/markets/m1").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Internal server error", "message": "db down" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_identical_requests_yield_identical_bodies() {
        let server = create_test_server(
            MockGetMarkets::returning(MarketList {
                markets: vec![sample_market("m1"), sample_market("m2")],
                total: 2,
                limit: 20,
                offset: 0,
            }),
            MockGetMarketById::not_found("no market m3"),
        );

        for path in ["/v1/api/markets?status=open", "/v1/api/markets/m3", "/v1/api/markets/"] {
            let first = server.get(path).await;
            let second = server.get(path).await;
            assert_eq!(first.status_code(), second.status_code(), "{path}");
            assert_eq!(first.as_bytes(), second.as_bytes(), "{path}");
        }
    }
}
