//! OpenAPI document for the market query API, served at `/v1/api/openapi.json` and rendered
//! by Scalar at `/v1/api/docs`.

use utoipa::OpenApi;

use crate::{
    api::{
        self,
        models::markets::{MarketListResponse, MarketResponse},
    },
    errors::ErrorBody,
    markets::models::MarketStatus,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Markets API",
        description = "Read-only queries over prediction markets."
    ),
    servers((url = "/v1/api")),
    paths(api::handlers::markets::list_markets, api::handlers::markets::get_market),
    components(schemas(MarketResponse, MarketListResponse, MarketStatus, ErrorBody)),
    tags((name = "markets", description = "Market listing and lookup"))
)]
pub struct ApiDoc;
