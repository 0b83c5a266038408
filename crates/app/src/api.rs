use std::time::Instant;

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use metrics::counter;
use tracing::error;

use listings_core::{published_by_id, ListingQuery, PaginatedDocs, Property};

use crate::pages::listing_params;
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::telemetry;

/// `GET /api/property`: the listing query as JSON.
pub async fn list_properties(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<PaginatedDocs<Property>>, ProblemResponse> {
    let query = ListingQuery::from_params(&listing_params(raw.as_deref()));

    let started = Instant::now();
    let result = state.storage().properties().find(&query.request).await;
    telemetry::record_store_query("api_list", started);

    match result {
        Ok(page) => {
            counter!("api_requests_total", "endpoint" => "list", "result" => "ok").increment(1);
            Ok(Json(page))
        }
        Err(err) => {
            counter!("api_requests_total", "endpoint" => "list", "result" => "error").increment(1);
            error!(stage = "api", error = %err, "property list query failed");
            Err(ProblemResponse::store_unavailable())
        }
    }
}

/// `GET /api/property/{id}`: one published record.
pub async fn get_property(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Property>, ProblemResponse> {
    let Ok(id) = raw_id.parse::<i64>() else {
        counter!("api_requests_total", "endpoint" => "get", "result" => "not_found").increment(1);
        return Err(ProblemResponse::not_found(format!(
            "no published property with id '{raw_id}'"
        )));
    };

    let started = Instant::now();
    let result = state.storage().properties().find(&published_by_id(id)).await;
    telemetry::record_store_query("api_get", started);

    let page = result.map_err(|err| {
        counter!("api_requests_total", "endpoint" => "get", "result" => "error").increment(1);
        error!(stage = "api", %id, error = %err, "property lookup failed");
        ProblemResponse::store_unavailable()
    })?;

    match page.docs.into_iter().next() {
        Some(property) => {
            counter!("api_requests_total", "endpoint" => "get", "result" => "ok").increment(1);
            Ok(Json(property))
        }
        None => {
            counter!("api_requests_total", "endpoint" => "get", "result" => "not_found")
                .increment(1);
            Err(ProblemResponse::not_found(format!(
                "no published property with id '{id}'"
            )))
        }
    }
}
