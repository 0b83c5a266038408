use std::time::Instant;

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::form_urlencoded;

use listings_core::{detail_request, ListingParams, ListingQuery};
use listings_storage::PropertyError;

use crate::router::AppState;
use crate::telemetry;
use crate::views::{
    self,
    listing::{self, ListingView},
};

/// Failure while producing an HTML page. Always rendered as a generic 500.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("store query failed: {0}")]
    Store(#[from] PropertyError),
    #[error("template failed to render: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!(stage = "app", error = %self, "page request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(views::error_page())).into_response()
    }
}

/// Decodes the listing parameters from a raw query string.
///
/// Malformed or repeated keys never fail the request: the first occurrence of
/// each key is kept.
pub fn listing_params(raw: Option<&str>) -> ListingParams {
    ListingParams::from_pairs(form_urlencoded::parse(raw.unwrap_or_default().as_bytes()))
}

/// `GET /` with optional `search`, `page` and `limit` parameters.
pub async fn listing(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Html<String>, PageError> {
    let query = ListingQuery::from_params(&listing_params(raw.as_deref()));

    let started = Instant::now();
    let result = state.storage().properties().find(&query.request).await;
    telemetry::record_store_query("listing", started);

    let page = match result {
        Ok(page) => page,
        Err(err) => {
            counter!("listing_requests_total", "result" => "error").increment(1);
            return Err(err.into());
        }
    };

    let outcome = if page.is_empty() { "empty" } else { "ok" };
    counter!("listing_requests_total", "result" => outcome).increment(1);
    debug!(
        stage = "listing",
        search = %query.search,
        page = page.page,
        limit = query.request.limit,
        total_docs = page.total_docs,
        "listing rendered"
    );

    Ok(Html(listing::render(&ListingView {
        docs: &page.docs,
        total_docs: page.total_docs,
        total_pages: page.total_pages,
        page: page.page,
        search: &query.search,
    })?))
}

/// `GET /{slug}`: a published record or the not-found page.
pub async fn detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, PageError> {
    let request = detail_request(&slug);

    let started = Instant::now();
    let result = state.storage().properties().find(&request).await;
    telemetry::record_store_query("detail", started);

    let page = match result {
        Ok(page) => page,
        Err(err) => {
            counter!("detail_requests_total", "result" => "error").increment(1);
            return Err(err.into());
        }
    };

    if page.total_docs > 1 {
        warn!(stage = "detail", %slug, matches = page.total_docs, "slug matched more than one record");
    }

    match page.first() {
        Some(property) => {
            counter!("detail_requests_total", "result" => "found").increment(1);
            Ok(Html(views::detail::render(property)?).into_response())
        }
        None => {
            counter!("detail_requests_total", "result" => "not_found").increment(1);
            debug!(stage = "detail", %slug, "no published property for slug");
            Ok(not_found_response())
        }
    }
}

/// Fallback for unknown routes.
pub async fn fallback() -> Response {
    not_found_response()
}

fn not_found_response() -> Response {
    (StatusCode::NOT_FOUND, Html(views::not_found_page())).into_response()
}
