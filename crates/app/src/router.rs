use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use listings_storage::Database;

use crate::{api, pages, telemetry};

/// Shared, read-only handles cloned into every request.
#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self { metrics, storage }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }
}

/// Operational endpoints live under `/_/`, a prefix no property slug can take.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::listing))
        .route("/_/healthz", get(healthz))
        .route("/_/metrics", get(metrics))
        .route("/api/property", get(api::list_properties))
        .route("/api/property/:id", get(api::get_property))
        .route("/:slug", get(pages::detail))
        .fallback(pages::fallback)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use http_body_util::BodyExt;
    use listings_core::{ListingParams, PropertyDraft};
    use listings_storage::NewMedia;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestContext {
        state: AppState,
        _dir: TempDir,
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid time")
    }

    async fn setup_context(entries: &[(&str, &str, bool)]) -> TestContext {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let dir = tempfile::tempdir().expect("tempdir");
        let database = Database::open(&dir.path().join("router.db"))
            .await
            .expect("open");
        database.run_migrations().await.expect("migrations");

        let media = database
            .media()
            .create(NewMedia {
                url: "/media/listing.jpg",
                alt: None,
                created_at: base_time(),
            })
            .await
            .expect("media");

        for (index, (title, location, published)) in entries.iter().enumerate() {
            let draft = PropertyDraft {
                title: Some(title.to_string()),
                location: Some(location.to_string()),
                price: Some(500_000.0 + index as f64),
                image: Some(media.id),
                description: Some(
                    serde_json::from_value(serde_json::json!({
                        "root": {"children": [
                            {"type": "heading", "tag": "h2", "children": [{"type": "text", "text": "Heading text"}]},
                            {"type": "paragraph", "children": [
                                {"type": "text", "text": "Spacious "},
                                {"type": "text", "text": "home"}
                            ]}
                        ]}
                    }))
                    .expect("description document"),
                ),
                is_published: Some(*published),
                ..PropertyDraft::default()
            };
            database
                .properties()
                .create(draft, base_time() + Duration::minutes(index as i64))
                .await
                .expect("property");
        }

        TestContext {
            state: AppState::new(metrics, database),
            _dir: dir,
        }
    }

    async fn fetch(ctx: &TestContext, uri: &str) -> (StatusCode, String) {
        let response = app_router(ctx.state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");
        let status = response.status();
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        (status, body)
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let ctx = setup_context(&[]).await;
        let (status, _) = fetch(&ctx, "/_/healthz").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let ctx = setup_context(&[]).await;
        let (status, body) = fetch(&ctx, "/_/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn listing_shows_only_published_properties() {
        let ctx = setup_context(&[
            ("Canal House", "Amsterdam", true),
            ("Unfinished Draft", "Amsterdam", false),
        ])
        .await;

        let (status, body) = fetch(&ctx, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Canal House"));
        assert!(body.contains(r#"href="/canal-house""#));
        assert!(!body.contains("Unfinished Draft"));
        assert!(body.contains("Showing 1 of 1 properties"));
        assert!(!body.contains(r#"class="pagination""#));
    }

    #[tokio::test]
    async fn listing_search_filters_and_reports_term() {
        let ctx = setup_context(&[
            ("Canal House", "Amsterdam", true),
            ("Ski Chalet", "Zermatt", true),
        ])
        .await;

        let (status, body) = fetch(&ctx, "/?search=zerm").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Ski Chalet"));
        assert!(!body.contains("Canal House"));
        assert!(body.contains("&quot;zerm&quot;"));
    }

    #[tokio::test]
    async fn empty_search_result_offers_clear_link() {
        let ctx = setup_context(&[("Canal House", "Amsterdam", true)]).await;

        let (status, body) = fetch(&ctx, "/?search=castle").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No properties found"));
        assert!(body.contains("Clear search"));
    }

    #[tokio::test]
    async fn empty_catalog_has_no_clear_link() {
        let ctx = setup_context(&[]).await;

        let (_, body) = fetch(&ctx, "/").await;
        assert!(body.contains("No properties found"));
        assert!(!body.contains("Clear search"));
    }

    #[tokio::test]
    async fn listing_paginates_and_keeps_search() {
        let ctx = setup_context(&[
            ("Villa One", "Coast", true),
            ("Villa Two", "Coast", true),
            ("Villa Three", "Coast", true),
        ])
        .await;

        let (status, body) = fetch(&ctx, "/?search=villa&page=2&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Villa One"));
        assert_eq!(body.matches("data-page=").count(), 2);
        assert!(body.contains(r#"href="/?search=villa&amp;page=1""#));
        assert!(body.contains("Previous"));
        assert!(!body.contains("Next &rarr;"));
    }

    #[tokio::test]
    async fn invalid_pagination_params_fall_back_to_defaults() {
        let ctx = setup_context(&[("Canal House", "Amsterdam", true)]).await;

        let (status, body) = fetch(&ctx, "/?page=abc&limit=xyz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Canal House"));
    }

    #[tokio::test]
    async fn slugs_named_after_ops_endpoints_reach_detail_page() {
        let ctx = setup_context(&[
            ("Metrics", "Data Park", true),
            ("Healthz", "Wellness Row", true),
        ])
        .await;

        let (_, listing) = fetch(&ctx, "/").await;
        assert!(listing.contains(r#"href="/metrics""#));
        assert!(listing.contains(r#"href="/healthz""#));

        let (status, body) = fetch(&ctx, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Metrics</h1>"));
        assert!(!body.contains("app_build_info"));

        let (status, body) = fetch(&ctx, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Healthz</h1>"));
    }

    #[tokio::test]
    async fn repeated_query_keys_use_first_value() {
        let ctx = setup_context(&[
            ("Canal House", "Amsterdam", true),
            ("Ski Chalet", "Zermatt", true),
        ])
        .await;

        let (status, body) = fetch(&ctx, "/?page=1&page=2").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Canal House"));
        assert!(body.contains("Ski Chalet"));

        let (status, body) = fetch(&ctx, "/?search=zerm&search=canal").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Ski Chalet"));
        assert!(!body.contains("Canal House"));

        let (status, body) = fetch(&ctx, "/api/property?limit=1&limit=5").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(value["limit"], 1);
    }

    #[tokio::test]
    async fn detail_renders_published_property() {
        let ctx = setup_context(&[("Canal House", "Amsterdam", true)]).await;

        let (status, body) = fetch(&ctx, "/canal-house").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Canal House</h1>"));
        assert!(body.contains("<p>Spacious home</p>"));
        assert!(!body.contains("Heading text"));
        assert!(body.contains("January 1, 2024"));
    }

    #[tokio::test]
    async fn detail_hides_unpublished_property() {
        let ctx = setup_context(&[("Secret Loft", "Berlin", false)]).await;

        let (status, body) = fetch(&ctx, "/secret-loft").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Property Not Found"));
        assert!(!body.contains("Secret Loft"));
    }

    #[tokio::test]
    async fn unknown_slug_and_route_return_not_found() {
        let ctx = setup_context(&[]).await;

        let (status, _) = fetch(&ctx, "/no-such-home").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = fetch(&ctx, "/some/nested/path").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Back to Property Listings"));
    }

    #[tokio::test]
    async fn api_lists_published_properties_as_json() {
        let ctx = setup_context(&[
            ("Canal House", "Amsterdam", true),
            ("Secret Loft", "Berlin", false),
        ])
        .await;

        let (status, body) = fetch(&ctx, "/api/property?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(value["totalDocs"], 1);
        assert_eq!(value["totalPages"], 1);
        assert_eq!(value["docs"][0]["slug"], "canal-house");
        assert_eq!(value["docs"][0]["isPublished"], true);
        assert_eq!(value["docs"][0]["image"]["url"], "/media/listing.jpg");
    }

    #[tokio::test]
    async fn api_get_hides_unpublished_and_rejects_bad_ids() {
        let ctx = setup_context(&[
            ("Canal House", "Amsterdam", true),
            ("Secret Loft", "Berlin", false),
        ])
        .await;

        let (status, body) = fetch(&ctx, "/api/property/1").await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(value["title"], "Canal House");

        let (status, body) = fetch(&ctx, "/api/property/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: Value = serde_json::from_str(&body).expect("problem json");
        assert_eq!(value["type"], "property_not_found");

        let (status, _) = fetch(&ctx, "/api/property/not-a-number").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn listing_params_decode_from_query_string() {
        let params = pages::listing_params(Some("search=sea+view&page=2&page=9&search=x"));
        assert_eq!(params.search.as_deref(), Some("sea view"));
        assert_eq!(params.page.as_deref(), Some("2"));
        assert!(params.limit.is_none());

        assert_eq!(pages::listing_params(None), ListingParams::default());
        assert_eq!(
            pages::listing_params(Some("page=%ZZ&&=")).page.as_deref(),
            Some("%ZZ")
        );
    }
}
