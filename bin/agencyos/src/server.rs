//! Page-serving HTTP router.
//!
//! Every path that is not a service route is treated as a page permalink.

use std::sync::Arc;

use agencyos_blocks::Resolver;
use agencyos_core::Config;
use agencyos_render::PageRenderer;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

/// Shared server state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub resolver: Resolver,
    pub renderer: PageRenderer,
}

impl AppState {
    /// Build the state; the renderer takes site settings from `config`.
    pub fn new(config: Arc<Config>, resolver: Resolver) -> Self {
        Self {
            resolver,
            renderer: PageRenderer::new(config),
        }
    }
}

/// Create the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(home_handler))
        .route("/{*path}", get(page_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn home_handler(State(state): State<Arc<AppState>>) -> Response {
    render(&state, "/").await
}

async fn page_handler(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> Response {
    render(&state, &permalink_for(&path)).await
}

/// Permalink for a request path: leading slash, no trailing slash.
pub fn permalink_for(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

async fn render(state: &AppState, permalink: &str) -> Response {
    let (status, html) = match state.resolver.load_page(permalink).await {
        Ok(Some(page)) => (StatusCode::OK, state.renderer.render_page(&page)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            state.renderer.render_not_found(permalink),
        ),
        Err(e) => {
            tracing::error!(permalink, error = %e, "failed to resolve page");
            (
                StatusCode::BAD_GATEWAY,
                state.renderer.render_unavailable(permalink),
            )
        }
    };

    match html {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(permalink, error = %e, "failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use agencyos_blocks::{ContentSource, MemorySource, SourceError};
    use agencyos_core::{FailurePolicy, ItemId};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn test_config() -> Arc<Config> {
        Arc::new(
            Config::parse(
                r#"
[site]
url = "https://agency.example.com"
name = "Agency"

[content]
url = "https://cms.example.com"
"#,
            )
            .unwrap(),
        )
    }

    fn memory_router() -> Router {
        let source = MemorySource::new()
            .with_page(json!({
                "title": "Home",
                "permalink": "/",
                "blocks": [{"collection": "block_quote", "item": 1}]
            }))
            .with_page(json!({
                "title": "About",
                "permalink": "/about",
                "blocks": [{"collection": "block_cta", "item": 5}]
            }))
            .with_item("block_quote", 1i64, json!({"id": "q1", "content": "Hello there"}));
        let resolver = Resolver::new(Arc::new(source));
        create_router(AppState::new(test_config(), resolver))
    }

    /// Pages load, every block fetch fails.
    struct FlakySource;

    #[async_trait]
    impl ContentSource for FlakySource {
        async fn fetch_item(
            &self,
            collection: &str,
            _id: &ItemId,
            _depth: u8,
        ) -> agencyos_blocks::source::Result<Option<Value>> {
            Err(SourceError::Status {
                status: 503,
                url: format!("/items/{collection}"),
            })
        }

        async fn fetch_page(
            &self,
            permalink: &str,
            _depth: u8,
        ) -> agencyos_blocks::source::Result<Option<Value>> {
            Ok(Some(json!({
                "title": "Flaky",
                "permalink": permalink,
                "blocks": [{"collection": "block_hero", "item": 1}]
            })))
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_permalink_for() {
        assert_eq!(permalink_for(""), "/");
        assert_eq!(permalink_for("about"), "/about");
        assert_eq!(permalink_for("about/"), "/about");
        assert_eq!(permalink_for("/help/faq/"), "/help/faq");
    }

    #[tokio::test]
    async fn test_healthz() {
        let (status, body) = get(memory_router(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_home_page() {
        let (status, body) = get(memory_router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>Home | Agency</title>"));
        assert!(body.contains("Hello there"));
    }

    #[tokio::test]
    async fn test_page_with_missing_block_still_renders() {
        let (status, body) = get(memory_router(), "/about/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<!-- block_cta:5 unavailable -->"));
    }

    #[tokio::test]
    async fn test_unknown_page_is_not_found() {
        let (status, body) = get(memory_router(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Page not found"));
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_columns_page_with_integer_keys() {
        let source = MemorySource::new()
            .with_page(json!({
                "title": "Services",
                "permalink": "/services",
                "blocks": [{"collection": "block_columns", "item": 1}]
            }))
            .with_item("block_columns", 1i64, json!({"id": 1, "rows": [2, {"id": 3, "title": "Build"}]}))
            .with_item("block_column_rows", 2i64, json!({"id": 2, "title": "Design"}));
        let state = AppState::new(test_config(), Resolver::new(Arc::new(source)));
        assert_send(&render(&state, "/services"));

        let (status, body) = get(create_router(state), "/services").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"data-block-id="1""#));
        assert!(body.find("Design").unwrap() < body.find("Build").unwrap());
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back() {
        let resolver = Resolver::new(Arc::new(FlakySource));
        let router = create_router(AppState::new(test_config(), resolver));

        let (status, body) = get(router, "/services").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Temporarily unavailable"));
    }

    #[tokio::test]
    async fn test_fetch_failure_partial_policy_renders_page() {
        let resolver = Resolver::new(Arc::new(FlakySource)).with_policy(FailurePolicy::Partial);
        let router = create_router(AppState::new(test_config(), resolver));

        let (status, body) = get(router, "/services").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<!-- block_hero:1 unavailable -->"));
    }
}
