//! Web layer - server-rendered pages and routing
//!
//! - Public pages: home, listings, search, article pages, SEO files
//! - Authentication pages
//! - Dashboard for signed-in users, the article editor for writers
//! - Admin back office
//! - Embedded static assets
//!
//! Every request runs through the viewer loader; state-changing requests
//! must also pass the same-origin check.

pub mod admin;
pub mod articles;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod session;
pub mod site;
pub mod static_files;
pub mod view;
pub mod writer;

use axum::{
    extract::Request,
    middleware::{self as axum_middleware, Next},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::models::{ADMIN_ROLES, WRITER_ROLES};

pub use middleware::{AppState, RequestStats};

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let dashboard_routes = dashboard::router()
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    let writer_routes = writer::router(state.config.upload.max_file_size)
        .route_layer(axum_middleware::from_fn(|request: Request, next: Next| {
            middleware::require_roles(WRITER_ROLES, request, next)
        }))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    let admin_routes = admin::router()
        .route_layer(axum_middleware::from_fn(|request: Request, next: Next| {
            middleware::require_roles(ADMIN_ROLES, request, next)
        }))
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    Router::new()
        .merge(site::router())
        .merge(auth::router())
        .merge(articles::router())
        .merge(dashboard_routes)
        .merge(writer_routes)
        .merge(admin_routes)
        .route("/static/{*path}", get(static_files::serve_static))
        .fallback(error::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::verify_origin,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            error::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_viewer,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::Config;
    use crate::models::Role;
    use crate::services::LoginRateLimiter;
    use crate::config::MediaKind;
    use crate::testing::{Failure, FakeBackend};
    use crate::web::articles::LikeResponse;
    use crate::web::writer::{PreviewResponse, UploadResponse};
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use std::sync::Arc;

    fn server(backend: &Arc<FakeBackend>) -> TestServer {
        server_with(backend, Config::default())
    }

    fn server_with(backend: &Arc<FakeBackend>, config: Config) -> TestServer {
        let state = AppState::new(
            config,
            backend.repositories(),
            Arc::new(MemoryCache::new()),
            Arc::new(LoginRateLimiter::new()),
        )
        .unwrap();
        TestServer::new(build_router(state)).unwrap()
    }

    fn cookie(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("session={}", token)).unwrap()
    }

    fn location(response: &axum_test::TestResponse) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_home_lists_published_articles() {
        let backend = FakeBackend::new();
        backend.add_published("a1", "first-story", "w1");
        let server = server(&backend);

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.text();
        assert!(body.contains("Newsroom"));
        assert!(body.contains("Article a1"));
        assert!(body.contains("/articles/first-story"));
    }

    #[tokio::test]
    async fn test_unknown_path_renders_404_page() {
        let server = server(&FakeBackend::new());

        let response = server.get("/no/such/page").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert!(response.text().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_dashboard_redirects_anonymous_to_login() {
        let server = server(&FakeBackend::new());

        let response = server.get("/dashboard/saved").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?next=%2Fdashboard%2Fsaved");
    }

    #[tokio::test]
    async fn test_role_gates() {
        let backend = FakeBackend::new();
        let reader = backend.add_user("u1", Role::User, "password123");
        let writer = backend.add_user("w1", Role::Writer, "password123");
        let server = server(&backend);

        let response = server
            .get("/admin")
            .add_header(header::COOKIE, cookie(&writer.token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/unauthorized");

        let response = server
            .get("/dashboard/articles/new")
            .add_header(header::COOKIE, cookie(&reader.token))
            .await;
        assert_eq!(location(&response), "/unauthorized");

        let response = server
            .get("/dashboard/articles/new")
            .add_header(header::COOKIE, cookie(&writer.token))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let backend = FakeBackend::new();
        backend.add_user("u1", Role::User, "password123");
        let server = server(&backend);

        let response = server
            .post("/login")
            .form(&[
                ("email", "useru1@example.com"),
                ("password", "password123"),
                ("next", "/dashboard/saved"),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard/saved");

        let cookies: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("session=token-") && c.contains("HttpOnly")));
        assert!(cookies.iter().any(|c| c.starts_with("flash=")));
    }

    #[tokio::test]
    async fn test_login_failure_rerenders_form() {
        let backend = FakeBackend::new();
        backend.add_user("u1", Role::User, "password123");
        let server = server(&backend);

        let response = server
            .post("/login")
            .form(&[("email", "useru1@example.com"), ("password", "wrong-password")])
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert!(response.text().contains("Invalid email or password."));
    }

    #[tokio::test]
    async fn test_cross_origin_post_is_rejected() {
        let backend = FakeBackend::new();
        backend.add_user("u1", Role::User, "password123");
        let server = server(&backend);

        let response = server
            .post("/login")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example"))
            .form(&[("email", "useru1@example.com"), ("password", "password123")])
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert!(response.text().contains("another site"));

        let response = server
            .post("/login")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:3000"))
            .form(&[("email", "useru1@example.com"), ("password", "password123")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_like_toggle_json() {
        let backend = FakeBackend::new();
        backend.add_published("a1", "story", "w1");
        let reader = backend.add_user("u1", Role::User, "password123");
        let server = server(&backend);

        let anonymous = server
            .post("/articles/a1/like")
            .json(&serde_json::json!({"liked": false, "likes": 0}))
            .await;
        assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .post("/articles/a1/like")
            .add_header(header::COOKIE, cookie(&reader.token))
            .json(&serde_json::json!({"liked": false, "likes": 0}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: LikeResponse = response.json();
        assert_eq!(
            body,
            LikeResponse {
                liked: true,
                likes: 1,
                error: None
            }
        );
    }

    #[tokio::test]
    async fn test_login_ignores_next_with_control_characters() {
        let backend = FakeBackend::new();
        let reader = backend.add_user("u1", Role::User, "password123");
        let server = server(&backend);

        let response = server
            .get("/login?next=/%09/evil.example")
            .add_header(header::COOKIE, cookie(&reader.token))
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");

        let response = server
            .post("/login")
            .form(&[
                ("email", "useru1@example.com"),
                ("password", "password123"),
                ("next", "/\t/evil.example"),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn test_anonymous_form_post_returns_to_referring_page() {
        let backend = FakeBackend::new();
        backend.add_published("a1", "story", "w1");
        let server = server(&backend);

        let response = server
            .post("/articles/a1/save")
            .add_header(
                header::REFERER,
                HeaderValue::from_static("http://localhost:3000/articles/story"),
            )
            .form(&[("slug", "story")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login?next=%2Farticles%2Fstory");

        let response = server
            .post("/articles/a1/save")
            .form(&[("slug", "story")])
            .await;
        assert_eq!(location(&response), "/login?next=%2F");
    }

    #[tokio::test]
    async fn test_like_failure_reverts_state() {
        let backend = FakeBackend::new();
        backend.add_published("a1", "story", "w1");
        let reader = backend.add_user("u1", Role::User, "password123");
        let server = server(&backend);

        // Caches the session so the viewer survives the outage below.
        let warm = server
            .get("/dashboard")
            .add_header(header::COOKIE, cookie(&reader.token))
            .await;
        assert_eq!(warm.status_code(), StatusCode::OK);

        backend.fail_with(Some(Failure::Unavailable));
        let response = server
            .post("/articles/a1/like")
            .add_header(header::COOKIE, cookie(&reader.token))
            .json(&serde_json::json!({"liked": false, "likes": 3}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        let body: LikeResponse = response.json();
        assert!(!body.liked);
        assert_eq!(body.likes, 3);
        assert!(body.error.is_some());
    }

    fn upload_form(name: &str, mime: &str, bytes: Vec<u8>) -> MultipartForm {
        MultipartForm::new().add_part("file", Part::bytes(bytes).file_name(name).mime_type(mime))
    }

    #[tokio::test]
    async fn test_editor_upload() {
        let backend = FakeBackend::new();
        let writer = backend.add_user("w1", Role::Writer, "password123");
        let mut config = Config::default();
        config.upload.max_file_size = 1024;
        let server = server_with(&backend, config);

        let response = server
            .post("/editor/upload")
            .add_header(header::COOKIE, cookie(&writer.token))
            .multipart(upload_form("cat.png", "image/png", vec![0u8; 512]))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: UploadResponse = response.json();
        assert_eq!(
            body,
            UploadResponse {
                url: "/uploads/cat.png".to_string(),
                kind: MediaKind::Image,
                shortcode: "[image src=\"/uploads/cat.png\" alt=\"cat\"]".to_string(),
            }
        );

        let response = server
            .post("/editor/upload")
            .add_header(header::COOKIE, cookie(&writer.token))
            .multipart(upload_form("doc.pdf", "application/pdf", vec![0u8; 16]))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(response.text().contains("not allowed"));

        let response = server
            .post("/editor/upload")
            .add_header(header::COOKIE, cookie(&writer.token))
            .multipart(upload_form("big.png", "image/png", vec![0u8; 2048]))
            .await;
        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.text().contains("too large"));

        let response = server
            .post("/editor/upload")
            .add_header(header::COOKIE, cookie(&writer.token))
            .multipart(MultipartForm::new().add_text("note", "no file here"))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert!(response.text().contains("No file provided."));

        assert_eq!(backend.calls("media.upload"), 1);
    }

    #[tokio::test]
    async fn test_editor_preview() {
        let backend = FakeBackend::new();
        let writer = backend.add_user("w1", Role::Writer, "password123");
        let server = server(&backend);

        let response = server
            .post("/editor/preview")
            .add_header(header::COOKIE, cookie(&writer.token))
            .json(&serde_json::json!({"content": "# Title\n\n<script>x</script>"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: PreviewResponse = response.json();
        assert!(body.html.contains("<h1"));
        assert!(!body.html.contains("<script>"));

        let anonymous = server
            .post("/editor/preview")
            .json(&serde_json::json!({"content": "# Title"}))
            .await;
        assert_eq!(anonymous.status_code(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_seo_files() {
        let server = server(&FakeBackend::new());

        let robots = server.get("/robots.txt").await;
        assert_eq!(robots.status_code(), StatusCode::OK);
        assert!(robots.text().contains("Sitemap: http://localhost:3000/sitemap.xml"));

        let ads = server.get("/ads.txt").await;
        assert_eq!(ads.status_code(), StatusCode::NOT_FOUND);

        let css = server.get("/static/app.css").await;
        assert_eq!(css.status_code(), StatusCode::OK);
    }
}
