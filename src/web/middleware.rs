//! Web middleware
//!
//! Contains middleware for:
//! - Loading the viewer's session on every request
//! - Authentication and role gates for dashboard routes
//! - Same-origin checks on form posts
//! - Request statistics

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::backend::repositories::MediaRepository;
use crate::backend::Repositories;
use crate::cache::{CacheWindows, SharedCache};
use crate::config::Config;
use crate::models::{AuthSession, Role};
use crate::services::{
    AdminService, ArticleService, AuthService, CategoryService, CommentService, ContentRenderer,
    EngagementService, LoginRateLimiter,
};
use crate::theme::{ThemeEngine, ThemeError};
use crate::web::error::WebError;
use crate::web::session::SESSION_COOKIE;
use crate::web::view::safe_redirect;

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub articles: Arc<ArticleService>,
    pub comments: Arc<CommentService>,
    pub categories: Arc<CategoryService>,
    pub engagement: Arc<EngagementService>,
    pub admin: Arc<AdminService>,
    pub media: Arc<dyn MediaRepository>,
    pub theme_engine: Arc<RwLock<ThemeEngine>>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire services over the given repositories
    pub fn new(
        config: Config,
        repositories: Repositories,
        cache: SharedCache,
        limiter: Arc<LoginRateLimiter>,
    ) -> Result<Self, ThemeError> {
        let windows = CacheWindows::from(&config.cache);
        let theme_engine = ThemeEngine::new(config.theme.path.as_deref())?;
        let renderer = Arc::new(ContentRenderer::new());

        Ok(Self {
            auth: Arc::new(AuthService::new(
                repositories.auth,
                cache.clone(),
                windows,
                limiter,
            )),
            articles: Arc::new(ArticleService::new(
                repositories.articles,
                cache.clone(),
                windows,
                renderer,
            )),
            comments: Arc::new(CommentService::new(repositories.comments)),
            categories: Arc::new(CategoryService::new(
                repositories.categories,
                cache.clone(),
                windows,
            )),
            engagement: Arc::new(EngagementService::new(repositories.engagement)),
            admin: Arc::new(AdminService::new(
                repositories.users,
                repositories.stats,
                cache,
            )),
            media: repositories.media,
            theme_engine: Arc::new(RwLock::new(theme_engine)),
            request_stats: Arc::new(RequestStats::new()),
            config: Arc::new(config),
        })
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// Session of whoever made the request, if signed in
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthSession>);

impl Viewer {
    pub fn session(&self) -> Option<&AuthSession> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// Client address for rate limiting: proxy headers first, then the socket
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .or_else(|| {
                parts
                    .headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
            })
            .and_then(|v| v.trim().parse::<IpAddr>().ok());

        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip())
        });
        Ok(ClientIp(ip))
    }
}

/// Extract the session token: `Authorization: Bearer` first, then the cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string()).filter(|t| !t.is_empty());
    }

    read_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty())
}

/// Value of the named cookie
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Load the viewer on every request.
///
/// An unreachable backend leaves the viewer signed out for this request
/// rather than failing the page.
pub async fn load_viewer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut viewer = Viewer::default();

    if let Some(token) = extract_session_token(request.headers()) {
        match state.auth.current_user(&token).await {
            Ok(Some(user)) => viewer = Viewer(Some(AuthSession { token, user })),
            Ok(None) => tracing::debug!("Ignoring expired session token"),
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }

    request.extensions_mut().insert(viewer);
    next.run(request).await
}

/// Redirect anonymous visitors to the login page
pub async fn require_auth(mut request: Request, next: Next) -> Response {
    let session = request
        .extensions()
        .get::<Viewer>()
        .and_then(|v| v.0.clone());

    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => {
            let next_path = if matches!(*request.method(), Method::GET | Method::HEAD) {
                request
                    .uri()
                    .path_and_query()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string())
            } else {
                // Form actions have no page of their own; return to the form.
                referer_path(request.headers()).unwrap_or_else(|| "/".to_string())
            };
            let target = format!("/login?next={}", urlencoding::encode(&next_path));
            Redirect::to(&target).into_response()
        }
    }
}

/// Local path and query of the `Referer` header
fn referer_path(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let (_, rest) = referer.split_once("://")?;
    let path = rest.find('/').map_or("/", |start| &rest[start..]);
    let path = path.split('#').next().unwrap_or(path);
    safe_redirect(Some(path)).map(str::to_string)
}

/// Redirect viewers without one of `roles` to `/unauthorized`
pub async fn require_roles(roles: &'static [Role], request: Request, next: Next) -> Response {
    let allowed = request
        .extensions()
        .get::<AuthSession>()
        .map_or(false, |s| s.user.has_any_role(roles));

    if allowed {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Role gate denied access");
        Redirect::to("/unauthorized").into_response()
    }
}

/// `scheme://host[:port]` of a URL, lowercased
fn origin_of(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    if authority.is_empty() {
        return None;
    }
    Some(format!("{}://{}", scheme, authority).to_ascii_lowercase())
}

/// Reject cross-site form posts.
///
/// Requests that change state must come from a page on this site: their
/// `Origin` (or, failing that, `Referer`) has to match the public URL.
/// Requests carrying neither header are not from a browser form and pass.
pub async fn verify_origin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let claimed = headers
        .get(header::ORIGIN)
        .or_else(|| headers.get(header::REFERER))
        .and_then(|v| v.to_str().ok());

    if let Some(claimed) = claimed {
        let expected = origin_of(state.config.public_url());
        if origin_of(claimed) != expected {
            tracing::warn!(
                origin = claimed,
                path = %request.uri().path(),
                "Rejected cross-origin request"
            );
            return Err(WebError::forbidden("This request came from another site."));
        }
    }

    Ok(next.run(request).await)
}

/// Request statistics middleware
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .request_stats
        .record(start.elapsed().as_micros() as u64);
    response
}
