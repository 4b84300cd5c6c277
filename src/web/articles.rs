//! Article page and reader actions
//!
//! - `GET /articles/{slug}` - article with comments
//! - `POST /articles/{id}/like` - JSON like toggle
//! - `POST /articles/{id}/save`, `POST /articles/{id}/unsave`
//! - `POST /articles/{slug}/comments`, `POST /comments/{id}/delete`
//!
//! The second segment of `/articles/...` is a slug for reading and
//! commenting and an id for likes and saves; the router names it
//! `{article}` for both.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::models::{AuthSession, LikeState};
use crate::web::error::WebError;
use crate::web::flash;
use crate::web::middleware::{self as web_middleware, AppState, Viewer};
use crate::web::view::{safe_redirect, Page};

pub fn router() -> Router<AppState> {
    let actions = Router::new()
        .route("/articles/{article}/save", post(save_article))
        .route("/articles/{article}/unsave", post(unsave_article))
        .route("/articles/{article}/comments", post(create_comment))
        .route("/comments/{id}/delete", post(delete_comment))
        .route_layer(middleware::from_fn(web_middleware::require_auth));

    Router::new()
        .route("/articles/{article}", get(show_article))
        .route("/articles/{article}/like", post(toggle_like))
        .merge(actions)
}

fn article_path(slug: &str) -> String {
    format!("/articles/{}", urlencoding::encode(slug))
}

async fn show_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    viewer: Viewer,
    page: Page,
) -> Result<Response, WebError> {
    let session = viewer.session();
    let view = state
        .articles
        .get_for_reader(&slug, session)
        .await?
        .ok_or_else(WebError::not_found)?;
    let article_id = view.article.id.clone();

    let threads = state.comments.threads(&article_id).await;
    let (like, saved) = match session {
        Some(session) => tokio::join!(
            state
                .engagement
                .like_status(session, &article_id, view.article.likes),
            state.engagement.is_saved(session, &article_id)
        ),
        None => (LikeState::new(false, view.article.likes), false),
    };

    let mut context = TeraContext::new();
    context.insert("view", &view);
    context.insert("like", &like);
    context.insert("saved", &saved);
    context.insert("threads", &threads);
    Ok(page.render("article.html", &context))
}

/// Body of a like response; `error` is set when the toggle was reverted
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LikeResponse {
    fn new(state: LikeState, error: Option<String>) -> Self {
        Self {
            liked: state.liked,
            likes: state.likes,
            error,
        }
    }
}

/// Toggle a like. The body is the state the page showed before the click.
async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    viewer: Viewer,
    Json(current): Json<LikeState>,
) -> Response {
    let Some(session) = viewer.session() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(LikeResponse::new(
                current,
                Some("Please log in to like articles.".to_string()),
            )),
        )
            .into_response();
    };

    let outcome = state.engagement.toggle_like(session, &id, current).await;
    let status = if outcome.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(LikeResponse::new(outcome.state, outcome.error))).into_response()
}

#[derive(Debug, Deserialize)]
struct SaveForm {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    redirect: Option<String>,
}

impl SaveForm {
    fn target(&self) -> String {
        if let Some(target) = safe_redirect(self.redirect.as_deref()) {
            return target.to_string();
        }
        match self.slug.as_deref().filter(|s| !s.is_empty()) {
            Some(slug) => article_path(slug),
            None => "/dashboard/saved".to_string(),
        }
    }
}

async fn save_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<SaveForm>,
) -> Response {
    let result = state.engagement.save(&session, &id).await;
    flash::after_action(result, &form.target(), "Article saved.")
}

async fn unsave_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<SaveForm>,
) -> Response {
    let result = state.engagement.unsave(&session, &id).await;
    flash::after_action(result, &form.target(), "Removed from your saved articles.")
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    article_id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    parent_id: Option<String>,
}

async fn create_comment(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let result = state
        .comments
        .create(&session, &form.article_id, &form.content, form.parent_id.as_deref())
        .await;
    let target = format!("{}#comments", article_path(&slug));
    flash::after_action(result, &target, "Comment posted.")
}

#[derive(Debug, Deserialize)]
struct DeleteCommentForm {
    article_id: String,
    #[serde(default)]
    slug: String,
}

async fn delete_comment(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<DeleteCommentForm>,
) -> Response {
    let result = state.comments.delete(&session, &form.article_id, &id).await;
    let target = if form.slug.is_empty() {
        "/".to_string()
    } else {
        format!("{}#comments", article_path(&form.slug))
    };
    flash::after_action(result, &target, "Comment deleted.")
}
