//! Writer area: article management and the editor endpoints
//!
//! - `/dashboard/articles` - own articles (GET), create (POST)
//! - `/dashboard/articles/new`, `/dashboard/articles/{id}/edit` - editor
//! - `POST /dashboard/articles/{id}`, `POST /dashboard/articles/{id}/delete`
//! - `POST /editor/upload` - media upload relayed to the backend
//! - `POST /editor/preview` - rendered markdown for the preview pane

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MediaKind;
use crate::models::{Article, ArticleInput, ArticleStatus, AuthSession, PagedResult};
use crate::services::ServiceError;
use crate::web::error::{form_failure, requires_login, status_for, WebError};
use crate::web::flash;
use crate::web::middleware::AppState;
use crate::web::view::{field_errors, form_context, Page, PageQuery};

/// Rows per page in the writer's article table
const ARTICLES_PER_PAGE: u32 = 20;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

const STATUSES: [ArticleStatus; 3] = [
    ArticleStatus::Draft,
    ArticleStatus::Published,
    ArticleStatus::Archived,
];

/// Routes here expect `require_auth` and a writer role gate to have run
pub fn router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/dashboard/articles", get(my_articles).post(create_article))
        .route("/dashboard/articles/new", get(new_article))
        .route("/dashboard/articles/{id}", post(update_article))
        .route("/dashboard/articles/{id}/edit", get(edit_article))
        .route("/dashboard/articles/{id}/delete", post(delete_article))
        .route(
            "/editor/upload",
            post(upload_media).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/editor/preview", post(preview))
}

async fn my_articles(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
    page: Page,
) -> Result<Response, WebError> {
    let mut context = tera::Context::new();
    let articles = match state
        .articles
        .list_mine(&session, query.number(), ARTICLES_PER_PAGE)
        .await
    {
        Ok(articles) => articles,
        Err(err) if requires_login(&err) => return Err(WebError::LoginRequired),
        Err(err) => {
            context.insert("error", &err.user_message());
            PagedResult::empty(query.number())
        }
    };

    context.insert("articles", &articles);
    context.insert("page_base", "/dashboard/articles?");
    Ok(page.render("dashboard/articles.html", &context))
}

/// Editor form as submitted and as redisplayed
#[derive(Debug, Deserialize, Serialize)]
struct ArticleForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    category_id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    cover_image: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    premium: bool,
}

impl Default for ArticleForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            category_id: String::new(),
            content: String::new(),
            excerpt: String::new(),
            cover_image: String::new(),
            status: ArticleStatus::Draft.as_str().to_string(),
            premium: false,
        }
    }
}

impl From<&Article> for ArticleForm {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            category_id: article
                .category
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_default(),
            content: article.content.clone(),
            excerpt: article.excerpt.clone().unwrap_or_default(),
            cover_image: article.cover_image.clone().unwrap_or_default(),
            status: article.status.as_str().to_string(),
            premium: article.premium,
        }
    }
}

impl ArticleForm {
    fn to_input(&self) -> ArticleInput {
        ArticleInput {
            title: self.title.clone(),
            content: self.content.clone(),
            excerpt: Some(self.excerpt.clone()),
            cover_image: Some(self.cover_image.clone()),
            category_id: self.category_id.trim().to_string(),
            status: ArticleStatus::parse(&self.status).unwrap_or_default(),
            premium: self.premium,
        }
    }
}

struct EditorPage<'a> {
    article_id: Option<&'a str>,
    form: &'a ArticleForm,
    errors: BTreeMap<String, String>,
    error: Option<String>,
}

async fn render_editor(
    state: &AppState,
    page: &Page,
    status: StatusCode,
    editor: EditorPage<'_>,
) -> Response {
    let categories = state.categories.list().await;
    let statuses: Vec<&str> = STATUSES.iter().map(ArticleStatus::as_str).collect();

    let mut context = form_context(editor.form, editor.errors, editor.error);
    context.insert("categories", &categories);
    context.insert("statuses", &statuses);
    match editor.article_id {
        Some(id) => {
            context.insert("article_id", id);
            context.insert("action", &format!("/dashboard/articles/{}", id));
        }
        None => context.insert("action", "/dashboard/articles"),
    }
    page.render_status(status, "dashboard/editor.html", &context)
}

async fn new_article(State(state): State<AppState>, page: Page) -> Response {
    let form = ArticleForm::default();
    let editor = EditorPage {
        article_id: None,
        form: &form,
        errors: BTreeMap::new(),
        error: None,
    };
    render_editor(&state, &page, StatusCode::OK, editor).await
}

/// Redisplay the editor after a failed save
async fn editor_failure(
    state: &AppState,
    page: &Page,
    article_id: Option<&str>,
    form: &ArticleForm,
    err: ServiceError,
) -> Result<Response, WebError> {
    if requires_login(&err) {
        return Err(WebError::LoginRequired);
    }
    let (status, error) = form_failure(&err);
    let editor = EditorPage {
        article_id,
        form,
        errors: field_errors(err.field_errors()),
        error,
    };
    Ok(render_editor(state, page, status, editor).await)
}

async fn create_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
    Form(form): Form<ArticleForm>,
) -> Result<Response, WebError> {
    match state.articles.create(&session, form.to_input()).await {
        Ok(article) => Ok(flash::success(
            &format!("/dashboard/articles/{}/edit", article.id),
            "Article created.",
        )),
        Err(err) => editor_failure(&state, &page, None, &form, err).await,
    }
}

async fn edit_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    page: Page,
) -> Result<Response, WebError> {
    let article = state.articles.get_for_edit(&session, &id).await?;
    let form = ArticleForm::from(&article);
    let editor = EditorPage {
        article_id: Some(&article.id),
        form: &form,
        errors: BTreeMap::new(),
        error: None,
    };
    Ok(render_editor(&state, &page, StatusCode::OK, editor).await)
}

async fn update_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    page: Page,
    Form(form): Form<ArticleForm>,
) -> Result<Response, WebError> {
    match state.articles.update(&session, &id, form.to_input()).await {
        Ok(_) => Ok(flash::success(
            &format!("/dashboard/articles/{}/edit", id),
            "Article saved.",
        )),
        Err(err @ (ServiceError::Forbidden(_) | ServiceError::NotFound(_))) => Err(err.into()),
        Err(err) => editor_failure(&state, &page, Some(&id), &form, err).await,
    }
}

async fn delete_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let result = state.articles.delete(&session, &id).await;
    flash::after_action(result, "/dashboard/articles", "Article deleted.")
}

/// JSON error body for the editor endpoints
#[derive(Debug)]
struct EditorError {
    status: StatusCode,
    message: String,
}

impl EditorError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for EditorError {
    fn from(err: ServiceError) -> Self {
        Self::new(status_for(&err), err.user_message())
    }
}

impl IntoResponse for EditorError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// Stored media and the shortcode that embeds it
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub url: String,
    pub kind: MediaKind,
    pub shortcode: String,
}

/// Shortcode the editor inserts for an uploaded file
fn media_shortcode(kind: MediaKind, url: &str, filename: &str) -> String {
    match kind {
        MediaKind::Image => {
            let alt: String = filename
                .rsplit_once('.')
                .map_or(filename, |(stem, _)| stem)
                .chars()
                .filter(|c| !matches!(c, '"' | '[' | ']'))
                .collect();
            format!("[image src=\"{}\" alt=\"{}\"]", url, alt)
        }
        MediaKind::Video => format!("[video src=\"{}\"]", url),
    }
}

/// Relay a pasted or dropped file to the backend.
///
/// Type and size are checked here first so a bad file never leaves the
/// process.
async fn upload_media(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, EditorError> {
    let config = &state.config.upload;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EditorError::new(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let kind = config.media_kind(&content_type).ok_or_else(|| {
            EditorError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "This file type is not allowed.",
            )
        })?;

        let data = field.bytes().await.map_err(|_| {
            EditorError::new(StatusCode::PAYLOAD_TOO_LARGE, "The file is too large.")
        })?;
        if data.len() as u64 > config.max_file_size {
            return Err(EditorError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "The file is too large.",
            ));
        }

        let stored = state
            .media
            .upload(&session.token, &filename, &content_type, data.to_vec())
            .await
            .map_err(|e| EditorError::from(ServiceError::from(e)))?;

        tracing::info!(
            user_id = %session.user.id,
            content_type = %content_type,
            size = data.len(),
            "Media uploaded"
        );
        return Ok(Json(UploadResponse {
            shortcode: media_shortcode(kind, &stored.url, &filename),
            url: stored.url,
            kind,
        }));
    }

    Err(EditorError::new(StatusCode::BAD_REQUEST, "No file provided."))
}

#[derive(Debug, Deserialize)]
struct PreviewRequest {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub html: String,
}

async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Json<PreviewResponse> {
    Json(PreviewResponse {
        html: state.articles.preview(&request.content),
    })
}
