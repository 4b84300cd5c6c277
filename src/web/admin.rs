//! Admin back office
//!
//! - `/admin` - system stats
//! - `/admin/users` - user moderation (role, status, delete)
//! - `/admin/articles` - article moderation (status, delete)
//! - `/admin/categories` - category management
//! - `/admin/comments` - comment moderation
//! - `POST /admin/templates/reload` - re-read the template override directory

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Extension, Form, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tera::Context as TeraContext;

use crate::models::{assignable_roles, ArticleStatus, AuthSession, ListParams, PagedResult, Role, User};
use crate::services::ServiceError;
use crate::web::error::{form_failure, requires_login, WebError};
use crate::web::flash;
use crate::web::middleware::AppState;
use crate::web::view::{field_errors, form_context, Page, PageQuery};

/// Rows per page in moderation tables
const ROWS_PER_PAGE: u32 = 20;

/// Routes here expect `require_auth` and an admin role gate to have run
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(overview))
        .route("/admin/users", get(users))
        .route("/admin/users/{id}/role", post(change_role))
        .route("/admin/users/{id}/status", post(set_user_status))
        .route("/admin/users/{id}/delete", post(delete_user))
        .route("/admin/articles", get(articles))
        .route("/admin/articles/{id}/status", post(set_article_status))
        .route("/admin/articles/{id}/delete", post(delete_article))
        .route("/admin/categories", get(categories).post(create_category))
        .route("/admin/categories/{id}", post(update_category))
        .route("/admin/categories/{id}/delete", post(delete_category))
        .route("/admin/comments", get(comments))
        .route("/admin/comments/{id}/delete", post(delete_comment))
        .route("/admin/templates/reload", post(reload_templates))
}

/// Log-in-again for a rejected session, otherwise the moderation page
/// shows the failure in place of its table.
fn listing_failure(err: ServiceError, context: &mut TeraContext) -> Result<(), WebError> {
    if requires_login(&err) {
        return Err(WebError::LoginRequired);
    }
    if matches!(err, ServiceError::Forbidden(_)) {
        return Err(err.into());
    }
    context.insert("error", &err.user_message());
    Ok(())
}

async fn overview(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
) -> Result<Response, WebError> {
    let stats = state.admin.stats(&session).await?;
    let mut context = TeraContext::new();
    context.insert("stats", &stats);
    Ok(page.render("admin/index.html", &context))
}

// ============================================================================
// Users
// ============================================================================

/// One row of the user table with the actions the viewer may take on it
#[derive(Debug, Serialize)]
struct UserRow {
    user: User,
    roles: Vec<Role>,
    can_toggle: bool,
    can_delete: bool,
}

impl UserRow {
    fn new(actor: &User, user: User) -> Self {
        let is_self = actor.id == user.id;
        Self {
            roles: assignable_roles(actor, &user),
            can_toggle: !is_self && user.role != Role::Superadmin,
            can_delete: !is_self && actor.role == Role::Superadmin,
            user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsersQuery {
    #[serde(default)]
    search: String,
    #[serde(flatten)]
    page: PageQuery,
}

async fn users(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<UsersQuery>,
    page: Page,
) -> Result<Response, WebError> {
    let search = query.search.trim();
    let mut context = TeraContext::new();

    let rows = match state
        .admin
        .users(&session, query.page.number(), Some(search))
        .await
    {
        Ok(result) => result.map(|user| UserRow::new(&session.user, user)),
        Err(err) => {
            listing_failure(err, &mut context)?;
            PagedResult::empty(query.page.number())
        }
    };

    context.insert("users", &rows);
    context.insert("search", search);
    context.insert(
        "page_base",
        &format!("/admin/users?search={}&", urlencoding::encode(search)),
    );
    Ok(page.render("admin/users.html", &context))
}

#[derive(Debug, Deserialize)]
struct RoleForm {
    role: String,
}

async fn change_role(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<RoleForm>,
) -> Response {
    let Ok(role) = Role::from_str(&form.role) else {
        return flash::error("/admin/users", "Unknown role.");
    };
    let result = state.admin.change_role(&session, &id, role).await;
    flash::after_action(result, "/admin/users", "Role updated.")
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    active: bool,
}

async fn set_user_status(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let result = state.admin.set_active(&session, &id, form.active).await;
    let message = if form.active {
        "User activated."
    } else {
        "User deactivated."
    };
    flash::after_action(result, "/admin/users", message)
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let result = state.admin.delete_user(&session, &id).await;
    flash::after_action(result, "/admin/users", "User deleted.")
}

// ============================================================================
// Articles
// ============================================================================

#[derive(Debug, Deserialize)]
struct ArticlesQuery {
    #[serde(default)]
    status: String,
    #[serde(flatten)]
    page: PageQuery,
}

async fn articles(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<ArticlesQuery>,
    page: Page,
) -> Result<Response, WebError> {
    let status = ArticleStatus::parse(&query.status);
    let mut params = ListParams::new(query.page.number(), ROWS_PER_PAGE);
    if let Some(status) = status {
        params = params.with_status(status);
    }

    let mut context = TeraContext::new();
    let articles = match state.articles.list_admin(&session, params).await {
        Ok(articles) => articles,
        Err(err) => {
            listing_failure(err, &mut context)?;
            PagedResult::empty(query.page.number())
        }
    };

    let status_str = status.map(|s| s.as_str()).unwrap_or("");
    let statuses = [
        ArticleStatus::Draft.as_str(),
        ArticleStatus::Published.as_str(),
        ArticleStatus::Archived.as_str(),
    ];
    context.insert("articles", &articles);
    context.insert("statuses", &statuses);
    context.insert("status", status_str);
    context.insert(
        "page_base",
        &format!("/admin/articles?status={}&", status_str),
    );
    Ok(page.render("admin/articles.html", &context))
}

#[derive(Debug, Deserialize)]
struct ArticleStatusForm {
    status: String,
}

async fn set_article_status(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<ArticleStatusForm>,
) -> Response {
    let Some(status) = ArticleStatus::parse(&form.status) else {
        return flash::error("/admin/articles", "Unknown status.");
    };
    let result = state.articles.set_status(&session, &id, status).await;
    flash::after_action(result, "/admin/articles", "Article status updated.")
}

async fn delete_article(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let result = state.articles.delete(&session, &id).await;
    flash::after_action(result, "/admin/articles", "Article deleted.")
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
struct CategoryForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    description: String,
}

async fn render_categories(
    state: &AppState,
    page: &Page,
    status: axum::http::StatusCode,
    form: &CategoryForm,
    errors: BTreeMap<String, String>,
    error: Option<String>,
) -> Response {
    let categories = state.categories.list().await;
    let mut context = form_context(form, errors, error);
    context.insert("categories", &categories);
    page.render_status(status, "admin/categories.html", &context)
}

async fn categories(State(state): State<AppState>, page: Page) -> Response {
    render_categories(
        &state,
        &page,
        axum::http::StatusCode::OK,
        &CategoryForm::default(),
        BTreeMap::new(),
        None,
    )
    .await
}

async fn create_category(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
    Form(form): Form<CategoryForm>,
) -> Result<Response, WebError> {
    let result = state
        .categories
        .create(&session, &form.name, Some(&form.slug), Some(&form.description))
        .await;

    match result {
        Ok(category) => Ok(flash::success(
            "/admin/categories",
            &format!("Category \"{}\" created.", category.name),
        )),
        Err(err) if requires_login(&err) => Err(WebError::LoginRequired),
        Err(err) => {
            let (status, error) = form_failure(&err);
            let errors = field_errors(err.field_errors());
            Ok(render_categories(&state, &page, status, &form, errors, error).await)
        }
    }
}

async fn update_category(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Response {
    let result = state
        .categories
        .update(&session, &id, &form.name, Some(&form.slug), Some(&form.description))
        .await;
    flash::after_action(result, "/admin/categories", "Category updated.")
}

async fn delete_category(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let result = state.categories.delete(&session, &id).await;
    flash::after_action(result, "/admin/categories", "Category deleted.")
}

// ============================================================================
// Comments
// ============================================================================

async fn comments(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
    page: Page,
) -> Result<Response, WebError> {
    let mut context = TeraContext::new();
    let comments = match state
        .comments
        .list_all(&session, query.number(), ROWS_PER_PAGE)
        .await
    {
        Ok(comments) => comments,
        Err(err) => {
            listing_failure(err, &mut context)?;
            PagedResult::empty(query.number())
        }
    };

    context.insert("comments", &comments);
    context.insert("page_base", "/admin/comments?");
    Ok(page.render("admin/comments.html", &context))
}

async fn delete_comment(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Response {
    let result = state.comments.delete_as_admin(&session, &id).await;
    flash::after_action(result, "/admin/comments", "Comment deleted.")
}

async fn reload_templates(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Response {
    let result = state
        .theme_engine
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .reload_templates();

    match result {
        Ok(()) => {
            tracing::info!(user_id = %session.user.id, "Templates reloaded from the admin panel");
            flash::success("/admin", "Templates reloaded.")
        }
        Err(e) => {
            tracing::error!("Template reload failed: {}", e);
            flash::error("/admin", &format!("Template reload failed: {}", e))
        }
    }
}
