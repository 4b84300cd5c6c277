//! Dashboard for every signed-in user
//!
//! - `/dashboard` - overview
//! - `/dashboard/saved` - saved articles
//! - `/dashboard/profile` - profile form (GET, POST)
//! - `POST /dashboard/password` - password change

use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Extension, Form, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tera::Context as TeraContext;

use crate::models::{AuthSession, PagedResult, User};
use crate::web::error::{form_failure, requires_login, WebError};
use crate::web::flash;
use crate::web::middleware::AppState;
use crate::web::view::{field_errors, form_context, Page};

/// Recent articles shown on the overview
const RECENT_ARTICLES: u32 = 5;

/// Routes here expect `require_auth` to have run
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(overview))
        .route("/dashboard/saved", get(saved))
        .route("/dashboard/profile", get(profile_page).post(update_profile))
        .route("/dashboard/password", post(change_password))
}

async fn overview(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
) -> Response {
    let saved = state.engagement.saved(&session).await;

    let mut context = TeraContext::new();
    context.insert("saved_count", &saved.len());
    if session.user.is_writer() {
        let mine = state
            .articles
            .list_mine(&session, 1, RECENT_ARTICLES)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(user_id = %session.user.id, "Failed to load own articles: {}", e);
                PagedResult::empty(1)
            });
        context.insert("my_articles", &mine);
    }
    page.render("dashboard/index.html", &context)
}

async fn saved(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
) -> Response {
    let articles = state.engagement.saved(&session).await;
    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    page.render("dashboard/saved.html", &context)
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ProfileForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    avatar: String,
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            bio: user.bio.clone().unwrap_or_default(),
            avatar: user.avatar.clone().unwrap_or_default(),
        }
    }
}

/// Profile page context; the password form has its own error slots
fn profile_context(
    form: &ProfileForm,
    errors: BTreeMap<String, String>,
    error: Option<String>,
    password_errors: BTreeMap<String, String>,
    password_error: Option<String>,
) -> TeraContext {
    let mut context = form_context(form, errors, error);
    context.insert("password_errors", &password_errors);
    if let Some(password_error) = password_error {
        context.insert("password_error", &password_error);
    }
    context
}

async fn profile_page(Extension(session): Extension<AuthSession>, page: Page) -> Response {
    let context = profile_context(
        &ProfileForm::from(&session.user),
        BTreeMap::new(),
        None,
        BTreeMap::new(),
        None,
    );
    page.render("dashboard/profile.html", &context)
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
    Form(form): Form<ProfileForm>,
) -> Result<Response, WebError> {
    let result = state
        .auth
        .update_profile(&session, &form.name, Some(&form.bio), Some(&form.avatar))
        .await;

    match result {
        Ok(_) => Ok(flash::success("/dashboard/profile", "Profile updated.")),
        Err(err) if requires_login(&err) => Err(WebError::LoginRequired),
        Err(err) => {
            let (status, error) = form_failure(&err);
            let context = profile_context(
                &form,
                field_errors(err.field_errors()),
                error,
                BTreeMap::new(),
                None,
            );
            Ok(page.render_status(status, "dashboard/profile.html", &context))
        }
    }
}

#[derive(Debug, Deserialize)]
struct PasswordForm {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    page: Page,
    Form(form): Form<PasswordForm>,
) -> Result<Response, WebError> {
    let result = state
        .auth
        .change_password(
            &session,
            &form.current_password,
            &form.new_password,
            &form.confirm_password,
        )
        .await;

    match result {
        Ok(()) => Ok(flash::success("/dashboard/profile", "Password changed.")),
        Err(err) if requires_login(&err) => Err(WebError::LoginRequired),
        Err(err) => {
            let (status, error) = form_failure(&err);
            let context = profile_context(
                &ProfileForm::from(&session.user),
                BTreeMap::new(),
                None,
                field_errors(err.field_errors()),
                error,
            );
            Ok(page.render_status(status, "dashboard/profile.html", &context))
        }
    }
}
