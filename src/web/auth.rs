//! Authentication pages
//!
//! - `/login`, `/register` (GET form, POST action)
//! - `POST /logout`
//! - `/forgot-password`, `/reset-password`

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};

use crate::models::AuthSession;
use crate::services::ServiceError;
use crate::web::error::{form_failure, WebError};
use crate::web::flash;
use crate::web::middleware::{AppState, ClientIp, Viewer};
use crate::web::session;
use crate::web::view::{field_errors, form_context, safe_redirect, Page};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", post(logout))
        .route("/forgot-password", get(forgot_password_page).post(forgot_password))
        .route("/reset-password", get(reset_password_page).post(reset_password))
}

/// Redirect into the site with the session cookie set
fn signed_in(
    state: &AppState,
    session: &AuthSession,
    to: &str,
    message: &str,
) -> Result<Response, WebError> {
    let secure = state.config.public_url().starts_with("https://");
    let cookie = HeaderValue::from_str(&session::set_cookie(&session.token, secure)).map_err(|_| {
        tracing::error!("Backend issued a token that cannot be stored in a cookie");
        WebError::new(
            StatusCode::BAD_GATEWAY,
            "The server ran into a problem. Please try again later.",
        )
    })?;

    let mut response = flash::success(to, message);
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
struct NextQuery {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct LoginValues {
    email: String,
}

async fn login_page(
    Query(query): Query<NextQuery>,
    viewer: Viewer,
    page: Page,
) -> Response {
    let next = safe_redirect(query.next.as_deref()).unwrap_or("");
    if viewer.session().is_some() {
        let to = if next.is_empty() { "/dashboard" } else { next };
        return Redirect::to(to).into_response();
    }

    let mut context = form_context(&LoginValues::default(), Default::default(), None);
    context.insert("next", next);
    page.render("login.html", &context)
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    next: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    page: Page,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let next = safe_redirect(form.next.as_deref()).unwrap_or("");

    match state.auth.login(&form.email, &form.password, ip).await {
        Ok(session) => {
            let to = if next.is_empty() { "/dashboard" } else { next };
            let message = format!("Welcome back, {}.", session.user.name);
            signed_in(&state, &session, to, &message)
        }
        Err(err) => {
            let (status, error) = match &err {
                ServiceError::Backend(backend)
                    if matches!(backend.status_code(), Some(400 | 401)) =>
                {
                    (StatusCode::UNAUTHORIZED, Some(INVALID_CREDENTIALS.to_string()))
                }
                other => form_failure(other),
            };

            let values = LoginValues {
                email: form.email.trim().to_string(),
            };
            let mut context = form_context(&values, field_errors(err.field_errors()), error);
            context.insert("next", next);
            Ok(page.render_status(status, "login.html", &context))
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct RegisterValues {
    name: String,
    email: String,
}

async fn register_page(viewer: Viewer, page: Page) -> Response {
    if viewer.session().is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    let context = form_context(&RegisterValues::default(), Default::default(), None);
    page.render("register.html", &context)
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

async fn register(
    State(state): State<AppState>,
    page: Page,
    Form(form): Form<RegisterForm>,
) -> Result<Response, WebError> {
    let result = state
        .auth
        .register(&form.name, &form.email, &form.password, &form.confirm_password)
        .await;

    match result {
        Ok(session) => {
            let message = format!("Welcome to {}, {}.", state.config.site.name, session.user.name);
            signed_in(&state, &session, "/dashboard", &message)
        }
        Err(err) => {
            let (status, error) = form_failure(&err);
            let values = RegisterValues {
                name: form.name.trim().to_string(),
                email: form.email.trim().to_string(),
            };
            let context = form_context(&values, field_errors(err.field_errors()), error);
            Ok(page.render_status(status, "register.html", &context))
        }
    }
}

async fn logout(State(state): State<AppState>, viewer: Viewer) -> Response {
    if let Some(session) = viewer.session() {
        state.auth.logout(&session.token).await;
        tracing::info!(user_id = %session.user.id, "User logged out");
    }

    let mut response = flash::success("/", "You have been logged out.");
    response.headers_mut().append(
        header::SET_COOKIE,
        HeaderValue::from_static(session::clear_cookie()),
    );
    response
}

async fn forgot_password_page(page: Page) -> Response {
    let context = form_context(&LoginValues::default(), Default::default(), None);
    page.render("forgot_password.html", &context)
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordForm {
    #[serde(default)]
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    page: Page,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let values = LoginValues {
        email: form.email.trim().to_string(),
    };

    match state.auth.forgot_password(&form.email).await {
        Ok(()) => {
            let mut context = form_context(&values, Default::default(), None);
            context.insert("sent", &true);
            page.render("forgot_password.html", &context)
        }
        Err(err) => {
            let (status, error) = form_failure(&err);
            let context = form_context(&values, field_errors(err.field_errors()), error);
            page.render_status(status, "forgot_password.html", &context)
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ResetValues {
    #[serde(default)]
    token: String,
}

async fn reset_password_page(Query(query): Query<ResetValues>, page: Page) -> Response {
    let error = query
        .token
        .trim()
        .is_empty()
        .then(|| "This reset link is invalid or has expired.".to_string());
    let context = form_context(&query, Default::default(), error);
    page.render("reset_password.html", &context)
}

#[derive(Debug, Deserialize)]
struct ResetPasswordForm {
    #[serde(default)]
    token: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    page: Page,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let result = state
        .auth
        .reset_password(&form.token, &form.password, &form.confirm_password)
        .await;

    match result {
        Ok(()) => flash::success("/login", "Your password has been reset. Please log in."),
        Err(err) => {
            let (status, error) = form_failure(&err);
            let values = ResetValues { token: form.token };
            let context = form_context(&values, field_errors(err.field_errors()), error);
            page.render_status(status, "reset_password.html", &context)
        }
    }
}
