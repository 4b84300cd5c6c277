//! One-shot flash messages
//!
//! A server action redirects with a `flash` cookie; the next page shows the
//! message and clears the cookie.

use axum::{
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};

use crate::services::ServiceError;
use crate::theme::FlashVars;
use crate::web::error::WebError;
use crate::web::middleware::read_cookie;

pub const FLASH_COOKIE: &str = "flash";

const FLASH_MAX_AGE_SECS: u64 = 60;

const KINDS: &[&str] = &["success", "error"];

/// `Set-Cookie` value carrying a message
pub fn set_cookie(kind: &str, message: &str) -> String {
    let value = urlencoding::encode(&format!("{}|{}", kind, message)).into_owned();
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        FLASH_COOKIE, value, FLASH_MAX_AGE_SECS
    )
}

/// `Set-Cookie` value removing a shown message
pub fn clear_cookie() -> &'static str {
    "flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
}

/// Message left by the previous action, if any
pub fn read(headers: &HeaderMap) -> Option<FlashVars> {
    let raw = read_cookie(headers, FLASH_COOKIE)?;
    let decoded = urlencoding::decode(&raw).ok()?;
    let (kind, message) = decoded.split_once('|')?;
    if !KINDS.contains(&kind) || message.is_empty() {
        return None;
    }
    Some(FlashVars {
        kind: kind.to_string(),
        message: message.to_string(),
    })
}

fn redirect_with(to: &str, kind: &str, message: &str) -> Response {
    (
        [(header::SET_COOKIE, set_cookie(kind, message))],
        Redirect::to(to),
    )
        .into_response()
}

/// Redirect with a success message
pub fn success(to: &str, message: &str) -> Response {
    redirect_with(to, "success", message)
}

/// Redirect with an error message
pub fn error(to: &str, message: &str) -> Response {
    redirect_with(to, "error", message)
}

/// Redirect to `to` after a server action, reporting how it went.
///
/// A rejected session sends the browser to the login page instead.
pub fn after_action<T>(result: Result<T, ServiceError>, to: &str, done: &str) -> Response {
    match result {
        Ok(_) => success(to, done),
        Err(err) => {
            let message = err.user_message();
            match WebError::from(err) {
                WebError::LoginRequired => WebError::LoginRequired.into_response(),
                WebError::Page { .. } => error(to, &message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn cookie_header(set_cookie: &str) -> HeaderMap {
        let pair = set_cookie.split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[test]
    fn test_flash_survives_cookie_encoding() {
        let headers = cookie_header(&set_cookie("success", "Saved; all good | 100%"));
        assert_eq!(
            read(&headers),
            Some(FlashVars {
                kind: "success".into(),
                message: "Saved; all good | 100%".into(),
            })
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let headers = cookie_header(&set_cookie("script", "x"));
        assert_eq!(read(&headers), None);
        assert_eq!(read(&cookie_header("flash=garbage")), None);
        assert_eq!(read(&HeaderMap::new()), None);
    }

    #[test]
    fn test_after_action_reports_failure() {
        let ok = after_action(Ok::<_, ServiceError>(()), "/x", "Done.");
        let cookie = ok.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=success%7CDone."));

        let failed = after_action::<()>(Err(ServiceError::forbidden()), "/x", "Done.");
        assert_eq!(failed.headers()[header::LOCATION], "/x");
        let cookie = failed.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=error%7C"));

        let expired = after_action::<()>(
            Err(crate::backend::BackendError::status(401, "").into()),
            "/x",
            "Done.",
        );
        assert_eq!(expired.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn test_redirect_sets_cookie() {
        let response = error("/dashboard", "Nope");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/dashboard");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=error%7CNope"));
    }
}
