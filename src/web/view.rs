//! Page rendering for handlers

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use tera::Context as TeraContext;

use crate::services::ValidationErrors;
use crate::theme::{StandardTemplateVars, ThemeEngine};
use crate::web::flash;
use crate::web::middleware::{AppState, Viewer};

/// Everything needed to render a themed page for the current request
pub struct Page {
    vars: StandardTemplateVars,
    theme_engine: Arc<RwLock<ThemeEngine>>,
    clears_flash: bool,
}

impl Page {
    pub fn new(state: &AppState, viewer: &Viewer, headers: &HeaderMap, path: &str) -> Self {
        let flash = flash::read(headers);
        let clears_flash = flash.is_some();

        let mut vars = StandardTemplateVars::new(&state.config.site, state.config.public_url(), path)
            .with_flash(flash);
        if let Some(session) = viewer.session() {
            vars = vars.with_viewer(&session.user);
        }

        Self {
            vars,
            theme_engine: state.theme_engine.clone(),
            clears_flash,
        }
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Response {
        self.render_status(StatusCode::OK, template, context)
    }

    pub fn render_status(&self, status: StatusCode, template: &str, context: &TeraContext) -> Response {
        let html = {
            let engine = self
                .theme_engine
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            engine.render_page(template, context, &self.vars)
        };

        let mut response = (status, Html(html)).into_response();
        if self.clears_flash {
            response.headers_mut().append(
                header::SET_COOKIE,
                HeaderValue::from_static(flash::clear_cookie()),
            );
        }
        response
    }
}

impl FromRequestParts<AppState> for Page {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let viewer = parts.extensions.get::<Viewer>().cloned().unwrap_or_default();
        Ok(Page::new(state, &viewer, &parts.headers, parts.uri.path()))
    }
}

/// Field errors keyed by field name, as form templates read them
pub fn field_errors(errors: Option<&ValidationErrors>) -> BTreeMap<String, String> {
    errors
        .map(|errors| {
            errors
                .iter()
                .map(|(field, message)| (field.to_string(), message.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Context for a form page: the submitted values, field errors and a
/// page-level message
pub fn form_context<F: Serialize>(
    form: &F,
    errors: BTreeMap<String, String>,
    error: Option<String>,
) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", &errors);
    if let Some(error) = error {
        context.insert("error", &error);
    }
    context
}

/// `?page=` query; anything unparsable means the first page
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}

/// Local path to send the browser to after an action, if `target` is one
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// `//host`; any control or whitespace character rejects the target.
pub fn safe_redirect(target: Option<&str>) -> Option<&str> {
    target.map(str::trim).filter(|t| {
        t.starts_with('/')
            && !t.starts_with("//")
            && !t.contains('\\')
            && !t.chars().any(|c| c.is_control() || c.is_whitespace())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/dashboard")), Some("/dashboard"));
        assert_eq!(safe_redirect(Some(" /a?b=1 ")), Some("/a?b=1"));
        assert_eq!(safe_redirect(Some("//evil.example")), None);
        assert_eq!(safe_redirect(Some("/\\evil.example")), None);
        assert_eq!(safe_redirect(Some("https://evil.example")), None);
        assert_eq!(safe_redirect(Some("/\t/evil.example")), None);
        assert_eq!(safe_redirect(Some("/\n/evil.example")), None);
        assert_eq!(safe_redirect(Some("/\r\n/evil.example")), None);
        assert_eq!(safe_redirect(Some("/a b")), None);
        assert_eq!(safe_redirect(None), None);
    }

    #[test]
    fn test_page_query_number() {
        let query = |p: Option<&str>| PageQuery {
            page: p.map(String::from),
        };
        assert_eq!(query(None).number(), 1);
        assert_eq!(query(Some("3")).number(), 3);
        assert_eq!(query(Some("0")).number(), 1);
        assert_eq!(query(Some("abc")).number(), 1);
    }

    #[test]
    fn test_field_errors_map() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Email is required.");
        let map = field_errors(Some(&errors));
        assert_eq!(map.get("email").map(String::as_str), Some("Email is required."));
        assert!(field_errors(None).is_empty());
    }
}
