//! Theme engine
//!
//! Page rendering with Tera. Features:
//! - Templates compiled into the binary
//! - Per-file overrides from a directory on disk
//! - Hot reload of the override directory
//! - Standard template variables on every page
//! - Fallback to an error template, then to a built-in page

use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use rust_embed::RustEmbed;
use tera::{Context as TeraContext, Tera};

use crate::config::SiteConfig;
use crate::models::{Role, User};

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
    /// Directory whose templates replace the embedded ones by name
    override_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Create a theme engine from the embedded templates and, when given,
    /// an override directory.
    pub fn new(override_path: Option<&Path>) -> Result<Self, ThemeError> {
        let override_path = override_path.map(Path::to_path_buf);
        let tera = Self::load_templates(override_path.as_deref())?;
        Ok(Self {
            tera,
            override_path,
        })
    }

    fn load_templates(override_path: Option<&Path>) -> Result<Tera, ThemeError> {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8_lossy(&file.data).into_owned();
                templates.insert(name.to_string(), content);
            }
        }

        if let Some(dir) = override_path {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::debug!("Template override: {}", name);
                    templates.insert(name, content);
                }
            } else {
                tracing::warn!("Template override directory {:?} does not exist", dir);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;
        Ok(tera)
    }

    /// Render a template
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()));
        }
        self.tera
            .render(template, context)
            .map_err(|e| ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))))
    }

    /// Render a page with the standard variables added to `context`
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> String {
        let mut full_context = context.clone();
        standard_vars.insert_into(&mut full_context);
        self.render_with_fallback(template, &full_context)
    }

    /// Render a template with fallback to the error template or simple HTML.
    ///
    /// Always produces a page.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    "Failed to render template '{}': {}, trying error template",
                    template,
                    e
                );

                let mut error_context = context.clone();
                error_context.insert("status", &500);
                error_context.insert("error_message", "The page could not be displayed.");

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!(
                            "Failed to render error template: {}, returning simple HTML error page",
                            error_template_err
                        );
                        Self::simple_error_page()
                    }
                }
            }
        }
    }

    fn simple_error_page() -> String {
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Something went wrong</title>
</head>
<body>
    <h1>Something went wrong</h1>
    <p>The page could not be displayed. Please try again later.</p>
    <p><a href="/">Back to the home page</a></p>
</body>
</html>"#
            .to_string()
    }

    /// Re-read the override directory
    pub fn reload_templates(&mut self) -> Result<(), ThemeError> {
        self.tera = Self::load_templates(self.override_path.as_deref())?;
        tracing::info!("Templates reloaded");
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

/// Tera errors nest their cause; flatten the chain into one line
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(s) = source {
        message.push_str(&format!(": {}", s));
        source = s.source();
    }
    message
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ThemeError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            templates.push((template_name, fs::read_to_string(&path)?));
        }
    }
    Ok(())
}

/// Variables every page receives
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub site_description: String,
    /// Absolute base URL of the site
    pub public_url: String,
    /// Signed-in user, if any
    pub viewer: Option<ViewerVars>,
    /// Current request path
    pub request_path: String,
    /// One-shot message from the previous action
    pub flash: Option<FlashVars>,
    /// Current year (for copyright)
    pub year: i32,
}

/// Signed-in user as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct ViewerVars {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub role_label: &'static str,
    pub is_writer: bool,
    pub is_admin: bool,
    pub is_superadmin: bool,
}

impl From<&User> for ViewerVars {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            role_label: user.role.label(),
            is_writer: user.is_writer(),
            is_admin: user.is_admin(),
            is_superadmin: user.role == Role::Superadmin,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlashVars {
    /// `success` or `error`
    pub kind: String,
    pub message: String,
}

impl StandardTemplateVars {
    pub fn new(site: &SiteConfig, public_url: &str, request_path: impl Into<String>) -> Self {
        Self {
            site_name: site.name.clone(),
            site_description: site.description.clone(),
            public_url: public_url.trim_end_matches('/').to_string(),
            viewer: None,
            request_path: request_path.into(),
            flash: None,
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_viewer(mut self, user: &User) -> Self {
        self.viewer = Some(ViewerVars::from(user));
        self
    }

    pub fn with_flash(mut self, flash: Option<FlashVars>) -> Self {
        self.flash = flash;
        self
    }

    fn insert_into(&self, context: &mut TeraContext) {
        context.insert("site_name", &self.site_name);
        context.insert("site_description", &self.site_description);
        context.insert("public_url", &self.public_url);
        context.insert("viewer", &self.viewer);
        context.insert("request_path", &self.request_path);
        context.insert("flash", &self.flash);
        context.insert("year", &self.year);
    }
}
