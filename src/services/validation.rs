//! Form validation
//!
//! Fast feedback for forms before anything is sent to the backend. The
//! backend still enforces its own rules; these checks only spare a round
//! trip for obviously bad input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::ArticleInput;

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const EMAIL_MAX: usize = 254;
pub const BIO_MAX: usize = 500;
pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 200;
pub const CONTENT_MIN: usize = 20;
pub const EXCERPT_MAX: usize = 300;
pub const COMMENT_MAX: usize = 2000;
pub const CATEGORY_DESCRIPTION_MAX: usize = 500;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// Field errors in the order they were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(String, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; only the first error per field is kept
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.errors.push((field.to_string(), message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// First message, for a one-line summary
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|(_, m)| m.as_str())
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&joined.join("; "))
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for (field, message) in &self.errors {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.add("email", "Email is required.");
    } else if char_len(email) > EMAIL_MAX || !EMAIL_RE.is_match(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn check_name(errors: &mut ValidationErrors, field: &str, label: &str, name: &str) {
    let len = char_len(name.trim());
    if len == 0 {
        errors.add(field, format!("{} is required.", label));
    } else if !(NAME_MIN..=NAME_MAX).contains(&len) {
        errors.add(
            field,
            format!(
                "{} must be between {} and {} characters.",
                label, NAME_MIN, NAME_MAX
            ),
        );
    }
}

fn check_new_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    let len = char_len(password);
    if len < PASSWORD_MIN {
        errors.add(
            field,
            format!("Password must be at least {} characters.", PASSWORD_MIN),
        );
    } else if len > PASSWORD_MAX {
        errors.add(
            field,
            format!("Password must be at most {} characters.", PASSWORD_MAX),
        );
    } else if !password.chars().any(|c| c.is_alphabetic())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        errors.add(field, "Password must contain a letter and a number.");
    }
}

fn check_confirmation(errors: &mut ValidationErrors, password: &str, confirm: &str) {
    if password != confirm {
        errors.add("confirm_password", "Passwords do not match.");
    }
}

/// Whether a media reference is safe to embed: absolute http(s) or site-relative
pub fn is_safe_media_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() || url.chars().any(|c| c.is_whitespace() || c == '"' || c == '<') {
        return false;
    }
    let lower = url.to_ascii_lowercase();
    lower.starts_with("https://")
        || lower.starts_with("http://")
        || (url.starts_with('/') && !url.starts_with("//"))
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email);
    if password.is_empty() {
        errors.add("password", "Password is required.");
    }
    errors.into_result()
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", "Name", name);
    check_email(&mut errors, email);
    check_new_password(&mut errors, "password", password);
    check_confirmation(&mut errors, password, confirm);
    errors.into_result()
}

pub fn validate_forgot_password(email: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email);
    errors.into_result()
}

pub fn validate_password_reset(
    reset_token: &str,
    password: &str,
    confirm: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if reset_token.trim().is_empty() {
        errors.add("token", "This reset link is invalid or has expired.");
    }
    check_new_password(&mut errors, "password", password);
    check_confirmation(&mut errors, password, confirm);
    errors.into_result()
}

pub fn validate_password_change(
    current: &str,
    new_password: &str,
    confirm: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if current.is_empty() {
        errors.add("current_password", "Current password is required.");
    }
    check_new_password(&mut errors, "password", new_password);
    if !current.is_empty() && current == new_password {
        errors.add(
            "password",
            "New password must be different from the current one.",
        );
    }
    check_confirmation(&mut errors, new_password, confirm);
    errors.into_result()
}

pub fn validate_profile(
    name: &str,
    bio: Option<&str>,
    avatar: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", "Name", name);
    if let Some(bio) = bio {
        if char_len(bio) > BIO_MAX {
            errors.add("bio", format!("Bio must be at most {} characters.", BIO_MAX));
        }
    }
    if let Some(avatar) = avatar.filter(|a| !a.trim().is_empty()) {
        if !is_safe_media_url(avatar) {
            errors.add("avatar", "Avatar must be an http(s) or site URL.");
        }
    }
    errors.into_result()
}

/// Characters a reader would see, ignoring markup and whitespace
pub fn visible_len(content: &str) -> usize {
    TAG_RE
        .replace_all(content, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .count()
}

pub fn validate_article(input: &ArticleInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title_len = char_len(input.title.trim());
    if title_len == 0 {
        errors.add("title", "Title is required.");
    } else if !(TITLE_MIN..=TITLE_MAX).contains(&title_len) {
        errors.add(
            "title",
            format!(
                "Title must be between {} and {} characters.",
                TITLE_MIN, TITLE_MAX
            ),
        );
    }

    if visible_len(&input.content) < CONTENT_MIN {
        errors.add(
            "content",
            format!("Content must be at least {} characters.", CONTENT_MIN),
        );
    }

    if let Some(excerpt) = &input.excerpt {
        if char_len(excerpt) > EXCERPT_MAX {
            errors.add(
                "excerpt",
                format!("Excerpt must be at most {} characters.", EXCERPT_MAX),
            );
        }
    }

    if input.category_id.trim().is_empty() {
        errors.add("category_id", "Choose a category.");
    }

    if let Some(cover) = input.cover_image.as_deref().filter(|c| !c.trim().is_empty()) {
        if !is_safe_media_url(cover) {
            errors.add("cover_image", "Cover image must be an http(s) or site URL.");
        }
    }

    errors.into_result()
}

pub fn validate_comment(content: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let len = char_len(content.trim());
    if len == 0 {
        errors.add("content", "Comment cannot be empty.");
    } else if len > COMMENT_MAX {
        errors.add(
            "content",
            format!("Comment must be at most {} characters.", COMMENT_MAX),
        );
    }
    errors.into_result()
}

pub fn validate_category(name: &str, description: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "name", "Category name", name);
    if let Some(description) = description {
        if char_len(description) > CATEGORY_DESCRIPTION_MAX {
            errors.add(
                "description",
                format!(
                    "Description must be at most {} characters.",
                    CATEGORY_DESCRIPTION_MAX
                ),
            );
        }
    }
    errors.into_result()
}

/// URL-friendly slug: lowercase ASCII letters and digits joined by single dashes
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
