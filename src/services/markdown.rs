//! Article content rendering
//!
//! Converts article markdown to HTML for readers and for the editor
//! preview. pulldown-cmark does the parsing and syntect highlights fenced
//! code. Raw HTML typed by authors is shown as text, never interpreted;
//! media reaches the page only through the embeds in [`super::embed`].
//!
//! # Example
//!
//! ```
//! use newsroom::services::markdown::ContentRenderer;
//!
//! let renderer = ContentRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::embed::{self, escape_attr};

/// Words per minute used for reading-time estimates
const WORDS_PER_MINUTE: usize = 200;

const DEFAULT_THEME: &str = "InspiredGitHub";

/// Thread-safe markdown renderer with syntax highlighting.
///
/// Supports tables, strikethrough, task lists, smart punctuation, fenced
/// code with highlighting, and media embeds.
#[derive(Clone)]
pub struct ContentRenderer {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Use a specific syntect theme, falling back to the default if unknown
    pub fn with_theme(theme_name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();

        let theme_name = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };

        Self {
            syntax_set: Arc::new(syntax_set),
            theme_set: Arc::new(theme_set),
            theme_name,
        }
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Render markdown (with embeds) to HTML
    pub fn render(&self, markdown: &str) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let expanded = embed::expand(markdown, &nonce);

        let parser = Parser::new_ext(&expanded.markdown, Self::options());
        let events = self.process_events(parser);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        expanded.restore(&html_output)
    }

    /// Plain-text summary of at most `max_chars` characters, cut at a word
    pub fn excerpt(&self, markdown: &str, max_chars: usize) -> String {
        let text = plain_text(markdown);
        if text.chars().count() <= max_chars {
            return text;
        }

        let cut: String = text.chars().take(max_chars).collect();
        let trimmed = match cut.rfind(' ') {
            Some(pos) if pos > 0 => &cut[..pos],
            _ => cut.as_str(),
        };
        format!(
            "{}…",
            trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation())
        )
    }

    /// Estimated minutes to read, at least one
    pub fn reading_time(&self, markdown: &str) -> u32 {
        let words = plain_text(markdown).split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
    }

    /// Escape raw HTML, neutralise unsafe link targets, and highlight code.
    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_content.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                            (!lang.is_empty()).then_some(lang)
                        }
                        CodeBlockKind::Indented => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    let highlighted = match code_lang.take() {
                        Some(lang) => self.highlight_code(&code_content, &lang),
                        None => plain_code_block(&code_content, None),
                    };
                    events.push(Event::Html(highlighted.into()));
                }
                Event::Text(text) if in_code_block => {
                    code_content.push_str(&text);
                }
                Event::Html(raw) | Event::InlineHtml(raw) => {
                    events.push(Event::Text(raw));
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    events.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url: safe_url(dest_url),
                        title,
                        id,
                    }));
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url: safe_url(dest_url),
                        title,
                        id,
                    }));
                }
                _ => events.push(event),
            }
        }

        events
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang));

        match (syntax, self.theme_set.themes.get(&self.theme_name)) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(code, &self.syntax_set, syntax, theme)
                    .unwrap_or_else(|_| plain_code_block(code, Some(lang)))
            }
            _ => plain_code_block(code, Some(lang)),
        }
    }
}

fn plain_code_block(code: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            escape_attr(lang),
            escape_attr(code)
        ),
        None => format!("<pre><code>{}</code></pre>", escape_attr(code)),
    }
}

/// Link targets that could run script are replaced with `#`
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let has_scheme = match (cleaned.find(':'), cleaned.find(['/', '?', '#'])) {
        (Some(colon), Some(path)) => colon < path,
        (Some(_), None) => true,
        _ => false,
    };
    let allowed = ["http:", "https:", "mailto:"]
        .iter()
        .any(|scheme| cleaned.starts_with(scheme));

    if has_scheme && !allowed {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Text a reader would see, without shortcodes, markup or code fences
fn plain_text(markdown: &str) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let stripped = embed::expand(markdown, &nonce);
    let mut text = String::new();

    for event in Parser::new_ext(&stripped.markdown, ContentRenderer::options()) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak
            | Event::HardBreak
            | Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote
                | TagEnd::TableCell,
            ) => text.push(' '),
            _ => {}
        }
    }

    for (marker, _) in &stripped.embeds {
        text = text.replace(marker.as_str(), " ");
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_invalid_theme_falls_back() {
        let renderer = ContentRenderer::with_theme("nonexistent-theme");
        assert_eq!(renderer.theme_name, DEFAULT_THEME);
    }

    #[test]
    fn test_render_basic_markdown() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("# Title\n\nThis is **bold**, *italic* and ~~gone~~.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_render_table_and_task_list() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n- [ ] todo");
        assert!(html.contains("<table>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("<script>alert(1)</script>\n\nHello <b>there</b>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_javascript_links_are_neutralised() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("[click](javascript:alert(1)) [ok](https://example.com) [rel](/about)");
        assert!(!html.contains("javascript:"));
        assert!(html.contains("href=\"#\""));
        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("href=\"/about\""));
    }

    #[test]
    fn test_code_block_highlighting() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre"));
        assert!(html.contains("style="));

        let html = renderer.render("```nosuchlang\n<tag>\n```");
        assert!(html.contains("class=\"language-nosuchlang\""));
        assert!(html.contains("&lt;tag&gt;"));
    }

    #[test]
    fn test_embeds_survive_escaping() {
        let renderer = ContentRenderer::new();
        let html = renderer.render(
            "Intro\n\n[image src=\"/uploads/a.png\" alt=\"A\"]\n\nhttps://youtu.be/dQw4w9WgXcQ\n\n<iframe src=\"https://evil\"></iframe>",
        );
        assert!(html.contains("<figure class=\"embed embed-image\"><img src=\"/uploads/a.png\""));
        assert!(html.contains("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"));
        assert!(html.contains("&lt;iframe"));
        assert!(!html.contains("xembed"));
    }

    #[test]
    fn test_unknown_shortcode_left_as_text() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("[gallery ids=\"1,2\"]");
        assert!(html.contains("[gallery ids="));
    }

    #[test]
    fn test_excerpt() {
        let renderer = ContentRenderer::new();
        let md = "# Big news\n\nThe **council** voted today on the new budget proposal.";
        assert_eq!(
            renderer.excerpt(md, 200),
            "Big news The council voted today on the new budget proposal."
        );
        let short = renderer.excerpt(md, 24);
        assert!(short.ends_with('…'));
        assert!(short.chars().count() <= 25);
        assert!(!short.contains("**"));
    }

    #[test]
    fn test_excerpt_skips_embeds() {
        let renderer = ContentRenderer::new();
        let excerpt = renderer.excerpt("[image src=\"/a.png\"]\n\nActual words here.", 100);
        assert_eq!(excerpt, "Actual words here.");

        let excerpt = renderer.excerpt("The token xembed0nx stays in prose.", 100);
        assert_eq!(excerpt, "The token xembed0nx stays in prose.");
    }

    #[test]
    fn test_shortcode_in_inline_code_is_not_embedded() {
        let renderer = ContentRenderer::new();
        let html = renderer.render("Write `[image src=\"/a.png\"]` to embed.");
        assert!(!html.contains("<figure"));
        assert!(html.contains("<code>"));
    }

    #[test]
    fn test_reading_time() {
        let renderer = ContentRenderer::new();
        assert_eq!(renderer.reading_time(""), 1);
        assert_eq!(renderer.reading_time(&"word ".repeat(200)), 1);
        assert_eq!(renderer.reading_time(&"word ".repeat(201)), 2);
    }
}
