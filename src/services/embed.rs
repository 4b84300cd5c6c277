//! Media embeds for article bodies
//!
//! Recognised forms:
//! - `[image src="..." alt="..." caption="..."]`
//! - `[video src="..."]` (uploaded mp4/webm, or a YouTube/Vimeo link)
//! - a YouTube or Vimeo URL alone on a line
//! - an uploaded `.mp4`/`.webm` URL alone on a line
//!
//! Anything else in square brackets is left as written. Code is never
//! touched: fenced blocks, indented blocks and inline code spans.
//!
//! Expansion swaps each embed for an opaque marker so the markdown pass can
//! escape raw HTML freely; the renderer puts the embed HTML back afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::validation::is_safe_media_url;

static YOUTUBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#].*)?$",
    )
    .expect("youtube regex is valid")
});

static VIMEO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.|player\.)?vimeo\.com/(?:video/)?(\d+)(?:[/?#].*)?$")
        .expect("vimeo regex is valid")
});

/// Parsed `[name attr="value"]` tag
#[derive(Debug, Clone, PartialEq)]
pub struct Shortcode {
    pub name: String,
    pub attrs: HashMap<String, String>,
    /// Exact source text of the tag
    pub original: String,
}

/// A resolved embed
#[derive(Debug, Clone, PartialEq)]
pub enum Embed {
    Image {
        src: String,
        alt: String,
        caption: Option<String>,
    },
    Video {
        src: String,
    },
    YouTube {
        id: String,
    },
    Vimeo {
        id: String,
    },
}

impl Embed {
    /// Resolve a shortcode; `None` for unknown names or unsafe sources
    pub fn from_shortcode(shortcode: &Shortcode) -> Option<Self> {
        let src = shortcode.attrs.get("src").map(|s| s.trim())?;
        match shortcode.name.as_str() {
            "image" => {
                if !is_safe_media_url(src) {
                    return None;
                }
                Some(Embed::Image {
                    src: src.to_string(),
                    alt: shortcode.attrs.get("alt").cloned().unwrap_or_default(),
                    caption: shortcode
                        .attrs
                        .get("caption")
                        .filter(|c| !c.trim().is_empty())
                        .cloned(),
                })
            }
            "video" => Self::from_video_url(src).or_else(|| {
                is_safe_media_url(src).then(|| Embed::Video {
                    src: src.to_string(),
                })
            }),
            _ => None,
        }
    }

    /// Resolve a URL standing alone on a line
    pub fn from_bare_url(url: &str) -> Option<Self> {
        let url = url.trim();
        if let Some(embed) = Self::from_video_url(url) {
            return Some(embed);
        }
        if is_safe_media_url(url) && is_video_file(url) {
            return Some(Embed::Video {
                src: url.to_string(),
            });
        }
        None
    }

    fn from_video_url(url: &str) -> Option<Self> {
        if let Some(caps) = YOUTUBE_RE.captures(url) {
            return Some(Embed::YouTube {
                id: caps[1].to_string(),
            });
        }
        VIMEO_RE.captures(url).map(|caps| Embed::Vimeo {
            id: caps[1].to_string(),
        })
    }

    pub fn to_html(&self) -> String {
        match self {
            Embed::Image { src, alt, caption } => {
                let img = format!(
                    "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                    escape_attr(src),
                    escape_attr(alt)
                );
                match caption {
                    Some(caption) => format!(
                        "<figure class=\"embed embed-image\">{}<figcaption>{}</figcaption></figure>",
                        img,
                        escape_attr(caption)
                    ),
                    None => format!("<figure class=\"embed embed-image\">{}</figure>", img),
                }
            }
            Embed::Video { src } => format!(
                "<div class=\"embed embed-video\"><video controls preload=\"metadata\" src=\"{}\"></video></div>",
                escape_attr(src)
            ),
            Embed::YouTube { id } => iframe(&format!("https://www.youtube-nocookie.com/embed/{}", id)),
            Embed::Vimeo { id } => iframe(&format!("https://player.vimeo.com/video/{}", id)),
        }
    }
}

fn iframe(src: &str) -> String {
    format!(
        "<div class=\"embed embed-responsive\"><iframe src=\"{}\" loading=\"lazy\" allow=\"accelerometer; encrypted-media; picture-in-picture\" allowfullscreen></iframe></div>",
        escape_attr(src)
    )
}

fn is_video_file(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".mp4") || path.ends_with(".webm")
}

pub(crate) fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Find every well-formed shortcode in `content`, with its char offset
pub fn parse_shortcodes(content: &str) -> Vec<(usize, Shortcode)> {
    let chars: Vec<char> = content.chars().collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '[' {
            if let Some((shortcode, end)) = parse_shortcode_at(&chars, i) {
                found.push((i, shortcode));
                i = end;
                continue;
            }
        }
        i += 1;
    }

    found
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_shortcode_at(chars: &[char], start: usize) -> Option<(Shortcode, usize)> {
    let len = chars.len();
    let mut i = start + 1;

    let name_start = i;
    while i < len && is_name_char(chars[i]) {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name: String = chars[name_start..i].iter().collect();

    let mut attrs = HashMap::new();
    loop {
        while i < len && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= len || chars[i] == '[' {
            return None;
        }
        if chars[i] == ']' {
            break;
        }
        if chars[i] == '/' && i + 1 < len && chars[i + 1] == ']' {
            i += 1;
            break;
        }

        let attr_start = i;
        while i < len && is_name_char(chars[i]) {
            i += 1;
        }
        if i == attr_start {
            return None;
        }
        let attr: String = chars[attr_start..i].iter().collect();

        while i < len && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= len || chars[i] != '=' {
            return None;
        }
        i += 1;
        while i < len && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= len || (chars[i] != '"' && chars[i] != '\'') {
            return None;
        }

        let quote = chars[i];
        i += 1;
        let value_start = i;
        while i < len && chars[i] != quote && chars[i] != '\n' {
            i += 1;
        }
        if i >= len || chars[i] != quote {
            return None;
        }
        attrs.insert(attr.to_lowercase(), chars[value_start..i].iter().collect());
        i += 1;
    }

    let end = i + 1;
    Some((
        Shortcode {
            name: name.to_lowercase(),
            attrs,
            original: chars[start..end].iter().collect(),
        },
        end,
    ))
}

/// Markdown with embeds replaced by markers, plus the HTML for each marker
#[derive(Debug, Clone, Default)]
pub struct ExpandedContent {
    pub markdown: String,
    pub embeds: Vec<(String, String)>,
}

impl ExpandedContent {
    /// Swap markers in rendered HTML for the embed HTML
    pub fn restore(&self, html: &str) -> String {
        let mut out = html.to_string();
        for (marker, embed) in &self.embeds {
            out = out.replace(&format!("<p>{}</p>", marker), embed);
            out = out.replace(marker, embed);
        }
        out
    }
}

/// Replace embeds in `content` with markers built from `nonce`.
///
/// `nonce` must be alphanumeric so markdown leaves the markers alone.
pub fn expand(content: &str, nonce: &str) -> ExpandedContent {
    let mut expanded = ExpandedContent::default();
    let mut in_fence: Option<&str> = None;
    // An indented line opens a code block only after a blank line or
    // another code line; otherwise it continues a paragraph.
    let mut code_may_start = true;

    for (idx, line) in content.lines().enumerate() {
        if idx > 0 {
            expanded.markdown.push('\n');
        }

        let trimmed = line.trim_start();
        if let Some(fence) = in_fence {
            if trimmed.starts_with(fence) {
                in_fence = None;
            }
            expanded.markdown.push_str(line);
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = Some(&trimmed[..3]);
            expanded.markdown.push_str(line);
            continue;
        }

        if trimmed.is_empty() {
            code_may_start = true;
            expanded.markdown.push_str(line);
            continue;
        }
        if code_may_start && is_indented_code(line) {
            expanded.markdown.push_str(line);
            continue;
        }
        code_may_start = false;

        if let Some(embed) = Embed::from_bare_url(line) {
            let marker = push_embed(&mut expanded, nonce, &embed);
            expanded.markdown.push_str(&marker);
            continue;
        }

        let line = expand_line(line, nonce, &mut expanded);
        expanded.markdown.push_str(&line);
    }

    expanded
}

fn push_embed(expanded: &mut ExpandedContent, nonce: &str, embed: &Embed) -> String {
    let marker = format!("xembed{}n{}x", nonce, expanded.embeds.len());
    expanded.embeds.push((marker.clone(), embed.to_html()));
    marker
}

fn expand_line(line: &str, nonce: &str, expanded: &mut ExpandedContent) -> String {
    let shortcodes = parse_shortcodes(line);
    if shortcodes.is_empty() {
        return line.to_string();
    }

    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;

    let spans = code_spans(&chars);

    for (offset, shortcode) in shortcodes {
        if offset < cursor || spans.iter().any(|span| span.contains(&offset)) {
            continue;
        }
        let Some(embed) = Embed::from_shortcode(&shortcode) else {
            continue;
        };
        out.extend(&chars[cursor..offset]);
        out.push_str(&push_embed(expanded, nonce, &embed));
        cursor = offset + shortcode.original.chars().count();
    }
    out.extend(&chars[cursor..]);
    out
}

fn is_indented_code(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with("    ")
}

/// Char ranges of inline code spans: a run of backticks closed by a run of
/// the same length. An unclosed run is literal text.
fn code_spans(chars: &[char]) -> Vec<std::ops::Range<usize>> {
    let run_at = |from: usize| chars[from..].iter().take_while(|c| **c == '`').count();

    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '`' {
            i += 1;
            continue;
        }
        let open = run_at(i);
        let mut j = i + open;
        let mut close = None;
        while j < chars.len() {
            if chars[j] == '`' {
                let run = run_at(j);
                if run == open {
                    close = Some(j + run);
                    break;
                }
                j += run;
            } else {
                j += 1;
            }
        }
        match close {
            Some(end) => {
                spans.push(i..end);
                i = end;
            }
            None => i += open,
        }
    }
    spans
}
