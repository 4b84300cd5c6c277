//! Public site pages
//!
//! - `/` and `/articles` - latest published articles
//! - `/categories/{slug}` - articles in a category
//! - `/search` - free-text search
//! - `/robots.txt`, `/sitemap.xml`, `/ads.txt`
//! - `/healthz` - liveness and request statistics

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::models::{Article, Category, ListParams, PagedResult};
use crate::services::embed::escape_attr;
use crate::web::error::WebError;
use crate::web::middleware::AppState;
use crate::web::view::{Page, PageQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/articles", get(list_articles))
        .route("/categories/{slug}", get(category_articles))
        .route("/search", get(search))
        .route("/unauthorized", get(unauthorized))
        .route("/robots.txt", get(robots_txt))
        .route("/sitemap.xml", get(sitemap_xml))
        .route("/ads.txt", get(ads_txt))
        .route("/healthz", get(healthz))
}

fn listing_context(
    articles: &PagedResult<Article>,
    categories: &[Category],
    page_base: &str,
) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("articles", articles);
    context.insert("categories", categories);
    context.insert("page_base", page_base);
    context
}

async fn home(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    page: Page,
) -> Response {
    let params = ListParams::new(query.number(), state.config.site.posts_per_page);
    let (articles, categories) = tokio::join!(
        state.articles.list_published(params),
        state.categories.list()
    );
    page.render("index.html", &listing_context(&articles, &categories, "/?"))
}

async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    page: Page,
) -> Response {
    let params = ListParams::new(query.number(), state.config.site.posts_per_page);
    let (articles, categories) = tokio::join!(
        state.articles.list_published(params),
        state.categories.list()
    );
    let mut context = listing_context(&articles, &categories, "/articles?");
    context.insert("heading", "All articles");
    page.render("articles.html", &context)
}

async fn category_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    page: Page,
) -> Result<Response, WebError> {
    let category = state
        .categories
        .find_by_slug(&slug)
        .await
        .ok_or_else(WebError::not_found)?;

    let params = ListParams::new(query.number(), state.config.site.posts_per_page)
        .with_category(category.slug.clone());
    let (articles, categories) = tokio::join!(
        state.articles.list_published(params),
        state.categories.list()
    );

    let page_base = format!("/categories/{}?", urlencoding::encode(&category.slug));
    let mut context = listing_context(&articles, &categories, &page_base);
    context.insert("heading", &category.name);
    if let Some(description) = &category.description {
        context.insert("description", description);
    }
    Ok(page.render("articles.html", &context))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(flatten)]
    page: PageQuery,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    page: Page,
) -> Response {
    let term = query.q.trim();
    let categories = state.categories.list().await;

    let articles = if term.is_empty() {
        PagedResult::empty(1)
    } else {
        let params = ListParams::new(query.page.number(), state.config.site.posts_per_page)
            .with_search(term);
        state.articles.list_published(params).await
    };

    let page_base = format!("/search?q={}&", urlencoding::encode(term));
    let mut context = listing_context(&articles, &categories, &page_base);
    context.insert("heading", "Search");
    if !term.is_empty() {
        context.insert("query", term);
    }
    page.render("articles.html", &context)
}

async fn unauthorized(page: Page) -> Response {
    page.render_status(StatusCode::FORBIDDEN, "unauthorized.html", &TeraContext::new())
}

fn robots_body(public_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /dashboard\nDisallow: /admin\nDisallow: /editor\n\nSitemap: {}/sitemap.xml\n",
        public_url.trim_end_matches('/')
    )
}

async fn robots_txt(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_body(state.config.public_url()),
    )
        .into_response()
}

fn sitemap_entry(xml: &mut String, loc: &str, lastmod: Option<String>) {
    xml.push_str("  <url>\n    <loc>");
    xml.push_str(&escape_attr(loc));
    xml.push_str("</loc>\n");
    if let Some(lastmod) = lastmod {
        xml.push_str("    <lastmod>");
        xml.push_str(&lastmod);
        xml.push_str("</lastmod>\n");
    }
    xml.push_str("  </url>\n");
}

fn sitemap_body(public_url: &str, articles: &[Article], categories: &[Category]) -> String {
    let base = public_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    sitemap_entry(&mut xml, &format!("{}/", base), None);
    for article in articles {
        sitemap_entry(
            &mut xml,
            &format!("{}/articles/{}", base, urlencoding::encode(&article.slug)),
            article
                .last_modified()
                .map(|t| t.format("%Y-%m-%d").to_string()),
        );
    }
    for category in categories.iter().filter(|c| !c.slug.is_empty()) {
        sitemap_entry(
            &mut xml,
            &format!("{}/categories/{}", base, urlencoding::encode(&category.slug)),
            None,
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

async fn sitemap_xml(State(state): State<AppState>) -> Response {
    let (articles, categories) = tokio::join!(
        state.articles.sitemap_articles(),
        state.categories.list()
    );
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        sitemap_body(state.config.public_url(), &articles, &categories),
    )
        .into_response()
}

async fn ads_txt(State(state): State<AppState>) -> Response {
    let lines = &state.config.site.ads_txt;
    if lines.is_empty() {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    let mut body = lines.join("\n");
    body.push('\n');
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    total_requests: u64,
    avg_response_time_us: f64,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = &state.request_stats;
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: stats.uptime_seconds(),
        total_requests: stats.total_requests(),
        avg_response_time_us: stats.avg_response_time_us(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_article;

    #[test]
    fn test_robots_names_sitemap() {
        let body = robots_body("https://news.example.com/");
        assert!(body.contains("Disallow: /dashboard\n"));
        assert!(body.contains("Disallow: /admin\n"));
        assert!(body.contains("Disallow: /editor\n"));
        assert!(body.ends_with("Sitemap: https://news.example.com/sitemap.xml\n"));
    }

    #[test]
    fn test_sitemap_lists_articles_and_categories() {
        let articles = vec![test_article("1", "first-story", "u1")];
        let categories = vec![
            Category {
                id: "c1".into(),
                name: "World & Politics".into(),
                slug: "world".into(),
                description: None,
                article_count: 3,
            },
            Category {
                id: "c2".into(),
                name: "Unslugged".into(),
                slug: String::new(),
                description: None,
                article_count: 0,
            },
        ];

        let xml = sitemap_body("https://news.example.com", &articles, &categories);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://news.example.com/</loc>"));
        assert!(xml.contains("<loc>https://news.example.com/articles/first-story</loc>"));
        assert!(xml.contains("<loc>https://news.example.com/categories/world</loc>"));
        assert_eq!(xml.matches("<url>").count(), 3);
        assert!(xml.trim_end().ends_with("</urlset>"));
    }
}
