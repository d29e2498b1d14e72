//! Sitemap service for sitemap.xml and robots.txt generation.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::application::repos::{PostsRepo, RepoError, SitemapPostEntry};
use crate::domain::types::Locale;

const STATIC_SECTIONS: [&str; 5] = ["", "/posts", "/categories", "/privacy", "/terms"];

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to list posts: {0}")]
    Posts(#[from] RepoError),
}

/// Service for generating sitemap.xml and robots.txt.
#[derive(Clone)]
pub struct SitemapService {
    posts: Arc<dyn PostsRepo>,
    base_url: String,
}

impl SitemapService {
    pub fn new(posts: Arc<dyn PostsRepo>, base_url: impl Into<String>) -> Self {
        Self {
            posts,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The site root, each locale's static sections, then every published
    /// post in every locale.
    pub async fn sitemap_xml(&self) -> Result<String, SitemapError> {
        let posts = self.posts.list_sitemap_entries().await?;
        Ok(render_sitemap(
            &self.base_url,
            &posts,
            OffsetDateTime::now_utc(),
        ))
    }

    pub fn robots_txt(&self) -> String {
        let base = &self.base_url;
        format!("User-agent: *\nAllow: /\nSitemap: {base}/sitemap.xml\nHost: {base}\n")
    }
}

fn render_sitemap(base: &str, posts: &[SitemapPostEntry], now: OffsetDateTime) -> String {
    let mut entries = Vec::new();
    entries.push(sitemap_entry(base, "/", now));

    for locale in Locale::ALL {
        for section in STATIC_SECTIONS {
            entries.push(sitemap_entry(base, &format!("/{locale}{section}"), now));
        }
    }

    for post in posts {
        entries.push(sitemap_entry(
            base,
            &format!("/{}/posts/{}", post.locale, post.slug),
            post.updated_at,
        ));
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&entry);
    }
    xml.push_str("</urlset>\n");
    xml
}

fn sitemap_entry(base: &str, path: &str, lastmod: OffsetDateTime) -> String {
    let loc = canonical_url(base, path);
    match lastmod.format(&Rfc3339) {
        Ok(lastmod) => format!("  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod></url>\n"),
        Err(_) => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}

fn canonical_url(base: &str, path: &str) -> String {
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}
