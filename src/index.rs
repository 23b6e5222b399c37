use std::collections::HashSet;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::info;

use crate::fetcher::fetch_html;
use crate::parser::document::compile_selector;
use crate::settings::Settings;

/// Fetch the weekly index page and return (url, slug) pairs in page order.
pub async fn fetch_issue_links(client: &Client, settings: &Settings) -> Result<Vec<(String, String)>> {
    let selector = compile_selector("index_links", &settings.layout.index_links)?;
    let base = Url::parse(&settings.index_url)
        .with_context(|| format!("Invalid index URL {:?}", settings.index_url))?;

    info!("Fetching weekly index: {}", settings.index_url);
    let html = fetch_html(client, &settings.index_url)
        .await
        .context("Failed to fetch weekly index")?;

    let links = parse_issue_links(&html, &selector, &base);
    info!("Issue links found: {}", links.len());
    Ok(links)
}

/// Anchors matched by `selector`, resolved against `base`, de-duplicated.
pub fn parse_issue_links(html: &str, selector: &Selector, base: &Url) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();

    doc.select(selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(String::from)
        .filter(|url| seen.insert(url.clone()))
        .filter_map(|url| {
            let slug = slug_from_url(&url)?;
            Some((url, slug))
        })
        .collect()
}

/// Last path segment without `.html`: `.../weekly-issue-321.html` → `weekly-issue-321`.
pub fn slug_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let last = path.trim_end_matches('/').rsplit('/').next()?;
    let slug = last.strip_suffix(".html").unwrap_or(last);
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}
