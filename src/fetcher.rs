use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{QueuedPage, ScrapeRow, ScrapeWriter};
use crate::error::FetchError;
use crate::settings::FetchSettings;

/// Scrape stats returned after completion.
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub fn build_client(settings: &FetchSettings) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(&settings.user_agent)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?)
}

/// GET `url` and return the body; non-2xx statuses are errors.
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Transport { url: url.to_string(), source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { url: url.to_string(), status });
    }

    response
        .text()
        .await
        .map_err(|source| FetchError::Transport { url: url.to_string(), source })
}

pub fn backoff(settings: &FetchSettings, attempt: u32) -> Duration {
    Duration::from_millis(settings.base_backoff_ms.saturating_mul(2u64.saturating_pow(attempt)))
}

pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    settings: &FetchSettings,
) -> Result<String, FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_html(client, url).await {
            Err(e) if e.is_retryable() && attempt < settings.max_retries => {
                let wait = backoff(settings, attempt);
                warn!(
                    "{} (attempt {}/{}), backing off {:.1}s",
                    e,
                    attempt + 1,
                    settings.max_retries,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Fetch pages one after another with a fixed pause between requests,
/// saving each result as it arrives. Failures are recorded, not raised.
pub async fn scrape_pages(
    conn: &Connection,
    client: &Client,
    pages: Vec<QueuedPage>,
    settings: &FetchSettings,
) -> Result<ScrapeStats> {
    let total = pages.len();
    let delay = Duration::from_millis(settings.delay_ms);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")?
            .progress_chars("=> "),
    );

    let mut writer = ScrapeWriter::new(conn)?;
    let mut ok = 0usize;
    let mut errors = 0usize;

    for (i, page) in pages.into_iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        pb.set_message(page.slug.clone());

        let row = scrape_one(client, page, settings).await;
        if row.error.is_some() {
            errors += 1;
        } else {
            ok += 1;
        }
        writer.save(&row)?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok(ScrapeStats { total, ok, errors })
}

async fn scrape_one(client: &Client, page: QueuedPage, settings: &FetchSettings) -> ScrapeRow {
    let start = Instant::now();
    let result = fetch_with_retry(client, &page.url, settings).await;
    let latency_ms = Some(start.elapsed().as_millis() as i64);

    match result {
        Ok(html) => ScrapeRow {
            page_id: page.id,
            url: page.url,
            slug: page.slug,
            html: Some(html),
            status: Some(200),
            error: None,
            latency_ms,
        },
        Err(e) => {
            warn!("Fetch failed for {}: {}", page.slug, e);
            ScrapeRow {
                page_id: page.id,
                url: page.url,
                slug: page.slug,
                html: None,
                status: e.status().map(|s| s.as_u16() as i32),
                error: Some(e.to_string()),
                latency_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let settings = FetchSettings {
            base_backoff_ms: 500,
            ..FetchSettings::default()
        };
        assert_eq!(backoff(&settings, 0), Duration::from_millis(500));
        assert_eq!(backoff(&settings, 1), Duration::from_millis(1000));
        assert_eq!(backoff(&settings, 3), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_saturates() {
        let settings = FetchSettings::default();
        assert_eq!(backoff(&settings, 200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn client_builds_from_defaults() {
        assert!(build_client(&FetchSettings::default()).is_ok());
    }
}
