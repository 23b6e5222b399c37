use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::sections::SectionRules;

const DEFAULT_INDEX_URL: &str = "https://www.ruanyifeng.com/blog/weekly/";

/// Layered settings: defaults, then `weekly.toml` (or `--config`), then
/// `WEEKLY_*` env vars with `__` between nested keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index_url: String,
    pub db_path: PathBuf,
    pub output_dir: PathBuf,
    pub fetch: FetchSettings,
    pub layout: LayoutSettings,
    pub sections: SectionRules,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            index_url: DEFAULT_INDEX_URL.to_string(),
            db_path: PathBuf::from("data/weekly.sqlite"),
            output_dir: PathBuf::from("weekly"),
            fetch: FetchSettings::default(),
            layout: LayoutSettings::default(),
            sections: SectionRules::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Fixed pause between consecutive page requests.
    pub delay_ms: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            delay_ms: 1000,
            max_retries: 3,
            base_backoff_ms: 2000,
            timeout_secs: 30,
            user_agent: concat!("weekly_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// CSS selectors for the parts of a digest page and the index page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub title: String,
    pub date: String,
    pub cover: String,
    pub headings: String,
    pub index_links: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            title: "h1".into(),
            date: ".asset-meta abbr".into(),
            cover: "#main-content > p > img".into(),
            headings: "#main-content > h2".into(),
            index_links: "#alpha-inner > div > div > ul > li > a".into(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("weekly").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("WEEKLY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}
