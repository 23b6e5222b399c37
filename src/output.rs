use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::DigestRecord;

static ILLEGAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).unwrap());

/// File stem derived from the issue title; `fallback` when nothing is left.
pub fn file_stem(title: &str, fallback: &str) -> String {
    let stem = ILLEGAL_RE.replace_all(title.trim(), "_");
    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem.into_owned()
    }
}

/// Write `<dir>/<stem>.json`, pretty-printed. Returns the written path.
pub fn write_record(dir: &Path, record: &DigestRecord, fallback: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(format!("{}.json", file_stem(&record.title, fallback)));
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
