//! JSON files passed between pipeline steps.
//!
//! Every step writes an envelope object; readers accept either a bare list or
//! any object with a `papers`, `repos` or `items` list.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use dailypaper_shared::{DailyPaperError, HubItem, Post, Record, Repository, Result, Source};
use dailypaper_sources::HubStats;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Keys checked, in order, when a file holds an object instead of a list.
const LIST_KEYS: [&str; 3] = ["papers", "repos", "items"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load items from an interchange file.
///
/// A missing file is an empty list. A file that cannot be read or is not
/// JSON is an error. Items that fail to decode are skipped one by one.
pub fn load_items<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "input file not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(DailyPaperError::io(path, e)),
    };

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| DailyPaperError::parse(format!("{}: {e}", path.display())))?;

    let raw = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => LIST_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(serde_json::Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let total = raw.len();
    let items: Vec<T> = raw
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping malformed item");
                None
            }
        })
        .collect();

    info!(path = %path.display(), loaded = items.len(), total, "loaded items");
    Ok(items)
}

pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    load_items(path)
}

pub fn load_repositories(path: &Path) -> Result<Vec<Repository>> {
    load_items(path)
}

pub fn load_hub_items(path: &Path) -> Result<Vec<HubItem>> {
    load_items(path)
}

/// Load and concatenate several record files in order.
pub fn load_all_records(paths: &[impl AsRef<Path>]) -> Result<Vec<Record>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_records(path.as_ref())?);
    }
    Ok(all)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DailyPaperError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| DailyPaperError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| DailyPaperError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

/// Output of the arXiv step.
#[derive(Debug, Serialize)]
pub struct ArxivEnvelope {
    pub date: NaiveDate,
    pub fetch_time: NaiveDateTime,
    pub total_fetched: usize,
    pub total_relevant: usize,
    pub papers: Vec<Record>,
}

/// Output of the GitHub step.
#[derive(Debug, Serialize)]
pub struct RepoEnvelope {
    pub source: &'static str,
    pub fetch_date: NaiveDateTime,
    pub repos: Vec<Repository>,
}

impl RepoEnvelope {
    pub fn new(fetch_date: NaiveDateTime, repos: Vec<Repository>) -> Self {
        Self {
            source: Source::Github.as_str(),
            fetch_date,
            repos,
        }
    }
}

/// Output of the Hugging Face step.
#[derive(Debug, Serialize)]
pub struct HubEnvelope {
    pub source: &'static str,
    pub fetch_date: NaiveDateTime,
    pub items: Vec<HubItem>,
    pub stats: HubStats,
}

impl HubEnvelope {
    pub fn new(fetch_date: NaiveDateTime, items: Vec<HubItem>, stats: HubStats) -> Self {
        Self {
            source: Source::HuggingFace.as_str(),
            fetch_date,
            items,
            stats,
        }
    }
}

/// Output of the Papers-With-Code and Semantic Scholar steps.
#[derive(Debug, Serialize)]
pub struct PaperEnvelope {
    pub source: &'static str,
    pub papers: Vec<Record>,
}

impl PaperEnvelope {
    pub fn new(source: Source, papers: Vec<Record>) -> Self {
        Self {
            source: source.as_str(),
            papers,
        }
    }
}

/// Output of the social step.
#[derive(Debug, Serialize)]
pub struct SocialEnvelope {
    pub source: &'static str,
    pub fetch_date: NaiveDateTime,
    pub tweets: Vec<Post>,
    pub errors: Vec<String>,
    pub paper_related: Vec<Post>,
}

impl SocialEnvelope {
    pub fn new(fetch_date: NaiveDateTime, feed: dailypaper_sources::SocialFeed) -> Self {
        let paper_related = feed.paper_related();
        Self {
            source: Source::Social.as_str(),
            fetch_date,
            tweets: feed.posts,
            errors: feed.errors,
            paper_related,
        }
    }
}
