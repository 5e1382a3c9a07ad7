//! Hugging Face hub adapter (models, datasets, spaces).

use std::collections::HashSet;

use chrono::NaiveDate;
use dailypaper_shared::{
    DailyPaperError, HubItem, HubKind, HuggingFaceConfig, Result, parse_date_prefix,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::http::{HttpClient, decode_items, endpoint};
use crate::{FetchWindow, SourceAdapter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubEntry {
    id: String,
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default)]
    sdk: Option<String>,
}

/// Item counts per kind, taken before the final cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    pub models: usize,
    pub datasets: usize,
    pub spaces: usize,
}

impl HubStats {
    pub fn count(items: &[HubItem]) -> Self {
        let of = |kind| items.iter().filter(|i| i.kind == kind).count();
        Self {
            models: of(HubKind::Model),
            datasets: of(HubKind::Dataset),
            spaces: of(HubKind::Space),
        }
    }
}

/// Result of one hub run.
#[derive(Debug, Clone, Default)]
pub struct HubFeed {
    pub items: Vec<HubItem>,
    pub stats: HubStats,
}

/// One listing request against the hub API.
struct Listing {
    kind: HubKind,
    path: &'static str,
    params: Vec<(&'static str, String)>,
}

/// Lists recently modified hub items relevant to the configured tags.
#[derive(Debug, Clone)]
pub struct HuggingFaceAdapter {
    config: HuggingFaceConfig,
    today: NaiveDate,
}

impl HuggingFaceAdapter {
    pub fn new(config: HuggingFaceConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    fn listings(&self) -> Vec<Listing> {
        let recent = |limit: u32| {
            vec![
                ("sort", "lastModified".to_string()),
                ("direction", "-1".to_string()),
                ("limit", limit.to_string()),
            ]
        };

        let mut listings: Vec<Listing> = self
            .config
            .model_tags
            .iter()
            .map(|tag| {
                let mut params = recent(self.config.models_per_tag);
                params.push(("filter", tag.clone()));
                Listing {
                    kind: HubKind::Model,
                    path: "/api/models",
                    params,
                }
            })
            .collect();

        let mut dataset_params = recent(self.config.datasets_limit);
        dataset_params.push(("filter", self.config.dataset_filter.clone()));
        listings.push(Listing {
            kind: HubKind::Dataset,
            path: "/api/datasets",
            params: dataset_params,
        });

        listings.push(Listing {
            kind: HubKind::Space,
            path: "/api/spaces",
            params: vec![
                ("sort", "likes".to_string()),
                ("direction", "-1".to_string()),
                ("limit", self.config.spaces_limit.to_string()),
            ],
        });
        listings
    }

    async fn list(&self, http: &HttpClient, listing: &Listing) -> Result<Vec<HubItem>> {
        let url = endpoint(&self.config.base_url, listing.path)?;
        let request = http.get(url.clone()).query(&listing.params);
        let raw: Vec<serde_json::Value> = http.send_json(request, &url).await?;

        let window = FetchWindow::new(self.today, self.config.days);
        Ok(decode_items::<HubEntry>(raw, "hub entry")
            .into_iter()
            .filter(|e| {
                e.last_modified
                    .as_deref()
                    .and_then(parse_date_prefix)
                    .is_none_or(|modified| window.admits(modified))
            })
            .map(|e| self.to_hub_item(e, listing.kind))
            .collect())
    }

    fn to_hub_item(&self, entry: HubEntry, kind: HubKind) -> HubItem {
        let base = self.config.base_url.trim_end_matches('/');
        let url = match kind {
            HubKind::Model => format!("{base}/{}", entry.id),
            HubKind::Dataset => format!("{base}/datasets/{}", entry.id),
            HubKind::Space => format!("{base}/spaces/{}", entry.id),
        };
        let author = entry.author.clone().unwrap_or_default().to_lowercase();
        let is_priority = self
            .config
            .priority_orgs
            .iter()
            .any(|org| author.contains(&org.to_lowercase()));
        let name = match kind {
            HubKind::Model => entry.model_id.unwrap_or_else(|| entry.id.clone()),
            _ => entry.id.clone(),
        };

        HubItem {
            kind,
            id: entry.id,
            name,
            author: entry.author,
            description: entry.description.unwrap_or_default(),
            tags: entry.tags,
            downloads: entry.downloads,
            likes: entry.likes,
            last_modified: entry.last_modified,
            url,
            sdk: entry.sdk,
            is_priority,
        }
    }
}

impl SourceAdapter for HuggingFaceAdapter {
    type Output = HubFeed;

    fn name(&self) -> &'static str {
        "huggingface"
    }

    #[instrument(skip_all, fields(today = %self.today))]
    async fn fetch(&self, http: &HttpClient) -> Result<HubFeed> {
        let listings = self.listings();
        let mut failures = 0usize;
        let mut all = Vec::new();

        for listing in &listings {
            match self.list(http, listing).await {
                Ok(items) => {
                    info!(kind = listing.kind.as_str(), count = items.len(), "hub listing");
                    all.extend(items);
                }
                Err(e) => {
                    warn!(kind = listing.kind.as_str(), error = %e, "hub listing failed");
                    failures += 1;
                }
            }
        }

        if failures == listings.len() {
            return Err(DailyPaperError::Network(format!(
                "all {failures} Hugging Face listings failed"
            )));
        }

        Ok(select_hub_items(all, self.config.limit))
    }
}

/// Keep the first occurrence of each id, order by likes + downloads, and cap the list.
pub fn select_hub_items(items: Vec<HubItem>, limit: usize) -> HubFeed {
    let mut seen = HashSet::new();
    let mut unique: Vec<HubItem> = items
        .into_iter()
        .filter(|i| seen.insert(i.id.clone()))
        .collect();

    unique.sort_by_key(|i| std::cmp::Reverse(i.likes + i.downloads));
    let stats = HubStats::count(&unique);
    unique.truncate(limit);
    HubFeed {
        items: unique,
        stats,
    }
}
