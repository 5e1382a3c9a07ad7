//! Papers-With-Code adapter.

use std::time::Duration;

use chrono::NaiveDate;
use dailypaper_shared::{PwcConfig, Record, Result, Source, parse_date_prefix};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::http::{HttpClient, decode_items, endpoint};
use crate::{FetchWindow, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PaperItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    r#abstract: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    url_abs: Option<String>,
    #[serde(default)]
    url_pdf: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    stars: u64,
}

/// Lists the latest papers and attaches each one's most-starred repository.
#[derive(Debug, Clone)]
pub struct PwcAdapter {
    config: PwcConfig,
    today: NaiveDate,
}

impl PwcAdapter {
    pub fn new(config: PwcConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    /// Most-starred repository of a paper; lookup failures count as "no code".
    async fn best_repository(&self, http: &HttpClient, paper_id: &str) -> Option<(String, u64)> {
        let path = format!("/api/v1/papers/{paper_id}/repositories/");
        let url = endpoint(&self.config.base_url, &path).ok()?;
        let request = http
            .get(url.clone())
            .timeout(Duration::from_secs(self.config.repo_timeout_secs));

        let page: Page = match http.send_json(request, &url).await {
            Ok(page) => page,
            Err(e) => {
                debug!(paper_id, error = %e, "repository lookup failed");
                return None;
            }
        };

        decode_items::<RepoItem>(page.results, "pwc repository")
            .into_iter()
            .reduce(|best, r| if r.stars > best.stars { r } else { best })
            .map(|best| (best.url.unwrap_or_default(), best.stars))
    }
}

impl SourceAdapter for PwcAdapter {
    type Output = Vec<Record>;

    fn name(&self) -> &'static str {
        "papers_with_code"
    }

    #[instrument(skip_all, fields(today = %self.today, days = self.config.days))]
    async fn fetch(&self, http: &HttpClient) -> Result<Vec<Record>> {
        let url = endpoint(&self.config.base_url, "/api/v1/papers/")?;
        let per_page = self.config.limit.to_string();
        let request = http.get(url.clone()).query(&[
            ("ordering", "-published"),
            ("items_per_page", per_page.as_str()),
        ]);
        let page: Page = http.send_json(request, &url).await?;

        let window = FetchWindow::new(self.today, self.config.days + 1);
        let mut records = Vec::new();
        for item in decode_items::<PaperItem>(page.results, "pwc paper") {
            let published = item.published.as_deref().and_then(parse_date_prefix);
            if published.is_some_and(|d| !window.admits(d)) {
                continue;
            }

            let mut record = Record::new(Source::PapersWithCode, item.title.unwrap_or_default());
            record.summary = item.r#abstract.unwrap_or_default();
            record.authors = item.authors;
            record.published = published;
            record.link = item.url_abs.unwrap_or_default();
            record.pdf_url = item.url_pdf;
            record.stars = Some(0);

            if let Some(id) = &item.id {
                if let Some((code_url, stars)) = self.best_repository(http, id).await {
                    record.code_url = Some(code_url);
                    record.stars = Some(stars);
                }
            }
            record.id = item.id;
            records.push(record);
        }

        info!(count = records.len(), "fetched Papers-With-Code papers");
        Ok(records)
    }
}
