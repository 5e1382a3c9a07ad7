//! GitHub repository search adapter.

use std::collections::HashSet;

use chrono::NaiveDate;
use dailypaper_shared::{DailyPaperError, GithubConfig, Repository, Result, parse_date_prefix};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::http::{HttpClient, decode_items, endpoint};
use crate::{FetchWindow, SourceAdapter};

const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Searches recently pushed repositories by topic and by keyword.
#[derive(Debug, Clone)]
pub struct GithubAdapter {
    config: GithubConfig,
    today: NaiveDate,
}

impl GithubAdapter {
    pub fn new(config: GithubConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    /// Every search to run, with the topic that produced it (if any) and its window.
    fn searches(&self) -> Vec<(String, Option<String>, FetchWindow)> {
        let topic_window = FetchWindow::new(self.today, self.config.topic_days);
        let keyword_window = FetchWindow::new(self.today, self.config.days);

        let topics = self
            .config
            .topics
            .iter()
            .map(|t| (format!("topic:{t}"), Some(t.clone()), topic_window));
        let keywords = self
            .config
            .keywords
            .iter()
            .take(self.config.max_keywords)
            .map(|k| (k.clone(), None, keyword_window));
        topics.chain(keywords).collect()
    }

    async fn search(
        &self,
        http: &HttpClient,
        query: &str,
        window: FetchWindow,
    ) -> Result<Vec<Repository>> {
        let url = endpoint(&self.config.base_url, "/search/repositories")?;
        let q = format!("{query} pushed:>={}", window.cutoff().format("%Y-%m-%d"));
        let per_page = self.config.per_query.to_string();
        let request = http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .query(&[
                ("q", q.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);

        let response: SearchResponse = http.send_json(request, &url).await?;
        Ok(decode_items::<RepoItem>(response.items, "github repository")
            .into_iter()
            .map(|item| to_repository(item, window))
            .collect())
    }
}

impl SourceAdapter for GithubAdapter {
    type Output = Vec<Repository>;

    fn name(&self) -> &'static str {
        "github"
    }

    #[instrument(skip_all, fields(today = %self.today))]
    async fn fetch(&self, http: &HttpClient) -> Result<Vec<Repository>> {
        let searches = self.searches();
        let mut failures = 0usize;
        let mut all = Vec::new();

        for (query, topic, window) in &searches {
            match self.search(http, query, *window).await {
                Ok(mut repos) => {
                    info!(%query, count = repos.len(), "github search");
                    for repo in &mut repos {
                        repo.matched_topic = topic.clone();
                    }
                    all.extend(repos);
                }
                Err(e) => {
                    warn!(%query, error = %e, "github search failed");
                    failures += 1;
                }
            }
        }

        if !searches.is_empty() && failures == searches.len() {
            return Err(DailyPaperError::Network(format!(
                "all {failures} GitHub searches failed"
            )));
        }

        Ok(select_repositories(
            all,
            self.config.min_stars,
            self.config.limit,
        ))
    }
}

fn to_repository(item: RepoItem, window: FetchWindow) -> Repository {
    let is_new = item
        .created_at
        .as_deref()
        .and_then(parse_date_prefix)
        .is_some_and(|created| window.is_recent(created));

    Repository {
        name: item.full_name,
        description: item.description.unwrap_or_default(),
        url: item.html_url,
        stars: item.stargazers_count,
        forks: item.forks_count,
        language: item.language,
        topics: item.topics,
        created_at: item.created_at,
        updated_at: item.updated_at,
        is_new,
        matched_topic: None,
    }
}

/// Keep the first occurrence of each repository, order by stars, drop the
/// undescribed and the barely starred, and cap the list.
pub fn select_repositories(repos: Vec<Repository>, min_stars: u64, limit: usize) -> Vec<Repository> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Repository> = repos
        .into_iter()
        .filter(|r| seen.insert(r.name.clone()))
        .collect();

    unique.sort_by(|a, b| b.stars.cmp(&a.stars));
    unique.retain(|r| !r.description.is_empty() && r.stars >= min_stars);
    unique.truncate(limit);
    unique
}
