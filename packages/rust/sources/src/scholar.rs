//! Semantic Scholar adapter: tracked authors plus keyword searches.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use dailypaper_shared::{
    DailyPaperError, Record, Result, ScholarConfig, Source, TrackedAuthor, normalize_title,
    parse_date_prefix,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use url::Url;

use crate::http::{HttpClient, decode_items, endpoint};
use crate::{FetchWindow, SourceAdapter};

const FIELDS: &str = "title,abstract,authors,year,publicationDate,url,openAccessPdf,citationCount";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    r#abstract: Option<String>,
    #[serde(default)]
    authors: Vec<AuthorRef>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    open_access_pdf: Option<OpenAccessPdf>,
    #[serde(default)]
    citation_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

/// Collects recent papers by tracked authors and by topical search queries.
#[derive(Debug, Clone)]
pub struct ScholarAdapter {
    config: ScholarConfig,
    today: NaiveDate,
    authors_only: bool,
}

impl ScholarAdapter {
    pub fn new(config: ScholarConfig, today: NaiveDate) -> Self {
        Self {
            config,
            today,
            authors_only: false,
        }
    }

    /// Skip the keyword searches.
    pub fn authors_only(mut self, authors_only: bool) -> Self {
        self.authors_only = authors_only;
        self
    }

    async fn author_papers(&self, http: &HttpClient, author: &TrackedAuthor) -> Result<Vec<Record>> {
        let url = endpoint(
            &self.config.base_url,
            &format!("/graph/v1/author/{}/papers", author.id),
        )?;
        let limit = self.config.author_limit.to_string();
        let request = http
            .get(url.clone())
            .query(&[("fields", FIELDS), ("limit", limit.as_str())]);

        let window = FetchWindow::new(self.today, self.config.days);
        let mut records = self.papers(http, request, &url, window).await?;
        for record in &mut records {
            record.tracked_author = Some(author.name.clone());
        }
        Ok(records)
    }

    async fn search(&self, http: &HttpClient, query: &str) -> Result<Vec<Record>> {
        let url = endpoint(&self.config.base_url, "/graph/v1/paper/search")?;
        let limit = self.config.search_limit.to_string();
        let request = http.get(url.clone()).query(&[
            ("query", query),
            ("fields", FIELDS),
            ("limit", limit.as_str()),
        ]);

        let window = FetchWindow::new(self.today, self.config.days + 1);
        self.papers(http, request, &url, window).await
    }

    async fn papers(
        &self,
        http: &HttpClient,
        request: reqwest::RequestBuilder,
        url: &Url,
        window: FetchWindow,
    ) -> Result<Vec<Record>> {
        let page: Page = http.send_json(request, url).await?;
        Ok(decode_items::<PaperItem>(page.data, "scholar paper")
            .into_iter()
            .filter_map(|item| {
                let published = item.publication_date.as_deref().and_then(parse_date_prefix);
                if published.is_some_and(|d| !window.admits(d)) {
                    return None;
                }
                let mut record =
                    Record::new(Source::SemanticScholar, item.title.unwrap_or_default());
                record.summary = item.r#abstract.unwrap_or_default();
                record.authors = item.authors.into_iter().filter_map(|a| a.name).collect();
                record.published = published;
                record.link = item.url.unwrap_or_default();
                record.pdf_url = item.open_access_pdf.and_then(|p| p.url);
                record.citations = Some(item.citation_count.unwrap_or(0));
                Some(record)
            })
            .collect())
    }

    async fn pause(&self) {
        if self.config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
        }
    }
}

impl SourceAdapter for ScholarAdapter {
    type Output = Vec<Record>;

    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    #[instrument(skip_all, fields(today = %self.today, authors_only = self.authors_only))]
    async fn fetch(&self, http: &HttpClient) -> Result<Vec<Record>> {
        let mut calls = 0usize;
        let mut failures = 0usize;
        let mut all = Vec::new();

        for author in &self.config.authors {
            calls += 1;
            match self.author_papers(http, author).await {
                Ok(records) => {
                    info!(author = %author.name, count = records.len(), "tracked author papers");
                    all.extend(records);
                }
                Err(e) => {
                    warn!(author = %author.name, error = %e, "author lookup failed");
                    failures += 1;
                }
            }
            self.pause().await;
        }

        if !self.authors_only {
            for query in &self.config.queries {
                calls += 1;
                match self.search(http, query).await {
                    Ok(records) => {
                        info!(%query, count = records.len(), "paper search");
                        all.extend(records);
                    }
                    Err(e) => {
                        warn!(%query, error = %e, "paper search failed");
                        failures += 1;
                    }
                }
                self.pause().await;
            }
        }

        if calls > 0 && failures == calls {
            return Err(DailyPaperError::Network(format!(
                "all {failures} Semantic Scholar requests failed"
            )));
        }

        let mut seen = HashSet::new();
        all.retain(|r| seen.insert(normalize_title(&r.title)));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> ScholarConfig {
        ScholarConfig {
            base_url,
            authors: vec![TrackedAuthor {
                name: "Danijar Hafner".into(),
                id: "2059290".into(),
            }],
            queries: vec!["world model reinforcement learning".into()],
            delay_ms: 0,
            ..ScholarConfig::default()
        }
    }

    async fn mount_author(server: &wiremock::MockServer) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/graph/v1/author/2059290/papers"))
            .and(wiremock::matchers::query_param("fields", FIELDS))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {
                        "title": "Mastering Diverse Domains through World Models",
                        "abstract": "DreamerV3 learns a world model.",
                        "authors": [{"authorId": "1", "name": "Danijar Hafner"}, {"name": null}],
                        "publicationDate": "2026-02-18",
                        "url": "https://www.semanticscholar.org/paper/abc",
                        "openAccessPdf": {"url": "https://arxiv.org/pdf/2301.04104"},
                        "citationCount": 321
                    },
                    {
                        "title": "An Older Paper",
                        "publicationDate": "2025-01-01"
                    }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetch_tags_tracked_authors_and_dedupes() {
        let server = wiremock::MockServer::start().await;
        mount_author(&server).await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/graph/v1/paper/search"))
            .and(wiremock::matchers::query_param(
                "query",
                "world model reinforcement learning",
            ))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 2,
                "data": [
                    {
                        "title": "Mastering  Diverse Domains through World Models",
                        "publicationDate": "2026-02-18",
                        "openAccessPdf": null
                    },
                    {
                        "title": "Undated Search Hit",
                        "publicationDate": null
                    }
                ]
            })))
            .mount(&server)
            .await;

        let adapter = ScholarAdapter::new(
            test_config(server.uri()),
            NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
        );
        let http = HttpClient::new(5).unwrap();
        let records = adapter.fetch(&http).await.unwrap();

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Mastering Diverse Domains through World Models", "Undated Search Hit"]
        );
        let first = &records[0];
        assert_eq!(first.tracked_author.as_deref(), Some("Danijar Hafner"));
        assert_eq!(first.authors, ["Danijar Hafner"]);
        assert_eq!(first.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2301.04104"));
        assert_eq!(first.citations, Some(321));
        assert_eq!(records[1].published, None);
        assert_eq!(records[1].tracked_author, None);
    }

    #[tokio::test]
    async fn authors_only_skips_searches() {
        let server = wiremock::MockServer::start().await;
        mount_author(&server).await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/graph/v1/paper/search"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = ScholarAdapter::new(
            test_config(server.uri()),
            NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
        )
        .authors_only(true);
        let http = HttpClient::new(5).unwrap();
        let records = adapter.fetch(&http).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
