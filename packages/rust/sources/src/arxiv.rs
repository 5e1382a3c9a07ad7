//! arXiv Atom API adapter.

use std::time::Duration;

use chrono::NaiveDate;
use dailypaper_shared::{ArxivConfig, DailyPaperError, Record, Result, Source, parse_date_prefix};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::http::{HttpClient, endpoint};
use crate::SourceAdapter;

// ---------------------------------------------------------------------------
// Atom wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    #[serde(rename = "primary_category", alias = "arxiv:primary_category", default)]
    primary_category: Option<Category>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
    #[serde(rename = "affiliation", alias = "arxiv:affiliation", default)]
    affiliations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term", default)]
    term: String,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Fetches the most recent submissions in the configured categories.
#[derive(Debug, Clone)]
pub struct ArxivAdapter {
    config: ArxivConfig,
    target: NaiveDate,
}

impl ArxivAdapter {
    pub fn new(config: ArxivConfig, target: NaiveDate) -> Self {
        Self { config, target }
    }

    fn search_query(&self) -> String {
        self.config
            .categories
            .iter()
            .map(|c| format!("cat:{c}"))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

impl SourceAdapter for ArxivAdapter {
    type Output = Vec<Record>;

    fn name(&self) -> &'static str {
        "arxiv"
    }

    #[instrument(skip_all, fields(target = %self.target))]
    async fn fetch(&self, http: &HttpClient) -> Result<Vec<Record>> {
        let url = endpoint(&self.config.base_url, "/api/query")?;
        let max_results = self.config.max_results.to_string();
        let request = http
            .get(url.clone())
            .query(&[
                ("search_query", self.search_query().as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("max_results", max_results.as_str()),
            ])
            .timeout(Duration::from_secs(self.config.timeout_secs));

        let body = http.send_text(request, &url).await?;
        let records = parse_feed(&body, self.target, self.config.window_days)?;

        info!(count = records.len(), "fetched arXiv entries");
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse an Atom feed, keeping entries published within `window_days` of `target`.
///
/// Entries without a parseable publication date are skipped.
pub fn parse_feed(xml: &str, target: NaiveDate, window_days: i64) -> Result<Vec<Record>> {
    let feed: Feed = quick_xml::de::from_str(xml)
        .map_err(|e| DailyPaperError::parse(format!("arXiv feed: {e}")))?;

    let mut records = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let Some(published) = parse_date_prefix(entry.published.trim()) else {
            debug!(id = %entry.id, "skipping entry without publication date");
            continue;
        };
        if (published - target).num_days().abs() > window_days {
            continue;
        }
        records.push(entry_to_record(entry, published));
    }
    Ok(records)
}

fn entry_to_record(entry: Entry, published: NaiveDate) -> Record {
    let link = entry.id.trim().to_string();
    let id = link
        .rsplit_once("/abs/")
        .map_or(link.as_str(), |(_, tail)| tail)
        .to_string();

    let pdf_url = entry
        .links
        .iter()
        .find(|l| l.title.as_deref() == Some("pdf"))
        .map(|l| l.href.clone());

    let mut categories: Vec<String> = Vec::new();
    for term in entry
        .primary_category
        .into_iter()
        .chain(entry.categories)
        .map(|c| c.term)
    {
        if !term.is_empty() && !categories.contains(&term) {
            categories.push(term);
        }
    }

    let institution = entry
        .authors
        .iter()
        .find_map(|a| a.affiliations.first())
        .map(|a| collapse_whitespace(a));

    let mut record = Record::new(Source::Arxiv, collapse_whitespace(&entry.title));
    record.id = Some(id);
    record.summary = collapse_whitespace(&entry.summary);
    record.authors = entry
        .authors
        .into_iter()
        .map(|a| collapse_whitespace(&a.name))
        .collect();
    record.published = Some(published);
    record.link = link;
    record.pdf_url = pdf_url;
    record.categories = categories;
    record.institution = institution;
    record
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("../../../fixtures/atom/arxiv-feed.xml")
            .expect("read arXiv fixture")
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_entries_within_window() {
        let records = parse_feed(&fixture(), day(2026, 2, 19), 3).unwrap();
        let ids: Vec<&str> = records.iter().filter_map(|r| r.id.as_deref()).collect();
        // 2602.00003 is ten days older than the target and falls outside the window.
        assert_eq!(ids, ["2602.01234v1", "2602.05678v2", "2602.09999v1"]);
    }

    #[test]
    fn entry_fields_are_extracted() {
        let records = parse_feed(&fixture(), day(2026, 2, 19), 3).unwrap();
        let vla = &records[0];
        assert_eq!(
            vla.title,
            "OpenVLA-2: Scaling Vision-Language-Action Models for Dexterous Manipulation"
        );
        assert!(!vla.summary.contains('\n'));
        assert_eq!(vla.authors, ["Ada Lovelace", "Grace Hopper"]);
        assert_eq!(vla.published, Some(day(2026, 2, 19)));
        assert_eq!(vla.link, "http://arxiv.org/abs/2602.01234v1");
        assert_eq!(vla.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2602.01234v1"));
        assert_eq!(vla.categories, ["cs.RO", "cs.LG"]);
        assert_eq!(vla.source, Source::Arxiv);
        assert_eq!(vla.institution.as_deref(), Some("Stanford University"));

        let second = &records[1];
        assert_eq!(second.institution, None);
        assert_eq!(second.pdf_url, None);
    }

    #[test]
    fn empty_feed_yields_nothing() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        assert!(parse_feed(xml, day(2026, 2, 19), 3).unwrap().is_empty());
    }

    #[test]
    fn invalid_xml_is_a_parse_error() {
        let err = parse_feed("<feed><entry>", day(2026, 2, 19), 3).unwrap_err();
        assert!(matches!(err, DailyPaperError::Parse { .. }));
    }

    #[tokio::test]
    async fn fetch_queries_configured_categories() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/query"))
            .and(wiremock::matchers::query_param(
                "search_query",
                "cat:cs.RO OR cat:cs.LG",
            ))
            .and(wiremock::matchers::query_param("max_results", "300"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(fixture()))
            .mount(&server)
            .await;

        let config = ArxivConfig {
            base_url: server.uri(),
            categories: vec!["cs.RO".into(), "cs.LG".into()],
            ..ArxivConfig::default()
        };
        let adapter = ArxivAdapter::new(config, day(2026, 2, 19));
        let http = HttpClient::new(5).unwrap();
        let records = adapter.fetch(&http).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn fetch_surfaces_http_failure() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ArxivConfig {
            base_url: server.uri(),
            ..ArxivConfig::default()
        };
        let adapter = ArxivAdapter::new(config, day(2026, 2, 19));
        let http = HttpClient::new(5).unwrap();
        let err = adapter.fetch(&http).await.unwrap_err();
        assert!(matches!(err, DailyPaperError::Network(_)));
    }
}
