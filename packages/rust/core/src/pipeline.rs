//! Pipeline driver: run adapters, then classify, dedupe, rank and render.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dailypaper_shared::{AppConfig, HubItem, Record, Repository, Result};
use dailypaper_sources::{HttpClient, SourceAdapter};
use tracing::{info, instrument, warn};

use crate::classify::Classifier;
use crate::dedupe::dedupe;
use crate::rank::{Ranked, ScoringPolicy, rank, rank_by, select_top, triage_key};
use crate::report::{render_daily, render_weekly};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each adapter run, successful or not.
    fn source_finished(&self, outcome: &SourceOutcome);
    /// Called when the command completes.
    fn done(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_finished(&self, _outcome: &SourceOutcome) {}
    fn done(&self) {}
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// What happened when one adapter ran.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub adapter: &'static str,
    /// Set when the adapter failed and contributed nothing.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run an adapter once.
///
/// A failed adapter contributes its empty output; the failure is logged and
/// returned in the outcome instead of being propagated.
#[instrument(skip_all, fields(adapter = adapter.name()))]
pub async fn collect<A: SourceAdapter>(
    adapter: &A,
    http: &HttpClient,
    progress: &dyn ProgressReporter,
) -> (A::Output, SourceOutcome) {
    progress.phase(&format!("Fetching {}", adapter.name()));
    let start = Instant::now();

    let (output, error) = match adapter.fetch(http).await {
        Ok(output) => (output, None),
        Err(e) => {
            warn!(adapter = adapter.name(), error = %e, "source failed, continuing without it");
            (A::Output::default(), Some(e.to_string()))
        }
    };

    let outcome = SourceOutcome {
        adapter: adapter.name(),
        error,
        elapsed: start.elapsed(),
    };
    progress.source_finished(&outcome);
    (output, outcome)
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// How many items of each kind make it into a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub papers: usize,
    pub repos: usize,
    pub hub_items: usize,
}

impl Selection {
    pub const DAILY: Self = Self {
        papers: 12,
        repos: 3,
        hub_items: 2,
    };

    pub const WEEKLY: Self = Self {
        papers: 6,
        repos: 3,
        hub_items: 0,
    };
}

/// Result of the arXiv triage step.
#[derive(Debug, Clone)]
pub struct ArxivCandidates {
    pub total_fetched: usize,
    pub total_relevant: usize,
    pub papers: Vec<Record>,
}

/// Classify fetched arXiv papers, keep the relevant ones and order them for review.
pub fn arxiv_candidates(records: Vec<Record>, classifier: &Classifier, limit: usize) -> ArxivCandidates {
    let total_fetched = records.len();
    let relevant: Vec<Record> = classifier
        .classify_all(records)
        .into_iter()
        .filter(Record::is_relevant)
        .collect();
    let total_relevant = relevant.len();
    info!(total_fetched, total_relevant, "triaged arXiv papers");

    ArxivCandidates {
        total_fetched,
        total_relevant,
        papers: select_top(rank_by(relevant, triage_key), limit),
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Inputs loaded from interchange files.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub papers: Vec<Record>,
    pub repos: Vec<Repository>,
    pub hub_items: Vec<HubItem>,
}

/// A rendered report and the ranked papers it shows.
#[derive(Debug, Clone)]
pub struct Report {
    pub markdown: String,
    pub papers: Vec<Ranked>,
    pub repos: usize,
    pub hub_items: usize,
}

fn prepare(config: &AppConfig, papers: Vec<Record>) -> Result<Vec<Record>> {
    let classifier = Classifier::new(&config.taxonomy, &config.priority)?;
    let total = papers.len();
    let unique = dedupe(classifier.classify_all(papers));
    info!(total, unique = unique.len(), "prepared papers");
    Ok(unique)
}

/// Build the daily digest for `date`.
#[instrument(skip_all, fields(%date))]
pub fn daily_report(
    config: &AppConfig,
    inputs: ReportInputs,
    date: NaiveDate,
    selection: Selection,
) -> Result<Report> {
    let papers = prepare(config, inputs.papers)?;
    let policy = ScoringPolicy::Daily(config.scoring.daily.clone());
    let ranked = select_top(rank(papers, &policy, date), selection.papers);

    let repos = select_top(rank_by(inputs.repos, |r| r.stars), selection.repos);
    let hub_items = select_top(rank_by(inputs.hub_items, |h| h.likes), selection.hub_items);

    let shown: Vec<Record> = ranked.iter().map(|r| r.record.clone()).collect();
    let markdown = render_daily(&shown, &repos, &hub_items, date);

    info!(papers = ranked.len(), repos = repos.len(), hub_items = hub_items.len(), "rendered daily report");
    Ok(Report {
        markdown,
        papers: ranked,
        repos: repos.len(),
        hub_items: hub_items.len(),
    })
}

/// Build the weekly digest for `date_range`.
#[instrument(skip_all, fields(%date_range))]
pub fn weekly_report(
    config: &AppConfig,
    inputs: ReportInputs,
    date_range: &str,
    today: NaiveDate,
    selection: Selection,
) -> Result<Report> {
    let papers = prepare(config, inputs.papers)?;
    let policy = ScoringPolicy::Weekly(config.scoring.weekly.clone());
    let ranked = select_top(rank(papers, &policy, today), selection.papers);

    let repos = select_top(rank_by(inputs.repos, |r| r.stars), selection.repos);

    let shown: Vec<Record> = ranked.iter().map(|r| r.record.clone()).collect();
    let markdown = render_weekly(&shown, &repos, date_range);

    info!(papers = ranked.len(), repos = repos.len(), "rendered weekly report");
    Ok(Report {
        markdown,
        papers: ranked,
        repos: repos.len(),
        hub_items: 0,
    })
}

#[cfg(test)]
mod tests {
    use dailypaper_shared::{ArxivConfig, DailyPaperError, Source};
    use dailypaper_sources::ArxivAdapter;

    use super::*;

    struct FailingAdapter;

    impl SourceAdapter for FailingAdapter {
        type Output = Vec<Record>;

        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch(&self, _http: &HttpClient) -> Result<Vec<Record>> {
            Err(DailyPaperError::Network("connection refused".into()))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()
    }

    fn paper(title: &str, summary: &str) -> Record {
        let mut r = Record::new(Source::Arxiv, title);
        r.summary = summary.into();
        r.link = "https://arxiv.org/abs/2602.00001".into();
        r
    }

    #[tokio::test]
    async fn failed_adapter_contributes_nothing() {
        let http = HttpClient::new(5).unwrap();
        let (records, outcome) = collect(&FailingAdapter, &http, &SilentProgress).await;
        assert!(records.is_empty());
        assert!(!outcome.is_ok());
        assert_eq!(outcome.adapter, "failing");
        assert!(outcome.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn arxiv_fetch_then_triage() {
        let server = wiremock::MockServer::start().await;
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/atom/arxiv-feed.xml");
        let body = std::fs::read_to_string(path).unwrap();
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/query"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = ArxivConfig {
            base_url: server.uri(),
            ..ArxivConfig::default()
        };
        let adapter = ArxivAdapter::new(config, NaiveDate::from_ymd_opt(2026, 2, 19).unwrap());
        let http = HttpClient::new(5).unwrap();
        let (records, outcome) = collect(&adapter, &http, &SilentProgress).await;
        assert!(outcome.is_ok());

        let app = AppConfig::default();
        let classifier = Classifier::new(&app.taxonomy, &app.priority).unwrap();
        let candidates = arxiv_candidates(records, &classifier, 80);

        assert_eq!(candidates.total_fetched, 3);
        assert!(candidates.total_relevant >= 1);
        assert!(candidates.papers.iter().all(Record::is_relevant));
        assert!(candidates.papers[0].is_priority());
    }

    #[test]
    fn daily_report_merges_sources() {
        let mut tracked = paper("Dreamer 4: Scalable World Models", "A world model agent.");
        tracked.source = Source::SemanticScholar;
        tracked.tracked_author = Some("Danijar Hafner".into());
        let mut affiliated = paper("Dreamer 4:  Scalable World Models", "A world model agent.");
        affiliated.institution = Some("Google DeepMind".into());

        let inputs = ReportInputs {
            papers: vec![
                affiliated,
                paper("Protein folding", "Molecules."),
                paper("Offline RL for arms", "We study offline RL."),
                tracked,
            ],
            repos: vec![
                Repository {
                    name: "small".into(),
                    stars: 5,
                    ..Repository::default()
                },
                Repository {
                    name: "big".into(),
                    stars: 900,
                    ..Repository::default()
                },
            ],
            hub_items: Vec::new(),
        };

        let report = daily_report(&AppConfig::default(), inputs, date(), Selection::DAILY).unwrap();
        let titles: Vec<&str> = report.papers.iter().map(|r| r.record.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Dreamer 4: Scalable World Models", "Offline RL for arms", "Protein folding"]
        );
        assert_eq!(report.papers[0].record.tracked_author.as_deref(), Some("Danijar Hafner"));
        assert_eq!(report.papers[0].record.institution.as_deref(), Some("Google DeepMind"));
        assert!(report.markdown.contains("### [GitHub] big\n"));
        assert!(report.markdown.find("[GitHub] big") < report.markdown.find("[GitHub] small"));
    }

    #[test]
    fn weekly_report_selects_top_papers() {
        let papers = (0..10)
            .map(|i| paper(&format!("Paper {i}"), if i == 7 { "embodied robot" } else { "" }))
            .collect();
        let inputs = ReportInputs {
            papers,
            ..ReportInputs::default()
        };
        let report = weekly_report(
            &AppConfig::default(),
            inputs,
            "2026-02-17 ~ 2026-02-23",
            date(),
            Selection::WEEKLY,
        )
        .unwrap();
        assert_eq!(report.papers.len(), 6);
        assert_eq!(report.papers[0].record.title, "Paper 7");
        assert_eq!(report.papers[1].record.title, "Paper 0");
    }

    #[test]
    fn rendered_report_round_trips_to_blocks() {
        use dailypaper_markdown::{Block, parse_blocks};

        let mut vla = paper("OpenVLA-2", "A vision-language-action model.");
        vla.code_url = Some("https://github.com/openvla/openvla".into());
        let inputs = ReportInputs {
            papers: vec![vla, paper("Offline RL", "offline RL study")],
            repos: vec![Repository {
                name: "openvla/openvla".into(),
                description: "VLA".into(),
                url: "https://github.com/openvla/openvla".into(),
                stars: 10,
                ..Repository::default()
            }],
            hub_items: Vec::new(),
        };
        let report = daily_report(&AppConfig::default(), inputs, date(), Selection::DAILY).unwrap();
        let blocks = parse_blocks(&report.markdown);

        let headings: Vec<(u8, String)> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { level, .. } => Some((*level, b.plain_text())),
                _ => None,
            })
            .collect();
        assert_eq!(
            headings,
            [
                (1, "每日论文速递 — 2026-02-20".to_string()),
                (2, "VLA".to_string()),
                (3, "OpenVLA-2".to_string()),
                (2, "RL".to_string()),
                (3, "Offline RL".to_string()),
                (2, "开源项目精选".to_string()),
                (3, "[GitHub] openvla/openvla".to_string()),
            ]
        );

        // Summary paragraph, then the first paper's heading and six bullets.
        assert_eq!(blocks[1].block_type(), 2);
        assert!(blocks[1].runs()[0].style.bold);
        assert!(blocks[4..10].iter().all(|b| matches!(b, Block::Bullet(_))));

        let paper_link = blocks[8].runs();
        assert_eq!(paper_link[0].content, "链接");
        assert!(paper_link[0].style.bold);
        assert_eq!(paper_link[2].content, "Paper");
        assert_eq!(
            paper_link[2].style.link.as_deref(),
            Some("https://arxiv.org/abs/2602.00001")
        );
        let code_link = blocks[9].runs();
        assert_eq!(code_link[2].style.link.as_deref(), Some("https://github.com/openvla/openvla"));
    }
}
