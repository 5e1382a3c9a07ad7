//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate, TimeDelta};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use dailypaper_core::interchange::{
    ArxivEnvelope, HubEnvelope, PaperEnvelope, RepoEnvelope, SocialEnvelope, load_all_records,
    load_hub_items, load_repositories, write_json,
};
use dailypaper_core::pipeline::{arxiv_candidates, daily_report, weekly_report};
use dailypaper_core::{
    Classifier, ProgressReporter, Report, ReportInputs, Selection, SourceOutcome, collect,
    parse_card,
};
use dailypaper_markdown::parse_blocks;
use dailypaper_publisher::{FeishuClient, InsertMode};
use dailypaper_shared::{
    AppConfig, Source, expand_home, init_config, load_config, load_config_from,
    resolve_feishu_secret,
};
use dailypaper_sources::{
    ArxivAdapter, GithubAdapter, HttpClient, HuggingFaceAdapter, PwcAdapter, ScholarAdapter,
    SocialAdapter,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// Default file names under `defaults.output_dir`.
const ARXIV_FILE: &str = "arxiv_papers.json";
const GITHUB_FILE: &str = "github_repos.json";
const HUB_FILE: &str = "huggingface.json";
const PWC_FILE: &str = "pwc_papers.json";
const SCHOLAR_FILE: &str = "s2_papers.json";
const SOCIAL_FILE: &str = "x_tweets.json";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dailypaper: embodied-AI research digests.
#[derive(Parser)]
#[command(
    name = "dailypaper",
    version,
    about = "Collect research papers, repositories and posts into daily and weekly digests.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.dailypaper/dailypaper.toml).
    #[arg(long, global = true, env = "DAILYPAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Query one source and write its interchange file.
    Fetch {
        #[command(subcommand)]
        source: FetchSource,
    },

    /// Render a digest from interchange files.
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Extract the card payload from a weekly report.
    Card {
        /// Weekly report markdown.
        #[arg(long)]
        input: PathBuf,

        /// Date range shown on the card, e.g. "2026-02-17 ~ 2026-02-23".
        #[arg(long)]
        range: String,

        /// Link to the full report.
        #[arg(long)]
        doc_url: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a markdown report into an existing document.
    Publish {
        /// Markdown file to publish.
        #[arg(long)]
        input: PathBuf,

        /// Target document ID.
        #[arg(long)]
        doc_id: String,

        /// Append to the end instead of prepending to the top.
        #[arg(long)]
        append: bool,
    },

    /// Document management.
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sources that can be fetched.
#[derive(Subcommand)]
pub(crate) enum FetchSource {
    /// Recent arXiv submissions, classified and triaged.
    Arxiv {
        /// Target date (YYYY-MM-DD), defaults to yesterday.
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum candidates kept.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Active GitHub repositories.
    Github {
        #[arg(long)]
        days: Option<i64>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Hugging Face models, datasets and spaces.
    Huggingface {
        #[arg(long)]
        days: Option<i64>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Papers-With-Code listings.
    Pwc {
        #[arg(long)]
        days: Option<i64>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Semantic Scholar tracked authors and searches.
    Scholar {
        #[arg(long)]
        days: Option<i64>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the keyword searches.
        #[arg(long)]
        authors_only: bool,
    },
    /// Posts from the configured social accounts.
    Social {
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Accounts to read instead of the configured list.
        #[arg(long, num_args = 1..)]
        accounts: Vec<String>,
    },
}

/// Report kinds.
#[derive(Subcommand)]
pub(crate) enum ReportKind {
    /// Daily digest.
    Daily {
        /// Report date (YYYY-MM-DD), defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        arxiv: Option<PathBuf>,

        #[arg(long)]
        scholar: Option<PathBuf>,

        #[arg(long)]
        github: Option<PathBuf>,

        #[arg(long)]
        huggingface: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of papers shown.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Weekly digest.
    Weekly {
        /// Date range, e.g. "2026-02-17 ~ 2026-02-23".
        #[arg(long)]
        range: String,

        /// Paper files to merge (defaults to the arXiv and Semantic Scholar outputs).
        #[arg(long, num_args = 1..)]
        papers: Vec<PathBuf>,

        #[arg(long)]
        repos: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of papers shown.
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Document subcommands.
#[derive(Subcommand)]
pub(crate) enum DocAction {
    /// Create an empty document.
    Create {
        #[arg(long)]
        title: String,

        /// Open ID granted full access to the new document.
        #[arg(long)]
        member_id: Option<String>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dailypaper=info",
        1 => "dailypaper=debug",
        _ => "dailypaper=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stdout)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stdout)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init();
    }

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Fetch { source } => cmd_fetch(&config, source).await,
        Command::Report { kind } => cmd_report(&config, kind),
        Command::Card {
            input,
            range,
            doc_url,
            output,
        } => cmd_card(&config, &input, &range, &doc_url, output),
        Command::Publish {
            input,
            doc_id,
            append,
        } => cmd_publish(&config, &input, &doc_id, append).await,
        Command::Doc {
            action: DocAction::Create { title, member_id },
        } => cmd_doc_create(&config, &title, member_id.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Yesterday, the latest complete submission day.
fn arxiv_default_target(today: NaiveDate) -> NaiveDate {
    today - TimeDelta::days(1)
}

/// `given`, or `name` inside the configured output directory.
fn output_path(config: &AppConfig, given: Option<PathBuf>, name: &str) -> PathBuf {
    given.unwrap_or_else(|| expand_home(&config.defaults.output_dir).join(name))
}

fn print_fetch_summary(outcome: &SourceOutcome, count: usize, path: &Path) {
    println!();
    match &outcome.error {
        None => println!("  Fetched {count} items from {}", outcome.adapter),
        Some(e) => println!("  {} failed, wrote an empty result: {e}", outcome.adapter),
    }
    println!("  Output: {}", path.display());
    println!("  Time:   {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

async fn cmd_fetch(config: &AppConfig, source: FetchSource) -> Result<ExitCode> {
    let http = HttpClient::new(config.defaults.timeout_secs)?;
    let progress = CliProgress::new();
    let fetch_time = Local::now().naive_local();
    let today = today();

    let (path, count, outcome) = match source {
        FetchSource::Arxiv {
            date,
            output,
            limit,
        } => {
            let target = date.unwrap_or_else(|| arxiv_default_target(today));
            let limit = limit.unwrap_or(config.sources.arxiv.limit);
            let classifier = Classifier::new(&config.taxonomy, &config.priority)?;
            let adapter = ArxivAdapter::new(config.sources.arxiv.clone(), target);

            let (records, outcome) = collect(&adapter, &http, &progress).await;
            progress.phase("Classifying papers");
            let candidates = arxiv_candidates(records, &classifier, limit);

            let path = output_path(config, output, ARXIV_FILE);
            let count = candidates.papers.len();
            let envelope = ArxivEnvelope {
                date: target,
                fetch_time,
                total_fetched: candidates.total_fetched,
                total_relevant: candidates.total_relevant,
                papers: candidates.papers,
            };
            write_json(&path, &envelope)?;
            (path, count, outcome)
        }
        FetchSource::Github {
            days,
            output,
            limit,
        } => {
            let mut github = config.sources.github.clone();
            github.days = days.unwrap_or(github.days);
            github.limit = limit.unwrap_or(github.limit);

            let (repos, outcome) = collect(&GithubAdapter::new(github, today), &http, &progress).await;
            let path = output_path(config, output, GITHUB_FILE);
            let count = repos.len();
            write_json(&path, &RepoEnvelope::new(fetch_time, repos))?;
            (path, count, outcome)
        }
        FetchSource::Huggingface {
            days,
            output,
            limit,
        } => {
            let mut hub = config.sources.huggingface.clone();
            hub.days = days.unwrap_or(hub.days);
            hub.limit = limit.unwrap_or(hub.limit);

            let (feed, outcome) =
                collect(&HuggingFaceAdapter::new(hub, today), &http, &progress).await;
            let path = output_path(config, output, HUB_FILE);
            let count = feed.items.len();
            write_json(&path, &HubEnvelope::new(fetch_time, feed.items, feed.stats))?;
            (path, count, outcome)
        }
        FetchSource::Pwc {
            days,
            limit,
            output,
        } => {
            let mut pwc = config.sources.pwc.clone();
            pwc.days = days.unwrap_or(pwc.days);
            pwc.limit = limit.unwrap_or(pwc.limit);

            let (papers, outcome) = collect(&PwcAdapter::new(pwc, today), &http, &progress).await;
            let path = output_path(config, output, PWC_FILE);
            let count = papers.len();
            write_json(&path, &PaperEnvelope::new(Source::PapersWithCode, papers))?;
            (path, count, outcome)
        }
        FetchSource::Scholar {
            days,
            output,
            authors_only,
        } => {
            let mut scholar = config.sources.scholar.clone();
            scholar.days = days.unwrap_or(scholar.days);
            let adapter = ScholarAdapter::new(scholar, today).authors_only(authors_only);

            let (papers, outcome) = collect(&adapter, &http, &progress).await;
            let path = output_path(config, output, SCHOLAR_FILE);
            let count = papers.len();
            write_json(&path, &PaperEnvelope::new(Source::SemanticScholar, papers))?;
            (path, count, outcome)
        }
        FetchSource::Social { output, accounts } => {
            let mut adapter = SocialAdapter::new(config.social.clone());
            if !accounts.is_empty() {
                adapter = adapter.with_accounts(accounts);
            }

            let (feed, outcome) = collect(&adapter, &http, &progress).await;
            let path = output_path(config, output, SOCIAL_FILE);
            let count = feed.posts.len();
            for error in &feed.errors {
                progress.note(&format!("  ! {error}"));
            }
            write_json(&path, &SocialEnvelope::new(fetch_time, feed))?;
            (path, count, outcome)
        }
    };

    progress.done();
    print_fetch_summary(&outcome, count, &path);
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// report / card
// ---------------------------------------------------------------------------

fn cmd_report(config: &AppConfig, kind: ReportKind) -> Result<ExitCode> {
    let out_dir = expand_home(&config.defaults.output_dir);
    let input = |given: Option<PathBuf>, name: &str| given.unwrap_or_else(|| out_dir.join(name));

    let (report, path) = match kind {
        ReportKind::Daily {
            date,
            arxiv,
            scholar,
            github,
            huggingface,
            output,
            limit,
        } => {
            let date = date.unwrap_or_else(today);
            let inputs = ReportInputs {
                papers: load_all_records(&[input(arxiv, ARXIV_FILE), input(scholar, SCHOLAR_FILE)])?,
                repos: load_repositories(&input(github, GITHUB_FILE))?,
                hub_items: load_hub_items(&input(huggingface, HUB_FILE))?,
            };
            let selection = Selection {
                papers: limit.unwrap_or(Selection::DAILY.papers),
                ..Selection::DAILY
            };

            let report = daily_report(config, inputs, date, selection)?;
            (report, output_path(config, output, &format!("{date}-cn.md")))
        }
        ReportKind::Weekly {
            range,
            papers,
            repos,
            output,
            limit,
        } => {
            let papers = if papers.is_empty() {
                vec![out_dir.join(ARXIV_FILE), out_dir.join(SCHOLAR_FILE)]
            } else {
                papers
            };
            let inputs = ReportInputs {
                papers: load_all_records(&papers)?,
                repos: load_repositories(&input(repos, GITHUB_FILE))?,
                hub_items: Vec::new(),
            };
            let selection = Selection {
                papers: limit.unwrap_or(Selection::WEEKLY.papers),
                ..Selection::WEEKLY
            };

            let report = weekly_report(config, inputs, &range, today(), selection)?;
            let name = format!("weekly-{}.md", range_slug(&range));
            (report, output_path(config, output, &name))
        }
    };

    write_text(&path, &report.markdown)?;
    print_report_summary(&report, &path);
    Ok(ExitCode::SUCCESS)
}

/// "2026-02-17 ~ 2026-02-23" -> "2026-02-17-to-2026-02-23".
fn range_slug(range: &str) -> String {
    range
        .split('~')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-to-")
        .replace(char::is_whitespace, "-")
}

/// Last date of a range, or the whole range when it has no separator.
fn range_end(range: &str) -> &str {
    range.rsplit('~').next().unwrap_or(range).trim()
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn print_report_summary(report: &Report, path: &Path) {
    println!();
    println!("  Report generated at {}", path.display());
    println!("  Papers: {}", report.papers.len());
    println!("  Repos:  {}", report.repos);
    if report.hub_items > 0 {
        println!("  Hub:    {}", report.hub_items);
    }
    for ranked in report.papers.iter().take(5) {
        println!("    [{:>3}] {}", ranked.score, ranked.record.title);
    }
    println!();
}

fn cmd_card(
    config: &AppConfig,
    input: &Path,
    range: &str,
    doc_url: &str,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let markdown = std::fs::read_to_string(input)
        .wrap_err_with(|| format!("failed to read {}", input.display()))?;
    let card = parse_card(&markdown, range, doc_url);

    let path = output_path(config, output, &format!("weekly-paper-{}.json", range_end(range)));
    write_json(&path, &card)?;

    info!(papers = card.papers.len(), trends = card.trends.len(), "card data extracted");
    println!("Card data generated: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// publish / doc
// ---------------------------------------------------------------------------

async fn connect(config: &AppConfig) -> Result<FeishuClient> {
    let secret = resolve_feishu_secret(config)?;
    Ok(FeishuClient::connect(&config.feishu, &secret, config.defaults.timeout_secs).await?)
}

fn doc_url(config: &AppConfig, doc_id: &str) -> String {
    format!("{}/{doc_id}", config.feishu.doc_url_base.trim_end_matches('/'))
}

async fn cmd_publish(config: &AppConfig, input: &Path, doc_id: &str, append: bool) -> Result<ExitCode> {
    let markdown = std::fs::read_to_string(input)
        .wrap_err_with(|| format!("failed to read {}", input.display()))?;
    println!("Read {} characters from {}", markdown.chars().count(), input.display());

    let blocks = parse_blocks(&markdown);
    println!("Parsed {} blocks", blocks.len());

    let client = connect(config).await?;
    let mode = if append {
        InsertMode::Append
    } else {
        InsertMode::Prepend
    };
    let report = client.publish(doc_id, blocks, mode).await?;

    println!("Total blocks added: {}/{}", report.inserted, report.total);
    if report.is_complete() {
        println!("Successfully wrote to {}", doc_url(config, doc_id));
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Some blocks failed to write ({} failed batches)", report.failed_batches);
        Ok(ExitCode::FAILURE)
    }
}

async fn cmd_doc_create(config: &AppConfig, title: &str, member_id: Option<&str>) -> Result<ExitCode> {
    let client = connect(config).await?;
    let doc_id = client.create_document(title).await?;
    println!("DOC_ID:{doc_id}");
    println!("URL:   {}", doc_url(config, &doc_id));

    if let Some(member) = member_id {
        client.grant_permission(&doc_id, member).await?;
        println!("Granted full access to {member}");
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(config: &AppConfig) -> Result<ExitCode> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    /// Print a line above the spinner.
    fn note(&self, line: &str) {
        self.spinner.println(line);
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_finished(&self, outcome: &SourceOutcome) {
        let secs = outcome.elapsed.as_secs_f64();
        match &outcome.error {
            None => self.note(&format!("  ✓ {} ({secs:.1}s)", outcome.adapter)),
            Some(e) => self.note(&format!("  ✗ {} ({secs:.1}s): {e}", outcome.adapter)),
        }
    }

    fn done(&self) {
        self.spinner.finish_and_clear();
    }
}
