//! Application configuration for dailypaper.
//!
//! User config lives at `~/.dailypaper/dailypaper.toml`.
//! CLI flags override config file values, which override defaults.
//! Every section has defaults, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DailyPaperError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dailypaper.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dailypaper";

// ---------------------------------------------------------------------------
// Config structs (matching dailypaper.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Ordered research topics and their keywords.
    #[serde(default)]
    pub taxonomy: Taxonomy,

    /// Institutions and research series that mark a paper as priority.
    #[serde(default)]
    pub priority: PriorityLists,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub social: SocialConfig,

    #[serde(default)]
    pub feishu: FeishuConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory for intermediate JSON files and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Per-request timeout in seconds for most HTTP calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_output_dir() -> String {
    "data".into()
}
fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Taxonomy / priority lists
// ---------------------------------------------------------------------------

/// One topic of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

impl TopicKeywords {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: to_strings(keywords),
        }
    }
}

/// `[taxonomy]` section. Declaration order breaks primary-topic ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default = "default_topics")]
    pub topics: Vec<TopicKeywords>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            topics: default_topics(),
        }
    }
}

impl Taxonomy {
    /// Topic names in declaration order.
    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.name.as_str())
    }
}

fn default_topics() -> Vec<TopicKeywords> {
    vec![
        TopicKeywords::new(
            "VLA",
            &[
                "vision-language-action",
                "VLA",
                "vision language action",
                "multimodal robot",
                "language-conditioned",
                "instruction following robot",
                "vision-language model robot",
                "VLM robot",
            ],
        ),
        TopicKeywords::new(
            "World Model",
            &[
                "world model",
                "world modeling",
                "predictive model",
                "dynamics model",
                "latent dynamics",
                "imagination",
                "model-based planning",
                "dreamer",
                "world simulator",
            ],
        ),
        TopicKeywords::new(
            "RL",
            &[
                "reinforcement learning",
                "offline RL",
                "model-based RL",
                "reward learning",
                "imitation learning",
                "policy learning",
                "actor-critic",
                "PPO",
                "SAC",
                "TD3",
                "RLHF",
                "inverse reinforcement",
                "demonstration learning",
            ],
        ),
    ]
}

/// `[priority]` section. Lists are scanned in order; the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityLists {
    #[serde(default = "default_affiliations")]
    pub affiliations: Vec<String>,

    #[serde(default = "default_series")]
    pub series: Vec<String>,
}

impl Default for PriorityLists {
    fn default() -> Self {
        Self {
            affiliations: default_affiliations(),
            series: default_series(),
        }
    }
}

fn default_affiliations() -> Vec<String> {
    to_strings(&[
        "DeepMind",
        "Google DeepMind",
        "Berkeley",
        "BAIR",
        "UC Berkeley",
        "NVIDIA",
        "1X",
        "1X Technologies",
        "Figure",
        "Figure AI",
        "Stanford",
        "MIT",
        "Massachusetts Institute of Technology",
        "OpenAI",
        "Anthropic",
        "Tesla",
        "Tesla AI",
        "Optimus",
        "Physical Intelligence",
        "Covariant",
        "Meta",
        "FAIR",
        "Facebook AI",
        "Yann LeCun",
        "LeCun",
    ])
}

fn default_series() -> Vec<String> {
    to_strings(&[
        "Dreamer",
        "DreamerV2",
        "DreamerV3",
        "DreamDojo",
        "DreamZero",
        "RT-1",
        "RT-2",
        "RT-X",
        "Robotics Transformer",
        "OpenVLA",
        "Octo",
        "ALOHA",
        "JEPA",
        "I-JEPA",
        "V-JEPA",
    ])
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// `[scoring]` section: weights for the daily and weekly ranking policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub daily: DailyWeights,

    #[serde(default)]
    pub weekly: WeeklyWeights,
}

/// Bonus added when a record's primary topic equals `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicBonus {
    pub topic: String,
    pub bonus: i64,
}

/// `[scoring.daily]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeights {
    #[serde(default = "default_priority_weight")]
    pub priority: i64,

    #[serde(default = "default_tracked_author_weight")]
    pub tracked_author: i64,

    /// Published at most this many days before "today" earns the recency bonus.
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,

    #[serde(default = "default_recency_bonus")]
    pub recency_bonus: i64,

    #[serde(default = "default_topic_bonus")]
    pub topic_bonus: Vec<TopicBonus>,
}

impl Default for DailyWeights {
    fn default() -> Self {
        Self {
            priority: default_priority_weight(),
            tracked_author: default_tracked_author_weight(),
            recency_days: default_recency_days(),
            recency_bonus: default_recency_bonus(),
            topic_bonus: default_topic_bonus(),
        }
    }
}

fn default_priority_weight() -> i64 {
    10
}
fn default_tracked_author_weight() -> i64 {
    10
}
fn default_recency_days() -> i64 {
    2
}
fn default_recency_bonus() -> i64 {
    2
}
fn default_topic_bonus() -> Vec<TopicBonus> {
    [("VLA", 5), ("World Model", 5), ("RL", 3)]
        .into_iter()
        .map(|(topic, bonus)| TopicBonus {
            topic: topic.into(),
            bonus,
        })
        .collect()
}

/// A keyword and its weight in the weekly policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: i64,
}

/// `[scoring.weekly]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyWeights {
    #[serde(default = "default_weekly_keywords")]
    pub keywords: Vec<KeywordWeight>,

    /// Added when the summary mentions a code release.
    #[serde(default = "default_code_bonus")]
    pub code_bonus: i64,
}

impl Default for WeeklyWeights {
    fn default() -> Self {
        Self {
            keywords: default_weekly_keywords(),
            code_bonus: default_code_bonus(),
        }
    }
}

fn default_weekly_keywords() -> Vec<KeywordWeight> {
    [
        ("vla", 3),
        ("vision-language-action", 3),
        ("world model", 3),
        ("world models", 3),
        ("reinforcement learning", 1),
        ("rl", 1),
        ("robot", 1),
        ("embodied", 2),
        ("foundation model", 2),
        ("transformer", 1),
        ("generalization", 1),
        ("sim-to-real", 2),
    ]
    .into_iter()
    .map(|(keyword, weight)| KeywordWeight {
        keyword: keyword.into(),
        weight,
    })
    .collect()
}
fn default_code_bonus() -> i64 {
    2
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// `[sources]` section: one sub-table per adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub arxiv: ArxivConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub huggingface: HuggingFaceConfig,

    #[serde(default)]
    pub pwc: PwcConfig,

    #[serde(default)]
    pub scholar: ScholarConfig,
}

/// `[sources.arxiv]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    #[serde(default = "default_arxiv_base")]
    pub base_url: String,

    #[serde(default = "default_arxiv_categories")]
    pub categories: Vec<String>,

    #[serde(default = "default_arxiv_max_results")]
    pub max_results: u32,

    /// Entries published within this many days of the target date are kept.
    #[serde(default = "default_arxiv_window")]
    pub window_days: i64,

    /// Candidates kept after triage.
    #[serde(default = "default_arxiv_limit")]
    pub limit: usize,

    #[serde(default = "default_arxiv_timeout")]
    pub timeout_secs: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_base(),
            categories: default_arxiv_categories(),
            max_results: default_arxiv_max_results(),
            window_days: default_arxiv_window(),
            limit: default_arxiv_limit(),
            timeout_secs: default_arxiv_timeout(),
        }
    }
}

fn default_arxiv_base() -> String {
    "https://export.arxiv.org".into()
}
fn default_arxiv_categories() -> Vec<String> {
    to_strings(&["cs.RO", "cs.LG", "cs.CV", "cs.AI"])
}
fn default_arxiv_max_results() -> u32 {
    300
}
fn default_arxiv_window() -> i64 {
    3
}
fn default_arxiv_limit() -> usize {
    80
}
fn default_arxiv_timeout() -> u64 {
    60
}

/// `[sources.github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_base")]
    pub base_url: String,

    /// Searched as `topic:{t}` over `topic_days`.
    #[serde(default = "default_github_topics")]
    pub topics: Vec<String>,

    #[serde(default = "default_github_topic_days")]
    pub topic_days: i64,

    /// Free-text queries; only the first `max_keywords` are searched.
    #[serde(default = "default_github_keywords")]
    pub keywords: Vec<String>,

    #[serde(default = "default_github_max_keywords")]
    pub max_keywords: usize,

    #[serde(default = "default_github_per_query")]
    pub per_query: u32,

    #[serde(default = "default_github_min_stars")]
    pub min_stars: u64,

    #[serde(default = "default_github_limit")]
    pub limit: usize,

    #[serde(default = "default_github_days")]
    pub days: i64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: default_github_base(),
            topics: default_github_topics(),
            topic_days: default_github_topic_days(),
            keywords: default_github_keywords(),
            max_keywords: default_github_max_keywords(),
            per_query: default_github_per_query(),
            min_stars: default_github_min_stars(),
            limit: default_github_limit(),
            days: default_github_days(),
        }
    }
}

fn default_github_base() -> String {
    "https://api.github.com".into()
}
fn default_github_topics() -> Vec<String> {
    to_strings(&[
        "reinforcement-learning",
        "robot-learning",
        "robotics",
        "world-model",
        "vision-language",
        "imitation-learning",
    ])
}
fn default_github_topic_days() -> i64 {
    7
}
fn default_github_keywords() -> Vec<String> {
    to_strings(&[
        "VLA",
        "vision-language-action",
        "world model",
        "dreamer",
        "robot",
        "manipulation",
        "reinforcement learning",
        "RL",
    ])
}
fn default_github_max_keywords() -> usize {
    5
}
fn default_github_per_query() -> u32 {
    20
}
fn default_github_min_stars() -> u64 {
    10
}
fn default_github_limit() -> usize {
    50
}
fn default_github_days() -> i64 {
    7
}

/// `[sources.huggingface]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default = "default_hf_base")]
    pub base_url: String,

    #[serde(default = "default_hf_model_tags")]
    pub model_tags: Vec<String>,

    #[serde(default = "default_hf_dataset_filter")]
    pub dataset_filter: String,

    #[serde(default = "default_hf_priority_orgs")]
    pub priority_orgs: Vec<String>,

    #[serde(default = "default_hf_models_per_tag")]
    pub models_per_tag: u32,

    #[serde(default = "default_hf_list_limit")]
    pub datasets_limit: u32,

    #[serde(default = "default_hf_list_limit")]
    pub spaces_limit: u32,

    #[serde(default = "default_hf_limit")]
    pub limit: usize,

    #[serde(default = "default_hf_days")]
    pub days: i64,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_hf_base(),
            model_tags: default_hf_model_tags(),
            dataset_filter: default_hf_dataset_filter(),
            priority_orgs: default_hf_priority_orgs(),
            models_per_tag: default_hf_models_per_tag(),
            datasets_limit: default_hf_list_limit(),
            spaces_limit: default_hf_list_limit(),
            limit: default_hf_limit(),
            days: default_hf_days(),
        }
    }
}

fn default_hf_base() -> String {
    "https://huggingface.co".into()
}
fn default_hf_model_tags() -> Vec<String> {
    to_strings(&[
        "robotics",
        "reinforcement-learning",
        "world-model",
        "vision-language",
        "multimodal",
        "text-to-action",
    ])
}
fn default_hf_dataset_filter() -> String {
    "robotics,reinforcement-learning".into()
}
fn default_hf_priority_orgs() -> Vec<String> {
    to_strings(&[
        "google",
        "meta-llama",
        "openai",
        "microsoft",
        "nvidia",
        "deepmind",
        "berkeley-nest",
        "openvla",
    ])
}
fn default_hf_models_per_tag() -> u32 {
    20
}
fn default_hf_list_limit() -> u32 {
    30
}
fn default_hf_limit() -> usize {
    100
}
fn default_hf_days() -> i64 {
    7
}

/// `[sources.pwc]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwcConfig {
    #[serde(default = "default_pwc_base")]
    pub base_url: String,

    #[serde(default = "default_pwc_limit")]
    pub limit: u32,

    #[serde(default = "default_pwc_days")]
    pub days: i64,

    /// Timeout for the per-paper repository lookup.
    #[serde(default = "default_pwc_repo_timeout")]
    pub repo_timeout_secs: u64,
}

impl Default for PwcConfig {
    fn default() -> Self {
        Self {
            base_url: default_pwc_base(),
            limit: default_pwc_limit(),
            days: default_pwc_days(),
            repo_timeout_secs: default_pwc_repo_timeout(),
        }
    }
}

fn default_pwc_base() -> String {
    "https://paperswithcode.com".into()
}
fn default_pwc_limit() -> u32 {
    50
}
fn default_pwc_days() -> i64 {
    1
}
fn default_pwc_repo_timeout() -> u64 {
    10
}

/// An author followed on Semantic Scholar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAuthor {
    pub name: String,
    pub id: String,
}

/// `[sources.scholar]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarConfig {
    #[serde(default = "default_scholar_base")]
    pub base_url: String,

    #[serde(default = "default_scholar_authors")]
    pub authors: Vec<TrackedAuthor>,

    #[serde(default = "default_scholar_queries")]
    pub queries: Vec<String>,

    #[serde(default = "default_scholar_author_limit")]
    pub author_limit: u32,

    #[serde(default = "default_scholar_search_limit")]
    pub search_limit: u32,

    /// Fixed pause between consecutive API calls.
    #[serde(default = "default_scholar_delay")]
    pub delay_ms: u64,

    #[serde(default = "default_scholar_days")]
    pub days: i64,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_scholar_base(),
            authors: default_scholar_authors(),
            queries: default_scholar_queries(),
            author_limit: default_scholar_author_limit(),
            search_limit: default_scholar_search_limit(),
            delay_ms: default_scholar_delay(),
            days: default_scholar_days(),
        }
    }
}

fn default_scholar_base() -> String {
    "https://api.semanticscholar.org".into()
}
fn default_scholar_authors() -> Vec<TrackedAuthor> {
    [
        ("Yann LeCun", "1688882"),
        ("Pieter Abbeel", "1736370"),
        ("Sergey Levine", "2691021"),
        ("Chelsea Finn", "2065960"),
        ("Danijar Hafner", "2059290"),
        ("Kaiming He", "2164085"),
        ("Ilya Sutskever", "1695689"),
        ("Jim Fan (Linxi Fan)", "3275727"),
    ]
    .into_iter()
    .map(|(name, id)| TrackedAuthor {
        name: name.into(),
        id: id.into(),
    })
    .collect()
}
fn default_scholar_queries() -> Vec<String> {
    to_strings(&[
        "vision language action robot",
        "world model reinforcement learning",
        "robot imitation learning",
    ])
}
fn default_scholar_author_limit() -> u32 {
    20
}
fn default_scholar_search_limit() -> u32 {
    50
}
fn default_scholar_delay() -> u64 {
    1000
}
fn default_scholar_days() -> i64 {
    7
}

// ---------------------------------------------------------------------------
// Social feed / document API
// ---------------------------------------------------------------------------

/// `[social]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// External retrieval command, run once per account.
    #[serde(default = "default_social_command")]
    pub command: String,

    /// Argument template; `{account}` and `{count}` are substituted per run.
    #[serde(default = "default_social_args")]
    pub args: Vec<String>,

    #[serde(default = "default_social_accounts")]
    pub accounts: Vec<String>,

    /// JSON file holding `{auth_token, ct0}`.
    #[serde(default = "default_social_credentials")]
    pub credentials_path: String,

    #[serde(default = "default_paper_keywords")]
    pub paper_keywords: Vec<String>,

    #[serde(default = "default_social_posts")]
    pub posts_per_account: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            command: default_social_command(),
            args: default_social_args(),
            accounts: default_social_accounts(),
            credentials_path: default_social_credentials(),
            paper_keywords: default_paper_keywords(),
            posts_per_account: default_social_posts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_social_command() -> String {
    "bird".into()
}
fn default_social_args() -> Vec<String> {
    to_strings(&["user-tweets", "@{account}", "-n", "{count}", "--json"])
}
fn default_social_accounts() -> Vec<String> {
    to_strings(&[
        "ylecun",
        "PieterAbbeel",
        "chelseabfinn",
        "daborosolov",
        "_akhaliq",
        "GoogleDeepMind",
        "GoogleAI",
        "OpenAI",
        "AIatMeta",
        "ABOROSOLOV",
        "DrJimFan",
        "AndrewYNg",
        "kaborosolov",
    ])
}
fn default_social_credentials() -> String {
    "~/.dailypaper/x_credentials.json".into()
}
fn default_paper_keywords() -> Vec<String> {
    to_strings(&[
        "paper",
        "arxiv",
        "published",
        "accepted",
        "new work",
        "research",
        "preprint",
        "code available",
        "github.com",
    ])
}
fn default_social_posts() -> u32 {
    10
}

/// `[feishu]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeishuConfig {
    #[serde(default = "default_feishu_base")]
    pub base_url: String,

    #[serde(default)]
    pub app_id: String,

    /// Name of the env var holding the app secret (never store the secret itself).
    #[serde(default = "default_app_secret_env")]
    pub app_secret_env: String,

    /// Blocks per insert request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Prefix for links to created documents.
    #[serde(default = "default_doc_url_base")]
    pub doc_url_base: String,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            base_url: default_feishu_base(),
            app_id: String::new(),
            app_secret_env: default_app_secret_env(),
            batch_size: default_batch_size(),
            doc_url_base: default_doc_url_base(),
        }
    }
}

fn default_feishu_base() -> String {
    "https://open.feishu.cn".into()
}
fn default_app_secret_env() -> String {
    "FEISHU_APP_SECRET".into()
}
fn default_batch_size() -> usize {
    30
}
fn default_doc_url_base() -> String {
    "https://feishu.cn/docx".into()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dailypaper/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DailyPaperError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dailypaper/dailypaper.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DailyPaperError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DailyPaperError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DailyPaperError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DailyPaperError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DailyPaperError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the document API app secret from the configured env var.
pub fn resolve_feishu_secret(config: &AppConfig) -> Result<String> {
    if config.feishu.app_id.is_empty() {
        return Err(DailyPaperError::config(
            "feishu.app_id is not set. Add it to the [feishu] section of dailypaper.toml",
        ));
    }
    let var_name = &config.feishu.app_secret_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DailyPaperError::config(format!(
            "Feishu app secret not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("FEISHU_APP_SECRET"));
        assert!(toml_str.contains("vision-language-action"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.taxonomy, Taxonomy::default());
        assert_eq!(parsed.priority, PriorityLists::default());
        assert_eq!(parsed.scoring, ScoringConfig::default());
        assert_eq!(parsed.sources.scholar.authors.len(), 8);
        assert_eq!(parsed.feishu.batch_size, 30);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("parse");
        let names: Vec<&str> = config.taxonomy.topic_names().collect();
        assert_eq!(names, ["VLA", "World Model", "RL"]);
        assert_eq!(config.sources.arxiv.max_results, 300);
        assert_eq!(config.sources.arxiv.timeout_secs, 60);
        assert_eq!(config.sources.scholar.delay_ms, 1000);
        assert_eq!(config.scoring.daily.priority, 10);
        assert_eq!(config.scoring.weekly.code_bonus, 2);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/dailypaper"

[[taxonomy.topics]]
name = "Navigation"
keywords = ["navigation", "slam"]

[priority]
affiliations = ["MIT"]

[sources.github]
min_stars = 50

[feishu]
app_id = "cli_test"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/dailypaper");
        assert_eq!(config.taxonomy.topics.len(), 1);
        assert_eq!(config.priority.affiliations, vec!["MIT".to_string()]);
        assert_eq!(config.priority.series, default_series());
        assert_eq!(config.sources.github.min_stars, 50);
        assert_eq!(config.sources.github.per_query, 20);
        assert_eq!(config.feishu.app_id, "cli_test");
        assert_eq!(config.feishu.base_url, "https://open.feishu.cn");
    }

    #[test]
    fn secret_requires_app_id_and_env() {
        let mut config = AppConfig::default();
        let err = resolve_feishu_secret(&config).unwrap_err();
        assert!(err.to_string().contains("app_id"));

        config.feishu.app_id = "cli_test".into();
        // Use a unique env var name to avoid interfering with other tests
        config.feishu.app_secret_env = "DP_TEST_NONEXISTENT_SECRET_12345".into();
        let err = resolve_feishu_secret(&config).unwrap_err();
        assert!(err.to_string().contains("DP_TEST_NONEXISTENT_SECRET_12345"));
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
        assert_eq!(expand_home("rel/x.json"), PathBuf::from("rel/x.json"));
    }
}
