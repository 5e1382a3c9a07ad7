//! Shared types, error model, and configuration for dailypaper.
//!
//! This crate is the foundation depended on by all other dailypaper crates.
//! It provides:
//! - [`DailyPaperError`] — the unified error type
//! - Domain types ([`Record`], [`Repository`], [`HubItem`], [`Post`])
//! - Configuration ([`AppConfig`], [`Taxonomy`], [`PriorityLists`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ArxivConfig, DailyWeights, DefaultsConfig, FeishuConfig, GithubConfig,
    HuggingFaceConfig, KeywordWeight, PriorityLists, PwcConfig, ScholarConfig, ScoringConfig,
    SocialConfig, SourcesConfig, Taxonomy, TopicBonus, TopicKeywords, TrackedAuthor,
    WeeklyWeights, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from, resolve_feishu_secret,
};
pub use error::{DailyPaperError, Result};
pub use types::{
    HubItem, HubKind, Post, Priority, Record, Relevance, Repository, Source, TopicCounts,
    normalize_title, parse_date_prefix,
};
