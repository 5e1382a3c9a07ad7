//! Source adapters for the research digest.
//!
//! This crate provides:
//! - [`SourceAdapter`] — the trait every source implements
//! - [`HttpClient`] — shared reqwest client with per-request timeouts
//! - Adapters for arXiv, GitHub, Hugging Face, Papers-With-Code,
//!   Semantic Scholar, and the social feed command
//!
//! Adapters return `Err` on transport failures; deciding what an error
//! means for the run is left to the caller.

pub mod arxiv;
pub mod github;
pub mod http;
pub mod huggingface;
pub mod pwc;
pub mod scholar;
pub mod social;

use chrono::{NaiveDate, TimeDelta};
use dailypaper_shared::Result;

pub use arxiv::{ArxivAdapter, parse_feed};
pub use github::{GithubAdapter, select_repositories};
pub use http::HttpClient;
pub use huggingface::{HubFeed, HubStats, HuggingFaceAdapter, select_hub_items};
pub use pwc::PwcAdapter;
pub use scholar::ScholarAdapter;
pub use social::{SocialAdapter, SocialFeed, parse_posts};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A source of items for the digest.
#[allow(async_fn_in_trait)]
pub trait SourceAdapter {
    /// What one successful run produces. `Default` is the empty contribution.
    type Output: Default;

    /// Stable adapter name for tracing and run summaries.
    fn name(&self) -> &'static str;

    /// Query the source once.
    async fn fetch(&self, http: &HttpClient) -> Result<Self::Output>;
}

// ---------------------------------------------------------------------------
// FetchWindow
// ---------------------------------------------------------------------------

/// A look-back window ending at `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub today: NaiveDate,
    pub days: i64,
}

impl FetchWindow {
    pub fn new(today: NaiveDate, days: i64) -> Self {
        Self { today, days }
    }

    /// `today - days`.
    pub fn cutoff(&self) -> NaiveDate {
        self.today - TimeDelta::days(self.days)
    }

    /// Whether a dated item falls strictly after the cutoff date.
    pub fn admits(&self, date: NaiveDate) -> bool {
        date > self.cutoff()
    }

    /// Whether `date` is at most `days` before `today`.
    pub fn is_recent(&self, date: NaiveDate) -> bool {
        (self.today - date).num_days() <= self.days
    }
}
