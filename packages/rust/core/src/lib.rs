//! Core pipeline logic for dailypaper.
//!
//! Classification, deduplication and ranking of collected papers, the
//! report renderers, the weekly card payload, interchange files, and the
//! driver that ties the adapters to all of it.

pub mod card;
pub mod classify;
pub mod dedupe;
pub mod interchange;
pub mod pipeline;
pub mod rank;
pub mod report;

pub use card::{CardData, parse_card};
pub use classify::Classifier;
pub use dedupe::dedupe;
pub use pipeline::{ProgressReporter, Report, ReportInputs, Selection, SilentProgress, SourceOutcome, collect};
pub use rank::{Ranked, ScoringPolicy, rank, rank_by, score, select_top};
