//! Core domain types for the dailypaper pipeline.
//!
//! A [`Record`] is one paper collected from a source. Relevance and priority
//! are derived by the classifier; the interchange format keeps the derived
//! fields for readability but never trusts them on load.

use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where a record was collected from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// arXiv Atom API. Files written by the arXiv step carry no `source` key.
    #[default]
    Arxiv,
    Github,
    #[serde(rename = "huggingface")]
    HuggingFace,
    PapersWithCode,
    SemanticScholar,
    #[serde(alias = "x_twitter")]
    Social,
}

impl Source {
    /// Stable identifier used in file envelopes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arxiv => "arxiv",
            Self::Github => "github",
            Self::HuggingFace => "huggingface",
            Self::PapersWithCode => "papers_with_code",
            Self::SemanticScholar => "semantic_scholar",
            Self::Social => "social",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TopicCounts / Relevance
// ---------------------------------------------------------------------------

/// Keyword hit counts per topic, kept in taxonomy declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicCounts(Vec<(String, u32)>);

impl TopicCounts {
    pub fn new(counts: Vec<(String, u32)>) -> Self {
        Self(counts)
    }

    /// Count for `topic`, or 0 if the topic is unknown.
    pub fn get(&self, topic: &str) -> u32 {
        self.0
            .iter()
            .find(|(t, _)| t == topic)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(t, c)| (t.as_str(), *c))
    }

    /// Sum of all topic counts.
    pub fn total(&self) -> u32 {
        self.0.iter().map(|(_, c)| c).sum()
    }

    /// First topic holding the maximum count; `None` when every count is 0.
    fn argmax(&self) -> Option<&str> {
        let mut best: Option<(&str, u32)> = None;
        for (topic, count) in &self.0 {
            if *count > 0 && best.is_none_or(|(_, b)| *count > b) {
                best = Some((topic, *count));
            }
        }
        best.map(|(topic, _)| topic)
    }
}

impl Serialize for TopicCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (topic, count) in &self.0 {
            map.serialize_entry(topic, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopicCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = TopicCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of topic name to keyword count")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut counts = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((topic, count)) = access.next_entry::<String, u32>()? {
                    counts.push((topic, count));
                }
                Ok(TopicCounts(counts))
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// Topic relevance of a record. The primary topic is always derived from the counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RelevanceRepr", into = "RelevanceRepr")]
pub struct Relevance {
    counts: TopicCounts,
    primary: Option<String>,
}

impl Relevance {
    pub fn from_counts(counts: TopicCounts) -> Self {
        let primary = counts.argmax().map(String::from);
        Self { counts, primary }
    }

    pub fn counts(&self) -> &TopicCounts {
        &self.counts
    }

    pub fn primary_topic(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn is_relevant(&self) -> bool {
        self.primary.is_some()
    }
}

/// Wire shape of [`Relevance`]; `primary_topic`/`is_relevant` are written but ignored on read.
#[derive(Serialize, Deserialize)]
struct RelevanceRepr {
    #[serde(default)]
    topic_relevance: TopicCounts,
    #[serde(default)]
    primary_topic: Option<String>,
    #[serde(default)]
    is_relevant: bool,
}

impl From<RelevanceRepr> for Relevance {
    fn from(repr: RelevanceRepr) -> Self {
        Relevance::from_counts(repr.topic_relevance)
    }
}

impl From<Relevance> for RelevanceRepr {
    fn from(rel: Relevance) -> Self {
        let is_relevant = rel.is_relevant();
        Self {
            topic_relevance: rel.counts,
            primary_topic: rel.primary,
            is_relevant,
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Priority markers found by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PriorityRepr", into = "PriorityRepr")]
pub struct Priority {
    /// First matching institution / person from the affiliation list.
    pub affiliation: Option<String>,
    /// First matching named research series.
    pub series: Option<String>,
}

impl Priority {
    pub fn is_priority(&self) -> bool {
        self.affiliation.is_some() || self.series.is_some()
    }
}

#[derive(Serialize, Deserialize)]
struct PriorityRepr {
    #[serde(default)]
    priority_affiliation: Option<String>,
    #[serde(default)]
    priority_series: Option<String>,
    #[serde(default)]
    is_priority: bool,
}

impl From<PriorityRepr> for Priority {
    fn from(repr: PriorityRepr) -> Self {
        Self {
            affiliation: repr.priority_affiliation,
            series: repr.priority_series,
        }
    }
}

impl From<Priority> for PriorityRepr {
    fn from(p: Priority) -> Self {
        let is_priority = p.is_priority();
        Self {
            priority_affiliation: p.affiliation,
            priority_series: p.series,
            is_priority,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One paper flowing through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source-specific identifier (arXiv id, PwC slug, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, alias = "abstract", deserialize_with = "null_as_empty")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_authors")]
    pub authors: Vec<String>,
    /// Publication date; `None` means unknown recency.
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub published: Option<NaiveDate>,
    #[serde(default)]
    pub source: Source,
    #[serde(default, alias = "url", deserialize_with = "null_as_empty")]
    pub link: String,
    #[serde(default, alias = "pdf_link", skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Set when the record came from a tracked-author query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_author: Option<String>,
    /// First known institution of the authors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(flatten)]
    relevance: Relevance,
    #[serde(flatten)]
    pub priority: Priority,
}

impl Record {
    pub fn new(source: Source, title: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn relevance(&self) -> &Relevance {
        &self.relevance
    }

    /// Replace the topic counts; the primary topic is recomputed.
    pub fn set_topic_counts(&mut self, counts: TopicCounts) {
        self.relevance = Relevance::from_counts(counts);
    }

    pub fn primary_topic(&self) -> Option<&str> {
        self.relevance.primary_topic()
    }

    pub fn is_relevant(&self) -> bool {
        self.relevance.is_relevant()
    }

    pub fn is_priority(&self) -> bool {
        self.priority.is_priority()
    }

    /// Strength of the provenance for merging: tracked author 2, institution 1, none 0.
    pub fn provenance_rank(&self) -> u8 {
        if self.tracked_author.is_some() {
            2
        } else if self.institution.is_some() {
            1
        } else {
            0
        }
    }

    /// Normalized title used to identify the same paper across sources.
    pub fn dedup_key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Lowercase a title and collapse all whitespace runs to single spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Repository / HubItem / Post
// ---------------------------------------------------------------------------

/// A GitHub repository found by the search adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Created within the fetch window.
    #[serde(default)]
    pub is_new: bool,
    /// GitHub topic that surfaced this repository, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_topic: Option<String>,
}

/// Hugging Face hub item kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubKind {
    #[default]
    Model,
    Dataset,
    Space,
}

impl HubKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Dataset => "dataset",
            Self::Space => "space",
        }
    }
}

/// A model, dataset, or space from the Hugging Face hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubItem {
    #[serde(rename = "type", default)]
    pub kind: HubKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<String>,
    /// Author belongs to a tracked organization.
    #[serde(default)]
    pub is_priority: bool,
}

/// A post from the social feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub account: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Mentions a paper, preprint, or code release.
    #[serde(default)]
    pub has_paper: bool,
}

// ---------------------------------------------------------------------------
// Lenient field deserializers
// ---------------------------------------------------------------------------

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Accept `YYYY-MM-DD` or any timestamp starting with it; anything else is unknown.
fn lenient_date<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(parse_date_prefix))
}

/// Parse the leading `YYYY-MM-DD` of a date or timestamp string.
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Authors come as plain names or as `{"name": ...}` objects depending on the source.
fn lenient_authors<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AuthorEntry {
        Name(String),
        Object {
            #[serde(default)]
            name: Option<String>,
        },
    }

    let entries = Option::<Vec<Option<AuthorEntry>>>::deserialize(d)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .flatten()
        .filter_map(|e| match e {
            AuthorEntry::Name(name) => Some(name),
            AuthorEntry::Object { name } => name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> TopicCounts {
        TopicCounts::new(pairs.iter().map(|(t, c)| (t.to_string(), *c)).collect())
    }

    #[test]
    fn primary_topic_prefers_declaration_order_on_tie() {
        let rel = Relevance::from_counts(counts(&[("VLA", 1), ("World Model", 1), ("RL", 0)]));
        assert_eq!(rel.primary_topic(), Some("VLA"));
        assert!(rel.is_relevant());

        let rel = Relevance::from_counts(counts(&[("VLA", 0), ("World Model", 1), ("RL", 2)]));
        assert_eq!(rel.primary_topic(), Some("RL"));
    }

    #[test]
    fn zero_counts_mean_irrelevant() {
        let rel = Relevance::from_counts(counts(&[("VLA", 0), ("RL", 0)]));
        assert_eq!(rel.primary_topic(), None);
        assert!(!rel.is_relevant());
    }

    #[test]
    fn normalize_title_is_idempotent() {
        for title in [
            "  DreamerV3:   Scaling\tResults ",
            "Another VLA Paper",
            "",
            "ÜBER  Große Modelle",
        ] {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once);
        }
        assert_eq!(normalize_title("  Dreamer  V3\nScaling "), "dreamer v3 scaling");
    }

    #[test]
    fn record_serialization_keeps_topic_order() {
        let mut record = Record::new(Source::Arxiv, "A World Model");
        record.set_topic_counts(counts(&[("VLA", 0), ("World Model", 2), ("RL", 1)]));

        let json = serde_json::to_string(&record).expect("serialize");
        let vla = json.find("\"VLA\"").expect("VLA key");
        let wm = json.find("\"World Model\"").expect("World Model key");
        let rl = json.find("\"RL\"").expect("RL key");
        assert!(vla < wm && wm < rl);
        assert!(json.contains("\"primary_topic\":\"World Model\""));
        assert!(json.contains("\"is_priority\":false"));
    }

    #[test]
    fn derived_fields_are_recomputed_on_load() {
        // primary_topic in the file disagrees with the counts; counts win.
        let json = r#"{
            "title": "Latent Dynamics",
            "summary": "",
            "authors": [],
            "topic_relevance": {"VLA": 0, "World Model": 1, "RL": 0},
            "primary_topic": "RL",
            "is_relevant": false,
            "priority_affiliation": "NVIDIA",
            "priority_series": null,
            "is_priority": false
        }"#;
        let record: Record = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.primary_topic(), Some("World Model"));
        assert!(record.is_relevant());
        assert!(record.is_priority());
    }

    #[test]
    fn loads_semantic_scholar_shape() {
        let json = r#"{
            "source": "semantic_scholar",
            "title": "DreamerV3 Scaling Results",
            "abstract": null,
            "authors": ["Danijar Hafner", null],
            "published": "2026-02-20",
            "url": "https://www.semanticscholar.org/paper/abc",
            "pdf_url": null,
            "citations": 4,
            "tracked_author": "Danijar Hafner"
        }"#;
        let record: Record = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.source, Source::SemanticScholar);
        assert_eq!(record.summary, "");
        assert_eq!(record.authors, vec!["Danijar Hafner".to_string()]);
        assert_eq!(record.published, NaiveDate::from_ymd_opt(2026, 2, 20));
        assert_eq!(record.link, "https://www.semanticscholar.org/paper/abc");
        assert_eq!(record.provenance_rank(), 2);
        assert_eq!(record.primary_topic(), None);
    }

    #[test]
    fn loads_arxiv_shape_with_timestamp() {
        let json = r#"{
            "id": "2602.01234v1",
            "title": "A VLA",
            "summary": "text",
            "authors": [{"name": "Ada"}, "Grace"],
            "published": "2026-02-19T17:59:58Z",
            "link": "http://arxiv.org/abs/2602.01234v1",
            "pdf_link": "http://arxiv.org/pdf/2602.01234v1"
        }"#;
        let record: Record = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.source, Source::Arxiv);
        assert_eq!(record.published, NaiveDate::from_ymd_opt(2026, 2, 19));
        assert_eq!(record.authors, vec!["Ada".to_string(), "Grace".to_string()]);
        assert_eq!(record.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2602.01234v1"));
    }

    #[test]
    fn malformed_date_degrades_to_unknown() {
        let json = r#"{"title": "x", "published": "last week"}"#;
        let record: Record = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.published, None);
    }

    #[test]
    fn social_source_accepts_legacy_name() {
        let source: Source = serde_json::from_str("\"x_twitter\"").expect("deserialize");
        assert_eq!(source, Source::Social);
        assert_eq!(Source::PapersWithCode.to_string(), "papers_with_code");
    }

    #[test]
    fn hub_item_kind_uses_type_key() {
        let json = r#"{"type": "dataset", "id": "lerobot/aloha", "likes": 3}"#;
        let item: HubItem = serde_json::from_str(json).expect("deserialize");
        assert_eq!(item.kind, HubKind::Dataset);
        assert_eq!(item.likes, 3);
        assert_eq!(item.downloads, 0);
    }
}
