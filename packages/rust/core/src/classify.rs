//! Topic relevance and priority classification.

use dailypaper_shared::{DailyPaperError, Priority, PriorityLists, Record, Result, Taxonomy, TopicCounts};
use regex::Regex;
use tracing::debug;

/// Affiliations at most this long are matched as whole words only.
const SHORT_AFFILIATION_LEN: usize = 4;

#[derive(Debug, Clone)]
enum Matcher {
    WholeWord(Regex),
    Substring(String),
}

impl Matcher {
    fn matches(&self, text: &str, lowered: &str) -> bool {
        match self {
            Matcher::WholeWord(re) => re.is_match(text),
            Matcher::Substring(needle) => lowered.contains(needle.as_str()),
        }
    }
}

/// Compiled taxonomy and priority lists.
///
/// Built once per run and shared by every classification; classifying a
/// record has no side effects beyond the returned value.
#[derive(Debug, Clone)]
pub struct Classifier {
    topics: Vec<(String, Vec<String>)>,
    affiliations: Vec<(String, Matcher)>,
    series: Vec<(String, String)>,
}

impl Classifier {
    pub fn new(taxonomy: &Taxonomy, priority: &PriorityLists) -> Result<Self> {
        let topics = taxonomy
            .topics
            .iter()
            .map(|t| {
                let keywords = t.keywords.iter().map(|k| k.to_lowercase()).collect();
                (t.name.clone(), keywords)
            })
            .collect();

        let affiliations = priority
            .affiliations
            .iter()
            .map(|aff| {
                let matcher = if aff.chars().count() <= SHORT_AFFILIATION_LEN {
                    let pattern = format!(r"(?i)\b{}\b", regex::escape(aff));
                    let re = Regex::new(&pattern).map_err(|e| {
                        DailyPaperError::config(format!("bad affiliation pattern {aff:?}: {e}"))
                    })?;
                    Matcher::WholeWord(re)
                } else {
                    Matcher::Substring(aff.to_lowercase())
                };
                Ok((aff.clone(), matcher))
            })
            .collect::<Result<Vec<_>>>()?;

        let series = priority
            .series
            .iter()
            .map(|s| (s.clone(), s.to_lowercase()))
            .collect();

        Ok(Self {
            topics,
            affiliations,
            series,
        })
    }

    /// Keyword hits per topic over `title + " " + summary`.
    ///
    /// Each keyword counts once no matter how often it occurs.
    pub fn topic_counts(&self, title: &str, summary: &str) -> TopicCounts {
        let text = format!("{title} {summary}").to_lowercase();
        let counts = self
            .topics
            .iter()
            .map(|(name, keywords)| {
                let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
                (name.clone(), hits as u32)
            })
            .collect();
        TopicCounts::new(counts)
    }

    /// First matching affiliation and first matching series.
    pub fn priority(&self, record: &Record) -> Priority {
        let text = format!(
            "{} {} {}",
            record.title,
            record.summary,
            record.authors.join(" ")
        );
        let lowered = text.to_lowercase();

        let affiliation = self
            .affiliations
            .iter()
            .find(|(_, m)| m.matches(&text, &lowered))
            .map(|(name, _)| name.clone());
        let series = self
            .series
            .iter()
            .find(|(_, needle)| lowered.contains(needle.as_str()))
            .map(|(name, _)| name.clone());

        Priority {
            affiliation,
            series,
        }
    }

    /// Return the record with relevance and priority filled in.
    pub fn classify(&self, mut record: Record) -> Record {
        let counts = self.topic_counts(&record.title, &record.summary);
        record.set_topic_counts(counts);
        record.priority = self.priority(&record);
        debug!(
            title = %record.title,
            topic = ?record.primary_topic(),
            priority = record.is_priority(),
            "classified"
        );
        record
    }

    pub fn classify_all(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().map(|r| self.classify(r)).collect()
    }
}
