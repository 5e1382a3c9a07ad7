//! Card payload extracted from a rendered weekly report.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static TREND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^### 趋势 \d+: (.*)$").expect("valid regex"));

const SUMMARY_HEADING: &str = "## 本周摘要";
const TREND_HEADING: &str = "## Crossing Trend";
const ORG_PREFIX: &str = "- **机构**: ";
const AUTHORS_PREFIX: &str = "- **作者**: ";
const ABSTRACT_PREFIX: &str = "- **摘要**: ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub date_range: String,
    pub summary: String,
    pub papers: Vec<CardPaper>,
    pub trends: Vec<CardTrend>,
    pub links: Vec<CardLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPaper {
    pub name: String,
    pub org: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTrend {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLink {
    pub name: String,
    pub url: String,
}

/// Pull the summary, paper blocks and trends out of a weekly report.
///
/// Sections that are absent come back empty; this never fails.
pub fn parse_card(markdown: &str, date_range: &str, doc_url: &str) -> CardData {
    let lines: Vec<&str> = markdown.lines().collect();

    CardData {
        date_range: date_range.to_string(),
        summary: summary(&lines),
        papers: papers(&lines),
        trends: trends(&lines),
        links: vec![CardLink {
            name: "完整报告".into(),
            url: doc_url.to_string(),
        }],
    }
}

/// Lines after `start` up to the next second-level-or-deeper heading.
fn section_body<'s, 'a>(lines: &'s [&'a str], start: usize) -> &'s [&'a str] {
    let rest = &lines[start..];
    let end = rest
        .iter()
        .position(|l| l.starts_with("##"))
        .unwrap_or(rest.len());
    &rest[..end]
}

fn summary(lines: &[&str]) -> String {
    lines
        .iter()
        .position(|l| l.trim_end() == SUMMARY_HEADING)
        .map(|i| section_body(lines, i + 1).join("\n").trim().to_string())
        .unwrap_or_default()
}

fn papers(lines: &[&str]) -> Vec<CardPaper> {
    lines
        .windows(4)
        .filter_map(|w| {
            let name = w[0].strip_prefix("#### ")?;
            let org = w[1].strip_prefix(ORG_PREFIX)?;
            w[2].strip_prefix(AUTHORS_PREFIX)?;
            let desc = w[3].strip_prefix(ABSTRACT_PREFIX)?;
            Some(CardPaper {
                name: name.trim().to_string(),
                org: org.trim().to_string(),
                desc: desc.trim().to_string(),
            })
        })
        .collect()
}

fn trends(lines: &[&str]) -> Vec<CardTrend> {
    let Some(section) = lines.iter().position(|l| l.trim_end() == TREND_HEADING) else {
        return Vec::new();
    };

    let mut trends = Vec::new();
    for (i, line) in lines.iter().enumerate().skip(section + 1) {
        let Some(caps) = TREND_RE.captures(line) else {
            continue;
        };
        let body = section_body(lines, i + 1);
        trends.push(CardTrend {
            title: caps[1].trim().to_string(),
            content: body.join("\n").trim().to_string(),
        });
    }
    trends
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/reports/weekly.md");
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn extracts_weekly_fixture() {
        let card = parse_card(
            &fixture(),
            "2026-02-17 ~ 2026-02-23",
            "https://feishu.cn/docx/doc123",
        );

        assert_eq!(card.date_range, "2026-02-17 ~ 2026-02-23");
        assert!(card.summary.starts_with("本周具身智能领域重点关注"));
        assert!(card.summary.ends_with("数据集。"));

        assert_eq!(card.papers.len(), 2);
        assert_eq!(
            card.papers[0],
            CardPaper {
                name: "OpenVLA-2: Scaling Vision-Language-Action Models".into(),
                org: "Stanford University".into(),
                desc: "We scale VLA training to a million episodes....".into(),
            }
        );
        assert_eq!(card.papers[1].org, "Unknown Institution");

        let titles: Vec<&str> = card.trends.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "VLA 模型的规模化与多模态融合",
                "世界模型驱动的强化学习",
                "Sim-to-Real 的无缝迁移"
            ]
        );
        assert!(card.trends[2].content.ends_with("降低了部署成本和风险。"));

        assert_eq!(card.links[0].name, "完整报告");
        assert_eq!(card.links[0].url, "https://feishu.cn/docx/doc123");
    }

    #[test]
    fn multi_line_trend_bodies_are_kept() {
        let md = "## Crossing Trend\n\n### 趋势 1: A\nline one\nline two\n\n### 趋势 2: B\nonly\n## Next\nignored";
        let card = parse_card(md, "r", "u");
        assert_eq!(card.trends.len(), 2);
        assert_eq!(card.trends[0].content, "line one\nline two");
        assert_eq!(card.trends[1].content, "only");
    }

    #[test]
    fn trends_outside_the_section_are_ignored() {
        let md = "### 趋势 1: stray\nbody\n## Crossing Trend\n### 趋势 2: kept\nbody";
        let card = parse_card(md, "r", "u");
        assert_eq!(card.trends.len(), 1);
        assert_eq!(card.trends[0].title, "kept");
    }

    #[test]
    fn section_body_stops_at_next_heading() {
        let lines = ["## A", "one", "two", "### B", "three"];
        assert_eq!(section_body(&lines, 1), ["one", "two"]);
        assert!(section_body(&lines, lines.len()).is_empty());
    }

    #[test]
    fn missing_sections_come_back_empty() {
        let card = parse_card("# Just a title\n", "r", "u");
        assert_eq!(card.summary, "");
        assert!(card.papers.is_empty());
        assert!(card.trends.is_empty());
        assert_eq!(card.links.len(), 1);
    }

    #[test]
    fn serializes_with_expected_keys() {
        let card = parse_card(&fixture(), "r", "u");
        let json = serde_json::to_value(&card).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["date_range", "summary", "papers", "trends", "links"]);
        assert!(json["papers"][0].get("desc").is_some());
    }
}
