//! Markdown report rendering.
//!
//! Both renderers are pure: the same inputs always produce the same text.
//! Headings, bullet labels and boilerplate are part of the output format and
//! are parsed back by the card extractor and the block converter.

use chrono::NaiveDate;
use dailypaper_shared::{HubItem, Record, Repository};

/// Daily sections in display order; anything else lands in [`OTHER_SECTION`].
pub const DAILY_SECTIONS: [&str; 3] = ["VLA", "World Model", "RL"];
pub const OTHER_SECTION: &str = "Other";

/// Characters of the summary kept in the daily one-liner.
const DAILY_SUMMARY_CHARS: usize = 100;
/// Words of the summary kept in the weekly digest.
const WEEKLY_SUMMARY_WORDS: usize = 80;
/// Authors listed before "et al.".
const WEEKLY_AUTHORS: usize = 3;

const WEEKLY_OVERVIEW: &str = "本周具身智能领域重点关注 VLA 模型与世界模型的结合。多项研究展示了通过大规模数据预训练提升机器人泛化能力的潜力，特别是在复杂环境下的操作任务中。同时，强化学习在 Sim-to-Real 迁移方面取得了新的突破。开源社区活跃，涌现出多个高质量的仿真环境和数据集。";

const TRENDS: [(&str, &str); 3] = [
    (
        "VLA 模型的规模化与多模态融合",
        "本周的研究显示，VLA 模型正朝着更大规模和更多模态融合的方向发展。研究者们不再局限于简单的视觉-语言-动作映射，而是开始探索如何将触觉、听觉等更多模态信息融入模型中，以提升机器人在复杂环境下的感知和决策能力。这种多模态融合趋势预示着未来机器人将具备更接近人类的感知能力。",
    ),
    (
        "世界模型驱动的强化学习",
        "世界模型在强化学习中的应用日益成熟。通过构建环境的内部模型，智能体能够在“想象”中进行试错和规划，从而大幅减少对真实环境交互的依赖。本周的几篇论文展示了基于世界模型的 RL 算法在样本效率和最终性能上的显著提升，这对于昂贵的机器人硬件实验尤为重要。",
    ),
    (
        "Sim-to-Real 的无缝迁移",
        "Sim-to-Real 仍然是具身智能的核心挑战之一。本周的开源项目和论文中，我们可以看到更多关注于高保真仿真环境构建和领域随机化技术的研究。这些进展使得在仿真中训练的策略能够更平滑地迁移到真实机器人上，降低了部署成本和风险。",
    ),
];

// ---------------------------------------------------------------------------
// Daily
// ---------------------------------------------------------------------------

/// Render the daily digest.
///
/// `papers` are shown in the given order within their topic section.
pub fn render_daily(
    papers: &[Record],
    repos: &[Repository],
    hub_items: &[HubItem],
    date: NaiveDate,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# 每日论文速递 — {}", date.format("%Y-%m-%d")));
    lines.push(String::new());

    let count = |topic: &str| papers.iter().filter(|p| p.primary_topic() == Some(topic)).count();
    lines.push(format!(
        "**摘要**：今日共筛选出 {} 篇高质量论文，其中 VLA 方向 {} 篇，世界模型方向 {} 篇，强化学习方向 {} 篇。此外还有 {} 个 GitHub 项目和 {} 个 HuggingFace 资源值得关注。",
        papers.len(),
        count("VLA"),
        count("World Model"),
        count("RL"),
        repos.len(),
        hub_items.len(),
    ));
    lines.push(String::new());

    for section in DAILY_SECTIONS.iter().copied().chain([OTHER_SECTION]) {
        let in_section: Vec<&Record> = papers
            .iter()
            .filter(|p| daily_section(p) == section)
            .collect();
        if in_section.is_empty() {
            continue;
        }

        lines.push(format!("## {section}"));
        lines.push(String::new());
        for p in in_section {
            let summary = if p.summary.is_empty() {
                "暂无摘要".to_string()
            } else {
                p.summary.chars().take(DAILY_SUMMARY_CHARS).collect()
            };
            let link = if p.link.is_empty() { "#" } else { p.link.as_str() };

            lines.push(format!("### {}", p.title));
            lines.push(format!("- **一句话摘要**: {summary}..."));
            lines.push(format!("- **解决痛点**: 针对 {section} 领域的关键问题..."));
            lines.push("- **核心改进**: 提出了新的架构/算法...".to_string());
            lines.push("- **应用场景**: 机器人操作/自动驾驶...".to_string());
            lines.push(format!("- **链接**: [Paper]({link})"));
            if let Some(code) = p.code_url.as_deref().filter(|c| !c.is_empty()) {
                lines.push(format!("- **代码**: [Code]({code})"));
            }
            lines.push(String::new());
        }
    }

    if !repos.is_empty() || !hub_items.is_empty() {
        lines.push("## 开源项目精选".to_string());
        lines.push(String::new());

        for r in repos {
            let description = if r.description.is_empty() {
                "暂无描述"
            } else {
                r.description.as_str()
            };
            lines.push(format!("### [GitHub] {}", r.name));
            lines.push(format!("- **简介**: {description}"));
            lines.push(format!("- **链接**: {}", r.url));
            lines.push(format!("- **Stars**: {}", r.stars));
            lines.push(String::new());
        }

        for h in hub_items {
            lines.push(format!("### [HuggingFace] {}", h.id));
            lines.push(format!("- **类型**: {}", h.kind.as_str()));
            lines.push(format!("- **链接**: {}", h.url));
            lines.push(format!("- **Likes**: {}", h.likes));
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn daily_section(record: &Record) -> &'static str {
    record
        .primary_topic()
        .and_then(|t| DAILY_SECTIONS.iter().copied().find(|s| *s == t))
        .unwrap_or(OTHER_SECTION)
}

// ---------------------------------------------------------------------------
// Weekly
// ---------------------------------------------------------------------------

/// Weekly digest categories in display order.
pub const WEEKLY_CATEGORIES: [&str; 3] = ["VLA", "世界模型", "强化学习"];

/// Weekly category from title/summary keywords. Everything not VLA or world
/// model is filed under reinforcement learning.
pub fn weekly_category(record: &Record) -> &'static str {
    let title = record.title.to_lowercase();
    let summary = record.summary.to_lowercase();
    if title.contains("vla")
        || title.contains("vision-language-action")
        || summary.contains("vision language action")
    {
        WEEKLY_CATEGORIES[0]
    } else if title.contains("world model") || summary.contains("world model") {
        WEEKLY_CATEGORIES[1]
    } else {
        WEEKLY_CATEGORIES[2]
    }
}

/// Render the weekly digest for `date_range` (e.g. `2026-02-17 ~ 2026-02-23`).
pub fn render_weekly(papers: &[Record], repos: &[Repository], date_range: &str) -> String {
    let mut md = format!("# 具身智能·每周研究速递（{date_range}）\n\n");

    md.push_str("## 本周摘要\n");
    md.push_str(WEEKLY_OVERVIEW);
    md.push_str("\n\n");

    for category in WEEKLY_CATEGORIES {
        let in_category: Vec<&Record> = papers
            .iter()
            .filter(|p| weekly_category(p) == category)
            .collect();
        if in_category.is_empty() {
            continue;
        }

        md.push_str(&format!("### {category}\n\n"));
        for p in in_category {
            let institution = p
                .institution
                .as_deref()
                .filter(|i| !i.is_empty())
                .unwrap_or("Unknown Institution");
            let mut authors = p
                .authors
                .iter()
                .take(WEEKLY_AUTHORS)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if p.authors.len() > WEEKLY_AUTHORS {
                authors.push_str(" et al.");
            }
            let summary = p
                .summary
                .split_whitespace()
                .take(WEEKLY_SUMMARY_WORDS)
                .collect::<Vec<_>>()
                .join(" ");

            md.push_str(&format!("#### {}\n", collapse_whitespace(&p.title)));
            md.push_str(&format!("- **机构**: {institution}\n"));
            md.push_str(&format!("- **作者**: {authors}\n"));
            md.push_str(&format!("- **摘要**: {summary}...\n\n"));
        }
    }

    md.push_str("## 开源项目精选\n\n");
    for r in repos {
        md.push_str(&format!("### [{}]({})\n", r.name, r.url));
        md.push_str(&format!("- **Stars**: {}\n", r.stars));
        md.push_str(&format!("- **简介**: {}\n\n", collapse_whitespace(&r.description)));
    }

    md.push_str("## Crossing Trend\n\n");
    for (i, (title, body)) in TRENDS.iter().enumerate() {
        md.push_str(&format!("### 趋势 {}: {title}\n{body}\n\n", i + 1));
    }

    md
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
