use serde::Deserialize;
use tracing::debug;

use super::fields;
use super::fragments::{classify_fragments, Fragment};
use crate::model::SectionContent;

/// How a section's fragments are turned into content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Unrecognized heading: outer markup of every fragment, joined.
    PassThrough,
    /// Items with title/href sniffed from the first anchor.
    StandardList,
    /// Items re-read as `title -- <a href>source</a>`.
    AttributedList,
    /// Items re-read as `<a href>title</a>（YEAR #ISSUE）`; misses dropped.
    RetrospectiveList,
}

/// Heading literals that drive strategy selection. Matching is exact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SectionRules {
    pub recognized: Vec<String>,
    pub attributed: Vec<String>,
    pub retrospective: Vec<String>,
}

impl Default for SectionRules {
    fn default() -> Self {
        SectionRules {
            recognized: owned(&[
                "科技动态",
                "文章",
                "工具",
                "AI 相关",
                "资源",
                "图片",
                "言论",
                "往年回顾",
            ]),
            attributed: owned(&["文字", "言论"]),
            retrospective: owned(&["往年回顾"]),
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl SectionRules {
    pub fn strategy_for(&self, heading: &str) -> Strategy {
        let listed = |names: &[String]| names.iter().any(|n| n == heading);

        if !listed(&self.recognized) {
            Strategy::PassThrough
        } else if listed(&self.attributed) {
            Strategy::AttributedList
        } else if listed(&self.retrospective) {
            Strategy::RetrospectiveList
        } else {
            Strategy::StandardList
        }
    }

    pub fn build(&self, heading: &str, fragments: &[Fragment]) -> SectionContent {
        build_section(heading, self.strategy_for(heading), fragments)
    }
}

pub fn build_section(heading: &str, strategy: Strategy, fragments: &[Fragment]) -> SectionContent {
    match strategy {
        Strategy::PassThrough => {
            debug!(heading, fragments = fragments.len(), "passing section through as markup");
            SectionContent::Raw(fragments.iter().map(|f| f.outer.as_str()).collect())
        }
        Strategy::StandardList => SectionContent::Items(classify_fragments(fragments)),
        Strategy::AttributedList => SectionContent::Items(
            classify_fragments(fragments)
                .into_iter()
                .map(fields::attribute)
                .collect(),
        ),
        Strategy::RetrospectiveList => {
            let items = classify_fragments(fragments);
            let total = items.len();
            let kept: Vec<_> = items.into_iter().filter_map(fields::retrospect).collect();
            if kept.len() < total {
                debug!(heading, dropped = total - kept.len(), "dropped items without year/issue");
            }
            SectionContent::Items(kept)
        }
    }
}

// ── Tests ──
