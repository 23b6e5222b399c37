use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// One weekly issue, fully extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestRecord {
    pub title: String,
    pub date: String,
    pub cover: Option<String>,
    pub sections: Sections,
}

impl DigestRecord {
    /// Total items across all list-shaped sections.
    pub fn item_count(&self) -> usize {
        self.sections
            .iter()
            .map(|(_, content)| match content {
                SectionContent::Items(items) => items.len(),
                SectionContent::Raw(_) => 0,
            })
            .sum()
    }
}

/// Heading-keyed sections in first-encounter order.
///
/// Re-inserting an existing heading keeps its position and replaces the
/// value, so the last occurrence of a duplicated heading wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    entries: Vec<(String, SectionContent)>,
}

impl Sections {
    /// Returns the displaced value when `heading` was already present.
    pub fn insert(&mut self, heading: String, content: SectionContent) -> Option<SectionContent> {
        match self.entries.iter_mut().find(|(k, _)| *k == heading) {
            Some((_, slot)) => Some(std::mem::replace(slot, content)),
            None => {
                self.entries.push((heading, content));
                None
            }
        }
    }

    pub fn get(&self, heading: &str) -> Option<&SectionContent> {
        self.entries
            .iter()
            .find(|(k, _)| k == heading)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionContent)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Sections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (heading, content) in &self.entries {
            map.serialize_entry(heading, content)?;
        }
        map.end()
    }
}

/// Either the verbatim markup of an unrecognized section or its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SectionContent {
    Raw(String),
    Items(Vec<Item>),
}

impl SectionContent {
    pub fn items(&self) -> Option<&[Item]> {
        match self {
            SectionContent::Items(items) => Some(items),
            SectionContent::Raw(_) => None,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            SectionContent::Raw(markup) => Some(markup),
            SectionContent::Items(_) => None,
        }
    }
}

/// One logical digest entry. Fields a section's strategy does not produce
/// stay `None` and are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<u64>,
    /// Trimmed inner markup of every fragment in the entry, concatenated.
    pub content: String,
}

// ── Tests ──
