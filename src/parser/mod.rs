pub mod document;
pub mod fields;
pub mod fragments;
pub mod sections;

use scraper::Html;

use crate::db::ScrapedPage;
use crate::error::LayoutError;
use crate::model::DigestRecord;
use crate::settings::Settings;
use document::PageLayout;
use sections::SectionRules;

/// Compiled layout plus section rules. Holds no per-page state, so one
/// parser can be shared across threads.
#[derive(Debug, Clone)]
pub struct DigestParser {
    layout: PageLayout,
    rules: SectionRules,
}

impl DigestParser {
    pub fn new(settings: &Settings) -> Result<Self, LayoutError> {
        Ok(DigestParser {
            layout: PageLayout::compile(&settings.layout)?,
            rules: settings.sections.clone(),
        })
    }

    /// html → DOM → headings → sections → record.
    pub fn parse_html(&self, html: &str) -> DigestRecord {
        let doc = Html::parse_document(html);
        document::assemble(&doc, &self.layout, &self.rules)
    }

    pub fn process_page(&self, page: &ScrapedPage) -> DigestRecord {
        self.parse_html(&page.html)
    }
}

// ── Tests ──
