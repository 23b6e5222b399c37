use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::fragments::Fragment;
use super::sections::SectionRules;
use crate::error::LayoutError;
use crate::model::{DigestRecord, Sections};
use crate::settings::LayoutSettings;

/// Compiled selectors for one page layout.
#[derive(Debug, Clone)]
pub struct PageLayout {
    title: Selector,
    date: Selector,
    cover: Selector,
    headings: Selector,
}

impl PageLayout {
    pub fn compile(settings: &LayoutSettings) -> Result<Self, LayoutError> {
        Ok(PageLayout {
            title: compile_selector("title", &settings.title)?,
            date: compile_selector("date", &settings.date)?,
            cover: compile_selector("cover", &settings.cover)?,
            headings: compile_selector("headings", &settings.headings)?,
        })
    }
}

pub fn compile_selector(field: &'static str, css: &str) -> Result<Selector, LayoutError> {
    Selector::parse(css).map_err(|e| LayoutError::InvalidSelector {
        field,
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Build the record for one parsed page. Missing title/date become empty
/// strings, a missing cover becomes `None`.
pub fn assemble(doc: &Html, layout: &PageLayout, rules: &SectionRules) -> DigestRecord {
    let title = doc.select(&layout.title).next().map(text_of).unwrap_or_default();
    let date = doc.select(&layout.date).next().map(text_of).unwrap_or_default();
    let cover = doc
        .select(&layout.cover)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    let mut sections = Sections::default();
    for heading in doc.select(&layout.headings) {
        let name = text_of(heading);
        let fragments = following_fragments(heading);
        let content = rules.build(&name, &fragments);
        if sections.insert(name.clone(), content).is_some() {
            debug!(heading = %name, "duplicate heading, keeping the last one");
        }
    }

    DigestRecord {
        title,
        date,
        cover,
        sections,
    }
}

/// Element siblings after `heading`, up to the next element with the same
/// tag name. Text nodes between elements are skipped.
pub fn following_fragments(heading: ElementRef<'_>) -> Vec<Fragment> {
    let stop = heading.value().name();
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| el.value().name() != stop)
        .map(|el| Fragment::new(&el.inner_html(), el.html()))
        .collect()
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionContent;

    fn layout() -> PageLayout {
        PageLayout::compile(&LayoutSettings::default()).unwrap()
    }

    fn assemble_str(html: &str) -> DigestRecord {
        assemble(&Html::parse_document(html), &layout(), &SectionRules::default())
    }

    fn page(body: &str) -> String {
        format!(
            r#"<html><body><h1>Issue</h1><div class="asset-meta"><abbr>2024年10月18日</abbr></div><div id="main-content">{}</div></body></html>"#,
            body
        )
    }

    #[test]
    fn invalid_selector_is_reported() {
        let settings = LayoutSettings {
            cover: "p > > img".into(),
            ..LayoutSettings::default()
        };
        let err = PageLayout::compile(&settings).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidSelector { field: "cover", .. }));
    }

    #[test]
    fn top_level_fields() {
        let record = assemble_str(&page(
            r#"<p><img src="/cover.webp" alt=""></p><p><img src="/second.webp"></p>"#,
        ));
        assert_eq!(record.title, "Issue");
        assert_eq!(record.date, "2024年10月18日");
        assert_eq!(record.cover.as_deref(), Some("/cover.webp"));
        assert!(record.sections.is_empty());
    }

    #[test]
    fn structural_absence_degrades_to_defaults() {
        let record = assemble_str("<html><body><p>nothing here</p></body></html>");
        assert_eq!(record.title, "");
        assert_eq!(record.date, "");
        assert!(record.cover.is_none());
        assert!(record.sections.is_empty());
    }

    #[test]
    fn sections_stop_at_next_heading() {
        let record = assemble_str(&page(
            r#"<h2>资源</h2><p>1、<a href="/a">A</a></p><p>2、<a href="/b">B</a></p><h2>工具</h2><p>1、<a href="/c">C</a></p>"#,
        ));
        assert_eq!(record.sections.headings().collect::<Vec<_>>(), vec!["资源", "工具"]);
        let resources = record.sections.get("资源").and_then(|s| s.items()).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].title.as_deref(), Some("A"));
        assert_eq!(resources[0].href.as_deref(), Some("/a"));
        assert_eq!(resources[0].content, r#"1、<a href="/a">A</a>"#);
        assert_eq!(resources[1].content, r#"2、<a href="/b">B</a>"#);
        let tools = record.sections.get("工具").and_then(|s| s.items()).unwrap();
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn nested_headings_are_not_section_boundaries() {
        let record = assemble_str(&page(
            r#"<h2>本周话题</h2><p>a</p><div><h2>inner</h2></div><p>b</p>"#,
        ));
        assert_eq!(record.sections.len(), 1);
        assert_eq!(
            record.sections.get("本周话题"),
            Some(&SectionContent::Raw("<p>a</p><div><h2>inner</h2></div><p>b</p>".into()))
        );
    }

    #[test]
    fn unknown_heading_passes_markup_through() {
        let record = assemble_str(&page(r#"<h2>本周话题</h2><p>第一段</p>
<p>第二段 <strong>加粗</strong></p>"#));
        assert_eq!(
            record.sections.get("本周话题").and_then(|s| s.raw()),
            Some("<p>第一段</p><p>第二段 <strong>加粗</strong></p>")
        );
    }

    #[test]
    fn duplicate_heading_last_wins() {
        let record = assemble_str(&page(
            r#"<h2>资源</h2><p>1、<a href="/first">First</a></p><h2>工具</h2><p>1、x</p><h2>资源</h2><p>1、<a href="/second">Second</a></p><p>2、<a href="/third">Third</a></p>"#,
        ));
        assert_eq!(record.sections.headings().collect::<Vec<_>>(), vec!["资源", "工具"]);
        let resources = record.sections.get("资源").and_then(|s| s.items()).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].href.as_deref(), Some("/second"));
    }

    #[test]
    fn heading_with_no_siblings() {
        let record = assemble_str(&page("<h2>资源</h2><h2>本周话题</h2>"));
        assert_eq!(record.sections.get("资源"), Some(&SectionContent::Items(vec![])));
        assert_eq!(record.sections.get("本周话题"), Some(&SectionContent::Raw(String::new())));
    }
}
