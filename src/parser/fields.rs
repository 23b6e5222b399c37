use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::Item;

/// `[N、]title -- ... <a href="url">source</a>`. The lazy title stops at the
/// first `--`, so it never contains one. Quotes may span lines.
static ATTRIBUTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^(?:[0-9一二三四五六七八九十]+[、.\s]*)?(.+?)--.*?<a href="([^"]+)">([^<]+)</a>"#)
        .unwrap()
});

/// `<a href="url">title</a>（2023 #42）` with full-width parentheses.
static RETROSPECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="([^"]+)">([^<]+)</a>（([0-9]{4}) #([0-9]+)）"#).unwrap()
});

/// Overwrite title/href/source from an attribution line. Items that do not
/// match come back unchanged.
pub fn attribute(item: Item) -> Item {
    let fields = ATTRIBUTED_RE.captures(&item.content).map(|caps| {
        (
            caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
            caps[2].to_string(),
            caps[3].trim().to_string(),
        )
    });
    let Some((title, href, source)) = fields else {
        debug!(content = %item.content, "no attribution found, keeping classifier fields");
        return item;
    };

    Item {
        title: Some(title),
        href: Some(href),
        source: Some(source),
        ..item
    }
}

/// Rebuild an item from its year/issue back-reference, or `None` when the
/// content carries none. An issue number too large for `u64` is left unset.
pub fn retrospect(item: Item) -> Option<Item> {
    let (title, href, year, issue) = {
        let caps = RETROSPECTIVE_RE.captures(&item.content)?;
        (
            caps[2].trim().to_string(),
            caps[1].to_string(),
            caps[3].parse::<u64>().ok(),
            caps[4].parse::<u64>().ok(),
        )
    };
    if issue.is_none() {
        debug!(content = %item.content, "issue number out of range");
    }

    Some(Item {
        title: Some(title),
        href: Some(href),
        source: None,
        year,
        issue,
        content: item.content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_content(content: &str) -> Item {
        Item {
            title: Some(String::new()),
            href: Some(String::new()),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn attribution_with_numbering_prefix() {
        let item = attribute(with_content(
            r#"1、 程序员最重要的能力是阅读代码。 -- <a href="https://blog.example/read">《如何阅读代码》</a>"#,
        ));
        assert_eq!(item.title.as_deref(), Some("程序员最重要的能力是阅读代码。"));
        assert_eq!(item.href.as_deref(), Some("https://blog.example/read"));
        assert_eq!(item.source.as_deref(), Some("《如何阅读代码》"));
        assert!(item.year.is_none());
    }

    #[test]
    fn attribution_without_prefix() {
        let item = attribute(with_content(r#"quote--<a href="u">s</a>"#));
        assert_eq!(item.title.as_deref(), Some("quote"));
        assert_eq!(item.href.as_deref(), Some("u"));
        assert_eq!(item.source.as_deref(), Some("s"));
    }

    #[test]
    fn attribution_spans_line_breaks() {
        let item = attribute(with_content("1、第一行\n第二行 -- <a href=\"u\">s</a>"));
        assert_eq!(item.title.as_deref(), Some("第一行\n第二行"));
        assert_eq!(item.href.as_deref(), Some("u"));
        assert_eq!(item.source.as_deref(), Some("s"));

        let item = attribute(with_content("quote --\n<a href=\"u\">s</a>"));
        assert_eq!(item.title.as_deref(), Some("quote"));
        assert_eq!(item.source.as_deref(), Some("s"));
    }

    #[test]
    fn attribution_title_keeps_single_hyphens() {
        let item = attribute(with_content(r#"GPT-4 is not AGI -- <a href="u">x</a>"#));
        assert_eq!(item.title.as_deref(), Some("GPT-4 is not AGI"));
    }

    #[test]
    fn attribution_title_stops_at_first_double_hyphen() {
        let item = attribute(with_content(r#"a -- b -- <a href="u">s</a>"#));
        assert_eq!(item.title.as_deref(), Some("a"));
        assert_eq!(item.source.as_deref(), Some("s"));
    }

    #[test]
    fn attribution_miss_preserves_fields() {
        let before = Item {
            title: Some("T".into()),
            href: Some("/t".into()),
            content: r#"1、<a href="/t">T</a> no attribution here"#.into(),
            ..Default::default()
        };
        assert_eq!(attribute(before.clone()), before);
    }

    #[test]
    fn retrospective_match() {
        let content = r#"<a href="/x">Y</a>（2022 #100）"#;
        let item = retrospect(with_content(content)).unwrap();
        assert_eq!(
            item,
            Item {
                title: Some("Y".into()),
                href: Some("/x".into()),
                source: None,
                year: Some(2022),
                issue: Some(100),
                content: content.into(),
            }
        );
    }

    #[test]
    fn retrospective_trims_title() {
        let item = retrospect(with_content(r#"<a href="/x"> 标题 </a>（2019 #7）"#)).unwrap();
        assert_eq!(item.title.as_deref(), Some("标题"));
        assert_eq!(item.issue, Some(7));
    }

    #[test]
    fn retrospective_misses() {
        assert!(retrospect(with_content("（完）")).is_none());
        // ASCII parentheses
        assert!(retrospect(with_content(r#"<a href="/x">Y</a>(2022 #100)"#)).is_none());
        // two-digit year
        assert!(retrospect(with_content(r#"<a href="/x">Y</a>（22 #100）"#)).is_none());
        // missing issue
        assert!(retrospect(with_content(r#"<a href="/x">Y</a>（2022）"#)).is_none());
    }

    #[test]
    fn retrospective_keeps_large_issue_numbers() {
        let item = retrospect(with_content(r#"<a href="/x">Y</a>（2022 #4294967296）"#)).unwrap();
        assert_eq!(item.year, Some(2022));
        assert_eq!(item.issue, Some(4_294_967_296));

        let item =
            retrospect(with_content(r#"<a href="/x">Y</a>（2022 #99999999999999999999999）"#)).unwrap();
        assert_eq!(item.title.as_deref(), Some("Y"));
        assert_eq!(item.issue, None);
    }
}
