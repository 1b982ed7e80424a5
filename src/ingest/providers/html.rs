// src/ingest/providers/html.rs

//! Listing pages read with per-source CSS selectors.

use scraper::{ElementRef, Html, Selector};

use crate::ingest::types::{ExtractError, HtmlSelectors};
use crate::ingest::RawItem;

/// Compile a CSS selector, mapping failures to [`ExtractError::Selector`].
pub fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

/// Check every selector in `sel` compiles.
pub fn validate_selectors(sel: &HtmlSelectors) -> Result<(), ExtractError> {
    for s in sel.all() {
        parse_selector(s)?;
    }
    Ok(())
}

/// Resolve `href` against the page URL; returns `href` unchanged if that fails.
pub fn resolve_url(base: &url::Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

struct Compiled {
    item: Selector,
    title: Option<Selector>,
    time: Option<Selector>,
    label: Option<Selector>,
    anchor: Selector,
}

impl Compiled {
    fn new(sel: &HtmlSelectors) -> Result<Self, ExtractError> {
        Ok(Self {
            item: parse_selector(&sel.item_selector)?,
            title: sel.title_selector.as_deref().map(parse_selector).transpose()?,
            time: sel.time_selector.as_deref().map(parse_selector).transpose()?,
            label: sel.label_selector.as_deref().map(parse_selector).transpose()?,
            anchor: parse_selector("a[href]")?,
        })
    }
}

/// Extract rows from `body` in document order. Rows missing a title element
/// are skipped; missing optional fields come back as `None`.
pub fn parse_items(
    body: &str,
    sel: &HtmlSelectors,
    page_url: &str,
) -> Result<Vec<RawItem>, ExtractError> {
    let compiled = Compiled::new(sel)?;
    let base = url::Url::parse(page_url).ok();
    let document = Html::parse_document(body);

    let mut out = Vec::new();
    for row in document.select(&compiled.item) {
        if let Some(item) = parse_row(&row, &compiled, sel, base.as_ref()) {
            out.push(item);
        }
    }
    Ok(out)
}

fn parse_row(
    row: &ElementRef,
    compiled: &Compiled,
    sel: &HtmlSelectors,
    base: Option<&url::Url>,
) -> Option<RawItem> {
    let title_elem = match &compiled.title {
        Some(s) => row.select(s).next()?,
        None => *row,
    };
    let title: String = title_elem.text().collect();

    let raw_link = title_elem
        .value()
        .attr(&sel.link_attr)
        .or_else(|| row.value().attr(&sel.link_attr))
        .or_else(|| {
            row.select(&compiled.anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
        })
        .unwrap_or("")
        .trim();
    let link = match base {
        Some(b) if !raw_link.is_empty() => resolve_url(b, raw_link),
        _ => raw_link.to_string(),
    };
    // javascript:, mailto: and unresolvable relative links
    let link = if link.starts_with("http://") || link.starts_with("https://") {
        link
    } else {
        String::new()
    };

    let published = compiled
        .time
        .as_ref()
        .and_then(|s| row.select(s).next())
        .map(|el| match sel.time_attr.as_deref().and_then(|a| el.value().attr(a)) {
            Some(v) => v.to_string(),
            None => el.text().collect::<String>(),
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let label = compiled
        .label
        .as_ref()
        .and_then(|s| row.select(s).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    Some(RawItem {
        title,
        link,
        published,
        label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<div class="sa_item">
  <div class="sa_text">
    <a class="sa_text_title" href="https://n.news.test/article/001/1"><strong>[속보] 첫 기사</strong></a>
    <div class="sa_text_press">연합뉴스</div>
    <div class="sa_text_datetime"><b>5분전</b></div>
  </div>
</div>
<div class="sa_item">
  <div class="sa_text">
    <a class="sa_text_title" href="/article/002/2">상대 링크 기사</a>
  </div>
</div>
<div class="sa_item"><div class="sa_text"><span>제목 없음</span></div></div>
</body></html>"#;

    fn selectors() -> HtmlSelectors {
        HtmlSelectors {
            title_selector: Some("a.sa_text_title".into()),
            time_selector: Some(".sa_text_datetime".into()),
            label_selector: Some(".sa_text_press".into()),
            ..HtmlSelectors::new("div.sa_text")
        }
    }

    #[test]
    fn rows_with_optional_fields() {
        let items = parse_items(PAGE, &selectors(), "https://news.test/section/100").unwrap();
        assert_eq!(items.len(), 2, "row without title anchor is skipped");

        assert_eq!(items[0].title.trim(), "[속보] 첫 기사");
        assert_eq!(items[0].link, "https://n.news.test/article/001/1");
        assert_eq!(items[0].published.as_deref(), Some("5분전"));
        assert_eq!(items[0].label.as_deref(), Some("연합뉴스"));

        assert_eq!(items[1].link, "https://news.test/article/002/2");
        assert_eq!(items[1].published, None);
        assert_eq!(items[1].label, None);
    }

    #[test]
    fn anchor_as_item_selector() {
        let sel = HtmlSelectors::new("a.sa_text_title");
        let items = parse_items(PAGE, &sel, "https://news.test/section/100").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title, "상대 링크 기사");
    }

    #[test]
    fn bad_selector_is_an_error() {
        let sel = HtmlSelectors::new("div[");
        assert!(matches!(
            parse_items(PAGE, &sel, "https://news.test/"),
            Err(ExtractError::Selector { .. })
        ));
        assert!(validate_selectors(&selectors()).is_ok());
    }
}
