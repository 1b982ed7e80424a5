// tests/providers.rs
use chrono::{DateTime, Utc};
use news_relay::freshness::kst;
use news_relay::ingest::types::{HtmlSelectors, ParserKind, SourceConfig};
use news_relay::ingest::{extract, ExtractContext};

fn ctx() -> ExtractContext {
    let now = DateTime::parse_from_rfc3339("2026-02-14T06:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    ExtractContext::new(now, kst())
}

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[test]
fn rss_fixture_yields_clean_records_in_order() {
    let xml = include_str!("fixtures/yna_rss.xml");
    let src = SourceConfig::rss("연합뉴스", "https://www.yna.co.kr/rss/news.xml");
    let recs: Vec<_> = extract(&src, xml, ctx()).unwrap().collect();

    assert_eq!(recs.len(), 4, "item without link is dropped");
    assert_eq!(recs[0].title(), "[속보] 한은, 기준금리 동결");
    assert_eq!(recs[0].published_at(), Some(utc("2026-02-14T05:55:00Z")));
    assert_eq!(recs[1].title(), "주말 날씨 맑음… 미세먼지 보통");
    assert_eq!(recs[3].title(), "[단독] 오래된 기사");
    assert!(recs.iter().all(|r| r.source_label() == "연합뉴스"));
}

#[test]
fn rss_max_items_bounds_the_stream() {
    let xml = include_str!("fixtures/yna_rss.xml");
    let mut src = SourceConfig::rss("연합뉴스", "https://www.yna.co.kr/rss/news.xml");
    src.max_items = 2;
    assert_eq!(extract(&src, xml, ctx()).unwrap().count(), 2);
}

#[test]
fn html_fixture_resolves_links_and_reads_optional_fields() {
    let html = include_str!("fixtures/naver_section.html");
    let sel = HtmlSelectors {
        title_selector: Some("a.sa_text_title".into()),
        time_selector: Some(".sa_text_datetime".into()),
        label_selector: Some(".sa_text_press".into()),
        ..HtmlSelectors::new("div.sa_text")
    };
    let src = SourceConfig::with_parser("네이버 정치", "https://news.naver.com/section/100", ParserKind::Html(sel));
    let recs: Vec<_> = extract(&src, html, ctx()).unwrap().collect();

    assert_eq!(recs.len(), 2, "javascript: link and title-less row dropped");

    assert_eq!(recs[0].title(), "[속보] 국회 본회의 개의");
    assert_eq!(recs[0].url(), "https://n.news.naver.com/mnews/article/001/0015000001");
    assert_eq!(recs[0].source_label(), "연합뉴스");
    assert_eq!(recs[0].published_at(), Some(utc("2026-02-14T05:57:00Z")));

    assert_eq!(recs[1].title(), "여야 원내대표 회동 \"합의 불발\"");
    assert_eq!(recs[1].url(), "https://news.naver.com/mnews/article/005/0001700002");
    assert_eq!(recs[1].source_label(), "국민일보");
    assert_eq!(recs[1].published_at(), None, "missing time element is not an error");
}

#[test]
fn search_fixture_strips_highlighting() {
    let json = include_str!("fixtures/naver_search.json");
    let src = SourceConfig::with_parser("네이버 검색", "https://openapi.naver.com/v1/search/news.json", ParserKind::NaverSearch);
    let recs: Vec<_> = extract(&src, json, ctx()).unwrap().collect();

    assert_eq!(recs.len(), 3);
    assert_eq!(recs[0].title(), "[속보] 반도체 관세 유예 발표");
    assert_eq!(recs[0].url(), "https://n.news.naver.com/mnews/article/003/0013000001?sid=101");
    assert_eq!(recs[1].title(), "\"AI 칩\" 투자 확대");
    assert_eq!(
        recs[1].url(),
        "https://www.example-press.co.kr/news/articleView.html?idxno=1002",
        "empty link falls back to originallink"
    );
    assert_eq!(recs[2].published_at(), Some(utc("2026-02-07T01:00:00Z")));
}

#[test]
fn malformed_documents_are_errors_not_panics() {
    let rss = SourceConfig::rss("r", "https://x.test/feed");
    assert!(extract(&rss, "<rss><channel><item><title>unterminated", ctx()).is_err());

    let search = SourceConfig::with_parser("s", "https://x.test/api", ParserKind::NaverSearch);
    assert!(extract(&search, "{\"errorCode\":\"024\"}", ctx()).is_err());
    assert!(extract(&search, "not json", ctx()).is_err());
}

#[test]
fn html_entities_in_one_item_leave_the_rest_of_the_feed_intact() {
    let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>c</title>
<item><title>[속보] 첫 기사</title><link>https://x.test/1</link><description>본문</description></item>
<item><title>둘째 &bull; 기사 &rarr; 후속</title><link>https://x.test/2</link><description>더보기 &raquo; &copy; 연합 &nosuchentity;</description></item>
</channel></rss>"#;
    let src = SourceConfig::rss("r", "https://x.test/feed");
    let recs: Vec<_> = extract(&src, xml, ctx()).unwrap().collect();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].title(), "[속보] 첫 기사");
    assert_eq!(recs[1].title(), "둘째 • 기사 → 후속");
}
