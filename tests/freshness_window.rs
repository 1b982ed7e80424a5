// tests/freshness_window.rs
use chrono::{DateTime, Duration, Utc};
use news_relay::article::ArticleRecord;
use news_relay::freshness::{kst, Basis, Fallback, FreshnessPolicy, FreshnessVerdict, HintPrecision};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-02-14T06:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn dated(age: Duration) -> ArticleRecord {
    ArticleRecord::new("기사", "https://news.test/a", "s", Some(now() - age)).unwrap()
}

fn undated(url: &str) -> ArticleRecord {
    ArticleRecord::new("기사", url, "s", None).unwrap()
}

#[test]
fn window_boundary_is_inclusive_for_every_window() {
    for secs in [60, 600, 3600, 86_400] {
        let window = Duration::seconds(secs);
        let p = FreshnessPolicy::new(window, Fallback::Reject);
        assert!(p.is_fresh(&dated(Duration::zero()), now()));
        assert!(p.is_fresh(&dated(window), now()), "exactly {secs}s old");
        assert!(!p.is_fresh(&dated(window + Duration::seconds(1)), now()));
        assert!(!p.is_fresh(&dated(window * 10), now()));
    }
}

#[test]
fn clock_skew_is_not_staleness() {
    let p = FreshnessPolicy::new(Duration::seconds(60), Fallback::Reject);
    assert_eq!(
        p.evaluate(&dated(-Duration::minutes(30)), now()),
        FreshnessVerdict::Fresh(Basis::Published)
    );
}

#[test]
fn missing_timestamp_follows_fallback() {
    let rec = undated("https://news.test/no-date");
    let reject = FreshnessPolicy::new(Duration::seconds(600), Fallback::Reject);
    let accept = FreshnessPolicy::new(Duration::seconds(600), Fallback::Accept);
    assert_eq!(reject.evaluate(&rec, now()), FreshnessVerdict::Stale(Basis::Fallback));
    assert_eq!(accept.evaluate(&rec, now()), FreshnessVerdict::Fresh(Basis::Fallback));
}

#[test]
fn url_dates_stand_in_for_missing_timestamps() {
    let p = FreshnessPolicy::new(Duration::seconds(600), Fallback::Reject).with_url_date_hint(true, kst());

    // 14:55 KST, five minutes before now
    let v = p.evaluate(&undated("https://news.test/c_202602141455_1"), now());
    assert_eq!(v, FreshnessVerdict::Fresh(Basis::UrlHint(HintPrecision::Minute)));

    // 14:40 KST, twenty minutes before now
    let v = p.evaluate(&undated("https://news.test/c_202602141440_1"), now());
    assert_eq!(v, FreshnessVerdict::Stale(Basis::UrlHint(HintPrecision::Minute)));

    // same-day path date gets a day of slack
    assert!(p.is_fresh(&undated("https://news.test/2026/02/14/story"), now()));
    assert!(!p.is_fresh(&undated("https://news.test/2026/02/10/story"), now()));

    // hints off: fallback decides
    let off = FreshnessPolicy::new(Duration::seconds(600), Fallback::Reject);
    assert!(!off.is_fresh(&undated("https://news.test/2026/02/14/story"), now()));
}

#[test]
fn compact_listing_stamps_are_judged_by_their_real_age() {
    use news_relay::ingest::{parse_published, ExtractContext};
    let ctx = ExtractContext::new(now(), kst());
    let p = FreshnessPolicy::new(Duration::seconds(600), Fallback::Reject);
    let at = |stamp: &str| {
        let published = parse_published(stamp, &ctx);
        ArticleRecord::new("기사", "https://news.test/a", "s", published).unwrap()
    };

    // years old, must not read as a far-future epoch
    assert!(!p.is_fresh(&at("20200101000000"), now()));
    // one minute old, must not read as a 1976 epoch
    assert!(p.is_fresh(&at("202602141459"), now()));
    assert!(p.is_fresh(&at("20260214145930"), now()));
}
