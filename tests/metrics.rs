// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use news_relay::metrics::Metrics;
use tower::ServiceExt;

async fn get(path: &str) -> (StatusCode, String) {
    let m = Metrics::init().expect("recorder installs once per process");
    let resp = m
        .router()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn healthz_answers_ok() {
    let (status, body) = get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn relay_series_show_up_after_use() {
    let _ = Metrics::init().unwrap();
    metrics::counter!("relay_published_total").increment(2);
    metrics::gauge!("relay_seen_set_size").set(7.0);

    let (status, text) = get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    for needle in ["relay_published_total", "relay_seen_set_size"] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}

#[cfg(feature = "strict-metrics")]
#[tokio::test]
async fn every_documented_series_is_described() {
    let _ = Metrics::init().unwrap();
    metrics::counter!("relay_articles_total").increment(1);
    metrics::histogram!("relay_fetch_ms").record(12.0);
    let (_, text) = get("/metrics").await;
    assert!(text.contains("# HELP relay_articles_total"));
    assert!(text.contains("relay_fetch_ms"));
}
