// src/ingest/providers/search.rs
//! Naver news search API (`/v1/search/news.json`).

use serde::Deserialize;

use crate::ingest::types::ExtractError;
use crate::ingest::RawItem;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    originallink: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

/// Items come back newest first when queried with `sort=date`. Hit
/// highlighting (`<b>..</b>`) is left for title cleaning.
pub fn parse_items(body: &str) -> Result<Vec<RawItem>, ExtractError> {
    let resp: SearchResponse =
        serde_json::from_str(body).map_err(|e| ExtractError::Json(e.to_string()))?;

    let Some(items) = resp.items else {
        return Err(ExtractError::Json(format!(
            "search API error {}: {}",
            resp.error_code.unwrap_or_default(),
            resp.error_message.unwrap_or_else(|| "missing items".into())
        )));
    };

    Ok(items
        .into_iter()
        .map(|it| RawItem {
            title: it.title,
            link: if it.link.is_empty() {
                it.originallink
            } else {
                it.link
            },
            published: it.pub_date,
            label: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_and_link_fallback() {
        let body = r#"{"lastBuildDate":"Sat, 14 Feb 2026 15:00:00 +0900","total":2,"items":[
            {"title":"<b>반도체</b> 수출 급증","originallink":"https://o.test/1","link":"https://n.news.test/1","pubDate":"Sat, 14 Feb 2026 14:58:00 +0900"},
            {"title":"환율 &quot;급등&quot;","originallink":"https://o.test/2","link":""}
        ]}"#;
        let items = parse_items(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://n.news.test/1");
        assert_eq!(items[1].link, "https://o.test/2");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn api_error_envelope() {
        let body = r#"{"errorMessage":"Authentication failed","errorCode":"024"}"#;
        let err = parse_items(body).unwrap_err();
        assert!(err.to_string().contains("024"));
    }
}
