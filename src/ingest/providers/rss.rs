// src/ingest/providers/rss.rs
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::ingest::types::ExtractError;
use crate::ingest::RawItem;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

/// RSS 1.0: items are siblings of the channel under `rdf:RDF`.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFlavor {
    Rss,
    Rdf,
    Atom,
}

fn sniff(s: &str) -> Option<FeedFlavor> {
    let head: String = s.chars().take(2048).collect();
    if head.contains("<rss") {
        Some(FeedFlavor::Rss)
    } else if head.contains("<rdf:RDF") {
        Some(FeedFlavor::Rdf)
    } else if head.contains("<feed") {
        Some(FeedFlavor::Atom)
    } else if head.contains("<channel") {
        Some(FeedFlavor::Rss)
    } else {
        None
    }
}

/// Parse a feed document into raw items, in document order.
pub fn parse_items(s: &str) -> Result<Vec<RawItem>, ExtractError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(s);

    let out = match sniff(&xml_clean).ok_or(ExtractError::UnknownFeed)? {
        FeedFlavor::Rss => {
            let rss: Rss = from_str(&xml_clean).map_err(|e| ExtractError::Xml(e.to_string()))?;
            rss.channel.item.into_iter().map(Item::into_raw).collect()
        }
        FeedFlavor::Rdf => {
            let rdf: Rdf = from_str(&xml_clean).map_err(|e| ExtractError::Xml(e.to_string()))?;
            rdf.item.into_iter().map(Item::into_raw).collect()
        }
        FeedFlavor::Atom => {
            let feed: AtomFeed =
                from_str(&xml_clean).map_err(|e| ExtractError::Xml(e.to_string()))?;
            feed.entry.into_iter().map(AtomEntry::into_raw).collect::<Vec<_>>()
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("relay_parse_ms").record(ms);
    counter!("relay_articles_parsed_total").increment(out.len() as u64);
    Ok(out)
}

impl Item {
    fn into_raw(self) -> RawItem {
        RawItem {
            title: self.title.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            published: self.pub_date.or(self.dc_date),
            label: None,
        }
    }
}

impl AtomEntry {
    fn into_raw(self) -> RawItem {
        // rel="alternate" (or no rel) is the article link
        let link = self
            .link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.clone())
            .unwrap_or_default();
        RawItem {
            title: self.title.map(|t| t.value).unwrap_or_default(),
            link,
            published: self.published.or(self.updated),
            label: None,
        }
    }
}

// quick-xml only knows the five XML entities; feeds routinely carry HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

    let s = s
        .replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'");

    // unknown names are escaped so the parser sees literal text
    re.replace_all(&s, |c: &Captures| {
        let name = &c[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return c[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&c[0]);
        if decoded == c[0] {
            format!("&amp;{name};")
        } else {
            html_escape::encode_text(&decoded).into_owned()
        }
    })
    .into_owned()
}
