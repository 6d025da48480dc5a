//! ReliefWeb humanitarian updates, read from the per-country RSS feed

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};
use crate::utils::{normalize_whitespace, strip_tags, truncate_text};

const SOURCE: &str = "reliefweb";

/// Updates kept per country
pub const MAX_UPDATES: usize = 10;

const DESCRIPTION_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliefWebUpdate {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    /// Plain-text excerpt of the HTML description
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<Item> for ReliefWebUpdate {
    fn from(item: Item) -> Self {
        Self {
            title: normalize_whitespace(&item.title),
            link: item.link.trim().to_string(),
            published: item
                .pub_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                .map(|d| d.with_timezone(&Utc)),
            description: item
                .description
                .as_deref()
                .map(|d| truncate_text(&strip_tags(d), DESCRIPTION_CHARS))
                .unwrap_or_default(),
        }
    }
}

pub fn cache_key(country: &Country) -> String {
    format!("reliefweb-{}", country.cca3)
}

pub fn feed_url(ctx: &AppContext, country: &Country) -> String {
    join_url(
        &ctx.config().sources.reliefweb_url,
        &format!("country/{}/rss.xml", country.cca3.to_lowercase()),
    )
}

/// Latest humanitarian updates for a country, newest first
pub async fn fetch_updates(ctx: &AppContext, country: &Country) -> SourceOutcome<Vec<ReliefWebUpdate>> {
    let key = cache_key(country);
    if let Some(cached) = ctx.cache().get::<Vec<ReliefWebUpdate>>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country).await);
    if let Some(updates) = outcome.data().filter(|u| !u.is_empty()) {
        ctx.cache().set(&key, updates);
    }
    outcome
}

async fn request(ctx: &AppContext, country: &Country) -> Result<Vec<ReliefWebUpdate>> {
    let url = feed_url(ctx, country);
    let options = ctx.client().options().service(SOURCE).header(
        ACCEPT,
        HeaderValue::from_static("application/rss+xml, application/xml, text/xml"),
    );

    let body = ctx.client().fetch_text(&url, options).await?.data;
    let updates = parse_feed(&body)?;
    tracing::info!(country = %country.en, count = updates.len(), "ReliefWeb updates fetched");
    Ok(updates)
}

/// Parse an RSS 2.0 document into updates
///
/// # Errors
///
/// Returns `AppError::DataProcessing` if the document is not RSS.
pub fn parse_feed(xml: &str) -> Result<Vec<ReliefWebUpdate>> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| {
        AppError::data_processing(format!("Invalid RSS feed: {e}")).with_source(e)
    })?;

    let mut updates: Vec<ReliefWebUpdate> = rss
        .channel
        .items
        .into_iter()
        .map(ReliefWebUpdate::from)
        .filter(|u| !u.title.is_empty())
        .collect();
    updates.sort_by(|a, b| b.published.cmp(&a.published));
    updates.truncate(MAX_UPDATES);
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>ReliefWeb - Türkiye</title>
    <link>https://reliefweb.int/country/tur</link>
    <item>
      <title>Türkiye: Earthquakes - Situation Report No. 12</title>
      <link>https://reliefweb.int/report/turkiye/sitrep-12</link>
      <pubDate>Mon, 15 Jan 2024 09:30:00 +0000</pubDate>
      <description><![CDATA[<p>Over <strong>1.5 million</strong> people remain displaced.</p>]]></description>
    </item>
    <item>
      <title>Flash Update: Floods in the Black Sea region</title>
      <link>https://reliefweb.int/report/turkiye/flash-update</link>
      <pubDate>Tue, 20 Feb 2024 12:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let updates = parse_feed(FEED).unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].title.starts_with("Flash Update"));
        assert_eq!(updates[1].description, "Over 1.5 million people remain displaced.");
        assert!(updates[1].published.is_some());
        assert!(updates[0].description.is_empty());
    }

    #[test]
    fn test_not_rss() {
        let err = parse_feed("<html><body>maintenance</body></html>").unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_empty_channel() {
        let updates = parse_feed("<rss><channel><title>x</title></channel></rss>").unwrap();
        assert!(updates.is_empty());
    }
}
