//! GDELT DOC 2.0 API: recent news articles mentioning a country

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::Result;
use crate::utils::{normalize_whitespace, percent_encode};

const SOURCE: &str = "gdelt";

/// Articles requested per country
pub const MAX_RECORDS: usize = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdeltArticle {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub language: String,
    pub seen_at: Option<DateTime<Utc>>,
    pub source_country: String,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtList {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    seendate: String,
    #[serde(default)]
    socialimage: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    sourcecountry: String,
}

impl From<RawArticle> for GdeltArticle {
    fn from(raw: RawArticle) -> Self {
        Self {
            title: normalize_whitespace(&raw.title),
            url: raw.url,
            domain: raw.domain,
            language: raw.language,
            seen_at: parse_seen_date(&raw.seendate),
            source_country: raw.sourcecountry,
            image: Some(raw.socialimage).filter(|s| !s.is_empty()),
        }
    }
}

/// Parse GDELT's compact timestamp (`20240115T093000Z`)
pub fn parse_seen_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn cache_key(country: &Country) -> String {
    format!("gdelt-{}", country.cca3)
}

/// Recent articles mentioning the country's English name
pub async fn fetch_articles(ctx: &AppContext, country: &Country) -> SourceOutcome<Vec<GdeltArticle>> {
    let key = cache_key(country);
    if let Some(cached) = ctx.cache().get::<Vec<GdeltArticle>>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country).await);
    if let Some(articles) = outcome.data().filter(|a| !a.is_empty()) {
        ctx.cache().set(&key, articles);
    }
    outcome
}

async fn request(ctx: &AppContext, country: &Country) -> Result<Vec<GdeltArticle>> {
    let query = percent_encode(&format!("\"{}\"", country.en));
    let url = format!(
        "{}?query={query}&mode=ArtList&format=json&maxrecords={MAX_RECORDS}",
        join_url(&ctx.config().sources.gdelt_url, "api/v2/doc/doc")
    );

    let response = ctx
        .client()
        .fetch_json::<ArtList>(&url, ctx.client().options().service(SOURCE))
        .await?;

    let articles: Vec<GdeltArticle> = response
        .data
        .articles
        .into_iter()
        .map(GdeltArticle::from)
        .collect();
    tracing::info!(country = %country.en, count = articles.len(), "GDELT articles fetched");
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_seen_date() {
        let parsed = parse_seen_date("20240115T093000Z").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.month(), 1);
        assert_eq!(parsed.hour(), 9);
        assert!(parse_seen_date("yesterday").is_none());
    }

    #[test]
    fn test_shape_article() {
        let list: ArtList = serde_json::from_str(
            r#"{"articles":[{"url":"https://news.example/a","title":"Flood  in\nIzmir","seendate":"20240115T093000Z","socialimage":"","domain":"news.example","language":"English","sourcecountry":"Turkey"}]}"#,
        )
        .unwrap();

        let article = GdeltArticle::from(list.articles.into_iter().next().unwrap());
        assert_eq!(article.title, "Flood in Izmir");
        assert!(article.image.is_none());
        assert!(article.seen_at.is_some());
    }

    #[test]
    fn test_empty_result_object() {
        let list: ArtList = serde_json::from_str("{}").unwrap();
        assert!(list.articles.is_empty());
    }
}
