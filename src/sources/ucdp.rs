//! UCDP Georeferenced Event Dataset API: organized violence events

use chrono::NaiveDate;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};

const SOURCE: &str = "ucdp";

/// Events requested per country
pub const PAGE_SIZE: usize = 100;

const TOKEN_HEADER: &str = "x-ucdp-access-token";

/// UCDP violence categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolenceType {
    StateBased,
    NonState,
    OneSided,
    Unknown,
}

impl ViolenceType {
    fn from_code(code: u8) -> Self {
        match code {
            1 => Self::StateBased,
            2 => Self::NonState,
            3 => Self::OneSided,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateBased => "state-based",
            Self::NonState => "non-state",
            Self::OneSided => "one-sided",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UcdpEvent {
    pub id: u64,
    pub year: i32,
    pub violence: ViolenceType,
    pub side_a: String,
    pub side_b: String,
    /// Best estimate of fatalities
    pub deaths: u32,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Events of one country plus totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UcdpData {
    pub country: String,
    /// Events matching the query upstream, not just the returned page
    pub total_events: u64,
    /// Fatalities across the returned events
    pub total_deaths: u64,
    pub events: Vec<UcdpEvent>,
}

#[derive(Debug, Deserialize)]
struct GedPage {
    #[serde(rename = "TotalCount", default)]
    total_count: u64,
    #[serde(rename = "Result", default)]
    result: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u64,
    #[serde(default)]
    year: i32,
    #[serde(default)]
    type_of_violence: u8,
    #[serde(default)]
    side_a: String,
    #[serde(default)]
    side_b: String,
    #[serde(default)]
    best: u32,
    #[serde(default)]
    date_start: String,
    #[serde(default)]
    where_description: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl From<RawEvent> for UcdpEvent {
    fn from(raw: RawEvent) -> Self {
        Self {
            id: raw.id,
            year: raw.year,
            violence: ViolenceType::from_code(raw.type_of_violence),
            side_a: raw.side_a,
            side_b: raw.side_b,
            deaths: raw.best,
            date: parse_event_date(&raw.date_start),
            location: raw.where_description.filter(|s| !s.is_empty()),
            latitude: raw.latitude,
            longitude: raw.longitude,
        }
    }
}

/// Dates come as `2023-01-15` or `2023-01-15 00:00:00.000`
fn parse_event_date(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

pub fn cache_key(country: &Country) -> String {
    format!("ucdp-{}", country.gw)
}

/// Conflict events for a country, newest first
pub async fn fetch_events(ctx: &AppContext, country: &Country) -> SourceOutcome<UcdpData> {
    let key = cache_key(country);
    if let Some(cached) = ctx.cache().get::<UcdpData>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country).await);
    if let Some(data) = outcome.data() {
        ctx.cache().set(&key, data);
    }
    outcome
}

async fn request(ctx: &AppContext, country: &Country) -> Result<UcdpData> {
    let sources = &ctx.config().sources;
    let url = format!(
        "{}?pagesize={PAGE_SIZE}&Country={}",
        join_url(
            &sources.ucdp_url,
            &format!("api/gedevents/{}", sources.ucdp_version)
        ),
        country.gw
    );

    let mut options = ctx.client().options().service(SOURCE);
    if let Some(token) = &sources.ucdp_token {
        let value = HeaderValue::from_str(token).map_err(|_| {
            AppError::configuration(Some("GOVNEWS_UCDP_TOKEN"), "token is not a valid header value")
        })?;
        options = options.header(HeaderName::from_static(TOKEN_HEADER), value);
    }

    let page = ctx.client().fetch_json::<GedPage>(&url, options).await?.data;
    Ok(summarize(&country.ucdp, page))
}

fn summarize(country: &str, page: GedPage) -> UcdpData {
    let mut events: Vec<UcdpEvent> = page.result.into_iter().map(UcdpEvent::from).collect();
    events.sort_by(|a, b| b.date.cmp(&a.date));
    let total_deaths = events.iter().map(|e| u64::from(e.deaths)).sum();

    UcdpData {
        country: country.to_string(),
        total_events: page.total_count.max(events.len() as u64),
        total_deaths,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_page() {
        let page: GedPage = serde_json::from_str(
            r#"{
                "TotalCount": 250,
                "TotalPages": 3,
                "Result": [
                    {"id": 1, "year": 2022, "type_of_violence": 1, "side_a": "Government of Turkey", "side_b": "PKK", "best": 4, "date_start": "2022-03-01 00:00:00.000", "where_description": "Hakkari", "latitude": 37.57, "longitude": 43.74},
                    {"id": 2, "year": 2023, "type_of_violence": 3, "side_a": "IS", "side_b": "Civilians", "best": 7, "date_start": "2023-06-10"}
                ]
            }"#,
        )
        .unwrap();

        let data = summarize("Turkey", page);
        assert_eq!(data.total_events, 250);
        assert_eq!(data.total_deaths, 11);
        assert_eq!(data.events[0].id, 2);
        assert_eq!(data.events[0].violence, ViolenceType::OneSided);
        assert_eq!(data.events[1].location.as_deref(), Some("Hakkari"));
    }

    #[test]
    fn test_parse_event_date() {
        assert_eq!(
            parse_event_date("2023-01-15 00:00:00.000"),
            NaiveDate::from_ymd_opt(2023, 1, 15)
        );
        assert_eq!(parse_event_date("bad"), None);
    }
}
