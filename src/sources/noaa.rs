//! NOAA Climate Data Online: monthly climate summaries (GSOM)

use chrono::{Datelike, Utc};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};
use crate::i18n::t;
use crate::metrics;

const SOURCE: &str = "noaa";

/// Datatypes summarized, with display names and units
pub const DATATYPES: &[(&str, &str, &str)] = &[
    ("TAVG", "Average temperature", "°C"),
    ("TMAX", "Average maximum temperature", "°C"),
    ("TMIN", "Average minimum temperature", "°C"),
    ("PRCP", "Total monthly precipitation", "mm"),
];

const PAGE_LIMIT: usize = 1000;

/// One climate measure averaged over the country's stations and a year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoaaIndicator {
    pub datatype: String,
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub year: i32,
    /// Station-month observations behind the average
    pub observations: usize,
}

#[derive(Debug, Default, Deserialize)]
struct DataPage {
    #[serde(default)]
    results: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    datatype: String,
    value: f64,
}

pub fn cache_key(country: &Country, year: i32) -> String {
    format!("noaa-{}-{year}", country.fips)
}

/// Climate summary of the last complete year
///
/// Without a configured token the source is reported unavailable and no
/// request is made.
pub async fn fetch_climate(ctx: &AppContext, country: &Country) -> SourceOutcome<Vec<NoaaIndicator>> {
    let Some(token) = ctx.config().sources.noaa_token.as_deref() else {
        metrics::record_source_outcome(SOURCE, false);
        return SourceOutcome::unavailable(t!("sources.noaa_token_missing"));
    };

    let year = Utc::now().year() - 1;
    let key = cache_key(country, year);
    if let Some(cached) = ctx.cache().get::<Vec<NoaaIndicator>>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country, token, year).await);
    if let Some(indicators) = outcome.data().filter(|i| !i.is_empty()) {
        ctx.cache().set(&key, indicators);
    }
    outcome
}

async fn request(
    ctx: &AppContext,
    country: &Country,
    token: &str,
    year: i32,
) -> Result<Vec<NoaaIndicator>> {
    let datatypes: String = DATATYPES
        .iter()
        .map(|(id, _, _)| format!("&datatypeid={id}"))
        .collect();
    let url = format!(
        "{}?datasetid=GSOM&locationid=FIPS:{}&startdate={year}-01-01&enddate={year}-12-31&units=metric&limit={PAGE_LIMIT}{datatypes}",
        join_url(&ctx.config().sources.noaa_url, "cdo-web/api/v2/data"),
        country.fips
    );

    let value = HeaderValue::from_str(token).map_err(|_| {
        AppError::configuration(Some("GOVNEWS_NOAA_TOKEN"), "token is not a valid header value")
    })?;
    let options = ctx
        .client()
        .options()
        .service(SOURCE)
        .header(HeaderName::from_static("token"), value);

    // An empty object means no station reported for the period
    let page = ctx.client().fetch_json::<DataPage>(&url, options).await?.data;
    Ok(summarize(&page.results, year))
}

fn summarize(observations: &[RawObservation], year: i32) -> Vec<NoaaIndicator> {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for observation in observations {
        grouped
            .entry(observation.datatype.as_str())
            .or_default()
            .push(observation.value);
    }

    DATATYPES
        .iter()
        .filter_map(|(id, name, unit)| {
            let values = grouped.get(id)?;
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Some(NoaaIndicator {
                datatype: id.to_string(),
                name: name.to_string(),
                value: (mean * 10.0).round() / 10.0,
                unit: unit.to_string(),
                year,
                observations: values.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_averages_by_datatype() {
        let page: DataPage = serde_json::from_str(
            r#"{
                "metadata": {"resultset": {"offset": 1, "count": 4, "limit": 1000}},
                "results": [
                    {"date": "2023-01-01T00:00:00", "datatype": "TAVG", "station": "GHCND:TU000017062", "attributes": ",,", "value": 6.0},
                    {"date": "2023-02-01T00:00:00", "datatype": "TAVG", "station": "GHCND:TU000017062", "attributes": ",,", "value": 7.25},
                    {"date": "2023-01-01T00:00:00", "datatype": "PRCP", "station": "GHCND:TU000017062", "attributes": ",,", "value": 90.0},
                    {"date": "2023-01-01T00:00:00", "datatype": "SNOW", "station": "GHCND:TU000017062", "attributes": ",,", "value": 3.0}
                ]
            }"#,
        )
        .unwrap();

        let indicators = summarize(&page.results, 2023);
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators[0].datatype, "TAVG");
        assert_eq!(indicators[0].value, 6.6);
        assert_eq!(indicators[0].observations, 2);
        assert_eq!(indicators[1].unit, "mm");
    }

    #[test]
    fn test_empty_page() {
        let page: DataPage = serde_json::from_str("{}").unwrap();
        assert!(summarize(&page.results, 2023).is_empty());
    }
}
