//! World Bank Indicators API
//!
//! All indicators of a country are requested in one call
//! (`/v2/country/{cca3}/indicator/{code;code;...}` with `source=2`), asking
//! for the most recent non-empty value of each.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_url, unavailable_message};
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::i18n::t;
use crate::metrics;

/// Indicators shown on the country panel, in display order
pub const INDICATORS: &[(&str, &str)] = &[
    ("NY.GDP.MKTP.CD", "GDP (current US$)"),
    ("NY.GDP.PCAP.CD", "GDP per capita (current US$)"),
    ("SP.POP.TOTL", "Population, total"),
    ("FP.CPI.TOTL.ZG", "Inflation, consumer prices (annual %)"),
    ("SL.UEM.TOTL.ZS", "Unemployment, total (% of total labor force)"),
    ("SP.DYN.LE00.IN", "Life expectancy at birth, total (years)"),
];

const SOURCE: &str = "worldbank";

/// What the API said about one indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorOutcome {
    Reported { value: f64, year: String },
    /// The request worked but the country reports no value
    NoData { message: String },
    /// The request itself failed
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldBankIndicator {
    pub indicator_code: String,
    pub indicator_name: String,
    pub outcome: IndicatorOutcome,
}

impl WorldBankIndicator {
    pub fn value(&self) -> Option<f64> {
        match &self.outcome {
            IndicatorOutcome::Reported { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<&str> {
        match &self.outcome {
            IndicatorOutcome::Reported { year, .. } => Some(year),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            IndicatorOutcome::Reported { .. } => None,
            IndicatorOutcome::NoData { message } | IndicatorOutcome::Failed { message } => {
                Some(message)
            }
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self.outcome, IndicatorOutcome::Reported { .. })
    }
}

/// One observation row of the API
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub indicator: IndicatorRef,
    pub date: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorRef {
    pub id: String,
    pub value: String,
}

/// Cache store key for a country's indicators
pub fn cache_key(cca3: &str) -> String {
    format!("worldbank-{cca3}")
}

/// Fetch the panel indicators of a country
///
/// Never fails: on a failed request every entry carries
/// [`IndicatorOutcome::Failed`]. Results with at least one reported value
/// are cached under `worldbank-{cca3}`.
pub async fn fetch_indicators(ctx: &AppContext, cca3: &str) -> Vec<WorldBankIndicator> {
    let cca3 = cca3.trim().to_uppercase();
    let key = cache_key(&cca3);
    if let Some(cached) = ctx.cache().get::<Vec<WorldBankIndicator>>(&key) {
        return cached;
    }

    let codes: Vec<&str> = INDICATORS.iter().map(|(code, _)| *code).collect();
    match fetch_observations(ctx, &cca3, &codes).await {
        Ok(observations) => {
            let indicators = shape(&observations);
            let reported = indicators.iter().filter(|i| i.is_reported()).count();
            tracing::info!(country = %cca3, reported = reported, "World Bank indicators fetched");
            metrics::record_source_outcome(SOURCE, reported > 0);
            if reported > 0 {
                ctx.cache().set(&key, &indicators);
            }
            indicators
        }
        Err(e) => {
            tracing::warn!(country = %cca3, error = %e, "World Bank request failed");
            metrics::record_source_outcome(SOURCE, false);
            let message = unavailable_message("World Bank", &e);
            INDICATORS
                .iter()
                .map(|(code, name)| WorldBankIndicator {
                    indicator_code: code.to_string(),
                    indicator_name: name.to_string(),
                    outcome: IndicatorOutcome::Failed {
                        message: message.clone(),
                    },
                })
                .collect()
        }
    }
}

/// Most recent observation of each requested indicator
pub async fn fetch_observations(
    ctx: &AppContext,
    cca3: &str,
    codes: &[&str],
) -> Result<Vec<Observation>> {
    if cca3.len() != 3 || !cca3.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::validation(
            Some("cca3"),
            format!("'{cca3}' is not an ISO alpha-3 code"),
        ));
    }

    let path = format!("v2/country/{cca3}/indicator/{}", codes.join(";"));
    let url = format!(
        "{}?format=json&mrnev=1&source=2&per_page=200",
        join_url(&ctx.config().sources.worldbank_url, &path)
    );

    let response = ctx
        .client()
        .fetch_json::<Value>(&url, ctx.client().options().service(SOURCE))
        .await?;
    parse_observations(response.data)
}

/// Parse the `[meta, rows]` envelope; an error envelope `[{"message": ...}]`
/// becomes a `DataProcessing` error
pub fn parse_observations(body: Value) -> Result<Vec<Observation>> {
    let Value::Array(parts) = body else {
        return Err(AppError::data_processing(
            "World Bank response is not an array",
        ));
    };

    if let Some(messages) = parts.first().and_then(|meta| meta.get("message")) {
        let text = messages
            .get(0)
            .and_then(|m| m.get("value"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AppError::data_processing(format!("World Bank API error: {text}")));
    }

    match parts.into_iter().nth(1) {
        Some(rows @ Value::Array(_)) => Ok(serde_json::from_value(rows)?),
        _ => Ok(Vec::new()),
    }
}

fn shape(observations: &[Observation]) -> Vec<WorldBankIndicator> {
    INDICATORS
        .iter()
        .map(|(code, name)| {
            let observation = observations
                .iter()
                .find(|o| o.indicator.id == *code && o.value.is_some());

            let outcome = match observation {
                Some(Observation {
                    value: Some(value),
                    date,
                    ..
                }) => IndicatorOutcome::Reported {
                    value: *value,
                    year: date.clone(),
                },
                _ => IndicatorOutcome::NoData {
                    message: t!("sources.no_data").to_string(),
                },
            };

            WorldBankIndicator {
                indicator_code: code.to_string(),
                indicator_name: name.to_string(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_shape() {
        let body = json!([
            {"page": 1, "pages": 1, "per_page": 200, "total": 2},
            [
                {
                    "indicator": {"id": "NY.GDP.MKTP.CD", "value": "GDP (current US$)"},
                    "country": {"id": "TR", "value": "Turkiye"},
                    "countryiso3code": "TUR",
                    "date": "2023",
                    "value": 1100000000000.0
                },
                {
                    "indicator": {"id": "SL.UEM.TOTL.ZS", "value": "Unemployment"},
                    "date": "2023",
                    "value": null
                }
            ]
        ]);

        let indicators = shape(&parse_observations(body).unwrap());
        assert_eq!(indicators.len(), INDICATORS.len());

        let gdp = &indicators[0];
        assert_eq!(gdp.indicator_code, "NY.GDP.MKTP.CD");
        assert_eq!(gdp.value(), Some(1_100_000_000_000.0));
        assert_eq!(gdp.year(), Some("2023"));

        let unemployment = indicators
            .iter()
            .find(|i| i.indicator_code == "SL.UEM.TOTL.ZS")
            .unwrap();
        assert!(matches!(unemployment.outcome, IndicatorOutcome::NoData { .. }));
        assert!(unemployment.message().is_some_and(|m| !m.is_empty()));
    }

    #[test]
    fn test_error_envelope() {
        let body = json!([{"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}]);
        let err = parse_observations(body).unwrap_err();
        assert!(err.to_string().contains("not valid"));
    }

    #[test]
    fn test_empty_rows() {
        let body = json!([{"page": 0, "total": 0}, null]);
        assert!(parse_observations(body).unwrap().is_empty());
    }

    #[test]
    fn test_legitimate_zero_is_reported() {
        let observations = vec![Observation {
            indicator: IndicatorRef {
                id: "FP.CPI.TOTL.ZG".into(),
                value: "Inflation".into(),
            },
            date: "2022".into(),
            value: Some(0.0),
        }];
        let indicators = shape(&observations);
        let inflation = indicators
            .iter()
            .find(|i| i.indicator_code == "FP.CPI.TOTL.ZG")
            .unwrap();
        assert_eq!(inflation.value(), Some(0.0));
        assert!(inflation.message().is_none());
    }
}
