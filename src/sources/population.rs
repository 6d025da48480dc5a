//! Population pyramid built from World Bank five-year age-band shares
//!
//! The API reports each band as a percentage of the male or female
//! population (`SP.POP.{band}.{MA|FE}.5Y`); multiplying by the sex totals
//! (`SP.POP.TOTL.{MA|FE}.IN`) gives head counts.

use serde::{Deserialize, Serialize};

use super::worldbank::{fetch_observations, Observation};
use super::{settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};

const SOURCE: &str = "population";

/// Age bands, youngest first: (indicator band code, label)
pub const AGE_BANDS: &[(&str, &str)] = &[
    ("0004", "0-4"),
    ("0509", "5-9"),
    ("1014", "10-14"),
    ("1519", "15-19"),
    ("2024", "20-24"),
    ("2529", "25-29"),
    ("3034", "30-34"),
    ("3539", "35-39"),
    ("4044", "40-44"),
    ("4549", "45-49"),
    ("5054", "50-54"),
    ("5559", "55-59"),
    ("6064", "60-64"),
    ("6569", "65-69"),
    ("7074", "70-74"),
    ("7579", "75-79"),
    ("80UP", "80+"),
];

const MALE_TOTAL: &str = "SP.POP.TOTL.MA.IN";
const FEMALE_TOTAL: &str = "SP.POP.TOTL.FE.IN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeGroup {
    pub label: String,
    pub male: u64,
    pub female: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationPyramidData {
    pub country: String,
    /// Year of the sex totals
    pub year: String,
    pub age_groups: Vec<AgeGroup>,
    pub total_male: u64,
    pub total_female: u64,
    /// Sum over all age groups
    pub total: u64,
}

fn band_code(band: &str, sex: &str) -> String {
    format!("SP.POP.{band}.{sex}.5Y")
}

/// Every indicator code the pyramid needs
pub fn indicator_codes() -> Vec<String> {
    let mut codes: Vec<String> = AGE_BANDS
        .iter()
        .flat_map(|(band, _)| [band_code(band, "MA"), band_code(band, "FE")])
        .collect();
    codes.push(MALE_TOTAL.to_string());
    codes.push(FEMALE_TOTAL.to_string());
    codes
}

pub fn cache_key(country: &Country) -> String {
    format!("population-{}", country.cca3)
}

pub async fn fetch_pyramid(ctx: &AppContext, country: &Country) -> SourceOutcome<PopulationPyramidData> {
    let key = cache_key(country);
    if let Some(cached) = ctx.cache().get::<PopulationPyramidData>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country).await);
    if let Some(data) = outcome.data() {
        ctx.cache().set(&key, data);
    }
    outcome
}

async fn request(ctx: &AppContext, country: &Country) -> Result<PopulationPyramidData> {
    let codes = indicator_codes();
    let code_refs: Vec<&str> = codes.iter().map(String::as_str).collect();
    let observations = fetch_observations(ctx, &country.cca3, &code_refs).await?;
    build_pyramid(&country.en, &observations)
}

/// Combine band shares and sex totals into head counts
///
/// # Errors
///
/// Returns `AppError::DataProcessing` when a sex total is missing. Missing
/// bands count as zero.
pub fn build_pyramid(country: &str, observations: &[Observation]) -> Result<PopulationPyramidData> {
    let find = |code: &str| {
        observations
            .iter()
            .find(|o| o.indicator.id == code)
            .and_then(|o| o.value.map(|v| (v, o.date.as_str())))
    };

    let (Some((male_total, year)), Some((female_total, _))) = (find(MALE_TOTAL), find(FEMALE_TOTAL))
    else {
        return Err(AppError::data_processing(format!(
            "No population totals reported for {country}"
        )));
    };

    let head_count = |share: Option<(f64, &str)>, total: f64| {
        share.map_or(0, |(percent, _)| (percent / 100.0 * total).round() as u64)
    };

    let age_groups: Vec<AgeGroup> = AGE_BANDS
        .iter()
        .map(|(band, label)| AgeGroup {
            label: label.to_string(),
            male: head_count(find(band_code(band, "MA").as_str()), male_total),
            female: head_count(find(band_code(band, "FE").as_str()), female_total),
        })
        .collect();

    let total = age_groups.iter().map(|g| g.male + g.female).sum();

    Ok(PopulationPyramidData {
        country: country.to_string(),
        year: year.to_string(),
        total_male: male_total.round() as u64,
        total_female: female_total.round() as u64,
        age_groups,
        total,
    })
}
