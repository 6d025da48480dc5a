//! CIA World Factbook country profile, scraped from the HTML page
//!
//! Profile pages are a sequence of `<h3>` field headings, each followed by an
//! element holding the field text. Multi-part fields separate their parts
//! with `<br>` and prefix them with a label (`name: Ankara`).

use reqwest::header::{HeaderValue, ACCEPT};
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};
use crate::utils::normalize_whitespace;

const SOURCE: &str = "factbook";

/// Headings tried, in order, for the GDP field
const GDP_HEADINGS: &[&str] = &[
    "Real GDP (purchasing power parity)",
    "GDP (official exchange rate)",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactbookData {
    pub country: String,
    pub url: String,
    pub capital: Option<String>,
    pub population: Option<String>,
    pub area: Option<String>,
    pub government_type: Option<String>,
    pub languages: Option<String>,
    pub gdp: Option<String>,
}

impl FactbookData {
    fn is_empty(&self) -> bool {
        self.capital.is_none()
            && self.population.is_none()
            && self.area.is_none()
            && self.government_type.is_none()
            && self.languages.is_none()
            && self.gdp.is_none()
    }
}

pub fn cache_key(country: &Country) -> String {
    format!("factbook-{}", country.cca3)
}

/// Factbook profile URL of a country
pub fn profile_url(ctx: &AppContext, country: &Country) -> String {
    join_url(
        &ctx.config().sources.factbook_url,
        &format!("{}/", country.factbook_slug()),
    )
}

pub async fn fetch_profile(ctx: &AppContext, country: &Country) -> SourceOutcome<FactbookData> {
    let key = cache_key(country);
    if let Some(cached) = ctx.cache().get::<FactbookData>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country).await);
    if let Some(data) = outcome.data() {
        ctx.cache().set(&key, data);
    }
    outcome
}

async fn request(ctx: &AppContext, country: &Country) -> Result<FactbookData> {
    let url = profile_url(ctx, country);
    let options = ctx
        .client()
        .options()
        .service(SOURCE)
        .header(ACCEPT, HeaderValue::from_static("text/html"));

    let html = ctx.client().fetch_text(&url, options).await?.data;
    let data = parse_profile(&html, &country.en, &url)?;
    tracing::info!(country = %country.en, url = %url, "Factbook profile scraped");
    Ok(data)
}

/// Extract the profile fields from a Factbook page
///
/// # Errors
///
/// Returns `AppError::DataProcessing` when none of the fields is present,
/// which usually means the page layout changed.
pub fn parse_profile(html: &str, country: &str, url: &str) -> Result<FactbookData> {
    let document = Html::parse_document(html);
    let headings = Selector::parse("h3")
        .map_err(|e| AppError::data_processing(format!("Invalid selector: {e}")))?;

    let mut data = FactbookData {
        country: country.to_string(),
        url: url.to_string(),
        ..Default::default()
    };

    for heading in document.select(&headings) {
        let title = normalize_whitespace(&heading.text().collect::<String>());
        let Some(parts) = field_parts(heading) else {
            continue;
        };

        match title.as_str() {
            "Capital" => data.capital = labelled(&parts, "name"),
            "Population" => data.population = labelled(&parts, "total"),
            "Area" => data.area = labelled(&parts, "total"),
            "Government type" => data.government_type = Some(parts.join("; ")),
            "Languages" => data.languages = parts.first().cloned(),
            t if GDP_HEADINGS.contains(&t) && data.gdp.is_none() => {
                data.gdp = parts.first().cloned()
            }
            _ => {}
        }
    }

    if data.is_empty() {
        return Err(AppError::data_processing(format!(
            "No Factbook fields found for {country}"
        ))
        .with_context("endpoint", url));
    }
    Ok(data)
}

/// Lines of the element following a heading, split on `<br>`
fn field_parts(heading: ElementRef<'_>) -> Option<Vec<String>> {
    let body = heading.next_siblings().find_map(ElementRef::wrap)?;

    let mut lines = Vec::new();
    let mut current = String::new();
    for node in body.descendants() {
        match node.value() {
            Node::Text(text) => current.push_str(text),
            Node::Element(element) if element.name() == "br" => {
                lines.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }
    lines.push(current);

    let parts: Vec<String> = lines
        .iter()
        .map(|line| normalize_whitespace(line))
        .filter(|line| !line.is_empty())
        .collect();
    (!parts.is_empty()).then_some(parts)
}

/// Value of the `label:` part, or the first part when unlabelled
fn labelled(parts: &[String], label: &str) -> Option<String> {
    let labelled = parts.iter().find_map(|part| {
        let (key, value) = part.split_once(':')?;
        (key.trim().eq_ignore_ascii_case(label)).then(|| value.trim().to_string())
    });
    labelled
        .filter(|value| !value.is_empty())
        .or_else(|| parts.first().cloned())
}
