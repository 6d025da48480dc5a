//! OpenStreetMap infrastructure counts via the Overpass API

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{join_url, settle, SourceOutcome};
use crate::context::AppContext;
use crate::countries::Country;
use crate::error::{AppError, Result};

const SOURCE: &str = "osm";

/// Overpass server-side timeout, seconds
const QUERY_TIMEOUT_SECS: u32 = 90;

/// Facility kinds counted, with their OSM tag filter
pub const FACILITIES: &[(&str, &str)] = &[
    ("hospitals", r#"["amenity"="hospital"]"#),
    ("schools", r#"["amenity"="school"]"#),
    ("airports", r#"["aeroway"="aerodrome"]"#),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsmData {
    pub country: String,
    pub hospitals: u64,
    pub schools: u64,
    pub airports: u64,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<CountElement>,
}

#[derive(Debug, Deserialize)]
struct CountElement {
    #[serde(default)]
    tags: CountTags,
}

#[derive(Debug, Default, Deserialize)]
struct CountTags {
    #[serde(default)]
    total: String,
}

pub fn cache_key(country: &Country) -> String {
    format!("osm-{}", country.cca2)
}

/// Overpass QL counting every facility kind inside the country's
/// administrative area; one `count` element is returned per kind, in
/// [`FACILITIES`] order
pub fn build_query(cca2: &str) -> String {
    let mut query = format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECS}];\narea[\"ISO3166-1\"=\"{}\"][admin_level=2]->.country;\n",
        cca2.to_uppercase()
    );
    for (_, filter) in FACILITIES {
        query.push_str(&format!("nwr{filter}(area.country);\nout count;\n"));
    }
    query
}

pub async fn fetch_counts(ctx: &AppContext, country: &Country) -> SourceOutcome<OsmData> {
    let key = cache_key(country);
    if let Some(cached) = ctx.cache().get::<OsmData>(&key) {
        return SourceOutcome::Available(cached);
    }

    let outcome = settle(SOURCE, request(ctx, country).await);
    if let Some(data) = outcome.data() {
        ctx.cache().set(&key, data);
    }
    outcome
}

async fn request(ctx: &AppContext, country: &Country) -> Result<OsmData> {
    let url = join_url(&ctx.config().sources.overpass_url, "api/interpreter");
    let options = ctx
        .client()
        .options()
        .service(SOURCE)
        .method(Method::POST)
        .form(vec![("data".to_string(), build_query(&country.cca2))]);

    let response = ctx.client().fetch_json::<OverpassResponse>(&url, options).await?;
    parse_counts(&country.en, response.data)
}

fn parse_counts(country: &str, response: OverpassResponse) -> Result<OsmData> {
    if response.elements.len() != FACILITIES.len() {
        return Err(AppError::data_processing(format!(
            "Overpass returned {} count elements, expected {}",
            response.elements.len(),
            FACILITIES.len()
        )));
    }

    let counts: Vec<u64> = response
        .elements
        .iter()
        .map(|e| e.tags.total.parse::<u64>().unwrap_or(0))
        .collect();

    Ok(OsmData {
        country: country.to_string(),
        hospitals: counts[0],
        schools: counts[1],
        airports: counts[2],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query() {
        let query = build_query("tr");
        assert!(query.starts_with("[out:json]"));
        assert!(query.contains(r#"area["ISO3166-1"="TR"]"#));
        assert_eq!(query.matches("out count;").count(), FACILITIES.len());
    }

    #[test]
    fn test_parse_counts() {
        let response: OverpassResponse = serde_json::from_str(
            r#"{"version":0.6,"elements":[
                {"type":"count","id":0,"tags":{"nodes":"120","ways":"800","relations":"3","total":"923"}},
                {"type":"count","id":0,"tags":{"total":"31000"}},
                {"type":"count","id":0,"tags":{"total":"98"}}
            ]}"#,
        )
        .unwrap();

        let data = parse_counts("Turkey", response).unwrap();
        assert_eq!(data.hospitals, 923);
        assert_eq!(data.schools, 31000);
        assert_eq!(data.airports, 98);
    }

    #[test]
    fn test_missing_counts_is_an_error() {
        let response: OverpassResponse = serde_json::from_str(r#"{"elements":[]}"#).unwrap();
        assert!(parse_counts("Turkey", response).is_err());
    }
}
