//! Country naming reconciliation
//!
//! Sources name countries differently: Turkish display names, English names,
//! ISO CCA2/CCA3 codes, GeoJSON feature names, UCDP names and Gleditsch-Ward
//! numbers, FIPS codes for NOAA. [`CountryMappings`] cross-references the
//! embedded table with the Turkish name as the join key.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::utils::{slugify, strip_accents};

const COUNTRY_TABLE: &str = include_str!("../../data/countries.json");

/// Turkish alphabet order used for sorting display names
const TURKISH_ALPHABET: &str = "abcçdefgğhıijklmnoöprsştuüvyz";

/// One row of the country table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// Turkish display name, the join key
    pub tr: String,
    pub en: String,
    pub cca2: String,
    pub cca3: String,
    /// Name in UCDP datasets
    pub ucdp: String,
    /// Feature name in the world GeoJSON
    pub geojson: String,
    /// Gleditsch-Ward code, the UCDP API's country id
    pub gw: u16,
    /// FIPS 10-4 code used by NOAA
    pub fips: String,
    /// Factbook page slug when it differs from the slugified English name
    #[serde(default)]
    pub factbook: Option<String>,
}

impl Country {
    pub fn flag_url(&self) -> String {
        format!("https://flagcdn.com/w40/{}.png", self.cca2.to_lowercase())
    }

    pub fn factbook_slug(&self) -> String {
        self.factbook
            .clone()
            .unwrap_or_else(|| factbook_slug(&self.en))
    }
}

/// Factbook page slug derived from an English country name
pub fn factbook_slug(english: &str) -> String {
    slugify(english)
}

/// Lookup maps between naming systems
#[derive(Debug, Clone)]
pub struct CountryMappings {
    pub turkish_to_english: HashMap<String, String>,
    pub turkish_to_cca2: HashMap<String, String>,
    pub turkish_to_cca3: HashMap<String, String>,
    pub turkish_to_ucdp: HashMap<String, String>,
    pub turkish_to_flag: HashMap<String, String>,
    pub geojson_to_turkish: HashMap<String, String>,
    /// Turkish names in Turkish alphabetical order
    pub all_countries: Vec<String>,
    records: HashMap<String, Country>,
    index: HashMap<String, String>,
}

impl CountryMappings {
    /// Build the mappings from the embedded table
    pub fn build() -> Result<Self> {
        let records: Vec<Country> = serde_json::from_str(COUNTRY_TABLE)?;
        Self::from_records(records)
    }

    /// Build the mappings from explicit records
    ///
    /// Every map receives an entry for every record. Duplicate Turkish names
    /// are rejected.
    pub fn from_records(records: Vec<Country>) -> Result<Self> {
        let mut mappings = Self {
            turkish_to_english: HashMap::with_capacity(records.len()),
            turkish_to_cca2: HashMap::with_capacity(records.len()),
            turkish_to_cca3: HashMap::with_capacity(records.len()),
            turkish_to_ucdp: HashMap::with_capacity(records.len()),
            turkish_to_flag: HashMap::with_capacity(records.len()),
            geojson_to_turkish: HashMap::with_capacity(records.len()),
            all_countries: Vec::with_capacity(records.len()),
            records: HashMap::with_capacity(records.len()),
            index: HashMap::new(),
        };

        for country in records {
            let key = country.tr.clone();
            if mappings.records.contains_key(&key) {
                return Err(AppError::data_processing(format!(
                    "duplicate country in table: {key}"
                )));
            }

            mappings
                .turkish_to_english
                .insert(key.clone(), country.en.clone());
            mappings
                .turkish_to_cca2
                .insert(key.clone(), country.cca2.clone());
            mappings
                .turkish_to_cca3
                .insert(key.clone(), country.cca3.clone());
            mappings
                .turkish_to_ucdp
                .insert(key.clone(), country.ucdp.clone());
            mappings
                .turkish_to_flag
                .insert(key.clone(), country.flag_url());
            mappings
                .geojson_to_turkish
                .insert(country.geojson.clone(), key.clone());

            for alias in [
                &country.tr,
                &country.en,
                &country.cca2,
                &country.cca3,
                &country.geojson,
            ] {
                mappings
                    .index
                    .entry(lookup_key(alias))
                    .or_insert_with(|| key.clone());
            }

            mappings.all_countries.push(key.clone());
            mappings.records.insert(key, country);
        }

        // UCDP names can be shared (Palestinian events are recorded under
        // Israel), so they never shadow a country's own names.
        for (key, country) in &mappings.records {
            mappings
                .index
                .entry(lookup_key(&country.ucdp))
                .or_insert_with(|| key.clone());
        }

        mappings
            .all_countries
            .sort_by_cached_key(|name| turkish_collation_key(name));

        tracing::debug!(count = mappings.len(), "Country mappings built");
        Ok(mappings)
    }

    /// Record by Turkish name
    pub fn get(&self, turkish: &str) -> Option<&Country> {
        self.records.get(turkish)
    }

    /// Record by any known name or code, case- and accent-insensitive
    pub fn resolve(&self, name: &str) -> Option<&Country> {
        self.index
            .get(&lookup_key(name.trim()))
            .and_then(|tr| self.records.get(tr))
    }

    /// Records in Turkish alphabetical order
    pub fn countries(&self) -> impl Iterator<Item = &Country> {
        self.all_countries
            .iter()
            .filter_map(|name| self.records.get(name))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn lookup_key(name: &str) -> String {
    strip_accents(name).to_lowercase()
}

/// Sort key following the Turkish alphabet, including dotted/dotless i
fn turkish_collation_key(name: &str) -> Vec<u32> {
    name.chars()
        .map(|c| {
            let lower = match c {
                'I' => 'ı',
                'İ' => 'i',
                other => other.to_lowercase().next().unwrap_or(other),
            };
            TURKISH_ALPHABET
                .chars()
                .position(|a| a == lower)
                .map(|p| p as u32)
                .unwrap_or(1000 + lower as u32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> CountryMappings {
        CountryMappings::build().unwrap()
    }

    #[test]
    fn test_every_map_covers_every_country() {
        let m = mappings();
        assert_eq!(m.len(), 196);
        assert_eq!(m.all_countries.len(), m.len());

        for name in &m.all_countries {
            assert!(m.turkish_to_english.contains_key(name), "{name}");
            assert!(m.turkish_to_cca2.contains_key(name), "{name}");
            assert!(m.turkish_to_cca3.contains_key(name), "{name}");
            assert!(m.turkish_to_ucdp.contains_key(name), "{name}");
            assert!(m.turkish_to_flag.contains_key(name), "{name}");
        }
        assert_eq!(m.geojson_to_turkish.len(), m.len());
    }

    #[test]
    fn test_resolve_by_any_name() {
        let m = mappings();
        for query in ["Türkiye", "turkiye", "Turkey", "TR", "tur", " TUR "] {
            let country = m.resolve(query).unwrap_or_else(|| panic!("{query}"));
            assert_eq!(country.cca3, "TUR");
        }
        assert_eq!(m.resolve("DR Congo (Zaire)").unwrap().cca2, "CD");
        assert_eq!(m.resolve("Ivory Coast").unwrap().tr, "Fildişi Sahili");
        assert!(m.resolve("Atlantis").is_none());
    }

    #[test]
    fn test_whole_world_resolves() {
        let m = mappings();
        for query in ["Palestine", "Filistin", "Chile", "Şili", "sili", "Kenya", "NZL", "XK", "Taiwan"] {
            assert!(m.resolve(query).is_some(), "{query}");
        }
        assert_eq!(m.resolve("Palestine").unwrap().cca3, "PSE");
        assert_eq!(m.resolve("Israel").unwrap().cca3, "ISR");
        assert_eq!(m.resolve("Republic of Serbia").unwrap().gw, 345);
    }

    #[test]
    fn test_codes_are_unique_and_well_formed() {
        let m = mappings();
        let mut cca2 = std::collections::HashSet::new();
        let mut cca3 = std::collections::HashSet::new();
        let mut fips = std::collections::HashSet::new();

        for country in m.countries() {
            assert_eq!(country.cca2.len(), 2, "{}", country.tr);
            assert_eq!(country.cca3.len(), 3, "{}", country.tr);
            assert_eq!(country.fips.len(), 2, "{}", country.tr);
            assert!(country.gw > 0, "{}", country.tr);
            assert!(cca2.insert(country.cca2.as_str()), "{}", country.cca2);
            assert!(cca3.insert(country.cca3.as_str()), "{}", country.cca3);
            assert!(fips.insert(country.fips.as_str()), "{}", country.fips);
        }
    }

    #[test]
    fn test_geojson_to_turkish() {
        let m = mappings();
        assert_eq!(
            m.geojson_to_turkish.get("United States of America").map(String::as_str),
            Some("Amerika Birleşik Devletleri")
        );
    }

    #[test]
    fn test_turkish_sort_order() {
        let m = mappings();
        let pos = |name: &str| m.all_countries.iter().position(|n| n == name).unwrap();

        assert!(pos("Cezayir") < pos("Çin"));
        assert!(pos("Çin") < pos("Demokratik Kongo Cumhuriyeti"));
        assert!(pos("Irak") < pos("İran"));
        assert!(pos("Suudi Arabistan") < pos("Tunus"));
        assert_eq!(m.all_countries.first().map(String::as_str), Some("Afganistan"));
    }

    #[test]
    fn test_factbook_slugs() {
        let m = mappings();
        assert_eq!(m.get("Fransa").unwrap().factbook_slug(), "france");
        assert_eq!(
            m.get("Birleşik Krallık").unwrap().factbook_slug(),
            "united-kingdom"
        );
        assert_eq!(m.get("Türkiye").unwrap().factbook_slug(), "turkey-turkiye");
        assert_eq!(factbook_slug("Côte d'Ivoire"), "cote-d-ivoire");
    }

    #[test]
    fn test_flag_url() {
        let m = mappings();
        assert_eq!(
            m.turkish_to_flag.get("Japonya").map(String::as_str),
            Some("https://flagcdn.com/w40/jp.png")
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let m = mappings();
        let turkey = m.get("Türkiye").unwrap().clone();
        let result = CountryMappings::from_records(vec![turkey.clone(), turkey]);
        assert!(result.is_err());
    }
}
