//! Country dashboard: every panel loaded concurrently
//!
//! A failing source only empties its own panel; the others still render.

use serde::Serialize;

use crate::context::AppContext;
use crate::countries::Country;
use crate::metrics;
use crate::sources::factbook::{self, FactbookData};
use crate::sources::gdelt::{self, GdeltArticle};
use crate::sources::gemini;
use crate::sources::noaa::{self, NoaaIndicator};
use crate::sources::osm::{self, OsmData};
use crate::sources::population::{self, PopulationPyramidData};
use crate::sources::reliefweb::{self, ReliefWebUpdate};
use crate::sources::ucdp::{self, UcdpData};
use crate::sources::worldbank::{self, WorldBankIndicator};
use crate::sources::SourceOutcome;

/// Which panels to load
#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    /// Ask the generative-AI service for an overview
    pub summary: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self { summary: true }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDashboard {
    pub country: Country,
    pub flag_url: String,
    pub indicators: Vec<WorldBankIndicator>,
    pub news: SourceOutcome<Vec<GdeltArticle>>,
    pub conflicts: SourceOutcome<UcdpData>,
    pub climate: SourceOutcome<Vec<NoaaIndicator>>,
    pub factbook: SourceOutcome<FactbookData>,
    pub humanitarian: SourceOutcome<Vec<ReliefWebUpdate>>,
    pub infrastructure: SourceOutcome<OsmData>,
    pub population: SourceOutcome<PopulationPyramidData>,
    /// `None` when not requested
    pub summary: Option<SourceOutcome<String>>,
}

impl CountryDashboard {
    pub async fn load(ctx: &AppContext, country: &Country) -> Self {
        Self::load_with(ctx, country, DashboardOptions::default()).await
    }

    pub async fn load_with(ctx: &AppContext, country: &Country, options: DashboardOptions) -> Self {
        let _timer = metrics::start_dashboard_timer();
        tracing::info!(country = %country.en, "Loading country dashboard");

        let summary = async {
            if options.summary {
                Some(gemini::country_summary(ctx, country).await)
            } else {
                None
            }
        };

        let (indicators, news, conflicts, climate, factbook, humanitarian, infrastructure, population, summary) = tokio::join!(
            worldbank::fetch_indicators(ctx, &country.cca3),
            gdelt::fetch_articles(ctx, country),
            ucdp::fetch_events(ctx, country),
            noaa::fetch_climate(ctx, country),
            factbook::fetch_profile(ctx, country),
            reliefweb::fetch_updates(ctx, country),
            osm::fetch_counts(ctx, country),
            population::fetch_pyramid(ctx, country),
            summary,
        );

        let dashboard = Self {
            country: country.clone(),
            flag_url: country.flag_url(),
            indicators,
            news,
            conflicts,
            climate,
            factbook,
            humanitarian,
            infrastructure,
            population,
            summary,
        };
        tracing::info!(
            country = %country.en,
            unavailable = dashboard.unavailable_panels().len(),
            "Country dashboard loaded"
        );
        dashboard
    }

    /// Names of panels that could not be loaded
    pub fn unavailable_panels(&self) -> Vec<&'static str> {
        let mut panels = Vec::new();
        if !self.indicators.iter().any(WorldBankIndicator::is_reported) {
            panels.push("indicators");
        }
        let outcomes = [
            ("news", self.news.is_available()),
            ("conflicts", self.conflicts.is_available()),
            ("climate", self.climate.is_available()),
            ("factbook", self.factbook.is_available()),
            ("humanitarian", self.humanitarian.is_available()),
            ("infrastructure", self.infrastructure.is_available()),
            ("population", self.population.is_available()),
            (
                "summary",
                self.summary.as_ref().map_or(true, SourceOutcome::is_available),
            ),
        ];
        panels.extend(
            outcomes
                .into_iter()
                .filter(|(_, available)| !available)
                .map(|(name, _)| name),
        );
        panels
    }
}
