use anyhow::{Context, Result};

use govnews::context::AppContext;
use govnews::dashboard::{CountryDashboard, DashboardOptions};
use govnews::sources::resolve_country;

use super::lookup::{print_articles, print_indicators, print_outcome};

pub fn countries(ctx: &AppContext, json: bool) -> Result<()> {
    if json {
        let rows: Vec<_> = ctx.countries().countries().collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<28} {:<36} {:<5} {:<5}", "Turkish", "English", "CCA2", "CCA3");
    println!("{}", "-".repeat(78));
    for country in ctx.countries().countries() {
        println!(
            "{:<28} {:<36} {:<5} {:<5}",
            country.tr, country.en, country.cca2, country.cca3
        );
    }
    println!("\n{} countries", ctx.countries().len());
    Ok(())
}

pub async fn country(ctx: &AppContext, name: &str, summary: bool, json: bool) -> Result<()> {
    let country = resolve_country(ctx, name)?;
    let dashboard =
        CountryDashboard::load_with(ctx, country, DashboardOptions { summary }).await;

    if json {
        let body = serde_json::to_string_pretty(&dashboard).context("Failed to serialize dashboard")?;
        println!("{body}");
        return Ok(());
    }

    println!("{} ({}) - {}", country.tr, country.en, country.cca3);
    println!("================================");

    println!("\n[Indicators]");
    print_indicators(&dashboard.indicators);

    println!("\n[News]");
    print_outcome(&dashboard.news, |articles| print_articles(articles, 5));

    println!("\n[Conflicts]");
    print_outcome(&dashboard.conflicts, |data| {
        println!(
            "  {} events, {} deaths in the returned page",
            data.total_events, data.total_deaths
        );
    });

    println!("\n[Climate]");
    print_outcome(&dashboard.climate, |indicators| {
        for i in indicators {
            println!("  {}: {} {} ({})", i.name, i.value, i.unit, i.year);
        }
    });

    println!("\n[Factbook]");
    print_outcome(&dashboard.factbook, |data| {
        println!("  Capital: {}", data.capital.as_deref().unwrap_or("-"));
        println!("  Population: {}", data.population.as_deref().unwrap_or("-"));
        println!("  Government: {}", data.government_type.as_deref().unwrap_or("-"));
    });

    println!("\n[Humanitarian]");
    print_outcome(&dashboard.humanitarian, |updates| {
        for update in updates.iter().take(5) {
            println!("  - {}", update.title);
        }
    });

    println!("\n[Infrastructure]");
    print_outcome(&dashboard.infrastructure, |data| {
        println!(
            "  Hospitals: {} | Schools: {} | Airports: {}",
            data.hospitals, data.schools, data.airports
        );
    });

    println!("\n[Population]");
    print_outcome(&dashboard.population, |data| {
        println!("  Total: {} ({})", data.total, data.year);
        for group in &data.age_groups {
            println!("  {:>6}  M {:>10}  F {:>10}", group.label, group.male, group.female);
        }
    });

    if let Some(summary) = &dashboard.summary {
        println!("\n[Overview]");
        print_outcome(summary, |text| println!("{text}"));
    }

    let unavailable = dashboard.unavailable_panels();
    if !unavailable.is_empty() {
        println!("\nUnavailable panels: {}", unavailable.join(", "));
    }
    Ok(())
}
