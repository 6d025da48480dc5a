use anyhow::Result;

use govnews::context::AppContext;
use govnews::sources::gdelt::{self, GdeltArticle};
use govnews::sources::worldbank::{self, WorldBankIndicator};
use govnews::sources::{factbook, resolve_country, ucdp, SourceOutcome};

pub(crate) fn print_outcome<T>(outcome: &SourceOutcome<T>, print: impl FnOnce(&T)) {
    match outcome {
        SourceOutcome::Available(data) => print(data),
        SourceOutcome::Unavailable { message } => println!("  ! {message}"),
    }
}

pub(crate) fn print_indicators(indicators: &[WorldBankIndicator]) {
    for indicator in indicators {
        match (indicator.value(), indicator.year()) {
            (Some(value), Some(year)) => {
                println!("  {:<48} {:>20.2} ({year})", indicator.indicator_name, value)
            }
            _ => println!(
                "  {:<48} {}",
                indicator.indicator_name,
                indicator.message().unwrap_or("-")
            ),
        }
    }
}

pub(crate) fn print_articles(articles: &[GdeltArticle], limit: usize) {
    if articles.is_empty() {
        println!("  No articles found");
        return;
    }
    for (i, article) in articles.iter().take(limit).enumerate() {
        println!("  {}. {}", i + 1, article.title);
        println!("     {} | {}", article.domain, article.url);
    }
}

pub async fn worldbank(ctx: &AppContext, name: &str) -> Result<()> {
    let country = resolve_country(ctx, name)?;
    println!("World Bank indicators: {}", country.en);
    println!("================================");
    print_indicators(&worldbank::fetch_indicators(ctx, &country.cca3).await);
    Ok(())
}

pub async fn news(ctx: &AppContext, name: &str) -> Result<()> {
    let country = resolve_country(ctx, name)?;
    println!("News: {}", country.en);
    println!("================================");
    print_outcome(&gdelt::fetch_articles(ctx, country).await, |articles| {
        print_articles(articles, gdelt::MAX_RECORDS)
    });
    Ok(())
}

pub async fn conflicts(ctx: &AppContext, name: &str, limit: usize) -> Result<()> {
    let country = resolve_country(ctx, name)?;
    println!("Conflict events: {}", country.en);
    println!("================================");
    print_outcome(&ucdp::fetch_events(ctx, country).await, |data| {
        println!("  {} events, {} deaths\n", data.total_events, data.total_deaths);
        for event in data.events.iter().take(limit) {
            let date = event
                .date
                .map(|d| d.to_string())
                .unwrap_or_else(|| event.year.to_string());
            println!(
                "  {date}  {:<12} {} vs {} ({} deaths)",
                event.violence.as_str(),
                event.side_a,
                event.side_b,
                event.deaths
            );
        }
    });
    Ok(())
}

pub async fn factbook(ctx: &AppContext, name: &str) -> Result<()> {
    let country = resolve_country(ctx, name)?;
    println!("Factbook: {}", country.en);
    println!("================================");
    print_outcome(&factbook::fetch_profile(ctx, country).await, |data| {
        let fields = [
            ("Capital", &data.capital),
            ("Population", &data.population),
            ("Area", &data.area),
            ("Government type", &data.government_type),
            ("Languages", &data.languages),
            ("GDP", &data.gdp),
        ];
        for (label, value) in fields {
            println!("  {label:<16} {}", value.as_deref().unwrap_or("-"));
        }
        println!("\n  Source: {}", data.url);
    });
    Ok(())
}
