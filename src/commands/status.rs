use anyhow::Result;

use govnews::context::AppContext;
use govnews::dashboard::{CountryDashboard, DashboardOptions};
use govnews::metrics;
use govnews::monitor::ApiKey;
use govnews::sources::resolve_country;

pub async fn status(ctx: &AppContext, country: &str) -> Result<()> {
    let country = resolve_country(ctx, country)?;
    println!("Probing sources with {}...", country.en);

    let summary = ctx.config().gemini.api_key.is_some();
    CountryDashboard::load_with(ctx, country, DashboardOptions { summary }).await;

    println!("\nService status");
    println!("================================");
    println!(
        "{:<12} {:<12} {:>8} {:>10} {:>6}",
        "Service", "Status", "Success", "Avg (ms)", "Calls"
    );
    for status in ctx.call_log().service_statuses() {
        println!(
            "{:<12} {:<12} {:>7.0}% {:>10} {:>6}",
            status.service,
            status.status.as_str(),
            status.success_rate * 100.0,
            status.average_response_ms,
            status.total_calls
        );
    }

    println!("\nCredentials");
    println!("================================");
    for key in ApiKey::from_config(ctx.config()) {
        println!(
            "{:<20} {:<8} {}",
            key.name,
            key.service,
            key.masked_value.as_deref().unwrap_or("not configured")
        );
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        match metrics::encode_metrics() {
            Ok(text) => tracing::debug!(metrics = %text, "Metrics snapshot"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }
    Ok(())
}
