//! Prints OpenCorporates API plan and usage for the configured token.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osint_toolkit::config::Config;
use osint_toolkit::http::HttpClient;
use osint_toolkit::opencorporates::OpenCorporatesClient;
use osint_toolkit::retry::RetryPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osint_toolkit=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let token = config.oc_api_key()?.to_string();

    let http = HttpClient::new(config.http_timeout(), RetryPolicy::none())?;
    let client = OpenCorporatesClient::new(http, &config.oc_base_url, Some(token), "gb");
    let status = client.account_status().await?;

    println!("\nOpenCorporates API Status:");
    println!("{}", "=".repeat(50));
    println!("Plan: {}", status.plan.as_deref().unwrap_or("Unknown"));
    println!("Status: {}", status.status.as_deref().unwrap_or("Unknown"));
    println!("Expiry Date: {}", status.expiry_date.as_deref().unwrap_or("Unknown"));
    println!("\nUsage Today:");
    println!("  Calls Made: {}", status.usage.today);
    println!("  Calls Remaining: {}", status.calls_remaining.today);
    println!("\nUsage This Month:");
    println!("  Calls Made: {}", status.usage.this_month);
    println!("  Calls Remaining: {}", status.calls_remaining.this_month);

    Ok(())
}
