//! Lists every archived URL of a domain with its capture days.

use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osint_toolkit::config::Config;
use osint_toolkit::http::HttpClient;
use osint_toolkit::retry::RetryPolicy;
use osint_toolkit::wayback::WaybackClient;

#[derive(Parser, Debug)]
#[command(name = "wayback_list")]
#[command(version, about = "List archived URLs of a domain from the Wayback Machine", long_about = None)]
struct Cli {
    /// Print unique URLs only, without capture days
    #[arg(long)]
    urls_only: bool,

    /// Domain to look up (prompted for when omitted)
    domain: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osint_toolkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let domain = match cli.domain {
        Some(domain) => domain,
        None => {
            print!("Enter domain (e.g., example.com): ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim().to_string()
        }
    };
    if domain.is_empty() {
        anyhow::bail!("No domain provided");
    }

    let http = HttpClient::new(config.http_timeout(), RetryPolicy::archive())?;
    let wayback = WaybackClient::new(http, &config.wayback_cdx_url);

    if cli.urls_only {
        let urls = wayback.unique_urls(&domain).await?;
        for url in &urls {
            println!("{}", url);
        }
        println!("\nTotal unique URLs: {}", urls.len());
        return Ok(());
    }

    let history = wayback.url_history(&domain).await?;
    if history.is_empty() {
        println!("No results found or domain not archived.");
        return Ok(());
    }

    println!("\nResults:");
    println!("=========");
    for (url, dates) in &history {
        let dates: Vec<String> = dates.iter().map(|d| d.format("%-d %b %Y").to_string()).collect();
        println!("\n{}", url);
        println!("  {}", dates.join(", "));
    }
    println!("\nTotal unique URLs: {}", history.len());

    Ok(())
}
