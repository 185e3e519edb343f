use std::io::{self, BufRead, Write};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osint_toolkit::aleph::AlephClient;
use osint_toolkit::companies_house::CompaniesHouseClient;
use osint_toolkit::config::Config;
use osint_toolkit::fallback::FallbackRegistry;
use osint_toolkit::http::HttpClient;
use osint_toolkit::models::{CompanyRecord, NetworkReport};
use osint_toolkit::network::NetworkAnalyzer;
use osint_toolkit::opencorporates::OpenCorporatesClient;
use osint_toolkit::output::save_report;
use osint_toolkit::overlap::OverlapScorer;
use osint_toolkit::pagination::Thresholds;
use osint_toolkit::registry::CompanyRegistry;
use osint_toolkit::retry::RetryPolicy;
use osint_toolkit::subdomains::SubdomainScanner;
use osint_toolkit::wayback::WaybackClient;

type Registry = FallbackRegistry<CompaniesHouseClient, OpenCorporatesClient>;

const MENU: &str = r#"
OSINT Toolkit
=============
1) Company network analysis
2) Company search (Companies House, OpenCorporates fallback)
3) Aleph entity search
4) Wayback URL history
5) Earliest Wayback snapshot
6) Officer search (OpenCorporates)
7) Subdomain enumeration
q) Quit"#;

struct Toolkit {
    config: Config,
    analyzer: NetworkAnalyzer<Registry>,
    aleph: Option<AlephClient>,
    wayback: WaybackClient,
    subdomains: SubdomainScanner,
}

/// Main entry point for the interactive toolkit.
///
/// Fails with a non-zero exit code when `CH_API_KEY` is missing.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osint_toolkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let ch_api_key = config.ch_api_key()?.to_string();

    let registry_http = HttpClient::new(config.http_timeout(), RetryPolicy::registry())?;
    let archive_http = HttpClient::new(config.http_timeout(), RetryPolicy::archive())?;

    let companies_house = CompaniesHouseClient::new(registry_http.clone(), &config.ch_base_url, ch_api_key);
    let opencorporates = OpenCorporatesClient::new(
        registry_http.clone(),
        &config.oc_base_url,
        config.oc_api_key.clone(),
        "gb",
    );
    let registry = FallbackRegistry::new(companies_house.clone(), opencorporates, config.fallback_cooldown());
    let analyzer = NetworkAnalyzer::new(
        registry,
        companies_house,
        OverlapScorer::new(config.priority_threshold),
        Thresholds::from_config(&config),
    );

    let aleph = match config.aleph_api_key() {
        Ok(key) => Some(AlephClient::new(registry_http, &config.aleph_base_url, key)),
        Err(_) => {
            tracing::info!("ALEPH_API_KEY not set, Aleph search disabled");
            None
        }
    };
    let wayback = WaybackClient::new(archive_http.clone(), &config.wayback_cdx_url);
    let subdomains = SubdomainScanner::new(archive_http, &config.crtsh_url, wayback.clone());

    let toolkit = Toolkit {
        config,
        analyzer,
        aleph,
        wayback,
        subdomains,
    };

    loop {
        println!("{}", MENU);
        let Some(choice) = prompt("Select an option: ")? else {
            break;
        };
        let result = match choice.as_str() {
            "1" => toolkit.network_analysis().await,
            "2" => toolkit.company_search().await,
            "3" => toolkit.aleph_search().await,
            "4" => toolkit.url_history().await,
            "5" => toolkit.earliest_snapshot().await,
            "6" => toolkit.officer_search().await,
            "7" => toolkit.subdomain_enumeration().await,
            "q" | "Q" | "quit" | "exit" => break,
            "" => continue,
            other => {
                println!("Unknown option '{}'", other);
                continue;
            }
        };
        if let Err(e) = result {
            tracing::error!("{:#}", e);
            println!("Error: {:#}", e);
        }
    }

    Ok(())
}

impl Toolkit {
    async fn network_analysis(&self) -> anyhow::Result<()> {
        let Some(name) = prompt_required("Company name to analyze: ")? else {
            return Ok(());
        };
        let brand = prompt("Brand keyword (blank to derive from name, 'none' to skip): ")?
            .filter(|b| !b.is_empty());

        let Some(report) = self.analyzer.analyze(&name, brand.as_deref()).await? else {
            println!("No results for '{}'", name);
            return Ok(());
        };
        print_report(&report);

        if prompt("Save report? [y/N]: ")?.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
            let path = save_report(&self.config.output_dir, &report.target.name, &report).await?;
            println!("Saved to {}", path.display());
        }
        Ok(())
    }

    async fn company_search(&self) -> anyhow::Result<()> {
        let Some(name) = prompt_required("Company name: ")? else {
            return Ok(());
        };
        let registry = self.analyzer.registry();
        let records = registry.search_records(&name, 10).await?;

        if records.is_empty() {
            println!("No companies found for '{}'", name);
        }
        for record in &records {
            print_company(record);
        }
        if !registry.primary_available() {
            println!("(Companies House unavailable, results served by OpenCorporates)");
        }
        Ok(())
    }

    async fn aleph_search(&self) -> anyhow::Result<()> {
        let Some(aleph) = &self.aleph else {
            println!("Set ALEPH_API_KEY to enable Aleph search");
            return Ok(());
        };
        let Some(query) = prompt_required("Search Aleph for: ")? else {
            return Ok(());
        };
        let schema = prompt("Schema filter (blank for Company): ")?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Company".to_string());

        let entities = aleph.search_entities(&query, Some(&schema)).await?;
        if entities.is_empty() {
            println!("No entities found for '{}'", query);
        }
        for entity in &entities {
            println!("- {} [{}] id={}", entity.name(), entity.schema, entity.id);
            for prop in ["jurisdiction", "registrationNumber", "incorporationDate", "address"] {
                if let Some(value) = entity.first(prop) {
                    println!("    {}: {}", prop, value);
                }
            }
        }
        Ok(())
    }

    async fn url_history(&self) -> anyhow::Result<()> {
        let Some(domain) = prompt_required("Domain (e.g. example.com): ")? else {
            return Ok(());
        };
        println!("Fetching URLs for {} (large archives take a while)...", domain);

        let history = self.wayback.url_history(&domain).await?;
        if history.is_empty() {
            println!("No results found or domain not archived.");
            return Ok(());
        }
        for (url, dates) in &history {
            let dates: Vec<String> = dates.iter().map(|d| d.format("%-d %b %Y").to_string()).collect();
            println!("{}\n    {}", url, dates.join(", "));
        }
        println!("\n{} unique URLs", history.len());
        Ok(())
    }

    async fn earliest_snapshot(&self) -> anyhow::Result<()> {
        let Some(url) = prompt_required("URL: ")? else {
            return Ok(());
        };
        match self.wayback.earliest_snapshot(&url).await? {
            Some(snapshot) => {
                println!("Earliest capture: {}", snapshot.date.format("%-d %b %Y"));
                println!("{}", snapshot.archive_url());
            }
            None => println!("No archived captures for {}", url),
        }
        Ok(())
    }

    async fn officer_search(&self) -> anyhow::Result<()> {
        let Some(name) = prompt_required("Officer name: ")? else {
            return Ok(());
        };
        let jurisdiction = prompt("Jurisdiction code (blank for all): ")?.filter(|j| !j.is_empty());

        let officers = self
            .analyzer
            .registry()
            .fallback()
            .search_officers(&name, jurisdiction.as_deref())
            .await?;
        if officers.is_empty() {
            println!("No officers found for '{}'", name);
        }
        for officer in &officers {
            let position = officer.position.as_deref().unwrap_or("officer");
            match &officer.company {
                Some(company) => println!(
                    "- {} ({}) at {} [{}/{}]",
                    officer.name, position, company.name, company.jurisdiction_code, company.company_number
                ),
                None => println!("- {} ({})", officer.name, position),
            }
            if let Some(start) = &officer.start_date {
                let end = officer.end_date.as_deref().unwrap_or("present");
                println!("    {} to {}", start, end);
            }
        }
        Ok(())
    }

    async fn subdomain_enumeration(&self) -> anyhow::Result<()> {
        let Some(domain) = prompt_required("Domain (e.g. example.com): ")? else {
            return Ok(());
        };

        let hosts = self.subdomains.enumerate(&domain).await?;
        for host in &hosts {
            println!("{}", host);
        }
        println!("\n{} hosts", hosts.len());
        Ok(())
    }
}

/// Reads one trimmed line; `None` on end of input.
fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt_required(label: &str) -> io::Result<Option<String>> {
    let answer = prompt(label)?.filter(|s| !s.is_empty());
    if answer.is_none() {
        println!("Nothing entered.");
    }
    Ok(answer)
}

fn print_company(record: &CompanyRecord) {
    println!("- {} ({}) [{}]", record.name, record.number, record.source);
    if !record.address.is_empty() {
        println!("    address: {}", record.address);
    }
    if let Some(status) = &record.status {
        println!("    status: {}", status);
    }
    if let Some(date) = &record.incorporation_date {
        println!("    incorporated: {}", date);
    }
    if !record.directors.is_empty() {
        println!("    directors: {}", record.directors.join("; "));
    }
}

fn print_report(report: &NetworkReport) {
    println!("\nTarget");
    println!("======");
    print_company(&report.target);
    println!("Brand: {}", report.brand.as_deref().unwrap_or("none"));

    if !report.beneficial_owners.is_empty() {
        println!("\nBeneficial owners");
        println!("=================");
        for owner in &report.beneficial_owners {
            println!(
                "- {} ({}) {}",
                owner.name,
                owner.kind,
                owner.percentage.as_deref().unwrap_or("")
            );
            let control = owner.control_summary();
            if !control.is_empty() {
                println!("    {}", control);
            }
        }
    }

    println!("\nRelated companies");
    println!("=================");
    if report.candidates.is_empty() {
        println!("None found.");
    }
    for candidate in &report.candidates {
        let flag = if candidate.priority { " [PRIORITY]" } else { "" };
        println!(
            "- {} ({}) via {}: overlap={}{}",
            candidate.company.name, candidate.company.number, candidate.origin, candidate.score, flag
        );
        if !candidate.company.address.is_empty() {
            println!("    address: {}", candidate.company.address);
        }
        if !candidate.company.directors.is_empty() {
            println!("    directors: {}", candidate.company.directors.join("; "));
        }
    }
    println!(
        "\n{} candidates, {} priority",
        report.candidates.len(),
        report.priority_candidates().count()
    );
}
