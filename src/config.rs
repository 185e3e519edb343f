use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

pub const DEFAULT_CH_BASE_URL: &str = "https://api.company-information.service.gov.uk";
pub const DEFAULT_OC_BASE_URL: &str = "https://api.opencorporates.com/v0.4";
pub const DEFAULT_ALEPH_BASE_URL: &str = "https://aleph.occrp.org/api/2";
pub const DEFAULT_WAYBACK_CDX_URL: &str = "https://web.archive.org/cdx/search/cdx";
pub const DEFAULT_CRTSH_URL: &str = "https://crt.sh";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ch_api_key: Option<String>,
    pub oc_api_key: Option<String>,
    pub aleph_api_key: Option<String>,
    pub ch_base_url: String,
    pub oc_base_url: String,
    pub aleph_base_url: String,
    pub wayback_cdx_url: String,
    pub crtsh_url: String,
    pub fallback_cooldown_secs: u64,
    pub priority_threshold: u32,
    pub brand_threshold: usize,
    pub address_threshold: usize,
    pub director_threshold: usize,
    pub http_timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ch_api_key: None,
            oc_api_key: None,
            aleph_api_key: None,
            ch_base_url: DEFAULT_CH_BASE_URL.to_string(),
            oc_base_url: DEFAULT_OC_BASE_URL.to_string(),
            aleph_base_url: DEFAULT_ALEPH_BASE_URL.to_string(),
            wayback_cdx_url: DEFAULT_WAYBACK_CDX_URL.to_string(),
            crtsh_url: DEFAULT_CRTSH_URL.to_string(),
            fallback_cooldown_secs: 60,
            priority_threshold: 2,
            brand_threshold: 12,
            address_threshold: 12,
            director_threshold: 20,
            http_timeout_secs: 30,
            output_dir: PathBuf::from("company_data"),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            ch_api_key: optional_secret("CH_API_KEY"),
            oc_api_key: optional_secret("OPENCORPORATES_API_KEY"),
            aleph_api_key: optional_secret("ALEPH_API_KEY"),
            ch_base_url: base_url("CH_BASE_URL", &defaults.ch_base_url)?,
            oc_base_url: base_url("OC_BASE_URL", &defaults.oc_base_url)?,
            aleph_base_url: base_url("ALEPH_BASE_URL", &defaults.aleph_base_url)?,
            wayback_cdx_url: base_url("WAYBACK_CDX_URL", &defaults.wayback_cdx_url)?,
            crtsh_url: base_url("CRTSH_URL", &defaults.crtsh_url)?,
            fallback_cooldown_secs: number(
                "FALLBACK_COOLDOWN_SECS",
                defaults.fallback_cooldown_secs,
            )?,
            priority_threshold: number("PRIORITY_THRESHOLD", defaults.priority_threshold)?,
            brand_threshold: number("BRAND_THRESHOLD", defaults.brand_threshold)?,
            address_threshold: number("ADDRESS_THRESHOLD", defaults.address_threshold)?,
            director_threshold: number("DIRECTOR_THRESHOLD", defaults.director_threshold)?,
            http_timeout_secs: number("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            output_dir: std::env::var("OUTPUT_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Companies House URL: {}", config.ch_base_url);
        tracing::debug!("OpenCorporates URL: {}", config.oc_base_url);
        tracing::debug!("Aleph URL: {}", config.aleph_base_url);
        tracing::debug!("Wayback CDX URL: {}", config.wayback_cdx_url);
        tracing::debug!("crt.sh URL: {}", config.crtsh_url);
        tracing::debug!(
            "Fallback cooldown: {}s, priority threshold: {}",
            config.fallback_cooldown_secs,
            config.priority_threshold
        );
        if config.oc_api_key.is_none() {
            tracing::warn!("OPENCORPORATES_API_KEY not set; fallback lookups may be refused");
        }

        Ok(config)
    }

    /// Companies House key, required by every registry tool.
    pub fn ch_api_key(&self) -> Result<&str, AppError> {
        self.ch_api_key
            .as_deref()
            .ok_or_else(|| AppError::ConfigError("CH_API_KEY environment variable required".to_string()))
    }

    pub fn aleph_api_key(&self) -> Result<&str, AppError> {
        self.aleph_api_key
            .as_deref()
            .ok_or_else(|| AppError::ConfigError("ALEPH_API_KEY environment variable required".to_string()))
    }

    pub fn oc_api_key(&self) -> Result<&str, AppError> {
        self.oc_api_key.as_deref().ok_or_else(|| {
            AppError::ConfigError("OPENCORPORATES_API_KEY environment variable required".to_string())
        })
    }

    pub fn fallback_cooldown(&self) -> Duration {
        Duration::from_secs(self.fallback_cooldown_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn optional_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn base_url(name: &str, default: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(url) => {
            if url.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
            Ok(url.trim_end_matches('/').to_string())
        }
        Err(_) => Ok(default.to_string()),
    }
}

fn number<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid non-negative number", name)),
        Err(_) => Ok(default),
    }
}
