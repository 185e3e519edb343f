//! Subdomain enumeration.
//!
//! Hostnames are collected from certificate-transparency logs (crt.sh) and
//! from the Wayback Machine's URL index, then cleaned, filtered to the
//! target domain and merged into one sorted, de-duplicated set.

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::domain::clean_domain;
use crate::errors::AppError;
use crate::http::{Auth, HttpClient};
use crate::wayback::WaybackClient;

const SERVICE: &str = "crt.sh";

#[derive(Debug, Deserialize)]
struct CertificateEntry {
    #[serde(default)]
    common_name: String,
    /// Subject alternative names, newline separated.
    #[serde(default)]
    name_value: String,
}

/// Where a batch of hostnames came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    CertificateTransparency,
    Wayback,
}

impl std::fmt::Display for HostSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostSource::CertificateTransparency => write!(f, "certificate transparency"),
            HostSource::Wayback => write!(f, "Wayback"),
        }
    }
}

#[derive(Clone)]
pub struct SubdomainScanner {
    http: HttpClient,
    crtsh_url: String,
    wayback: WaybackClient,
}

impl SubdomainScanner {
    /// Creates a new `SubdomainScanner`.
    ///
    /// # Arguments
    ///
    /// * `http` - Client for crt.sh; its retry policy should cover 429 and 5xx.
    /// * `crtsh_url` - crt.sh base URL.
    /// * `wayback` - Archive client whose URL index is mined for hostnames.
    pub fn new(http: HttpClient, crtsh_url: impl Into<String>, wayback: WaybackClient) -> Self {
        Self {
            http,
            crtsh_url: crtsh_url.into().trim_end_matches('/').to_string(),
            wayback,
        }
    }

    /// Hostnames under `domain` named in logged certificates.
    pub async fn certificate_hosts(&self, domain: &str) -> Result<BTreeSet<String>, AppError> {
        let domain = clean_domain(domain).to_lowercase();
        tracing::info!("crt.sh: searching certificates for {}", domain);

        let url = format!("{}/", self.crtsh_url);
        let body = self
            .http
            .get_text(
                SERVICE,
                &url,
                &[("q", format!("%.{}", domain)), ("output", "json".to_string())],
                &Auth::None,
            )
            .await?;
        if body.trim().is_empty() {
            return Ok(BTreeSet::new());
        }

        let entries: Vec<CertificateEntry> = serde_json::from_str(&body)
            .map_err(|e| AppError::ExternalApiError(format!("Failed to parse crt.sh response: {}", e)))?;

        let hosts: BTreeSet<String> = entries
            .iter()
            .flat_map(|entry| entry.name_value.lines().chain(std::iter::once(entry.common_name.as_str())))
            .filter_map(|name| host_within(name, &domain))
            .collect();

        tracing::info!("crt.sh: {} hosts from {} certificates", hosts.len(), entries.len());
        Ok(hosts)
    }

    /// Hostnames under `domain` seen in archived URLs.
    pub async fn archived_hosts(&self, domain: &str) -> Result<BTreeSet<String>, AppError> {
        let domain = clean_domain(domain).to_lowercase();
        let urls = self.wayback.unique_urls(&domain).await?;
        Ok(urls.iter().filter_map(|url| host_within(url, &domain)).collect())
    }

    /// Every known host under `domain`, sorted.
    ///
    /// A failing source is logged and skipped; the call only fails when
    /// every source does.
    pub async fn enumerate(&self, domain: &str) -> Result<BTreeSet<String>, AppError> {
        let mut hosts = BTreeSet::new();
        let mut last_error = None;

        for source in [HostSource::CertificateTransparency, HostSource::Wayback] {
            let found = match source {
                HostSource::CertificateTransparency => self.certificate_hosts(domain).await,
                HostSource::Wayback => self.archived_hosts(domain).await,
            };
            match found {
                Ok(found) => {
                    tracing::info!("{}: {} hosts", source, found.len());
                    hosts.extend(found);
                }
                Err(e) => {
                    tracing::warn!("Subdomain source {} failed: {}", source, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if hosts.is_empty() => Err(e),
            _ => Ok(hosts),
        }
    }
}

/// The lower-cased host of `name` when it is `domain` or one of its
/// subdomains.
///
/// Accepts bare hostnames, wildcard certificate names (`*.example.com`) and
/// URLs with scheme, `www.`, port or path.
pub fn host_within(name: &str, domain: &str) -> Option<String> {
    let name = name.trim().to_lowercase();
    let mut name = name.as_str();
    while let Some(rest) = name.strip_prefix("*.") {
        name = rest;
    }

    let cleaned = clean_domain(name);
    let host = cleaned
        .split(['/', ':', '?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('.');

    let valid = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid {
        return None;
    }

    let domain = domain.trim().trim_end_matches('.');
    if host == domain || host.strip_suffix(domain).is_some_and(|head| head.ends_with('.')) {
        Some(host.to_string())
    } else {
        None
    }
}
