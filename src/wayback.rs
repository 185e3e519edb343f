use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{clean_domain, url_key};
use crate::errors::AppError;
use crate::http::{Auth, HttpClient};

const SERVICE: &str = "Wayback";

/// Archived URLs of a domain, each with the distinct days it was captured.
pub type UrlHistory = BTreeMap<String, Vec<NaiveDate>>;

/// A single capture in the archive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Snapshot {
    pub original: String,
    /// 14-digit `YYYYmmddHHMMSS` capture timestamp.
    pub timestamp: String,
    pub date: NaiveDate,
}

impl Snapshot {
    pub fn archive_url(&self) -> String {
        format!("https://web.archive.org/web/{}/{}", self.timestamp, self.original)
    }
}

/// Client for the Wayback Machine CDX server.
#[derive(Clone)]
pub struct WaybackClient {
    http: HttpClient,
    cdx_url: String,
}

impl WaybackClient {
    pub fn new(http: HttpClient, cdx_url: impl Into<String>) -> Self {
        Self {
            http,
            cdx_url: cdx_url.into(),
        }
    }

    /// CDX rows with the header row removed. The server answers an empty
    /// body or a lone header when nothing is archived.
    async fn rows(&self, params: &[(&str, String)]) -> Result<Vec<Vec<String>>, AppError> {
        let body = self
            .http
            .get_text(SERVICE, &self.cdx_url, params, &Auth::None)
            .await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<Vec<String>> = serde_json::from_str(&body)
            .map_err(|e| AppError::ExternalApiError(format!("Failed to parse CDX response: {}", e)))?;
        Ok(rows.into_iter().skip(1).collect())
    }

    /// Every archived URL under `domain` with its sorted capture days.
    pub async fn url_history(&self, domain: &str) -> Result<UrlHistory, AppError> {
        let domain = clean_domain(domain);
        tracing::info!("Wayback: fetching URL history for {}", domain);

        let rows = self
            .rows(&[
                ("url", domain.clone()),
                ("matchType", "domain".to_string()),
                ("output", "json".to_string()),
                ("fl", "original,timestamp".to_string()),
                ("collapse", "timestamp:8".to_string()),
            ])
            .await?;

        let mut days: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();
        for row in &rows {
            let [original, timestamp, ..] = row.as_slice() else {
                continue;
            };
            let (Some(key), Some(date)) = (url_key(original), capture_date(timestamp)) else {
                tracing::debug!("Wayback: skipping unparseable row {:?}", row);
                continue;
            };
            days.entry(key).or_default().insert(date);
        }

        tracing::info!("Wayback: {} unique URLs for {} ({} captures)", days.len(), domain, rows.len());
        Ok(days
            .into_iter()
            .map(|(url, dates)| (url, dates.into_iter().collect()))
            .collect())
    }

    pub async fn unique_urls(&self, domain: &str) -> Result<BTreeSet<String>, AppError> {
        let domain = clean_domain(domain);
        tracing::info!("Wayback: listing unique URLs for {}", domain);

        let rows = self
            .rows(&[
                ("url", domain),
                ("matchType", "domain".to_string()),
                ("output", "json".to_string()),
                ("fl", "original".to_string()),
                ("collapse", "timestamp:8".to_string()),
                ("limit", "100000".to_string()),
            ])
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.first())
            .filter_map(|original| url_key(original))
            .collect())
    }

    /// Oldest successful capture of `url`, if it was ever archived.
    pub async fn earliest_snapshot(&self, url: &str) -> Result<Option<Snapshot>, AppError> {
        let target = clean_domain(url);
        tracing::info!("Wayback: looking up earliest snapshot of {}", target);

        let rows = self
            .rows(&[
                ("url", target),
                ("output", "json".to_string()),
                ("fl", "original,timestamp".to_string()),
                ("limit", "1".to_string()),
                ("filter", "statuscode:200".to_string()),
                ("sort", "oldest".to_string()),
            ])
            .await?;

        Ok(rows.into_iter().find_map(|row| {
            let [original, timestamp, ..] = row.as_slice() else {
                return None;
            };
            Some(Snapshot {
                date: capture_date(timestamp)?,
                original: original.clone(),
                timestamp: timestamp.clone(),
            })
        }))
    }
}

/// Day of a capture from the first eight digits of its timestamp.
pub fn capture_date(timestamp: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(timestamp.get(..8)?, "%Y%m%d").ok()
}
