//! Bounded enrichment of search results.
//!
//! Broad searches return many thin hits. Fetching details for each would
//! burn API quota, so a search is only enriched when it came back small.

use std::future::Future;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CompanyRecord, RegistrySource, SearchHit};

/// Per-search-kind enrichment limits and search sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub brand: usize,
    pub address: usize,
    pub director: usize,
    pub search_limit: usize,
    pub officer_search_limit: usize,
    pub top_results: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            brand: 12,
            address: 12,
            director: 20,
            search_limit: 20,
            officer_search_limit: 50,
            top_results: 5,
        }
    }
}

impl Thresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            brand: config.brand_threshold,
            address: config.address_threshold,
            director: config.director_threshold,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentPolicy {
    pub threshold: usize,
}

impl EnrichmentPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn should_enrich(&self, len: usize) -> bool {
        len < self.threshold
    }

    /// Enriches every hit through `enrich` when the result set is under the
    /// threshold, otherwise returns name-only stubs.
    ///
    /// A hit whose enrichment fails or finds nothing is logged and dropped.
    pub async fn accumulate<F, Fut>(
        &self,
        hits: Vec<SearchHit>,
        source: RegistrySource,
        mut enrich: F,
    ) -> Vec<CompanyRecord>
    where
        F: FnMut(SearchHit) -> Fut,
        Fut: Future<Output = Result<Option<CompanyRecord>, AppError>>,
    {
        if !self.should_enrich(hits.len()) {
            tracing::info!(
                "{} results (threshold {}), skipping detail enrichment",
                hits.len(),
                self.threshold
            );
            return hits.into_iter().map(|hit| hit.into_stub(source)).collect();
        }

        let mut records = Vec::with_capacity(hits.len());
        for hit in hits {
            let number = hit.number.clone();
            match enrich(hit).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => tracing::warn!("No details for {}, skipping", number),
                Err(e) => tracing::warn!("Failed to enrich {}: {}", number, e),
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(n: usize) -> Vec<SearchHit> {
        (0..n)
            .map(|i| SearchHit::new(format!("{:08}", i), format!("Company {}", i)))
            .collect()
    }

    async fn enrich_ok(hit: SearchHit) -> Result<Option<CompanyRecord>, AppError> {
        let mut record = hit.into_stub(RegistrySource::CompaniesHouse);
        record.address = "1 High St".to_string();
        Ok(Some(record))
    }

    #[tokio::test]
    async fn test_below_threshold_enriches() {
        let policy = EnrichmentPolicy::new(12);
        let records = policy
            .accumulate(hits(11), RegistrySource::CompaniesHouse, enrich_ok)
            .await;

        assert_eq!(records.len(), 11);
        assert!(records.iter().all(|r| !r.is_stub()));
    }

    #[tokio::test]
    async fn test_at_and_above_threshold_returns_stubs() {
        let policy = EnrichmentPolicy::new(12);
        for n in [12, 13] {
            let records = policy
                .accumulate(hits(n), RegistrySource::CompaniesHouse, enrich_ok)
                .await;
            assert_eq!(records.len(), n);
            assert!(records.iter().all(CompanyRecord::is_stub));
            assert_eq!(records[0].name, "Company 0");
        }
    }

    #[tokio::test]
    async fn test_failed_enrichment_is_skipped() {
        let policy = EnrichmentPolicy::new(5);
        let records = policy
            .accumulate(hits(3), RegistrySource::OpenCorporates, |hit| async move {
                match hit.number.as_str() {
                    "00000000" => Err(AppError::TransientError("timeout".to_string())),
                    "00000001" => Ok(None),
                    _ => enrich_ok(hit).await,
                }
            })
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, "00000002");
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = Config {
            brand_threshold: 3,
            director_threshold: 7,
            ..Config::default()
        };
        let thresholds = Thresholds::from_config(&config);

        assert_eq!(thresholds.brand, 3);
        assert_eq!(thresholds.address, 12);
        assert_eq!(thresholds.director, 7);
        assert_eq!(thresholds.top_results, 5);
    }
}
