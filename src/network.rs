//! Company network analysis.
//!
//! Starting from a company name, finds related companies through three
//! channels (shared brand keyword, shared registered address, shared
//! directors) and scores each against the target:
//!
//! 1. Search the top results and resolve the target company.
//! 2. Brand search, address search and per-director officer searches, each
//!    enriched only when the result set is small.
//! 3. Merge, de-duplicate and score every candidate.

use chrono::Utc;
use moka::future::Cache;
use std::collections::HashSet;

use crate::companies_house::CompaniesHouseClient;
use crate::errors::{AppError, ResultExt};
use crate::models::{CandidateOrigin, CompanyRecord, NetworkReport, ScoredCandidate, SearchHit};
use crate::overlap::{is_active_brand, OverlapScorer};
use crate::pagination::{EnrichmentPolicy, Thresholds};
use crate::registry::CompanyRegistry;

const COMPANY_SUFFIXES: [&str; 4] = ["limited", "ltd", "plc", "llp"];
const CACHE_CAPACITY: u64 = 1_000;

pub struct NetworkAnalyzer<R> {
    registry: R,
    companies_house: CompaniesHouseClient,
    scorer: OverlapScorer,
    thresholds: Thresholds,
}

impl<R> NetworkAnalyzer<R>
where
    R: CompanyRegistry + Sync,
{
    /// Creates a new `NetworkAnalyzer`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Company search and details, usually Companies House
    ///   behind an OpenCorporates fallback.
    /// * `companies_house` - Officer search and beneficial ownership, which
    ///   only Companies House provides.
    pub fn new(
        registry: R,
        companies_house: CompaniesHouseClient,
        scorer: OverlapScorer,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            registry,
            companies_house,
            scorer,
            thresholds,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Runs a full analysis for `query`.
    ///
    /// `brand` overrides the keyword derived from the target's name; pass
    /// `Some("none")` to skip the brand search. Returns `Ok(None)` when the
    /// initial search finds nothing usable.
    pub async fn analyze(&self, query: &str, brand: Option<&str>) -> Result<Option<NetworkReport>, AppError> {
        let cache: Cache<String, CompanyRecord> = Cache::builder().max_capacity(CACHE_CAPACITY).build();

        tracing::info!("Searching top {} results for '{}'", self.thresholds.top_results, query);
        let hits = self
            .registry
            .search(query, self.thresholds.top_results)
            .await
            .context("initial company search")?;

        let mut top = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.details(&cache, hit.number.clone()).await {
                Ok(Some(record)) => top.push(record),
                Ok(None) => tracing::warn!("No details for {} ({}), skipping", hit.title, hit.number),
                Err(e) => tracing::warn!("Failed to fetch details for {}: {}", hit.number, e),
            }
        }

        let Some(target) = pick_target(top, query) else {
            tracing::warn!("No usable results for '{}'", query);
            return Ok(None);
        };
        tracing::info!(
            "Target: {} ({}), {} directors, address '{}'",
            target.name,
            target.number,
            target.directors.len(),
            target.address
        );

        let brand = match brand {
            Some(keyword) => Some(keyword.trim().to_string()).filter(|k| is_active_brand(k)),
            None => derive_brand(&target.name),
        };

        let mut combined: Vec<(CandidateOrigin, CompanyRecord)> = Vec::new();

        if let Some(ref keyword) = brand {
            tracing::info!("Brand search for '{}'", keyword);
            let found = self
                .search_and_enrich(&cache, keyword, EnrichmentPolicy::new(self.thresholds.brand))
                .await?;
            combined.extend(found.into_iter().map(|c| (CandidateOrigin::Brand, c)));
        } else {
            tracing::info!("No brand keyword, skipping brand search");
        }

        let address = target.address.trim();
        if !address.is_empty() {
            tracing::info!("Address search for '{}'", address);
            let found = self
                .search_and_enrich(&cache, address, EnrichmentPolicy::new(self.thresholds.address))
                .await?;
            combined.extend(found.into_iter().map(|c| (CandidateOrigin::Address, c)));
        }

        let director_policy = EnrichmentPolicy::new(self.thresholds.director);
        for director in &target.directors {
            for variant in director_variants(director) {
                match self.director_companies(&cache, &variant, director_policy).await {
                    Ok(found) => combined.extend(found.into_iter().map(|c| (CandidateOrigin::Director, c))),
                    Err(e) => tracing::warn!("Director search for '{}' failed: {}", variant, e),
                }
            }
        }

        let candidates = self.score_candidates(&target, brand.as_deref(), combined);
        tracing::info!(
            "{} candidates, {} priority",
            candidates.len(),
            candidates.iter().filter(|c| c.priority).count()
        );

        let beneficial_owners = match self.companies_house.persons_with_significant_control(&target.number).await {
            Ok(owners) => owners,
            Err(e) => {
                tracing::warn!("Beneficial ownership lookup for {} failed: {}", target.number, e);
                Vec::new()
            }
        };

        Ok(Some(NetworkReport {
            query: query.to_string(),
            target,
            brand,
            beneficial_owners,
            candidates,
            generated_at: Utc::now(),
        }))
    }

    async fn details(
        &self,
        cache: &Cache<String, CompanyRecord>,
        number: String,
    ) -> Result<Option<CompanyRecord>, AppError> {
        let key = number.trim().to_uppercase();
        if let Some(record) = cache.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(Some(record));
        }

        let found = self.registry.get_details(&number).await?;
        if let Some(ref record) = found {
            cache.insert(key, record.clone()).await;
        }
        Ok(found)
    }

    async fn search_and_enrich(
        &self,
        cache: &Cache<String, CompanyRecord>,
        query: &str,
        policy: EnrichmentPolicy,
    ) -> Result<Vec<CompanyRecord>, AppError> {
        let (source, hits) = self
            .registry
            .search_routed(query, self.thresholds.search_limit)
            .await
            .with_context(|| format!("searching '{}'", query))?;
        tracing::info!("'{}' returned {} results", query, hits.len());
        Ok(policy
            .accumulate(hits, source, |hit| self.details(cache, hit.number))
            .await)
    }

    async fn director_companies(
        &self,
        cache: &Cache<String, CompanyRecord>,
        name: &str,
        policy: EnrichmentPolicy,
    ) -> Result<Vec<CompanyRecord>, AppError> {
        let numbers = self
            .companies_house
            .search_officer_companies(name, self.thresholds.officer_search_limit)
            .await
            .with_context(|| format!("officer search for '{}'", name))?;
        let hits = numbers.into_iter().map(|n| SearchHit::new(n, "")).collect();
        Ok(policy
            .accumulate(hits, self.companies_house.source(), |hit| self.details(cache, hit.number))
            .await)
    }

    fn score_candidates(
        &self,
        target: &CompanyRecord,
        brand: Option<&str>,
        combined: Vec<(CandidateOrigin, CompanyRecord)>,
    ) -> Vec<ScoredCandidate> {
        let mut candidates: Vec<ScoredCandidate> = dedupe(target, combined)
            .into_iter()
            .map(|(origin, company)| {
                let score = self.scorer.score(&company, target, brand);
                ScoredCandidate {
                    origin,
                    priority: self.scorer.is_priority(score),
                    company,
                    score,
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }
}

/// Exact name match ignoring case and company suffixes, else the first result.
pub fn pick_target(mut companies: Vec<CompanyRecord>, query: &str) -> Option<CompanyRecord> {
    let wanted = comparable_name(query);
    let index = companies
        .iter()
        .position(|c| comparable_name(&c.name) == wanted)
        .unwrap_or(0);
    if index < companies.len() {
        Some(companies.swap_remove(index))
    } else {
        None
    }
}

fn comparable_name(name: &str) -> String {
    let mut words: Vec<String> = name
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    while words.len() > 1 && words.last().is_some_and(|w| COMPANY_SUFFIXES.contains(&w.as_str())) {
        words.pop();
    }
    words.join(" ")
}

/// First significant word of a company name, skipping a leading "the".
pub fn derive_brand(name: &str) -> Option<String> {
    name.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|w| !w.is_empty() && !w.eq_ignore_ascii_case("the"))
        .filter(|w| !COMPANY_SUFFIXES.contains(&w.to_lowercase().as_str()))
        .map(str::to_string)
        .filter(|w| is_active_brand(w))
}

/// The name as given, plus "First Surname" for a "Surname, First" listing.
pub fn director_variants(name: &str) -> Vec<String> {
    let name = name.trim();
    let mut variants = vec![name.to_string()];
    if let Some((surname, rest)) = name.split_once(',') {
        let (surname, rest) = (surname.trim(), rest.trim());
        if !surname.is_empty() && !rest.is_empty() {
            variants.push(format!("{} {}", rest, surname));
        }
    }
    variants
}

/// Drops repeats of (number, name) and the target itself; first origin wins.
pub fn dedupe(
    target: &CompanyRecord,
    combined: Vec<(CandidateOrigin, CompanyRecord)>,
) -> Vec<(CandidateOrigin, CompanyRecord)> {
    let mut seen = HashSet::new();

    combined
        .into_iter()
        .filter(|(_, company)| {
            !company.same_company(target)
                && seen.insert((company.number_key(), company.name.trim().to_lowercase()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistrySource;

    fn stub(name: &str, number: &str) -> CompanyRecord {
        CompanyRecord::stub(name, number, RegistrySource::CompaniesHouse)
    }

    #[test]
    fn test_pick_target_prefers_exact_match() {
        let companies = vec![stub("ACME HOLDINGS LIMITED", "1"), stub("ACME LTD", "2"), stub("ACME", "3")];
        assert_eq!(pick_target(companies.clone(), "acme limited").unwrap().number, "2");
        assert_eq!(pick_target(companies, "Something Else").unwrap().number, "1");
        assert!(pick_target(Vec::new(), "acme").is_none());
    }

    #[test]
    fn test_derive_brand() {
        assert_eq!(derive_brand("THE SASTRE GROUP LTD").as_deref(), Some("SASTRE"));
        assert_eq!(derive_brand("Acme, Trading Ltd").as_deref(), Some("Acme"));
        assert_eq!(derive_brand("None Ltd"), None);
        assert_eq!(derive_brand("Limited"), None);
        assert_eq!(derive_brand("   "), None);
    }

    #[test]
    fn test_director_variants() {
        assert_eq!(director_variants("SMITH, John"), vec!["SMITH, John", "John SMITH"]);
        assert_eq!(director_variants("Jane Doe"), vec!["Jane Doe"]);
        assert_eq!(director_variants("SMITH,"), vec!["SMITH,"]);
    }

    #[test]
    fn test_dedupe_skips_target_and_repeats() {
        let target = stub("ACME LTD", "00000001");
        let combined = vec![
            (CandidateOrigin::Brand, stub("ACME TRADING LTD", "00000002")),
            (CandidateOrigin::Address, stub("acme trading ltd ", "00000002")),
            (CandidateOrigin::Director, stub("ACME LTD", "00000001")),
            (CandidateOrigin::Director, stub("OTHER LTD", "00000003")),
            (CandidateOrigin::Director, stub("", "00000004")),
        ];
        let result = dedupe(&target, combined);

        let numbers: Vec<&str> = result.iter().map(|(_, c)| c.number.as_str()).collect();
        assert_eq!(numbers, vec!["00000002", "00000003", "00000004"]);
        assert_eq!(result[0].0, CandidateOrigin::Brand);
    }

    #[test]
    fn test_dedupe_keeps_unnumbered_candidates_for_unnumbered_target() {
        let target = stub("ACME", "");
        let combined = vec![
            (CandidateOrigin::Brand, stub("ACME TRADING", "")),
            (CandidateOrigin::Address, stub("OTHER", " ")),
        ];
        assert_eq!(dedupe(&target, combined).len(), 2);
    }
}
