use std::collections::HashSet;

use crate::models::CompanyRecord;

pub const DEFAULT_PRIORITY_THRESHOLD: u32 = 2;

/// Counts the attributes a candidate shares with the target company.
///
/// One point each for a matching address and a brand hit, plus one per
/// shared director.
#[derive(Debug, Clone, Copy)]
pub struct OverlapScorer {
    pub priority_threshold: u32,
}

impl Default for OverlapScorer {
    fn default() -> Self {
        Self {
            priority_threshold: DEFAULT_PRIORITY_THRESHOLD,
        }
    }
}

impl OverlapScorer {
    pub fn new(priority_threshold: u32) -> Self {
        Self { priority_threshold }
    }

    pub fn score(&self, candidate: &CompanyRecord, target: &CompanyRecord, brand: Option<&str>) -> u32 {
        let mut score = 0;

        let address = normalize(&candidate.address);
        if !address.is_empty() && address == normalize(&target.address) {
            score += 1;
        }

        let target_directors = director_set(&target.directors);
        score += director_set(&candidate.directors)
            .intersection(&target_directors)
            .count() as u32;

        if let Some(brand) = brand.map(normalize).filter(|b| is_active_brand(b)) {
            if candidate.name.to_lowercase().contains(&brand) {
                score += 1;
            }
        }

        score
    }

    pub fn is_priority(&self, score: u32) -> bool {
        score >= self.priority_threshold
    }
}

/// False for an empty keyword or the literal "none".
pub fn is_active_brand(brand: &str) -> bool {
    let brand = normalize(brand);
    !brand.is_empty() && brand != "none"
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn director_set(directors: &[String]) -> HashSet<String> {
    directors
        .iter()
        .map(|d| normalize(d))
        .filter(|d| !d.is_empty())
        .collect()
}
