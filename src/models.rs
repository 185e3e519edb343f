use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Company Models ============

/// Which registry produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrySource {
    #[serde(rename = "CH")]
    CompaniesHouse,
    #[serde(rename = "OC")]
    OpenCorporates,
    #[serde(rename = "ALEPH")]
    Aleph,
}

impl RegistrySource {
    pub fn tag(&self) -> &'static str {
        match self {
            RegistrySource::CompaniesHouse => "CH",
            RegistrySource::OpenCorporates => "OC",
            RegistrySource::Aleph => "ALEPH",
        }
    }
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A company as returned by any registry.
///
/// Created fresh from every API response; enrichment fills in `address` and
/// `directors` after a thin search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Registered company name.
    pub name: String,
    /// Registration number, the only identity a record has.
    pub number: String,
    /// Free-text registered address.
    pub address: String,
    /// Director names as the registry spells them.
    pub directors: Vec<String>,
    pub incorporation_date: Option<String>,
    pub status: Option<String>,
    pub company_type: Option<String>,
    pub source: RegistrySource,
}

impl CompanyRecord {
    /// Builds a name-and-number-only record, used when enrichment is skipped.
    pub fn stub(name: impl Into<String>, number: impl Into<String>, source: RegistrySource) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            address: String::new(),
            directors: Vec::new(),
            incorporation_date: None,
            status: None,
            company_type: None,
            source,
        }
    }

    pub fn is_stub(&self) -> bool {
        self.address.trim().is_empty() && self.directors.is_empty()
    }

    /// Normalized registration number used for identity comparisons.
    pub fn number_key(&self) -> String {
        self.number.trim().to_uppercase()
    }

    pub fn same_company(&self, other: &CompanyRecord) -> bool {
        !self.number_key().is_empty() && self.number_key() == other.number_key()
    }
}

/// A thin search result before detail enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub number: String,
    pub title: String,
}

impl SearchHit {
    pub fn new(number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
        }
    }

    pub fn into_stub(self, source: RegistrySource) -> CompanyRecord {
        CompanyRecord::stub(self.title, self.number, source)
    }
}

// ============ Ownership Models ============

/// A person or corporate entity with significant control over a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficialOwner {
    pub name: String,
    /// "individual" or "corporate".
    pub kind: String,
    pub percentage: Option<String>,
    pub natures_of_control: Vec<String>,
    /// Registration number for corporate owners.
    pub registration_number: Option<String>,
}

impl BeneficialOwner {
    pub fn control_summary(&self) -> String {
        format_control_nature(&self.natures_of_control)
    }
}

/// Converts Companies House control codes into readable text.
///
/// Unknown codes are passed through unchanged.
pub fn format_control_nature(codes: &[String]) -> String {
    codes
        .iter()
        .map(|code| match code.as_str() {
            "ownership-of-shares-75-to-100-percent" => "Owns 75-100% of shares",
            "ownership-of-shares-50-to-75-percent" => "Owns 50-75% of shares",
            "ownership-of-shares-25-to-50-percent" => "Owns 25-50% of shares",
            "voting-rights-75-to-100-percent" => "Controls 75-100% of voting rights",
            "voting-rights-50-to-75-percent" => "Controls 50-75% of voting rights",
            "voting-rights-25-to-50-percent" => "Controls 25-50% of voting rights",
            "right-to-appoint-and-remove-directors" => "Can appoint/remove directors",
            "significant-influence-or-control" => "Has significant control",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============ Network Analysis Models ============

/// Why a candidate entered the cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateOrigin {
    Brand,
    Address,
    Director,
}

impl fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateOrigin::Brand => f.write_str("brand"),
            CandidateOrigin::Address => f.write_str("address"),
            CandidateOrigin::Director => f.write_str("director"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub origin: CandidateOrigin,
    pub company: CompanyRecord,
    pub score: u32,
    pub priority: bool,
}

/// Outcome of one company network analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkReport {
    pub query: String,
    pub target: CompanyRecord,
    pub brand: Option<String>,
    pub beneficial_owners: Vec<BeneficialOwner>,
    /// Sorted by descending score.
    pub candidates: Vec<ScoredCandidate>,
    pub generated_at: DateTime<Utc>,
}

impl NetworkReport {
    pub fn priority_candidates(&self) -> impl Iterator<Item = &ScoredCandidate> {
        self.candidates.iter().filter(|c| c.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_record() {
        let stub = CompanyRecord::stub("ACME LTD", "01234567", RegistrySource::CompaniesHouse);
        assert!(stub.is_stub());
        assert!(stub.incorporation_date.is_none());
        assert_eq!(stub.source.tag(), "CH");
    }

    #[test]
    fn test_identity_is_registration_number() {
        let a = CompanyRecord::stub("Acme", " sc123456 ", RegistrySource::CompaniesHouse);
        let b = CompanyRecord::stub("ACME HOLDINGS", "SC123456", RegistrySource::OpenCorporates);
        assert!(a.same_company(&b));

        let empty = CompanyRecord::stub("Nameless", "", RegistrySource::Aleph);
        assert!(!empty.same_company(&empty.clone()));
    }

    #[test]
    fn test_format_control_nature() {
        let codes = vec![
            "ownership-of-shares-75-to-100-percent".to_string(),
            "right-to-appoint-and-remove-directors".to_string(),
            "some-new-code".to_string(),
        ];
        assert_eq!(
            format_control_nature(&codes),
            "Owns 75-100% of shares, Can appoint/remove directors, some-new-code"
        );
    }

    #[test]
    fn test_source_serializes_as_tag() {
        let json = serde_json::to_string(&RegistrySource::OpenCorporates).unwrap();
        assert_eq!(json, "\"OC\"");
    }
}
