use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::http::{not_found_as_none, Auth, HttpClient};
use crate::models::{CompanyRecord, RegistrySource, SearchHit};
use crate::registry::CompanyRegistry;

const SERVICE: &str = "OpenCorporates";
const MAX_PER_PAGE: usize = 100;

// ============ Wire Models ============

#[derive(Debug, Clone, Deserialize)]
struct Envelope<T> {
    results: T,
}

#[derive(Debug, Clone, Deserialize)]
struct CompanySearchResults {
    #[serde(default)]
    companies: Vec<CompanyWrapper>,
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompanyWrapper {
    company: OcCompany,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcCompany {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company_number: String,
    #[serde(default)]
    pub jurisdiction_code: String,
    pub incorporation_date: Option<String>,
    pub current_status: Option<String>,
    pub company_type: Option<String>,
    pub registered_address_in_full: Option<String>,
    #[serde(default)]
    pub officers: Vec<OfficerWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficerWrapper {
    pub officer: OcOfficer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcOfficer {
    #[serde(default)]
    pub name: String,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub company: Option<OfficerCompany>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficerCompany {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company_number: String,
    #[serde(default)]
    pub jurisdiction_code: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CompanyResult {
    company: OcCompany,
}

#[derive(Debug, Clone, Deserialize)]
struct OfficerSearchResults {
    #[serde(default)]
    officers: Vec<OfficerWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
struct AccountStatusResult {
    account_status: AccountStatus,
}

/// Usage counters reported by `account_status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountStatus {
    pub plan: Option<String>,
    pub status: Option<String>,
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub usage: UsageCounters,
    #[serde(default)]
    pub calls_remaining: UsageCounters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageCounters {
    #[serde(default)]
    pub today: u64,
    #[serde(default)]
    pub this_month: u64,
}

impl OcCompany {
    fn into_record(self) -> CompanyRecord {
        let directors = self
            .officers
            .iter()
            .map(|w| &w.officer)
            .filter(|o| {
                o.position
                    .as_deref()
                    .map(|p| p.to_lowercase().contains("director"))
                    .unwrap_or(false)
            })
            .map(|o| o.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        CompanyRecord {
            name: self.name,
            number: self.company_number,
            address: self.registered_address_in_full.unwrap_or_default().trim().to_string(),
            directors,
            incorporation_date: self.incorporation_date,
            status: self.current_status,
            company_type: self.company_type,
            source: RegistrySource::OpenCorporates,
        }
    }
}

// ============ Client ============

/// Client for the OpenCorporates v0.4 API.
#[derive(Clone)]
pub struct OpenCorporatesClient {
    http: HttpClient,
    base_url: String,
    api_token: Option<String>,
    jurisdiction: String,
}

impl OpenCorporatesClient {
    /// Creates a new `OpenCorporatesClient`.
    ///
    /// # Arguments
    ///
    /// * `api_token` - Sent as the `api_token` query parameter when present.
    /// * `jurisdiction` - Default jurisdiction for detail lookups, e.g. "gb".
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        api_token: Option<String>,
        jurisdiction: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            jurisdiction: jurisdiction.into().to_lowercase(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, AppError> {
        if let Some(ref token) = self.api_token {
            params.push(("api_token", token.clone()));
        }
        let url = format!("{}/{}", self.base_url, endpoint);
        self.http.get_json(SERVICE, &url, &params, &Auth::None).await
    }

    /// Search companies, one page at a time. `per_page` is capped at 100.
    pub async fn search_companies(
        &self,
        query: &str,
        jurisdiction: Option<&str>,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<CompanyRecord>, AppError> {
        tracing::info!("OpenCorporates: searching companies for '{}'", query);

        let mut params = vec![
            ("q", query.trim().to_string()),
            ("page", page.max(1).to_string()),
            ("per_page", per_page.clamp(1, MAX_PER_PAGE).to_string()),
        ];
        if let Some(j) = jurisdiction {
            params.push(("jurisdiction_code", j.to_lowercase()));
        }

        let envelope: Envelope<CompanySearchResults> = self.get("companies/search", params).await?;
        tracing::info!(
            "OpenCorporates: {} companies returned ({} total)",
            envelope.results.companies.len(),
            envelope.results.total_count.unwrap_or_default()
        );

        Ok(envelope
            .results
            .companies
            .into_iter()
            .map(|w| w.company.into_record())
            .collect())
    }

    pub async fn company(&self, jurisdiction: &str, number: &str) -> Result<Option<CompanyRecord>, AppError> {
        let endpoint = format!("companies/{}/{}", jurisdiction.to_lowercase(), number.trim());
        let envelope: Option<Envelope<CompanyResult>> =
            not_found_as_none(self.get(&endpoint, Vec::new()).await)?;
        Ok(envelope.map(|e| e.results.company.into_record()))
    }

    /// Officer search; each hit carries the company the appointment is at.
    pub async fn search_officers(&self, name: &str, jurisdiction: Option<&str>) -> Result<Vec<OcOfficer>, AppError> {
        tracing::info!("OpenCorporates: searching officers for '{}'", name);

        let mut params = vec![("q", name.trim().to_string())];
        if let Some(j) = jurisdiction {
            params.push(("jurisdiction_code", j.to_lowercase()));
        }

        let envelope: Envelope<OfficerSearchResults> = self.get("officers/search", params).await?;
        Ok(envelope.results.officers.into_iter().map(|w| w.officer).collect())
    }

    pub async fn account_status(&self) -> Result<AccountStatus, AppError> {
        if self.api_token.is_none() {
            return Err(AppError::ConfigError(
                "OPENCORPORATES_API_KEY environment variable required".to_string(),
            ));
        }
        let envelope: Envelope<AccountStatusResult> = self.get("account_status", Vec::new()).await?;
        Ok(envelope.results.account_status)
    }
}

impl CompanyRegistry for OpenCorporatesClient {
    fn source(&self) -> RegistrySource {
        RegistrySource::OpenCorporates
    }

    async fn search(&self, name: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        let records = self
            .search_companies(name, Some(&self.jurisdiction), 1, limit)
            .await?;
        Ok(records
            .into_iter()
            .take(limit)
            .map(|r| SearchHit::new(r.number, r.name))
            .collect())
    }

    async fn get_details(&self, number: &str) -> Result<Option<CompanyRecord>, AppError> {
        self.company(&self.jurisdiction, number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_into_record_keeps_directors_only() {
        let json = serde_json::json!({
            "name": "ACME TRADING LIMITED",
            "company_number": "01234567",
            "jurisdiction_code": "gb",
            "incorporation_date": "2001-05-04",
            "current_status": "Active",
            "registered_address_in_full": " 1 High Street, London ",
            "officers": [
                {"officer": {"name": "JOHN SMITH", "position": "Director"}},
                {"officer": {"name": "JANE DOE", "position": "secretary"}},
                {"officer": {"name": "ACME NOMINEES", "position": "corporate director"}}
            ]
        });
        let company: OcCompany = serde_json::from_value(json).unwrap();
        let record = company.into_record();

        assert_eq!(record.source, RegistrySource::OpenCorporates);
        assert_eq!(record.address, "1 High Street, London");
        assert_eq!(record.directors, vec!["JOHN SMITH", "ACME NOMINEES"]);
        assert_eq!(record.status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_account_status_defaults() {
        let status: AccountStatus = serde_json::from_value(serde_json::json!({"plan": "open"})).unwrap();
        assert_eq!(status.plan.as_deref(), Some("open"));
        assert_eq!(status.usage.today, 0);
        assert_eq!(status.calls_remaining.this_month, 0);
    }
}
