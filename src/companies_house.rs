use serde::Deserialize;
use std::collections::BTreeSet;

use crate::errors::AppError;
use crate::http::{not_found_as_none, Auth, HttpClient};
use crate::models::{BeneficialOwner, CompanyRecord, RegistrySource, SearchHit};
use crate::registry::CompanyRegistry;

const SERVICE: &str = "Companies House";
const DIRECTOR_ROLES: [&str; 4] = [
    "director",
    "corporate-director",
    "nominee-director",
    "corporate-nominee-director",
];

// ============ Wire Models ============

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompanySearchItem {
    #[serde(default)]
    company_number: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisteredAddress {
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl RegisteredAddress {
    /// Joins the non-empty parts with ", ".
    pub fn format(&self) -> String {
        [
            &self.address_line_1,
            &self.address_line_2,
            &self.locality,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CompanyProfile {
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    company_number: String,
    #[serde(default)]
    registered_office_address: RegisteredAddress,
    date_of_creation: Option<String>,
    company_status: Option<String>,
    #[serde(rename = "type")]
    company_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Officer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub officer_role: String,
    pub appointed_on: Option<String>,
    pub resigned_on: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OfficerSearchItem {
    #[serde(default)]
    title: String,
    appointed_to: Option<AppointedTo>,
    #[serde(default)]
    links: OfficerLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OfficerLinks {
    #[serde(rename = "self")]
    self_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AppointedTo {
    company_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Appointment {
    appointed_to: Option<AppointedTo>,
}

#[derive(Debug, Clone, Deserialize)]
struct PscItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    natures_of_control: Vec<String>,
    identification: Option<PscIdentification>,
}

#[derive(Debug, Clone, Deserialize)]
struct PscIdentification {
    registration_number: Option<String>,
}

// ============ Client ============

/// Client for the Companies House public data API.
#[derive(Clone)]
pub struct CompaniesHouseClient {
    http: HttpClient,
    base_url: String,
    auth: Auth,
}

impl CompaniesHouseClient {
    /// Creates a new `CompaniesHouseClient`.
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client with its retry policy.
    /// * `base_url` - API root, without a trailing slash.
    /// * `api_key` - Used as the Basic-auth username with an empty password.
    pub fn new(http: HttpClient, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: Auth::Basic {
                username: api_key.into(),
                password: None,
            },
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        self.http.get_json(SERVICE, &url, query, &self.auth).await
    }

    /// Search companies by free text.
    pub async fn search_companies(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        tracing::info!("Companies House: searching companies for '{}'", query);

        let response: SearchResponse<CompanySearchItem> = self
            .get(
                "/search/companies",
                &[("q", query.trim().to_string()), ("items_per_page", limit.to_string())],
            )
            .await?;

        let hits: Vec<SearchHit> = response
            .items
            .into_iter()
            .filter(|item| !item.company_number.is_empty())
            .map(|item| SearchHit::new(item.company_number, item.title))
            .take(limit)
            .collect();

        tracing::info!("Companies House: {} hits for '{}'", hits.len(), query);
        Ok(hits)
    }

    /// Fetch the company profile without officers. Numbers are upper-cased.
    pub async fn company_profile(&self, number: &str) -> Result<Option<CompanyRecord>, AppError> {
        let number = number.trim().to_uppercase();
        let profile: Option<CompanyProfile> =
            not_found_as_none(self.get(&format!("/company/{}", number), &[]).await)?;

        Ok(profile.map(|p| CompanyRecord {
            name: p.company_name,
            number: if p.company_number.is_empty() {
                number.clone()
            } else {
                p.company_number
            },
            address: p.registered_office_address.format(),
            directors: Vec::new(),
            incorporation_date: p.date_of_creation.filter(|s| !s.is_empty()),
            status: p.company_status.filter(|s| !s.is_empty()),
            company_type: p.company_type.filter(|s| !s.is_empty()),
            source: RegistrySource::CompaniesHouse,
        }))
    }

    pub async fn company_officers(&self, number: &str) -> Result<Vec<Officer>, AppError> {
        let number = number.trim().to_uppercase();
        let response: Option<SearchResponse<Officer>> = not_found_as_none(
            self.get(
                &format!("/company/{}/officers", number),
                &[("items_per_page", "100".to_string())],
            )
            .await,
        )?;
        Ok(response.map(|r| r.items).unwrap_or_default())
    }

    /// Names of current and past directors, nominee directors included.
    pub async fn directors(&self, number: &str) -> Result<Vec<String>, AppError> {
        let officers = self.company_officers(number).await?;
        Ok(director_names(&officers))
    }

    /// Company numbers a person holds appointments at.
    ///
    /// Officer search results carry `appointed_to` for some hits; for hits whose
    /// title matches the name exactly the appointment list is followed too.
    pub async fn search_officer_companies(&self, name: &str, limit: usize) -> Result<Vec<String>, AppError> {
        tracing::info!("Companies House: searching officers for '{}'", name);

        let response: SearchResponse<OfficerSearchItem> = self
            .get(
                "/search/officers",
                &[("q", name.trim().to_string()), ("items_per_page", limit.to_string())],
            )
            .await?;

        let wanted = normalize_person(name);
        let mut numbers = BTreeSet::new();

        for item in response.items {
            if let Some(number) = item.appointed_to.and_then(|a| a.company_number) {
                numbers.insert(number.trim().to_uppercase());
                continue;
            }
            if normalize_person(&item.title) != wanted {
                continue;
            }
            let Some(link) = item.links.self_link else {
                continue;
            };
            match self.appointments(&link).await {
                Ok(found) => numbers.extend(found),
                Err(e) => tracing::warn!("Companies House: appointments for {} failed: {}", link, e),
            }
        }

        tracing::info!("Companies House: '{}' linked to {} companies", name, numbers.len());
        Ok(numbers.into_iter().collect())
    }

    async fn appointments(&self, link: &str) -> Result<Vec<String>, AppError> {
        let path = if link.ends_with("/appointments") {
            link.to_string()
        } else {
            format!("{}/appointments", link.trim_end_matches('/'))
        };
        let response: SearchResponse<Appointment> = self.get(&path, &[]).await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|a| a.appointed_to.and_then(|t| t.company_number))
            .map(|n| n.trim().to_uppercase())
            .collect())
    }

    /// Persons with significant control, individual and corporate.
    pub async fn persons_with_significant_control(
        &self,
        number: &str,
    ) -> Result<Vec<BeneficialOwner>, AppError> {
        let number = number.trim().to_uppercase();
        let response: Option<SearchResponse<PscItem>> = not_found_as_none(
            self.get(&format!("/company/{}/persons-with-significant-control", number), &[])
                .await,
        )?;

        Ok(response
            .map(|r| r.items)
            .unwrap_or_default()
            .into_iter()
            .map(|psc| BeneficialOwner {
                percentage: share_band(&psc.natures_of_control),
                kind: if psc.kind.contains("corporate") || psc.kind.contains("legal-person") {
                    "corporate".to_string()
                } else {
                    "individual".to_string()
                },
                registration_number: psc.identification.and_then(|i| i.registration_number),
                name: psc.name,
                natures_of_control: psc.natures_of_control,
            })
            .collect())
    }

    /// Corporate entries among the persons with significant control.
    pub async fn corporate_pscs(&self, number: &str) -> Result<Vec<BeneficialOwner>, AppError> {
        Ok(self
            .persons_with_significant_control(number)
            .await?
            .into_iter()
            .filter(|owner| owner.kind == "corporate")
            .collect())
    }
}

impl CompanyRegistry for CompaniesHouseClient {
    fn source(&self) -> RegistrySource {
        RegistrySource::CompaniesHouse
    }

    async fn search(&self, name: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        self.search_companies(name, limit).await
    }

    async fn get_details(&self, number: &str) -> Result<Option<CompanyRecord>, AppError> {
        let Some(mut record) = self.company_profile(number).await? else {
            return Ok(None);
        };
        record.directors = self.directors(&record.number).await?;
        Ok(Some(record))
    }
}

fn director_names(officers: &[Officer]) -> Vec<String> {
    officers
        .iter()
        .filter(|o| DIRECTOR_ROLES.contains(&o.officer_role.as_str()))
        .map(|o| o.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// "SMITH, John" and "John Smith" normalize to the same key.
fn normalize_person(name: &str) -> String {
    let name = name.trim().to_lowercase();
    let flipped = match name.split_once(',') {
        Some((surname, rest)) if !surname.trim().is_empty() && !rest.trim().is_empty() => {
            format!("{} {}", rest.trim(), surname.trim())
        }
        _ => name,
    };
    flipped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "ownership-of-shares-25-to-50-percent" => "25-50%".
fn share_band(codes: &[String]) -> Option<String> {
    codes.iter().find_map(|code| {
        let band = code
            .strip_prefix("ownership-of-shares-")?
            .split("-registered-")
            .next()?
            .strip_suffix("-percent")?;
        let (low, high) = band.split_once("-to-")?;
        Some(format!("{}-{}%", low, high))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn officer(name: &str, role: &str) -> Officer {
        Officer {
            name: name.to_string(),
            officer_role: role.to_string(),
            appointed_on: None,
            resigned_on: None,
        }
    }

    #[test]
    fn test_address_formatting_skips_empty_parts() {
        let address = RegisteredAddress {
            address_line_1: Some("1 High Street".to_string()),
            address_line_2: Some("  ".to_string()),
            locality: Some("London".to_string()),
            region: None,
            postal_code: Some("EC1A 1BB".to_string()),
            country: Some("England".to_string()),
        };
        assert_eq!(address.format(), "1 High Street, London, EC1A 1BB, England");
        assert_eq!(RegisteredAddress::default().format(), "");
    }

    #[test]
    fn test_director_roles_filter() {
        let officers = vec![
            officer("SMITH, John", "director"),
            officer("ACME NOMINEES LTD", "corporate-director"),
            officer("DOE, Jane", "secretary"),
            officer("   ", "director"),
            officer("BROWN, Alex", "nominee-director"),
            officer("SHELF NOMINEES LTD", "corporate-nominee-director"),
        ];
        assert_eq!(
            director_names(&officers),
            vec![
                "SMITH, John".to_string(),
                "ACME NOMINEES LTD".to_string(),
                "BROWN, Alex".to_string(),
                "SHELF NOMINEES LTD".to_string(),
            ]
        );
    }

    #[test]
    fn test_normalize_person_flips_surname_first() {
        assert_eq!(normalize_person("SZABO, Domonkos"), "domonkos szabo");
        assert_eq!(normalize_person("Domonkos  Szabo"), "domonkos szabo");
        assert_eq!(normalize_person(",Trailing"), ",trailing");
    }

    #[test]
    fn test_share_band() {
        let codes = vec![
            "voting-rights-75-to-100-percent".to_string(),
            "ownership-of-shares-25-to-50-percent".to_string(),
        ];
        assert_eq!(share_band(&codes), Some("25-50%".to_string()));
        assert_eq!(
            share_band(&["ownership-of-shares-75-to-100-percent-registered-overseas-entity".to_string()]),
            Some("75-100%".to_string())
        );
        assert_eq!(share_band(&[]), None);
    }
}
