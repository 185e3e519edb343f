use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::http::{not_found_as_none, Auth, HttpClient};
use crate::models::{CompanyRecord, RegistrySource, SearchHit};
use crate::registry::CompanyRegistry;

const SERVICE: &str = "Aleph";
const PAGE_LIMIT: usize = 50;
const SEARCH_LIMIT: usize = 10;

/// A FollowTheMoney entity as returned by Aleph.
#[derive(Debug, Clone, Deserialize)]
pub struct AlephEntity {
    pub id: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

impl AlephEntity {
    /// First string value of a multi-valued property.
    pub fn first(&self, prop: &str) -> Option<String> {
        self.properties
            .get(prop)?
            .as_array()?
            .iter()
            .find_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn name(&self) -> String {
        self.first("name").unwrap_or_default()
    }

    /// Maps a company-like entity onto a registry record.
    pub fn to_record(&self) -> CompanyRecord {
        CompanyRecord {
            name: self.name(),
            number: self
                .first("registrationNumber")
                .unwrap_or_else(|| self.id.clone()),
            address: self
                .first("address")
                .or_else(|| self.first("addressEntity"))
                .unwrap_or_default(),
            directors: Vec::new(),
            incorporation_date: self.first("incorporationDate"),
            status: self.first("status"),
            company_type: self.first("legalForm").or_else(|| Some(self.schema.clone()).filter(|s| !s.is_empty())),
            source: RegistrySource::Aleph,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ResultPage {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    total: Option<u64>,
}

/// Client for the Aleph (OCCRP) v2 API.
#[derive(Clone)]
pub struct AlephClient {
    http: HttpClient,
    base_url: String,
    auth: Auth,
}

impl AlephClient {
    /// Creates a new `AlephClient`; the key is sent as `Authorization: ApiKey <key>`.
    pub fn new(http: HttpClient, base_url: impl Into<String>, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: Auth::Header(format!("ApiKey {}", api_key)),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        };
        self.http.get_json(SERVICE, &url, params, &self.auth).await
    }

    /// Entity search filtered by schema; an empty filtered search is retried
    /// once without the schema filter.
    pub async fn search_entities(&self, query: &str, schema: Option<&str>) -> Result<Vec<AlephEntity>, AppError> {
        tracing::info!("Aleph: searching entities for '{}'", query);

        let mut params = vec![("q", query.trim().to_string()), ("limit", SEARCH_LIMIT.to_string())];
        if let Some(schema) = schema {
            params.push(("filter:schema", schema.to_string()));
        }

        let mut page: ResultPage = self.get("entities", &params).await?;
        if page.results.is_empty() && schema.is_some() {
            tracing::info!("Aleph: no {} entities for '{}', widening search", schema.unwrap_or_default(), query);
            params.retain(|(k, _)| *k != "filter:schema");
            page = self.get("entities", &params).await?;
        }

        tracing::info!(
            "Aleph: {} entities for '{}' ({} total)",
            page.results.len(),
            query,
            page.total.unwrap_or_default()
        );
        Ok(parse_entities(page.results))
    }

    pub async fn entity(&self, id: &str) -> Result<Option<AlephEntity>, AppError> {
        not_found_as_none(self.get(&format!("entities/{}", id), &[]).await)
    }

    /// Follows `limit`/`offset` pages until `next` is empty or a page comes back empty.
    pub async fn paginated(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Value>, AppError> {
        let mut all_results = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut page_params = params.to_vec();
            page_params.push(("limit", PAGE_LIMIT.to_string()));
            page_params.push(("offset", offset.to_string()));

            let page: ResultPage = self.get(path, &page_params).await?;
            if page.results.is_empty() {
                break;
            }
            offset += page.results.len();
            all_results.extend(page.results);
            if page.next.as_deref().map_or(true, str::is_empty) {
                break;
            }
        }

        Ok(all_results)
    }

    /// Names of the directors of an organization, via its Directorship entities.
    pub async fn directors(&self, entity_id: &str) -> Result<Vec<String>, AppError> {
        let directorships = self
            .paginated(
                "entities",
                &[
                    ("filter:schema", "Directorship".to_string()),
                    ("filter:properties.organization", entity_id.to_string()),
                ],
            )
            .await?;

        let mut names = Vec::new();
        for directorship in directorships {
            let Some(director) = directorship.get("properties").and_then(|p| p.get("director")) else {
                continue;
            };
            for embedded in embedded_names(director) {
                push_unique(&mut names, embedded);
            }
            for id in extract_ids(director) {
                match self.entity(&id).await {
                    Ok(Some(entity)) if !entity.name().is_empty() => push_unique(&mut names, entity.name()),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Aleph: failed to fetch director {}: {}", id, e),
                }
            }
        }
        Ok(names)
    }
}

impl CompanyRegistry for AlephClient {
    fn source(&self) -> RegistrySource {
        RegistrySource::Aleph
    }

    async fn search(&self, name: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        let entities = self.search_entities(name, Some("Company")).await?;
        Ok(entities
            .into_iter()
            .take(limit)
            .map(|e| SearchHit::new(e.id.clone(), e.name()))
            .collect())
    }

    /// `number` is the Aleph entity id.
    async fn get_details(&self, number: &str) -> Result<Option<CompanyRecord>, AppError> {
        let Some(entity) = self.entity(number).await? else {
            return Ok(None);
        };
        let mut record = entity.to_record();
        record.directors = self.directors(&entity.id).await?;
        Ok(Some(record))
    }
}

fn parse_entities(values: Vec<Value>) -> Vec<AlephEntity> {
    values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<AlephEntity>(v) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!("Aleph: skipping malformed entity: {}", e);
                None
            }
        })
        .collect()
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
        names.push(name);
    }
}

/// Entity ids referenced by a property value.
///
/// A string is an id; an object contributes its `id` unless it is already an
/// expanded entity with a name; arrays are flattened.
pub fn extract_ids(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Object(map) => {
            let expanded = map.get("properties").and_then(|p| p.get("name")).is_some();
            match map.get("id").and_then(Value::as_str) {
                Some(id) if !expanded && !id.is_empty() => vec![id.to_string()],
                _ => Vec::new(),
            }
        }
        Value::Array(items) => items.iter().flat_map(extract_ids).collect(),
        _ => Vec::new(),
    }
}

fn embedded_names(value: &Value) -> Vec<String> {
    match value {
        Value::Object(_) => serde_json::from_value::<AlephEntity>(value.clone())
            .ok()
            .map(|e| e.name())
            .filter(|n| !n.is_empty())
            .into_iter()
            .collect(),
        Value::Array(items) => items.iter().flat_map(embedded_names).collect(),
        _ => Vec::new(),
    }
}
