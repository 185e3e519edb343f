use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::errors::AppError;
use crate::retry::RetryPolicy;

/// How a registry expects its credentials.
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    /// HTTP Basic with an optional password (Companies House uses the key as
    /// username and an empty password).
    Basic { username: String, password: Option<String> },
    /// A raw `Authorization` header value, e.g. `ApiKey <key>`.
    Header(String),
}

/// Shared reqwest client carrying the injected retry policy.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates a new `HttpClient`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-request timeout.
    /// * `retry` - Policy applied to every request sent through this client.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("osint-toolkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, retry })
    }

    /// GET `url` with `query`, retrying per policy, and decode the JSON body.
    ///
    /// Non-success statuses map through `AppError::from_status`, so callers see
    /// `RateLimited` for 429 and `NotFound` for 404.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<T, AppError> {
        let label = format!("{} GET {}", service, url);
        self.retry
            .run(&label, || async {
                let response = self.send_once(service, url, query, auth).await?;
                response.json::<T>().await.map_err(|e| {
                    AppError::ExternalApiError(format!("Failed to parse {} response: {}", service, e))
                })
            })
            .await
    }

    /// Like `get_json` but returns the raw body, for endpoints that may answer
    /// with an empty document.
    pub async fn get_text(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<String, AppError> {
        let label = format!("{} GET {}", service, url);
        self.retry
            .run(&label, || async {
                let response = self.send_once(service, url, query, auth).await?;
                response.text().await.map_err(AppError::from)
            })
            .await
    }

    async fn send_once(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<reqwest::Response, AppError> {
        // Query strings may carry API tokens, so only the path is logged.
        tracing::debug!("{} request: {}", service, url);

        let mut request = self.client.get(url).query(query);
        request = match auth {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Auth::Header(value) => request.header(reqwest::header::AUTHORIZATION, value),
        };

        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                tracing::warn!("{} request failed: {}", service, err);
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status != reqwest::StatusCode::NOT_FOUND {
                tracing::error!("{} returned error {}: {}", service, status, error_text);
            }
            return Err(AppError::from_status(service, status, &error_text));
        }

        Ok(response)
    }
}

/// Turns a 404 into `Ok(None)`; every other outcome passes through.
pub fn not_found_as_none<T>(result: Result<T, AppError>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
