//! The seam every company registry client plugs into.

use std::future::Future;

use crate::errors::AppError;
use crate::models::{CompanyRecord, RegistrySource, SearchHit};

/// A company-information API.
///
/// `get_details` returns `Ok(None)` for an unknown number; only transport,
/// rate-limit and protocol problems are errors.
pub trait CompanyRegistry {
    fn source(&self) -> RegistrySource;

    fn search(
        &self,
        name: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>, AppError>> + Send;

    fn get_details(
        &self,
        number: &str,
    ) -> impl Future<Output = Result<Option<CompanyRecord>, AppError>> + Send;

    /// Like `search`, also reporting the registry that served the hits.
    fn search_routed(
        &self,
        name: &str,
        limit: usize,
    ) -> impl Future<Output = Result<(RegistrySource, Vec<SearchHit>), AppError>> + Send
    where
        Self: Sync,
    {
        async move {
            let hits = self.search(name, limit).await?;
            Ok((self.source(), hits))
        }
    }

    /// Searches and resolves every hit into a full record.
    ///
    /// A failed or empty detail fetch skips that hit; the search itself
    /// failing is still an error.
    fn search_records(
        &self,
        name: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CompanyRecord>, AppError>> + Send
    where
        Self: Sync,
    {
        async move {
            let hits = self.search(name, limit).await?;
            let mut records = Vec::with_capacity(hits.len());
            for hit in hits {
                match self.get_details(&hit.number).await {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {
                        tracing::warn!("{}: no details for {} ({})", self.source(), hit.title, hit.number)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "{}: failed to fetch details for {}: {}",
                            self.source(),
                            hit.number,
                            e
                        );
                    }
                }
            }
            Ok(records)
        }
    }
}
