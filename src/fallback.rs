use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::AppError;
use crate::models::{CompanyRecord, RegistrySource, SearchHit};
use crate::registry::CompanyRegistry;

/// Routes lookups to a primary registry and falls back to a secondary one.
///
/// # Behaviour
///
/// - **Primary available**: every call goes to the primary.
/// - **Primary fails** (429 or any other error): the primary is marked
///   unavailable for `cooldown` and the same call is served by the fallback.
/// - **Cool-down active**: calls go straight to the fallback.
/// - **Cool-down elapsed**: the next call tries the primary again.
///
/// Fallback errors, including 429, are returned to the caller. There is no
/// half-open probing; the window is a plain timer.
pub struct FallbackRegistry<P, F> {
    primary: P,
    fallback: F,
    cooldown: Duration,
    failed_at: Mutex<Option<Instant>>,
}

impl<P, F> FallbackRegistry<P, F>
where
    P: CompanyRegistry + Sync,
    F: CompanyRegistry + Sync,
{
    pub fn new(primary: P, fallback: F, cooldown: Duration) -> Self {
        Self {
            primary,
            fallback,
            cooldown,
            failed_at: Mutex::new(None),
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// True when the next call will try the primary.
    pub fn primary_available(&self) -> bool {
        let mut guard = self
            .failed_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *guard {
            Some(failed) if failed.elapsed() < self.cooldown => false,
            Some(_) => {
                tracing::info!("{} cool-down elapsed, retrying primary", self.primary.source());
                *guard = None;
                true
            }
            None => true,
        }
    }

    fn mark_unavailable(&self, err: &AppError) {
        *self
            .failed_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());

        if err.is_rate_limited() {
            tracing::warn!(
                "{} rate-limited, using {} for the next {:?}",
                self.primary.source(),
                self.fallback.source(),
                self.cooldown
            );
        } else {
            tracing::warn!(
                "{} failed ({}), using {} for the next {:?}",
                self.primary.source(),
                err,
                self.fallback.source(),
                self.cooldown
            );
        }
    }
}

impl<P, F> CompanyRegistry for FallbackRegistry<P, F>
where
    P: CompanyRegistry + Sync,
    F: CompanyRegistry + Sync,
{
    /// The registry the next call will be routed to.
    fn source(&self) -> RegistrySource {
        if self.primary_available() {
            self.primary.source()
        } else {
            self.fallback.source()
        }
    }

    async fn search(&self, name: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        let (_, hits) = self.search_routed(name, limit).await?;
        Ok(hits)
    }

    async fn search_routed(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<(RegistrySource, Vec<SearchHit>), AppError> {
        if self.primary_available() {
            match self.primary.search(name, limit).await {
                Ok(hits) => return Ok((self.primary.source(), hits)),
                Err(e) => self.mark_unavailable(&e),
            }
        }
        tracing::info!("Routing search for '{}' to {}", name, self.fallback.source());
        let hits = self.fallback.search(name, limit).await?;
        Ok((self.fallback.source(), hits))
    }

    async fn get_details(&self, number: &str) -> Result<Option<CompanyRecord>, AppError> {
        if self.primary_available() {
            match self.primary.get_details(number).await {
                Ok(found) => return Ok(found),
                Err(e) => self.mark_unavailable(&e),
            }
        }
        tracing::info!("Routing details for {} to {}", number, self.fallback.source());
        self.fallback.get_details(number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// In-memory registry that fails on demand and counts calls.
    struct FakeRegistry {
        source: RegistrySource,
        failing: AtomicBool,
        calls: AtomicU32,
    }

    impl FakeRegistry {
        fn new(source: RegistrySource, failing: bool) -> Self {
            Self {
                source,
                failing: AtomicBool::new(failing),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn outcome(&self) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(AppError::RateLimited(self.source.to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl CompanyRegistry for FakeRegistry {
        fn source(&self) -> RegistrySource {
            self.source
        }

        async fn search(&self, name: &str, _limit: usize) -> Result<Vec<SearchHit>, AppError> {
            self.outcome()?;
            Ok(vec![SearchHit::new(self.source.tag(), name)])
        }

        async fn get_details(&self, number: &str) -> Result<Option<CompanyRecord>, AppError> {
            self.outcome()?;
            if number == "missing" {
                return Ok(None);
            }
            Ok(Some(CompanyRecord::stub("Acme", number, self.source)))
        }
    }

    fn router(primary_failing: bool, cooldown: Duration) -> FallbackRegistry<FakeRegistry, FakeRegistry> {
        FallbackRegistry::new(
            FakeRegistry::new(RegistrySource::CompaniesHouse, primary_failing),
            FakeRegistry::new(RegistrySource::OpenCorporates, false),
            cooldown,
        )
    }

    #[tokio::test]
    async fn test_primary_used_when_healthy() {
        let registry = router(false, Duration::from_secs(60));
        let hits = registry.search("acme", 5).await.unwrap();

        assert_eq!(hits[0].number, "CH");
        assert_eq!(registry.primary().calls(), 1);
        assert_eq!(registry.fallback().calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_routes_current_and_next_call_to_fallback() {
        let registry = router(true, Duration::from_secs(60));

        let first = registry.get_details("01234567").await.unwrap().unwrap();
        assert_eq!(first.source, RegistrySource::OpenCorporates);
        assert_eq!(registry.primary().calls(), 1);
        assert!(!registry.primary_available());

        // Primary recovered, but the window is still open.
        registry.primary().failing.store(false, Ordering::SeqCst);
        let second = registry.search("acme", 5).await.unwrap();
        assert_eq!(second[0].number, "OC");
        assert_eq!(registry.primary().calls(), 1);
        assert_eq!(registry.fallback().calls(), 2);
    }

    #[tokio::test]
    async fn test_primary_retried_after_cooldown() {
        let registry = router(true, Duration::from_millis(50));

        registry.search("acme", 5).await.unwrap();
        assert_eq!(registry.primary().calls(), 1);

        registry.primary().failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;

        let hits = registry.search("acme", 5).await.unwrap();
        assert_eq!(hits[0].number, "CH");
        assert_eq!(registry.primary().calls(), 2);
        assert_eq!(registry.fallback().calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_error_surfaces() {
        let registry = FallbackRegistry::new(
            FakeRegistry::new(RegistrySource::CompaniesHouse, true),
            FakeRegistry::new(RegistrySource::OpenCorporates, true),
            Duration::from_secs(60),
        );

        let err = registry.search("acme", 5).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "Rate limited: OC");
    }

    #[tokio::test]
    async fn test_not_found_is_not_a_failure() {
        let registry = router(false, Duration::from_secs(60));

        assert!(registry.get_details("missing").await.unwrap().is_none());
        assert!(registry.primary_available());
        assert_eq!(registry.fallback().calls(), 0);
    }

    #[tokio::test]
    async fn test_search_reports_serving_registry() {
        // Zero cool-down: the window closes as soon as the failing call returns.
        let registry = router(true, Duration::ZERO);

        let (source, hits) = registry.search_routed("acme", 5).await.unwrap();
        assert_eq!(source, RegistrySource::OpenCorporates);
        assert_eq!(hits[0].number, "OC");
        assert_eq!(registry.source(), RegistrySource::CompaniesHouse);
    }

    #[test]
    fn test_huge_cooldown_keeps_primary_disabled() {
        let registry = router(false, Duration::from_secs(u64::MAX));

        registry.mark_unavailable(&AppError::RateLimited("CH".to_string()));
        assert!(!registry.primary_available());
        assert_eq!(registry.source(), RegistrySource::OpenCorporates);
    }

    #[test]
    fn test_source_follows_routing_state() {
        let registry = router(false, Duration::from_secs(60));
        assert_eq!(registry.source(), RegistrySource::CompaniesHouse);

        registry.mark_unavailable(&AppError::TransientError("timeout".to_string()));
        assert_eq!(registry.source(), RegistrySource::OpenCorporates);
    }
}
