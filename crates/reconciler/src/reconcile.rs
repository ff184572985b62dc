//! The reconciliation engine.
//!
//! Providers are queried one at a time in configured priority order. A
//! provider that is unavailable, panics or answers with no data is recorded
//! as failed and never aborts the request. Accepted results are merged field
//! by field (per depth layer): the observation with the best tier wins, and
//! on equal tiers the provider queried first keeps the slot.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use enrich_common::{Coordinates, EnrichResult};

use crate::domain::{DepthInterval, Domain};
use crate::observation::ProviderId;
use crate::provider::{Provider, ProviderRegistry};
use crate::quality::QualityTier;
use crate::result::DomainResult;

/// Outcome of querying a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchOutcome {
    Accepted,
    Rejected,
    Unavailable,
    Panicked,
}

impl DispatchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Accepted => "accepted",
            DispatchOutcome::Rejected => "rejected",
            DispatchOutcome::Unavailable => "unavailable",
            DispatchOutcome::Panicked => "panicked",
        }
    }
}

/// Merges observations from an ordered provider list.
pub struct Reconciler<D: Domain> {
    providers: Vec<Arc<dyn Provider<D>>>,
}

impl<D: Domain> Clone for Reconciler<D> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
        }
    }
}

impl<D: Domain> Reconciler<D> {
    /// Create an engine over `providers`, highest priority first.
    pub fn new(providers: Vec<Arc<dyn Provider<D>>>) -> Self {
        Self { providers }
    }

    /// Create an engine from registered providers in the given order.
    pub fn from_registry<I, S>(registry: &ProviderRegistry<D>, order: I) -> EnrichResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::new(registry.select(order)?))
    }

    /// Provider ids in dispatch order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Query every provider and merge what they return.
    pub async fn reconcile(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<D> {
        self.reconcile_at(location, date, None).await
    }

    /// As [`Reconciler::reconcile`], for a sample taken at `depth`.
    #[instrument(skip(self), fields(domain = D::NAME, lat = location.lat, lon = location.lon, date = %date, depth = ?depth))]
    pub async fn reconcile_at(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        depth: Option<DepthInterval>,
    ) -> DomainResult<D> {
        let mut merged = DomainResult::<D>::empty(*location, date);

        for provider in &self.providers {
            let id = provider.id();
            let outcome = self
                .dispatch(provider.as_ref(), &id, location, date, depth, &mut merged)
                .await;
            ::metrics::counter!(
                "enrich_provider_requests_total",
                "domain" => D::NAME,
                "provider" => id.to_string(),
                "outcome" => outcome.as_str()
            )
            .increment(1);
        }

        merged.refresh_quality();

        info!(
            successful = merged.successful_providers.len(),
            failed = merged.failed_providers.len(),
            fields = merged.filled_fields().len(),
            quality = %merged.overall_quality,
            "Reconciliation complete"
        );

        merged
    }

    async fn dispatch(
        &self,
        provider: &dyn Provider<D>,
        id: &ProviderId,
        location: &Coordinates,
        date: NaiveDate,
        depth: Option<DepthInterval>,
        merged: &mut DomainResult<D>,
    ) -> DispatchOutcome {
        let available = std::panic::catch_unwind(AssertUnwindSafe(|| provider.is_available(location, date)))
            .unwrap_or(false);
        if !available {
            debug!(provider = %id, "Provider unavailable for location/date");
            merged.failed_providers.insert(id.clone());
            return DispatchOutcome::Unavailable;
        }

        let mut result = match AssertUnwindSafe(provider.fetch_at_depth(location, date, depth)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                warn!(provider = %id, "Provider panicked during fetch");
                merged.failed_providers.insert(id.clone());
                return DispatchOutcome::Panicked;
            }
        };
        result.normalize();

        if result.overall_quality.is_no_data() {
            debug!(provider = %id, "Provider returned no data");
            merged.failed_providers.extend(result.failed_providers);
            merged.failed_providers.insert(id.clone());
            return DispatchOutcome::Rejected;
        }

        debug!(
            provider = %id,
            fields = result.filled_fields().len(),
            quality = %result.overall_quality,
            "Provider result accepted"
        );
        merge_into(merged, result);
        merged.successful_providers.insert(id.clone());
        DispatchOutcome::Accepted
    }
}

/// Merge an accepted result. An incoming observation replaces the current
/// one only when its tier is strictly better.
fn merge_into<D: Domain>(merged: &mut DomainResult<D>, incoming: DomainResult<D>) {
    for layer in incoming.layers {
        for (field, observation) in layer.observations {
            let replace = match merged.observation_at(layer.depth, field) {
                None => true,
                Some(current) => observation.tier().is_better_than(&current.tier()),
            };
            if replace {
                merged.insert_at(layer.depth, field, observation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Weather, WeatherField};
    use crate::observation::{Observation, Precision};
    use crate::quality::WeatherQuality;
    use async_trait::async_trait;

    struct Fixed {
        id: &'static str,
        tier: WeatherQuality,
        temp: f64,
    }

    #[async_trait]
    impl Provider<Weather> for Fixed {
        fn id(&self) -> ProviderId {
            ProviderId::from(self.id)
        }

        fn is_available(&self, _location: &Coordinates, _date: NaiveDate) -> bool {
            true
        }

        async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Weather> {
            let mut result = DomainResult::empty(*location, date);
            result.insert(
                WeatherField::Temperature,
                Observation::new(self.temp, "Celsius", Precision::new("test", self.tier, self.id)),
            );
            result
        }
    }

    fn point() -> Coordinates {
        Coordinates::new(10.0, 10.0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn test_better_tier_replaces_earlier_provider() {
        let reconciler = Reconciler::<Weather>::new(vec![
            Arc::new(Fixed { id: "a", tier: WeatherQuality::DaySpecificPartial, temp: 1.0 }),
            Arc::new(Fixed { id: "b", tier: WeatherQuality::DaySpecificComplete, temp: 2.0 }),
        ]);
        let merged = reconciler.reconcile(&point(), date()).await;
        let temp = merged.observation(WeatherField::Temperature).unwrap();
        assert_eq!(temp.value.as_number(), Some(2.0));
        assert_eq!(merged.successful_providers.len(), 2);
    }

    #[tokio::test]
    async fn test_equal_tier_keeps_first_provider() {
        let reconciler = Reconciler::<Weather>::new(vec![
            Arc::new(Fixed { id: "a", tier: WeatherQuality::DaySpecificComplete, temp: 1.0 }),
            Arc::new(Fixed { id: "b", tier: WeatherQuality::DaySpecificComplete, temp: 2.0 }),
        ]);
        let merged = reconciler.reconcile(&point(), date()).await;
        let temp = merged.observation(WeatherField::Temperature).unwrap();
        assert_eq!(temp.provider().as_str(), "a");
    }

    #[tokio::test]
    async fn test_no_providers_yields_no_data() {
        let reconciler = Reconciler::<Weather>::new(Vec::new());
        let merged = reconciler.reconcile(&point(), date()).await;
        assert!(merged.is_empty());
        assert_eq!(merged.overall_quality, WeatherQuality::NoData);
    }
}
