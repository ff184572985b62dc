//! Provider capability interface and registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use enrich_common::{Coordinates, EnrichError, EnrichResult};

use crate::domain::{DepthInterval, Domain};
use crate::observation::ProviderId;
use crate::result::DomainResult;

/// A data source able to answer for one domain.
///
/// Coordinates are validated before they reach a provider. `fetch` never
/// fails for ordinary problems (network errors, empty or implausible
/// responses); it returns an empty result with its own id in
/// `failed_providers` instead.
#[async_trait]
pub trait Provider<D: Domain>: Send + Sync {
    /// Stable identifier, e.g. "open_meteo".
    fn id(&self) -> ProviderId;

    /// Fast local admissibility check (date coverage, region). Must not panic.
    fn is_available(&self, location: &Coordinates, date: NaiveDate) -> bool;

    /// Retrieve observations for the point and date.
    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<D>;

    /// Retrieve observations for a sample taken at `depth`. Providers without
    /// depth-resolved data answer as `fetch` does.
    async fn fetch_at_depth(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        _depth: Option<DepthInterval>,
    ) -> DomainResult<D> {
        self.fetch(location, date).await
    }
}

/// Providers of one domain keyed by identifier.
pub struct ProviderRegistry<D: Domain> {
    providers: BTreeMap<ProviderId, Arc<dyn Provider<D>>>,
}

impl<D: Domain> Default for ProviderRegistry<D> {
    fn default() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }
}

impl<D: Domain> ProviderRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own id, replacing any previous entry.
    pub fn register(&mut self, provider: Arc<dyn Provider<D>>) -> &mut Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn Provider<D>>> {
        self.providers.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.keys()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers for `order`, in that order. Unknown ids are an error.
    pub fn select<I, S>(&self, order: I) -> EnrichResult<Vec<Arc<dyn Provider<D>>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        order
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                self.get(&ProviderId::from(id))
                    .ok_or_else(|| EnrichError::UnknownProvider(format!("{} ({})", id, D::NAME)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Weather;

    struct Named(&'static str);

    #[async_trait]
    impl Provider<Weather> for Named {
        fn id(&self) -> ProviderId {
            ProviderId::from(self.0)
        }

        fn is_available(&self, _location: &Coordinates, _date: NaiveDate) -> bool {
            true
        }

        async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<Weather> {
            DomainResult::failed(*location, date, self.id())
        }
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let mut registry = ProviderRegistry::<Weather>::new();
        registry.register(Arc::new(Named("open_meteo"))).register(Arc::new(Named("meteostat")));

        let selected = registry.select(["meteostat", "open_meteo"]).unwrap();
        let ids: Vec<String> = selected.iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, vec!["meteostat", "open_meteo"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_select_unknown_provider() {
        let mut registry = ProviderRegistry::<Weather>::new();
        registry.register(Arc::new(Named("open_meteo")));

        match registry.select(["nasa_power"]) {
            Err(EnrichError::UnknownProvider(msg)) => assert!(msg.contains("nasa_power")),
            other => panic!("expected UnknownProvider, got {:?}", other.map(|v| v.len())),
        }
    }
}
