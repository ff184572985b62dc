//! Scripted providers for exercising the reconciler without network access.

use std::panic;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use enrich_common::Coordinates;
use reconciler::{DepthInterval, Domain, DomainResult, Observation, Provider, ProviderId};

/// Shared record of which providers were asked to fetch, in call order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<ProviderId>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, id: ProviderId) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(id);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.0
            .lock()
            .map(|calls| calls.iter().map(|id| id.to_string()).collect())
            .unwrap_or_default()
    }
}

/// What a scripted provider returns for every request.
pub enum Script<D: Domain> {
    /// These observations, at their depths.
    Observations(Vec<(Option<DepthInterval>, D::Field, Observation<D::Tier>)>),
    /// These observations, placed in the layer the caller asked for
    /// (the surface layer when no depth is given).
    AtRequestedDepth(Vec<(D::Field, Observation<D::Tier>)>),
    /// An empty result with the provider marked failed.
    NoData,
    /// Panic inside `fetch`.
    Panic,
}

/// A provider that replays a fixed script.
pub struct ScriptedProvider<D: Domain> {
    id: ProviderId,
    available: bool,
    script: Script<D>,
    log: Option<CallLog>,
}

impl<D: Domain> ScriptedProvider<D> {
    pub fn new(id: &str, script: Script<D>) -> Self {
        Self {
            id: ProviderId::from(id),
            available: true,
            script,
            log: None,
        }
    }

    /// Provider returning depthless observations.
    pub fn returning(id: &str, observations: Vec<(D::Field, Observation<D::Tier>)>) -> Self {
        Self::new(
            id,
            Script::Observations(observations.into_iter().map(|(f, o)| (None, f, o)).collect()),
        )
    }

    pub fn no_data(id: &str) -> Self {
        Self::new(id, Script::NoData)
    }

    pub fn panicking(id: &str) -> Self {
        Self::new(id, Script::Panic)
    }

    /// Provider that reports itself unavailable for every request.
    pub fn unavailable(id: &str) -> Self {
        let mut provider = Self::new(id, Script::NoData);
        provider.available = false;
        provider
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn into_arc(self) -> Arc<dyn Provider<D>> {
        Arc::new(self)
    }
}

#[async_trait]
impl<D: Domain> Provider<D> for ScriptedProvider<D> {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn is_available(&self, _location: &Coordinates, _date: NaiveDate) -> bool {
        self.available
    }

    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<D> {
        self.fetch_at_depth(location, date, None).await
    }

    async fn fetch_at_depth(
        &self,
        location: &Coordinates,
        date: NaiveDate,
        depth: Option<DepthInterval>,
    ) -> DomainResult<D> {
        if let Some(log) = &self.log {
            log.push(self.id.clone());
        }
        match &self.script {
            Script::Observations(observations) => {
                let mut result = DomainResult::empty(*location, date);
                for (depth, field, observation) in observations {
                    result.insert_at(*depth, *field, observation.clone());
                }
                result
            }
            Script::AtRequestedDepth(observations) => {
                let layer = Some(depth.unwrap_or(DepthInterval::Cm0To5));
                let mut result = DomainResult::empty(*location, date);
                for (field, observation) in observations {
                    result.insert_at(layer, *field, observation.clone());
                }
                result
            }
            Script::NoData => DomainResult::failed(*location, date, self.id.clone()),
            Script::Panic => panic::panic_any(format!("scripted failure in {}", self.id)),
        }
    }
}

/// A provider whose availability check itself panics.
pub struct BrokenAvailabilityProvider {
    id: ProviderId,
}

impl BrokenAvailabilityProvider {
    pub fn new(id: &str) -> Self {
        Self { id: ProviderId::from(id) }
    }
}

#[async_trait]
impl<D: Domain> Provider<D> for BrokenAvailabilityProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn is_available(&self, _location: &Coordinates, _date: NaiveDate) -> bool {
        panic!("availability check failed for {}", self.id)
    }

    async fn fetch(&self, location: &Coordinates, date: NaiveDate) -> DomainResult<D> {
        DomainResult::failed(*location, date, self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{coords, collection_date, points, sst_observation};
    use reconciler::{Marine, MarineQuality};

    #[tokio::test]
    async fn test_scripted_provider_records_calls() {
        let log = CallLog::new();
        let provider = ScriptedProvider::<Marine>::returning(
            "noaa_oisst",
            vec![sst_observation(MarineQuality::SatelliteL4, "noaa_oisst")],
        )
        .with_log(&log);

        let result = provider.fetch(&coords(points::GREAT_LAKES), collection_date()).await;
        assert_eq!(result.overall_quality, MarineQuality::SatelliteL4);
        assert_eq!(log.calls(), vec!["noaa_oisst"]);
    }

    #[tokio::test]
    async fn test_no_data_provider_marks_itself_failed() {
        let provider = ScriptedProvider::<Marine>::no_data("gebco");
        let result = provider.fetch(&coords(points::GREAT_LAKES), collection_date()).await;
        assert!(result.is_empty());
        assert!(result.failed_providers.contains(&ProviderId::from("gebco")));
    }
}
