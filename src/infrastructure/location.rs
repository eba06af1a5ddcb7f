//! Location collaborator.
//!
//! Position fixes come from a pluggable source; the service applies the
//! deadline policy on top. A cached fix wins immediately when present,
//! otherwise the live request races the deadline.

use crate::domain::models::Coordinates;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Failures surfaced by the location stack.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Timed out waiting for location")]
    Timeout,
    #[error("No location source available")]
    Unavailable,
}

/// A provider of position fixes.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Wait for a fresh fix.
    async fn current_location(&self) -> Result<Coordinates, LocationError>;

    /// Most recent fix already known, if any.
    fn last_known(&self) -> Option<Coordinates>;
}

pub struct LocationService {
    source: Arc<dyn LocationSource>,
    deadline: Duration,
}

impl LocationService {
    pub fn new(source: Arc<dyn LocationSource>, deadline: Duration) -> Self {
        Self { source, deadline }
    }

    /// Resolve a usable position within the deadline.
    pub async fn locate(&self) -> Result<Coordinates, LocationError> {
        if let Some(coords) = self.source.last_known() {
            return Ok(coords);
        }
        match timeout(self.deadline, self.source.current_location()).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        }
    }
}

/// Fixed coordinates from configuration. A stationary install's answer to
/// "last known position"; live GPS feeds plug in behind the same trait.
pub struct StaticLocation {
    coords: Option<Coordinates>,
}

impl StaticLocation {
    pub fn new(coords: Option<Coordinates>) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationSource for StaticLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        self.coords.ok_or(LocationError::Unavailable)
    }

    fn last_known(&self) -> Option<Coordinates> {
        self.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIENNA: Coordinates = Coordinates {
        latitude: 48.2082,
        longitude: 16.3738,
    };

    /// Source with no cache whose live fix never resolves.
    struct StalledSource;

    #[async_trait]
    impl LocationSource for StalledSource {
        async fn current_location(&self) -> Result<Coordinates, LocationError> {
            std::future::pending().await
        }

        fn last_known(&self) -> Option<Coordinates> {
            None
        }
    }

    #[tokio::test]
    async fn cached_fix_wins_immediately() {
        let service = LocationService::new(
            Arc::new(StaticLocation::new(Some(VIENNA))),
            Duration::from_millis(50),
        );
        assert_eq!(service.locate().await, Ok(VIENNA));
    }

    #[tokio::test]
    async fn stalled_source_times_out_with_reason() {
        let service = LocationService::new(Arc::new(StalledSource), Duration::from_millis(50));
        let err = service.locate().await.unwrap_err();
        assert_eq!(err, LocationError::Timeout);
        assert_eq!(err.to_string(), "Timed out waiting for location");
    }

    #[tokio::test]
    async fn unconfigured_static_source_is_unavailable() {
        let service = LocationService::new(
            Arc::new(StaticLocation::new(None)),
            Duration::from_millis(50),
        );
        assert_eq!(service.locate().await, Err(LocationError::Unavailable));
    }
}
