//! Device location platform boundary.

use crate::error::LocationError;
use async_trait::async_trait;

/// Outcome of a device location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// A one-shot device position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
}

impl Fix {
    /// Whether the coordinates are within valid WGS84 ranges.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Platform source of device position fixes.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Ask the platform for location permission.
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError>;

    /// Acquire a single position fix.
    async fn current_fix(&self) -> Result<Fix, LocationError>;
}

/// Position source with fixed coordinates, for kiosk deployments where the
/// device position is configured rather than sensed.
pub struct StaticPositionSource {
    fix: Fix,
}

impl StaticPositionSource {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            fix: Fix {
                latitude,
                longitude,
            },
        }
    }
}

#[async_trait]
impl PositionSource for StaticPositionSource {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_fix(&self) -> Result<Fix, LocationError> {
        Ok(self.fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_range_check() {
        assert!(Fix { latitude: 34.2268, longitude: 75.5008 }.in_range());
        assert!(Fix { latitude: -90.0, longitude: 180.0 }.in_range());
        assert!(!Fix { latitude: 90.5, longitude: 0.0 }.in_range());
        assert!(!Fix { latitude: 0.0, longitude: -180.5 }.in_range());
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticPositionSource::new(34.2268, 75.5008);
        assert_eq!(
            source.request_permission().await.unwrap(),
            PermissionStatus::Granted
        );
        let fix = source.current_fix().await.unwrap();
        assert_eq!(fix.latitude, 34.2268);
    }
}
