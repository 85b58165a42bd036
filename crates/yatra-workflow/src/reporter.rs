//! One-shot location capture and report.

use crate::error::LocationError;
use crate::geo::{PermissionStatus, PositionSource};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};
use yatra_api::{ApiError, LocationSample, RegistrationApi};

/// Captures one device position and reports it to the backend, tagged with
/// the registrant identifier.
///
/// Best-effort telemetry: exactly one send attempt, no retry queue, and no
/// background reporting.
#[derive(Clone)]
pub struct LocationReporter {
    source: Arc<dyn PositionSource>,
    api: Arc<dyn RegistrationApi>,
}

impl LocationReporter {
    pub fn new(source: Arc<dyn PositionSource>, api: Arc<dyn RegistrationApi>) -> Self {
        Self { source, api }
    }

    #[instrument(skip(self))]
    pub async fn capture_and_report(
        &self,
        registrant_id: &str,
    ) -> Result<LocationSample, LocationError> {
        match self.source.request_permission().await? {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => return Err(LocationError::PermissionDenied),
        }

        let fix = self.source.current_fix().await?;
        if !fix.in_range() {
            return Err(LocationError::FixUnavailable(format!(
                "Fix out of range: {}, {}",
                fix.latitude, fix.longitude
            )));
        }

        let sample = LocationSample {
            registrant_id: registrant_id.to_string(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            captured_at: Utc::now(),
        };

        self.api.report_location(&sample).await.map_err(|e| match e {
            ApiError::ReportFailed { status } => {
                LocationError::ReportFailed(format!("Backend returned {}", status))
            }
            other => LocationError::ReportFailed(other.to_string()),
        })?;

        debug!(registrant_id = %registrant_id, "Location sample reported");
        Ok(sample)
    }
}
