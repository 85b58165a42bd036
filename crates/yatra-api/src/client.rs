//! HTTP client for the Yatra backend registration and location endpoints.

use crate::error::ApiError;
use crate::types::{
    LocationSample, RegistrantStatus, RegistrationApi, RegistrationReceipt, RegistrationRecord,
};
use async_trait::async_trait;
use otp_client::VerifiedIdentity;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Yatra backend REST API client.
#[derive(Clone)]
pub struct YatraApiClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    phone: &'a str,
}

impl YatraApiClient {
    /// Create a new backend client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RegistrationApi for YatraApiClient {
    #[instrument(skip(self, record, identity), fields(registration_number = %record.registration_number))]
    async fn submit_registration(
        &self,
        record: &RegistrationRecord,
        identity: &VerifiedIdentity,
    ) -> Result<RegistrationReceipt, ApiError> {
        let url = format!("{}/api/register", self.base_url);

        debug!("Submitting registration");

        let response = self
            .client
            .post(&url)
            .bearer_auth(identity.identity_token.expose_secret())
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Registration submission failed");

            return Err(ApiError::RegistrationFailed {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!("Registration accepted");

        // Success is any 2xx; the receipt body is optional.
        Ok(response.json().await.unwrap_or_default())
    }

    #[instrument(skip(self, sample), fields(registrant_id = %sample.registrant_id))]
    async fn report_location(&self, sample: &LocationSample) -> Result<(), ApiError> {
        let url = format!("{}/api/location", self.base_url);

        debug!(
            latitude = sample.latitude,
            longitude = sample.longitude,
            "Sending location sample"
        );

        let response = self.client.post(&url).json(sample).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Location report failed");

            return Err(ApiError::ReportFailed {
                status: status.as_u16(),
            });
        }

        debug!("Location sample accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn lookup_registrant(
        &self,
        phone_number: &str,
    ) -> Result<Option<RegistrantStatus>, ApiError> {
        let url = format!("{}/api/auth/login", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&LookupRequest {
                phone: phone_number,
            })
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Transport(format!(
                "Lookup failed: {} - {}",
                status, body
            )));
        }

        let status: RegistrantStatus = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if status.success || status.exists {
            Ok(Some(status))
        } else {
            Ok(None)
        }
    }
}
