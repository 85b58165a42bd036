//! HTTP client for the managed phone-verification provider.

use crate::error::OtpError;
use crate::types::{code_format_ok, OtpProvider, VerificationChallenge, VerifiedIdentity};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Client for an Identity-Toolkit-style phone verification REST API.
///
/// The consumed-token set is scoped to this client instance, so one client
/// per workflow session gives single-use challenge semantics without any
/// process-wide state.
#[derive(Clone)]
pub struct HttpOtpClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    consumed: Arc<Mutex<HashSet<String>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeRequest<'a> {
    phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmResponse {
    id_token: String,
    #[serde(default)]
    phone_number: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

impl HttpOtpClient {
    /// Create a new provider client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OtpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OtpError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: SecretString::new(api_key.into()),
            consumed: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Translate a non-2xx provider response into the error taxonomy.
    async fn provider_error(response: reqwest::Response) -> OtpError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProviderErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_default();

        warn!(status = %status, message = %message, "Provider rejected request");

        if status.as_u16() == 429
            || message.contains("QUOTA_EXCEEDED")
            || message.contains("TOO_MANY_ATTEMPTS_TRY_LATER")
        {
            return OtpError::RateLimited;
        }
        if message.contains("INVALID_PHONE_NUMBER") {
            return OtpError::InvalidPhoneNumber(message);
        }
        if message.contains("INVALID_CODE") || message.contains("INVALID_VERIFICATION_CODE") {
            return OtpError::CodeMismatch;
        }
        if message.contains("SESSION_EXPIRED") || message.contains("CODE_EXPIRED") {
            return OtpError::ChallengeExpired;
        }

        OtpError::ProviderUnavailable(format!("{} - {}", status, if message.is_empty() { body } else { message }))
    }
}

#[async_trait]
impl OtpProvider for HttpOtpClient {
    #[instrument(skip(self, anti_automation_proof))]
    async fn request_challenge(
        &self,
        phone_number: &str,
        anti_automation_proof: Option<&str>,
    ) -> Result<VerificationChallenge, OtpError> {
        let url = format!(
            "{}/v1/accounts:sendVerificationCode?key={}",
            self.base_url,
            self.api_key.expose_secret()
        );

        let request = SendCodeRequest {
            phone_number,
            recaptcha_token: anti_automation_proof,
        };

        debug!(phone_number = %phone_number, "Requesting OTP challenge");

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let body: SendCodeResponse = response.json().await.map_err(|e| {
            OtpError::ProviderUnavailable(format!("Failed to parse challenge response: {}", e))
        })?;

        debug!(phone_number = %phone_number, "OTP challenge issued");

        Ok(VerificationChallenge {
            challenge_token: body.session_info,
            target_phone_number: phone_number.to_string(),
            issued_at: Utc::now(),
        })
    }

    #[instrument(skip_all)]
    async fn confirm_challenge(
        &self,
        challenge: &VerificationChallenge,
        code: &str,
    ) -> Result<VerifiedIdentity, OtpError> {
        if !code_format_ok(code) {
            return Err(OtpError::InvalidCodeFormat);
        }

        if self.consumed.lock().await.contains(&challenge.challenge_token) {
            warn!("Challenge token already consumed, refusing replay");
            return Err(OtpError::ChallengeExpired);
        }

        let url = format!(
            "{}/v1/accounts:signInWithPhoneNumber?key={}",
            self.base_url,
            self.api_key.expose_secret()
        );

        let request = ConfirmRequest {
            session_info: &challenge.challenge_token,
            code,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let body: ConfirmResponse = response.json().await.map_err(|e| {
            OtpError::ProviderUnavailable(format!("Failed to parse confirmation response: {}", e))
        })?;

        self.consumed
            .lock()
            .await
            .insert(challenge.challenge_token.clone());

        debug!(phone_number = %challenge.target_phone_number, "Phone number verified");

        Ok(VerifiedIdentity {
            identity_token: SecretString::new(body.id_token),
            phone_number: body
                .phone_number
                .unwrap_or_else(|| challenge.target_phone_number.clone()),
        })
    }
}
