//! Types for the phone-verification boundary.

use crate::error::OtpError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// An outstanding OTP challenge issued by the identity provider.
///
/// The token is an opaque provider session identifier, valid for a single
/// successful confirmation. Expiry is the provider's policy and is not
/// tracked locally.
#[derive(Debug, Clone)]
pub struct VerificationChallenge {
    /// Opaque session token required to confirm the code.
    pub challenge_token: String,

    /// The phone number the code was sent to, in E.164 format.
    pub target_phone_number: String,

    /// When the challenge was issued.
    pub issued_at: DateTime<Utc>,
}

/// A verified phone identity produced by a successful code exchange.
///
/// The bearer token is stored as a `SecretString` so it never appears in
/// logs or debug output, and it is held in memory only.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub identity_token: SecretString,
    pub phone_number: String,
}

/// External phone-verification provider.
#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Request an OTP challenge for a phone number.
    ///
    /// `anti_automation_proof` is an opaque token satisfying the provider's
    /// bot check where one is required; acquiring it is the caller's
    /// platform concern.
    async fn request_challenge(
        &self,
        phone_number: &str,
        anti_automation_proof: Option<&str>,
    ) -> Result<VerificationChallenge, OtpError>;

    /// Exchange a challenge and the user-entered code for a verified
    /// identity. Implementations must reject a malformed code without
    /// contacting the provider, and must never replay a challenge token
    /// after a successful confirmation.
    async fn confirm_challenge(
        &self,
        challenge: &VerificationChallenge,
        code: &str,
    ) -> Result<VerifiedIdentity, OtpError>;
}

/// Check that a user-entered code is exactly six ASCII digits.
pub fn code_format_ok(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}
