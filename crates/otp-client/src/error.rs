//! OTP verification errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtpError {
    #[error("Verification provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Too many verification attempts, try again later")]
    RateLimited,

    #[error("Verification code must be exactly 6 digits")]
    InvalidCodeFormat,

    #[error("Verification code does not match")]
    CodeMismatch,

    #[error("Challenge expired or already consumed")]
    ChallengeExpired,
}

impl From<reqwest::Error> for OtpError {
    fn from(e: reqwest::Error) -> Self {
        OtpError::ProviderUnavailable(e.to_string())
    }
}
