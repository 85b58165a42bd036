//! Backend API errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Registration rejected: {status} - {message}")]
    RegistrationFailed { status: u16, message: String },

    #[error("Location report rejected: {status}")]
    ReportFailed { status: u16 },

    #[error("Backend transport error: {0}")]
    Transport(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}
