//! Workflow error taxonomy.

use crate::form::FormField;
use otp_client::OtpError;
use thiserror::Error;
use yatra_api::ApiError;

/// A field-level validation failure, recoverable by re-editing the form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: FormField,
    pub message: String,
}

/// Location acquisition and reporting errors.
///
/// Every member is non-fatal to the workflow: a registration that already
/// succeeded stands regardless of what happens here.
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Could not acquire a position fix: {0}")]
    FixUnavailable(String),

    #[error("Location report failed: {0}")]
    ReportFailed(String),
}

/// Errors surfaced by the workflow controller.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Registration(#[from] ApiError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("Another operation is already in flight")]
    Busy,

    #[error("Operation not allowed in state {state}")]
    InvalidTransition { state: &'static str },

    #[error("Workflow run was abandoned")]
    Abandoned,
}
