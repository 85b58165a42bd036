//! Registration workflow core for the Amarnath Yatra app.
//!
//! Drives one registrant from form capture, through out-of-band OTP
//! verification against the identity provider, to an authorized backend
//! registration and a best-effort one-shot location report.

pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod geo;
pub mod reporter;

pub use config::Config;
pub use controller::{FailureReason, WorkflowController, WorkflowState};
pub use error::{LocationError, ValidationError, WorkflowError};
pub use form::{FormField, RegistrationForm};
pub use geo::{Fix, PermissionStatus, PositionSource, StaticPositionSource};
pub use reporter::LocationReporter;
