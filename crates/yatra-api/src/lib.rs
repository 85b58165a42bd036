//! Yatra backend API client: registration submission, location reporting,
//! and returning-pilgrim lookup.

mod client;
mod error;
mod types;

pub use client::YatraApiClient;
pub use error::ApiError;
pub use types::{
    Gender, LocationSample, RegistrantStatus, RegistrationApi, RegistrationReceipt,
    RegistrationRecord,
};
