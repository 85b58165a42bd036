//! Wire types for the Yatra backend API.

use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use otp_client::VerifiedIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registrant gender as collected on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

/// A validated registration, immutable once built and ready for submission.
///
/// Serializes to the camelCase body the backend expects; the date of birth
/// goes over the wire as an ISO-8601 date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub full_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub address: String,
    /// Government registration number, exactly 10 digits.
    pub registration_number: String,
    /// Verified phone number in E.164 format.
    pub phone_number: String,
}

/// Acknowledgement returned by a successful registration submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    #[serde(default)]
    pub registrant_id: Option<String>,
}

/// One device position report tied to a registrant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub registrant_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
}

/// Backend view of an already-registered pilgrim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantStatus {
    #[serde(default)]
    pub registrant_id: Option<String>,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub success: bool,
}

/// Backend registration and location API.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Submit a registration, authorized by a verified phone identity.
    /// Any 2xx response is success.
    async fn submit_registration(
        &self,
        record: &RegistrationRecord,
        identity: &VerifiedIdentity,
    ) -> Result<RegistrationReceipt, ApiError>;

    /// Send one location sample. Exactly one attempt; never retried.
    async fn report_location(&self, sample: &LocationSample) -> Result<(), ApiError>;

    /// Look up whether a phone number already belongs to a registrant.
    /// `None` means the number is unknown to the backend.
    async fn lookup_registrant(
        &self,
        phone_number: &str,
    ) -> Result<Option<RegistrantStatus>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parsing() {
        assert_eq!("Male".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" OTHER ".parse::<Gender>(), Ok(Gender::Other));
        assert!("".parse::<Gender>().is_err());
        assert!("unknown".parse::<Gender>().is_err());
    }

    #[test]
    fn test_registration_record_wire_format() {
        let record = RegistrationRecord {
            full_name: "A".into(),
            gender: Gender::Male,
            date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            address: "x".into(),
            registration_number: "1234567890".into(),
            phone_number: "+919876543210".into(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fullName"], "A");
        assert_eq!(json["gender"], "Male");
        assert_eq!(json["dateOfBirth"], "2000-01-01");
        assert_eq!(json["registrationNumber"], "1234567890");
        assert_eq!(json["phoneNumber"], "+919876543210");
    }

    #[test]
    fn test_location_sample_wire_format() {
        let sample = LocationSample {
            registrant_id: "1234567890".into(),
            latitude: 34.2268,
            longitude: 75.5008,
            captured_at: Utc::now(),
        };

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["registrantId"], "1234567890");
        assert!(json["capturedAt"].is_string());
    }
}
