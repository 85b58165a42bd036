//! Registration form state and validation.

use crate::error::ValidationError;
use chrono::NaiveDate;
use std::fmt;
use yatra_api::{Gender, RegistrationRecord};

/// A single field of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    FullName,
    Gender,
    DateOfBirth,
    Address,
    RegistrationNumber,
    MobileNumber,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FormField::FullName => "Full name",
            FormField::Gender => "Gender",
            FormField::DateOfBirth => "Date of birth",
            FormField::Address => "Address",
            FormField::RegistrationNumber => "Govt registration number",
            FormField::MobileNumber => "Mobile number",
        };
        write!(f, "{}", label)
    }
}

/// Draft registrant fields, mutable only while the workflow is collecting
/// the form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    full_name: String,
    gender: Option<Gender>,
    date_of_birth: Option<NaiveDate>,
    address: String,
    registration_number: String,
    mobile_number: String,
}

fn is_ten_digits(s: &str) -> bool {
    s.len() == 10 && s.chars().all(|c| c.is_ascii_digit())
}

impl RegistrationForm {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field from its user-entered text.
    ///
    /// Gender and date of birth are parsed on entry; a parse failure names
    /// the offending field. No other rule is checked here.
    pub fn update(&mut self, field: FormField, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        match field {
            FormField::FullName => self.full_name = value.to_string(),
            FormField::Gender => {
                self.gender = Some(value.parse().map_err(|message| ValidationError {
                    field,
                    message,
                })?)
            }
            FormField::DateOfBirth => {
                self.date_of_birth = Some(
                    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError {
                        field,
                        message: "Date of birth must be a valid YYYY-MM-DD date".into(),
                    })?,
                )
            }
            FormField::Address => self.address = value.to_string(),
            FormField::RegistrationNumber => self.registration_number = value.to_string(),
            FormField::MobileNumber => self.mobile_number = value.to_string(),
        }
        Ok(())
    }

    /// The raw mobile number as entered, without the country calling code.
    pub fn mobile_number(&self) -> &str {
        &self.mobile_number
    }

    /// Validate the draft, checking rules in fixed order: every field
    /// present, then the registration number format, then the mobile number
    /// format. Success yields the immutable record ready for submission,
    /// with the country calling code applied to the phone number.
    pub fn validate(&self, country_code: &str) -> Result<RegistrationRecord, ValidationError> {
        let required = |field: FormField| ValidationError {
            field,
            message: format!("{} is required", field),
        };

        if self.full_name.is_empty() {
            return Err(required(FormField::FullName));
        }
        let gender = self.gender.ok_or_else(|| required(FormField::Gender))?;
        let date_of_birth = self
            .date_of_birth
            .ok_or_else(|| required(FormField::DateOfBirth))?;
        if self.address.is_empty() {
            return Err(required(FormField::Address));
        }
        if self.registration_number.is_empty() {
            return Err(required(FormField::RegistrationNumber));
        }
        if self.mobile_number.is_empty() {
            return Err(required(FormField::MobileNumber));
        }

        if !is_ten_digits(&self.registration_number) {
            return Err(ValidationError {
                field: FormField::RegistrationNumber,
                message: "Govt registration number must be 10 digits".into(),
            });
        }
        if !is_ten_digits(&self.mobile_number) {
            return Err(ValidationError {
                field: FormField::MobileNumber,
                message: "Mobile number must be 10 digits".into(),
            });
        }

        Ok(RegistrationRecord {
            full_name: self.full_name.clone(),
            gender,
            date_of_birth,
            address: self.address.clone(),
            registration_number: self.registration_number.clone(),
            phone_number: format!("{}{}", country_code, self.mobile_number),
        })
    }
}
