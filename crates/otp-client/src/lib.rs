//! Phone-verification (OTP) client for the Yatra registration workflow.
//!
//! Wraps the managed identity provider behind the two-call
//! `requestChallenge` / `confirmChallenge` contract: any provider that can
//! deliver an SMS code and exchange it for a bearer token fits.

mod client;
mod error;
mod types;

pub use client::HttpOtpClient;
pub use error::OtpError;
pub use types::{code_format_ok, OtpProvider, VerificationChallenge, VerifiedIdentity};
