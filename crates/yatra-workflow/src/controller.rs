//! Workflow controller: the state machine driving one registration run.

use crate::error::WorkflowError;
use crate::form::{FormField, RegistrationForm};
use crate::reporter::LocationReporter;
use otp_client::{code_format_ok, OtpError, OtpProvider, VerificationChallenge};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use yatra_api::RegistrationApi;

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The backend rejected or failed the registration submission.
    RegistrationFailed,
}

/// Position of a run in the workflow. Exactly one per run, owned by the
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    CollectingForm,
    SendingOtp,
    AwaitingOtp,
    VerifyingOtp,
    SubmittingRegistration,
    ReportingLocation,
    Completed,
    Failed(FailureReason),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed(_))
    }

    fn name(&self) -> &'static str {
        match self {
            WorkflowState::CollectingForm => "CollectingForm",
            WorkflowState::SendingOtp => "SendingOtp",
            WorkflowState::AwaitingOtp => "AwaitingOtp",
            WorkflowState::VerifyingOtp => "VerifyingOtp",
            WorkflowState::SubmittingRegistration => "SubmittingRegistration",
            WorkflowState::ReportingLocation => "ReportingLocation",
            WorkflowState::Completed => "Completed",
            WorkflowState::Failed(_) => "Failed",
        }
    }
}

struct Inner {
    state: WorkflowState,
    form: RegistrationForm,
    challenge: Option<VerificationChallenge>,
    /// Set while an external operation is outstanding. Explicit, not
    /// derived from network state.
    busy: bool,
    /// Run generation. Bumped on abandon/restart so a completion from a
    /// superseded run cannot mutate state.
    run: u64,
}

impl Inner {
    fn reset(&mut self) {
        self.run += 1;
        self.busy = false;
        self.challenge = None;
        self.form = RegistrationForm::new();
        self.state = WorkflowState::CollectingForm;
    }
}

/// Drives one registration run: form capture, OTP request and confirmation,
/// authorized registration submission, then a best-effort location report.
///
/// One external operation may be outstanding at a time; a call arriving
/// while one is in flight fails fast with `WorkflowError::Busy`. The
/// internal lock is never held across an external await.
#[derive(Clone)]
pub struct WorkflowController {
    inner: Arc<Mutex<Inner>>,
    otp: Arc<dyn OtpProvider>,
    api: Arc<dyn RegistrationApi>,
    reporter: LocationReporter,
    country_code: String,
}

impl WorkflowController {
    pub fn new(
        otp: Arc<dyn OtpProvider>,
        api: Arc<dyn RegistrationApi>,
        reporter: LocationReporter,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: WorkflowState::CollectingForm,
                form: RegistrationForm::new(),
                challenge: None,
                busy: false,
                run: 0,
            })),
            otp,
            api,
            reporter,
            country_code: country_code.into(),
        }
    }

    /// Current workflow state.
    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state.clone()
    }

    /// Edit one form field. Only allowed while the form is being collected.
    pub async fn update_field(&self, field: FormField, value: &str) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().await;
        if inner.state != WorkflowState::CollectingForm {
            return Err(WorkflowError::InvalidTransition {
                state: inner.state.name(),
            });
        }
        inner.form.update(field, value)?;
        Ok(())
    }

    /// Validate the form and request an OTP challenge for the mobile number.
    ///
    /// Allowed from `CollectingForm` (first send) and `AwaitingOtp`
    /// (resend, replacing the pending challenge). A provider error returns
    /// the run to `CollectingForm` with the error surfaced.
    pub async fn send_otp(
        &self,
        anti_automation_proof: Option<&str>,
    ) -> Result<(), WorkflowError> {
        let (phone, run) = {
            let mut inner = self.inner.lock().await;
            if inner.busy {
                return Err(WorkflowError::Busy);
            }
            if !matches!(
                inner.state,
                WorkflowState::CollectingForm | WorkflowState::AwaitingOtp
            ) {
                return Err(WorkflowError::InvalidTransition {
                    state: inner.state.name(),
                });
            }

            // Every field must pass validation before SendingOtp is entered.
            inner.form.validate(&self.country_code)?;

            let phone = format!("{}{}", self.country_code, inner.form.mobile_number());
            inner.challenge = None;
            inner.busy = true;
            inner.state = WorkflowState::SendingOtp;
            (phone, inner.run)
        };

        let result = self.otp.request_challenge(&phone, anti_automation_proof).await;

        let mut inner = self.inner.lock().await;
        if inner.run != run {
            debug!("Dropping OTP challenge for an abandoned run");
            return Err(WorkflowError::Abandoned);
        }
        inner.busy = false;

        match result {
            Ok(challenge) => {
                inner.challenge = Some(challenge);
                inner.state = WorkflowState::AwaitingOtp;
                info!("OTP challenge issued, awaiting code");
                Ok(())
            }
            Err(e) => {
                inner.state = WorkflowState::CollectingForm;
                warn!(error = %e, "OTP request failed");
                Err(e.into())
            }
        }
    }

    /// Confirm the user-entered code, then drive the run forward through
    /// registration submission and the location report to a terminal state.
    ///
    /// A mismatched or expired code returns the run to `AwaitingOtp` so the
    /// user can re-enter or resend. A registration failure is terminal; a
    /// location failure is logged and the run still completes.
    pub async fn submit_code(&self, code: &str) -> Result<WorkflowState, WorkflowError> {
        // A malformed code never leaves AwaitingOtp or touches the provider.
        if !code_format_ok(code) {
            return Err(OtpError::InvalidCodeFormat.into());
        }

        let (challenge, record, run) = {
            let mut inner = self.inner.lock().await;
            if inner.busy {
                return Err(WorkflowError::Busy);
            }
            if inner.state != WorkflowState::AwaitingOtp {
                return Err(WorkflowError::InvalidTransition {
                    state: inner.state.name(),
                });
            }
            let challenge = inner
                .challenge
                .clone()
                .ok_or(WorkflowError::InvalidTransition {
                    state: inner.state.name(),
                })?;
            let record = inner.form.validate(&self.country_code)?;
            inner.busy = true;
            inner.state = WorkflowState::VerifyingOtp;
            (challenge, record, inner.run)
        };

        let verified = self.otp.confirm_challenge(&challenge, code).await;

        let identity = {
            let mut inner = self.inner.lock().await;
            if inner.run != run {
                return Err(WorkflowError::Abandoned);
            }
            match verified {
                Ok(identity) => {
                    // Busy stays set: the run continues straight into
                    // submission.
                    inner.state = WorkflowState::SubmittingRegistration;
                    identity
                }
                Err(e) => {
                    inner.busy = false;
                    inner.state = WorkflowState::AwaitingOtp;
                    warn!(error = %e, "OTP verification failed");
                    return Err(e.into());
                }
            }
        };

        info!(phone_number = %identity.phone_number, "Phone number verified");

        let submitted = self.api.submit_registration(&record, &identity).await;

        let registrant_id = {
            let mut inner = self.inner.lock().await;
            if inner.run != run {
                return Err(WorkflowError::Abandoned);
            }
            match submitted {
                Ok(receipt) => {
                    inner.state = WorkflowState::ReportingLocation;
                    receipt
                        .registrant_id
                        .unwrap_or_else(|| record.registration_number.clone())
                }
                Err(e) => {
                    // Registration is the value-bearing step: its failure is
                    // terminal and the location report is never attempted.
                    inner.busy = false;
                    inner.state = WorkflowState::Failed(FailureReason::RegistrationFailed);
                    warn!(error = %e, "Registration submission failed");
                    return Err(e.into());
                }
            }
        };

        info!(registrant_id = %registrant_id, "Registration accepted");

        let reported = self.reporter.capture_and_report(&registrant_id).await;

        let mut inner = self.inner.lock().await;
        if inner.run != run {
            return Err(WorkflowError::Abandoned);
        }
        inner.busy = false;
        inner.challenge = None;
        inner.state = WorkflowState::Completed;

        match reported {
            Ok(sample) => info!(
                latitude = sample.latitude,
                longitude = sample.longitude,
                "Workflow completed with location report"
            ),
            // Location is telemetry: its failure never reverses a completed
            // registration.
            Err(e) => warn!(error = %e, "Location report failed; registration stands"),
        }

        Ok(WorkflowState::Completed)
    }

    /// Abandon the current run (user navigated away). Outstanding
    /// operations are not cancelled; their completions become no-ops.
    pub async fn abandon(&self) {
        let mut inner = self.inner.lock().await;
        inner.reset();
        debug!("Workflow abandoned, state reset");
    }

    /// Start a fresh run after reaching a terminal state.
    pub async fn restart(&self) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                state: inner.state.name(),
            });
        }
        inner.reset();
        Ok(())
    }
}
