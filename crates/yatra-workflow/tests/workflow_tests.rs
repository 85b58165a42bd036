//! Controller state-machine tests with in-process fakes at the three
//! external boundaries.

use async_trait::async_trait;
use chrono::Utc;
use otp_client::{
    code_format_ok, OtpError, OtpProvider, VerificationChallenge, VerifiedIdentity,
};
use secrecy::SecretString;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use yatra_api::{
    ApiError, LocationSample, RegistrantStatus, RegistrationApi, RegistrationReceipt,
    RegistrationRecord,
};
use yatra_workflow::{
    FailureReason, Fix, FormField, LocationError, LocationReporter, PermissionStatus,
    PositionSource, WorkflowController, WorkflowError, WorkflowState,
};

#[derive(Clone, Copy)]
enum RequestMode {
    Accept,
    Unavailable,
}

/// Fake identity provider accepting a single configured code.
struct FakeOtpProvider {
    request_mode: RequestMode,
    accepted_code: String,
    request_delay: Option<Duration>,
    issued: AtomicUsize,
    consumed: Mutex<HashSet<String>>,
}

impl FakeOtpProvider {
    fn accepting(code: &str) -> Arc<Self> {
        Arc::new(Self {
            request_mode: RequestMode::Accept,
            accepted_code: code.into(),
            request_delay: None,
            issued: AtomicUsize::new(0),
            consumed: Mutex::new(HashSet::new()),
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            request_mode: RequestMode::Unavailable,
            accepted_code: String::new(),
            request_delay: None,
            issued: AtomicUsize::new(0),
            consumed: Mutex::new(HashSet::new()),
        })
    }

    fn slow(code: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            request_mode: RequestMode::Accept,
            accepted_code: code.into(),
            request_delay: Some(delay),
            issued: AtomicUsize::new(0),
            consumed: Mutex::new(HashSet::new()),
        })
    }

    fn challenges_issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpProvider for FakeOtpProvider {
    async fn request_challenge(
        &self,
        phone_number: &str,
        _anti_automation_proof: Option<&str>,
    ) -> Result<VerificationChallenge, OtpError> {
        if let Some(delay) = self.request_delay {
            tokio::time::sleep(delay).await;
        }
        match self.request_mode {
            RequestMode::Unavailable => Err(OtpError::ProviderUnavailable("down".into())),
            RequestMode::Accept => {
                let n = self.issued.fetch_add(1, Ordering::SeqCst);
                Ok(VerificationChallenge {
                    challenge_token: format!("session-{}", n),
                    target_phone_number: phone_number.to_string(),
                    issued_at: Utc::now(),
                })
            }
        }
    }

    async fn confirm_challenge(
        &self,
        challenge: &VerificationChallenge,
        code: &str,
    ) -> Result<VerifiedIdentity, OtpError> {
        if !code_format_ok(code) {
            return Err(OtpError::InvalidCodeFormat);
        }
        if self.consumed.lock().await.contains(&challenge.challenge_token) {
            return Err(OtpError::ChallengeExpired);
        }
        if code != self.accepted_code {
            return Err(OtpError::CodeMismatch);
        }
        self.consumed
            .lock()
            .await
            .insert(challenge.challenge_token.clone());
        Ok(VerifiedIdentity {
            identity_token: SecretString::new("fake-identity-token".into()),
            phone_number: challenge.target_phone_number.clone(),
        })
    }
}

/// Fake backend recording submissions and location samples.
struct FakeBackend {
    register_status: u16,
    location_status: u16,
    receipt_id: Option<String>,
    submissions: Mutex<Vec<RegistrationRecord>>,
    locations: Mutex<Vec<LocationSample>>,
}

impl FakeBackend {
    fn healthy() -> Arc<Self> {
        Self::with_statuses(200, 200)
    }

    fn with_statuses(register_status: u16, location_status: u16) -> Arc<Self> {
        Arc::new(Self {
            register_status,
            location_status,
            receipt_id: Some("reg-42".into()),
            submissions: Mutex::new(Vec::new()),
            locations: Mutex::new(Vec::new()),
        })
    }

    fn without_receipt_id() -> Arc<Self> {
        Arc::new(Self {
            register_status: 200,
            location_status: 200,
            receipt_id: None,
            submissions: Mutex::new(Vec::new()),
            locations: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RegistrationApi for FakeBackend {
    async fn submit_registration(
        &self,
        record: &RegistrationRecord,
        _identity: &VerifiedIdentity,
    ) -> Result<RegistrationReceipt, ApiError> {
        if !(200..300).contains(&self.register_status) {
            return Err(ApiError::RegistrationFailed {
                status: self.register_status,
                message: "rejected".into(),
            });
        }
        self.submissions.lock().await.push(record.clone());
        Ok(RegistrationReceipt {
            registrant_id: self.receipt_id.clone(),
        })
    }

    async fn report_location(&self, sample: &LocationSample) -> Result<(), ApiError> {
        if !(200..300).contains(&self.location_status) {
            return Err(ApiError::ReportFailed {
                status: self.location_status,
            });
        }
        self.locations.lock().await.push(sample.clone());
        Ok(())
    }

    async fn lookup_registrant(
        &self,
        _phone_number: &str,
    ) -> Result<Option<RegistrantStatus>, ApiError> {
        Ok(None)
    }
}

/// Fake device position source.
struct FakePosition {
    permission: PermissionStatus,
    fix: Fix,
}

impl FakePosition {
    fn granted() -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Granted,
            fix: Fix {
                latitude: 34.2268,
                longitude: 75.5008,
            },
        })
    }

    fn denied() -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Denied,
            fix: Fix {
                latitude: 0.0,
                longitude: 0.0,
            },
        })
    }
}

#[async_trait]
impl PositionSource for FakePosition {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(self.permission)
    }

    async fn current_fix(&self) -> Result<Fix, LocationError> {
        Ok(self.fix)
    }
}

fn build_controller(
    otp: Arc<FakeOtpProvider>,
    backend: Arc<FakeBackend>,
    position: Arc<FakePosition>,
) -> WorkflowController {
    let reporter = LocationReporter::new(position, backend.clone());
    WorkflowController::new(otp, backend, reporter, "+91")
}

async fn fill_valid_form(controller: &WorkflowController) {
    let fields = [
        (FormField::FullName, "A"),
        (FormField::Gender, "Male"),
        (FormField::DateOfBirth, "2000-01-01"),
        (FormField::Address, "x"),
        (FormField::RegistrationNumber, "1234567890"),
        (FormField::MobileNumber, "9876543210"),
    ];
    for (field, value) in fields {
        controller.update_field(field, value).await.unwrap();
    }
}

#[tokio::test]
async fn test_scenario_a_happy_path() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::healthy();
    let controller = build_controller(otp, backend.clone(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();
    assert_eq!(controller.state().await, WorkflowState::AwaitingOtp);

    let state = controller.submit_code("123456").await.unwrap();
    assert_eq!(state, WorkflowState::Completed);
    assert_eq!(controller.state().await, WorkflowState::Completed);

    let submissions = backend.submissions.lock().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].phone_number, "+919876543210");
    assert_eq!(submissions[0].registration_number, "1234567890");

    let locations = backend.locations.lock().await;
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].registrant_id, "reg-42");
    assert_eq!(locations[0].latitude, 34.2268);
}

#[tokio::test]
async fn test_registrant_id_falls_back_to_registration_number() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::without_receipt_id();
    let controller = build_controller(otp, backend.clone(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();
    controller.submit_code("123456").await.unwrap();

    let locations = backend.locations.lock().await;
    assert_eq!(locations[0].registrant_id, "1234567890");
}

#[tokio::test]
async fn test_scenario_b_code_mismatch_allows_retry() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::healthy();
    let controller = build_controller(otp, backend.clone(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();

    let result = controller.submit_code("000000").await;
    assert!(matches!(
        result,
        Err(WorkflowError::Otp(OtpError::CodeMismatch))
    ));
    assert_eq!(controller.state().await, WorkflowState::AwaitingOtp);

    // No identity was verified, so nothing may have been submitted.
    assert!(backend.submissions.lock().await.is_empty());

    // Retrying with the right code completes the run.
    let state = controller.submit_code("123456").await.unwrap();
    assert_eq!(state, WorkflowState::Completed);
}

#[tokio::test]
async fn test_scenario_c_registration_failure_is_terminal() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::with_statuses(500, 200);
    let controller = build_controller(otp, backend.clone(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();

    let result = controller.submit_code("123456").await;
    assert!(matches!(result, Err(WorkflowError::Registration(_))));
    assert_eq!(
        controller.state().await,
        WorkflowState::Failed(FailureReason::RegistrationFailed)
    );

    // The location report must never be attempted after a failed
    // registration.
    assert!(backend.locations.lock().await.is_empty());
}

#[tokio::test]
async fn test_scenario_d_permission_denied_still_completes() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::healthy();
    let controller = build_controller(otp, backend.clone(), FakePosition::denied());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();

    let state = controller.submit_code("123456").await.unwrap();
    assert_eq!(state, WorkflowState::Completed);
    assert_eq!(backend.submissions.lock().await.len(), 1);
    assert!(backend.locations.lock().await.is_empty());
}

#[tokio::test]
async fn test_location_report_failure_still_completes() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::with_statuses(200, 503);
    let controller = build_controller(otp, backend.clone(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();

    let state = controller.submit_code("123456").await.unwrap();
    assert_eq!(state, WorkflowState::Completed);
}

#[tokio::test]
async fn test_send_otp_requires_valid_form() {
    let otp = FakeOtpProvider::accepting("123456");
    let controller = build_controller(otp.clone(), FakeBackend::healthy(), FakePosition::granted());

    let result = controller.send_otp(None).await;
    match result {
        Err(WorkflowError::Validation(e)) => assert_eq!(e.field, FormField::FullName),
        other => panic!("expected validation error, got {:?}", other),
    }

    fill_valid_form(&controller).await;
    controller
        .update_field(FormField::MobileNumber, "98765")
        .await
        .unwrap();
    let result = controller.send_otp(None).await;
    match result {
        Err(WorkflowError::Validation(e)) => assert_eq!(e.field, FormField::MobileNumber),
        other => panic!("expected validation error, got {:?}", other),
    }

    // No challenge may have been requested for an invalid form.
    assert_eq!(otp.challenges_issued(), 0);
    assert_eq!(controller.state().await, WorkflowState::CollectingForm);
}

#[tokio::test]
async fn test_form_frozen_after_leaving_collecting_form() {
    let otp = FakeOtpProvider::accepting("123456");
    let controller = build_controller(otp, FakeBackend::healthy(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();

    let result = controller.update_field(FormField::FullName, "B").await;
    assert!(matches!(
        result,
        Err(WorkflowError::InvalidTransition { state: "AwaitingOtp" })
    ));
}

#[tokio::test]
async fn test_provider_error_returns_to_collecting_form() {
    let otp = FakeOtpProvider::unavailable();
    let controller = build_controller(otp, FakeBackend::healthy(), FakePosition::granted());

    fill_valid_form(&controller).await;
    let result = controller.send_otp(None).await;
    assert!(matches!(
        result,
        Err(WorkflowError::Otp(OtpError::ProviderUnavailable(_)))
    ));
    assert_eq!(controller.state().await, WorkflowState::CollectingForm);

    // The form survives, so the user can simply resend.
    let result = controller.send_otp(None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_resend_replaces_pending_challenge() {
    let otp = FakeOtpProvider::accepting("123456");
    let controller = build_controller(otp.clone(), FakeBackend::healthy(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();
    controller.send_otp(None).await.unwrap();

    assert_eq!(otp.challenges_issued(), 2);
    assert_eq!(controller.state().await, WorkflowState::AwaitingOtp);

    let state = controller.submit_code("123456").await.unwrap();
    assert_eq!(state, WorkflowState::Completed);
}

#[tokio::test]
async fn test_malformed_code_rejected_locally() {
    let otp = FakeOtpProvider::accepting("123456");
    let controller = build_controller(otp, FakeBackend::healthy(), FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();

    for code in ["12345", "1234567", "12a456"] {
        let result = controller.submit_code(code).await;
        assert!(matches!(
            result,
            Err(WorkflowError::Otp(OtpError::InvalidCodeFormat))
        ));
        assert_eq!(controller.state().await, WorkflowState::AwaitingOtp);
    }
}

#[tokio::test]
async fn test_busy_rejects_reentry() {
    let otp = FakeOtpProvider::slow("123456", Duration::from_millis(200));
    let controller = build_controller(otp, FakeBackend::healthy(), FakePosition::granted());

    fill_valid_form(&controller).await;

    let background = controller.clone();
    let handle = tokio::spawn(async move { background.send_otp(None).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.state().await, WorkflowState::SendingOtp);

    // Double-tap while the request is outstanding.
    let result = controller.send_otp(None).await;
    assert!(matches!(result, Err(WorkflowError::Busy)));

    handle.await.unwrap().unwrap();
    assert_eq!(controller.state().await, WorkflowState::AwaitingOtp);
}

#[tokio::test]
async fn test_abandoned_run_completion_is_noop() {
    let otp = FakeOtpProvider::slow("123456", Duration::from_millis(200));
    let controller = build_controller(otp, FakeBackend::healthy(), FakePosition::granted());

    fill_valid_form(&controller).await;

    let background = controller.clone();
    let handle = tokio::spawn(async move { background.send_otp(None).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.abandon().await;

    // The late completion must not resurrect the superseded run.
    let result = handle.await.unwrap();
    assert!(matches!(result, Err(WorkflowError::Abandoned)));
    assert_eq!(controller.state().await, WorkflowState::CollectingForm);

    // And no stale challenge is accepted afterwards.
    let result = controller.submit_code("123456").await;
    assert!(matches!(
        result,
        Err(WorkflowError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_restart_after_failure() {
    let otp = FakeOtpProvider::accepting("123456");
    let backend = FakeBackend::with_statuses(500, 200);
    let controller = build_controller(otp, backend, FakePosition::granted());

    fill_valid_form(&controller).await;
    controller.send_otp(None).await.unwrap();
    let _ = controller.submit_code("123456").await;
    assert_eq!(
        controller.state().await,
        WorkflowState::Failed(FailureReason::RegistrationFailed)
    );

    // Restart is only offered from a terminal state.
    controller.restart().await.unwrap();
    assert_eq!(controller.state().await, WorkflowState::CollectingForm);
    controller
        .update_field(FormField::FullName, "A")
        .await
        .unwrap();

    let result = controller.restart().await;
    assert!(matches!(
        result,
        Err(WorkflowError::InvalidTransition { .. })
    ));
}
