//! Yatra registration kiosk - entry point.

use otp_client::{HttpOtpClient, OtpError};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yatra_api::{RegistrationApi, YatraApiClient};
use yatra_workflow::{
    Config, FormField, LocationReporter, StaticPositionSource, WorkflowController, WorkflowError,
};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Yatra registration workflow");

    if let Err(e) = run(config).await {
        error!("Workflow failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let otp = Arc::new(HttpOtpClient::new(
        &config.provider.api_url,
        &config.provider.api_key,
        config.provider.timeout,
    )?);
    let api = Arc::new(YatraApiClient::new(
        &config.backend.api_url,
        config.backend.timeout,
    )?);
    let source = Arc::new(StaticPositionSource::new(
        config.location.latitude,
        config.location.longitude,
    ));
    let reporter = LocationReporter::new(source, api.clone());
    let controller = WorkflowController::new(
        otp,
        api.clone(),
        reporter.clone(),
        &config.phone.country_code,
    );

    let mobile = prompt("Mobile number (10 digits): ")?;

    // A returning pilgrim skips registration and just refreshes their
    // location.
    let e164 = format!("{}{}", config.phone.country_code, mobile);
    match api.lookup_registrant(&e164).await {
        Ok(Some(status)) => {
            let registrant_id = status.registrant_id.unwrap_or_else(|| mobile.clone());
            info!(registrant_id = %registrant_id, "Registrant already known");
            println!("Already registered; sending a location update.");
            match reporter.capture_and_report(&registrant_id).await {
                Ok(_) => println!("Location update sent."),
                Err(e) => println!("Location update failed: {}", e),
            }
            return Ok(());
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Registrant lookup failed, continuing with registration"),
    }

    controller
        .update_field(FormField::MobileNumber, &mobile)
        .await?;

    let fields = [
        (FormField::FullName, "Full name"),
        (FormField::Gender, "Gender (Male/Female/Other)"),
        (FormField::DateOfBirth, "Date of birth (YYYY-MM-DD)"),
        (FormField::Address, "Address"),
        (FormField::RegistrationNumber, "Govt registration number (10 digits)"),
    ];
    for (field, label) in fields {
        loop {
            let value = prompt(&format!("{}: ", label))?;
            match controller.update_field(field, &value).await {
                Ok(()) => break,
                Err(e) => println!("{}", e),
            }
        }
    }

    // Send the OTP, re-prompting on validation errors.
    while let Err(e) = controller.send_otp(None).await {
        match e {
            WorkflowError::Validation(v) => {
                println!("{}", v);
                let value = prompt(&format!("{}: ", v.field))?;
                controller.update_field(v.field, &value).await?;
            }
            other => return Err(other.into()),
        }
    }
    println!("OTP sent to {}{}", config.phone.country_code, mobile);

    loop {
        let code = prompt("Enter the 6-digit OTP: ")?;
        match controller.submit_code(&code).await {
            Ok(state) => {
                println!("Registration complete ({:?}).", state);
                return Ok(());
            }
            Err(WorkflowError::Otp(e)) => match e {
                OtpError::ChallengeExpired => {
                    println!("Code expired; resending a fresh OTP.");
                    controller.send_otp(None).await?;
                }
                OtpError::InvalidCodeFormat | OtpError::CodeMismatch => {
                    println!("{}; try again.", e);
                }
                other => return Err(WorkflowError::Otp(other).into()),
            },
            Err(WorkflowError::Registration(e)) => {
                println!("Registration failed: {}", e);
                return Err(e.into());
            }
            Err(other) => return Err(other.into()),
        }
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
