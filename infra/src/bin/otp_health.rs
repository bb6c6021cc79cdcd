//! Store health check
//!
//! Loads configuration, builds the OTP service over Redis and reports whether
//! the store answers. Exits 0 when operational, 1 otherwise.

use anyhow::Context;
use std::process::ExitCode;

use otp_infra::{init_tracing, initialize, load_config};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = load_config().context("loading configuration")?;
    init_tracing(&config.logging).context("initializing tracing")?;

    let service = initialize(&config).context("building OTP service")?;

    if service.is_operational().await {
        println!("otp store: operational ({})", config.environment);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("otp store: unavailable ({})", config.environment);
        Ok(ExitCode::FAILURE)
    }
}
