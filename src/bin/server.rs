use std::process::ExitCode;

use storefront::config::Config;
use storefront::stub;
use storefront::telemetry::setup_tracing;
use tracing::error;

fn main() -> ExitCode {
    setup_tracing("info");

    let result = Config::load().and_then(|config| stub::run(&config.api_addr, config.workers));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Stub backend failed");
            ExitCode::FAILURE
        }
    }
}
