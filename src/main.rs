use std::process::ExitCode;

use quotesheet_lib::config::ServiceConfig;

#[tokio::main]
async fn main() -> ExitCode {
    quotesheet_lib::init_tracing();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match quotesheet_lib::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}
