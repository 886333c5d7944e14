use std::process::ExitCode;

use tracing::error;

mod bootstrap;
mod demo_world;
mod loop_runner;

pub(crate) fn run() -> ExitCode {
    let wiring = match bootstrap::build_host() {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    loop_runner::run(wiring)
}
