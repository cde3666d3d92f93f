mod app;

use std::process::ExitCode;

use tracing::error;

use app::cli_args::{parse_args, usage_text};

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let command = match parse_args(&args) {
        Ok(Some(command)) => command,
        Ok(None) => {
            println!("{}", usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("error: {message}\n\n{}", usage_text());
            return ExitCode::from(2);
        }
    };

    match app::bootstrap::build_app(command) {
        Ok(wiring) => app::runner::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
