//! N1 Release - packages the application and publishes release artifacts.
//!
//! Exits 0 when the selected task completes (including a publish dry-run)
//! and 1 with a message naming the failing stage otherwise.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match n1_release::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error ({}): {}", e.stage(), e);
            1
        }
    };

    process::exit(exit_code);
}
