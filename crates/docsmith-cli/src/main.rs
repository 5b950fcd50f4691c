//! docsmith CLI entry point.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    docsmith_cli::run().await
}
