//! Treasury CLI binary entrypoint.
//!
//! Lists proposals, shows approvers, exports CSV and walks a vote from
//! request to on-chain confirmation for Sputnik-DAO treasuries.

use sputnik_treasury::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging is installed by `cli::run` once the config is known
    cli::run().await
}
