// crates/allora-cli/src/commands/mod.rs
//
// Command module declarations for the Allora CLI, plus the context every
// command runs with.

pub mod init;
pub mod inspect;
pub mod register;
pub mod round;
pub mod topic;

use std::path::Path;

use allora_store::InMemoryLedger;

use crate::config::{expand_tilde, CliConfig};
use crate::output::OutputFormat;

/// Resolved configuration shared by all commands.
pub struct Context {
    pub config: CliConfig,
    /// Ledger snapshot path with `~` already expanded.
    pub ledger_path: String,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: CliConfig, ledger_override: Option<&str>, json: bool) -> Self {
        let ledger_path = expand_tilde(ledger_override.unwrap_or(&config.ledger_path));
        let format = if json { OutputFormat::Json } else { config.output_format() };
        Self {
            config,
            ledger_path,
            format,
        }
    }

    /// Load the ledger snapshot. Fails if `allora init` has not been run.
    pub fn load_ledger(&self) -> Result<InMemoryLedger, Box<dyn std::error::Error>> {
        if !Path::new(&self.ledger_path).exists() {
            return Err(format!(
                "No ledger at {}. Run `allora init` first.",
                self.ledger_path
            )
            .into());
        }
        Ok(InMemoryLedger::load(&self.ledger_path)?)
    }

    pub fn save_ledger(&self, ledger: &InMemoryLedger) -> Result<(), Box<dyn std::error::Error>> {
        ledger.save(&self.ledger_path)?;
        tracing::debug!("Saved ledger to {}", self.ledger_path);
        Ok(())
    }
}

/// Read a JSON file into `T`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(expand_tilde(path))
        .map_err(|e| format!("Could not read {}: {}", path, e))?;
    serde_json::from_str(&contents).map_err(|e| format!("Could not parse {}: {}", path, e).into())
}
