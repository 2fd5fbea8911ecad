// crates/allora-cli/src/commands/init.rs
//
// `allora init`: write a default config and an empty ledger snapshot.

use std::fs;
use std::path::Path;

use allora_store::InMemoryLedger;

use super::Context;
use crate::config::{expand_tilde, CliConfig};

/// Run the init command.
///
/// Existing files are left alone unless `force` is set.
pub fn run(ctx: &Context, config_path: &str, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = expand_tilde(config_path);
    if Path::new(&config_path).exists() && !force {
        println!("Config already exists at {}", config_path);
    } else {
        if let Some(parent) = Path::new(&config_path).parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, CliConfig::default().to_toml()?)?;
        println!("Wrote default config to {}", config_path);
    }

    if Path::new(&ctx.ledger_path).exists() && !force {
        println!("Ledger already exists at {}", ctx.ledger_path);
    } else {
        ctx.save_ledger(&InMemoryLedger::new())?;
        println!("Created empty ledger at {}", ctx.ledger_path);
    }
    Ok(())
}
