//! Default configuration dump

use anyhow::{Context, Result};
use cadence_runtime::LoopConfig;
use std::fs;
use std::path::Path;

pub fn run(output: Option<&Path>) -> Result<()> {
    let text = LoopConfig::default().to_toml_string()?;

    match output {
        Some(path) => {
            if path.exists() {
                anyhow::bail!("'{}' already exists", path.display());
            }
            fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default loop configuration to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
