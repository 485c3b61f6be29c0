//! `continuum init` -- write the default configuration template.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::infrastructure::ConfigLoader;

/// Arguments for `continuum init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to place the configuration in.
    #[arg(long, default_value = ".continuum")]
    pub dir: PathBuf,

    /// Overwrite an existing configuration.
    #[arg(long)]
    pub force: bool,
}

/// Execute `continuum init`.
pub async fn execute(args: InitArgs, json: bool) -> Result<()> {
    let path = args.dir.join("config.yaml");
    if path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    tokio::fs::create_dir_all(&args.dir)
        .await
        .with_context(|| format!("failed to create {}", args.dir.display()))?;
    let template = ConfigLoader::default_template()?;
    tokio::fs::write(&path, template)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "written": path.display().to_string() })
        );
    } else {
        println!("Wrote default configuration to {}", path.display());
    }
    Ok(())
}
