//! Command-line interface for the `frontdesk` binary.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use fd_domain::config::{Config, ConfigSeverity};

#[derive(Parser)]
#[command(name = "frontdesk", about = "Conversational reservation agent gateway")]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "frontdesk.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Config inspection commands.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the version and exit.
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate the config file and report issues.
    Validate,
}

/// Load the config file, falling back to defaults when it does not exist.
///
/// A file that exists but does not parse is an error — silently running
/// with defaults against a typo'd config is worse than refusing to start.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "config file not found, using defaults"
        );
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
    Ok(config)
}

/// Print validation issues. Returns `false` when any issue is an error.
pub fn validate(config: &Config, path: &Path) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{}: OK", path.display());
        return true;
    }
    for issue in &issues {
        println!("{issue}");
    }
    !issues.iter().any(|i| i.severity == ConfigSeverity::Error)
}
