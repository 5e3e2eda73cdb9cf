//! # ldap-roles
//!
//! Resolves the roles of a user against the configured directory and prints
//! them as a JSON array.
//!
//! ## Configuration
//!
//! - `--config` / `LDAP_ROLES_CONFIG` - TOML configuration file
//! - `RUST_LOG` - Log filter (overrides `--log-level`)

use anyhow::{Context, Result};
use clap::Parser;
use ldap_roles::{LdapDirectory, RoleLookup, RoleProviderConfig, RoleResolver};
use std::path::PathBuf;
use tracing::{error, info};

/// Directory role lookup CLI
#[derive(Parser)]
#[command(name = "ldap-roles")]
#[command(about = "Resolve a user's roles from LDAP group memberships")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/ldap-roles/roles.toml", env = "LDAP_ROLES_CONFIG")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Exit non-zero when the directory lookup fails instead of printing []
    #[arg(long)]
    strict: bool,

    /// User identifier to resolve
    user: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = RoleProviderConfig::load(&cli.config)?;
    config
        .validate()
        .context("Invalid configuration")?;

    info!(server = %config.directory.server, "Connecting to directory");
    let directory = LdapDirectory::connect(&config.directory)
        .await
        .context("Failed to establish directory session")?;

    let resolver = RoleResolver::from_config(directory, &config);

    let roles = match resolver.lookup_roles(&cli.user).await {
        RoleLookup::Failed(e) if cli.strict => {
            error!(error = %e, user = %cli.user, "Role lookup failed");
            return Err(e).context("Role lookup failed");
        }
        lookup => lookup.into_roles(),
    };

    println!("{}", serde_json::to_string(&roles)?);
    Ok(())
}
