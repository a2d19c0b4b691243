//! Registry administration commands.

use anyhow::Result;
use colored::Colorize;
use imprint_core::ContentDigest;
use serde::Serialize;
use tracing::info;

use crate::exit_codes::CliError;
use crate::utils::{format_timestamp, open_registry};
use crate::{Output, RegistryArgs};

/// List every entry in registration order.
pub async fn list(args: &RegistryArgs, out: Output) -> Result<()> {
    let registry = open_registry(args)?;
    let entries = registry.list().await?;

    if out.json(&entries)? || !out.text() {
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "Registry is empty".dimmed());
        return Ok(());
    }

    for entry in &entries {
        let metadata = &entry.metadata;
        let fingerprint = metadata
            .perceptual_fingerprint
            .map(|f| f.to_hex())
            .unwrap_or_else(|| "-".repeat(16));
        let owner = metadata.owner_asset_id.as_deref().unwrap_or("-");
        let when = metadata
            .created_at
            .map(format_timestamp)
            .unwrap_or_default();
        println!(
            "{}  {}  {}  {}",
            entry.digest.short().bold(),
            fingerprint,
            owner,
            when.dimmed()
        );
    }
    println!("{} {}", entries.len(), "entries".dimmed());
    Ok(())
}

#[derive(Serialize)]
struct DeleteOutput {
    deleted: bool,
    digest: String,
}

/// Delete one entry. A missing digest is reported, not an error.
pub async fn delete(digest: &str, args: &RegistryArgs, out: Output) -> Result<()> {
    let digest = ContentDigest::parse(digest)?;
    let registry = open_registry(args)?;
    let deleted = registry.delete_by_digest(&digest).await?;
    info!(digest = %digest.short(), deleted, "Delete requested");

    let report = DeleteOutput {
        deleted,
        digest: digest.to_string(),
    };
    if out.json(&report)? || !out.text() {
        return Ok(());
    }

    if deleted {
        println!("{} {}", "Deleted".green().bold(), report.digest);
    } else {
        println!("{} {}", "Not registered:".yellow(), report.digest);
    }
    Ok(())
}

#[derive(Serialize)]
struct ClearOutput {
    cleared: usize,
}

/// Remove every entry. Requires `--yes`.
pub async fn clear(yes: bool, args: &RegistryArgs, out: Output) -> Result<()> {
    if !yes {
        return Err(CliError::Usage("refusing to clear the registry without --yes".into()).into());
    }

    let registry = open_registry(args)?;
    let cleared = registry.clear_all().await?;
    info!(cleared, "Registry cleared");

    let report = ClearOutput { cleared };
    if out.json(&report)? || !out.text() {
        return Ok(());
    }
    println!("{} {} entries", "Cleared".green().bold(), cleared);
    Ok(())
}
