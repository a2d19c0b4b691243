//! Register command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use imprint_core::{LicensingInfo, MatcherConfig, RecordMetadata, WatermarkPayload};
use serde::Serialize;
use tracing::{info, warn};

use crate::exit_codes::CliError;
use crate::utils::{build_matcher, default_output_path, read_file, write_file};
use crate::{Output, RegistryArgs};

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Owner asset id recorded against the digest
    #[arg(long)]
    pub owner: String,

    #[arg(long)]
    pub title: Option<String>,

    /// Whether derivatives may be made
    #[arg(long, value_name = "BOOL")]
    pub derivatives_allowed: Option<bool>,

    /// Share of derivative revenue owed to the owner, in percent
    #[arg(long, value_name = "PERCENT")]
    pub revenue_share: Option<f64>,

    #[arg(long, value_name = "AMOUNT")]
    pub minting_fee: Option<f64>,

    /// Embed a watermark for the owner and register the watermarked PNG
    #[arg(long)]
    pub watermark: bool,

    /// Where to write the watermarked PNG (defaults to <IMAGE stem>.imprint.png)
    #[arg(short, long, requires = "watermark")]
    pub output: Option<PathBuf>,
}

impl RegisterArgs {
    fn metadata(&self) -> Result<RecordMetadata> {
        if let Some(share) = self.revenue_share {
            if !(0.0..=100.0).contains(&share) {
                return Err(CliError::Usage(format!(
                    "--revenue-share must be between 0 and 100, got {share}"
                ))
                .into());
            }
        }

        let licensing = (self.derivatives_allowed.is_some()
            || self.revenue_share.is_some()
            || self.minting_fee.is_some())
        .then(|| LicensingInfo {
            derivatives_allowed: self.derivatives_allowed,
            revenue_share: self.revenue_share,
            minting_fee: self.minting_fee,
            ..Default::default()
        });

        Ok(RecordMetadata {
            title: self.title.clone(),
            licensing_info: licensing,
            ..RecordMetadata::with_owner(self.owner.trim())
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterOutput {
    digest: String,
    perceptual_fingerprint: String,
    inserted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    watermarked_image: Option<PathBuf>,
}

/// Execute the register command.
pub async fn execute(args: RegisterArgs, registry: &RegistryArgs, out: Output) -> Result<()> {
    if args.owner.trim().is_empty() {
        return Err(CliError::Usage("--owner must not be empty".into()).into());
    }
    let metadata = args.metadata()?;
    let bytes = read_file(&args.image)?;

    let matcher = build_matcher(registry, MatcherConfig::default())?;

    let verdict = matcher
        .inspect_watermark(bytes.clone(), Some(args.owner.trim()))
        .await?;
    if verdict.block_registration {
        let owner = verdict
            .payload
            .map(|p| p.owner_asset_id)
            .unwrap_or_default();
        return Err(CliError::Blocked { owner }.into());
    }

    let payload = args
        .watermark
        .then(|| WatermarkPayload::new(args.owner.trim()));

    let registration = matcher
        .register(bytes, metadata, payload.as_ref())
        .await
        .context("Registration failed")?;

    let mut written = None;
    if let Some(png) = &registration.watermarked_image {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&args.image));
        write_file(&path, png)?;
        written = Some(path);
    }

    if registration.inserted {
        info!(digest = %registration.digest.short(), "Registered");
    } else {
        warn!(digest = %registration.digest.short(), "Already registered; metadata unchanged");
    }

    let report = RegisterOutput {
        digest: registration.digest.to_string(),
        perceptual_fingerprint: registration.perceptual_fingerprint.to_hex(),
        inserted: registration.inserted,
        watermarked_image: written,
    };
    if out.json(&report)? || !out.text() {
        return Ok(());
    }

    if report.inserted {
        println!("{}", "Registered".green().bold());
    } else {
        println!("{}", "Already registered".yellow().bold());
    }
    println!("   {} {}", "Digest:".dimmed(), report.digest);
    println!(
        "   {} {}",
        "Fingerprint:".dimmed(),
        report.perceptual_fingerprint
    );
    if let Some(path) = &report.watermarked_image {
        println!("   {} {}", "Watermarked:".dimmed(), path.display());
    }
    println!("   {} {}", "Registry:".dimmed(), matcher.registry().describe());
    Ok(())
}
