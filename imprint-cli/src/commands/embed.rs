//! Embed command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use imprint_core::{digest, embed_watermark, WatermarkPayload};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::exit_codes::CliError;
use crate::utils::{default_output_path, read_file, write_file};
use crate::Output;

/// Watermark payload flags.
#[derive(Args, Debug, Clone)]
pub struct PayloadArgs {
    /// Owner asset id written into the watermark
    #[arg(long)]
    pub owner: String,

    /// License terms
    #[arg(long)]
    pub license: Option<String>,

    /// Attribution text
    #[arg(long)]
    pub attribution: Option<String>,

    /// Extra metadata as a JSON object
    #[arg(long, value_name = "JSON")]
    pub extra: Option<String>,
}

impl PayloadArgs {
    /// Build a payload stamped with the current time.
    pub fn to_payload(&self) -> Result<WatermarkPayload> {
        let owner = self.owner.trim();
        if owner.is_empty() {
            return Err(CliError::Usage("--owner must not be empty".into()).into());
        }

        let mut payload = WatermarkPayload::new(owner);
        if let Some(license) = &self.license {
            payload = payload.with_license_terms(license);
        }
        if let Some(attribution) = &self.attribution {
            payload = payload.with_attribution(attribution);
        }
        if let Some(extra) = &self.extra {
            payload.extra_metadata = parse_extra(extra)?;
        }
        Ok(payload)
    }
}

fn parse_extra(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::Usage("--extra must be a JSON object".into()).into()),
        Err(e) => Err(CliError::Usage(format!("--extra is not valid JSON: {e}")).into()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedOutput<'a> {
    output: PathBuf,
    digest: String,
    payload: &'a WatermarkPayload,
}

/// Execute the embed command.
pub fn execute(
    image: PathBuf,
    payload: PayloadArgs,
    output: Option<PathBuf>,
    out: Output,
) -> Result<()> {
    let payload = payload.to_payload()?;
    let bytes = read_file(&image)?;

    let marked = embed_watermark(&bytes, &payload)?;
    let output = output.unwrap_or_else(|| default_output_path(&image));
    write_file(&output, &marked)?;

    let marked_digest = digest(&marked);
    info!(
        path = %output.display(),
        owner = %payload.owner_asset_id,
        digest = %marked_digest.short(),
        "Embedded watermark"
    );

    let report = EmbedOutput {
        output,
        digest: marked_digest.to_string(),
        payload: &payload,
    };
    if out.json(&report)? || !out.text() {
        return Ok(());
    }

    println!("{}", "Watermark embedded".green().bold());
    println!("   {} {}", "Owner:".dimmed(), payload.owner_asset_id);
    println!("   {} {}", "Output:".dimmed(), report.output.display());
    println!("   {} {}", "Digest:".dimmed(), report.digest);
    Ok(())
}
