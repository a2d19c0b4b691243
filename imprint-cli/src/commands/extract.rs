//! Extract command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use imprint_core::{extract_watermark, WatermarkVerdict};
use tracing::{info, warn};

use crate::exit_codes::CliError;
use crate::utils::{format_timestamp, read_file};
use crate::Output;

/// Execute the extract command.
///
/// A watermark belonging to someone other than `claimant` fails with a data
/// error after the verdict is printed.
pub fn execute(image: PathBuf, claimant: Option<String>, out: Output) -> Result<()> {
    let bytes = read_file(&image)?;
    let extraction = extract_watermark(&bytes)?;
    let verdict = WatermarkVerdict::from_extraction(extraction, claimant.as_deref());

    info!(
        found = verdict.found,
        confidence = verdict.confidence,
        blocked = verdict.block_registration,
        "Watermark inspected"
    );

    if !out.json(&verdict)? && out.text() {
        print_verdict(&verdict);
    }

    if verdict.block_registration {
        let owner = verdict
            .payload
            .map(|p| p.owner_asset_id)
            .unwrap_or_default();
        warn!(%owner, "Registration blocked");
        return Err(CliError::Blocked { owner }.into());
    }
    Ok(())
}

fn print_verdict(verdict: &WatermarkVerdict) {
    let Some(payload) = verdict.payload.as_ref().filter(|_| verdict.found) else {
        println!("{}", "No watermark found".dimmed());
        return;
    };

    println!("{}", "Watermark found".green().bold());
    println!("   {} {}", "Owner:".dimmed(), payload.owner_asset_id);
    if !payload.license_terms.is_empty() {
        println!("   {} {}", "License:".dimmed(), payload.license_terms);
    }
    if !payload.attribution_text.is_empty() {
        println!("   {} {}", "Attribution:".dimmed(), payload.attribution_text);
    }
    println!(
        "   {} {}",
        "Embedded at:".dimmed(),
        format_timestamp(payload.created_at)
    );
    println!(
        "   {} {:.1}%",
        "Confidence:".dimmed(),
        verdict.confidence * 100.0
    );
    if verdict.block_registration {
        println!("   {}", "Registration blocked for this claimant".red().bold());
    }
}
