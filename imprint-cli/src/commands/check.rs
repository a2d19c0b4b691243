//! Check command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use imprint_core::{CandidateCheck, MatchType, MatcherConfig};
use tracing::info;

use crate::exit_codes::CliError;
use crate::utils::{build_matcher, format_timestamp, read_file};
use crate::{Output, RegistryArgs};

/// Execute the check command.
pub async fn execute(
    image: PathBuf,
    threshold: f64,
    fail_on_match: bool,
    registry: &RegistryArgs,
    out: Output,
) -> Result<()> {
    let config = MatcherConfig {
        similarity_threshold: threshold,
        record_matches: true,
        ..Default::default()
    };
    let matcher = build_matcher(registry, config)?;
    let bytes = read_file(&image)?;

    let check = matcher.check_candidate(bytes).await?;
    info!(
        found = check.found,
        match_type = %check.match_type,
        candidate = %check.candidate_digest.short(),
        "Checked candidate"
    );

    if !out.json(&check)? && out.text() {
        print_check(&check);
    }

    if check.found && fail_on_match {
        let digest = check
            .digest
            .map(|d| d.to_string())
            .unwrap_or_default();
        return Err(CliError::MatchFound(digest).into());
    }
    Ok(())
}

fn print_check(check: &CandidateCheck) {
    match check.match_type {
        MatchType::None => {
            println!("{}", "No match".green().bold());
            println!("   {} {}", "Digest:".dimmed(), check.candidate_digest);
            return;
        }
        MatchType::Exact => println!("{}", "Exact match".yellow().bold()),
        MatchType::Perceptual => println!("{}", "Perceptual match".yellow().bold()),
    }

    if let Some(digest) = &check.digest {
        println!("   {} {}", "Registered:".dimmed(), digest);
    }
    if let (Some(distance), Some(similarity)) = (check.distance, check.similarity) {
        println!(
            "   {} {:.1}% ({} bits)",
            "Similarity:".dimmed(),
            similarity,
            distance
        );
    }
    if let Some(metadata) = &check.metadata {
        if let Some(owner) = &metadata.owner_asset_id {
            println!("   {} {}", "Owner:".dimmed(), owner);
        }
        if let Some(title) = &metadata.title {
            println!("   {} {}", "Title:".dimmed(), title);
        }
        if let Some(created_at) = metadata.created_at {
            println!(
                "   {} {}",
                "Registered at:".dimmed(),
                format_timestamp(created_at)
            );
        }
    }
    let derivatives = match check.derivatives_allowed {
        Some(true) => "allowed".green(),
        Some(false) => "not allowed".red(),
        None => "needs review".yellow(),
    };
    println!("   {} {}", "Derivatives:".dimmed(), derivatives);
}
