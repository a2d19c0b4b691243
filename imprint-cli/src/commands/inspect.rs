//! Stateless inspection commands: digest, fingerprint and compare.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use imprint_core::fingerprint::digest_file;
use imprint_core::{
    is_match, similarity_percent, DigestAlgorithm, ImprintError, PerceptualFingerprint,
    PerceptualHasher,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::exit_codes::CliError;
use crate::utils::read_file;
use crate::Output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DigestOutput {
    file: PathBuf,
    algorithm: DigestAlgorithm,
    digest: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintOutput {
    image: PathBuf,
    perceptual_fingerprint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareOutput {
    first: String,
    second: String,
    distance: u32,
    similarity: f64,
    threshold: f64,
    is_match: bool,
}

/// Print the exact digest of a file, streamed from disk.
pub fn digest(file: PathBuf, algorithm: DigestAlgorithm, out: Output) -> Result<()> {
    let digest = digest_file(algorithm, &file).map_err(|e| match e {
        ImprintError::Io(source) => anyhow::Error::from(CliError::Input {
            path: file.clone(),
            source,
        }),
        other => anyhow::Error::from(other),
    })?;

    info!(path = %file.display(), digest = %digest.short(), "Computed digest");

    let report = DigestOutput {
        file,
        algorithm,
        digest: digest.to_string(),
    };
    if out.json(&report)? {
        return Ok(());
    }

    if out.quiet {
        println!("{}", report.digest);
    } else {
        println!("{}  {}", report.digest.bold(), report.file.display());
    }
    Ok(())
}

fn fingerprint_file(path: &Path) -> Result<PerceptualFingerprint> {
    let bytes = read_file(path)?;
    PerceptualHasher::default()
        .hash_bytes(&bytes)
        .with_context(|| format!("Cannot fingerprint {}", path.display()))
}

/// Print the perceptual fingerprint of an image.
pub fn fingerprint(image: PathBuf, out: Output) -> Result<()> {
    let fingerprint = fingerprint_file(&image)?;
    info!(path = %image.display(), fingerprint = %fingerprint, "Computed fingerprint");

    let report = FingerprintOutput {
        image,
        perceptual_fingerprint: fingerprint.to_hex(),
    };
    if out.json(&report)? {
        return Ok(());
    }

    if out.quiet {
        println!("{}", report.perceptual_fingerprint);
    } else {
        println!(
            "{}  {}",
            report.perceptual_fingerprint.bold(),
            report.image.display()
        );
    }
    Ok(())
}

/// An operand is a fingerprint literal unless a file of that name exists.
fn resolve_operand(operand: &str) -> Result<PerceptualFingerprint> {
    let path = Path::new(operand);
    if !path.exists() {
        if let Ok(fingerprint) = PerceptualFingerprint::from_hex(operand) {
            debug!(operand, "Using fingerprint literal");
            return Ok(fingerprint);
        }
    }
    fingerprint_file(path)
}

/// Compare two images or fingerprints by Hamming distance.
pub fn compare(first: &str, second: &str, threshold: f64, out: Output) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(CliError::Usage(format!(
            "threshold must be between 0 and 100, got {threshold}"
        ))
        .into());
    }

    let a = resolve_operand(first)?;
    let b = resolve_operand(second)?;
    let distance = a.distance(&b);
    let similarity = similarity_percent(distance);
    let matched = is_match(distance, threshold);

    debug!(a = %a, b = %b, distance, similarity, "Compared fingerprints");

    let report = CompareOutput {
        first: a.to_hex(),
        second: b.to_hex(),
        distance,
        similarity,
        threshold,
        is_match: matched,
    };
    if out.json(&report)? || !out.text() {
        return Ok(());
    }

    println!("   {} {}", "A:".dimmed(), report.first);
    println!("   {} {}", "B:".dimmed(), report.second);
    println!("   {} {} bits", "Distance:".dimmed(), distance);
    println!("   {} {:.1}%", "Similarity:".dimmed(), similarity);
    if matched {
        println!("   {}", "Near-duplicate".yellow().bold());
    } else {
        println!("   {}", "Distinct".green());
    }
    Ok(())
}
