//! Imprint CLI - content fingerprints, invisible watermarks and a local registry.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use imprint_core::DigestAlgorithm;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error
  65  Data error (registration blocked, match found with --fail-on-match)
  66  Input file missing or unreadable
  69  Registry unavailable
  74  I/O error writing output";

#[derive(Parser)]
#[command(name = "imprint")]
#[command(author, version, about = "Content fingerprints and invisible watermarks", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    registry: RegistryArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the registry snapshot lives.
#[derive(Args, Clone, Debug)]
pub struct RegistryArgs {
    /// Registry snapshot file
    #[arg(
        long = "registry",
        global = true,
        env = "IMPRINT_REGISTRY",
        default_value = "imprint-registry.json"
    )]
    pub path: PathBuf,

    /// Registry snapshot URL (GET/PUT); overrides --registry
    #[arg(long = "registry-url", global = true, env = "IMPRINT_REGISTRY_URL")]
    pub url: Option<String>,
}

/// Digest algorithm flag.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AlgorithmArg {
    Sha256,
    #[value(name = "sha3-256")]
    Sha3,
}

impl From<AlgorithmArg> for DigestAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha256 => DigestAlgorithm::Sha256,
            AlgorithmArg::Sha3 => DigestAlgorithm::Sha3_256,
        }
    }
}

/// Output style shared by all commands.
#[derive(Clone, Copy, Debug)]
pub struct Output {
    pub quiet: bool,
    pub json: bool,
}

impl Output {
    /// Print `value` as pretty JSON when `--json` is set.
    pub fn json<T: serde::Serialize>(&self, value: &T) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }

    /// Whether text output should be printed.
    pub fn text(&self) -> bool {
        !self.quiet && !self.json
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the exact content digest of a file
    Digest {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "sha256")]
        algorithm: AlgorithmArg,
    },

    /// Print the 64-bit perceptual fingerprint of an image
    Fingerprint {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },

    /// Compare two images (or two hex fingerprints) by Hamming distance
    Compare {
        #[arg(value_name = "A")]
        first: String,

        #[arg(value_name = "B")]
        second: String,

        /// Similarity percentage counted as a match
        #[arg(short, long, default_value_t = imprint_core::NEAR_DUPLICATE_THRESHOLD)]
        threshold: f64,
    },

    /// Embed an invisible ownership watermark (output is always PNG)
    Embed {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[command(flatten)]
        payload: commands::embed::PayloadArgs,

        /// Output path (defaults to <IMAGE stem>.imprint.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract a watermark and optionally check a registration claim
    Extract {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Owner id of the party trying to register the image; exits 65 when blocked
        #[arg(long)]
        claimant: Option<String>,
    },

    /// Register an image in the registry
    Register(commands::register::RegisterArgs),

    /// Check an image against the registry
    Check {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Similarity percentage counted as a perceptual match
        #[arg(short, long, default_value_t = imprint_core::NEAR_DUPLICATE_THRESHOLD)]
        threshold: f64,

        /// Exit with 65 when a match is found
        #[arg(long)]
        fail_on_match: bool,
    },

    /// Inspect or administer the registry
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List all entries in registration order
    List,

    /// Delete one entry
    Delete {
        #[arg(value_name = "DIGEST")]
        digest: String,
    },

    /// Remove every entry
    Clear {
        /// Confirm clearing the registry
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "imprint=debug,imprint_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let out = Output {
        quiet: cli.quiet,
        json: cli.json,
    };
    let registry = cli.registry;

    match cli.command {
        Commands::Digest { file, algorithm } => commands::inspect::digest(file, algorithm.into(), out),
        Commands::Fingerprint { image } => commands::inspect::fingerprint(image, out),
        Commands::Compare {
            first,
            second,
            threshold,
        } => commands::inspect::compare(&first, &second, threshold, out),
        Commands::Embed {
            image,
            payload,
            output,
        } => commands::embed::execute(image, payload, output, out),
        Commands::Extract { image, claimant } => {
            commands::extract::execute(image, claimant, out)
        }
        Commands::Register(args) => commands::register::execute(args, &registry, out).await,
        Commands::Check {
            image,
            threshold,
            fail_on_match,
        } => commands::check::execute(image, threshold, fail_on_match, &registry, out).await,
        Commands::Registry { action } => match action {
            RegistryAction::List => commands::registry::list(&registry, out).await,
            RegistryAction::Delete { digest } => {
                commands::registry::delete(&digest, &registry, out).await
            }
            RegistryAction::Clear { yes } => commands::registry::clear(yes, &registry, out).await,
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through clap's error path too
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            process::exit(code);
        }
    };
    init_tracing(cli.verbose, cli.quiet);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    process::exit(exit.code);
}
