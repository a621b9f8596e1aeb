//! Siteup - LMS site lifecycle helper
//!
//! Usage:
//!   siteup branches             # Branches this site may move to
//!   siteup classify < log.txt   # Classify captured helper output
//!   siteup run upgrade          # Run a helper and report its progress
//!   siteup manifest check       # Validate a release manifest

mod interactive;
mod reporter;

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siteup_core::config::{ConfigStore, SiteupConfig};
use siteup_core::environment::{self, EnvironmentSnapshot};
use siteup_core::helper::{self, HelperError};
use siteup_core::manifest::{self, DEFAULT_VARIANT, ReleaseManifest};
use siteup_core::resolver::{self, ResolutionResult, ResolveRequest};
use siteup_core::status::HelperSession;

use crate::interactive::BranchPicker;
use crate::reporter::ConsoleReporter;

#[derive(Parser)]
#[command(name = "siteup")]
#[command(about = "Install and upgrade planning for LMS sites", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config_dir>/siteup/siteup.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the branches this site may install or upgrade to
    Branches(BranchesArgs),

    /// Classify helper output read from stdin
    Classify {
        /// Report unrecognised lines as debug events
        #[arg(long)]
        debug: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Run a helper and report its progress
    Run(RunArgs),

    /// Release manifest tools
    Manifest(ManifestArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct BranchesArgs {
    /// Variant to resolve (all variants when omitted)
    #[arg(long)]
    variant: Option<String>,

    /// Lowest branch to consider (ignored with --variant)
    #[arg(long, default_value_t = 0)]
    minimum: u32,

    /// Installed build-version (0 for a fresh install)
    #[arg(long, default_value_t = 0)]
    current: u64,

    /// Runtime version (probed when omitted)
    #[arg(long)]
    runtime_version: Option<String>,

    /// Database server version
    #[arg(long)]
    database_version: Option<String>,

    /// Release manifest to use instead of the configured one
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    /// Choose one branch interactively
    #[arg(long)]
    pick: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct RunArgs {
    /// Helper name, resolved in the configured helper directory
    helper: String,

    /// Report unrecognised lines as debug messages
    #[arg(long)]
    debug: bool,

    /// Message shown if the helper exits with an error
    #[arg(long, value_name = "MESSAGE")]
    message: Option<String>,

    /// Arguments passed to the helper (after --)
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Args)]
struct ManifestArgs {
    #[command(subcommand)]
    command: ManifestSubcommand,
}

#[derive(Subcommand)]
enum ManifestSubcommand {
    /// Load and validate a manifest
    Check {
        /// Manifest file (configured or built-in manifest when omitted)
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "siteup=debug"
    } else {
        "siteup=info,warn"
    };
    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let store = match &cli.config {
        Some(path) => ConfigStore::from_path(path.clone()),
        None => ConfigStore::from_default_location()?,
    };
    let config = store.load()?;

    match cli.command {
        Commands::Branches(args) => run_branches(args, &config),
        Commands::Classify { debug, format } => run_classify(debug || config.debug, format),
        Commands::Run(args) => run_helper(args, &config, cli.verbose),
        Commands::Manifest(args) => match args.command {
            ManifestSubcommand::Check { path } => run_manifest_check(path, &config),
        },
    }
}

fn run_branches(args: BranchesArgs, config: &SiteupConfig) -> Result<()> {
    let manifest = match &args.manifest {
        Some(path) => manifest::load_manifest(path)?,
        None => config.release_manifest()?,
    };

    let runtime_version = match args.runtime_version {
        Some(version) => version,
        None => environment::probe_version(&config.runtime_probe)
            .context("Could not determine the runtime version; pass --runtime-version")?,
    };

    let mut env = EnvironmentSnapshot::new(args.current, runtime_version);
    if let Some(database) = args.database_version {
        env = env.with_database_version(database);
    }

    let request = match &args.variant {
        Some(name) => ResolveRequest::variant(name),
        None => ResolveRequest::all(),
    }
    .with_minimum(args.minimum);

    let result = resolver::resolve(&manifest, &env, &request);

    if args.pick {
        let variant = pick_variant(&result, args.variant.as_deref());
        let chosen = BranchPicker::new().pick(variant, &result)?;
        match (chosen, args.format) {
            (Some(tag), OutputFormat::Table) => println!("{}", tag),
            (Some(tag), OutputFormat::Json) => {
                let output = serde_json::json!({ "variant": variant, "branch": tag });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            (None, _) => std::process::exit(1),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_branches_table(&manifest, &env, &result),
        OutputFormat::Json => {
            let messages: Vec<String> = result.warnings.iter().map(ToString::to_string).collect();
            let output = serde_json::json!({
                "product": manifest.product.name,
                "environment": env,
                "result": result,
                "messages": messages,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Variant to offer when picking: the only one resolved, else the requested one
fn pick_variant<'a>(result: &'a ResolutionResult, requested: Option<&'a str>) -> &'a str {
    match (result.available.len(), result.available.keys().next()) {
        (1, Some(only)) => only.as_str(),
        _ => requested.unwrap_or(DEFAULT_VARIANT),
    }
}

fn print_branches_table(
    manifest: &ReleaseManifest,
    env: &EnvironmentSnapshot,
    result: &ResolutionResult,
) {
    let state = if env.is_fresh_install() {
        "fresh install".to_string()
    } else {
        format!("build {}", env.current_build_version)
    };
    println!(
        "{} ({}, {} {})",
        style(&manifest.product.name).bold(),
        state,
        manifest.product.runtime,
        env.runtime_version
    );
    println!();

    println!("  {:<12} {:<6} Branches", "Variant", "Newest");
    println!("  {}", "-".repeat(60));
    for (variant, tags) in &result.available {
        let newest = result
            .newest(variant)
            .map(|tag| tag.number().to_string())
            .unwrap_or_else(|| "-".to_string());
        let branches = if tags.is_empty() {
            style("none available").dim().to_string()
        } else {
            tags.iter()
                .map(|tag| tag.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("  {:<12} {:<6} {}", variant, newest, branches);
    }

    if result.has_warnings() {
        println!();
        for warning in &result.warnings {
            println!("  {} {}", style("Warning:").yellow(), warning);
        }
    }

    println!();
    match result.maximum {
        Some(max) => println!("Range: {}..={}", result.minimum, max),
        None => println!("Range: empty"),
    }
}

fn run_classify(debug: bool, format: OutputFormat) -> Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read helper output from stdin")?;
        let event = helper::classify(&line, debug);
        match format {
            OutputFormat::Table => {
                println!("{:<13} {}", event.kind(), event.text().unwrap_or(""))
            }
            OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
        }
    }
    Ok(())
}

fn run_helper(args: RunArgs, config: &SiteupConfig, verbose: bool) -> Result<()> {
    let manifest = config.release_manifest()?;
    let runner = config.helper_runner()?;

    let mut command = runner.command(&args.helper).args(args.args);
    if let Some(message) = args.message {
        command = command.failure_message(message);
    }

    let debug = args.debug || config.debug;
    let mut reporter = ConsoleReporter::new(verbose || debug);
    let outcome = HelperSession::new(&mut reporter, manifest.product.name.as_str(), debug)
        .run(&runner, &command);

    match outcome {
        Ok(summary) => {
            println!();
            println!(
                "{} {} ({} steps, {} warnings)",
                style("Finished").green().bold(),
                args.helper,
                summary.successes,
                summary.warnings.len()
            );
            Ok(())
        }
        // Already shown by the reporter
        Err(HelperError::Fatal(_) | HelperError::Failed { .. }) => std::process::exit(1),
        Err(err) => Err(err.into()),
    }
}

fn run_manifest_check(path: Option<PathBuf>, config: &SiteupConfig) -> Result<()> {
    let (manifest, source) = match path {
        Some(path) => (manifest::load_manifest(&path)?, path.display().to_string()),
        None => match &config.manifest {
            Some(path) => (config.release_manifest()?, path.display().to_string()),
            None => (manifest::builtin()?, "built-in".to_string()),
        },
    };

    let product = &manifest.product;
    println!("Manifest: {} ({})", source, style("valid").green());
    println!(
        "Product:  {} (tags {}_<n>_{}, {} / {})",
        product.name,
        product.tag_prefix,
        product.tag_suffix,
        product.runtime,
        product.database
    );
    println!();

    println!(
        "  {:<12} {:<12} {:<7} {:<10} {:<10} Requires",
        "Release", "Version", "Branch", product.runtime, product.database
    );
    println!("  {}", "-".repeat(70));
    for record in &manifest.releases {
        println!(
            "  {:<12} {:<12} {:<7} {:<10} {:<10} {}",
            record.label,
            record.min_required_version,
            record.branch_number,
            record.min_runtime_version,
            record.min_database_version,
            record.required_prior_label.as_deref().unwrap_or("-")
        );
    }

    println!();
    for (name, variant) in &manifest.variants {
        let branches: Vec<String> = variant.branches.iter().map(ToString::to_string).collect();
        println!("  Variant {:<10} [{}]", name, branches.join(", "));
    }

    Ok(())
}
