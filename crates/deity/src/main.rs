//! DeITy - replace identifiers embedded in filenames with short hashes, and back.

use anyhow::{bail, Context, Result};
use clap::Parser;
use deity_common::config::parse_extensions;
use deity_common::{DeityConfig, TableKind};
use deity_identifier::IdentifierPatterns;
use deity_rename::{decode_all, encode_files, get_file_list, DecodeReport, EncodeOptions, EncodeReport};
use deity_tracking::TrackingStore;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "deity")]
#[command(
    author,
    version,
    about = "Encode or decode identifiers embedded in the filenames of a directory"
)]
struct Cli {
    /// Directory containing the files
    input_dir: PathBuf,

    /// Tracking database file (a bare file name is placed inside INPUT_DIR)
    database_file: PathBuf,

    /// Tracking table (specimens, subjects)
    table: String,

    /// Directory encoded files are moved to (defaults to each file's own directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File extensions to process, comma-separated
    #[arg(long)]
    suffix: Option<String>,

    /// Number of hash characters substituted into filenames
    #[arg(long)]
    num_chars: Option<usize>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Decode files instead of encoding
    #[arg(long)]
    decode: bool,

    /// Check everything without writing to the database or renaming files
    #[arg(long)]
    dry_run: bool,

    /// Output format (json, text)
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if !matches!(cli.format.as_str(), "text" | "json") {
        bail!("Unknown output format '{}', expected 'text' or 'json'", cli.format);
    }

    let table: TableKind = cli.table.parse()?;
    let config = load_config(&cli)?;

    let input_dir = cli
        .input_dir
        .canonicalize()
        .with_context(|| format!("Input directory {} not found", cli.input_dir.display()))?;
    let database_file = database_path(&input_dir, &cli.database_file);

    if cli.dry_run {
        info!("Dry run: nothing will be recorded or renamed");
    }
    info!(
        "{} files with extension(s) {} in {}",
        if cli.decode { "Decoding" } else { "Encoding" },
        config.extensions.join(","),
        input_dir.display()
    );

    if cli.decode {
        let report = run_decode(&database_file, table, &config, cli.dry_run)?;
        print_decode(&report, &cli.format)?;
    } else {
        let files = get_file_list(&input_dir, &config.extensions)?;
        let report = run_encode(&files, &database_file, table, &config, &cli)?;
        print_encode(&report, &cli.format)?;
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<DeityConfig> {
    let mut config = match cli.config {
        Some(ref path) => DeityConfig::from_yaml_file(path)?,
        None => DeityConfig::default(),
    };
    if let Some(ref suffix) = cli.suffix {
        config.extensions = parse_extensions(suffix);
    }
    if let Some(num_chars) = cli.num_chars {
        config.num_chars = num_chars;
    }
    if config.extensions.is_empty() {
        bail!("At least one file extension is required");
    }
    config.validate()?;
    Ok(config)
}

fn database_path(input_dir: &Path, database_file: &Path) -> PathBuf {
    match database_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => database_file.to_path_buf(),
        _ => input_dir.join(database_file),
    }
}

fn run_encode(
    files: &[PathBuf],
    database_file: &Path,
    table: TableKind,
    config: &DeityConfig,
    cli: &Cli,
) -> Result<EncodeReport> {
    let patterns = IdentifierPatterns::compile(&config.patterns, config.case_insensitive)?;

    if let Some(ref dir) = cli.output_dir {
        if !dir.is_dir() {
            warn!(
                "Output directory {} does not exist, files stay in their own directory",
                dir.display()
            );
        }
    }

    let options = EncodeOptions {
        table,
        num_chars: config.num_chars,
        output_dir: cli.output_dir.clone(),
        dry_run: cli.dry_run,
    };

    // a dry run must not leave a new database behind
    let store = if cli.dry_run && !database_file.exists() {
        TrackingStore::open_in_memory()?
    } else {
        TrackingStore::open(database_file)?
    };
    let result = encode_files(files, &patterns, &store, &options);
    let closed = store.close();

    let report = result?;
    closed?;
    Ok(report)
}

fn run_decode(
    database_file: &Path,
    table: TableKind,
    config: &DeityConfig,
    dry_run: bool,
) -> Result<DecodeReport> {
    let store = TrackingStore::open_existing(database_file)?;
    let result = decode_all(&store, table, config.recovery_extensions(), dry_run);
    let closed = store.close();

    let report = result?;
    closed?;
    Ok(report)
}

fn print_encode(report: &EncodeReport, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for entry in report.entries.iter().filter(|e| !e.is_noop()) {
        info!("{} -> {}", entry.old_path.display(), entry.new_path.display());
    }
    info!(
        "{} matched, {} unchanged, {} recorded, {} renamed",
        report.matched, report.unmatched, report.persisted, report.renamed
    );
    if let Some(ref csv) = report.export {
        info!("Record written to {}", csv.display());
    }
    Ok(())
}

fn print_decode(report: &DecodeReport, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    info!(
        "{} file(s) reverted, {} found under a different extension",
        report.renamed,
        report.recovered_count()
    );
    Ok(())
}
