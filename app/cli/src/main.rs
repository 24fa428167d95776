use accel_convert::{
    default_store, BackendKind, ColumnarLayout, CompressionCatalog, CompressionStrategy,
    ConversionDriver, ConversionPair, ConversionReport, ConvertError, ConverterConfig, LogDialect,
    LogParser, MemoryStore, PairReport, ParsedLog, StructuredStore,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

/// Accelerometer log converter writing CSV and HDF5 outputs
#[derive(Parser)]
#[command(name = "accelconv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file path (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Log line dialects
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dialect {
    /// Lines carry a `(<n>ms)` device tick
    Ticked,
    /// Lines without a device tick
    Plain,
}

impl From<Dialect> for LogDialect {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Ticked => LogDialect::Ticked,
            Dialect::Plain => LogDialect::Plain,
        }
    }
}

/// Columnar dataset layouts
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layout {
    /// int32 counter, float64 seconds, int32 acceleration
    Wide,
    /// uint8 counter, uint64 milliseconds, uint16 acceleration
    Narrow,
}

impl From<Layout> for ColumnarLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Wide => ColumnarLayout::Wide,
            Layout::Narrow => ColumnarLayout::Narrow,
        }
    }
}

/// Output backends
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// CSV flat table
    Flat,
    /// HDF5 columnar dataset
    Columnar,
    /// HDF5 row table
    Table,
}

impl From<Backend> for BackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Flat => BackendKind::Flat,
            Backend::Columnar => BackendKind::Columnar,
            Backend::Table => BackendKind::Table,
        }
    }
}

#[derive(Args)]
struct ConvertArgs {
    /// Accelerometer log to convert
    #[arg(value_name = "LOG")]
    log: PathBuf,

    /// Output pair as backend:strategy (repeatable)
    #[arg(short, long = "pair", value_name = "BACKEND:STRATEGY")]
    pairs: Vec<ConversionPair>,

    /// Convert to every backend with every compatible strategy
    #[arg(long, conflicts_with = "pairs")]
    all: bool,

    /// Directory for the outputs (defaults to the log's directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Log line dialect
    #[arg(long, value_enum)]
    dialect: Option<Dialect>,

    /// Columnar dataset layout
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// Number of parallel encoders (0 = all cores)
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,

    /// Abort on the first numeric overflow instead of skipping the line
    #[arg(long)]
    strict: bool,

    /// Overwrite existing outputs
    #[arg(long)]
    force: bool,

    /// Encode structured outputs in memory without writing them
    #[arg(long)]
    dry_run: bool,

    /// Print the conversion report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a log into the requested backend:strategy outputs
    Convert(ConvertArgs),

    /// List the compression strategies in the catalog
    Strategies {
        /// Only show strategies compatible with this backend
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,

        /// Print the strategies as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a log and summarize its contents without converting
    Inspect {
        /// Accelerometer log to inspect
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Log line dialect
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,
    },
}

/// Settings loaded from `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    converter: ConverterConfig,
    pairs: Vec<ConversionPair>,
    strategies: Vec<CompressionStrategy>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging based on verbosity flags
    setup_logging(cli.verbose, cli.quiet);

    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };

    let ok = match cli.command {
        Commands::Convert(args) => convert_command(file, args, cli.quiet)?,
        Commands::Strategies { backend, json } => {
            strategies_command(file, backend, json)?;
            true
        }
        Commands::Inspect { log, dialect } => {
            inspect_command(file, &log, dialect, cli.verbose)?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Set up logging based on verbosity flags
fn setup_logging(verbose: bool, quiet: bool) {
    let log_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    debug!("Logging initialized at {} level", log_level);
}

/// Load configuration from a JSON file
fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file: ConfigFile = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    debug!(
        "Loaded {}: {} pairs, {} extra strategies",
        path.display(),
        file.pairs.len(),
        file.strategies.len()
    );
    Ok(file)
}

fn build_catalog(extra: Vec<CompressionStrategy>) -> Result<CompressionCatalog> {
    if extra.is_empty() {
        return Ok(CompressionCatalog::standard().clone());
    }
    CompressionCatalog::standard()
        .with_extra(extra)
        .map_err(|e| map_convert_error(e, "Compression catalog"))
}

/// Execute the convert command; returns whether every pair succeeded
fn convert_command(file: ConfigFile, args: ConvertArgs, quiet: bool) -> Result<bool> {
    let start_time = Instant::now();
    let catalog = build_catalog(file.strategies)?;

    let pairs = if args.all {
        ConversionPair::all(&catalog)
    } else if !args.pairs.is_empty() {
        args.pairs
    } else {
        file.pairs
    };
    if pairs.is_empty() {
        bail!("No conversion pairs: pass -p backend:strategy, --all, or list \"pairs\" in the config file");
    }

    // Command-line flags override the config file
    let mut config = file.converter;
    if let Some(dialect) = args.dialect {
        config.parser.dialect = dialect.into();
    }
    if let Some(layout) = args.layout {
        config.columnar_layout = layout.into();
    }
    if let Some(jobs) = args.jobs {
        config.parallelism = jobs;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = Some(dir);
    }
    config.parser.strict_numeric |= args.strict;
    config.overwrite |= args.force;

    let store: Arc<dyn StructuredStore> = if args.dry_run {
        info!("Dry run: structured outputs stay in memory");
        Arc::new(MemoryStore::new())
    } else {
        default_store()
    };

    info!("Converting {} into {} outputs", args.log.display(), pairs.len());
    let driver = ConversionDriver::new(config)
        .with_catalog(catalog)
        .with_store(store);

    let progress = create_progress_bar(quiet || args.json, pairs.len());
    let report = driver
        .run_with_progress(&args.log, &pairs, &|pair: &PairReport| {
            progress.set_message(pair.pair.to_string());
            progress.inc(1);
        })
        .map_err(|e| map_convert_error(e, "Conversion"));
    progress.finish_and_clear();
    let report = report?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_pairs(&report);
        if !quiet {
            print_summary(&report, start_time);
        }
    }

    if !report.all_succeeded() {
        warn!(
            "{} of {} outputs failed",
            report.stats.pairs_failed,
            report.pairs.len()
        );
    }
    Ok(report.all_succeeded())
}

fn print_pairs(report: &ConversionReport) {
    for pair in &report.pairs {
        match &pair.outcome {
            Ok(path) => println!("✓ {}", path.display()),
            Err(e) => println!("✗ {}: {}", pair.pair, e),
        }
    }
}

fn print_summary(report: &ConversionReport, start_time: Instant) {
    eprintln!();
    eprintln!("  Records:     {}", report.records);
    eprintln!("  Lines:       {} ({} skipped)", report.lines, report.skipped_lines);
    if !report.line_errors.is_empty() {
        eprintln!("  Overflowed:  {}", report.line_errors.len());
    }
    eprintln!(
        "  Outputs:     {}/{}",
        report.stats.pairs_succeeded,
        report.pairs.len()
    );
    eprintln!("  Written:     {}", format_bytes(report.stats.bytes_written));
    eprintln!("  Time:        {:.3}s", start_time.elapsed().as_secs_f64());
}

/// Execute the strategies command
fn strategies_command(file: ConfigFile, backend: Option<Backend>, json: bool) -> Result<()> {
    let catalog = build_catalog(file.strategies)?;
    let strategies: Vec<&CompressionStrategy> = match backend {
        Some(backend) => catalog.for_backend(backend.into()).collect(),
        None => catalog.iter().collect(),
    };

    if json {
        let json =
            serde_json::to_string_pretty(&strategies).context("Failed to serialize strategies")?;
        println!("{}", json);
        return Ok(());
    }

    println!("{:<16} {:<16} {:<22} PIPELINE", "NAME", "LABEL", "BACKENDS");
    for strategy in strategies {
        let backends: Vec<&str> = strategy.backends().map(|b| b.as_str()).collect();
        let pipeline = strategy
            .pipeline()
            .map(|p| p.to_string())
            .unwrap_or_else(|e| format!("invalid: {}", e));
        println!(
            "{:<16} {:<16} {:<22} {}",
            strategy.name(),
            strategy.label(),
            backends.join(","),
            pipeline
        );
    }
    Ok(())
}

/// Execute the inspect command
fn inspect_command(
    file: ConfigFile,
    log: &Path,
    dialect: Option<Dialect>,
    verbose: bool,
) -> Result<()> {
    let mut config = file.converter.parser;
    if let Some(dialect) = dialect {
        config.dialect = dialect.into();
    }

    let parsed = LogParser::with_config(config)
        .parse_file(log)
        .map_err(|e| map_convert_error(e, "Log parsing"))?;

    display_log_info(log, config.dialect, &parsed, verbose);
    Ok(())
}

fn display_log_info(log: &Path, dialect: LogDialect, parsed: &ParsedLog, verbose: bool) {
    let records = parsed.records();

    println!("=== Log Information ===\n");
    println!("Source:      {}", log.display());
    println!("Dialect:     {}", dialect.as_str());
    println!("Lines:       {}", parsed.lines());
    println!("Records:     {}", records.len());
    println!("Skipped:     {}", parsed.skipped());
    println!("Overflowed:  {}", parsed.errors().len());
    let fields: Vec<&str> = parsed.fields().fields().iter().map(|f| f.name()).collect();
    println!("Fields:      {}", fields.join(","));

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        let counter_min = records.iter().map(|r| r.counter).min().unwrap_or(first.counter);
        let counter_max = records.iter().map(|r| r.counter).max().unwrap_or(first.counter);
        let gaps = records
            .windows(2)
            .filter(|w| w[1].counter != w[0].counter.wrapping_add(1))
            .count();
        let accel_min = records.iter().map(|r| r.acceleration).min().unwrap_or(0);
        let accel_max = records.iter().map(|r| r.acceleration).max().unwrap_or(0);
        let accel_mean =
            records.iter().map(|r| f64::from(r.acceleration)).sum::<f64>() / records.len() as f64;

        println!("\n--- Samples ---");
        println!("  Counter:      {}..{} ({} gaps)", counter_min, counter_max, gaps);
        println!(
            "  Timestamp:    {}..{} ms ({:.3}s)",
            first.timestamp_millis,
            last.timestamp_millis,
            last.timestamp_millis.saturating_sub(first.timestamp_millis) as f64 / 1000.0
        );
        println!(
            "  Acceleration: {}..{} (mean {:.1})",
            accel_min, accel_max, accel_mean
        );
        if counter_max > u32::from(u8::MAX) {
            println!("  Note: counters exceed 255; narrow layouts and row tables will fail");
        }
    }

    if verbose && !parsed.errors().is_empty() {
        println!("\n--- Overflowed Lines ---");
        for error in parsed.errors() {
            println!("  line {}: {} = {}", error.line, error.field, error.digits);
        }
    }
    println!();
}

/// Create a progress bar over the conversion pairs
fn create_progress_bar(hidden: bool, pairs: usize) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(pairs as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Map run-level ConvertError values to anyhow errors with context
fn map_convert_error(error: ConvertError, context: &str) -> anyhow::Error {
    match error {
        ConvertError::SourceUnreadable { path, source } => {
            anyhow::anyhow!("{}: cannot read {}: {}", context, path.display(), source)
        }
        ConvertError::NumericOverflow { line, field, digits } => {
            anyhow::anyhow!(
                "{}: {} value {} at line {} does not fit; drop --strict to skip such lines",
                context,
                field,
                digits,
                line
            )
        }
        ConvertError::MissingField { index, field } => {
            anyhow::anyhow!("{}: record {} has no {} value", context, index, field)
        }
        ConvertError::InvalidParameter {
            strategy,
            key,
            message,
        } => {
            anyhow::anyhow!(
                "{}: strategy {} has an invalid {} parameter: {}",
                context,
                strategy,
                key,
                message
            )
        }
        ConvertError::InvalidCatalog { message } => {
            anyhow::anyhow!("{}: invalid catalog: {}", context, message)
        }
        ConvertError::Config { message } => {
            anyhow::anyhow!("{}: invalid configuration: {}", context, message)
        }
        other => anyhow::anyhow!("{}: {}", context, other),
    }
}
