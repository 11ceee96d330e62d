//! sapflow CLI - Command-line interface for sapflow-ratio
//!
//! Commands:
//! - compute: Turn datalogger tables into mean heat ratios (CSV or JSON)
//! - validate: Check input tables for missing or non-numeric fields
//! - episodes: Show how readings were segmented into heat-pulse episodes
//! - schema: Print expected input columns and output columns

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sapflow_ratio::encoder::{HeatRatioEncoder, CSV_COLUMNS};
use sapflow_ratio::schema::{TableAdapter, TableFormat};
use sapflow_ratio::types::EpisodeSummary;
use sapflow_ratio::{
    CoercionPolicy, ComputeError, HeatRatioConfig, HeatRatioProcessor, PRODUCER_NAME, VERSION,
};

/// sapflow - Heat-ratio extraction for heat-pulse sap-flow sensors
#[derive(Parser)]
#[command(name = "sapflow")]
#[command(version = VERSION)]
#[command(about = "Turn sap-flow datalogger readings into mean heat ratios", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads tables
#[derive(clap::Args)]
struct InputArgs {
    /// Input files, concatenated in order (use - for stdin)
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Input format (guessed from the file extension when omitted, else csv)
    #[arg(long)]
    input_format: Option<InputFormat>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute one mean heat ratio per heat pulse
    Compute {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: OutputFormat,

        /// Aggregation window start (ms since heat pulse)
        #[arg(long)]
        window_start: Option<i64>,

        /// Aggregation window end (ms since heat pulse)
        #[arg(long)]
        window_end: Option<i64>,

        /// Report 1/ratio, for sensors with swapped upstream/downstream wiring
        #[arg(long)]
        invert: bool,

        /// Reject downstream temperatures at or above this value
        #[arg(long)]
        downstream_limit: Option<f64>,

        /// Skip rows with non-numeric fields instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Validate input tables
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show per-episode segmentation diagnostics
    Episodes {
        #[command(flatten)]
        input: InputArgs,

        /// Only show episodes of this node
        #[arg(long)]
        node: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print expected input columns and output columns
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of row objects
    Json,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
}

impl From<InputFormat> for TableFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Csv => TableFormat::Csv,
            InputFormat::Json => TableFormat::Json,
            InputFormat::Ndjson => TableFormat::Ndjson,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Flat table, one row per heat pulse
    Csv,
    /// Grouped { ids, data } JSON
    Json,
    /// Pretty-printed grouped JSON
    JsonPretty,
    /// Flat rows as a JSON array
    Rows,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliErrorReport::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), SapflowCliError> {
    match cli.command {
        Commands::Compute {
            input,
            output,
            output_format,
            window_start,
            window_end,
            invert,
            downstream_limit,
            lenient,
        } => {
            let mut config = load_config(input.config.as_deref())?;
            if let Some(start) = window_start {
                config.heat_ratio_window_start = start;
            }
            if let Some(end) = window_end {
                config.heat_ratio_window_end = end;
            }
            if invert {
                config.invert_heat_ratios = true;
            }
            if downstream_limit.is_some() {
                config.downstream_temp_limit = downstream_limit;
            }
            if lenient {
                config.coercion = CoercionPolicy::Lenient;
            }
            cmd_compute(&input, config, &output, output_format)
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Episodes { input, node, json } => cmd_episodes(&input, node.as_deref(), json),

        Commands::Schema => cmd_schema(),
    }
}

fn cmd_compute(
    input: &InputArgs,
    config: HeatRatioConfig,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), SapflowCliError> {
    let processor = HeatRatioProcessor::new(config)?;
    let tables = read_tables(input)?;
    let (output_data, records) =
        compute_output(&processor, &borrow_tables(&tables), output_format)?;

    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(output_data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, output_data)?;
        tracing::info!(path = %output.display(), records, "wrote heat ratios");
    }

    Ok(())
}

/// Encoded output and its record count. Input without readings still yields a header or `{}`.
fn compute_output(
    processor: &HeatRatioProcessor,
    tables: &[(TableFormat, &str)],
    output_format: OutputFormat,
) -> Result<(String, usize), SapflowCliError> {
    let report = processor.ingest(tables)?;
    if report.readings.is_empty() {
        tracing::warn!("no readings in input");
    }
    if !report.skipped.is_empty() {
        tracing::warn!(skipped = report.skipped.len(), "rows skipped during ingestion");
    }

    let result = processor.process(&report.readings);
    let output_data = match output_format {
        OutputFormat::Csv => HeatRatioEncoder::to_csv(&result)?,
        OutputFormat::Json => HeatRatioEncoder::to_json(&result)? + "\n",
        OutputFormat::JsonPretty => HeatRatioEncoder::to_json_pretty(&result)? + "\n",
        OutputFormat::Rows => HeatRatioEncoder::rows_to_json(&result)? + "\n",
    };
    Ok((output_data, result.record_count()))
}

fn cmd_validate(input: &InputArgs, json: bool) -> Result<(), SapflowCliError> {
    let config = load_config(input.config.as_deref())?;
    let tables = read_tables(input)?;

    let mut rows = Vec::new();
    for (format, content) in &tables {
        rows.extend(TableAdapter::parse(*format, content)?);
    }

    let issues = TableAdapter::validate_rows(&rows, &config.columns);
    let mut invalid_rows: Vec<usize> = issues.iter().map(|i| i.row).collect();
    invalid_rows.dedup();

    let report = ValidationReport {
        total_rows: rows.len(),
        valid_rows: rows.len() - invalid_rows.len(),
        invalid_rows: invalid_rows.len(),
        errors: issues.iter().map(|issue| issue.to_string()).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {}", err);
            }
        }
    }

    if report.invalid_rows > 0 {
        Err(SapflowCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_episodes(input: &InputArgs, node: Option<&str>, json: bool) -> Result<(), SapflowCliError> {
    let processor = HeatRatioProcessor::new(load_config(input.config.as_deref())?)?;
    let tables = read_tables(input)?;
    let report = processor.ingest(&borrow_tables(&tables))?;

    let summaries: Vec<EpisodeSummary> = processor
        .summarize(&report.readings)
        .into_iter()
        .filter(|s| node.map_or(true, |id| s.node_id == id))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!(
        "{:<10} {:>7} {:>6} {:>10} {:>10} {:>7} {:>14} {:>12}",
        "node", "episode", "rows", "ref_up", "ref_down", "window", "unix_ts", "mean_ratio"
    );
    for s in &summaries {
        println!(
            "{:<10} {:>7} {:>6} {:>10} {:>10} {:>7} {:>14.0} {:>12}",
            s.node_id,
            s.episode_index,
            s.rows,
            fmt_opt(s.baseline.reference_upstream_temp),
            fmt_opt(s.baseline.reference_downstream_temp),
            s.window_rows,
            s.unix_timestamp,
            fmt_opt(s.mean_heat_ratio),
        );
    }
    Ok(())
}

fn cmd_schema() -> Result<(), SapflowCliError> {
    let columns = HeatRatioConfig::default().columns;

    println!("{} {}", PRODUCER_NAME, VERSION);
    println!();
    println!("Input columns (override with \"columns\" in --config):");
    println!("  {:<26} upstream temperature (°C)", columns.upstream_temp);
    println!("  {:<26} downstream temperature (°C)", columns.downstream_temp);
    println!("  {:<26} ms since heat pulse (integer)", columns.millis_since_heat_pulse);
    println!("  {:<26} logger time, unix seconds", columns.timestamp_seconds);
    println!(
        "  {:<26} ms since reference temperature (integer)",
        columns.millis_since_reference_temp
    );
    println!("  {:<26} sensor node identifier", columns.node_id);
    println!();
    println!("Output columns: {}", CSV_COLUMNS.join(","));
    println!();
    println!("Default configuration:");
    println!("{}", HeatRatioConfig::default().to_json()?);
    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<HeatRatioConfig, SapflowCliError> {
    match path {
        Some(path) => Ok(HeatRatioConfig::from_json_file(path)?),
        None => Ok(HeatRatioConfig::default()),
    }
}

fn read_tables(input: &InputArgs) -> Result<Vec<(TableFormat, String)>, SapflowCliError> {
    let mut tables = Vec::with_capacity(input.input.len());
    for path in &input.input {
        let content = if path.to_string_lossy() == "-" {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        } else {
            fs::read_to_string(path)?
        };
        let format = input
            .input_format
            .map(TableFormat::from)
            .or_else(|| TableFormat::from_path(path))
            .unwrap_or(TableFormat::Csv);
        tables.push((format, content));
    }
    Ok(tables)
}

fn borrow_tables(tables: &[(TableFormat, String)]) -> Vec<(TableFormat, &str)> {
    tables
        .iter()
        .map(|(format, content)| (*format, content.as_str()))
        .collect()
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

// Error types

#[derive(Debug)]
enum SapflowCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for SapflowCliError {
    fn from(e: io::Error) -> Self {
        SapflowCliError::Io(e)
    }
}

impl From<ComputeError> for SapflowCliError {
    fn from(e: ComputeError) -> Self {
        SapflowCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SapflowCliError {
    fn from(e: serde_json::Error) -> Self {
        SapflowCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliErrorReport {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SapflowCliError> for CliErrorReport {
    fn from(e: SapflowCliError) -> Self {
        match e {
            SapflowCliError::Io(e) => CliErrorReport {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SapflowCliError::Compute(ComputeError::InvalidConfig(message)) => CliErrorReport {
                code: "CONFIG_ERROR".to_string(),
                message,
                hint: Some("Window start must be below window end".to_string()),
            },
            SapflowCliError::Compute(e) => CliErrorReport {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Run 'sapflow validate' for details, or retry with --lenient".to_string(),
                ),
            },
            SapflowCliError::Json(e) => CliErrorReport {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SapflowCliError::ValidationFailed(count) => CliErrorReport {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<String>,
}
