//! Vegtrend - field-survey aggregation
//!
//! The main entry point for the `vegtrend` binary, handling:
//! - Data path and analysis-config resolution
//! - Two-stage aggregation of survey metrics by arbitrary dimensions
//! - Weighted trait spectra per survey unit
//! - Scenario files and registry checks
//!
//! Results go to stdout; logs and errors go to stderr.

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use vt_common::{Error, OutputFormat, Table, Value, SCHEMA_VERSION};
use vt_config::{
    resolve_data_paths, AbundanceWeights, AnalysisConfig, DataFile, DataPaths, PathOverrides,
    ProfileRegistry, SpeciesAliases,
};
use vt_core::exit_codes::ExitCode;
use vt_core::log_event;
use vt_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, Stage,
};
use vt_core::output::render;
use vt_core::{load_dataset, AnalysisKind, Level, Metric, ScenarioRunner, ScenarioSpec};

/// Vegtrend - aggregate botanical survey data into trend tables
#[derive(Parser)]
#[command(name = "vegtrend")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Directory holding the standard CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Observations table (one row per species per description)
    #[arg(long, global = true)]
    observations: Option<PathBuf>,

    /// Description metadata table
    #[arg(long, global = true)]
    descriptions: Option<PathBuf>,

    /// Profile/impact registry
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    /// Abundance-class weights
    #[arg(long, global = true)]
    abundance_weights: Option<PathBuf>,

    /// Species indicator values (one column per scale)
    #[arg(long, global = true)]
    indicator_values: Option<PathBuf>,

    /// Raw → canonical species names
    #[arg(long, global = true)]
    species_aliases: Option<PathBuf>,

    /// Analysis settings (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    quiet: u8,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

impl GlobalOpts {
    fn path_overrides(&self) -> PathOverrides {
        let mut overrides = PathOverrides::default();
        if let Some(dir) = &self.data_dir {
            overrides = overrides.with_data_dir(dir);
        }
        let files = [
            (DataFile::Observations, &self.observations),
            (DataFile::Descriptions, &self.descriptions),
            (DataFile::Profiles, &self.profiles),
            (DataFile::AbundanceWeights, &self.abundance_weights),
            (DataFile::IndicatorValues, &self.indicator_values),
            (DataFile::SpeciesAliases, &self.species_aliases),
        ];
        for (file, path) in files {
            if let Some(path) = path {
                overrides = overrides.with_file(file, path);
            }
        }
        overrides
    }

    fn verbosity(&self) -> i8 {
        self.verbose.min(8) as i8 - self.quiet.min(8) as i8
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Mean of per-description metrics by grouping columns
    Aggregate(AggregateArgs),

    /// Abundance-weighted trait statistics per description, regrouped
    Ecospectrum(EcospectrumArgs),

    /// Run a scenario file (TOML or JSON)
    Run(RunArgs),

    /// Resolve data paths and validate the registries
    Check,

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Grouping columns, comma separated (default from config)
    #[arg(long, value_delimiter = ',')]
    groupby: Vec<String>,

    /// Metric as type[:column][:species]; repeatable
    #[arg(long = "metric")]
    metrics: Vec<Metric>,

    /// Filters as a JSON object of column → rule
    #[arg(long)]
    filters: Option<String>,

    /// Row level the metrics see
    #[arg(long, value_enum, default_value_t = Level::Description)]
    level: Level,

    /// Result name in the output envelope
    #[arg(long, default_value = "aggregate")]
    name: String,
}

#[derive(Args, Debug)]
struct EcospectrumArgs {
    /// Indicator scale column (e.g. M, L, N)
    #[arg(long, default_value = "M")]
    scale: String,

    /// Grouping columns, comma separated (default from config)
    #[arg(long, value_delimiter = ',')]
    groupby: Vec<String>,

    /// Filters as a JSON object of column → rule
    #[arg(long)]
    filters: Option<String>,

    /// Statistics to regroup, comma separated (default cwm)
    #[arg(long = "stat", value_delimiter = ',')]
    stats: Vec<String>,

    /// Result name in the output envelope
    #[arg(long, default_value = "ecospectrum")]
    name: String,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario file
    path: PathBuf,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Clean,
                _ => ExitCode::ArgsError,
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    init_logging(&LogConfig::from_env(
        cli.global.verbosity(),
        cli.global.log_format,
    ));

    let ctx = LogContext::new(generate_run_id());
    let span = tracing::info_span!("vegtrend", run_id = %ctx.run_id);
    let _guard = span.enter();

    let result = match cli.command {
        Commands::Aggregate(args) => {
            aggregate_spec(&args).and_then(|spec| run_analysis(&cli.global, &ctx, spec))
        }
        Commands::Ecospectrum(args) => {
            ecospectrum_spec(&args).and_then(|spec| run_analysis(&cli.global, &ctx, spec))
        }
        Commands::Run(args) => {
            ScenarioSpec::from_path(&args.path).and_then(|spec| run_analysis(&cli.global, &ctx, spec))
        }
        Commands::Check => run_check(&cli.global, &ctx),
        Commands::Version => print_version(&cli.global),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => report_error(&cli.global, &ctx, &err),
    };
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn parse_filters(raw: Option<&str>) -> vt_common::Result<Option<serde_json::Map<String, serde_json::Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let json: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("--filters is not valid JSON: {}", e)))?;
    match json {
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => Err(Error::UnknownFilterOp {
            column: "<filters>".to_string(),
            rule: other.to_string(),
        }),
    }
}

fn aggregate_spec(args: &AggregateArgs) -> vt_common::Result<ScenarioSpec> {
    let mut spec = ScenarioSpec::new(&args.name, AnalysisKind::Aggregate);
    spec.level = args.level;
    spec.groupby = args.groupby.clone();
    spec.metrics = args.metrics.clone();
    spec.filters = parse_filters(args.filters.as_deref())?;
    Ok(spec)
}

fn ecospectrum_spec(args: &EcospectrumArgs) -> vt_common::Result<ScenarioSpec> {
    let mut spec = ScenarioSpec::new(&args.name, AnalysisKind::Ecospectrum);
    spec.trait_scale = args.scale.clone();
    spec.groupby = args.groupby.clone();
    if !args.stats.is_empty() {
        spec.eco_metrics = args.stats.clone();
    }
    spec.filters = parse_filters(args.filters.as_deref())?;
    Ok(spec)
}

fn load_config(global: &GlobalOpts, ctx: &LogContext) -> vt_common::Result<AnalysisConfig> {
    let config = AnalysisConfig::load(global.config.as_deref())?;
    log_event!(
        ctx,
        DEBUG,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "analysis config loaded",
        unit_id_col = config.unit_id_col.as_str()
    );
    Ok(config)
}

fn resolve_paths(global: &GlobalOpts, ctx: &LogContext) -> DataPaths {
    let paths = resolve_data_paths(&global.path_overrides());
    let found = DataFile::ALL.iter().filter(|f| paths.get(**f).is_some()).count();
    log_event!(
        ctx,
        DEBUG,
        event_names::PATHS_RESOLVED,
        Stage::Init,
        "data paths resolved",
        found = found
    );
    paths
}

fn run_analysis(global: &GlobalOpts, ctx: &LogContext, spec: ScenarioSpec) -> vt_common::Result<ExitCode> {
    let ctx = ctx.clone().with_scenario(&spec.name);
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting analysis");

    let config = load_config(global, &ctx)?;
    let paths = resolve_paths(global, &ctx);
    let dataset = load_dataset(&paths, &config)?;
    log_event!(
        ctx,
        INFO,
        event_names::LOAD_FINISHED,
        Stage::Load,
        "dataset loaded",
        rows = dataset.merged.n_rows()
    );

    let runner = ScenarioRunner::from_paths(config, &paths)?;
    let stage = match spec.analysis {
        AnalysisKind::Aggregate => Stage::Aggregate,
        AnalysisKind::Ecospectrum => Stage::Ecospectrum,
    };
    log_event!(ctx, DEBUG, event_names::SCENARIO_STARTED, stage, "scenario started");
    let outcome = runner.run(&spec, &dataset.merged)?;
    log_event!(
        ctx,
        INFO,
        event_names::SCENARIO_FINISHED,
        stage,
        "scenario finished",
        rows = outcome.result.n_rows()
    );

    let mut quality = dataset.quality;
    quality.extend(outcome.quality);
    let rendered = render(global.format, &outcome.name, &outcome.result, &quality, &ctx.run_id)?;
    std::io::stdout().lock().write_all(rendered.as_bytes())?;
    log_event!(ctx, DEBUG, event_names::OUTPUT_WRITTEN, Stage::Output, "result written");

    if outcome.result.is_empty() {
        log_event!(ctx, WARN, event_names::RUN_FINISHED, Stage::Output, "result is empty");
        Ok(ExitCode::EmptyResult)
    } else {
        log_event!(ctx, INFO, event_names::RUN_FINISHED, Stage::Output, "done");
        Ok(ExitCode::Clean)
    }
}

/// Number of entries a data file contributes once loaded.
fn count_entries(file: DataFile, path: &std::path::Path) -> vt_common::Result<usize> {
    Ok(match file {
        DataFile::Observations | DataFile::Descriptions | DataFile::IndicatorValues => {
            Table::from_csv_path(path)?.n_rows()
        }
        DataFile::Profiles => ProfileRegistry::from_csv_path(path)?.len(),
        DataFile::AbundanceWeights => AbundanceWeights::from_csv_path(path)?.len(),
        DataFile::SpeciesAliases => SpeciesAliases::from_csv_path(path)?.len(),
    })
}

fn run_check(global: &GlobalOpts, ctx: &LogContext) -> vt_common::Result<ExitCode> {
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "checking configuration");
    load_config(global, ctx)?;
    let paths = resolve_paths(global, ctx);

    let mut report = Table::with_columns(["file", "path", "source", "status", "entries"])?;
    let mut complete = true;
    for file in DataFile::ALL {
        let required = matches!(file, DataFile::Observations | DataFile::Descriptions);
        let (path, status, entries) = match paths.get(file) {
            Some(path) if path.exists() => (
                Value::from(path.display().to_string()),
                "ok",
                Value::from(count_entries(file, path)?),
            ),
            Some(path) => (Value::from(path.display().to_string()), "missing", Value::Null),
            None => (Value::Null, "not configured", Value::Null),
        };
        if required && status != "ok" {
            complete = false;
        }
        report.push_row(vec![
            Value::from(file.filename()),
            path,
            Value::from(paths.source(file).to_string()),
            Value::from(status),
            entries,
        ])?;
    }

    let rendered = render(
        global.format,
        "check",
        &report,
        &vt_common::DataQualityReport::new(),
        &ctx.run_id,
    )?;
    std::io::stdout().lock().write_all(rendered.as_bytes())?;

    if complete {
        Ok(ExitCode::Clean)
    } else {
        log_event!(
            ctx,
            WARN,
            event_names::RUN_FINISHED,
            Stage::Init,
            "observations or descriptions unavailable"
        );
        Ok(ExitCode::ConfigError)
    }
}

fn print_version(global: &GlobalOpts) -> vt_common::Result<ExitCode> {
    let out = match global.format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "vegtrend_version": env!("CARGO_PKG_VERSION"),
                "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            });
            format!("{}\n", serde_json::to_string_pretty(&info)?)
        }
        _ => format!(
            "vegtrend {}\nschema version: {}\n",
            env!("CARGO_PKG_VERSION"),
            SCHEMA_VERSION
        ),
    };
    std::io::stdout().lock().write_all(out.as_bytes())?;
    Ok(ExitCode::Clean)
}

/// Print an error in the appropriate format and pick the exit code.
fn report_error(global: &GlobalOpts, ctx: &LogContext, error: &Error) -> ExitCode {
    let exit_code = ExitCode::from(error);
    log_event!(
        ctx,
        ERROR,
        event_names::RUN_FAILED,
        Stage::Init,
        error.to_string(),
        code = error.code()
    );

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "error",
                "error": {
                    "code": error.code(),
                    "category": error.category(),
                    "exit_code": exit_code.code_name(),
                    "message": error.to_string(),
                    "remediation": error.remediation(),
                }
            });
            eprintln!("{:#}", response);
        }
        _ => {
            eprintln!("error: {}", error);
            eprintln!("hint: {}", error.remediation());
        }
    }
    exit_code
}
