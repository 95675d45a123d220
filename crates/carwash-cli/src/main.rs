mod config;
mod registry;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use carwash_core::{ConfigError, config_json_schema, redact_connection_string};
use carwash_scrub::{
    Configuration, FakerGenerator, FormatterSpec, FormatterTypes, Generator, LocaleKey, Resolver,
    RunStatus, ScrubEngine, ScrubError, ScrubOptions, ScrubReport, TableEntry, TableOutcome,
};
use carwash_store::PostgresStore;
use config::{LoadError, load_config_file};
use registry::{RunContext, init_console_logging, init_run_logging, start_run, write_report};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Load(#[from] LoadError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("scrub error: {0}")]
    Scrub(#[from] ScrubError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
    #[error("invalid formatters: {0}")]
    InvalidFormatters(String),
    #[error("scrub finished with status {status:?}; see {}", report.display())]
    Unsuccessful { status: RunStatus, report: PathBuf },
}

#[derive(Parser, Debug)]
#[command(name = "carwash", version, about = "Scrub sensitive data from database tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite configured fields in the database.
    Scrub(ScrubArgs),
    /// Validate a config file without touching the database.
    Check(CheckArgs),
    /// List generator names usable in config files.
    Generators,
    /// Print the JSON Schema of the config file.
    ConfigSchema(ConfigSchemaArgs),
}

#[derive(Args, Debug)]
struct ScrubArgs {
    /// Config file (.toml or .json).
    #[arg(long, short, default_value = "carwash.toml")]
    config: PathBuf,
    /// Database connection string.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Records fetched per page.
    #[arg(long, default_value_t = 500)]
    page_size: usize,
    /// Timeout for each page fetch and record write.
    #[arg(long, default_value_t = 30_000)]
    io_timeout_ms: u64,
    /// Tables scrubbed concurrently.
    #[arg(long, default_value_t = 1)]
    table_concurrency: usize,
    /// Only scrub these configured tables.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
    /// Seed for reproducible values.
    #[arg(long)]
    seed: Option<u64>,
    /// Locale for localized generators.
    #[arg(long, default_value_t = LocaleKey::EnUs)]
    locale: LocaleKey,
    /// Maximum pool connections.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(long, short, default_value = "carwash.toml")]
    config: PathBuf,
}

#[derive(Args, Debug)]
struct ConfigSchemaArgs {
    /// Write the schema here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scrub(args) => run_scrub(args).await,
        Command::Check(args) => run_check(args),
        Command::Generators => run_generators(),
        Command::ConfigSchema(args) => run_config_schema(args),
    }
}

async fn run_scrub(args: ScrubArgs) -> Result<(), CliError> {
    let ScrubArgs {
        config,
        database_url,
        run_dir,
        page_size,
        io_timeout_ms,
        table_concurrency,
        tables,
        seed,
        locale,
        max_connections,
    } = args;

    let engine = detect_engine(&database_url)?;
    let file = load_config_file(&config)?;
    let configuration = Configuration::from_file(&file)?;
    let options = ScrubOptions {
        page_size,
        io_timeout_ms,
        table_concurrency,
        tables: if tables.is_empty() { None } else { Some(tables) },
    };
    options.validate()?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        engine: engine.to_string(),
        run_dir,
        config_path: config,
        config: file,
        options: options.clone(),
        seed,
        locale: locale.to_string(),
        connection: redact_connection_string(&database_url),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        engine = %engine,
        tables = configuration.len()
    );
    let timer = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&database_url)
        .await?;
    let store = PostgresStore::new(pool);

    let generator = match seed {
        Some(seed) => FakerGenerator::new(seed),
        None => FakerGenerator::from_entropy(),
    }
    .with_locale(locale);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "shutdown_requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let scrub = ScrubEngine::new(options).with_shutdown(shutdown_rx);
    let report = match scrub.run(&configuration, &store, &generator).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(event = "run_finished", status = "failed", error = %err);
            return Err(err.into());
        }
    };
    write_report(&run_paths, &report)?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    print_summary(&report);
    println!("artifacts: {}", run_paths.root.display());
    tracing::info!(
        event = "run_finished",
        status = ?report.status,
        duration_ms = timer.elapsed().as_millis() as u64
    );

    if !report.is_success() {
        return Err(CliError::Unsuccessful {
            status: report.status,
            report: run_paths.report_path,
        });
    }
    Ok(())
}

/// Resolve every formatter and try each named generator once.
fn run_check(args: CheckArgs) -> Result<(), CliError> {
    init_console_logging()?;
    let file = load_config_file(&args.config)?;
    let configuration = Configuration::from_file(&file)?;
    let types = FormatterTypes::with_builtins();
    let generator = FakerGenerator::new(0);
    let mut resolver = Resolver::new(&types);
    let mut problems = Vec::new();

    for (table, config) in configuration.tables() {
        resolver.resolve_entry(&config.entry)?;
        let formatters = match &config.entry {
            TableEntry::Fields(fields) => {
                for (field, spec) in fields {
                    if let FormatterSpec::NamedGenerator { name, args } = spec {
                        if let Err(err) = generator.invoke(name, args) {
                            problems.push(format!("{table}.{field}: {err}"));
                        }
                    }
                }
                fields.len()
            }
            TableEntry::Record(_) => 1,
        };
        println!("{table}: {} formatter(s), {}", formatters, config.entry.shape());
    }

    if !problems.is_empty() {
        return Err(CliError::InvalidFormatters(problems.join("; ")));
    }
    println!("ok: {} table(s)", configuration.len());
    Ok(())
}

fn run_generators() -> Result<(), CliError> {
    let generator = FakerGenerator::new(0);
    for name in generator.capabilities() {
        println!("{name}");
    }
    for (name, shape) in FormatterTypes::with_builtins().names() {
        println!("{name} ({shape} type)");
    }
    Ok(())
}

fn run_config_schema(args: ConfigSchemaArgs) -> Result<(), CliError> {
    let schema = serde_json::to_string_pretty(&config_json_schema())?;
    match args.out {
        Some(path) => std::fs::write(path, schema)?,
        None => println!("{schema}"),
    }
    Ok(())
}

fn print_summary(report: &ScrubReport) {
    println!("run {} {:?}", report.run_id, report.status);
    for table in &report.tables {
        let outcome = match &table.outcome {
            TableOutcome::Completed => "completed".to_string(),
            TableOutcome::Aborted { code, .. } => format!("aborted ({code})"),
            TableOutcome::Skipped { reason } => format!("skipped ({reason})"),
            TableOutcome::Cancelled => "cancelled".to_string(),
        };
        println!(
            "  {}: {} scrubbed, {} failed, {}",
            table.table, table.records_scrubbed, table.records_failed, outcome
        );
    }
    for warning in &report.warnings {
        println!("  warning [{}] {}", warning.code, warning.message);
    }
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}

