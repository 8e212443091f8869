use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use sqlbatch_core::{BatchEvent, BatchParser, DEFAULT_SEPARATOR, ReaderSource, SplitOptions};
use sqlbatch_db::{MigrationLoader, RunnerConfig};
use sqlbatch_sqlite::{MigrationRunner, MigrationState};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sqlbatch")]
#[command(about = "Split SQL scripts on GO separators and apply them as migrations")]
struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a script into batches and separator directives.
    Split(SplitArgs),
    /// List the migrations selected by a config file.
    List(ListArgs),
    /// Apply or inspect migrations in a SQLite database.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct SplitArgs {
    /// Script to split (reads stdin when omitted).
    input: Option<PathBuf>,
    /// Batch-separator keyword.
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    separator: String,
    /// Remove comments from the emitted batches.
    #[arg(long)]
    strip_comments: bool,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Path to sqlbatch.yml.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Apply pending migrations.
    Up(MigrateUpArgs),
    /// Show the state of every migration.
    Status(MigrateStatusArgs),
}

#[derive(Debug, Args)]
struct MigrateUpArgs {
    /// Path to sqlbatch.yml.
    #[arg(long)]
    config: PathBuf,
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Stop after this version.
    #[arg(long)]
    to: Option<i64>,
}

#[derive(Debug, Args)]
struct MigrateStatusArgs {
    /// Path to sqlbatch.yml.
    #[arg(long)]
    config: PathBuf,
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: CliOutputFormat,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Split(args) => run_split(args),
        Command::List(args) => run_list(args),
        Command::Migrate(args) => run_migrate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// `--verbose` forces debug output; otherwise `RUST_LOG` applies, falling
/// back to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// split command
// ---------------------------------------------------------------------------

fn run_split(args: SplitArgs) -> Result<(), String> {
    let parser = BatchParser::new("\n")
        .and_then(|parser| parser.with_separator(&args.separator))
        .map_err(|e| format!("Invalid separator '{}': {e}", args.separator))?;
    let options = SplitOptions {
        strip_comments: args.strip_comments,
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| format!("Failed to open '{}': {e}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(std::io::stdin().lock()),
    };
    let source = ReaderSource::new(reader);

    match args.format {
        CliOutputFormat::Text => {
            let mut out = std::io::stdout().lock();
            for event in parser.batches(source, options) {
                let written = match event.map_err(|e| e.to_string())? {
                    BatchEvent::Batch(sql) => write!(out, "{sql}"),
                    BatchEvent::Directive(directive) => writeln!(out, "{}", directive.token),
                };
                written.map_err(|e| format!("Failed to write output: {e}"))?;
            }
            Ok(())
        }
        CliOutputFormat::Json => {
            let events = parser.split(source, options).map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&events)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            println!("{json}");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// list command
// ---------------------------------------------------------------------------

fn run_list(args: ListArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let loader = MigrationLoader::new(&config.scripts_dir, config.filter.clone());
    let migrations = loader
        .load()
        .map_err(|e| format!("Failed to load migrations: {e}"))?;

    for migration in migrations.values() {
        let mut line = format!("{:>6}  {}", migration.version, migration.description);
        if !migration.namespace.is_empty() {
            line.push_str(&format!("  ({})", migration.namespace));
        }
        if !migration.tags.is_empty() {
            line.push_str(&format!("  [{}]", migration.tags.join(", ")));
        }
        println!("{line}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(args: MigrateArgs) -> Result<(), String> {
    match args.operation {
        MigrateOperation::Up(a) => run_migrate_up(a),
        MigrateOperation::Status(a) => run_migrate_status(a),
    }
}

fn run_migrate_up(args: MigrateUpArgs) -> Result<(), String> {
    let mut runner = open_runner(&args.config, &args.db)?;
    let report = match args.to {
        Some(target) => runner.up_to(target),
        None => runner.up(),
    }
    .map_err(|e| format!("Migration up failed: {e}"))?;

    if report.applied.is_empty() {
        println!("Database '{}' is up to date.", args.db.display());
        return Ok(());
    }
    println!("Migration up complete:");
    for version in &report.applied {
        println!("  Applied: {version}");
    }
    println!("  Batches executed: {}", report.batches_executed);
    Ok(())
}

fn run_migrate_status(args: MigrateStatusArgs) -> Result<(), String> {
    let runner = open_runner(&args.config, &args.db)?;
    let statuses = runner
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;

    match args.format {
        CliOutputFormat::Json => {
            let json = serde_json::to_string_pretty(&statuses)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            println!("{json}");
        }
        CliOutputFormat::Text => {
            println!("Migration Status:");
            for status in &statuses {
                println!(
                    "  {:>6}  {:<8}  {}",
                    status.version,
                    state_label(status.state),
                    status.description
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<RunnerConfig, String> {
    RunnerConfig::load(path)
        .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))
}

fn open_runner(config: &Path, db: &Path) -> Result<MigrationRunner, String> {
    let config = load_config(config)?;
    debug!(db = %db.display(), scripts = %config.scripts_dir.display(), "opening database");
    let conn = rusqlite::Connection::open(db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))?;
    MigrationRunner::new(conn, config).map_err(|e| format!("Failed to initialize runner: {e}"))
}

fn state_label(state: MigrationState) -> &'static str {
    match state {
        MigrationState::Applied => "applied",
        MigrationState::Pending => "pending",
        MigrationState::Modified => "modified",
        MigrationState::Orphaned => "orphaned",
    }
}
