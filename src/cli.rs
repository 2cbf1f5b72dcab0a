use crate::config::Config;
use crate::db::SqliteAdapter;
use crate::engine::{Engine, RunMode, TargetFilter};
use crate::output;
use crate::report::Report;
use crate::rules::RuleCatalog;
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sqlite-clean")]
#[command(about = "Lint and fix data-quality issues in SQLite databases")]
#[command(version)]
pub struct Cli {
    /// Path to config file (default: sqlite-clean.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report issues without modifying the database
    Lint {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Report issues and repair the fixable ones
    Fix {
        #[command(flatten)]
        run: RunArgs,

        /// Copy the database here and fix the copy instead
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// List the available rules
    Rules {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Options shared by lint and fix
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// SQLite database file
    #[arg(long, env = "SQLITE_CLEAN_DB")]
    pub db: PathBuf,

    /// Only check these tables (repeatable)
    #[arg(short, long = "table")]
    pub tables: Vec<String>,

    /// Only check these columns of the selected tables (repeatable)
    #[arg(long = "column")]
    pub columns: Vec<String>,

    /// Only run these rules, by id or tag (repeatable)
    #[arg(short, long = "rule")]
    pub rules: Vec<String>,

    /// Disable these rules, by id or tag (repeatable)
    #[arg(long = "disable")]
    pub disable: Vec<String>,

    /// Strings treated as NULL, comma separated
    #[arg(long, value_delimiter = ',')]
    pub like_nulls: Option<Vec<String>>,

    /// Distinct values sampled per column
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Format of the report printed to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl RunArgs {
    /// File config with command-line overrides applied
    pub fn merge_into(&self, mut config: Config) -> Result<Config> {
        if let Some(like_nulls) = &self.like_nulls {
            config.like_nulls = like_nulls
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(limit) = self.sample_limit {
            config.sample_limit = limit;
        }
        config.rules.disable.extend(self.disable.iter().cloned());
        config.validate()?;
        Ok(config)
    }

    pub fn filter(&self) -> TargetFilter {
        TargetFilter {
            tables: self.tables.clone(),
            columns: self.columns.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        Ok(Config::discover(self.config.as_deref(), &cwd)?)
    }

    /// Execute the selected command and return the process exit code
    pub fn execute(&self) -> Result<i32> {
        let config = self.load_config()?;
        match &self.command {
            Commands::Lint { run } => lint_command(&config, run),
            Commands::Fix { run, dest } => fix_command(&config, run, dest.as_deref()),
            Commands::Rules { format } => rules_command(&config, *format),
        }
    }
}

/// Effective config and catalog for a run
fn prepare(config: &Config, args: &RunArgs) -> Result<(Config, RuleCatalog)> {
    let config = args.merge_into(config.clone())?;
    let catalog = config.catalog()?;
    Ok((config, catalog))
}

fn open_existing(db: &Path) -> Result<SqliteAdapter> {
    anyhow::ensure!(db.is_file(), "Database file {} not found", db.display());
    Ok(SqliteAdapter::open(db)?)
}

fn engine<'a>(adapter: &'a SqliteAdapter, config: &Config) -> Engine<'a> {
    Engine::new(adapter)
        .with_label(adapter.label())
        .with_sample_limit(config.sample_limit)
}

fn run_engine(config: &Config, args: &RunArgs, db: &Path, mode: RunMode) -> Result<Report> {
    let (config, catalog) = prepare(config, args)?;
    let adapter = open_existing(db)?;
    let report = engine(&adapter, &config).run(&catalog, mode, Some(&args.filter()))?;
    Ok(report)
}

/// Copy `source` to `dest`, replacing it, once the run is known to be valid
fn copy_for_fix(config: &Config, args: &RunArgs, dest: &Path) -> Result<()> {
    let (config, catalog) = prepare(config, args)?;
    let source = open_existing(&args.db)?;
    anyhow::ensure!(
        !same_file(&args.db, dest),
        "Destination {} is the source database",
        dest.display()
    );
    engine(&source, &config).validate(&catalog, Some(&args.filter()))?;

    source.copy_to(dest)?;
    info!(source = %args.db.display(), dest = %dest.display(), "Copied database");
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn emit(report: &Report, args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.output {
        output::write_report(report, path)?;
        info!(path = %path.display(), "Report written");
    }
    match args.format {
        OutputFormat::Json => println!("{}", output::to_json(report)?),
        OutputFormat::Text => {
            let path = args.output.as_ref().map(|p| p.display().to_string());
            output::print_summary(report, path.as_deref());
        }
    }
    Ok(())
}

fn lint_command(config: &Config, args: &RunArgs) -> Result<i32> {
    let report = run_engine(config, args, &args.db, RunMode::Lint)?;
    emit(&report, args)?;

    if let Some(message) = output::clean_message(&report, &args.db.display().to_string()) {
        eprintln!("{}", message);
    }
    Ok(if report.summary().findings_count > 0 { 1 } else { 0 })
}

fn fix_command(config: &Config, args: &RunArgs, dest: Option<&Path>) -> Result<i32> {
    let target = match dest {
        Some(dest) => {
            copy_for_fix(config, args, dest)?;
            dest.to_path_buf()
        }
        None => args.db.clone(),
    };

    let report = run_engine(config, args, &target, RunMode::Fix)?;
    emit(&report, args)?;

    let failed = report.summary().fixes_failed > 0 || !report.rule_failures().is_empty();
    if let Some(message) = output::clean_message(&report, &target.display().to_string()) {
        eprintln!("{}", message);
    }
    Ok(if failed { 1 } else { 0 })
}

fn rules_command(config: &Config, format: OutputFormat) -> Result<i32> {
    let catalog = config.catalog()?;
    let rules = catalog.describe();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&rules).context("Failed to serialize rules")?
        ),
        OutputFormat::Text => {
            for rule in &rules {
                println!(
                    "{}  {}{}{}",
                    rule.id,
                    rule.name,
                    if rule.fixable { " (fixable)" } else { "" },
                    if rule.enabled { "" } else { " [disabled]" }
                );
                if !rule.description.is_empty() {
                    println!("       {}", rule.description);
                }
            }
        }
    }
    Ok(0)
}
