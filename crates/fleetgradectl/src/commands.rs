//! Command implementations
//!
//! Each command returns the process exit code. Paths given on the command
//! line win over the `[settings]` section of the config file.

use crate::cli::{ConfigCommands, ExportArgs, ListArgs, ScanArgs, SetArgs, ShowArgs};
use crate::display;
use crate::errors::{exit_code_for, EXIT_GENERAL_ERROR, EXIT_SUCCESS};
use anyhow::{bail, Context as _, Result};
use chrono::{Local, NaiveDate};
use fleetgrade_common::config::CONFIG_FILE_NAME;
use fleetgrade_common::export::export_all;
use fleetgrade_common::{
    BatchRunner, CancelToken, Category, ClassifiedRecord, Classifier, FleetConfig, RecordStore, ReportExtractor,
    RuleConfig, TracingSink,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Loaded configuration shared by all commands
pub struct Context {
    pub config: FleetConfig,
    /// File the config came from; `None` means built-in defaults
    pub config_path: Option<PathBuf>,
}

impl Context {
    pub fn new(config: FleetConfig, config_path: Option<PathBuf>) -> Self {
        Self { config, config_path }
    }

    fn rules(&self) -> Arc<RuleConfig> {
        Arc::new(self.config.rule_config())
    }

    fn db_path(&self, arg: &Option<PathBuf>) -> PathBuf {
        arg.clone().unwrap_or_else(|| self.config.settings.database_path.clone())
    }

    fn output_path(&self, arg: &Option<PathBuf>) -> PathBuf {
        arg.clone().unwrap_or_else(|| self.config.settings.output_filename.clone())
    }

    fn open_store(&self, arg: &Option<PathBuf>) -> Result<RecordStore> {
        let path = self.db_path(arg);
        RecordStore::open_at(&path).with_context(|| format!("cannot open database {}", path.display()))
    }

    fn export(&self, records: &[ClassifiedRecord], output: &Path) -> Result<()> {
        let (paths, stats) = export_all(records, output, today(), self.config.analysis.ambiguous_date_order)
            .with_context(|| format!("export to {} failed", output.display()))?;
        info!(records = records.len(), "exported to {}", paths.main.display());
        display::print_statistics(&stats);
        display::print_export_paths(&paths);
        Ok(())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Scan a report directory, persist the batch, then export it
pub fn scan(ctx: &Context, args: &ScanArgs, cancel: &CancelToken) -> Result<i32> {
    let dir = args
        .dir
        .clone()
        .unwrap_or_else(|| ctx.config.settings.reports_directory.clone());
    info!("scanning {}", dir.display());

    let runner = BatchRunner::new(ctx.rules(), Arc::new(TracingSink));
    let progress = display::ScanProgress::new();
    let outcome = runner
        .run(&dir, cancel, |event| progress.handle(&event))
        .with_context(|| format!("cannot scan {}", dir.display()))?;
    progress.finish(&outcome);
    display::print_outcome(&outcome);

    // A failed write must not lose the batch; it is still exported below
    match ctx
        .open_store(&args.db)
        .and_then(|store| Ok(store.upsert_all(&outcome.records)?))
    {
        Ok(n) => info!("stored {} records", n),
        Err(err) => {
            error!("persistence failed: {:#}", err);
            eprintln!("warning: results were not stored: {:#}", err);
        }
    }

    if outcome.cancelled {
        warn!("batch cancelled, export skipped");
        return Ok(exit_code_for(&outcome));
    }
    if !args.no_export {
        ctx.export(&outcome.records, &ctx.output_path(&args.output))?;
    }
    Ok(exit_code_for(&outcome))
}

/// Export everything currently in the database
pub fn export(ctx: &Context, args: &ExportArgs) -> Result<i32> {
    let records = ctx.open_store(&args.db)?.fetch_all()?;
    if records.is_empty() {
        println!("Database is empty, nothing to export");
        return Ok(EXIT_SUCCESS);
    }
    ctx.export(&records, &ctx.output_path(&args.output))?;
    Ok(EXIT_SUCCESS)
}

/// Correct a single field in place
pub fn set(ctx: &Context, args: &SetArgs) -> Result<i32> {
    let store = ctx.open_store(&args.db)?;
    let updated = store
        .update_field(&args.file, args.field, &args.value)
        .with_context(|| format!("cannot update {} of {}", args.field, args.file))?;
    if !updated {
        bail!("no stored record for {}", args.file);
    }
    info!(file = %args.file, field = %args.field, "field updated");
    println!("{}: {} = {}", args.file, args.field, args.value);
    Ok(EXIT_SUCCESS)
}

/// Print stored records, optionally one category only
pub fn list(ctx: &Context, args: &ListArgs) -> Result<i32> {
    let mut records = ctx.open_store(&args.db)?.fetch_all()?;
    if let Some(wanted) = args.category.and_then(Category::from_u8) {
        records.retain(|r| r.category == wanted);
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        display::print_records(&records);
    }
    Ok(EXIT_SUCCESS)
}

/// Extract and classify one report without touching the database
pub fn show(ctx: &Context, args: &ShowArgs) -> Result<i32> {
    let config = ctx.rules();
    let sink = Arc::new(TracingSink);
    let facts = ReportExtractor::new(config.clone(), sink.clone())
        .extract_file(&args.file)
        .with_context(|| format!("cannot read report {}", args.file.display()))?;
    let classification = Classifier::new(config, sink).classify(&facts);

    let output = json!({
        "facts": facts,
        "category": classification.category,
        "problems": classification.problems,
        "recommendation": classification.recommendation,
        "findings": classification.findings,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(EXIT_SUCCESS)
}

pub fn config(ctx: &Context, action: &ConfigCommands) -> Result<i32> {
    match action {
        ConfigCommands::Init { path, force } => {
            let path = path.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            if path.exists() && !force {
                eprintln!("{} already exists (use --force to overwrite)", path.display());
                return Ok(EXIT_GENERAL_ERROR);
            }
            FleetConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigCommands::Show => {
            match &ctx.config_path {
                Some(path) => println!("# loaded from {}", path.display()),
                None => println!("# built-in defaults"),
            }
            let text = toml::to_string_pretty(&ctx.config).context("cannot render configuration")?;
            println!("{}", text);
        }
    }
    Ok(EXIT_SUCCESS)
}
