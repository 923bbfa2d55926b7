//! CLI binary for fastmerge.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use fastmerge::catalog::LocalCatalog;
use fastmerge::report::{JsonLinesReport, LogReport, ReportSink};
use fastmerge::schema::MatchMode;
use fastmerge::{MergeDriver, MergeError, MergerConfig};
use fastmerge_config::load_config;
use fastmerge_config::shared::MergeSettings;
use fastmerge_telemetry::tracing::init_tracing;
use tracing::{error, info};

/// Exit code of a merge that failed with a classified error.
const EXIT_MERGE_ERROR: u8 = 1;

/// Exit code of any failure that is not a merge error.
const EXIT_UNEXPECTED: u8 = 2;

/// FastMerge - Merges event-data containers into one output container.
#[derive(Parser, Debug)]
#[command(name = "fastmerge", version)]
#[command(about = "Merges event-data containers into one output container")]
struct Args {
    /// Input file (repeatable)
    #[arg(short = 'i', long = "in", value_name = "FILE")]
    inputs: Vec<String>,

    /// Input files appended after the ones given with --in
    #[arg(value_name = "INPUT")]
    positional: Vec<String>,

    /// Output file
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    output: Option<String>,

    /// Logical name of the output file
    #[arg(short = 'l', long = "logical", value_name = "LFN")]
    logical: Option<String>,

    /// Catalog used to resolve logical input names
    #[arg(short = 'c', long = "catalog", value_name = "URL")]
    catalog: Option<String>,

    /// Catalog the output is registered in
    #[arg(short = 'w', long = "writecatalog", value_name = "URL")]
    write_catalog: Option<String>,

    /// Job report destination (JSON lines)
    #[arg(short = 'j', long = "jobreport", value_name = "FILE")]
    job_report: Option<PathBuf>,

    /// Require identical provenance for every branch (default)
    #[arg(short = 's', long, conflicts_with = "permissive")]
    strict: bool,

    /// Tolerate and union differing branch provenance
    #[arg(short = 'p', long)]
    permissive: bool,

    /// Skip missing or unreadable input files
    #[arg(short = 'k', long = "skip")]
    skip: bool,

    /// Settings file (yaml or json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    /// Returns every input in the order it was given.
    fn input_names(&self) -> Vec<String> {
        self.inputs
            .iter()
            .chain(self.positional.iter())
            .cloned()
            .collect()
    }

    /// Applies the flags on top of the loaded settings.
    fn overlay(&self, settings: &mut MergeSettings) {
        if self.strict {
            settings.strict = true;
        }
        if self.permissive {
            settings.strict = false;
        }
        if self.skip {
            settings.skip_missing = true;
        }
        if let Some(catalog) = &self.catalog {
            settings.input_catalog = Some(catalog.clone());
        }
        if let Some(catalog) = &self.write_catalog {
            settings.output_catalog = Some(catalog.clone());
        }
        if let Some(path) = &self.job_report {
            settings.job_report = Some(path.clone());
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_MERGE_ERROR } else { 0 };
            let _ = err.print();

            return ExitCode::from(code);
        }
    };

    let _log_flusher = match init_tracing(env!("CARGO_BIN_NAME")) {
        Ok(flusher) => flusher,
        Err(err) => {
            eprintln!("{err}");

            return ExitCode::from(EXIT_UNEXPECTED);
        }
    };

    match panic::catch_unwind(AssertUnwindSafe(|| run(&args))) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!("{err:#}");
            eprintln!("{err:#}");

            ExitCode::from(EXIT_MERGE_ERROR)
        }
        Err(_) => {
            error!("merge aborted by an unexpected failure");

            ExitCode::from(EXIT_UNEXPECTED)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut settings = load_config::<MergeSettings>(args.config.as_deref())
        .map_err(MergeError::from)
        .context("failed to load settings")?;
    args.overlay(&mut settings);
    settings
        .validate()
        .map_err(MergeError::from)
        .context("invalid settings")?;

    let match_mode = if settings.strict {
        MatchMode::Strict
    } else {
        MatchMode::Permissive
    };
    info!(
        output = args.output.as_deref().unwrap_or_default(),
        mode = ?match_mode,
        skip_missing = settings.skip_missing,
        "starting fastmerge"
    );

    let config = MergerConfig::from_settings(args.output.clone(), &settings)
        .with_logical_output(args.logical.clone());
    let catalog = LocalCatalog::open(
        settings.input_catalog.as_deref(),
        settings.output_catalog.as_deref(),
    )?;
    let report: Box<dyn ReportSink> = match &settings.job_report {
        Some(path) => Box::new(JsonLinesReport::create(path)?),
        None => Box::new(LogReport::new()),
    };

    let mut driver = MergeDriver::new(config, catalog, report);
    let summary = driver.run(&args.input_names())?;

    info!(
        output = %summary.output_path.display(),
        file_identifier = %summary.file_identifier,
        inputs = summary.inputs_merged,
        skipped = summary.inputs_skipped,
        events = summary.events_written,
        "fastmerge completed successfully"
    );

    Ok(())
}
