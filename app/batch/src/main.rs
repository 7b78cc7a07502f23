//! FILENAME: app/batch/src/main.rs
// PURPOSE: Command-line entry point of the batch editor.
// FORMAT: log lines go to stderr as seq|level|category|message

use std::path::PathBuf;
use std::process::ExitCode;

use app_lib::{logging, run_batch, BatchConfig, BatchReport, CancelToken, FileStatus, StepList};
use clap::{Parser, Subcommand};
use log::LevelFilter;

/// Success: every step succeeded and every file was saved.
const EXIT_SUCCESS: u8 = 0;
/// The batch ran but a step or file failed, or it was stopped.
const EXIT_ERROR: u8 = 1;
/// Bad arguments, unreadable step list or configuration.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "calcula-batch")]
#[command(about = "Runs a list of editing steps over xlsx workbooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a step list over one or more workbooks
    Run {
        /// Step list (JSON array of {"operation", "params"})
        #[arg(long, short = 's')]
        steps: PathBuf,

        /// Output directory (overrides the configuration)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Batch configuration (JSON)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Also write log lines to this file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Do not write the execution report
        #[arg(long)]
        no_report: bool,

        /// Stop at the first failed step; nothing is saved
        #[arg(long)]
        stop_on_error: bool,

        /// Debug logging
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Errors only
        #[arg(long, short = 'q', conflicts_with = "verbose")]
        quiet: bool,

        /// Input workbooks
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check a step list without touching any workbook
    Validate {
        #[arg(long, short = 's')]
        steps: PathBuf,
    },

    /// Write an example step list
    ExportTemplate {
        /// Destination file; stdout when omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

struct CliError {
    code: u8,
    message: String,
}

impl CliError {
    fn usage(message: impl ToString) -> Self {
        CliError {
            code: EXIT_USAGE,
            message: message.to_string(),
        }
    }

    fn failed(message: impl ToString) -> Self {
        CliError {
            code: EXIT_ERROR,
            message: message.to_string(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            steps,
            output,
            config,
            log,
            no_report,
            stop_on_error,
            verbose,
            quiet,
            files,
        } => {
            let level = if verbose {
                LevelFilter::Debug
            } else if quiet {
                LevelFilter::Error
            } else {
                LevelFilter::Info
            };
            cmd_run(RunArgs {
                steps,
                output,
                config,
                log,
                no_report,
                stop_on_error,
                level,
                files,
            })
        }
        Commands::Validate { steps } => cmd_validate(steps),
        Commands::ExportTemplate { output } => cmd_export_template(output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            ExitCode::from(code)
        }
    }
}

struct RunArgs {
    steps: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    log: Option<PathBuf>,
    no_report: bool,
    stop_on_error: bool,
    level: LevelFilter,
    files: Vec<PathBuf>,
}

fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::load(path).map_err(CliError::usage)?,
        None => BatchConfig::default(),
    };
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if args.no_report {
        config.write_report = false;
    }
    if args.stop_on_error {
        config.keep_going_on_step_error = false;
    }
    if let Some(log) = args.log {
        config.log_file = Some(log);
    }

    logging::init(args.level, config.log_file.as_deref()).map_err(CliError::usage)?;

    let steps = StepList::load(&args.steps).map_err(CliError::usage)?;
    let report = run_batch(
        config,
        &steps,
        &args.files,
        CancelToken::new(),
        Some(Box::new(|done: usize, total: usize| {
            log::debug!(target: "STEP", "progress {}/{}", done, total);
        })),
    )
    .map_err(CliError::failed)?;

    print_summary(&report);
    if report.all_succeeded() {
        Ok(())
    } else {
        Err(CliError::failed(""))
    }
}

fn print_summary(report: &BatchReport) {
    for step in &report.steps {
        let mark = if step.success { "ok  " } else { "FAIL" };
        println!("{} {:>3}  {}  {}", mark, step.step, step.display_name, step.detail);
    }
    for file in &report.files {
        match &file.status {
            FileStatus::Saved(path) => println!("saved   {}", path.display()),
            FileStatus::LoadFailed(e) => println!("skipped {}: {}", file.input.display(), e),
            FileStatus::SaveFailed(e) => println!("failed  {}: {}", file.input.display(), e),
            FileStatus::NotSaved(reason) => println!("unsaved {}: {}", file.input.display(), reason),
        }
    }
    if let Some(path) = &report.report_path {
        println!("report  {}", path.display());
    }
}

fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let steps = StepList::load(&path).map_err(CliError::usage)?;
    let errors = steps.errors();
    if errors.is_empty() {
        println!("{} step(s), all valid", steps.len());
        return Ok(());
    }
    for (number, error) in &errors {
        println!("step {}: {}", number, error);
    }
    Err(CliError::failed(format!("{} of {} step(s) invalid", errors.len(), steps.len())))
}

fn cmd_export_template(output: Option<PathBuf>) -> Result<(), CliError> {
    let template = StepList::template();
    match output {
        Some(path) => {
            template.save(&path).map_err(CliError::failed)?;
            println!("template written to {}", path.display());
        }
        None => println!("{}", template.to_json().map_err(CliError::failed)?),
    }
    Ok(())
}
