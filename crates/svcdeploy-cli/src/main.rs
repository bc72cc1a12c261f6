//! svcdeploy - Windows service bundle installer
//!
//! Usage:
//!   svcdeploy                # Interactive menu (install / remove)
//!   svcdeploy install        # Install and start every service
//!   svcdeploy remove --yes   # Remove every service and the base directory
//!   svcdeploy status         # Show where each service stands

mod interactive;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use svcdeploy_core::commands::{DeployContext, InstallCommand, RemoveCommand, StatusCommand};
use svcdeploy_core::config::default_config_path;
use svcdeploy_core::config::paths::default_log_path;
use svcdeploy_core::orchestration::{Issue, RunAction, RunReport};
use svcdeploy_core::status::{ServiceStatus, SystemStatus};

use crate::interactive::{InteractiveFlow, MenuChoice, PrefilledOptions};

const DEFAULT_LOG_FILTER: &str = "svcdeploy=info,svcdeploy_core=info";

#[derive(Parser)]
#[command(name = "svcdeploy")]
#[command(about = "Install and remove bundled Windows services", long_about = None)]
struct Cli {
    /// Path to services.toml (default: next to the executable)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Append log output to this file (default: svcdeploy.log next to the config)
    #[arg(long, global = true, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Log to the console only
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage, register and start every service
    Install {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Stop and unregister every service, then delete the base directory
    #[command(alias = "uninstall")]
    Remove {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show registry state and staged files for every service
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show problems (non-zero exit if any)
    Quiet,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path(),
    };
    let log_path = if cli.no_log_file {
        None
    } else {
        cli.log_file
            .clone()
            .or_else(|| config_path.as_deref().ok().map(default_log_path))
    };
    init_tracing(log_path.as_deref());

    let config_path = config_path?;
    match cli.command {
        Some(command) => run_cli(command, &config_path),
        None => run_menu(&config_path),
    }
}

/// Console layer plus an optional append-only plain-text file layer.
fn init_tracing(log_path: Option<&Path>) {
    let mut file_error = None;
    let file_layer = log_path.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(err) => {
                file_error = Some((path.to_path_buf(), err));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some((path, err)) = file_error {
        warn!(path = %path.display(), error = %err, "Could not open log file, logging to console only");
    }
}

fn run_cli(command: Commands, config_path: &Path) -> Result<ExitCode> {
    let ctx = DeployContext::load(config_path)?;

    match command {
        Commands::Install { format } => {
            let report = InstallCommand::new(&ctx).execute();
            print_run_report(&report, format)?;
            Ok(exit_code(report.succeeded))
        }
        Commands::Remove { yes, format } => {
            if !yes {
                let prefilled = PrefilledOptions {
                    choice: Some(MenuChoice::Remove),
                    yes,
                };
                if !InteractiveFlow::new(ctx.config(), prefilled).collect()?.confirmed {
                    println!("Removal cancelled.");
                    return Ok(ExitCode::SUCCESS);
                }
            }
            let report = RemoveCommand::new(&ctx).execute();
            print_run_report(&report, format)?;
            Ok(exit_code(report.succeeded))
        }
        Commands::Status { format } => {
            let status = StatusCommand::new(&ctx).execute();
            print_status(&status, format)
        }
    }
}

/// No command given: menu, run, then keep the console open.
fn run_menu(config_path: &Path) -> Result<ExitCode> {
    let code = match run_menu_choice(config_path) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    };
    interactive::pause(&mut io::stdout(), io::stdin().lock())?;
    Ok(code)
}

fn run_menu_choice(config_path: &Path) -> Result<ExitCode> {
    let ctx = DeployContext::load(config_path)?;
    let result = InteractiveFlow::new(ctx.config(), PrefilledOptions::default()).collect()?;
    if !result.confirmed {
        println!("Removal cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = match result.choice {
        MenuChoice::Install => InstallCommand::new(&ctx).execute(),
        MenuChoice::Remove => RemoveCommand::new(&ctx).execute(),
    };
    print_run_report(&report, OutputFormat::Table)?;
    Ok(exit_code(report.succeeded))
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// Run reports
// =============================================================================

fn print_run_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_run_table(report),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": 1,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {
            for def in report.failed_definitions() {
                for issue in def.errors() {
                    println!("{}: {}", def.name, issue.error);
                }
            }
            for issue in report.issues.iter().filter(|i| i.is_error()) {
                println!("{}", issue.error);
            }
        }
    }
    Ok(())
}

fn print_run_table(report: &RunReport) {
    println!();
    for def in &report.definitions {
        if def.succeeded() {
            println!("✓ {}", def.name);
        } else if def.skipped {
            println!("✗ {} (skipped)", def.name);
        } else {
            println!("✗ {}", def.name);
        }
        for issue in &def.issues {
            println!("  {} {}", issue_symbol(issue), issue.error);
        }
    }
    for issue in &report.issues {
        println!("{} {}", issue_symbol(issue), issue.error);
    }

    println!();
    println!("{}", summary_line(report));
    let warnings = report.warning_count();
    if warnings > 0 {
        println!("  {} warning(s), see the log for details", warnings);
    }
}

fn issue_symbol(issue: &Issue) -> &'static str {
    if issue.is_error() { "✗" } else { "⚠" }
}

fn summary_line(report: &RunReport) -> String {
    match (report.action, report.succeeded) {
        (RunAction::Install, true) => "✓ All services installed and started successfully.".into(),
        (RunAction::Remove, true) => "✓ All services removed.".into(),
        (action, false) => format!(
            "✗ {} finished with {} error(s) across {} failed service(s).",
            match action {
                RunAction::Install => "Installation",
                RunAction::Remove => "Removal",
            },
            report.error_count(),
            report.failed_definitions().count()
        ),
    }
}

// =============================================================================
// Status
// =============================================================================

fn print_status(status: &SystemStatus, format: OutputFormat) -> Result<ExitCode> {
    match format {
        OutputFormat::Table => print_status_table(status),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "schema_version": 1,
                "base_dir": status.base_dir,
                "wrapper_present": status.wrapper_present,
                "services": status.services,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {
            let problems: Vec<_> = status
                .services
                .iter()
                .filter(|s| !is_healthy(s))
                .collect();
            for service in &problems {
                println!(
                    "{}: {} ({})",
                    service.name,
                    state_label(service),
                    files_label(service)
                );
            }
            return Ok(exit_code(problems.is_empty()));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_status_table(status: &SystemStatus) {
    println!("Base directory: {}", status.base_dir.display());
    println!(
        "Wrapper: {}",
        if status.wrapper_present {
            "provisioned"
        } else {
            "missing"
        }
    );
    println!();

    println!("  {:<24} {:<14} {:<10} Destination", "Name", "State", "Files");
    println!("  {}", "-".repeat(70));
    for service in &status.services {
        println!(
            "  {:<24} {:<14} {:<10} {}",
            truncate(&service.name, 24),
            state_label(service),
            files_label(service),
            service.destination.display()
        );
    }

    println!();
    if status.all_running() {
        println!("Summary: {} services, all running", status.services.len());
    } else {
        let issues = status.services.iter().filter(|s| !is_healthy(s)).count();
        println!(
            "Summary: {} services, {} need attention (run 'svcdeploy install' to resolve)",
            status.services.len(),
            issues
        );
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_healthy(service: &ServiceStatus) -> bool {
    use svcdeploy_core::types::DeploymentState;
    service.state == Some(DeploymentState::Running) && service.files_current != Some(false)
}

fn state_label(service: &ServiceStatus) -> &'static str {
    service.state.map(|s| s.as_str()).unwrap_or("unknown")
}

fn files_label(service: &ServiceStatus) -> &'static str {
    match (service.files_present, service.files_current) {
        (false, _) => "missing",
        (true, Some(true)) => "current",
        (true, Some(false)) => "outdated",
        (true, None) => "present",
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
