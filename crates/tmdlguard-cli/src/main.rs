use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tmdlguard_core::{Config, ValidationReport, CONFIG_FILE_NAME};
use tmdlguard_engine::validate_project;

/// tmdlguard - Offline validation of TMDL semantic-model folders
#[derive(Parser)]
#[command(name = "tmdlguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the .SemanticModel folder
    #[arg(value_name = "PATH")]
    target: Option<PathBuf>,

    /// Path to the .SemanticModel folder
    #[arg(short, long, value_name = "PATH")]
    path: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(short, long)]
    json: bool,

    /// Path to config file (default: tmdlguard.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Parse files one at a time
    #[arg(long)]
    sequential: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            err.print()?;
            return Ok(ExitCode::from(code));
        }
    };

    init_tracing(cli.verbose);

    let Some(root) = cli.path.clone().or_else(|| cli.target.clone()) else {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::from(1));
    };

    let mut config = load_config(cli.config.as_deref())?;
    if cli.sequential {
        config.parallel = false;
    }

    let outcome = validate_project(&root, &config);
    let report = outcome.to_report(root.display().to_string());

    if let Some(output) = &cli.output {
        report
            .save_to_file(output)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        tracing::info!(output = %output.display(), "report written");
    }

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_text_report(&report);
    }

    Ok(if report.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(CONFIG_FILE_NAME);
    if default_path.exists() {
        return Config::from_file(default_path)
            .with_context(|| format!("Failed to load config from {CONFIG_FILE_NAME}"));
    }

    tracing::debug!("no config file found, using defaults");
    Ok(Config::default())
}

fn rule_line() -> String {
    "=".repeat(80)
}

fn display_timestamp(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&chrono::Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn print_text_report(report: &ValidationReport) {
    println!("{}", rule_line());
    println!("{}", "TMDL VALIDATION REPORT".bold());
    println!("{}", rule_line());
    println!("Path: {}", report.path);
    println!("Timestamp: {}", display_timestamp(&report.timestamp));
    println!("{}", rule_line());
    println!();

    if report.is_valid {
        println!("{}", "[SUCCESS] TMDL project is valid!".green().bold());
        println!();
        if let Some(name) = &report.database_name {
            println!("Database Name: {name}");
        }
        if let Some(level) = report.compatibility_level {
            println!("Compatibility Level: {level}");
        }
        println!();
        println!("This project can be opened in Power BI Desktop without errors.");
    } else {
        let category = report
            .error_type
            .map(|c| c.as_str().to_uppercase())
            .unwrap_or_else(|| "ERROR".to_string());
        println!("{}", format!("[{category}] TMDL validation failed!").red().bold());
        println!();
        println!("Error: {}", report.message);

        if let Some(rule) = report.rule {
            println!("Rule: {rule}");
        }

        if let Some(document) = &report.document {
            println!();
            println!("Error Location:");
            println!("  Document: {}", document.cyan());
            if let Some(line) = report.line_number {
                println!("  Line Number: {line}");
            }
            if let Some(text) = &report.line_text {
                println!("  Line Text: {text}");
            }
        }

        if let Some(detail) = &report.detail {
            println!();
            println!("Detail:");
            println!("{detail}");
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{}", "Warnings:".yellow().bold());
        for warning in &report.warnings {
            println!(
                "  {} {} ({}:{})",
                format!("[{}]", warning.code).yellow(),
                warning.message,
                warning.position.document,
                warning.position.line
            );
        }
    }

    println!();
    println!("{}", rule_line());
}
