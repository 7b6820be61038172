//! cpvalidate - Check the content of a content package against path rules.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpvalidate_common::PathPattern;
use cpvalidate_policy::RuleMode;
use cpvalidate_validator::{
    dump_content, load_config, run_validation, OutputFormat, ValidateError, ValidationConfig,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cpvalidate")]
#[command(
    author,
    version,
    about = "Validate the paths inside a content package, including embedded subpackages"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every entry of a package against the path rules
    Validate {
        /// Package file (".zip" is appended when missing)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Configuration file (YAML or JSON)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Path rule, repeatable (replaces the rules from the config file)
        #[arg(long = "rule")]
        rules: Vec<String>,

        /// Rule convention (allow-list, deny-list)
        #[arg(long)]
        mode: Option<String>,

        /// Exit with an error when violations are found
        #[arg(long)]
        break_build: bool,

        /// Report every embedded subpackage as a violation
        #[arg(long)]
        disallow_subpackages: bool,

        /// Pattern identifying embedded subpackages
        #[arg(long)]
        subpackage_pattern: Option<String>,

        /// Exit with an error when the package does not exist
        #[arg(long)]
        fail_on_missing: bool,

        /// Report format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List every entry of a package, including subpackage content
    Dump {
        /// Package file (".zip" is appended when missing)
        #[arg(long)]
        target: PathBuf,

        /// Pattern identifying embedded subpackages
        #[arg(long)]
        subpackage_pattern: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Validate {
            target,
            config,
            rules,
            mode,
            break_build,
            disallow_subpackages,
            subpackage_pattern,
            fail_on_missing,
            format,
        } => {
            let mut settings = match config {
                Some(path) => load_config(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ValidationConfig::default(),
            };

            // Command line flags win over the config file
            if let Some(target) = target {
                settings.target = target;
            }
            if !rules.is_empty() {
                settings.rules = rules;
            }
            if let Some(mode) = mode {
                settings.mode = mode.parse::<RuleMode>()?;
            }
            if let Some(pattern) = subpackage_pattern {
                settings.subpackage_pattern = pattern;
            }
            settings.break_build_on_violation |= break_build;
            settings.allow_subpackages &= !disallow_subpackages;
            settings.fail_on_missing_target |= fail_on_missing;

            settings.validate()?;
            if settings.target.as_os_str().is_empty() {
                anyhow::bail!("No target given, use --target or set it in the config file");
            }

            let format: OutputFormat = format.parse()?;
            info!("Validating {} ({})", settings.target.display(), settings.policy_string());

            let report = match run_validation(&settings) {
                Ok(report) => report,
                Err(ValidateError::TargetMissing(path)) if !settings.fail_on_missing_target => {
                    error!("File {} does not exist", path.display());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if format.logs_findings() {
                report.log();
            }
            print!("{}", report.render(format)?);
            if format == OutputFormat::Json {
                println!();
            }

            report.enforce(settings.break_build_on_violation)?;
        }

        Commands::Dump {
            target,
            subpackage_pattern,
        } => {
            let pattern = match subpackage_pattern {
                Some(p) => PathPattern::new(&p)?,
                None => PathPattern::subpackages(),
            };

            let walk = dump_content(&target, pattern)?;
            for entry in &walk.entries {
                println!("{}", entry);
            }
            for failure in &walk.failures {
                error!("{}", failure);
            }
            info!("{} entries", walk.entries.len());
        }
    }

    Ok(())
}
