//! `modgate` command-line front end.
//!
//! Reads the run configuration from the environment, applies command-line
//! overrides, selects modules and renders the run report.

mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use modgate::config::RunConfig;
use modgate::contracts::{validate_contract, ContractExtractor};
use modgate::events::LoggingEventSink;
use modgate::pipeline::Orchestrator;
use modgate::suite::ModuleSuite;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "modgate", version, about = "Contract and stage checks for router modules")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the stage pipeline over the selected modules.
    Run(RunArgs),
    /// List the modules in the suite.
    List(SuiteArgs),
    /// Show the declarations found in one module and check its contract.
    Extract {
        /// Module name.
        module: String,
        #[command(flatten)]
        suite: SuiteArgs,
    },
}

#[derive(Args, Clone, Default)]
struct SuiteArgs {
    /// TOML suite file replacing the built-in catalog.
    #[arg(long)]
    suite: Option<PathBuf>,
    /// Directory holding one subdirectory per module.
    #[arg(long)]
    modules_root: Option<PathBuf>,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    suite: SuiteArgs,
    /// Run only this module (`all` runs every module).
    #[arg(long)]
    module: Option<String>,
    /// Per-command timeout in seconds; 0 disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Modules validated concurrently.
    #[arg(long)]
    parallel: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Loads the configuration and the suite it points at.
fn load(args: &SuiteArgs) -> Result<(RunConfig, ModuleSuite)> {
    let mut config = RunConfig::from_env().context("failed to read configuration")?;
    if let Some(root) = &args.modules_root {
        config.modules_root.clone_from(root);
    }

    let suite = match &args.suite {
        Some(path) => ModuleSuite::load(path, &config.modules_root)
            .with_context(|| format!("failed to load suite {}", path.display()))?,
        None => ModuleSuite::builtin(&config.modules_root),
    };
    let suite = suite.with_path_overrides(&config.module_paths);
    debug!(
        modules = suite.len(),
        root = %config.modules_root.display(),
        "Suite ready"
    );
    Ok((config, suite))
}

fn module_filter(requested: Option<&str>) -> Option<String> {
    requested
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase)
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let (mut config, suite) = load(&args.suite)?;
    if let Some(name) = args.module.as_deref() {
        config.module_filter = module_filter(Some(name));
    }
    if let Some(secs) = args.timeout_secs {
        config.tool.timeout_secs = secs;
    }
    if let Some(parallel) = args.parallel {
        config.parallelism = parallel;
    }

    let suite = suite
        .select(config.module_filter.as_deref())
        .context("module selection failed")?;

    let orchestrator = Orchestrator::from_config(&config)
        .context("failed to build orchestrator")?
        .with_events(Arc::new(LoggingEventSink::debug()));
    let report = orchestrator.run_all(&suite).await;

    if args.suite.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        print!("{}", render::run_report(&report));
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list(args: &SuiteArgs) -> Result<ExitCode> {
    let (_, suite) = load(args)?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(suite.modules()).context("failed to serialize suite")?
        );
    } else {
        print!("{}", render::suite(&suite));
    }
    Ok(ExitCode::SUCCESS)
}

fn extract(name: &str, args: &SuiteArgs) -> Result<ExitCode> {
    let (_, suite) = load(args)?;
    let suite = suite.select(Some(name)).context("module selection failed")?;
    let Some(module) = suite.modules().first() else {
        anyhow::bail!("module '{name}' not found");
    };

    let inputs = ContractExtractor::inputs()?
        .extract_file(&module.input_declarations_path())
        .context("failed to read input declarations")?;
    let outputs = ContractExtractor::outputs()?
        .extract_file(&module.output_declarations_path())
        .context("failed to read output declarations")?;
    let report = validate_contract(&module.contract, inputs.as_ref(), outputs.as_ref());

    if args.json {
        let value = json!({
            "module": module.name,
            "path": module.path,
            "inputs": inputs,
            "outputs": outputs,
            "contract": report,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("failed to serialize extraction")?
        );
    } else {
        print!(
            "{}",
            render::extraction(module, inputs.as_ref(), outputs.as_ref(), &report)
        );
    }

    Ok(if report.is_satisfied() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::List(args) => list(&args),
        Command::Extract { module, suite } => extract(&module, &suite),
    }
}

#[cfg(test)]
mod main_tests;
