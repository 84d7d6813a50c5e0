//! AppSync - Entry Point
//!
//! Releases app updates to the AppSync management service.

use std::collections::HashMap;
use std::env;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use tracing::{debug, error};

use appsync::authn::SessionGuard;
use appsync::http::{ClientOptions, HttpClient, ProgressFn};
use appsync::logs::{init_logging, LogLevel, LogOptions};
use appsync::models::command::parse_rollout;
use appsync::models::{Command, PatchCommand, PromoteCommand, ReleaseCommand, RollbackCommand};
use appsync::release::{Executor, Outcome};
use appsync::storage::layout::StorageLayout;
use appsync::storage::settings::Settings;
use appsync::utils::version_info;

const USAGE: &str = "Usage:
  appsync release <appName> <updateContentsPath> <targetBinaryVersion> [--deploymentName=Staging] [--description=..] [--mandatory] [--disabled] [--rollout=25%] [--privateKeyPath=key.pem] [--noDuplicateReleaseError]
  appsync patch <appName> <deploymentName> [--label=v1] [--targetBinaryVersion=..] [--description=..] [--mandatory] [--disabled] [--rollout=50%]
  appsync promote <appName> <sourceDeploymentName> <destDeploymentName> [--label=v1] [--targetBinaryVersion=..] [--description=..] [--mandatory] [--disabled] [--rollout=25%] [--noDuplicateReleaseError]
  appsync rollback <appName> <deploymentName> [--targetRelease=v1]
  appsync --version";

/// Parsed command line: positional words plus `--key=value` options
struct Args {
    positional: Vec<String>,
    options: HashMap<String, String>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Self {
        let mut positional = Vec::new();
        let mut options = HashMap::new();

        for arg in raw {
            if !arg.starts_with("--") {
                positional.push(arg);
            } else if let Some((key, value)) = arg.split_once('=') {
                // Handle --key=value format
                let clean_key = key.trim_start_matches('-');
                options.insert(clean_key.to_string(), value.to_string());
            } else {
                // Handle standalone flags like --mandatory
                let clean_key = arg.trim_start_matches('-');
                options.insert(clean_key.to_string(), "true".to_string());
            }
        }

        Self { positional, options }
    }

    fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    fn value(&self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }

    fn flag(&self, key: &str) -> anyhow::Result<Option<bool>> {
        self.options
            .get(key)
            .map(|value| {
                value
                    .parse::<bool>()
                    .with_context(|| format!("--{} expects true or false, got \"{}\"", key, value))
            })
            .transpose()
    }

    fn rollout(&self) -> anyhow::Result<Option<u8>> {
        Ok(self.value("rollout").map(|r| parse_rollout(&r)).transpose()?)
    }

    /// Positional arguments after the command name
    fn operands(&self, count: usize, names: &str) -> anyhow::Result<&[String]> {
        let operands = &self.positional[1..];
        if operands.len() != count {
            bail!("Expected {} but got {} argument(s)\n\n{}", names, operands.len(), USAGE);
        }
        Ok(operands)
    }
}

fn parse_command(args: &Args) -> anyhow::Result<Command> {
    let name = args
        .positional
        .first()
        .ok_or_else(|| anyhow!("No command given\n\n{}", USAGE))?;

    let command = match name.as_str() {
        "release" => {
            let operands = args.operands(3, "<appName> <updateContentsPath> <targetBinaryVersion>")?;
            let mut command = ReleaseCommand::new(
                operands[0].clone(),
                args.value("deploymentName").unwrap_or_else(|| "Staging".to_string()),
                operands[1].clone(),
                operands[2].clone(),
            );
            command.description = args.value("description");
            command.is_mandatory = args.flag("mandatory")?.unwrap_or(false);
            command.is_disabled = args.flag("disabled")?.unwrap_or(false);
            command.rollout = args.rollout()?;
            command.signing_key_path = args.value("privateKeyPath").map(Into::into);
            command.no_duplicate_release_error = args.flag("noDuplicateReleaseError")?.unwrap_or(false);
            Command::Release(command)
        }
        "patch" => {
            let operands = args.operands(2, "<appName> <deploymentName>")?;
            Command::Patch(PatchCommand {
                app_name: operands[0].clone(),
                deployment_name: operands[1].clone(),
                label: args.value("label"),
                target_binary_version: args.value("targetBinaryVersion"),
                description: args.value("description"),
                is_mandatory: args.flag("mandatory")?,
                is_disabled: args.flag("disabled")?,
                rollout: args.rollout()?,
            })
        }
        "promote" => {
            let operands = args.operands(3, "<appName> <sourceDeploymentName> <destDeploymentName>")?;
            Command::Promote(PromoteCommand {
                app_name: operands[0].clone(),
                source_deployment: operands[1].clone(),
                destination_deployment: operands[2].clone(),
                label: args.value("label"),
                target_binary_version: args.value("targetBinaryVersion"),
                description: args.value("description"),
                is_mandatory: args.flag("mandatory")?,
                is_disabled: args.flag("disabled")?,
                rollout: args.rollout()?,
                no_duplicate_release_error: args.flag("noDuplicateReleaseError")?.unwrap_or(false),
            })
        }
        "rollback" => {
            let operands = args.operands(2, "<appName> <deploymentName>")?;
            Command::Rollback(RollbackCommand {
                app_name: operands[0].clone(),
                deployment_name: operands[1].clone(),
                target_release: args.value("targetRelease"),
            })
        }
        other => bail!("Unknown command \"{}\"\n\n{}", other, USAGE),
    };

    Ok(command)
}

/// Draws a 50 column upload bar on stderr
fn progress_bar() -> ProgressFn {
    const WIDTH: usize = 50;

    Arc::new(|percent: f64| {
        let filled = ((percent / 100.0) * WIDTH as f64).round() as usize;
        let filled = filled.min(WIDTH);
        let mut stderr = std::io::stderr();
        let _ = write!(
            stderr,
            "\rUpload progress:[{}{}] {:.0}%",
            "=".repeat(filled),
            " ".repeat(WIDTH - filled),
            percent
        );
        if percent >= 100.0 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    })
}

fn print_error(message: &str) {
    eprintln!("{}", format!("[Error]  {}", message).red());
}

async fn run(args: Args) -> anyhow::Result<Outcome> {
    let command = parse_command(&args)?;

    let layout = StorageLayout::default();
    let connection_file = layout.connection_file();
    let settings = Settings::load(&connection_file).await?;

    // Initialize logging
    let log_level = match args.value("log-level") {
        Some(level) => level.parse::<LogLevel>().map_err(|e| anyhow!(e))?,
        None => settings.log_level,
    };
    let log_options = LogOptions {
        log_level,
        json_format: args.has("log-json"),
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut options = ClientOptions::new(settings.server_url(), settings.access_key.clone());
    options.proxy = settings.resolve_proxy();
    debug!("Using server {}", options.server_url);

    let client = SessionGuard::new(HttpClient::new(options)?, connection_file);
    let executor = Executor::new(Arc::new(client)).with_progress(progress_bar());

    Ok(executor.execute(command).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse(env::args().skip(1));

    // Print version and exit
    if args.has("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => print_error(&e.to_string()),
        }
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Warning(message)) => {
            eprintln!("{}", format!("[Warning] {}", message).yellow());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
