//! Command executor

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{ApiError, AppError};
use crate::http::api::ManagementApi;
use crate::http::progress::ProgressFn;
use crate::logs::{stdout_logger, Logger};
use crate::models::command::{Command, PatchCommand, PromoteCommand, ReleaseCommand, RollbackCommand};
use crate::release::hooks::{CoreReleaseHook, SigningHook};
use crate::release::pipeline::{run_hooks, ReleaseHook, ReleaseHooks};

/// Yes/no question asked before destructive operations
pub type ConfirmFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

const DEPLOYMENT_HINT: &str = "\nUse \"appsync deployment list\" to view any existing deployments and \"appsync deployment add\" to add deployment(s) to the app.";

/// How a command ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,

    /// Finished, but the user should see this warning
    Warning(String),
}

/// Runs commands against the management service
pub struct Executor {
    client: Arc<dyn ManagementApi>,
    logger: Logger,
    confirm: ConfirmFn,
    progress: Option<ProgressFn>,
    staging_root: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    hooks: Option<ReleaseHooks>,
}

impl Executor {
    pub fn new(client: Arc<dyn ManagementApi>) -> Self {
        Self {
            client,
            logger: stdout_logger(),
            confirm: stdin_confirm(),
            progress: None,
            staging_root: None,
            output_dir: None,
            hooks: None,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmFn) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Base directory for single-file signing staging
    pub fn with_staging_root(mut self, staging_root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(staging_root.into());
        self
    }

    /// Directory release archives are written to
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    /// Replace the default signing + core release hooks
    pub fn with_hooks(mut self, hooks: ReleaseHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Run one command
    pub async fn execute(&self, command: Command) -> Result<Outcome, AppError> {
        match command {
            Command::Release(command) => self.release(command).await,
            Command::Patch(command) => self.patch(command).await,
            Command::Promote(command) => self.promote(command).await,
            Command::Rollback(command) => self.rollback(command).await,
        }
    }

    /// Validate, then fold the command through the release hooks
    pub async fn release(&self, command: ReleaseCommand) -> Result<Outcome, AppError> {
        command.validate()?;

        let hooks = self.release_hooks();
        let result = run_hooks(&hooks, command.clone(), &command, self.client.as_ref()).await;

        match result {
            Ok(released) => {
                debug!("Release pipeline finished with {}", released.package_path.display());
                Ok(Outcome::Completed)
            }
            Err(e) => release_error_handler(with_deployment_hint(e), command.no_duplicate_release_error),
        }
    }

    pub async fn patch(&self, command: PatchCommand) -> Result<Outcome, AppError> {
        command.validate()?;

        self.client
            .patch_release(
                &command.app_name,
                &command.deployment_name,
                command.label.as_deref(),
                command.package_info(),
            )
            .await?;

        (self.logger)(&format!(
            "Successfully updated the \"{}\" release of \"{}\" app's \"{}\" deployment.",
            command.label.as_deref().unwrap_or("latest"),
            command.app_name,
            command.deployment_name
        ));
        Ok(Outcome::Completed)
    }

    pub async fn promote(&self, command: PromoteCommand) -> Result<Outcome, AppError> {
        command.validate()?;

        let result = self
            .client
            .promote(
                &command.app_name,
                &command.source_deployment,
                &command.destination_deployment,
                command.package_info(),
            )
            .await;

        match result {
            Ok(_) => {
                let label = command
                    .label
                    .as_deref()
                    .map(|label| format!("\"{}\" of ", label))
                    .unwrap_or_default();
                (self.logger)(&format!(
                    "Successfully promoted {}the \"{}\" deployment of the \"{}\" app to the \"{}\" deployment.",
                    label, command.source_deployment, command.app_name, command.destination_deployment
                ));
                Ok(Outcome::Completed)
            }
            Err(e) => release_error_handler(e, command.no_duplicate_release_error),
        }
    }

    pub async fn rollback(&self, command: RollbackCommand) -> Result<Outcome, AppError> {
        let confirm = self.confirm.clone();
        let confirmed = tokio::task::spawn_blocking(move || confirm("Are you sure?"))
            .await
            .map_err(|e| AppError::Internal(format!("Confirmation prompt failed: {}", e)))?;
        if !confirmed {
            (self.logger)("Rollback cancelled.");
            return Ok(Outcome::Completed);
        }

        self.client
            .rollback(
                &command.app_name,
                &command.deployment_name,
                command.target_release.as_deref().filter(|label| !label.is_empty()),
            )
            .await?;

        (self.logger)(&format!(
            "Successfully performed a rollback on the \"{}\" deployment of the \"{}\" app.",
            command.deployment_name, command.app_name
        ));
        Ok(Outcome::Completed)
    }

    fn release_hooks(&self) -> Vec<Arc<dyn ReleaseHook>> {
        if let Some(hooks) = &self.hooks {
            return hooks.clone();
        }

        let mut signing = SigningHook::new(self.logger.clone());
        if let Some(root) = &self.staging_root {
            signing = signing.with_staging_root(root.clone());
        }
        let core = CoreReleaseHook::new(self.logger.clone())
            .with_progress(self.progress.clone())
            .with_output_dir(self.output_dir.clone());

        vec![
            Arc::new(signing) as Arc<dyn ReleaseHook>,
            Arc::new(core) as Arc<dyn ReleaseHook>,
        ]
    }
}

/// A 409 becomes a warning when duplicates were declared acceptable
pub fn release_error_handler(error: AppError, no_duplicate_release_error: bool) -> Result<Outcome, AppError> {
    if no_duplicate_release_error {
        if let Some(conflict) = error.as_api_error().filter(|e| e.is_conflict()) {
            warn!("Ignoring duplicate release: {}", conflict.message);
            return Ok(Outcome::Warning(conflict.message.clone()));
        }
    }
    Err(error)
}

fn with_deployment_hint(error: AppError) -> AppError {
    match error {
        AppError::ApiError(api_error)
            if api_error.status_code == ApiError::NOT_FOUND && api_error.message.contains("Deployment") =>
        {
            AppError::ApiError(ApiError::new(
                format!("{}{}", api_error.message, DEPLOYMENT_HINT),
                api_error.status_code,
            ))
        }
        other => other,
    }
}

/// Ask on stdin; only `y` (any case) accepts
pub fn stdin_confirm() -> ConfirmFn {
    Arc::new(|message: &str| {
        print!("{} (y/N): ", message);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut response = String::new();
        if io::stdin().lock().read_line(&mut response).is_err() {
            return false;
        }

        let response = response.trim().to_lowercase();
        if response == "y" {
            return true;
        }
        if !response.is_empty() && response != "n" {
            println!("Invalid response: \"{}\"", response);
        }
        false
    })
}
