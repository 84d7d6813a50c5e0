//! Release hook pipeline

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::errors::AppError;
use crate::http::api::ManagementApi;
use crate::models::command::ReleaseCommand;

/// One stage of a release.
///
/// A hook receives the command produced by the previous stage plus the
/// command exactly as the user issued it, and returns the command for the
/// next stage.
#[async_trait]
pub trait ReleaseHook: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn run(
        &self,
        current: ReleaseCommand,
        original: &ReleaseCommand,
        client: &dyn ManagementApi,
    ) -> Result<ReleaseCommand, AppError>;
}

/// Ordered hook list
pub type ReleaseHooks = Vec<Arc<dyn ReleaseHook>>;

/// Run `hooks` one after the other, feeding each the previous output.
///
/// Stops at the first error; later hooks are not run.
pub async fn run_hooks(
    hooks: &[Arc<dyn ReleaseHook>],
    current: ReleaseCommand,
    original: &ReleaseCommand,
    client: &dyn ManagementApi,
) -> Result<ReleaseCommand, AppError> {
    let mut current = current;
    for hook in hooks {
        debug!("Running release hook '{}'", hook.name());
        current = hook.run(current, original, client).await.map_err(|e| {
            error!("Release hook '{}' failed: {}", hook.name(), e);
            e
        })?;
    }
    Ok(current)
}
