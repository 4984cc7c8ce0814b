//! Lifecycle hook types.

use partials_common_thread::PoolError;
use thiserror::Error;

use crate::state::AppState;

/// Error returned by a lifecycle hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook reported a failure.
    #[error("{0}")]
    Failed(String),

    /// A bound pool failed to check or drain.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl HookError {
    /// A hook failure carrying only a message.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}

/// Hook run once at startup. May add to the shared state.
pub type StartHook = Box<dyn FnOnce(&mut AppState) -> Result<(), HookError> + Send>;

/// Hook run once at shutdown.
pub type StopHook = Box<dyn FnOnce(&AppState) -> Result<(), HookError> + Send>;
