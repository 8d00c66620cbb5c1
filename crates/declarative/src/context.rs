//! Apply context and host callback traits
//!
//! These traits let the declarative crate drive lifecycle calls without
//! depending on a specific UI, prompt library or cancellation source.

use crate::cancel::CancelToken;
use crate::types::ApplyResult;
use anyhow::Result;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when starting to apply a batch of instances
    fn on_batch_start(&mut self, count: usize);

    /// Called when an instance finishes, with its address and result
    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult);

    /// Called when a batch completes
    fn on_batch_complete(&mut self);
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_resource_complete(&mut self, _address: &str, _result: &ApplyResult) {}
    fn on_batch_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to every lifecycle operation
///
/// Each call gets its own context; nothing in it is shared process-wide
/// except the cancellation flag the host chose to clone into it.
#[derive(Debug, Clone, Default)]
pub struct ApplyContext {
    /// Whether this is a dry run (no remote mutations)
    pub dry_run: bool,
    /// Cancellation flag for in-flight calls
    pub cancel: CancelToken,
}

impl ApplyContext {
    /// Create a new apply context with a fresh cancellation token
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            cancel: CancelToken::new(),
        }
    }

    /// Create a context bound to an existing cancellation token
    pub fn with_cancel(dry_run: bool, cancel: CancelToken) -> Self {
        Self { dry_run, cancel }
    }

    /// Whether the host asked to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
