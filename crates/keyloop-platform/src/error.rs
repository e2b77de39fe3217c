//! Common error types for keyloop-platform.

use keyloop_core::KeyCode;
use thiserror::Error;

/// Platform-level errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("injection failed: {0}")]
    InjectionFailed(String),
    #[error("no platform key for virtual-key code {0:#04x}")]
    UnmappedKey(KeyCode),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
