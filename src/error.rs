//! Custom error types for OnTop

use thiserror::Error;

/// Main error type for OnTop operations
#[derive(Error, Debug)]
pub enum OnTopError {
    #[error("Hook installation failed: {0}")]
    HookInstall(String),

    #[error("Hook thread error: {0}")]
    HookThread(String),

    #[error("Menu error: {0}")]
    Menu(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for OnTop operations
pub type OnTopResult<T> = Result<T, OnTopError>;
