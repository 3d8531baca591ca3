use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all mvs operations.
#[derive(Debug, Error, Diagnostic)]
pub enum MvsError {
    /// Invalid or malformed resolver configuration (e.g. mvs.toml).
    #[error("Config error: {message}")]
    #[diagnostic(help("Check the [resolver] table in mvs.toml"))]
    Config { message: String },

    /// Invalid or malformed requirement table.
    #[error("Requirement table error: {message}")]
    #[diagnostic(help("Keys and entries must be written as `path@version`"))]
    Table { message: String },

    /// A resolution finished but cannot answer the question asked.
    #[error("Resolution failed: {message}")]
    Resolution { message: String },

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type MvsResult<T> = miette::Result<T>;
