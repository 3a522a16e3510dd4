//! Common error types for formfill

use thiserror::Error;

/// Common result type for formfill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the formfill crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Roster could not be read as CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Template or output document could not be parsed or written
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Output archive could not be written
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Form type key not present in the catalog
    #[error("Unknown form type: {0}")]
    UnknownFormType(String),

    /// Template file for the selected form type is missing
    #[error("Template PDF not found: {0}")]
    TemplateNotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
