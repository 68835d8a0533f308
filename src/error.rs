//! Error handling for kiln.
//! Defines the error type and result alias used throughout the crate.

use std::fmt;
use std::io;
use thiserror::Error;

/// Point in a provider's lifecycle at which it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStage {
    BeforeGeneration,
    Dependencies,
    ConfigFiles,
}

impl fmt::Display for ProviderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            ProviderStage::BeforeGeneration => "before_generation",
            ProviderStage::Dependencies => "dependencies",
            ProviderStage::ConfigFiles => "config_files",
        };
        f.write_str(stage)
    }
}

/// Errors that can occur while composing a project setup document.
///
/// Rendering anomalies (unknown variables, helpers or partials) are not
/// represented here: the template engine resolves them to empty or literal
/// text instead of failing.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors that occur while loading template documents
    #[error("Template error: {0}.")]
    TemplateError(String),

    /// Represents configuration input that could not be read or parsed
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Configuration parsed but violated the schema
    #[error("Invalid configuration: {}.", .errors.join("; "))]
    InvalidConfig { errors: Vec<String> },

    #[error("Capability '{name}' is already registered.")]
    DuplicateCapability { name: String },

    #[error("Capability descriptor is missing required field '{field}'.")]
    MissingMetadata { field: &'static str },

    #[error("Unknown capability '{name}'.")]
    UnknownCapability { name: String },

    /// A provider failed inside a contribution method or its lifecycle hook
    #[error("Provider '{name}' failed in {stage}: {source:#}.")]
    Provider {
        name: String,
        stage: ProviderStage,
        #[source]
        source: anyhow::Error,
    },

    /// Selected providers conflict and the caller asked for strict composition
    #[error("Incompatible providers: {}.", .conflicts.join("; "))]
    IncompatibleProviders { conflicts: Vec<String> },

    #[error("Output file '{output}' already exists. Use --force to overwrite it.")]
    OutputExistsError { output: String },
}

/// Convenience type alias for Results with kiln's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
