//! Kiln composes project setup documents from pluggable capability providers.
//! It validates a set of answers describing a project, lets the selected
//! providers contribute dependencies, files and commands, and renders the
//! merged result through a small markup template interpreter.

/// Capability contract every provider implements
pub mod capability;

/// Command-line interface module for the kiln binary
/// Also checks and writes the generated outputs
pub mod cli;

/// Project configuration loading, validation and sanitation
/// Supports JSON and YAML answer files
pub mod config;

/// Common constants used throughout kiln
pub mod constants;

/// Error types and handling for kiln
pub mod error;

/// Composition pipeline
/// Selects providers, merges their contributions and renders the document
pub mod generator;

/// Logger initialisation for the binary
pub mod logger;

/// Tool availability probing
pub mod probe;

/// Built-in capability providers
pub mod providers;

/// Provider catalog indexed by name and category
pub mod registry;

/// Markup template interpreter
/// Handles partials, conditionals, loops, variables and helpers
pub mod template;
