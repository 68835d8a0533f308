use std::io;

use kiln::error::{Error, ProviderStage};

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();

    match err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("invalid config".to_string());
    assert_eq!(err.to_string(), "Configuration error: invalid config.");

    let err = Error::TemplateError("template 'x' does not exist".to_string());
    assert_eq!(err.to_string(), "Template error: template 'x' does not exist.");

    let err = Error::InvalidConfig {
        errors: vec!["\"language\" is a required property".to_string(), "bad".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "Invalid configuration: \"language\" is a required property; bad."
    );
}

#[test]
fn test_registry_error_display() {
    let err = Error::DuplicateCapability { name: "react-plugin".to_string() };
    assert_eq!(err.to_string(), "Capability 'react-plugin' is already registered.");

    let err = Error::UnknownCapability { name: "nope-plugin".to_string() };
    assert_eq!(err.to_string(), "Unknown capability 'nope-plugin'.");

    let err = Error::MissingMetadata { field: "name" };
    assert_eq!(err.to_string(), "Capability descriptor is missing required field 'name'.");
}

#[test]
fn test_provider_error_carries_name_and_cause() {
    let err = Error::Provider {
        name: "postgres-plugin".to_string(),
        stage: ProviderStage::Dependencies,
        source: anyhow::anyhow!("no client library"),
    };
    assert_eq!(
        err.to_string(),
        "Provider 'postgres-plugin' failed in dependencies: no client library."
    );
    assert!(std::error::Error::source(&err).is_some());
}
