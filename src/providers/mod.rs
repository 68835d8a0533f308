//! Built-in capability providers.
//!
//! Every provider is registered under `<value>-plugin`, where `<value>` is the
//! configuration value that selects it:
//!
//! | Category | Providers |
//! |----------|-----------|
//! | stack    | react, vue, angular, express, fastapi |
//! | database | postgres, mongodb, sqlite |
//! | testing  | jest, vitest, pytest |
//! | styling  | tailwind, sass |
//! | misc     | docker, ci (selected through `features`) |

mod database;
mod misc;
mod stack;
mod styling;
mod testing;

pub use stack::{PackageManager, FRONTEND_PROVIDERS};

use crate::capability::CapabilityDescriptor;
use crate::error::Result;
use crate::registry::Registry;

/// Descriptors of every built-in provider, grouped by category.
pub fn builtin_descriptors() -> Vec<CapabilityDescriptor> {
    let mut descriptors = stack::descriptors();
    descriptors.extend(database::descriptors());
    descriptors.extend(testing::descriptors());
    descriptors.extend(styling::descriptors());
    descriptors.extend(misc::descriptors());
    descriptors
}

/// Registers every built-in provider into `registry`.
///
/// # Errors
/// * `Error::DuplicateCapability` if a built-in name is already taken
pub fn register_builtins(registry: &mut Registry) -> Result<()> {
    for descriptor in builtin_descriptors() {
        registry.register(descriptor)?;
    }
    Ok(())
}

/// A registry holding only the built-in providers.
pub fn builtin_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}
