//! The kiln templating interpreter.
//!
//! Supported constructs, applied in this order:
//!
//! | Construct | Syntax |
//! |-----------|--------|
//! | Partial   | `{{> name}}` |
//! | Condition | `{{#if path}} … {{else}} … {{/if}}` (nestable) |
//! | Loop      | `{{#each path}} … {{/each}}` (not nestable) |
//! | Variable  | `{{path.to.value}}` |
//! | Helper    | `{{helper arg "quoted arg" 42}}` |
//!
//! Template documents loaded from disk are cached per path for the lifetime
//! of the process (see [`cache`]).

pub mod blocks;
pub mod cache;
pub mod context;
pub mod defaults;
pub mod engine;
pub mod helpers;

pub use cache::{clear_template_cache, load_template};
pub use defaults::{DEFAULT_PARTIALS, DEFAULT_TEMPLATE};
pub use engine::TemplateEngine;
pub use helpers::{Helper, FALSY_MARKER, TRUTHY_MARKER};

use serde_json::Value;

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `context` - Context variables for rendering
    ///
    /// # Returns
    /// * `String` - Rendered text; rendering anomalies degrade instead of failing
    fn render(&self, template: &str, context: &Value) -> String;
}
