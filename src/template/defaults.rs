//! The setup document template and partials compiled into the binary.

use super::TemplateEngine;

/// Master template used when no template path is given.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/setup.md");

/// Partials referenced by [`DEFAULT_TEMPLATE`].
pub const DEFAULT_PARTIALS: [(&str, &str); 6] = [
    ("overview", include_str!("../../templates/partials/overview.md")),
    ("dependencies", include_str!("../../templates/partials/dependencies.md")),
    ("commands", include_str!("../../templates/partials/commands.md")),
    ("testing", include_str!("../../templates/partials/testing.md")),
    ("config-files", include_str!("../../templates/partials/config-files.md")),
    ("security", include_str!("../../templates/partials/security.md")),
];

impl TemplateEngine {
    /// An engine with the built-in helpers and the embedded partials.
    pub fn with_default_partials() -> Self {
        let mut engine = TemplateEngine::new();
        for (name, partial) in DEFAULT_PARTIALS {
            engine.register_partial(name, partial);
        }
        engine
    }
}
