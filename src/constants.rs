//! Common constants used throughout kiln.

/// Suffix appended to a configuration value to form a provider descriptor name
pub const PROVIDER_SUFFIX: &str = "-plugin";

/// Configuration value meaning "no provider for this category"
pub const NONE_VALUE: &str = "none";

/// Fields the external configuration schema knows about
pub const KNOWN_FIELDS: [&str; 10] = [
    "projectName",
    "projectType",
    "stack",
    "database",
    "testing",
    "styling",
    "language",
    "deployment",
    "projectDir",
    "features",
];

/// Fields that are always coerced to lists during sanitation
pub const LIST_FIELDS: [&str; 1] = ["features"];

/// Prefix of free-form override fields applied to the render context last
pub const CUSTOM_PREFIX: &str = "custom";

/// File name patterns registered as partials when loading a partials directory
pub const PARTIAL_PATTERNS: [&str; 3] = ["*.md", "*.hbs", "*.tpl"];

/// Partials nested deeper than this are left as literal text
pub const MAX_PARTIAL_DEPTH: usize = 16;

pub const LANGUAGE_LABELS: [(&str, &str); 7] = [
    ("typescript", "TypeScript"),
    ("javascript", "JavaScript"),
    ("python", "Python"),
    ("rust", "Rust"),
    ("go", "Go"),
    ("java", "Java"),
    ("csharp", "C#"),
];

pub const DEPLOYMENT_LABELS: [(&str, &str); 6] = [
    ("vercel", "Vercel"),
    ("netlify", "Netlify"),
    ("docker", "Docker"),
    ("aws", "AWS"),
    ("fly", "Fly.io"),
    ("heroku", "Heroku"),
];

/// Command line tools each language expects on the developer's machine
pub const LANGUAGE_TOOLS: [(&str, &[&str]); 7] = [
    ("typescript", &["node", "npm"]),
    ("javascript", &["node", "npm"]),
    ("python", &["python3", "pip"]),
    ("rust", &["cargo"]),
    ("go", &["go"]),
    ("java", &["java", "mvn"]),
    ("csharp", &["dotnet"]),
];

/// Tools probed for every project regardless of language
pub const COMMON_TOOLS: [&str; 1] = ["git"];

pub const TESTING_STRATEGIES: [(&str, &str); 6] = [
    (
        "jest",
        "Unit and integration tests run with Jest. Keep test files next to the code they cover as `*.test.ts` and mock network boundaries.",
    ),
    (
        "vitest",
        "Tests run with Vitest using the Vite pipeline. Co-locate `*.test.ts` files and prefer in-source fixtures over global setup.",
    ),
    (
        "pytest",
        "Tests live under `tests/` and run with pytest. Share fixtures through `conftest.py` and keep unit tests free of I/O.",
    ),
    (
        "cypress",
        "End-to-end flows run in Cypress against a local build. Keep specs independent and seed data through API calls.",
    ),
    (
        "playwright",
        "End-to-end tests run with Playwright across Chromium, Firefox and WebKit. Use fixtures for authenticated state.",
    ),
    (
        "cargo",
        "Unit tests sit in `#[cfg(test)]` modules and integration tests under `tests/`. Run everything with `cargo test`.",
    ),
];

pub const DEFAULT_TESTING_STRATEGY: &str =
    "Cover core logic with fast unit tests and add integration tests around external boundaries.";
