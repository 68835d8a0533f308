use async_trait::async_trait;
use indexmap::IndexMap;
use kiln::capability::{Capability, CapabilityDescriptor, Category, ConfigFile, Dependencies};
use kiln::config::{ConfigValidator, ProjectConfig, ValidationReport};
use kiln::error::{Error, ProviderStage};
use kiln::generator::Generator;
use kiln::probe::ToolProbe;
use kiln::providers::builtin_registry;
use kiln::registry::Registry;
use kiln::template::{TemplateEngine, DEFAULT_TEMPLATE};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type Journal = Arc<Mutex<Vec<String>>>;

/// Configurable provider that records its lifecycle into a shared journal.
#[derive(Clone, Default)]
struct Fake {
    name: &'static str,
    production: Vec<&'static str>,
    development: Vec<&'static str>,
    commands: Vec<(&'static str, &'static str)>,
    fragment: Option<&'static str>,
    files: Vec<&'static str>,
    features: Vec<&'static str>,
    refuses: Vec<&'static str>,
    fail_hook: bool,
    fail_deps: bool,
    journal: Journal,
}

impl Fake {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self { name, journal: Arc::clone(journal), ..Self::default() }
    }

    fn record(&self, event: &str) {
        self.journal.lock().unwrap().push(format!("{event}:{}", self.name));
    }

    fn descriptor(self, category: Category) -> CapabilityDescriptor {
        let name = format!("{}-plugin", self.name);
        let display = self.name.to_uppercase();
        CapabilityDescriptor::new(name, display, category, move |_| Box::new(self.clone()))
    }
}

#[async_trait]
impl Capability for Fake {
    async fn before_generation(&mut self, _config: &ProjectConfig) -> anyhow::Result<()> {
        self.record("hook");
        if self.fail_hook {
            anyhow::bail!("hook exploded");
        }
        Ok(())
    }

    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        self.record("deps");
        if self.fail_deps {
            anyhow::bail!("registry unreachable");
        }
        Ok(Dependencies::new(self.production.clone(), self.development.clone()))
    }

    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        Ok(self.files.iter().map(|f| ConfigFile::new(*f, "text", self.name)).collect())
    }

    fn file_structure_fragment(&self) -> Option<String> {
        self.fragment.map(str::to_string)
    }

    fn commands(&self) -> IndexMap<String, String> {
        self.commands.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn supported_features(&self) -> std::collections::BTreeSet<String> {
        self.features.iter().map(|f| f.to_string()).collect()
    }

    fn is_compatible_with(&self, other: &str) -> bool {
        !self.refuses.contains(&other)
    }
}

/// Reports every tool in the list as installed.
struct Installed(Vec<&'static str>);

impl ToolProbe for Installed {
    fn is_available(&self, tool: &str) -> bool {
        self.0.contains(&tool)
    }
}

fn everything_installed() -> Installed {
    Installed(vec!["git", "node", "npm", "python3", "pip", "cargo"])
}

fn base_config() -> ProjectConfig {
    ProjectConfig::new()
        .with("projectName", "demo")
        .with("projectType", "web")
        .with("language", "typescript")
}

/// Registry with one provider per category plus a misc provider.
fn sample_registry(journal: &Journal) -> Registry {
    let mut registry = Registry::new();

    let mut alpha = Fake::new("alpha", journal);
    alpha.production = vec!["alpha-core"];
    alpha.development = vec!["alpha-dev"];
    alpha.commands = vec![("test", "alpha test"), ("dev", "alpha dev")];
    alpha.fragment = Some("src/\n└── alpha.ts");
    alpha.files = vec!["alpha.json"];
    alpha.features = vec!["typescript"];
    alpha.refuses = vec!["beta-plugin"];
    registry.register(alpha.descriptor(Category::Stack)).unwrap();

    let mut store = Fake::new("store", journal);
    store.production = vec!["store-driver"];
    store.fragment = Some("migrations/");
    registry.register(store.descriptor(Category::Database)).unwrap();

    let mut check = Fake::new("check", journal);
    check.development = vec!["check-runner"];
    check.commands = vec![("test", "check run")];
    check.files = vec!["check.config"];
    registry.register(check.descriptor(Category::Testing)).unwrap();

    let mut paint = Fake::new("paint", journal);
    paint.development = vec!["paint-css"];
    registry.register(paint.descriptor(Category::Styling)).unwrap();

    let mut beta = Fake::new("beta", journal);
    beta.production = vec!["beta-lib"];
    beta.features = vec!["beta"];
    registry.register(beta.descriptor(Category::Misc)).unwrap();

    registry
}

fn full_config() -> ProjectConfig {
    base_config()
        .with("stack", "alpha")
        .with("database", "store")
        .with("testing", "check")
        .with("styling", "paint")
}

#[tokio::test]
async fn test_dependencies_concatenate_in_selection_order() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let composition = generator.compose(full_config()).await.unwrap();

    assert_eq!(
        composition.providers,
        vec!["alpha-plugin", "store-plugin", "check-plugin", "paint-plugin"]
    );
    let deps = &composition.context["dependencies"];
    assert_eq!(deps["production"], json!(["alpha-core", "store-driver"]));
    assert_eq!(deps["development"], json!(["alpha-dev", "check-runner", "paint-css"]));
    assert_eq!(composition.context["hasDependencies"], json!(true));

    let files: Vec<_> = composition.config_files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(files, vec!["alpha.json", "check.config"]);
}

#[test_log::test(tokio::test)]
async fn test_hooks_run_sequentially_before_contributions() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    generator.compose(full_config()).await.unwrap();

    let events = journal.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "hook:alpha",
            "deps:alpha",
            "hook:store",
            "deps:store",
            "hook:check",
            "deps:check",
            "hook:paint",
            "deps:paint",
        ]
    );
}

#[tokio::test]
async fn test_unregistered_selection_is_skipped() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = base_config().with("stack", "alpha").with("database", "oracle");
    let composition = generator.compose(config).await.unwrap();

    assert_eq!(composition.providers, vec!["alpha-plugin"]);
    assert_eq!(composition.context["hasDatabase"], json!(false));
    assert_eq!(composition.context["databaseLabel"], json!("Oracle"));
}

#[tokio::test]
async fn test_none_and_blank_select_nothing() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config =
        base_config().with("stack", "none").with("database", "  ").with("testing", json!(null));
    let composition = generator.compose(config).await.unwrap();

    assert!(composition.providers.is_empty());
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_config_aborts_before_providers_run() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = ProjectConfig::new()
        .with("projectName", "demo")
        .with("projectType", "spaceship")
        .with("stack", "alpha");
    match generator.compose(config).await {
        Err(Error::InvalidConfig { errors }) => assert!(errors.len() >= 2),
        other => panic!("Expected InvalidConfig, got {:?}", other.map(|c| c.providers)),
    }
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_validator_and_sanitizer() {
    struct Lenient;

    impl ConfigValidator for Lenient {
        fn validate(&self, _config: &ProjectConfig) -> ValidationReport {
            ValidationReport { is_valid: true, errors: vec![], warnings: vec!["lenient".into()] }
        }
    }

    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine)
        .with_validator(Lenient)
        .with_probe(everything_installed());

    let config = ProjectConfig::new().with("stack", " alpha ").with("features", "beta, ,gizmo");
    let composition = generator.compose(config).await.unwrap();

    assert_eq!(composition.providers, vec!["alpha-plugin", "beta-plugin"]);
    assert_eq!(composition.context["features"], json!(["beta", "gizmo"]));
    assert!(composition.warnings.contains(&"lenient".to_string()));
}

#[tokio::test]
async fn test_provider_errors_are_tagged() {
    let journal = Journal::default();
    let mut registry = Registry::new();
    let mut broken = Fake::new("broken", &journal);
    broken.fail_deps = true;
    registry.register(broken.descriptor(Category::Database)).unwrap();
    let mut fragile = Fake::new("fragile", &journal);
    fragile.fail_hook = true;
    registry.register(fragile.descriptor(Category::Testing)).unwrap();

    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let err = generator.compose(base_config().with("database", "broken")).await.unwrap_err();
    match err {
        Error::Provider { ref name, stage, .. } => {
            assert_eq!(name, "broken-plugin");
            assert_eq!(stage, ProviderStage::Dependencies);
        }
        other => panic!("Expected Provider error, got {other:?}"),
    }

    let err = generator.compose(base_config().with("testing", "fragile")).await.unwrap_err();
    match err {
        Error::Provider { ref name, stage, .. } => {
            assert_eq!(name, "fragile-plugin");
            assert_eq!(stage, ProviderStage::BeforeGeneration);
            assert!(err.to_string().contains("hook exploded"));
        }
        other => panic!("Expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_later_commands_override_earlier() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let composition = generator.compose(full_config()).await.unwrap();

    assert_eq!(composition.context["commands"], json!({"test": "check run", "dev": "alpha dev"}));
    assert_eq!(
        composition.context["commandList"],
        json!([{"name": "test", "command": "check run"}, {"name": "dev", "command": "alpha dev"}])
    );
}

#[tokio::test]
async fn test_file_structure_merges_fragments() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let composition = generator.compose(full_config()).await.unwrap();
    assert_eq!(
        composition.context["fileStructure"],
        json!("src/\n└── alpha.ts\nmigrations/")
    );

    let config = base_config().with("database", "store");
    let composition = generator.compose(config).await.unwrap();
    let tree = composition.context["fileStructure"].as_str().unwrap();
    assert!(tree.starts_with("demo/\n"));
    assert!(tree.ends_with("└── README.md\nmigrations/"));
}

#[tokio::test]
async fn test_derived_labels_and_fallbacks() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = base_config()
        .with("stack", "alpha")
        .with("testing", "pytest")
        .with("deployment", "vercel");
    let composition = generator.compose(config).await.unwrap();
    let ctx = &composition.context;

    assert_eq!(ctx["stackLabel"], json!("ALPHA"));
    assert_eq!(ctx["languageLabel"], json!("TypeScript"));
    assert_eq!(ctx["deploymentLabel"], json!("Vercel"));
    assert!(ctx["testingStrategy"].as_str().unwrap().contains("pytest"));
    assert_eq!(ctx["hasStack"], json!(true));
    assert_eq!(ctx["hasTesting"], json!(false));
    assert_eq!(ctx["providers"][0]["displayName"], json!("ALPHA"));
}

#[tokio::test]
async fn test_custom_overrides_win() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = full_config()
        .with("customTestingStrategy", "Manual QA only.")
        .with("custom-file-structure", "flat/");
    let composition = generator.compose(config).await.unwrap();

    assert_eq!(composition.context["testingStrategy"], json!("Manual QA only."));
    assert_eq!(composition.context["fileStructure"], json!("flat/"));
    assert!(composition.warnings.is_empty());
}

#[tokio::test]
async fn test_tool_notice_lists_missing_tools() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();

    let generator = Generator::new(&registry, &engine).with_probe(Installed(vec!["git"]));
    let composition = generator.compose(base_config()).await.unwrap();
    let ctx = &composition.context;
    assert_eq!(ctx["missingTools"], json!(["node", "npm"]));
    assert_eq!(ctx["hasMissingTools"], json!(true));
    assert!(ctx["toolNotice"].as_str().unwrap().contains("`node`, `npm`"));

    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());
    let composition = generator.compose(base_config()).await.unwrap();
    assert_eq!(composition.context["toolNotice"], json!(""));
    assert_eq!(composition.context["hasMissingTools"], json!(false));
}

#[test_log::test(tokio::test)]
async fn test_conflicts_and_mismatches_are_warnings() {
    let journal = Journal::default();
    let mut registry = sample_registry(&journal);
    let mut snake = Fake::new("snake", &journal);
    snake.production = vec!["snake-lib"];
    registry
        .register(snake.descriptor(Category::Testing).with_languages(["python"]))
        .unwrap();
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = base_config()
        .with("stack", "alpha")
        .with("database", "paint")
        .with("testing", "snake")
        .with("features", json!(["beta", "gizmo"]));
    let composition = generator.compose(config).await.unwrap();

    assert_eq!(composition.providers, vec!["alpha-plugin", "snake-plugin", "beta-plugin"]);
    assert_eq!(composition.conflicts.len(), 1);
    assert_eq!(composition.conflicts[0].a, "alpha-plugin");
    assert_eq!(composition.conflicts[0].b, "beta-plugin");

    let warnings = composition.warnings.join("\n");
    assert!(warnings.contains("Incompatible providers 'alpha-plugin' and 'beta-plugin'"));
    assert!(
        warnings.contains("'paint-plugin' is a styling provider and cannot be used as database")
    );
    assert!(warnings.contains("SNAKE does not target TypeScript"));
    assert!(warnings.contains("Feature 'gizmo' is not supported"));
    assert!(!warnings.contains("Feature 'beta'"));
}

#[tokio::test]
async fn test_generate_renders_context() {
    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let template =
        r#"{{projectName}}: {{join dependencies.production ", "}}{{#if hasDatabase}} +db{{/if}}"#;
    let generation = generator.generate(full_config(), template).await.unwrap();

    assert_eq!(generation.document, "demo: alpha-core, store-driver +db");
    assert_eq!(generation.composition.providers.len(), 4);
}

#[tokio::test]
async fn test_generate_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("setup.md");
    std::fs::write(&path, "{{#each commandList}}{{name}}={{command}};{{/each}}").unwrap();

    let journal = Journal::default();
    let registry = sample_registry(&journal);
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let generation = generator.generate_from_file(full_config(), &path).await.unwrap();
    assert_eq!(generation.document, "test=check run;dev=alpha dev;");

    let missing = generator.generate_from_file(full_config(), dir.path().join("nope.md")).await;
    assert!(matches!(missing, Err(Error::TemplateError(_))));
}

#[tokio::test]
async fn test_builtin_providers_end_to_end() {
    let registry = builtin_registry().unwrap();
    let engine = TemplateEngine::with_default_partials();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = base_config()
        .with("stack", "react")
        .with("database", "postgres")
        .with("testing", "jest")
        .with("styling", "tailwind")
        .with("features", json!(["docker"]));
    let generation = generator.generate(config, DEFAULT_TEMPLATE).await.unwrap();
    let document = &generation.document;

    assert!(document.starts_with("# demo\n"));
    assert!(document.contains("| Stack | React |"));
    assert!(document.contains("| Database | PostgreSQL |"));
    assert!(document.contains("- `react`"));
    assert!(document.contains("- `pg`"));
    assert!(document.contains("| test | `npx jest` |"));
    assert!(document.contains("Run the suite with `npx jest`."));
    assert!(document.contains("### `tailwind.config.js`"));
    assert!(document.contains("## Security"));
    assert!(!document.contains("{{"));

    let names: Vec<_> =
        generation.composition.config_files.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"tsconfig.json"));
    assert!(names.contains(&"Dockerfile"));
    assert!(generation.composition.conflicts.is_empty());
}

#[tokio::test]
async fn test_every_language_renders_with_every_database() {
    let registry = builtin_registry().unwrap();
    let engine = TemplateEngine::with_default_partials();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let languages = ["typescript", "javascript", "python", "rust", "go", "java", "csharp"];
    for language in languages {
        for database in ["postgres", "mongodb", "sqlite"] {
            let config = ProjectConfig::new()
                .with("projectName", "shop")
                .with("projectType", "api")
                .with("language", language)
                .with("database", database);
            let generation = generator.generate(config, DEFAULT_TEMPLATE).await;
            assert!(generation.is_ok(), "{language} + {database}: {:?}", generation.err());
        }
    }
}

#[tokio::test]
async fn test_lockfile_selects_package_manager() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();

    let registry = builtin_registry().unwrap();
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = base_config()
        .with("stack", "vue")
        .with("projectDir", dir.path().to_string_lossy().to_string());
    let composition = generator.compose(config).await.unwrap();

    assert_eq!(composition.context["packageManager"], json!("pnpm"));
    assert_eq!(composition.context["commands"]["install"], json!("pnpm install"));
    assert_eq!(composition.context["commands"]["dev"], json!("pnpm dev"));
}

#[tokio::test]
async fn test_project_dir_that_is_a_file_fails_the_hook() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    let registry = builtin_registry().unwrap();
    let engine = TemplateEngine::new();
    let generator = Generator::new(&registry, &engine).with_probe(everything_installed());

    let config = base_config()
        .with("stack", "react")
        .with("projectDir", file.to_string_lossy().to_string());
    match generator.compose(config).await {
        Err(Error::Provider { name, stage, .. }) => {
            assert_eq!(name, "react-plugin");
            assert_eq!(stage, ProviderStage::BeforeGeneration);
        }
        other => panic!("Expected Provider error, got {:?}", other.map(|c| c.providers)),
    }
}
