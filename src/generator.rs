//! Composition pipeline: turns a project configuration into a rendered
//! setup document.
//!
//! # Flow
//! 1. Validates the configuration; schema violations abort the run
//! 2. Sanitizes it
//! 3. Selects providers in the order stack, database, testing, styling, misc
//! 4. Runs each provider's lifecycle hook and merges its contributions
//! 5. Derives labels, fallbacks and the tool notice
//! 6. Renders the master template against the merged context

use crate::capability::{
    CapabilityDescriptor, Category, ConfigFile, ContributionSet, MarkdownSection,
};
use crate::config::{ConfigValidator, ProjectConfig, SchemaValidator};
use crate::constants::{
    DEFAULT_TESTING_STRATEGY, DEPLOYMENT_LABELS, LANGUAGE_LABELS, PROVIDER_SUFFIX,
    TESTING_STRATEGIES,
};
use crate::error::{Error, ProviderStage, Result};
use crate::probe::{probe_tools, required_tools, tool_notice, PathProbe, ToolProbe};
use crate::registry::{Conflict, Registry};
use crate::template::{load_template, TemplateRenderer};
use cruet::Inflector;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// Configuration fields that select a provider, in selection order.
pub const SELECTION_ORDER: [(&str, Category); 4] = [
    ("stack", Category::Stack),
    ("database", Category::Database),
    ("testing", Category::Testing),
    ("styling", Category::Styling),
];

/// Descriptor name a configuration value selects, e.g. `postgres` → `postgres-plugin`.
pub fn descriptor_name(value: &str) -> String {
    format!("{value}{PROVIDER_SUFFIX}")
}

/// Merged provider output and the render context built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub context: Value,
    pub config_files: Vec<ConfigFile>,
    /// Names of the providers that contributed, in selection order.
    pub providers: Vec<String>,
    pub conflicts: Vec<Conflict>,
    pub warnings: Vec<String>,
}

/// The rendered document together with the composition that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub document: String,
    pub composition: Composition,
}

/// Drives providers and the template renderer for one configuration at a time.
pub struct Generator<'a> {
    registry: &'a Registry,
    renderer: &'a dyn TemplateRenderer,
    validator: Box<dyn ConfigValidator + 'a>,
    probe: Box<dyn ToolProbe + 'a>,
}

impl<'a> Generator<'a> {
    pub fn new(registry: &'a Registry, renderer: &'a dyn TemplateRenderer) -> Self {
        Self {
            registry,
            renderer,
            validator: Box::new(SchemaValidator::new()),
            probe: Box::new(PathProbe),
        }
    }

    pub fn with_validator(mut self, validator: impl ConfigValidator + 'a) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_probe(mut self, probe: impl ToolProbe + 'a) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Composes the configuration and renders `template` with the result.
    pub async fn generate(&self, config: ProjectConfig, template: &str) -> Result<Generation> {
        let composition = self.compose(config).await?;
        let document = self.renderer.render(template, &composition.context);
        Ok(Generation { document, composition })
    }

    /// Same as [`Generator::generate`] with the template read through the template cache.
    pub async fn generate_from_file<P: AsRef<Path>>(
        &self,
        config: ProjectConfig,
        template_path: P,
    ) -> Result<Generation> {
        let template = load_template(template_path)?;
        self.generate(config, &template).await
    }

    /// Runs every pipeline step except rendering.
    ///
    /// # Errors
    /// * `Error::InvalidConfig` if validation fails; no provider runs
    /// * `Error::Provider` if a provider's hook or contribution fails
    pub async fn compose(&self, config: ProjectConfig) -> Result<Composition> {
        let report = self.validator.validate(&config);
        if !report.is_valid {
            return Err(Error::InvalidConfig { errors: report.errors });
        }
        let mut warnings = report.warnings;
        let config = self.validator.sanitize(config);

        let selected = self.select(&config, &mut warnings);
        let names: Vec<&str> = selected.iter().map(|d| d.name.as_str()).collect();
        info!("Composing with providers: {}", names.join(", "));

        let conflicts = self.registry.validate_compatibility(&names);
        for conflict in &conflicts {
            warn!("Incompatible providers {}", conflict);
            warnings.push(format!("Incompatible providers {conflict}"));
        }

        // Hooks run one provider at a time so probes of shared resources never race.
        let mut merged = Merged::default();
        for descriptor in &selected {
            let mut instance = descriptor.instantiate(&config);
            debug!("Running before_generation for '{}'", descriptor.name);
            instance.before_generation(&config).await.map_err(|source| Error::Provider {
                name: descriptor.name.clone(),
                stage: ProviderStage::BeforeGeneration,
                source,
            })?;
            let contribution = ContributionSet::collect(&descriptor.name, instance.as_ref())?;
            merged.absorb(descriptor.category, contribution);
        }

        warnings.extend(unsupported_features(&config, &selected, &merged.features));

        let context = self.build_context(&config, &selected, &merged);
        Ok(Composition {
            context,
            config_files: merged.config_files,
            providers: names.into_iter().map(str::to_string).collect(),
            conflicts,
            warnings,
        })
    }

    fn select(
        &self,
        config: &ProjectConfig,
        warnings: &mut Vec<String>,
    ) -> Vec<&'a CapabilityDescriptor> {
        let mut selected: Vec<&'a CapabilityDescriptor> = Vec::new();

        for (field, category) in SELECTION_ORDER {
            let Some(value) = config.selection(field) else {
                continue;
            };
            let name = descriptor_name(value);
            let Some(descriptor) = self.registry.get(&name) else {
                debug!("No provider registered as '{}', skipping {}", name, field);
                continue;
            };
            if descriptor.category != category {
                warnings.push(format!(
                    "'{}' is a {} provider and cannot be used as {}",
                    name, descriptor.category, field
                ));
                continue;
            }
            check_applicability(descriptor, config, warnings);
            selected.push(descriptor);
        }

        for feature in config.features() {
            let name = descriptor_name(&feature);
            let Some(descriptor) = self.registry.get(&name) else {
                continue;
            };
            if descriptor.category == Category::Misc && !selected.iter().any(|s| s.name == name) {
                check_applicability(descriptor, config, warnings);
                selected.push(descriptor);
            }
        }

        selected
    }

    fn build_context(
        &self,
        config: &ProjectConfig,
        selected: &[&CapabilityDescriptor],
        merged: &Merged,
    ) -> Value {
        let mut ctx = config.fields().clone();
        let has = |category: Category| selected.iter().any(|d| d.category == category);

        ctx.insert("providers".into(), selected.iter().map(|d| d.summary()).collect());
        ctx.insert("hasStack".into(), has(Category::Stack).into());
        ctx.insert("hasDatabase".into(), has(Category::Database).into());
        ctx.insert("hasTesting".into(), has(Category::Testing).into());
        ctx.insert("hasStyling".into(), has(Category::Styling).into());
        ctx.insert(
            "dependencies".into(),
            json!({"production": merged.production, "development": merged.development}),
        );
        ctx.insert(
            "hasDependencies".into(),
            (!merged.production.is_empty() || !merged.development.is_empty()).into(),
        );
        ctx.insert("configFiles".into(), json!(merged.config_files));
        ctx.insert("sections".into(), json!(merged.sections));
        ctx.insert("commands".into(), json!(merged.commands));
        ctx.insert(
            "commandList".into(),
            merged
                .commands
                .iter()
                .map(|(name, command)| json!({"name": name, "command": command}))
                .collect(),
        );
        ctx.insert("securityGuidelines".into(), json!(merged.security_guidelines));
        ctx.insert("supportedFeatures".into(), json!(merged.features));

        for (key, value) in &merged.variables {
            ctx.insert(key.clone(), value.clone());
        }

        self.derive_fields(&mut ctx, config, selected, merged);

        for (key, value) in config.custom_overrides() {
            debug!("Applying custom override '{}'", key);
            ctx.insert(key, value);
        }

        Value::Object(ctx)
    }

    /// Fills context fields no provider supplied.
    fn derive_fields(
        &self,
        ctx: &mut Map<String, Value>,
        config: &ProjectConfig,
        selected: &[&CapabilityDescriptor],
        merged: &Merged,
    ) {
        let label_for = |category: Category, field: &str| {
            selected
                .iter()
                .find(|d| d.category == category)
                .map(|d| d.display_name.clone())
                .or_else(|| config.selection(field).map(|v| v.to_title_case()))
        };
        if let Some(label) = label_for(Category::Stack, "stack") {
            ctx.entry("stackLabel").or_insert(label.into());
        }
        if let Some(label) = label_for(Category::Database, "database") {
            ctx.entry("databaseLabel").or_insert(label.into());
        }
        if let Some(language) = config.language() {
            ctx.entry("languageLabel").or_insert(known_label(&LANGUAGE_LABELS, language).into());
        }
        if let Some(deployment) = config.selection("deployment") {
            ctx.entry("deploymentLabel")
                .or_insert(known_label(&DEPLOYMENT_LABELS, deployment).into());
        }

        let mut structure = Vec::new();
        if !merged.stack_structure {
            let name = config.project_name().unwrap_or("project");
            structure.push(fallback_file_structure(name, config.language()));
        }
        structure.extend(merged.fragments.iter().cloned());
        ctx.entry("fileStructure").or_insert(structure.join("\n").into());

        let strategy = config
            .selection("testing")
            .and_then(|t| TESTING_STRATEGIES.iter().find(|(name, _)| *name == t))
            .map_or(DEFAULT_TESTING_STRATEGY, |(_, strategy)| *strategy);
        ctx.entry("testingStrategy").or_insert(strategy.into());

        let statuses = probe_tools(self.probe.as_ref(), &required_tools(config.language()));
        let notice = tool_notice(&statuses);
        let missing: Vec<&str> =
            statuses.iter().filter(|s| !s.available).map(|s| s.name.as_str()).collect();
        ctx.entry("missingTools").or_insert(json!(missing));
        ctx.entry("hasMissingTools").or_insert((!missing.is_empty()).into());
        ctx.entry("toolNotice").or_insert(notice.unwrap_or_default().into());
        ctx.entry("tools").or_insert(json!(statuses));
    }
}

impl std::fmt::Debug for Generator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("registry", &self.registry).finish_non_exhaustive()
    }
}

/// Contributions of all providers, merged in selection order.
#[derive(Debug, Default)]
struct Merged {
    production: Vec<String>,
    development: Vec<String>,
    config_files: Vec<ConfigFile>,
    sections: Vec<MarkdownSection>,
    commands: IndexMap<String, String>,
    security_guidelines: Vec<String>,
    variables: Map<String, Value>,
    fragments: Vec<String>,
    stack_structure: bool,
    features: BTreeSet<String>,
}

impl Merged {
    fn absorb(&mut self, category: Category, set: ContributionSet) {
        self.production.extend(set.dependencies.production);
        self.development.extend(set.dependencies.development);
        self.config_files.extend(set.config_files);
        self.sections.extend(set.markdown_sections);
        self.security_guidelines.extend(set.security_guidelines);
        // Later providers may redefine commands such as `test` or `lint`.
        self.commands.extend(set.commands);
        self.variables.extend(set.template_variables);
        self.features.extend(set.supported_features);
        if let Some(fragment) = set.file_structure {
            self.stack_structure |= category == Category::Stack;
            self.fragments.push(fragment);
        }
    }
}

fn check_applicability(
    descriptor: &CapabilityDescriptor,
    config: &ProjectConfig,
    warnings: &mut Vec<String>,
) {
    if let Some(project_type) = config.project_type() {
        if !descriptor.supports_project_type(project_type) {
            warnings.push(format!(
                "{} is not intended for {} projects",
                descriptor.display_name, project_type
            ));
        }
    }
    if let Some(language) = config.language() {
        if !descriptor.supports_language(language) {
            warnings.push(format!(
                "{} does not target {}",
                descriptor.display_name,
                known_label(&LANGUAGE_LABELS, language)
            ));
        }
    }
}

fn unsupported_features(
    config: &ProjectConfig,
    selected: &[&CapabilityDescriptor],
    supported: &BTreeSet<String>,
) -> Vec<String> {
    config
        .features()
        .into_iter()
        .filter(|f| !supported.contains(f))
        .filter(|f| !selected.iter().any(|d| d.name == descriptor_name(f)))
        .map(|f| format!("Feature '{f}' is not supported by the selected providers"))
        .collect()
}

fn known_label(table: &[(&str, &str)], value: &str) -> String {
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(value))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| value.to_title_case())
}

fn fallback_file_structure(name: &str, language: Option<&str>) -> String {
    let source = match language {
        Some("rust") => "├── src/\n│   └── main.rs",
        Some("python") => "├── src/\n│   └── __init__.py",
        Some("go") => "├── cmd/\n├── internal/",
        _ => "├── src/",
    };
    format!("{name}/\n{source}\n├── tests/\n├── .gitignore\n└── README.md")
}
