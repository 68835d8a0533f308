//! The contract every capability provider implements.
//!
//! A provider is described statically by a [`CapabilityDescriptor`] and bound
//! to one run's [`ProjectConfig`] through the descriptor's factory, producing a
//! [`Capability`] instance. The composition pipeline only talks to providers
//! through this trait.

use crate::config::ProjectConfig;
use crate::error::{Error, ProviderStage, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Provider category. Selection order in the pipeline follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Stack,
    Database,
    Testing,
    Styling,
    Misc,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Stack,
        Category::Database,
        Category::Testing,
        Category::Styling,
        Category::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stack => "stack",
            Category::Database => "database",
            Category::Testing => "testing",
            Category::Styling => "styling",
            Category::Misc => "misc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown capability category '{s}'"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub production: Vec<String>,
    pub development: Vec<String>,
}

impl Dependencies {
    pub fn new<P, D>(production: P, development: D) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            production: production.into_iter().map(Into::into).collect(),
            development: development.into_iter().map(Into::into).collect(),
        }
    }
}

/// A file a provider wants materialized next to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub name: String,
    pub language: String,
    pub content: String,
}

impl ConfigFile {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), language: language.into(), content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownSection {
    pub title: String,
    pub content: String,
}

impl MarkdownSection {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), content: content.into() }
    }
}

/// A descriptor bound to one composition run's configuration.
///
/// Contribution methods must be pure functions of the bound configuration
/// and whatever state [`Capability::before_generation`] recorded. Fallible
/// methods return `anyhow::Result`; the pipeline tags failures with the
/// provider name.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Runs once per instance before any contribution is read.
    async fn before_generation(&mut self, _config: &ProjectConfig) -> anyhow::Result<()> {
        Ok(())
    }

    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        Ok(Dependencies::default())
    }

    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        Ok(Vec::new())
    }

    /// Directory tree fragment describing the files this provider adds.
    fn file_structure_fragment(&self) -> Option<String> {
        None
    }

    fn markdown_sections(&self) -> Vec<MarkdownSection> {
        Vec::new()
    }

    fn commands(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    fn security_guidelines(&self) -> Vec<String> {
        Vec::new()
    }

    fn template_variables(&self) -> Map<String, Value> {
        Map::new()
    }

    fn supported_features(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Whether this provider may be composed together with `other`, a descriptor name.
    fn is_compatible_with(&self, _other: &str) -> bool {
        true
    }
}

/// Binds a descriptor to a configuration.
pub type CapabilityFactory = Arc<dyn Fn(&ProjectConfig) -> Box<dyn Capability> + Send + Sync>;

/// Static identity and metadata of a provider.
#[derive(Clone)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub display_name: String,
    pub category: Category,
    pub project_types: BTreeSet<String>,
    pub languages: BTreeSet<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    factory: CapabilityFactory,
}

impl CapabilityDescriptor {
    pub fn new<F>(
        name: impl Into<String>,
        display_name: impl Into<String>,
        category: Category,
        factory: F,
    ) -> Self
    where
        F: Fn(&ProjectConfig) -> Box<dyn Capability> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            category,
            project_types: BTreeSet::new(),
            languages: BTreeSet::new(),
            icon: None,
            description: None,
            factory: Arc::new(factory),
        }
    }

    pub fn with_project_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// An empty tag set means the provider applies to every project type.
    pub fn supports_project_type(&self, project_type: &str) -> bool {
        self.project_types.is_empty() || self.project_types.contains(project_type)
    }

    /// An empty tag set means the provider applies to every language.
    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.contains(language)
    }

    pub fn instantiate(&self, config: &ProjectConfig) -> Box<dyn Capability> {
        (self.factory)(config)
    }

    /// Metadata exposed to templates.
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "displayName": self.display_name,
            "category": self.category.as_str(),
            "icon": self.icon,
            "description": self.description,
        })
    }
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("category", &self.category)
            .field("project_types", &self.project_types)
            .field("languages", &self.languages)
            .field("icon", &self.icon)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Everything one instance contributes to a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionSet {
    pub dependencies: Dependencies,
    pub config_files: Vec<ConfigFile>,
    pub file_structure: Option<String>,
    pub markdown_sections: Vec<MarkdownSection>,
    pub commands: IndexMap<String, String>,
    pub security_guidelines: Vec<String>,
    pub template_variables: Map<String, Value>,
    pub supported_features: BTreeSet<String>,
}

impl ContributionSet {
    /// Reads every contribution method of an instance, tagging failures with `name`.
    pub fn collect(name: &str, instance: &dyn Capability) -> Result<Self> {
        let tag = |stage| {
            let name = name.to_string();
            move |source| Error::Provider { name, stage, source }
        };
        let dependencies = instance.dependencies().map_err(tag(ProviderStage::Dependencies))?;
        let config_files = instance.config_files().map_err(tag(ProviderStage::ConfigFiles))?;

        Ok(Self {
            dependencies,
            config_files,
            file_structure: instance.file_structure_fragment().filter(|s| !s.trim().is_empty()),
            markdown_sections: instance.markdown_sections(),
            commands: instance.commands(),
            security_guidelines: instance.security_guidelines(),
            template_variables: instance.template_variables(),
            supported_features: instance.supported_features(),
        })
    }
}
