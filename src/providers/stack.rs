//! Application stack providers.

use crate::capability::{
    Capability, CapabilityDescriptor, Category, ConfigFile, Dependencies, MarkdownSection,
};
use crate::config::ProjectConfig;
use anyhow::{bail, Context};
use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

/// Full-page frontend frameworks; at most one of them can own a project.
pub const FRONTEND_PROVIDERS: [&str; 3] = ["react-plugin", "vue-plugin", "angular-plugin"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackageManager {
    #[default]
    Npm,
    Pnpm,
    Yarn,
}

impl PackageManager {
    const LOCKFILES: [(&'static str, PackageManager); 3] = [
        ("pnpm-lock.yaml", PackageManager::Pnpm),
        ("yarn.lock", PackageManager::Yarn),
        ("package-lock.json", PackageManager::Npm),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
        }
    }

    /// Picks the package manager whose lockfile is present in `dir`.
    pub async fn detect(dir: &Path) -> anyhow::Result<Option<Self>> {
        for (lockfile, manager) in Self::LOCKFILES {
            let path = dir.join(lockfile);
            let found = tokio::fs::try_exists(&path)
                .await
                .with_context(|| format!("probing {}", path.display()))?;
            if found {
                return Ok(Some(manager));
            }
        }
        Ok(None)
    }

    pub fn install(&self) -> String {
        format!("{} install", self.as_str())
    }

    pub fn run(&self, script: &str) -> String {
        match self {
            PackageManager::Npm => format!("npm run {script}"),
            other => format!("{} {script}", other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framework {
    React,
    Vue,
    Angular,
    Express,
}

impl Framework {
    fn descriptor_name(&self) -> &'static str {
        match self {
            Framework::React => "react-plugin",
            Framework::Vue => "vue-plugin",
            Framework::Angular => "angular-plugin",
            Framework::Express => "express-plugin",
        }
    }

    fn is_frontend(&self) -> bool {
        FRONTEND_PROVIDERS.contains(&self.descriptor_name())
    }
}

/// A Node.js based stack. The package manager is read from the lockfile
/// already present in `projectDir`, defaulting to npm.
#[derive(Debug)]
struct NodeStack {
    framework: Framework,
    typescript: bool,
    package_manager: PackageManager,
}

impl NodeStack {
    fn new(framework: Framework, config: &ProjectConfig) -> Self {
        Self {
            framework,
            typescript: config.language() != Some("javascript"),
            package_manager: PackageManager::default(),
        }
    }

    fn source_ext(&self) -> &'static str {
        match (self.framework, self.typescript) {
            (Framework::React, true) => "tsx",
            (Framework::React, false) => "jsx",
            (_, true) => "ts",
            (_, false) => "js",
        }
    }
}

#[async_trait]
impl Capability for NodeStack {
    async fn before_generation(&mut self, config: &ProjectConfig) -> anyhow::Result<()> {
        let Some(dir) = config.get_str("projectDir") else {
            return Ok(());
        };
        let dir = Path::new(dir);
        match tokio::fs::metadata(dir).await {
            Ok(meta) if !meta.is_dir() => {
                bail!("project directory '{}' is not a directory", dir.display())
            }
            Ok(_) => {
                if let Some(manager) = PackageManager::detect(dir).await? {
                    debug!("Detected {} lockfile in {}", manager.as_str(), dir.display());
                    self.package_manager = manager;
                }
            }
            // A project that does not exist yet keeps the default manager.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("inspecting {}", dir.display()));
            }
        }
        Ok(())
    }

    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        let (production, mut development) = match self.framework {
            Framework::React => (vec!["react", "react-dom"], vec!["vite", "@vitejs/plugin-react"]),
            Framework::Vue => (vec!["vue"], vec!["vite", "@vitejs/plugin-vue"]),
            Framework::Angular => (
                vec!["@angular/core", "@angular/common", "@angular/router", "rxjs"],
                vec!["@angular/cli"],
            ),
            Framework::Express => (vec!["express", "helmet"], vec!["nodemon"]),
        };
        if self.typescript {
            development.push("typescript");
            match self.framework {
                Framework::React => development.push("@types/react"),
                Framework::Express => development.push("@types/express"),
                _ => {}
            }
        }
        Ok(Dependencies::new(production, development))
    }

    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        let mut files = Vec::new();
        if self.typescript {
            let jsx = if self.framework == Framework::React { "react-jsx" } else { "preserve" };
            let tsconfig = json!({
                "compilerOptions": {
                    "target": "ES2022",
                    "module": "ESNext",
                    "moduleResolution": "bundler",
                    "strict": true,
                    "jsx": jsx,
                    "skipLibCheck": true
                },
                "include": ["src"]
            });
            let content = serde_json::to_string_pretty(&tsconfig).context("serializing tsconfig")?;
            files.push(ConfigFile::new("tsconfig.json", "json", content));
        }
        let vite_plugin = match self.framework {
            Framework::React => Some(("react", "@vitejs/plugin-react")),
            Framework::Vue => Some(("vue", "@vitejs/plugin-vue")),
            _ => None,
        };
        if let Some((plugin, package)) = vite_plugin {
            let ext = if self.typescript { "ts" } else { "js" };
            files.push(ConfigFile::new(
                format!("vite.config.{ext}"),
                ext,
                format!(
                    "import {{ defineConfig }} from 'vite';\nimport {plugin} from '{package}';\n\nexport default defineConfig({{\n  plugins: [{plugin}()],\n}});\n"
                ),
            ));
        }
        Ok(files)
    }

    fn file_structure_fragment(&self) -> Option<String> {
        let ext = self.source_ext();
        let tree = match self.framework {
            Framework::React | Framework::Vue => {
                let app = if self.framework == Framework::Vue { "vue" } else { ext };
                format!("src/\n├── components/\n├── pages/\n├── main.{ext}\n└── App.{app}")
            }
            Framework::Angular => {
                "src/\n├── app/\n│   ├── app.component.ts\n│   └── app.routes.ts\n└── main.ts"
                    .to_string()
            }
            Framework::Express => {
                format!("src/\n├── routes/\n├── middleware/\n└── server.{ext}")
            }
        };
        Some(tree)
    }

    fn markdown_sections(&self) -> Vec<MarkdownSection> {
        let pm = self.package_manager;
        vec![MarkdownSection::new(
            "Local development",
            format!(
                "Install dependencies with `{}` and start the development server with `{}`.",
                pm.install(),
                pm.run("dev")
            ),
        )]
    }

    fn commands(&self) -> IndexMap<String, String> {
        let pm = self.package_manager;
        let mut commands = IndexMap::new();
        commands.insert("install".to_string(), pm.install());
        commands.insert("dev".to_string(), pm.run("dev"));
        commands.insert("build".to_string(), pm.run("build"));
        if self.framework == Framework::Express {
            commands.insert("start".to_string(), pm.run("start"));
        }
        commands
    }

    fn security_guidelines(&self) -> Vec<String> {
        let mut guidelines =
            vec!["Run `npm audit` in CI and keep lockfiles committed.".to_string()];
        match self.framework {
            Framework::Express => guidelines.push(
                "Keep `helmet` enabled and validate every request body before use.".to_string(),
            ),
            _ => guidelines.push(
                "Never render untrusted HTML without sanitizing it first.".to_string(),
            ),
        }
        guidelines
    }

    fn template_variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("packageManager".into(), self.package_manager.as_str().into());
        vars.insert("installCommand".into(), self.package_manager.install().into());
        vars
    }

    fn supported_features(&self) -> BTreeSet<String> {
        let mut features: BTreeSet<String> = ["typescript", "hot-reload"].map(String::from).into();
        if self.framework == Framework::Express {
            features.insert("rest-api".to_string());
            features.insert("auth".to_string());
        } else {
            features.insert("routing".to_string());
        }
        features
    }

    fn is_compatible_with(&self, other: &str) -> bool {
        !(self.framework.is_frontend()
            && other != self.framework.descriptor_name()
            && FRONTEND_PROVIDERS.contains(&other))
    }
}

#[derive(Debug)]
struct FastApi;

#[async_trait]
impl Capability for FastApi {
    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        Ok(Dependencies::new(["fastapi", "uvicorn[standard]", "pydantic"], ["ruff", "mypy"]))
    }

    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        Ok(vec![ConfigFile::new(
            "pyproject.toml",
            "toml",
            "[tool.ruff]\nline-length = 100\n\n[tool.mypy]\nstrict = true\n",
        )])
    }

    fn file_structure_fragment(&self) -> Option<String> {
        Some("app/\n├── api/\n├── models/\n└── main.py".to_string())
    }

    fn commands(&self) -> IndexMap<String, String> {
        IndexMap::from([
            ("install".to_string(), "pip install -e .".to_string()),
            ("dev".to_string(), "uvicorn app.main:app --reload".to_string()),
            ("lint".to_string(), "ruff check .".to_string()),
        ])
    }

    fn security_guidelines(&self) -> Vec<String> {
        vec!["Declare request models with pydantic so input is validated at the edge.".to_string()]
    }

    fn supported_features(&self) -> BTreeSet<String> {
        ["rest-api", "openapi", "auth"].map(String::from).into()
    }
}

pub(super) fn descriptors() -> Vec<CapabilityDescriptor> {
    let node = |framework: Framework| {
        move |config: &ProjectConfig| -> Box<dyn Capability> {
            Box::new(NodeStack::new(framework, config))
        }
    };
    vec![
        CapabilityDescriptor::new("react-plugin", "React", Category::Stack, node(Framework::React))
            .with_project_types(["web", "fullstack"])
            .with_languages(["typescript", "javascript"])
            .with_icon("⚛️")
            .with_description("React single-page application built with Vite"),
        CapabilityDescriptor::new("vue-plugin", "Vue", Category::Stack, node(Framework::Vue))
            .with_project_types(["web", "fullstack"])
            .with_languages(["typescript", "javascript"])
            .with_description("Vue 3 application built with Vite"),
        CapabilityDescriptor::new(
            "angular-plugin",
            "Angular",
            Category::Stack,
            node(Framework::Angular),
        )
        .with_project_types(["web", "fullstack"])
        .with_languages(["typescript"])
        .with_description("Angular application using standalone components"),
        CapabilityDescriptor::new(
            "express-plugin",
            "Express",
            Category::Stack,
            node(Framework::Express),
        )
        .with_project_types(["api", "fullstack"])
        .with_languages(["typescript", "javascript"])
        .with_description("Express HTTP API"),
        CapabilityDescriptor::new("fastapi-plugin", "FastAPI", Category::Stack, |_| {
            Box::new(FastApi)
        })
        .with_project_types(["api"])
        .with_languages(["python"])
        .with_icon("🐍")
        .with_description("FastAPI service served by uvicorn"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontends_exclude_each_other() {
        let react = NodeStack::new(Framework::React, &ProjectConfig::default());
        assert!(!react.is_compatible_with("vue-plugin"));
        assert!(react.is_compatible_with("react-plugin"));
        assert!(react.is_compatible_with("express-plugin"));

        let express = NodeStack::new(Framework::Express, &ProjectConfig::default());
        assert!(express.is_compatible_with("react-plugin"));
    }

    #[test]
    fn test_package_manager_commands() {
        assert_eq!(PackageManager::Npm.run("dev"), "npm run dev");
        assert_eq!(PackageManager::Pnpm.run("dev"), "pnpm dev");
        assert_eq!(PackageManager::Yarn.install(), "yarn install");
    }

    #[test]
    fn test_javascript_skips_tsconfig() {
        let config = ProjectConfig::new().with("language", "javascript");
        let react = NodeStack::new(Framework::React, &config);
        let files = react.config_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "vite.config.js");
        assert!(!react.dependencies().unwrap().development.contains(&"typescript".to_string()));
    }
}
