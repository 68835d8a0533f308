//! Test framework providers. Each one takes over the `test` command.

use crate::capability::{Capability, CapabilityDescriptor, Category, ConfigFile, Dependencies};
use crate::config::ProjectConfig;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Runner {
    Jest,
    Vitest,
    Pytest,
}

#[derive(Debug)]
struct TestRunner {
    runner: Runner,
    typescript: bool,
}

impl TestRunner {
    fn new(runner: Runner, config: &ProjectConfig) -> Self {
        Self { runner, typescript: config.language() == Some("typescript") }
    }

    fn test_command(&self) -> &'static str {
        match self.runner {
            Runner::Jest => "npx jest",
            Runner::Vitest => "npx vitest run",
            Runner::Pytest => "pytest",
        }
    }
}

#[async_trait]
impl Capability for TestRunner {
    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        let mut development = match self.runner {
            Runner::Jest => vec!["jest"],
            Runner::Vitest => vec!["vitest"],
            Runner::Pytest => vec!["pytest", "pytest-cov"],
        };
        if self.typescript && self.runner == Runner::Jest {
            development.extend(["ts-jest", "@types/jest"]);
        }
        Ok(Dependencies::new(Vec::<String>::new(), development))
    }

    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        let file = match self.runner {
            Runner::Jest => {
                let preset = if self.typescript { "\n  preset: 'ts-jest'," } else { "" };
                ConfigFile::new(
                    "jest.config.js",
                    "javascript",
                    format!("module.exports = {{{preset}\n  testEnvironment: 'node',\n}};\n"),
                )
            }
            Runner::Vitest => ConfigFile::new(
                "vitest.config.ts",
                "typescript",
                "import { defineConfig } from 'vitest/config';\n\nexport default defineConfig({\n  test: { coverage: { provider: 'v8' } },\n});\n",
            ),
            Runner::Pytest => ConfigFile::new(
                "pytest.ini",
                "ini",
                "[pytest]\ntestpaths = tests\naddopts = --cov\n",
            ),
        };
        Ok(vec![file])
    }

    fn file_structure_fragment(&self) -> Option<String> {
        match self.runner {
            Runner::Pytest => Some("tests/\n├── conftest.py\n└── test_app.py".to_string()),
            _ => None,
        }
    }

    fn commands(&self) -> IndexMap<String, String> {
        IndexMap::from([("test".to_string(), self.test_command().to_string())])
    }

    fn template_variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("testCommand".into(), self.test_command().into());
        vars
    }

    fn supported_features(&self) -> BTreeSet<String> {
        ["unit-tests", "coverage"].map(String::from).into()
    }
}

pub(super) fn descriptors() -> Vec<CapabilityDescriptor> {
    let runner = |runner: Runner| {
        move |config: &ProjectConfig| -> Box<dyn Capability> {
            Box::new(TestRunner::new(runner, config))
        }
    };
    vec![
        CapabilityDescriptor::new("jest-plugin", "Jest", Category::Testing, runner(Runner::Jest))
            .with_languages(["typescript", "javascript"])
            .with_description("Jest test runner"),
        CapabilityDescriptor::new(
            "vitest-plugin",
            "Vitest",
            Category::Testing,
            runner(Runner::Vitest),
        )
        .with_languages(["typescript", "javascript"])
        .with_description("Vitest test runner with v8 coverage"),
        CapabilityDescriptor::new(
            "pytest-plugin",
            "pytest",
            Category::Testing,
            runner(Runner::Pytest),
        )
        .with_languages(["python"])
        .with_description("pytest with coverage reporting"),
    ]
}
