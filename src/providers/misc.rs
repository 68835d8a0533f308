//! Providers selected through the `features` list.

use crate::capability::{Capability, CapabilityDescriptor, Category, ConfigFile, MarkdownSection};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::BTreeSet;

#[derive(Debug)]
struct Docker {
    language: String,
}

impl Docker {
    fn base_image(&self) -> &'static str {
        match self.language.as_str() {
            "typescript" | "javascript" => "node:20-alpine",
            "python" => "python:3.12-slim",
            "rust" => "rust:1-slim",
            "go" => "golang:1.22-alpine",
            "java" => "eclipse-temurin:21-jre",
            "csharp" => "mcr.microsoft.com/dotnet/aspnet:8.0",
            _ => "debian:bookworm-slim",
        }
    }
}

#[async_trait]
impl Capability for Docker {
    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        Ok(vec![
            ConfigFile::new(
                "Dockerfile",
                "dockerfile",
                format!("FROM {}\nWORKDIR /app\nCOPY . .\n", self.base_image()),
            ),
            ConfigFile::new(".dockerignore", "text", ".git\nnode_modules\ntarget\n.env\n"),
        ])
    }

    fn file_structure_fragment(&self) -> Option<String> {
        Some("Dockerfile\n.dockerignore".to_string())
    }

    fn commands(&self) -> IndexMap<String, String> {
        IndexMap::from([("docker:build".to_string(), "docker build -t app .".to_string())])
    }

    fn security_guidelines(&self) -> Vec<String> {
        vec!["Run the container as a non-root user and pin base image versions.".to_string()]
    }

    fn supported_features(&self) -> BTreeSet<String> {
        ["docker", "containers"].map(String::from).into()
    }
}

#[derive(Debug)]
struct GithubActions;

#[async_trait]
impl Capability for GithubActions {
    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        Ok(vec![ConfigFile::new(
            ".github/workflows/ci.yml",
            "yaml",
            "name: CI\non: [push, pull_request]\njobs:\n  test:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n",
        )])
    }

    fn markdown_sections(&self) -> Vec<MarkdownSection> {
        vec![MarkdownSection::new(
            "Continuous integration",
            "Every push and pull request runs the test suite through GitHub Actions.",
        )]
    }

    fn supported_features(&self) -> BTreeSet<String> {
        ["ci"].map(String::from).into()
    }
}

pub(super) fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor::new("docker-plugin", "Docker", Category::Misc, |config| {
            let language = config.language().unwrap_or_default().to_string();
            Box::new(Docker { language })
        })
        .with_icon("🐳")
        .with_description("Container image for local runs and deployment"),
        CapabilityDescriptor::new("ci-plugin", "GitHub Actions", Category::Misc, |_| {
            Box::new(GithubActions)
        })
        .with_description("Continuous integration workflow"),
    ]
}
