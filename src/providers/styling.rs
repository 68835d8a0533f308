//! Styling providers.

use crate::capability::{Capability, CapabilityDescriptor, Category, ConfigFile, Dependencies};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::BTreeSet;

#[derive(Debug)]
struct Tailwind;

#[async_trait]
impl Capability for Tailwind {
    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        Ok(Dependencies::new(Vec::<String>::new(), ["tailwindcss", "postcss", "autoprefixer"]))
    }

    fn config_files(&self) -> anyhow::Result<Vec<ConfigFile>> {
        Ok(vec![
            ConfigFile::new(
                "tailwind.config.js",
                "javascript",
                "/** @type {import('tailwindcss').Config} */\nexport default {\n  content: ['./index.html', './src/**/*.{js,ts,jsx,tsx,vue}'],\n  theme: { extend: {} },\n  plugins: [],\n};\n",
            ),
            ConfigFile::new(
                "postcss.config.js",
                "javascript",
                "export default {\n  plugins: { tailwindcss: {}, autoprefixer: {} },\n};\n",
            ),
        ])
    }

    fn file_structure_fragment(&self) -> Option<String> {
        Some("src/styles/\n└── globals.css".to_string())
    }

    fn commands(&self) -> IndexMap<String, String> {
        IndexMap::from([("lint:css".to_string(), "npx stylelint \"src/**/*.css\"".to_string())])
    }

    fn supported_features(&self) -> BTreeSet<String> {
        ["dark-mode", "responsive"].map(String::from).into()
    }
}

#[derive(Debug)]
struct Sass;

#[async_trait]
impl Capability for Sass {
    fn dependencies(&self) -> anyhow::Result<Dependencies> {
        Ok(Dependencies::new(Vec::<String>::new(), ["sass"]))
    }

    fn file_structure_fragment(&self) -> Option<String> {
        Some("src/styles/\n├── _variables.scss\n└── main.scss".to_string())
    }

    fn supported_features(&self) -> BTreeSet<String> {
        ["responsive"].map(String::from).into()
    }
}

pub(super) fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor::new("tailwind-plugin", "Tailwind CSS", Category::Styling, |_| {
            Box::new(Tailwind)
        })
        .with_project_types(["web", "fullstack"])
        .with_languages(["typescript", "javascript"])
        .with_icon("🎨")
        .with_description("Utility-first CSS with PostCSS"),
        CapabilityDescriptor::new("sass-plugin", "Sass", Category::Styling, |_| Box::new(Sass))
            .with_project_types(["web", "fullstack"])
            .with_description("Sass stylesheets compiled by the bundler"),
    ]
}
