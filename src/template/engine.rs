use super::blocks::{block_tags, match_each, match_if, replace_tags, TagKind};
use super::cache::load_template;
use super::context::{display, is_truthy, lookup};
use super::helpers::{builtin_helpers, helper, parse_args, Helper};
use super::TemplateRenderer;
use crate::constants::{MAX_PARTIAL_DEPTH, PARTIAL_PATTERNS};
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

static PARTIAL_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{>\s*([A-Za-z0-9_@./-]+)\s*\}\}").expect("partial tag pattern is valid")
});

static VARIABLE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@?[A-Za-z_][\w-]*(?:\.[\w-]+)*$").expect("variable pattern is valid")
});

/// Stands in for `{{` inside values produced by substitution and helpers,
/// so later passes never treat context data as markup.
const INERT_OPEN: &str = "\u{FDD0}";

static HELPER_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][\w-]*)\s+(.+)$").expect("helper pattern is valid")
});

/// Renders the kiln markup DSL.
///
/// Each render runs five passes in order, each consuming the previous pass's
/// output: partial inclusion, conditional blocks, iteration blocks, variable
/// substitution and helper invocation. Nothing in the DSL is fatal; unknown
/// variables render empty and unknown partials or helpers stay literal.
/// Text produced by a variable or helper is never scanned for markup again.
pub struct TemplateEngine {
    helpers: IndexMap<String, Helper>,
    partials: IndexMap<String, String>,
}

impl TemplateEngine {
    /// Creates an engine with the built-in helpers and no partials.
    pub fn new() -> Self {
        let helpers = builtin_helpers()
            .into_iter()
            .map(|(name, helper)| (name.to_string(), helper))
            .collect();
        Self { helpers, partials: IndexMap::new() }
    }

    /// Registers or replaces a helper.
    pub fn register_helper<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> String + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), helper(f));
    }

    /// Registers or replaces a partial.
    pub fn register_partial(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.partials.insert(name.into(), template.into());
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn has_partial(&self, name: &str) -> bool {
        self.partials.contains_key(name)
    }

    /// Registers every partial file found under `dir`.
    ///
    /// A file `dir/sections/intro.md` becomes the partial `sections/intro`.
    /// Returns the number of partials registered.
    pub fn register_partials_from_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        let patterns = partial_globs()?;
        let mut count = 0;

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::TemplateError(e.to_string()))?;
            if !entry.file_type().is_file() || !patterns.is_match(entry.file_name()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| Error::TemplateError(e.to_string()))?;
            let name = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            debug!("Registering partial '{}' from {}", name, entry.path().display());
            let text = load_template(entry.path())?;
            self.register_partial(name, text.to_string());
            count += 1;
        }

        Ok(count)
    }

    /// Loads the template at `path` through the template cache and renders it.
    pub fn render_file<P: AsRef<Path>>(&self, path: P, context: &Value) -> Result<String> {
        let template = load_template(path)?;
        Ok(self.render(&template, context))
    }

    fn render_at_depth(&self, template: &str, context: &Value, depth: usize) -> String {
        let text = self.include_partials(template, context, depth);
        let text = self.resolve_conditionals(&text, context, depth);
        let text = self.expand_loops(&text, context, depth);
        let text = substitute_variables(&text, context);
        self.invoke_helpers(&text, context)
    }

    fn include_partials(&self, text: &str, context: &Value, depth: usize) -> String {
        PARTIAL_TAG
            .replace_all(text, |caps: &Captures<'_>| {
                let name = &caps[1];
                match self.partials.get(name) {
                    Some(_) if depth >= MAX_PARTIAL_DEPTH => {
                        warn!("Partial '{}' nested too deeply, leaving it unexpanded", name);
                        caps[0].to_string()
                    }
                    Some(partial) => self.render_at_depth(partial, context, depth + 1),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn resolve_conditionals(&self, text: &str, context: &Value, depth: usize) -> String {
        let tags = block_tags(text);
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut i = 0;

        while i < tags.len() {
            match tags[i].kind {
                // Loop bodies are resolved per element by the iteration pass.
                TagKind::EachOpen(_) => match match_each(&tags, i) {
                    Some(close) => i = close + 1,
                    None => i += 1,
                },
                TagKind::IfOpen(expr) => {
                    let Some(block) = match_if(&tags, i) else {
                        i += 1;
                        continue;
                    };
                    let open = tags[block.open];
                    let close = tags[block.close];
                    let (then_branch, else_branch) = match block.else_at {
                        Some(e) => {
                            let else_tag = tags[e];
                            (&text[open.end..else_tag.start], &text[else_tag.end..close.start])
                        }
                        None => (&text[open.end..close.start], ""),
                    };

                    let taken = if lookup(context, expr).is_some_and(is_truthy) {
                        then_branch
                    } else {
                        else_branch
                    };

                    out.push_str(&text[cursor..open.start]);
                    out.push_str(&self.render_at_depth(taken, context, depth));
                    cursor = close.end;
                    i = block.close + 1;
                }
                _ => i += 1,
            }
        }

        out.push_str(&text[cursor..]);
        out
    }

    fn expand_loops(&self, text: &str, context: &Value, depth: usize) -> String {
        let tags = block_tags(text);
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut i = 0;

        while i < tags.len() {
            let TagKind::EachOpen(path) = tags[i].kind else {
                i += 1;
                continue;
            };
            let Some(close_at) = match_each(&tags, i) else {
                break;
            };
            let open = tags[i];
            let close = tags[close_at];
            let body = &text[open.end..close.start];

            out.push_str(&text[cursor..open.start]);
            if let Some(Value::Array(items)) = lookup(context, path) {
                for (index, item) in items.iter().enumerate() {
                    let scope = iteration_scope(context, item, index, items.len());
                    out.push_str(&self.render_at_depth(body, &scope, depth));
                }
            }
            cursor = close.end;
            i = close_at + 1;
        }

        out.push_str(&text[cursor..]);
        out
    }

    fn invoke_helpers(&self, text: &str, context: &Value) -> String {
        replace_tags(text, |body| {
            let caps = HELPER_CALL.captures(body.trim())?;
            let helper = self.helpers.get(&caps[1])?;
            Some(inert(helper(&parse_args(&caps[2], context))))
        })
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(&self, template: &str, context: &Value) -> String {
        self.render_at_depth(template, context, 0).replace(INERT_OPEN, "{{")
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        TemplateEngine::new()
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .field("partials", &self.partials.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn substitute_variables(text: &str, context: &Value) -> String {
    replace_tags(text, |body| {
        let path = body.trim();
        // A stray `{{else}}` is a block tag, not a variable.
        if path == "else" || !VARIABLE_PATH.is_match(path) {
            return None;
        }
        Some(inert(lookup(context, path).map(display).unwrap_or_default()))
    })
}

fn inert(text: String) -> String {
    if text.contains("{{") {
        text.replace("{{", INERT_OPEN)
    } else {
        text
    }
}

/// Outer context plus the element's own fields, `this` and positional values.
fn iteration_scope(context: &Value, item: &Value, index: usize, length: usize) -> Value {
    let mut scope = match context {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(fields) = item {
        for (key, value) in fields {
            scope.insert(key.clone(), value.clone());
        }
    }
    scope.insert("this".to_string(), item.clone());
    scope.insert("@index".to_string(), Value::from(index));
    scope.insert("@first".to_string(), Value::Bool(index == 0));
    scope.insert("@last".to_string(), Value::Bool(index + 1 == length));
    scope.insert("@length".to_string(), Value::from(length));
    Value::Object(scope)
}

fn partial_globs() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in PARTIAL_PATTERNS {
        builder.add(Glob::new(pattern).map_err(|e| Error::TemplateError(e.to_string()))?);
    }
    builder.build().map_err(|e| Error::TemplateError(e.to_string()))
}
