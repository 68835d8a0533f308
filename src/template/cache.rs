//! Process-wide cache of template documents keyed by path.
//!
//! Template text is read-only source material, so entries are never
//! invalidated automatically. Callers that rewrite a template on disk
//! mid-process must call [`clear_template_cache`].

use crate::error::{Error, Result};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

static TEMPLATE_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<str>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn cache() -> MutexGuard<'static, HashMap<PathBuf, Arc<str>>> {
    // Entries are inserted whole, so a poisoned lock still guards a consistent map.
    TEMPLATE_CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Returns the text of the template at `path`, reading it on first use.
///
/// # Errors
/// * `Error::TemplateError` if the path is not a file
/// * `Error::IoError` if reading fails
pub fn load_template<P: AsRef<Path>>(path: P) -> Result<Arc<str>> {
    let path = path.as_ref();
    if let Some(text) = cache().get(path) {
        return Ok(Arc::clone(text));
    }

    if !path.is_file() {
        return Err(Error::TemplateError(format!(
            "template '{}' does not exist",
            path.display()
        )));
    }

    debug!("Loading template from {}", path.display());
    let text: Arc<str> = std::fs::read_to_string(path)?.into();
    cache().insert(path.to_path_buf(), Arc::clone(&text));
    Ok(text)
}

/// Drops every cached template.
pub fn clear_template_cache() {
    cache().clear();
}

/// Whether `path` currently has a cached entry.
pub fn is_cached<P: AsRef<Path>>(path: P) -> bool {
    cache().contains_key(path.as_ref())
}
