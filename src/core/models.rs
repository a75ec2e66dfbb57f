use crate::utils::Logger;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Generic bundler-tracked source file: canonical path, raw contents and
/// the dependencies discovered so far. Type-specific handlers such as
/// [`crate::css::CssAsset`] hold one of these by composition.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: PathBuf,
    pub contents: String,
    pub dependencies: Vec<DependencyRecord>,
}

impl Asset {
    pub fn new(name: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
            dependencies: Vec::new(),
        }
    }

    /// Append a dependency record. Append-only, in discovery order; any
    /// deduplication is the resolver's concern.
    pub fn add_dependency(&mut self, specifier: impl Into<String>, meta: HashMap<String, String>) {
        let specifier = specifier.into();
        Logger::found_dependency(&specifier);
        self.dependencies.push(DependencyRecord { specifier, meta });
    }
}

/// A reference from one asset to another, with optional qualifying
/// metadata such as a media query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    pub specifier: String,
    pub meta: HashMap<String, String>,
}

impl DependencyRecord {
    pub fn media(&self) -> Option<&str> {
        self.meta.get("media").map(String::as_str)
    }
}

/// Final artifacts for one CSS asset: the CSS text and, when the asset
/// carries a CSS-module mapping, a JS module exporting it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Generated {
    pub css: String,
    pub js: String,
}
