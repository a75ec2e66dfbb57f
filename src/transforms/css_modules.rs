// CSS Modules scoping transform.
// Rewrites class selectors of *.module.css assets to unique names and
// attaches the local -> scoped mapping the output generator exports.

use crate::core::transform::Transform;
use crate::css::CssAsset;
use crate::utils::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// Match class selectors like .myClass, .my-class, .myClass:hover
static CLASS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([a-zA-Z_][a-zA-Z0-9_-]*)").unwrap());

pub struct CssModulesTransform;

impl CssModulesTransform {
    pub fn new() -> Self {
        Self
    }

    /// Check if a file should be processed as a CSS module
    pub fn is_css_module(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(".module.css"))
            .unwrap_or(false)
    }

    /// Generate module name from file path
    fn module_name(path: &Path) -> String {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_end_matches(".module").replace(['-', '.'], "_"))
            .unwrap_or_else(|| "Module".to_string())
    }
}

impl Default for CssModulesTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transform for CssModulesTransform {
    fn name(&self) -> &str {
        "css-modules"
    }

    async fn transform(&self, asset: &mut CssAsset) -> Result<()> {
        if !Self::is_css_module(asset.name()) {
            return Ok(());
        }

        let module_name = Self::module_name(asset.name());
        let digest = blake3::hash(asset.contents().as_bytes()).to_hex();
        let hash = &digest.as_str()[..6];

        asset.parse()?;
        let document = match asset.document_mut() {
            Some(document) => document,
            None => return Ok(()),
        };

        // First pass: collect class names in document order.
        let mut exports: IndexMap<String, String> = IndexMap::new();
        document.update_rules(|rule| {
            for capture in CLASS_PATTERN.captures_iter(&rule.selector) {
                if let Some(class_name) = capture.get(1) {
                    let class_name = class_name.as_str().to_string();
                    let scoped = format!("{}_{}_{}", module_name, class_name, hash);
                    exports.entry(class_name).or_insert(scoped);
                }
            }
            Ok(false)
        })?;

        // Second pass: rewrite selectors. The captured tail keeps partial
        // matches like .card in .card-title intact.
        let mut replacements = Vec::with_capacity(exports.len());
        for (class_name, scoped) in &exports {
            let pattern = Regex::new(&format!(r"\.{}([^\w-]|$)", regex::escape(class_name)))?;
            replacements.push((pattern, format!(".{}${{1}}", scoped)));
        }
        document.update_rules(|rule| {
            let mut changed = false;
            for (pattern, scoped) in &replacements {
                if pattern.is_match(&rule.selector) {
                    rule.selector = pattern
                        .replace_all(&rule.selector, scoped.as_str())
                        .to_string();
                    changed = true;
                }
            }
            Ok(changed)
        })?;

        if !exports.is_empty() {
            asset.set_css_modules(exports);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_css_module() {
        assert!(CssModulesTransform::is_css_module(&PathBuf::from(
            "Button.module.css"
        )));
        assert!(CssModulesTransform::is_css_module(&PathBuf::from(
            "components/Card.module.css"
        )));
        assert!(!CssModulesTransform::is_css_module(&PathBuf::from(
            "styles.css"
        )));
    }

    #[tokio::test]
    async fn test_scopes_classes_and_sets_mapping() {
        let mut asset = CssAsset::new("/app/Button.module.css", ".button { color: blue; }");
        CssModulesTransform::new()
            .transform(&mut asset)
            .await
            .unwrap();

        let exports = asset.css_modules().expect("mapping");
        assert_eq!(exports.len(), 1);
        let scoped = exports.get("button").expect("button entry").clone();
        assert!(scoped.starts_with("Button_button_"));

        let output = asset.generate().unwrap();
        assert!(output.css.contains(&scoped));
        assert!(!output.css.contains(".button "));
        assert!(output.js.starts_with("module.exports = {"));
    }

    #[tokio::test]
    async fn test_pseudo_selectors_all_rewritten() {
        let css = ".button { color: blue; }\n.button:hover { color: red; }";
        let mut asset = CssAsset::new("/app/Button.module.css", css);
        CssModulesTransform::new()
            .transform(&mut asset)
            .await
            .unwrap();

        let output = asset.generate().unwrap();
        assert_eq!(output.css.matches("Button_button_").count(), 2);
    }

    #[tokio::test]
    async fn test_partial_class_names_untouched() {
        let css = ".card { padding: 0; }\n.card-title { font-size: 20px; }";
        let mut asset = CssAsset::new("/app/Card.module.css", css);
        CssModulesTransform::new()
            .transform(&mut asset)
            .await
            .unwrap();

        let exports = asset.css_modules().expect("mapping");
        assert_eq!(exports.len(), 2);
        let card = exports.get("card").unwrap().clone();
        let title = exports.get("card-title").unwrap().clone();
        let output = asset.generate().unwrap();
        assert!(output.css.contains(&format!(".{} ", card)));
        assert!(output.css.contains(&format!(".{} ", title)));
    }

    #[tokio::test]
    async fn test_compound_selector_scopes_both_classes() {
        let css = ".card.selected { color: red; }";
        let mut asset = CssAsset::new("/app/Card.module.css", css);
        CssModulesTransform::new()
            .transform(&mut asset)
            .await
            .unwrap();

        let exports = asset.css_modules().expect("mapping");
        assert_eq!(exports.len(), 2);
        let card = exports.get("card").unwrap().clone();
        let selected = exports.get("selected").unwrap().clone();

        let output = asset.generate().unwrap();
        assert!(output.css.contains(&format!(".{}.{}", card, selected)));
    }

    #[tokio::test]
    async fn test_plain_css_left_alone() {
        let mut asset = CssAsset::new("/app/styles.css", ".button { color: blue; }");
        CssModulesTransform::new()
            .transform(&mut asset)
            .await
            .unwrap();
        assert!(asset.css_modules().is_none());
        assert_eq!(asset.generate().unwrap().css, ".button { color: blue; }");
    }
}
