// CSS asset handler: dependency discovery and reference rewriting.
//
// Lifecycle per asset: pre-check -> parse -> extract imports -> extract
// url() references -> transform pipeline -> generate. Extraction is
// synchronous; only the pipeline run awaits.

use crate::core::models::{Asset, DependencyRecord, Generated};
use crate::core::transform::TransformPipeline;
use crate::css::document::{AtRuleAction, Document};
use crate::css::value::{self, ValueNode};
use crate::utils::{content_address, CinderError, Logger, Result, Timer};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

// Pre-compiled patterns for the dependency pre-check
static IMPORT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"@import").unwrap());
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"url\s*\(\s*['"]?"#).unwrap());
static PROTOCOL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+:").unwrap());

/// True if the text contains a `url(` whose argument does not start with
/// a protocol scheme. The regex crate has no lookahead, so the protocol
/// test runs against the text after each match.
fn has_local_url(text: &str) -> bool {
    URL_PATTERN
        .find_iter(text)
        .any(|m| !PROTOCOL_PATTERN.is_match(&text[m.end()..]))
}

/// The CSS-specific extension of a generic [`Asset`]: a dirty-tracked
/// document and an optional CSS-module export mapping.
pub struct CssAsset {
    asset: Asset,
    document: Option<Document>,
    css_modules: Option<IndexMap<String, String>>,
}

impl CssAsset {
    pub fn new(name: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            asset: Asset::new(name, contents),
            document: None,
            css_modules: None,
        }
    }

    /// Read an asset from disk.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(Self::new(path, contents))
    }

    pub fn name(&self) -> &Path {
        &self.asset.name
    }

    pub fn contents(&self) -> &str {
        &self.asset.contents
    }

    pub fn dependencies(&self) -> &[DependencyRecord] {
        &self.asset.dependencies
    }

    pub fn css_modules(&self) -> Option<&IndexMap<String, String>> {
        self.css_modules.as_ref()
    }

    /// Attach the CSS-module export mapping, normally done by a scoping
    /// transform.
    pub fn set_css_modules(&mut self, mapping: IndexMap<String, String>) {
        self.css_modules = Some(mapping);
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    /// Swap in a freshly parsed document, e.g. after a transform
    /// re-generated the text wholesale.
    pub fn replace_document(&mut self, document: Document) {
        self.document = Some(document);
    }

    /// Cheap textual gate: worth parsing and walking the tree at all?
    /// False positives are harmless; false negatives only occur when no
    /// import/url syntax is textually present.
    pub fn might_have_dependencies(&self) -> bool {
        IMPORT_PATTERN.is_match(&self.asset.contents) || has_local_url(&self.asset.contents)
    }

    /// Parse the raw contents into a document. Idempotent, so transform
    /// steps can call it on assets the pre-check skipped.
    pub fn parse(&mut self) -> Result<()> {
        if self.document.is_none() {
            self.document = Some(Document::parse(&self.asset.contents, &self.asset.name)?);
        }
        Ok(())
    }

    /// Run the import pass, then the url() pass. Requires `parse`.
    pub fn collect_dependencies(&mut self) -> Result<()> {
        self.extract_imports()?;
        self.extract_url_references()?;
        Ok(())
    }

    /// Hand the asset to the external transform pipeline. This is the
    /// sole suspension point of the lifecycle.
    pub async fn transform(&mut self, pipeline: &TransformPipeline) -> Result<()> {
        pipeline.run(self).await
    }

    /// Final artifacts: the document's current render (or the untouched
    /// raw contents when nothing required parsing), plus a JS module
    /// exporting the CSS-module mapping when one exists.
    pub fn generate(&mut self) -> Result<Generated> {
        let css = match self.document.as_mut() {
            Some(document) => document.render().to_string(),
            None => self.asset.contents.clone(),
        };

        let js = match &self.css_modules {
            Some(mapping) => format!(
                "module.exports = {};",
                serde_json::to_string_pretty(mapping)?
            ),
            None => String::new(),
        };

        Ok(Generated { css, js })
    }

    /// Full lifecycle for one asset.
    pub async fn process(&mut self, pipeline: &TransformPipeline) -> Result<Generated> {
        let name = self.asset.name.display().to_string();
        let timer = Timer::start(&format!("Processing {}", name));
        Logger::processing_css(&name);

        if self.might_have_dependencies() {
            self.parse()?;
            self.collect_dependencies()?;
        } else {
            Logger::skipped_precheck(&name);
        }

        self.transform(pipeline).await?;

        let generated = self.generate()?;
        Logger::asset_complete(&name, self.asset.dependencies.len(), timer.elapsed());
        Ok(generated)
    }

    /// Walk every `@import` rule: register a dependency with its media
    /// qualifier and drop the rule from the tree. Protocol-qualified
    /// targets stay in place verbatim. A target that is neither a quoted
    /// string nor a `url(...)` call aborts the whole pass.
    fn extract_imports(&mut self) -> Result<()> {
        let document = match self.document.as_mut() {
            Some(document) => document,
            None => return Ok(()),
        };

        let mut found: Vec<(String, String)> = Vec::new();
        document.retain_at_rules("import", |rule| {
            let nodes = value::parse(&rule.params);
            let target_index = nodes.iter().position(|node| !node.is_space());

            let specifier = target_index.and_then(|index| match &nodes[index] {
                ValueNode::Str { value, .. } => Some(value.clone()),
                ValueNode::Func { name, nodes } if name == "url" => nodes
                    .iter()
                    .find(|node| !node.is_space())
                    .and_then(|node| node.literal())
                    .map(str::to_string),
                _ => None,
            });

            let specifier = match specifier {
                Some(specifier) if !specifier.is_empty() => specifier,
                _ => {
                    return Err(CinderError::MalformedImportTarget {
                        rule: format!("@{} {}", rule.name, rule.params),
                    })
                }
            };

            // External reference (e.g. a CDN url): leave the rule alone.
            if PROTOCOL_PATTERN.is_match(&specifier) {
                return Ok(AtRuleAction::Keep);
            }

            let media = match target_index {
                Some(index) => value::stringify_trimmed(&nodes[index + 1..]),
                None => String::new(),
            };
            found.push((specifier, media));
            Ok(AtRuleAction::Remove)
        })?;

        for (specifier, media) in found {
            self.asset
                .add_dependency(specifier, HashMap::from([("media".to_string(), media)]));
        }
        Ok(())
    }

    /// Walk every declaration value: register a dependency for each local
    /// `url(...)` target and rewrite the reference to the content address
    /// of its resolved path, keeping the original extension.
    fn extract_url_references(&mut self) -> Result<()> {
        let dir = self
            .asset
            .name
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let document = match self.document.as_mut() {
            Some(document) => document,
            None => return Ok(()),
        };

        let mut found: Vec<String> = Vec::new();
        document.update_decls(|decl| {
            if !has_local_url(&decl.value) {
                return false;
            }

            let mut nodes = value::parse(&decl.value);
            let mut changed = false;
            value::walk_mut(&mut nodes, &mut |node| {
                if let ValueNode::Func { name, nodes } = node {
                    if name != "url" {
                        return;
                    }
                    let arg = match nodes.iter_mut().find(|node| !node.is_space()) {
                        Some(arg) => arg,
                        None => return,
                    };
                    let filename = match arg.literal() {
                        Some(filename) => filename.to_string(),
                        None => return,
                    };
                    if filename.is_empty() || PROTOCOL_PATTERN.is_match(&filename) {
                        return;
                    }

                    let resolved = resolve_from(&dir, &filename);
                    let rewritten =
                        format!("{}{}", content_address(&resolved), extname(&filename));
                    Logger::rewrote_url(&filename, &rewritten);
                    arg.set_literal(rewritten);
                    found.push(filename);
                    changed = true;
                }
            });

            if changed {
                decl.value = value::stringify(&nodes);
            }
            changed
        });

        for specifier in found {
            self.asset.add_dependency(specifier, HashMap::new());
        }
        Ok(())
    }
}

/// Resolve a reference against a directory, folding `.` and `..`
/// lexically like the original bundler's path resolution.
fn resolve_from(dir: &Path, filename: &str) -> PathBuf {
    let reference = Path::new(filename);
    let joined = if reference.is_absolute() {
        reference.to_path_buf()
    } else {
        dir.join(reference)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// Extension of a reference including the dot, like Node's
/// `path.extname`: `img/logo.png` -> `.png`, `.hidden` -> ``.
fn extname(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(index) if index > 0 => &base[index..],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collected(name: &str, contents: &str) -> CssAsset {
        let mut asset = CssAsset::new(name, contents);
        asset.parse().unwrap();
        asset.collect_dependencies().unwrap();
        asset
    }

    #[test]
    fn test_precheck_detects_import() {
        let asset = CssAsset::new("/site/a.css", "@import \"foo.css\";");
        assert!(asset.might_have_dependencies());
    }

    #[test]
    fn test_precheck_detects_local_url() {
        let asset = CssAsset::new("/site/a.css", ".a{background:url(img/x.png)}");
        assert!(asset.might_have_dependencies());
    }

    #[test]
    fn test_precheck_ignores_protocol_url() {
        let asset = CssAsset::new("/site/a.css", ".a{background:url(https://cdn/x.png)}");
        assert!(!asset.might_have_dependencies());
    }

    #[test]
    fn test_precheck_plain_css() {
        let asset = CssAsset::new("/site/a.css", ".c{color:blue}");
        assert!(!asset.might_have_dependencies());
    }

    #[test]
    fn test_import_extraction_registers_and_removes() {
        let mut asset = collected("/site/a.css", "@import \"foo.css\" screen;\n.a{color:red}");
        assert_eq!(asset.dependencies().len(), 1);
        assert_eq!(asset.dependencies()[0].specifier, "foo.css");
        assert_eq!(asset.dependencies()[0].media(), Some("screen"));

        let output = asset.generate().unwrap();
        assert!(!output.css.contains("@import"));
        assert!(output.css.contains(".a{color:red}"));
    }

    #[test]
    fn test_import_without_media_gets_empty_qualifier() {
        let asset = collected("/site/a.css", "@import \"foo.css\";");
        assert_eq!(asset.dependencies()[0].media(), Some(""));
    }

    #[test]
    fn test_url_form_import() {
        let asset = collected("/site/a.css", "@import url(\"foo.css\") print;");
        assert_eq!(asset.dependencies()[0].specifier, "foo.css");
        assert_eq!(asset.dependencies()[0].media(), Some("print"));
    }

    #[test]
    fn test_protocol_import_left_verbatim() {
        let input = "@import url(https://cdn.example.com/x.css);\n.a{color:red}";
        let mut asset = collected("/site/a.css", input);
        assert!(asset.dependencies().is_empty());
        assert_eq!(asset.generate().unwrap().css, input);
    }

    #[test]
    fn test_malformed_import_aborts_with_zero_dependencies() {
        let mut asset = CssAsset::new("/site/a.css", "@import calc(1+1);");
        asset.parse().unwrap();
        let err = asset.collect_dependencies().unwrap_err();
        assert!(
            matches!(err, CinderError::MalformedImportTarget { ref rule } if rule.contains("calc(1+1)"))
        );
        assert!(asset.dependencies().is_empty());
    }

    #[test]
    fn test_empty_import_target_is_malformed() {
        let mut asset = CssAsset::new("/site/a.css", "@import \"\";");
        asset.parse().unwrap();
        assert!(matches!(
            asset.collect_dependencies().unwrap_err(),
            CinderError::MalformedImportTarget { .. }
        ));
    }

    #[test]
    fn test_url_rewrite_is_content_addressed() {
        let mut asset = collected("/site/style.css", ".b{background:url(img/logo.png)}");
        assert_eq!(asset.dependencies().len(), 1);
        assert_eq!(asset.dependencies()[0].specifier, "img/logo.png");

        let expected = format!(
            "{}.png",
            content_address(Path::new("/site/img/logo.png"))
        );
        let output = asset.generate().unwrap();
        assert_eq!(output.css, format!(".b{{background:url({})}}", expected));
    }

    #[test]
    fn test_url_rewrite_is_deterministic_across_runs() {
        let input = ".b{background:url(img/logo.png)}";
        let mut first = collected("/site/style.css", input);
        let mut second = collected("/site/style.css", input);
        assert_eq!(
            first.generate().unwrap().css,
            second.generate().unwrap().css
        );
    }

    #[test]
    fn test_different_relative_spellings_collapse_to_one_name() {
        let mut plain = collected("/site/style.css", ".b{background:url(img/logo.png)}");
        let mut dotted = collected("/site/style.css", ".b{background:url(./img/logo.png)}");
        assert_eq!(
            plain.generate().unwrap().css,
            dotted.generate().unwrap().css
        );
    }

    #[test]
    fn test_nested_image_set_urls_rewritten() {
        let asset = collected(
            "/site/style.css",
            ".b{background:image-set(url(a.png) 1x, url(b.png) 2x)}",
        );
        let specifiers: Vec<_> = asset
            .dependencies()
            .iter()
            .map(|dep| dep.specifier.as_str())
            .collect();
        assert_eq!(specifiers, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_empty_and_protocol_urls_untouched() {
        let input = ".a{background:url() url(https://cdn/x.png) url(local.png)}";
        let mut asset = collected("/site/style.css", input);
        assert_eq!(asset.dependencies().len(), 1);
        assert_eq!(asset.dependencies()[0].specifier, "local.png");

        let output = asset.generate().unwrap();
        assert!(output.css.contains("url()"));
        assert!(output.css.contains("url(https://cdn/x.png)"));
        assert!(!output.css.contains("url(local.png)"));
    }

    #[test]
    fn test_non_literal_url_argument_skipped() {
        let input = ".a{background:url(var(--asset))}";
        let mut asset = collected("/site/style.css", input);
        assert!(asset.dependencies().is_empty());
        assert_eq!(asset.generate().unwrap().css, input);
    }

    #[test]
    fn test_generate_without_parse_returns_raw_contents() {
        let mut asset = CssAsset::new("/site/a.css", ".c{color:blue}");
        let output = asset.generate().unwrap();
        assert_eq!(output.css, ".c{color:blue}");
        assert!(output.js.is_empty());
    }

    #[test]
    fn test_resolve_from_folds_dots() {
        assert_eq!(
            resolve_from(Path::new("/site/css"), "../img/logo.png"),
            PathBuf::from("/site/img/logo.png")
        );
        assert_eq!(
            resolve_from(Path::new("/site"), "./img/logo.png"),
            PathBuf::from("/site/img/logo.png")
        );
        assert_eq!(
            resolve_from(Path::new("/site"), "/abs/x.png"),
            PathBuf::from("/abs/x.png")
        );
    }

    #[test]
    fn test_extname_matches_node_semantics() {
        assert_eq!(extname("img/logo.png"), ".png");
        assert_eq!(extname("logo.min.css"), ".css");
        assert_eq!(extname(".hidden"), "");
        assert_eq!(extname("noext"), "");
        assert_eq!(extname("dir.v2/noext"), "");
    }
}
