// Minification transform backed by Lightning CSS. Renders the current
// document, minifies the text, and swaps in a freshly parsed (pristine)
// document.

use crate::core::transform::Transform;
use crate::css::{CssAsset, Document};
use crate::utils::{CinderError, Result};
use async_trait::async_trait;
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{ParserOptions as CssParserOptions, StyleSheet},
};

pub struct MinifyTransform;

impl MinifyTransform {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MinifyTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transform for MinifyTransform {
    fn name(&self) -> &str {
        "minify"
    }

    async fn transform(&self, asset: &mut CssAsset) -> Result<()> {
        asset.parse()?;
        let code = match asset.document_mut() {
            Some(document) => document.render().to_string(),
            None => return Ok(()),
        };

        let minified = match StyleSheet::parse(&code, CssParserOptions::default()) {
            Ok(stylesheet) => {
                match stylesheet.to_css(PrinterOptions {
                    minify: true,
                    ..Default::default()
                }) {
                    Ok(result) => result.code,
                    Err(_) => {
                        return Err(CinderError::CssProcessing(format!(
                            "failed to print minified CSS for {}",
                            asset.name().display()
                        )))
                    }
                }
            }
            Err(_) => {
                return Err(CinderError::CssProcessing(format!(
                    "minifier could not parse {}",
                    asset.name().display()
                )))
            }
        };

        let name = asset.name().to_path_buf();
        asset.replace_document(Document::parse(&minified, &name)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_minifies_rendered_document() {
        let css = ".a {\n  color: red;\n  margin: 0 auto;\n}\n";
        let mut asset = CssAsset::new("/site/style.css", css);
        MinifyTransform::new().transform(&mut asset).await.unwrap();

        let output = asset.generate().unwrap();
        assert!(!output.css.contains('\n'));
        assert!(output.css.contains(".a"));
        assert!(output.css.len() < css.len());
    }

    #[tokio::test]
    async fn test_minified_document_is_pristine() {
        let mut asset = CssAsset::new("/site/style.css", ".a { color: red; }");
        MinifyTransform::default().transform(&mut asset).await.unwrap();
        assert!(!asset.document_mut().unwrap().is_dirty());
    }
}
