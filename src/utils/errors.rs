use std::path::PathBuf;
use thiserror::Error;

/// Enhanced error with file location context
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub code_snippet: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_snippet(mut self, snippet: String) -> Self {
        self.code_snippet = Some(snippet);
        self
    }
}

#[derive(Error, Debug)]
pub enum CinderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        context: Option<ErrorContext>,
    },

    /// An `@import` rule whose parameter is neither a quoted string nor a
    /// `url(...)` call with an argument. Fatal for the asset.
    #[error("could not find import target for {rule}")]
    MalformedImportTarget { rule: String },

    #[error("transform step '{step}' failed: {message}")]
    Transform { step: String, message: String },

    #[error("CSS processing error: {0}")]
    CssProcessing(String),

    #[error("{0}")]
    Other(String),
}

impl CinderError {
    /// Create a simple parse error without context
    pub fn parse(message: String) -> Self {
        Self::Parse {
            message,
            context: None,
        }
    }

    /// Create a parse error with context
    pub fn parse_with_context(message: String, context: ErrorContext) -> Self {
        Self::Parse {
            message,
            context: Some(context),
        }
    }

    pub fn transform(step: &str, message: String) -> Self {
        Self::Transform {
            step: step.to_string(),
            message,
        }
    }

    /// Format error with enhanced context display
    pub fn format_detailed(&self) -> String {
        match self {
            CinderError::Parse { message, context } => {
                format_error_with_context("Parse Error", message, context)
            }
            _ => self.to_string(),
        }
    }
}

fn format_error_with_context(
    error_type: &str,
    message: &str,
    context: &Option<ErrorContext>,
) -> String {
    let mut output = format!("❌ {}: {}", error_type, message);

    if let Some(ctx) = context {
        if let Some(ref file_path) = ctx.file_path {
            output.push_str(&format!("\n📁 File: {}", file_path.display()));
        }

        if let (Some(line), Some(column)) = (ctx.line, ctx.column) {
            output.push_str(&format!("\n📍 Location: line {}, column {}", line, column));
        }

        if let Some(ref snippet) = ctx.code_snippet {
            output.push_str(&format!("\n📝 Code: {}", snippet));
        }
    }

    output
}

pub type Result<T> = std::result::Result<T, CinderError>;

impl From<regex::Error> for CinderError {
    fn from(err: regex::Error) -> Self {
        CinderError::parse(format!("Regex error: {}", err))
    }
}

impl From<serde_json::Error> for CinderError {
    fn from(err: serde_json::Error) -> Self {
        CinderError::Other(format!("Serialization error: {}", err))
    }
}

impl From<anyhow::Error> for CinderError {
    fn from(err: anyhow::Error) -> Self {
        CinderError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_import_message_includes_rule() {
        let err = CinderError::MalformedImportTarget {
            rule: "@import calc(1+1)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not find import target for @import calc(1+1)"
        );
    }

    #[test]
    fn test_detailed_format_carries_location() {
        let ctx = ErrorContext::new()
            .with_file(PathBuf::from("a.css"))
            .with_location(3, 7)
            .with_snippet(".broken {".to_string());
        let err = CinderError::parse_with_context("unclosed block".to_string(), ctx);
        let detailed = err.format_detailed();
        assert!(detailed.contains("a.css"));
        assert!(detailed.contains("line 3, column 7"));
        assert!(detailed.contains(".broken {"));
    }
}
