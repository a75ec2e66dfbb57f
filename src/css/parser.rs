// Structural CSS parser and serializer.
//
// Produces a rule/declaration tree that keeps every run of whitespace and
// comments as raw text on the surrounding nodes, so an unmodified tree
// serializes back to the exact input. The serializer emits through a sink
// callback; callers concatenate the chunks.

use crate::utils::{CinderError, ErrorContext, Result};
use std::path::Path;

/// Root of a parsed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Root {
    pub nodes: Vec<Node>,
    /// Whitespace and comments after the last node.
    pub trailing: String,
}

#[derive(Debug, Clone)]
pub enum Node {
    AtRule(AtRule),
    Rule(Rule),
    Decl(Declaration),
}

/// An at-rule such as `@import "a.css";` or `@media screen { ... }`.
#[derive(Debug, Clone)]
pub struct AtRule {
    pub name: String,
    /// Parameter text, trailing whitespace trimmed.
    pub params: String,
    /// Block children; `None` for blockless rules like `@import`.
    pub nodes: Option<Vec<Node>>,
    /// Raw text (whitespace, comments) preceding the rule.
    pub before: String,
    /// Raw text between the name and the params.
    pub after_name: String,
    /// Raw text between the params and the `{` or `;`.
    pub between: String,
    /// Raw text inside the block before the `}`; empty when blockless.
    pub after: String,
    /// Whether a trailing `;` was present (blockless rules only).
    pub semicolon: bool,
}

/// A style rule: selector plus declaration block.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
    pub before: String,
    /// Raw text between the selector and the `{`.
    pub between: String,
    /// Raw text inside the block before the `}`.
    pub after: String,
}

/// A property/value declaration. An all-empty declaration with
/// `semicolon == true` stands for a stray `;`.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub before: String,
    /// Raw text from the end of the property through the start of the
    /// value, including the `:`.
    pub between: String,
    /// Raw text after the value, before the `;` or `}`.
    pub after: String,
    pub semicolon: bool,
}

/// Parse source text into a rule tree. `from` is the source name used in
/// error diagnostics.
pub fn parse(input: &str, from: &Path) -> Result<Root> {
    let mut parser = Parser {
        input,
        bytes: input.as_bytes(),
        pos: 0,
        from,
    };
    let (nodes, trailing) = parser.parse_nodes(false)?;
    Ok(Root { nodes, trailing })
}

/// Serialize a rule tree, feeding text chunks to `sink`.
pub fn stringify<F>(root: &Root, sink: &mut F)
where
    F: FnMut(&str),
{
    for node in &root.nodes {
        stringify_node(node, sink);
    }
    sink(&root.trailing);
}

fn stringify_node<F>(node: &Node, sink: &mut F)
where
    F: FnMut(&str),
{
    match node {
        Node::AtRule(rule) => {
            sink(&rule.before);
            sink("@");
            sink(&rule.name);
            sink(&rule.after_name);
            sink(&rule.params);
            sink(&rule.between);
            if let Some(children) = &rule.nodes {
                sink("{");
                for child in children {
                    stringify_node(child, sink);
                }
                sink(&rule.after);
                sink("}");
            } else if rule.semicolon {
                sink(";");
            }
        }
        Node::Rule(rule) => {
            sink(&rule.before);
            sink(&rule.selector);
            sink(&rule.between);
            sink("{");
            for child in &rule.nodes {
                stringify_node(child, sink);
            }
            sink(&rule.after);
            sink("}");
        }
        Node::Decl(decl) => {
            sink(&decl.before);
            sink(&decl.prop);
            sink(&decl.between);
            sink(&decl.value);
            sink(&decl.after);
            if decl.semicolon {
                sink(";");
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    from: &'a Path,
}

impl<'a> Parser<'a> {
    /// Parse a node list. Returns the nodes plus the raw text pending
    /// after the last node (the container's `after`, or the root's
    /// trailing text). Inside a block, stops at the closing `}` without
    /// consuming it.
    fn parse_nodes(&mut self, inside_block: bool) -> Result<(Vec<Node>, String)> {
        let mut nodes = Vec::new();

        loop {
            let before = self.skip_ws_and_comments()?;

            match self.peek() {
                None => {
                    if inside_block {
                        return Err(self.error("unclosed block", self.pos));
                    }
                    return Ok((nodes, before));
                }
                Some(b'}') => {
                    if inside_block {
                        return Ok((nodes, before));
                    }
                    return Err(self.error("unexpected '}'", self.pos));
                }
                Some(b'@') => {
                    nodes.push(Node::AtRule(self.parse_at_rule(before)?));
                }
                _ => {
                    nodes.push(self.parse_rule_or_decl(before)?);
                }
            }
        }
    }

    fn parse_at_rule(&mut self, before: String) -> Result<AtRule> {
        self.pos += 1; // '@'
        let name_start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'-' || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name = self.input[name_start..self.pos].to_string();
        let after_name = self.skip_ws_and_comments()?;

        let seg_start = self.pos;
        let terminator = self.scan_segment()?;
        let raw = &self.input[seg_start..self.pos];
        let params = raw.trim_end().to_string();
        let between = raw[params.len()..].to_string();

        match terminator {
            Some(b'{') => {
                self.pos += 1;
                let (children, after) = self.parse_nodes(true)?;
                self.pos += 1; // '}'
                Ok(AtRule {
                    name,
                    params,
                    nodes: Some(children),
                    before,
                    after_name,
                    between,
                    after,
                    semicolon: false,
                })
            }
            Some(b';') => {
                self.pos += 1;
                Ok(AtRule {
                    name,
                    params,
                    nodes: None,
                    before,
                    after_name,
                    between,
                    after: String::new(),
                    semicolon: true,
                })
            }
            _ => Ok(AtRule {
                name,
                params,
                nodes: None,
                before,
                after_name,
                between,
                after: String::new(),
                semicolon: false,
            }),
        }
    }

    fn parse_rule_or_decl(&mut self, before: String) -> Result<Node> {
        let seg_start = self.pos;
        let terminator = self.scan_segment()?;
        let content = &self.input[seg_start..self.pos];

        if terminator == Some(b'{') {
            let selector = content.trim_end().to_string();
            let between = content[selector.len()..].to_string();
            self.pos += 1;
            let (children, after) = self.parse_nodes(true)?;
            self.pos += 1; // '}'
            return Ok(Node::Rule(Rule {
                selector,
                nodes: children,
                before,
                between,
                after,
            }));
        }

        // Stray semicolon: keep it as an empty declaration so it
        // round-trips.
        if content.trim().is_empty() {
            self.pos += 1; // ';'
            return Ok(Node::Decl(Declaration {
                prop: String::new(),
                value: String::new(),
                before,
                between: String::new(),
                after: String::new(),
                semicolon: true,
            }));
        }

        let colon = find_colon(content)
            .ok_or_else(|| self.error("missing ':' in declaration", seg_start))?;

        let prop_raw = &content[..colon];
        let prop = prop_raw.trim_end().to_string();
        let value_raw = &content[colon + 1..];
        let value_trimmed_start = value_raw.trim_start();
        let leading = &value_raw[..value_raw.len() - value_trimmed_start.len()];
        let value = value_trimmed_start.trim_end().to_string();
        let after = value_trimmed_start[value.len()..].to_string();
        let between = format!("{}:{}", &prop_raw[prop.len()..], leading);

        let semicolon = terminator == Some(b';');
        if semicolon {
            self.pos += 1;
        }

        Ok(Node::Decl(Declaration {
            prop,
            value,
            before,
            between,
            after,
            semicolon,
        }))
    }

    /// Advance past a segment, stopping at the first `{`, `;` or `}` that
    /// is outside quotes, comments and parentheses. Returns the
    /// terminating byte, or `None` at end of input. `self.pos` is left on
    /// the terminator.
    fn scan_segment(&mut self) -> Result<Option<u8>> {
        let mut paren_depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'"' | b'\'' => self.skip_string(),
                b'/' if self.starts_with("/*") => self.skip_comment()?,
                b'(' => {
                    paren_depth += 1;
                    self.pos += 1;
                }
                b')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'{' | b';' | b'}' if paren_depth == 0 => return Ok(Some(c)),
                _ => self.pos += 1,
            }
        }
        Ok(None)
    }

    fn skip_string(&mut self) {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        while let Some(c) = self.peek() {
            match c {
                b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
                _ if c == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start = self.pos;
        match self.input[self.pos..].find("*/") {
            Some(offset) => {
                self.pos += offset + 2;
                Ok(())
            }
            None => Err(self.error("unclosed comment", start)),
        }
    }

    /// Skip whitespace and comments, returning the skipped raw text.
    fn skip_ws_and_comments(&mut self) -> Result<String> {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.starts_with("/*") => self.skip_comment()?,
                _ => break,
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    fn error(&self, message: &str, pos: usize) -> CinderError {
        let (line, column) = position(self.input, pos);
        let mut context = ErrorContext::new()
            .with_file(self.from.to_path_buf())
            .with_location(line, column);
        if let Some(snippet) = self.input.lines().nth(line - 1) {
            context = context.with_snippet(snippet.to_string());
        }
        CinderError::parse_with_context(message.to_string(), context)
    }
}

/// First `:` outside quotes, comments and parentheses.
fn find_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut pos = 0usize;
    let mut paren_depth = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' | b'\'' => {
                let quote = bytes[pos];
                pos += 1;
                while pos < bytes.len() {
                    match bytes[pos] {
                        b'\\' => pos = (pos + 2).min(bytes.len()),
                        c if c == quote => {
                            pos += 1;
                            break;
                        }
                        _ => pos += 1,
                    }
                }
            }
            b'/' if content[pos..].starts_with("/*") => match content[pos..].find("*/") {
                Some(offset) => pos += offset + 2,
                None => return None,
            },
            b'(' => {
                paren_depth += 1;
                pos += 1;
            }
            b')' => {
                paren_depth = paren_depth.saturating_sub(1);
                pos += 1;
            }
            b':' if paren_depth == 0 => return Some(pos),
            _ => pos += 1,
        }
    }
    None
}

/// 1-based line and column of a byte offset.
fn position(input: &str, pos: usize) -> (usize, usize) {
    let prefix = &input[..pos.min(input.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = pos - prefix.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    (line, column)
}
