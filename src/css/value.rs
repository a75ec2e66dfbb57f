// Value-expression parser for declaration values and at-rule parameters.
// Splits raw text into a tree of typed nodes (strings, functions, words)
// that can be mutated and stringified back without losing surrounding
// whitespace.

/// One node of a parsed value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueNode {
    /// A run of non-separator characters, e.g. `screen` or `img/logo.png`.
    Word(String),
    /// A run of whitespace, preserved verbatim.
    Space(String),
    /// A separator such as `,`.
    Div(String),
    /// A quoted string; `value` is the text between the quotes.
    Str { quote: char, value: String },
    /// A function call, e.g. `url(...)` or a bare parenthesized group
    /// (in which case `name` is empty).
    Func { name: String, nodes: Vec<ValueNode> },
}

impl ValueNode {
    /// The literal text of a word or quoted string, if this node has one.
    pub fn literal(&self) -> Option<&str> {
        match self {
            ValueNode::Word(word) => Some(word),
            ValueNode::Str { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Replace the literal text of a word or quoted string. Returns false
    /// for node kinds without a literal.
    pub fn set_literal(&mut self, text: String) -> bool {
        match self {
            ValueNode::Word(word) => {
                *word = text;
                true
            }
            ValueNode::Str { value, .. } => {
                *value = text;
                true
            }
            _ => false,
        }
    }

    pub fn is_space(&self) -> bool {
        matches!(self, ValueNode::Space(_))
    }
}

/// Parse raw value text into a node tree.
pub fn parse(input: &str) -> Vec<ValueNode> {
    let mut scanner = Scanner {
        bytes: input.as_bytes(),
        input,
        pos: 0,
    };
    scanner.parse_nodes(false)
}

/// Stringify a node tree back into value text.
pub fn stringify(nodes: &[ValueNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

/// Stringify a token sequence with surrounding whitespace trimmed, the
/// form used for `@import` media qualifiers.
pub fn stringify_trimmed(nodes: &[ValueNode]) -> String {
    stringify(nodes).trim().to_string()
}

/// Depth-first walk over every node, parents before children.
pub fn walk_mut<F>(nodes: &mut [ValueNode], visit: &mut F)
where
    F: FnMut(&mut ValueNode),
{
    for node in nodes.iter_mut() {
        visit(node);
        if let ValueNode::Func { nodes, .. } = node {
            walk_mut(nodes, visit);
        }
    }
}

fn write_nodes(nodes: &[ValueNode], out: &mut String) {
    for node in nodes {
        match node {
            ValueNode::Word(word) => out.push_str(word),
            ValueNode::Space(space) => out.push_str(space),
            ValueNode::Div(div) => out.push_str(div),
            ValueNode::Str { quote, value } => {
                out.push(*quote);
                out.push_str(value);
                out.push(*quote);
            }
            ValueNode::Func { name, nodes } => {
                out.push_str(name);
                out.push('(');
                write_nodes(nodes, out);
                out.push(')');
            }
        }
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn parse_nodes(&mut self, in_function: bool) -> Vec<ValueNode> {
        let mut nodes = Vec::new();

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b')' if in_function => {
                    self.pos += 1;
                    return nodes;
                }
                c if c.is_ascii_whitespace() => {
                    let start = self.pos;
                    while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace()
                    {
                        self.pos += 1;
                    }
                    nodes.push(ValueNode::Space(self.input[start..self.pos].to_string()));
                }
                b',' => {
                    self.pos += 1;
                    nodes.push(ValueNode::Div(",".to_string()));
                }
                b'"' | b'\'' => {
                    nodes.push(self.parse_string());
                }
                b'(' => {
                    // Parenthesized group without a name, e.g. media features.
                    self.pos += 1;
                    let children = self.parse_nodes(true);
                    nodes.push(ValueNode::Func {
                        name: String::new(),
                        nodes: children,
                    });
                }
                b')' => {
                    // Stray close paren at the top level; keep it verbatim.
                    self.pos += 1;
                    nodes.push(ValueNode::Word(")".to_string()));
                }
                _ => {
                    let word = self.read_word();
                    if self.pos < self.bytes.len() && self.bytes[self.pos] == b'(' {
                        self.pos += 1;
                        let children = self.parse_nodes(true);
                        nodes.push(ValueNode::Func {
                            name: word,
                            nodes: children,
                        });
                    } else {
                        nodes.push(ValueNode::Word(word));
                    }
                }
            }
        }

        nodes
    }

    fn parse_string(&mut self) -> ValueNode {
        let quote = self.bytes[self.pos] as char;
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => {
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                c if c as char == quote => break,
                _ => self.pos += 1,
            }
        }
        let value = self.input[start..self.pos].to_string();
        if self.pos < self.bytes.len() {
            // closing quote
            self.pos += 1;
        }
        ValueNode::Str { quote, value }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'"' | b'\'' | b'(' | b')' | b',' => break,
                c if c.is_ascii_whitespace() => break,
                _ => self.pos += 1,
            }
        }
        self.input[start..self.pos].to_string()
    }
}
