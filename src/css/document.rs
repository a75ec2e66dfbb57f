// Dirty-tracked wrapper around a parsed rule tree.
//
// The tree is owned exclusively by the document and is only reachable
// through walkers that record whether anything changed, so no mutation
// path can leave the cached text stale without flipping the dirty flag.

use crate::css::parser::{self, AtRule, Declaration, Node, Root, Rule};
use crate::utils::Result;
use std::path::Path;

/// What to do with a visited at-rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtRuleAction {
    Keep,
    Remove,
}

pub struct Document {
    /// Last-known serialized form. Equal to serializing `root` whenever
    /// `dirty` is false.
    source: String,
    root: Root,
    dirty: bool,
}

impl Document {
    pub fn parse(source: &str, from: &Path) -> Result<Self> {
        let root = parser::parse(source, from)?;
        Ok(Self {
            source: source.to_string(),
            root,
            dirty: false,
        })
    }

    /// Current CSS text. Re-serializes the tree only when it was mutated
    /// since the last render, then clears the dirty flag.
    pub fn render(&mut self) -> &str {
        if self.dirty {
            let mut out = String::with_capacity(self.source.len());
            parser::stringify(&self.root, &mut |chunk| out.push_str(chunk));
            self.source = out;
            self.dirty = false;
        }
        &self.source
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Visit every at-rule named `name` in document order, removing the
    /// ones the visitor consumes. Sets the dirty flag iff a rule was
    /// removed. Short-circuits on the first visitor error.
    pub(crate) fn retain_at_rules<F>(&mut self, name: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&AtRule) -> Result<AtRuleAction>,
    {
        let mut removed = false;
        retain_at_rules_in(&mut self.root.nodes, name, &mut visit, &mut removed)?;
        if removed {
            self.dirty = true;
        }
        Ok(())
    }

    /// Visit every declaration in document order. The visitor returns
    /// whether it changed the declaration's value; the dirty flag is set
    /// iff any visit reported a change.
    pub(crate) fn update_decls<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut Declaration) -> bool,
    {
        let mut changed = false;
        update_decls_in(&mut self.root.nodes, &mut visit, &mut changed);
        if changed {
            self.dirty = true;
        }
    }

    /// Visit every style rule in document order. The visitor returns
    /// whether it changed the rule's selector; the dirty flag is set iff
    /// any visit reported a change.
    pub(crate) fn update_rules<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Rule) -> Result<bool>,
    {
        let mut changed = false;
        update_rules_in(&mut self.root.nodes, &mut visit, &mut changed)?;
        if changed {
            self.dirty = true;
        }
        Ok(())
    }
}

fn retain_at_rules_in<F>(
    nodes: &mut Vec<Node>,
    name: &str,
    visit: &mut F,
    removed: &mut bool,
) -> Result<()>
where
    F: FnMut(&AtRule) -> Result<AtRuleAction>,
{
    let mut index = 0;
    while index < nodes.len() {
        let action = match &nodes[index] {
            Node::AtRule(rule) if rule.name == name => visit(rule)?,
            _ => AtRuleAction::Keep,
        };
        if action == AtRuleAction::Remove {
            nodes.remove(index);
            *removed = true;
            continue;
        }

        match &mut nodes[index] {
            Node::AtRule(rule) => {
                if let Some(children) = &mut rule.nodes {
                    retain_at_rules_in(children, name, visit, removed)?;
                }
            }
            Node::Rule(rule) => {
                retain_at_rules_in(&mut rule.nodes, name, visit, removed)?;
            }
            Node::Decl(_) => {}
        }
        index += 1;
    }
    Ok(())
}

fn update_decls_in<F>(nodes: &mut [Node], visit: &mut F, changed: &mut bool)
where
    F: FnMut(&mut Declaration) -> bool,
{
    for node in nodes.iter_mut() {
        match node {
            Node::Decl(decl) => {
                if visit(decl) {
                    *changed = true;
                }
            }
            Node::Rule(rule) => update_decls_in(&mut rule.nodes, visit, changed),
            Node::AtRule(rule) => {
                if let Some(children) = &mut rule.nodes {
                    update_decls_in(children, visit, changed);
                }
            }
        }
    }
}

fn update_rules_in<F>(nodes: &mut [Node], visit: &mut F, changed: &mut bool) -> Result<()>
where
    F: FnMut(&mut Rule) -> Result<bool>,
{
    for node in nodes.iter_mut() {
        match node {
            Node::Rule(rule) => {
                if visit(rule)? {
                    *changed = true;
                }
                update_rules_in(&mut rule.nodes, visit, changed)?;
            }
            Node::AtRule(rule) => {
                if let Some(children) = &mut rule.nodes {
                    update_rules_in(children, visit, changed)?;
                }
            }
            Node::Decl(_) => {}
        }
    }
    Ok(())
}
