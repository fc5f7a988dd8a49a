//! Predicate expressions, entries, and constraint lists.
//!
//! A predicate value is one opaque string slot interpreted at four detail
//! levels by convention: absent (name-only), a scope annotation, prose, or
//! an executable boolean expression. The level is never a structural field;
//! [`DetailLevel::classify`] is a heuristic for tooling ergonomics only and
//! must not influence validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ident::KebabIdent;

/// The detail level of a predicate expression, as guessed by the classifier.
///
/// Level 1 (name-only) has no expression at all and is represented by the
/// entry shape ([`PredicateEntry::Reference`]), not by a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailLevel {
    /// A bare namespace path or list of paths, e.g. `dm.ctx` or `[om.state, dm.cmd]`.
    Scope,
    /// A free natural-language sentence.
    Prose,
    /// A boolean expression over the decision/outcome/reaction namespaces.
    Expression,
}

/// A predicate expression: a non-empty opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateExpression(String);

impl PredicateExpression {
    /// Wrap a raw expression string. Returns `None` for empty (or
    /// whitespace-only) text, which the format does not allow.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Heuristically classify the detail level of this expression.
    ///
    /// Scope if the text is a namespace path (or bracketed list of paths);
    /// prose if it contains no dots and no operators; expression otherwise.
    pub fn classify(&self) -> DetailLevel {
        let text = self.0.trim();
        if is_scope_annotation(text) {
            return DetailLevel::Scope;
        }
        if !text.contains('.') && !contains_operator(text) {
            return DetailLevel::Prose;
        }
        DetailLevel::Expression
    }
}

impl fmt::Display for PredicateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn contains_operator(text: &str) -> bool {
    const OPERATORS: [&str; 10] = ["==", "!=", "&&", "||", "<", ">", "(", ")", "+", "!"];
    OPERATORS.iter().any(|op| text.contains(op))
}

/// `ident(.ident)+`, identifiers in the host-expression sense.
fn is_namespace_path(text: &str) -> bool {
    let mut segments = 0;
    for segment in text.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}

fn is_scope_annotation(text: &str) -> bool {
    let inner = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(text);
    if inner.trim().is_empty() {
        return false;
    }
    inner.split(',').all(|path| is_namespace_path(path.trim()))
}

/// One predicate reference or definition inside a constraint/assertion list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateEntry {
    /// A bare kebab name referencing an entry in the document's `common` map.
    Reference(KebabIdent),
    /// An inline single-key mapping `name: expression`.
    Inline {
        name: KebabIdent,
        expr: PredicateExpression,
    },
}

impl PredicateEntry {
    /// The predicate's name, whichever shape it has.
    pub fn name(&self) -> &KebabIdent {
        match self {
            PredicateEntry::Reference(name) => name,
            PredicateEntry::Inline { name, .. } => name,
        }
    }

    /// The expression text, if this entry carries one inline.
    pub fn expression(&self) -> Option<&PredicateExpression> {
        match self {
            PredicateEntry::Reference(_) => None,
            PredicateEntry::Inline { expr, .. } => Some(expr),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, PredicateEntry::Reference(_))
    }
}

/// An ordered, non-empty sequence of predicate entries with AND semantics:
/// all entries must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintList(Vec<PredicateEntry>);

impl ConstraintList {
    /// Build a constraint list. Returns `None` for an empty sequence.
    pub fn new(entries: Vec<PredicateEntry>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self(entries))
        }
    }

    pub fn entries(&self) -> &[PredicateEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of all entries, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &KebabIdent> {
        self.0.iter().map(|entry| entry.name())
    }
}
