//! Issue-collecting traversal helpers over the raw document value tree.
//!
//! The parsers never short-circuit: every extractor records its problem in
//! the [`Collector`] and returns `None`, so a single pass reports every
//! structural and reference issue in the document.

use serde_json::{Map, Value};

use ubispec_core::{DocPath, Issue, IssueCode, KebabIdent, PascalIdent, PathSeg};
use ubispec_core::{ConstraintList, PredicateEntry, PredicateExpression};

/// Accumulates issues and tracks the current path into the document.
#[derive(Debug, Default)]
pub struct Collector {
    issues: Vec<Issue>,
    path: Vec<PathSeg>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_field(&mut self, name: impl Into<String>) {
        self.path.push(PathSeg::Field(name.into()));
    }

    pub fn push_index(&mut self, idx: usize) {
        self.path.push(PathSeg::Index(idx));
    }

    pub fn pop(&mut self) {
        self.path.pop();
    }

    /// The current location as a `DocPath`.
    pub fn here(&self) -> DocPath {
        DocPath::from_segments(self.path.clone())
    }

    /// Record an issue at the current location.
    pub fn report(&mut self, code: IssueCode, message: impl Into<String>) {
        let issue = Issue::new(code, self.here(), message);
        self.issues.push(issue);
    }

    /// Record an issue at the current location extended by one field.
    pub fn report_at(&mut self, field: &str, code: IssueCode, message: impl Into<String>) {
        self.push_field(field);
        self.report(code, message);
        self.pop();
    }

    /// Whether any non-advisory issue has been collected.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.is_error())
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

/// The document root must be a mapping.
pub fn as_object<'a>(value: &'a Value, c: &mut Collector) -> Option<&'a Map<String, Value>> {
    match value.as_object() {
        Some(map) => Some(map),
        None => {
            c.report(IssueCode::TypeMismatch, "expected a mapping");
            None
        }
    }
}

/// Extract a required string field.
pub fn req_str<'a>(map: &'a Map<String, Value>, key: &str, c: &mut Collector) -> Option<&'a str> {
    match map.get(key) {
        None => {
            c.report_at(key, IssueCode::MissingField, format!("required field '{key}' is missing"));
            None
        }
        Some(value) => match value.as_str() {
            Some(text) => Some(text),
            None => {
                c.report_at(key, IssueCode::TypeMismatch, format!("field '{key}' must be a string"));
                None
            }
        },
    }
}

/// Extract an optional string field.
pub fn opt_str<'a>(map: &'a Map<String, Value>, key: &str, c: &mut Collector) -> Option<&'a str> {
    match map.get(key) {
        None => None,
        Some(value) => match value.as_str() {
            Some(text) => Some(text),
            None => {
                c.report_at(key, IssueCode::TypeMismatch, format!("field '{key}' must be a string"));
                None
            }
        },
    }
}

/// Extract a required non-empty sequence field.
pub fn req_seq<'a>(map: &'a Map<String, Value>, key: &str, c: &mut Collector) -> Option<&'a [Value]> {
    match map.get(key) {
        None => {
            c.report_at(key, IssueCode::MissingField, format!("required field '{key}' is missing"));
            None
        }
        Some(value) => match value.as_array() {
            Some(seq) if !seq.is_empty() => Some(seq),
            Some(_) => {
                c.report_at(key, IssueCode::TypeMismatch, format!("field '{key}' must not be empty"));
                None
            }
            None => {
                c.report_at(key, IssueCode::TypeMismatch, format!("field '{key}' must be a sequence"));
                None
            }
        },
    }
}

/// Parse a required Pascal identifier field.
pub fn req_pascal(map: &Map<String, Value>, key: &str, c: &mut Collector) -> Option<PascalIdent> {
    let text = req_str(map, key, c)?;
    parse_pascal(text, key, c)
}

/// Parse a Pascal identifier from already-extracted text, reporting at `field`.
pub fn parse_pascal(text: &str, field: &str, c: &mut Collector) -> Option<PascalIdent> {
    match PascalIdent::parse(text) {
        Ok(id) => Some(id),
        Err(err) => {
            c.report_at(field, IssueCode::PatternMismatch, err.to_string());
            None
        }
    }
}

/// Parse a kebab identifier from already-extracted text, reporting at `field`.
pub fn parse_kebab(text: &str, field: &str, c: &mut Collector) -> Option<KebabIdent> {
    match KebabIdent::parse(text) {
        Ok(id) => Some(id),
        Err(err) => {
            c.report_at(field, IssueCode::PatternMismatch, err.to_string());
            None
        }
    }
}

/// Parse one predicate entry: a bare kebab string, or a single-key mapping
/// `name: expression`.
pub fn parse_predicate_entry(value: &Value, c: &mut Collector) -> Option<PredicateEntry> {
    match value {
        Value::String(text) => {
            let name = match KebabIdent::parse(text) {
                Ok(name) => name,
                Err(err) => {
                    c.report(IssueCode::PatternMismatch, err.to_string());
                    return None;
                }
            };
            Some(PredicateEntry::Reference(name))
        }
        Value::Object(map) => {
            if map.len() != 1 {
                c.report(
                    IssueCode::MultiKeyInlinePredicate,
                    format!("inline predicate mapping must have exactly one key, found {}", map.len()),
                );
                return None;
            }
            let (key, expr_value) = map.iter().next().expect("len checked above");
            let name = match KebabIdent::parse(key) {
                Ok(name) => name,
                Err(err) => {
                    c.report(IssueCode::PatternMismatch, err.to_string());
                    return None;
                }
            };
            let text = match expr_value.as_str() {
                Some(text) => text,
                None => {
                    c.report_at(key, IssueCode::TypeMismatch, "predicate expression must be a string");
                    return None;
                }
            };
            let expr = match PredicateExpression::new(text) {
                Some(expr) => expr,
                None => {
                    c.report_at(key, IssueCode::TypeMismatch, "predicate expression must not be empty");
                    return None;
                }
            };
            Some(PredicateEntry::Inline { name, expr })
        }
        _ => {
            c.report(
                IssueCode::TypeMismatch,
                "expected a predicate name or a single-key 'name: expression' mapping",
            );
            None
        }
    }
}

/// Parse a constraint list from a sequence value.
pub fn parse_constraint_list(value: &Value, c: &mut Collector) -> Option<ConstraintList> {
    let seq = match value.as_array() {
        Some(seq) => seq,
        None => {
            c.report(IssueCode::TypeMismatch, "expected a sequence of predicate entries");
            return None;
        }
    };
    if seq.is_empty() {
        c.report(IssueCode::TypeMismatch, "constraint list must not be empty");
        return None;
    }
    let mut entries = Vec::with_capacity(seq.len());
    let mut complete = true;
    for (idx, entry_value) in seq.iter().enumerate() {
        c.push_index(idx);
        match parse_predicate_entry(entry_value, c) {
            Some(entry) => entries.push(entry),
            None => complete = false,
        }
        c.pop();
    }
    if complete {
        ConstraintList::new(entries)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collector_tracks_paths() {
        let mut c = Collector::new();
        c.push_field("lifecycle");
        c.push_index(2);
        c.report(IssueCode::DuplicateCommand, "duplicate");
        c.pop();
        c.pop();
        assert_eq!(c.issues().len(), 1);
        assert_eq!(c.issues()[0].path.to_string(), "lifecycle[2]");
    }

    #[test]
    fn req_str_reports_missing_and_mismatched() {
        let mut c = Collector::new();
        let map = json!({"present": "yes", "wrong": 7});
        let map = map.as_object().unwrap();
        assert_eq!(req_str(map, "present", &mut c), Some("yes"));
        assert_eq!(req_str(map, "absent", &mut c), None);
        assert_eq!(req_str(map, "wrong", &mut c), None);
        let codes: Vec<_> = c.issues().iter().map(|i| i.code).collect();
        assert_eq!(codes, vec![IssueCode::MissingField, IssueCode::TypeMismatch]);
    }

    #[test]
    fn predicate_entry_shapes() {
        let mut c = Collector::new();
        let entry = parse_predicate_entry(&json!("registry-is-submitted"), &mut c).unwrap();
        assert!(entry.is_reference());

        let entry =
            parse_predicate_entry(&json!({"reviewer-is-authorised": "dm.ctx.roles > 0"}), &mut c)
                .unwrap();
        assert_eq!(entry.name().as_str(), "reviewer-is-authorised");
        assert!(entry.expression().is_some());
        assert!(c.issues().is_empty());
    }

    #[test]
    fn multi_key_inline_predicate_rejected() {
        let mut c = Collector::new();
        let value = json!({"one": "a.b", "two": "c.d"});
        assert!(parse_predicate_entry(&value, &mut c).is_none());
        assert_eq!(c.issues()[0].code, IssueCode::MultiKeyInlinePredicate);
    }

    #[test]
    fn pascal_key_rejected_as_predicate_name() {
        let mut c = Collector::new();
        assert!(parse_predicate_entry(&json!("NotKebab"), &mut c).is_none());
        assert_eq!(c.issues()[0].code, IssueCode::PatternMismatch);
    }

    #[test]
    fn constraint_list_collects_every_bad_entry() {
        let mut c = Collector::new();
        let value = json!(["ok-name", "Bad", 7, "also-ok"]);
        assert!(parse_constraint_list(&value, &mut c).is_none());
        // Both bad entries reported, not just the first.
        assert_eq!(c.issues().len(), 2);
        assert_eq!(c.issues()[0].path.to_string(), "[1]");
        assert_eq!(c.issues()[1].path.to_string(), "[2]");
    }

    #[test]
    fn empty_constraint_list_rejected() {
        let mut c = Collector::new();
        assert!(parse_constraint_list(&json!([]), &mut c).is_none());
        assert_eq!(c.issues()[0].code, IssueCode::TypeMismatch);
    }
}
