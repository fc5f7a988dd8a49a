//! Artifact output shapes and shared formatting helpers.
//!
//! Every generator produces a typed record set plus two renderings: a
//! Markdown/plain-text view and a JSON value. Which one the caller emits is
//! a presentation concern, not part of the derivation contract.

use serde_json::Value;

/// The output format for rendering an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Markdown,
    Json,
}

impl ArtifactFormat {
    /// Parse an artifact format from a string; anything unknown is Markdown.
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => ArtifactFormat::Json,
            _ => ArtifactFormat::Markdown,
        }
    }
}

/// The rendered output of one artifact derivation.
#[derive(Debug)]
pub struct ArtifactOutput {
    /// Markdown/plain-text rendering.
    pub text: String,
    /// Machine-readable JSON (always populated).
    pub data: Value,
}

impl ArtifactOutput {
    /// Render in the requested format.
    pub fn render(&self, format: ArtifactFormat) -> String {
        match format {
            ArtifactFormat::Markdown => self.text.clone(),
            ArtifactFormat::Json => {
                serde_json::to_string_pretty(&self.data).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }
}

/// Turn a kebab-case name into sentence case: `registry-is-submitted` →
/// `Registry is submitted`.
pub fn sentence_case(kebab: &str) -> String {
    let mut sentence = kebab.replace('-', " ");
    if let Some(first) = sentence.get(..1) {
        let upper = first.to_ascii_uppercase();
        sentence.replace_range(..1, &upper);
    }
    sentence
}

/// Render a Markdown table. Every row must have one cell per header.
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut text = String::new();
    text.push_str("| ");
    text.push_str(&headers.join(" | "));
    text.push_str(" |\n|");
    for _ in headers {
        text.push_str(" --- |");
    }
    text.push('\n');
    for row in rows {
        text.push_str("| ");
        text.push_str(&row.join(" | "));
        text.push_str(" |\n");
    }
    text
}
