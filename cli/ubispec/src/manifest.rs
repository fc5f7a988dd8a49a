//! `ubispec.toml` manifest parsing and project configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ubispec_verify::{ExternalDeciderPolicy, StaticFieldIndex};

/// The top-level manifest structure for a UbiSpec project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UbispecManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Spec document locations.
    #[serde(default)]
    pub specs: SpecsConfig,
    /// Validation configuration.
    #[serde(default)]
    pub validation: Option<ValidationConfig>,
    /// Event payload fields, standing in for the model-types component.
    #[serde(default)]
    pub model: Option<ModelConfig>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required).
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Spec document locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecsConfig {
    /// Directories scanned for spec documents, relative to the project root.
    #[serde(default = "default_spec_dirs")]
    pub dirs: Vec<String>,
}

impl Default for SpecsConfig {
    fn default() -> Self {
        Self {
            dirs: default_spec_dirs(),
        }
    }
}

fn default_spec_dirs() -> Vec<String> {
    vec!["specs".to_string()]
}

/// Validation configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// "deny" (default) or "allow": how to treat deciders without documents.
    #[serde(default)]
    pub external_deciders: Option<String>,
}

/// Declared event payload fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub fields: HashMap<String, Vec<String>>,
}

impl UbispecManifest {
    /// Search upward from `start_dir` for a `ubispec.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join("ubispec.toml");
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: UbispecManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing ubispec.toml")
    }

    /// Resolve the external-decider policy from the manifest.
    pub fn external_decider_policy(&self) -> Result<ExternalDeciderPolicy> {
        let setting = self
            .validation
            .as_ref()
            .and_then(|v| v.external_deciders.as_deref());
        match setting {
            None | Some("deny") => Ok(ExternalDeciderPolicy::Deny),
            Some("allow") => Ok(ExternalDeciderPolicy::Allow),
            Some(other) => anyhow::bail!(
                "unknown external_deciders setting '{other}': expected deny or allow"
            ),
        }
    }

    /// Build the event-field index from the `[model]` tables.
    pub fn field_index(&self) -> StaticFieldIndex {
        let mut index = StaticFieldIndex::new();
        if let Some(model) = &self.model {
            for (event, fields) in &model.fields {
                index.declare(event, fields.iter().map(String::as_str));
            }
        }
        index
    }

    /// Generate the default template for `ubispec init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[specs]
dirs = ["specs"]

[validation]
external_deciders = "deny"
"#
        )
    }
}
