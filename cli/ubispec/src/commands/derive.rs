//! `ubispec derive` — produce one artifact from the validated set.

use std::path::Path;

use anyhow::{bail, Context, Result};

use ubispec_derive::{
    checklist, command_catalog, decision_table, dependency_manifest, forward_trace, scenarios,
    topology, ArtifactFormat, ArtifactOutput, TableOptions,
};

use crate::commands::validate::validate_project;
use crate::manifest::UbispecManifest;

/// The artifact kinds the CLI can derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    DecisionTable,
    Scenarios,
    Checklist,
    Trace,
    Topology,
    Deps,
    Catalog,
}

impl ArtifactKind {
    /// Parse an artifact kind from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "decision-table" | "table" => Ok(ArtifactKind::DecisionTable),
            "scenarios" | "tests" => Ok(ArtifactKind::Scenarios),
            "checklist" => Ok(ArtifactKind::Checklist),
            "trace" => Ok(ArtifactKind::Trace),
            "topology" => Ok(ArtifactKind::Topology),
            "deps" | "dependencies" => Ok(ArtifactKind::Deps),
            "catalog" => Ok(ArtifactKind::Catalog),
            other => bail!(
                "unknown artifact '{other}'. Choose: decision-table, scenarios, checklist, trace, topology, deps, catalog"
            ),
        }
    }
}

/// Derive one artifact and print or write it.
#[allow(clippy::too_many_arguments)]
pub fn run(
    project_dir: &Path,
    manifest: Option<&UbispecManifest>,
    artifact: &str,
    subject: Option<&str>,
    command: Option<&str>,
    format: Option<&str>,
    all_fail_row: bool,
    out: Option<&str>,
) -> Result<()> {
    let kind = ArtifactKind::parse(artifact)?;
    let (report, validated) = validate_project(project_dir, manifest)?;
    if report.has_errors() {
        eprintln!("warning: {} document(s) excluded from derivation", report.summary.excluded);
    }

    let options = TableOptions { all_fail_row };
    let output: ArtifactOutput = match kind {
        ArtifactKind::DecisionTable => {
            let (decider, command) = subject_and_command(subject, command)?;
            decision_table(&validated, decider, command, options)?.output()
        }
        ArtifactKind::Scenarios => {
            let (decider, command) = subject_and_command(subject, command)?;
            scenarios(&validated, decider, command, options)?.output()
        }
        ArtifactKind::Checklist => {
            let decider = subject.context("--subject <decider> is required for checklist")?;
            checklist(&validated, decider)?.output()
        }
        ArtifactKind::Trace => {
            let (decider, command) = subject_and_command(subject, command)?;
            forward_trace(&validated, decider, command)?.output()
        }
        ArtifactKind::Topology => topology(&validated).output(),
        ArtifactKind::Deps => dependency_manifest(&validated).output(),
        ArtifactKind::Catalog => command_catalog(&validated).output(),
    };

    let rendered = output.render(ArtifactFormat::parse(format.unwrap_or("md")));
    match out {
        Some(path) => {
            let path = project_dir.join(path);
            std::fs::write(&path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn subject_and_command<'a>(
    subject: Option<&'a str>,
    command: Option<&'a str>,
) -> Result<(&'a str, &'a str)> {
    let subject = subject.context("--subject <decider> is required for this artifact")?;
    let command = command.context("--command <command> is required for this artifact")?;
    Ok((subject, command))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &str = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    And:
      - cart-is-not-empty: dm.state.items > 0
    Then: OrderPlaced
    Outcome: [order-is-open]
"#;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let specs = dir.path().join("specs");
        std::fs::create_dir_all(&specs).unwrap();
        std::fs::write(specs.join("order.yaml"), ORDER).unwrap();
        dir
    }

    #[test]
    fn derive_decision_table_to_file() {
        let dir = project();
        run(
            dir.path(),
            None,
            "decision-table",
            Some("Order"),
            Some("PlaceOrder"),
            None,
            false,
            Some("table.md"),
        )
        .unwrap();
        let written = std::fs::read_to_string(dir.path().join("table.md")).unwrap();
        assert!(written.contains("DecisionFailed [cart-is-not-empty]"));
    }

    #[test]
    fn derive_catalog_json_to_stdout() {
        let dir = project();
        run(dir.path(), None, "catalog", None, None, Some("json"), false, None).unwrap();
    }

    #[test]
    fn missing_subject_is_an_error() {
        let dir = project();
        assert!(run(dir.path(), None, "decision-table", None, None, None, false, None).is_err());
    }

    #[test]
    fn unknown_artifact_is_an_error() {
        assert!(ArtifactKind::parse("mermaid").is_err());
        assert_eq!(ArtifactKind::parse("table").unwrap(), ArtifactKind::DecisionTable);
        assert_eq!(ArtifactKind::parse("deps").unwrap(), ArtifactKind::Deps);
    }
}
