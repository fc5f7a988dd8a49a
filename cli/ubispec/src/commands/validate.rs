//! `ubispec validate` — run per-document and cross-document validation.

use std::path::Path;

use anyhow::{bail, Result};

use ubispec_verify::{validate_documents, CrossOptions, NoModel, ValidationReport};

use crate::loader::load_documents;
use crate::manifest::UbispecManifest;

/// Validate every spec document of the project and print the aggregated
/// report.
pub fn run(
    project_dir: &Path,
    manifest: Option<&UbispecManifest>,
    format: Option<&str>,
    strict: bool,
) -> Result<()> {
    let (report, _) = validate_project(project_dir, manifest)?;

    match format {
        Some("json") => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
        _ => print!("{report}"),
    }

    if report.has_errors() {
        bail!(
            "validation failed: {} structural, {} reference, {} cross-document issue(s)",
            report.summary.structural,
            report.summary.reference,
            report.summary.cross_document,
        );
    }
    if strict && report.summary.advisory > 0 {
        bail!("validation failed (strict): {} advisory issue(s)", report.summary.advisory);
    }
    Ok(())
}

/// Load and validate the project's documents.
pub(crate) fn validate_project(
    project_dir: &Path,
    manifest: Option<&UbispecManifest>,
) -> Result<(ValidationReport, ubispec_verify::ValidatedSet)> {
    let dirs = manifest
        .map(|m| m.specs.dirs.clone())
        .unwrap_or_else(|| vec!["specs".to_string()]);
    let documents = load_documents(project_dir, &dirs)?;

    let options = CrossOptions {
        external_deciders: match manifest {
            Some(manifest) => manifest.external_decider_policy()?,
            None => Default::default(),
        },
    };

    let outcome = match manifest.map(|m| m.field_index()) {
        Some(index) if !index.is_empty() => validate_documents(&documents, &index, &options),
        _ => validate_documents(&documents, &NoModel, &options),
    };
    Ok(outcome)
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
    Then: OrderPlaced
    Outcome: [order-is-open]
"#;

    fn project_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let specs = dir.path().join("specs");
        std::fs::create_dir_all(&specs).unwrap();
        for (name, text) in files {
            std::fs::write(specs.join(name), text).unwrap();
        }
        dir
    }

    #[test]
    fn clean_project_validates() {
        let dir = project_with(&[("order.yaml", ORDER)]);
        run(dir.path(), None, None, false).unwrap();
    }

    #[test]
    fn broken_project_fails_with_nonzero_outcome() {
        let broken = ORDER.replace("decider: Order", "decider: not-pascal");
        let dir = project_with(&[("order.yaml", &broken)]);
        assert!(run(dir.path(), None, None, false).is_err());
    }

    #[test]
    fn strict_mode_fails_on_advisories() {
        let advisory = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: ReviewOrder
    Then:
      - OrderFlagged:
          - has-issues: dm.state.issues > 0
    Outcome:
      OrderFlagged:
        - issues-recorded
"#;
        let dir = project_with(&[("order.yaml", advisory)]);
        run(dir.path(), None, None, false).unwrap();
        assert!(run(dir.path(), None, None, true).is_err());
    }

    #[test]
    fn manifest_policy_downgrades_external_deciders() {
        let process = r#"
ubispec: process/v1.0
process: Sync
reacts_to: [External]
emits_to: [External]
model: ./m.ts
reactions:
  - When: SomethingHappened
    From: External
    Then: DoSomething -> External
    Outcome:
      - forwarded
"#;
        let dir = project_with(&[("sync.yaml", process)]);

        // Default policy: unknown deciders are errors.
        assert!(run(dir.path(), None, None, false).is_err());

        let manifest = toml::from_str::<UbispecManifest>(
            "[project]\nname = \"p\"\n[validation]\nexternal_deciders = \"allow\"\n",
        )
        .unwrap();
        run(dir.path(), Some(&manifest), None, false).unwrap();
    }
}
