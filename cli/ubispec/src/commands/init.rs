//! `ubispec init` — project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::UbispecManifest;

const SAMPLE_LIFECYCLE: &str = r#"ubispec: lifecycle/v1.0
decider: Registry
identity: registryId
model: ./registry-model.ts
common:
  registry-is-submitted: dm.state.status == 'submitted'
lifecycle:
  - When: SubmitRegistry
    And:
      - registry-is-draft: dm.state.status == 'draft'
    Then: RegistrySubmitted
    Outcome:
      - registry-is-submitted
"#;

/// Create a new UbiSpec project at the given path.
pub fn run(name: &str) -> Result<()> {
    let project_dir = Path::new(name);
    create_project(project_dir, name)
}

pub(crate) fn create_project(project_dir: &Path, name: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }

    fs::create_dir_all(project_dir.join("specs")).context("creating specs/ directory")?;

    let manifest_content = UbispecManifest::template(name);
    fs::write(project_dir.join("ubispec.toml"), &manifest_content)
        .context("writing ubispec.toml")?;

    fs::write(project_dir.join("specs").join("registry.yaml"), SAMPLE_LIFECYCLE)
        .context("writing specs/registry.yaml")?;

    println!("Created project '{name}'");
    println!("  {name}/ubispec.toml");
    println!("  {name}/specs/registry.yaml");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_scaffolds_a_validating_project() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("demo");
        create_project(&project_dir, "demo").unwrap();

        let (manifest, found) = UbispecManifest::find_and_load(&project_dir).unwrap().unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(found, project_dir);

        // The sample document must validate cleanly.
        let docs = crate::loader::load_documents(&project_dir, &manifest.specs.dirs).unwrap();
        assert_eq!(docs.len(), 1);
        let (report, _) = ubispec_verify::validate_documents(
            &docs,
            &ubispec_verify::NoModel,
            &ubispec_verify::CrossOptions::default(),
        );
        assert!(!report.has_errors(), "sample spec must validate:\n{report}");
    }

    #[test]
    fn init_refuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("demo");
        std::fs::create_dir_all(&project_dir).unwrap();
        assert!(create_project(&project_dir, "demo").is_err());
    }
}
