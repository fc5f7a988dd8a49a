//! Spec-document discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ubispec_core::Document;

/// Load every spec document under the configured directories.
///
/// Scans recursively for `.yaml`, `.yml`, and `.json` files, in a stable
/// path order. Missing directories are skipped silently so a fresh project
/// validates cleanly.
pub fn load_documents(project_dir: &Path, dirs: &[String]) -> Result<Vec<Document>> {
    let mut paths = Vec::new();
    for dir in dirs {
        let root = project_dir.join(dir);
        if root.is_dir() {
            collect_spec_paths(&root, &mut paths)?;
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let document = Document::from_path(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        documents.push(document);
    }
    Ok(documents)
}

fn collect_spec_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_spec_paths(&path, paths)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml" | "json")
        ) {
            paths.push(path);
        }
    }
    Ok(())
}
