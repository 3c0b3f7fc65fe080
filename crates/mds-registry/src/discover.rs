use std::fs;
use std::path::Path;

use mds_core::{ErrorInfo, MdsError};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::description::Description;
use crate::registry::{Dataset, DatasetRegistry};

/// Registration hook run during discovery. Each hook plays the role of one
/// dataset module registering its classes.
pub type RegistrationHook = fn(&mut DatasetRegistry) -> Result<(), MdsError>;

/// Runs every hook against a fresh registry and returns it.
///
/// Hooks run in slice order; the first failure aborts the whole gather,
/// there is no partial-success mode. The returned registry enumerates in
/// name order regardless of hook order.
pub fn gather_datasets(hooks: &[RegistrationHook]) -> Result<DatasetRegistry, MdsError> {
    let mut registry = DatasetRegistry::new();
    for hook in hooks {
        hook(&mut registry)?;
    }
    Ok(registry)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetManifest {
    name: String,
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    description: Description,
    #[serde(default)]
    ids: Vec<String>,
}

/// Dataset whose entry identifiers come from a manifest file.
struct ManifestDataset {
    ids: Vec<String>,
}

impl Dataset for ManifestDataset {
    fn ids(&self) -> Vec<String> {
        self.ids.clone()
    }
}

fn manifest_error(code: &str, path: &Path, err: impl ToString) -> MdsError {
    MdsError::Registry(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Scans `dir` for `*.json` dataset manifests and registers each one.
///
/// This is the discovery counterpart of importing every sibling dataset
/// module: one manifest per dataset, a malformed manifest aborts the scan.
/// Returns the number of datasets registered.
pub fn scan_manifests(dir: &Path, registry: &mut DatasetRegistry) -> Result<usize, MdsError> {
    let mut registered = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            MdsError::Registry(
                ErrorInfo::new("mds_registry.scan", err.to_string())
                    .with_context("path", dir.display().to_string()),
            )
        })?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some("json")
        {
            continue;
        }
        let bytes = fs::read(path)
            .map_err(|err| manifest_error("mds_registry.manifest_read", path, err))?;
        let manifest: DatasetManifest = serde_json::from_slice(&bytes)
            .map_err(|err| manifest_error("mds_registry.manifest_parse", path, err))?;
        let module = manifest.module.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("unknown")
                .to_string()
        });
        let ids = manifest.ids;
        registry.register(manifest.name, module, manifest.description, move || {
            Box::new(ManifestDataset { ids: ids.clone() })
        })?;
        registered += 1;
    }
    Ok(registered)
}
