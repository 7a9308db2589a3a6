//! Descriptor manifests and project configuration
//!
//! A manifest is the JSON document an external scanner writes:
//!
//! ```json
//! { "metadata": { "name": "Acme.Fluent" }, "types": [ ... ] }
//! ```
//!
//! `fluentgen.toml` carries project defaults in `[engine]` and `[metadata]`
//! tables; manifest metadata and command-line flags take precedence.

use anyhow::{bail, Context};
use fluentgen_engine::{ArtifactMetadata, EngineOptions, QualifiedName, SourceCatalog, TypeDescriptor};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up next to the manifest when `--config` is absent
pub const CONFIG_FILE: &str = "fluentgen.toml";

/// Scanner output
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Artifact metadata
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    /// Every type the scanner found, dependencies included
    pub types: Vec<TypeDescriptor>,
    /// Extra base-runtime generic definitions that may be rebuilt
    #[serde(default)]
    pub runtime_generics: Vec<String>,
}

impl Manifest {
    /// Read a manifest file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read manifest {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid manifest {}", path.display()))
    }

    /// Catalog of every type in the manifest
    pub fn catalog(&self) -> anyhow::Result<SourceCatalog> {
        let mut catalog = SourceCatalog::from_types(self.types.iter().cloned())?;
        for generic in &self.runtime_generics {
            catalog.register_runtime_generic(generic);
        }
        Ok(catalog)
    }

    /// Types to synthesize
    ///
    /// Without a filter every class, interface and struct not shipped with
    /// the runtime is selected. Filter entries must name manifest types.
    pub fn select(&self, filter: &[String]) -> anyhow::Result<Vec<QualifiedName>> {
        if filter.is_empty() {
            return Ok(self
                .types
                .iter()
                .filter(|t| !t.is_runtime() && !matches!(t.kind, fluentgen_engine::DescriptorKind::Enum { .. }))
                .map(|t| t.name.clone())
                .collect());
        }

        filter
            .iter()
            .map(|wanted| {
                match self.types.iter().find(|t| t.canonical() == *wanted) {
                    Some(ty) => Ok(ty.name.clone()),
                    None => bail!("type {} is not in the manifest", wanted),
                }
            })
            .collect()
    }
}

/// `fluentgen.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Engine defaults
    pub engine: EngineOptions,
    /// Metadata defaults
    pub metadata: ArtifactMetadata,
}

impl ProjectConfig {
    /// Read a configuration file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Explicit config, else `fluentgen.toml` beside the manifest, else defaults
    pub fn discover(explicit: Option<&Path>, manifest: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }
        let beside = manifest
            .parent()
            .map(|dir| dir.join(CONFIG_FILE))
            .filter(|p| p.is_file());
        match beside {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }
}

/// Fill every field of `primary` that is unset from `fallback`
pub fn merge_metadata(primary: ArtifactMetadata, fallback: ArtifactMetadata) -> ArtifactMetadata {
    let pick = |a: Option<String>, b: Option<String>| a.or(b);
    ArtifactMetadata {
        name: if primary.name.trim().is_empty() {
            fallback.name
        } else {
            primary.name
        },
        title: pick(primary.title, fallback.title),
        description: pick(primary.description, fallback.description),
        configuration: pick(primary.configuration, fallback.configuration),
        product: pick(primary.product, fallback.product),
        version: pick(primary.version, fallback.version),
        file_version: pick(primary.file_version, fallback.file_version),
        company: pick(primary.company, fallback.company),
        copyright: pick(primary.copyright, fallback.copyright),
        trademark: pick(primary.trademark, fallback.trademark),
        culture: pick(primary.culture, fallback.culture),
        neutral_language: pick(primary.neutral_language, fallback.neutral_language),
        guid: pick(primary.guid, fallback.guid),
        visible: primary.visible || fallback.visible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "metadata": { "name": "Shop.Fluent", "version": "1.0.0" },
        "types": [
            {
                "name": "Shop.Order",
                "members": [
                    { "name": "Id", "type": { "primitive": "i64" } },
                    { "name": "Status", "type": { "named": "Shop.Status" } },
                    { "name": "Note", "type": "string", "ignore": true }
                ],
                "options": { "setters_only": true }
            },
            {
                "name": "Shop.Status",
                "kind": { "enum": { "underlying": "i32", "literals": [ { "name": "Open", "value": 0 } ] } }
            },
            { "name": "System.Uri", "origin": "runtime" }
        ]
    }"#;

    #[test]
    fn test_parse_manifest() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.metadata.name, "Shop.Fluent");
        assert_eq!(manifest.types.len(), 3);
        assert!(manifest.types[0].options.setters_only);
        assert!(manifest.types[0].members[2].ignore);
        assert!(manifest.types[2].is_runtime());
        assert_eq!(manifest.catalog().unwrap().len(), 3);
    }

    #[test]
    fn test_select_defaults_and_filter() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let all: Vec<String> = manifest.select(&[]).unwrap().iter().map(|n| n.canonical()).collect();
        assert_eq!(all, vec!["Shop.Order"]);

        let filtered = manifest.select(&["Shop.Order".to_string()]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(manifest.select(&["Shop.Missing".to_string()]).is_err());
    }

    #[test]
    fn test_project_config() {
        let config: ProjectConfig = toml::from_str(
            r#"
            [engine]
            fluent_prefix = "Build"
            overwrite = true

            [metadata]
            company = "Shop Inc."
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.fluent_prefix, "Build");
        assert!(config.engine.overwrite);
        assert_eq!(config.engine.interface_prefix, "I");
        assert_eq!(config.metadata.company.as_deref(), Some("Shop Inc."));
    }

    #[test]
    fn test_merge_metadata() {
        let mut primary = ArtifactMetadata::named("Shop.Fluent");
        primary.version = Some("2.0".to_string());
        let mut fallback = ArtifactMetadata::named("Ignored");
        fallback.version = Some("1.0".to_string());
        fallback.company = Some("Shop Inc.".to_string());

        let merged = merge_metadata(primary, fallback);
        assert_eq!(merged.name, "Shop.Fluent");
        assert_eq!(merged.version.as_deref(), Some("2.0"));
        assert_eq!(merged.company.as_deref(), Some("Shop Inc."));
    }

    #[test]
    fn test_discover_config_beside_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("types.json");
        assert!(ProjectConfig::discover(None, &manifest).unwrap().1.is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "[engine]\nappend_hash = false\n").unwrap();
        let (config, found) = ProjectConfig::discover(None, &manifest).unwrap();
        assert_eq!(found, Some(dir.path().join(CONFIG_FILE)));
        assert!(!config.engine.append_hash);
    }
}
