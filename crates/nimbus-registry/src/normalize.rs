//! Project normalization (spec §4.2 "Normalization"): dependency
//! injection, framework-specific file rewriting, and the canonical
//! `nimbus.config.json` writer.

use crate::error::RegistryError;
use crate::types::{Framework, NimbusConfig, Target};
use nimbus_llm::GeneratedFile;
use serde_json::{Map, Value};

/// Normalize a generated file tree in place against a resolved framework
/// and target. Idempotent: running it again on its own output produces
/// byte-identical `package.json` and `nimbus.config.json` (spec §8).
///
/// # Errors
/// Returns `RegistryError::InvalidPackageJson` if `package.json` is
/// present but not valid JSON.
pub fn normalize(
    files: &mut Vec<GeneratedFile>,
    framework: &Framework,
    target: Target,
) -> Result<(), RegistryError> {
    merge_package_json(files, framework)?;

    if let Some(normalizer) = framework.file_normalizer {
        normalizer(files, target);
    }

    write_canonical_config(files, framework, target);
    Ok(())
}

fn merge_package_json(files: &mut [GeneratedFile], framework: &Framework) -> Result<(), RegistryError> {
    let Some(entry) = files.iter_mut().find(|f| f.path == "package.json") else {
        return Ok(());
    };

    let mut root: Value = serde_json::from_str(&entry.content)
        .map_err(|e| RegistryError::InvalidPackageJson(e.to_string()))?;

    let Value::Object(root_map) = &mut root else {
        return Err(RegistryError::InvalidPackageJson(
            "package.json root is not an object".to_string(),
        ));
    };

    merge_dependency_section(root_map, "dependencies", framework.added_dependencies);
    merge_dependency_section(root_map, "devDependencies", framework.added_dev_dependencies);

    let mut serialized = serde_json::to_string_pretty(&root)
        .map_err(|e| RegistryError::InvalidPackageJson(e.to_string()))?;
    serialized.push('\n');
    entry.content = serialized;
    Ok(())
}

fn merge_dependency_section(root_map: &mut Map<String, Value>, section: &str, additions: &[(&str, &str)]) {
    if additions.is_empty() {
        return;
    }

    let section_map = root_map
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .expect("dependency sections are always objects once inserted");

    for (name, version) in additions {
        section_map
            .entry((*name).to_string())
            .or_insert_with(|| Value::String((*version).to_string()));
    }
}

fn write_canonical_config(files: &mut Vec<GeneratedFile>, framework: &Framework, target: Target) {
    let output = framework.output_for(target);
    let config = NimbusConfig {
        framework: Some(framework.id.to_string()),
        target: Some(target),
        assets_dir: output.and_then(|o| o.assets_dir).map(str::to_string),
        worker_entry: output.and_then(|o| o.worker_entry).map(str::to_string),
    };

    let mut serialized = serde_json::to_string_pretty(&config).expect("NimbusConfig always serializes");
    serialized.push('\n');

    if let Some(existing) = files.iter_mut().find(|f| f.path == "nimbus.config.json") {
        existing.content = serialized;
    } else {
        files.push(GeneratedFile {
            path: "nimbus.config.json".to_string(),
            content: serialized,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frameworks::{NEXT, STATIC_SITE, VITE_REACT};

    #[test]
    fn merges_dependencies_preserving_existing_entries() {
        let mut files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: serde_json::json!({ "dependencies": { "existing": "1.0.0" } }).to_string(),
        }];
        normalize(&mut files, &VITE_REACT, Target::Static).unwrap();

        let package_json: Value = serde_json::from_str(&files[0].content).unwrap();
        assert_eq!(package_json["dependencies"]["existing"], "1.0.0");
        assert_eq!(package_json["dependencies"]["react"], "latest");
    }

    #[test]
    fn does_not_inject_dependencies_when_package_json_absent() {
        let mut files = vec![];
        normalize(&mut files, &VITE_REACT, Target::Static).unwrap();
        assert!(!files.iter().any(|f| f.path == "package.json"));
    }

    #[test]
    fn writes_canonical_nimbus_config() {
        let mut files = vec![];
        normalize(&mut files, &NEXT, Target::Workers).unwrap();
        let config = files.iter().find(|f| f.path == "nimbus.config.json").unwrap();
        let parsed: NimbusConfig = serde_json::from_str(&config.content).unwrap();
        assert_eq!(parsed.framework.as_deref(), Some("next"));
        assert_eq!(parsed.worker_entry.as_deref(), Some(".open-next/worker.js"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: "{}".to_string(),
        }];
        normalize(&mut files, &NEXT, Target::Workers).unwrap();
        let first_pass = files.clone();
        normalize(&mut files, &NEXT, Target::Workers).unwrap();
        assert_eq!(files.len(), first_pass.len());
        for (a, b) in files.iter().zip(first_pass.iter()) {
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn invalid_package_json_is_rejected() {
        let mut files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: "not json".to_string(),
        }];
        assert!(normalize(&mut files, &STATIC_SITE, Target::Static).is_err());
    }
}
