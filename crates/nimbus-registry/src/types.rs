//! Value types for the framework registry (spec §3 "Framework definition",
//! "NimbusConfig").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Static,
    Workers,
}

impl Target {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Static => "static",
            Target::Workers => "workers",
        }
    }
}

/// Build/deploy output locations for a framework at a given target.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkOutput {
    pub assets_dir: Option<&'static str>,
    pub worker_entry: Option<&'static str>,
}

/// An immutable, `'static` framework definition (spec §3).
pub struct Framework {
    pub id: &'static str,
    pub default_target: Target,
    pub supported_targets: &'static [Target],
    pub added_dependencies: &'static [(&'static str, &'static str)],
    pub added_dev_dependencies: &'static [(&'static str, &'static str)],
    pub outputs_by_target: &'static [(Target, FrameworkOutput)],
    pub detector: fn(&DetectionContext) -> bool,
    pub prompt_rules_by_target: &'static [(Target, &'static str)],
    pub prompt_keywords: &'static [&'static str],
    /// Rewrites/adds framework config files in place. Absent for frameworks
    /// with no post-generation file rewriting (e.g. `vite-react`).
    pub file_normalizer: Option<fn(&mut Vec<nimbus_llm::GeneratedFile>, Target)>,
}

impl Framework {
    #[must_use]
    pub fn output_for(&self, target: Target) -> Option<FrameworkOutput> {
        self.outputs_by_target
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, output)| *output)
    }

    #[must_use]
    pub fn prompt_rules_for(&self, target: Target) -> Option<&'static str> {
        self.prompt_rules_by_target
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, rules)| *rules)
    }

    #[must_use]
    pub fn supports(&self, target: Target) -> bool {
        self.supported_targets.contains(&target)
    }
}

/// What the detector inspects: the parsed `package.json` (if any) and the
/// set of file paths in the generated tree.
pub struct DetectionContext<'a> {
    pub package_json: Option<&'a serde_json::Value>,
    pub file_paths: Vec<&'a str>,
}

impl<'a> DetectionContext<'a> {
    #[must_use]
    pub fn has_dependency(&self, name: &str) -> bool {
        let Some(package_json) = self.package_json else {
            return false;
        };
        ["dependencies", "devDependencies"].iter().any(|section| {
            package_json
                .get(section)
                .and_then(|deps| deps.get(name))
                .is_some()
        })
    }

    #[must_use]
    pub fn has_file_matching(&self, prefix: &str) -> bool {
        self.file_paths.iter().any(|path| path.starts_with(prefix))
    }
}

/// The canonical per-project descriptor (spec §3 `NimbusConfig`),
/// embedded as `nimbus.config.json` in the generated tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NimbusConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "assetsDir")]
    pub assets_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "workerEntry")]
    pub worker_entry: Option<String>,
}

impl NimbusConfig {
    /// Parse `nimbus.config.json` from the generated tree, if present.
    /// A missing or unparseable file is "unspecified" (spec §3).
    #[must_use]
    pub fn from_files(files: &[nimbus_llm::GeneratedFile]) -> Self {
        files
            .iter()
            .find(|f| f.path == "nimbus.config.json")
            .and_then(|f| serde_json::from_str(&f.content).ok())
            .unwrap_or_default()
    }
}
