//! Framework and target resolution (spec §4.2 "Resolution order").

use crate::frameworks::{REGISTRY_ORDER, STATIC_SITE};
use crate::types::{DetectionContext, Framework, NimbusConfig, Target};
use nimbus_llm::GeneratedFile;

/// Resolve the target framework: explicit `config.framework` wins;
/// otherwise the first framework whose detector matches, tested in
/// registry order; otherwise the static fallback.
#[must_use]
pub fn resolve_framework<'a>(files: &[GeneratedFile], config: &NimbusConfig) -> &'a Framework {
    if let Some(explicit) = &config.framework {
        if let Some(framework) = REGISTRY_ORDER.iter().find(|f| f.id == explicit).copied() {
            return framework;
        }
    }

    let package_json = parse_package_json(files);
    let ctx = DetectionContext {
        package_json: package_json.as_ref(),
        file_paths: files.iter().map(|f| f.path.as_str()).collect(),
    };

    REGISTRY_ORDER
        .iter()
        .find(|framework| (framework.detector)(&ctx))
        .copied()
        .unwrap_or(&STATIC_SITE)
}

/// Resolve the build target: explicit `config.target` wins if supported;
/// otherwise the prompt's SSR/static hints override the default where the
/// framework permits both; otherwise the framework's default.
#[must_use]
pub fn resolve_target(framework: &Framework, config: &NimbusConfig, prompt: &str) -> Target {
    if let Some(explicit) = config.target {
        if framework.supports(explicit) {
            return explicit;
        }
    }

    if framework.supports(Target::Static) && framework.supports(Target::Workers) {
        if let Some(hinted) = target_hint_from_prompt(prompt) {
            return hinted;
        }
    }

    framework.default_target
}

fn target_hint_from_prompt(prompt: &str) -> Option<Target> {
    let lower = prompt.to_lowercase();
    const STATIC_HINTS: &[&str] = &["ssg", "prerender", "static site"];
    const SSR_HINTS: &[&str] = &["ssr", "server-rendered", "full-stack"];

    if STATIC_HINTS.iter().any(|hint| lower.contains(hint)) {
        return Some(Target::Static);
    }
    if SSR_HINTS.iter().any(|hint| lower.contains(hint)) {
        return Some(Target::Workers);
    }
    None
}

fn parse_package_json(files: &[GeneratedFile]) -> Option<serde_json::Value> {
    files
        .iter()
        .find(|f| f.path == "package.json")
        .and_then(|f| serde_json::from_str(&f.content).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_framework_wins_over_detection() {
        let files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: serde_json::json!({ "dependencies": { "next": "latest" } }).to_string(),
        }];
        let config = NimbusConfig {
            framework: Some("astro".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_framework(&files, &config).id, "astro");
    }

    #[test]
    fn detection_falls_back_to_static_when_nothing_matches() {
        let files = vec![];
        let framework = resolve_framework(&files, &NimbusConfig::default());
        assert_eq!(framework.id, "static");
    }

    #[test]
    fn detection_honors_registry_order() {
        let files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: serde_json::json!({
                "dependencies": { "next": "latest", "astro": "latest" }
            })
            .to_string(),
        }];
        let framework = resolve_framework(&files, &NimbusConfig::default());
        assert_eq!(framework.id, "next");
    }

    #[test]
    fn explicit_target_wins_when_supported() {
        let astro = &crate::frameworks::ASTRO;
        assert_eq!(astro.default_target, Target::Static);
        let config = NimbusConfig {
            target: Some(Target::Workers),
            ..Default::default()
        };
        assert_eq!(resolve_target(astro, &config, ""), Target::Workers);
    }

    #[test]
    fn prompt_hint_overrides_default_when_framework_supports_both() {
        let astro = &crate::frameworks::ASTRO;
        let config = NimbusConfig::default();
        assert_eq!(resolve_target(astro, &config, "astro server-rendered"), Target::Workers);
        assert_eq!(resolve_target(astro, &config, "a static site please"), Target::Static);
    }

    #[test]
    fn prompt_hint_ignored_when_framework_only_supports_one_target() {
        let vite_react = &crate::frameworks::VITE_REACT;
        let config = NimbusConfig::default();
        assert_eq!(resolve_target(vite_react, &config, "ssr full-stack"), Target::Static);
    }
}
