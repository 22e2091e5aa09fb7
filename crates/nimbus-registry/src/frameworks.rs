//! The shipped framework set (spec §4.2 + SPEC_FULL "Shipped framework
//! set"): `next`, `astro`, `vite-react`, and a fallback `static`
//! pseudo-framework with no dependencies and no normalizer.

use crate::types::{DetectionContext, Framework, FrameworkOutput, Target};
use nimbus_llm::GeneratedFile;

pub const NEXT: Framework = Framework {
    id: "next",
    default_target: Target::Workers,
    supported_targets: &[Target::Workers],
    added_dependencies: &[("next", "latest")],
    added_dev_dependencies: &[],
    outputs_by_target: &[(
        Target::Workers,
        FrameworkOutput {
            assets_dir: Some(".open-next/assets"),
            worker_entry: Some(".open-next/worker.js"),
        },
    )],
    detector: detect_next,
    prompt_rules_by_target: &[(
        Target::Workers,
        "Target Next.js with the App Router, standalone output, deployed as a Cloudflare Worker via OpenNext. \
         Do not hand-write a next.config that disables standalone output.",
    )],
    prompt_keywords: &["next", "nextjs", "next.js"],
    file_normalizer: Some(normalize_next),
};

pub const ASTRO: Framework = Framework {
    id: "astro",
    default_target: Target::Static,
    supported_targets: &[Target::Static, Target::Workers],
    added_dependencies: &[("astro", "latest")],
    added_dev_dependencies: &[],
    outputs_by_target: &[
        (
            Target::Static,
            FrameworkOutput {
                assets_dir: Some("dist"),
                worker_entry: None,
            },
        ),
        (
            Target::Workers,
            FrameworkOutput {
                assets_dir: Some("dist"),
                worker_entry: Some("dist/_worker.js/index.js"),
            },
        ),
    ],
    detector: detect_astro,
    prompt_rules_by_target: &[
        (Target::Static, "Target static-site Astro output (no SSR adapter)."),
        (
            Target::Workers,
            "Target server-rendered Astro with output:'server' and the Cloudflare adapter.",
        ),
    ],
    prompt_keywords: &["astro"],
    file_normalizer: Some(normalize_astro),
};

pub const VITE_REACT: Framework = Framework {
    id: "vite-react",
    default_target: Target::Static,
    supported_targets: &[Target::Static],
    added_dependencies: &[("react", "latest"), ("react-dom", "latest")],
    added_dev_dependencies: &[("vite", "latest"), ("@vitejs/plugin-react", "latest")],
    outputs_by_target: &[(
        Target::Static,
        FrameworkOutput {
            assets_dir: Some("dist"),
            worker_entry: None,
        },
    )],
    detector: detect_vite_react,
    prompt_rules_by_target: &[(Target::Static, "Target a Vite + React single-page application.")],
    prompt_keywords: &["vite", "react"],
    file_normalizer: None,
};

/// Used when no detector matches. No added dependencies, no normalizer;
/// the sandbox driver falls back to its own output-directory scan.
pub const STATIC_SITE: Framework = Framework {
    id: "static",
    default_target: Target::Static,
    supported_targets: &[Target::Static],
    added_dependencies: &[],
    added_dev_dependencies: &[],
    outputs_by_target: &[(
        Target::Static,
        FrameworkOutput {
            assets_dir: None,
            worker_entry: None,
        },
    )],
    detector: |_| false,
    prompt_rules_by_target: &[(
        Target::Static,
        "Produce a plain static site (HTML/CSS/JS) with no build step.",
    )],
    prompt_keywords: &[],
    file_normalizer: None,
};

/// Registry order; priority is insertion order (spec §9 "Framework
/// registry"). `STATIC_SITE` is never matched by detection — it is the
/// terminal fallback `resolve_framework` returns when nothing else fires.
pub const REGISTRY_ORDER: &[&Framework] = &[&NEXT, &ASTRO, &VITE_REACT];

fn detect_next(ctx: &DetectionContext) -> bool {
    ctx.has_dependency("next") || ctx.has_file_matching("next.config.")
}

fn detect_astro(ctx: &DetectionContext) -> bool {
    ctx.has_dependency("astro") || ctx.has_file_matching("astro.config.")
}

fn detect_vite_react(ctx: &DetectionContext) -> bool {
    ctx.has_dependency("vite") && ctx.has_dependency("react")
}

fn normalize_next(files: &mut Vec<GeneratedFile>, target: Target) {
    if target != Target::Workers {
        return;
    }
    const CANONICAL_CONFIG: &str = "const nextConfig = {\n  output: 'standalone',\n};\n\nmodule.exports = nextConfig;\n";

    upsert_file(files, "next.config.js", CANONICAL_CONFIG);
    files.retain(|f| f.path != "next.config.mjs" && f.path != "next.config.ts");
}

fn normalize_astro(files: &mut Vec<GeneratedFile>, target: Target) {
    let content = match target {
        Target::Workers => {
            "import { defineConfig } from 'astro/config';\nimport cloudflare from '@astrojs/cloudflare';\n\n\
             export default defineConfig({\n  output: 'server',\n  adapter: cloudflare(),\n});\n"
        }
        Target::Static => {
            "import { defineConfig } from 'astro/config';\n\nexport default defineConfig({});\n"
        }
    };
    upsert_file(files, "astro.config.mjs", content);
}

fn upsert_file(files: &mut Vec<GeneratedFile>, path: &str, content: &str) {
    if let Some(existing) = files.iter_mut().find(|f| f.path == path) {
        existing.content = content.to_string();
    } else {
        files.push(GeneratedFile {
            path: path.to_string(),
            content: content.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_dependency(name: &str) -> serde_json::Value {
        serde_json::json!({ "dependencies": { name: "^1.0.0" } })
    }

    #[test]
    fn next_detector_matches_on_dependency() {
        let package_json = ctx_with_dependency("next");
        let ctx = DetectionContext {
            package_json: Some(&package_json),
            file_paths: vec![],
        };
        assert!((NEXT.detector)(&ctx));
    }

    #[test]
    fn next_detector_matches_on_config_file() {
        let ctx = DetectionContext {
            package_json: None,
            file_paths: vec!["next.config.mjs"],
        };
        assert!((NEXT.detector)(&ctx));
    }

    #[test]
    fn vite_react_requires_both_dependencies() {
        let package_json = ctx_with_dependency("vite");
        let ctx = DetectionContext {
            package_json: Some(&package_json),
            file_paths: vec![],
        };
        assert!(!(VITE_REACT.detector)(&ctx));
    }

    #[test]
    fn static_site_detector_never_matches() {
        let ctx = DetectionContext {
            package_json: None,
            file_paths: vec![],
        };
        assert!(!(STATIC_SITE.detector)(&ctx));
    }

    #[test]
    fn normalize_next_replaces_mjs_config_with_canonical_js() {
        let mut files = vec![GeneratedFile {
            path: "next.config.mjs".to_string(),
            content: "export default {}".to_string(),
        }];
        normalize_next(&mut files, Target::Workers);
        assert!(files.iter().any(|f| f.path == "next.config.js"));
        assert!(!files.iter().any(|f| f.path == "next.config.mjs"));
    }

    #[test]
    fn normalize_astro_sets_server_output_for_workers() {
        let mut files = vec![];
        normalize_astro(&mut files, Target::Workers);
        let config = &files.iter().find(|f| f.path == "astro.config.mjs").unwrap().content;
        assert!(config.contains("output: 'server'"));
        assert!(config.contains("cloudflare()"));
    }

    #[test]
    fn normalize_astro_is_idempotent() {
        let mut files = vec![];
        normalize_astro(&mut files, Target::Static);
        let first_pass = files.clone();
        normalize_astro(&mut files, Target::Static);
        assert_eq!(files.len(), first_pass.len());
        assert_eq!(files[0].content, first_pass[0].content);
    }
}
