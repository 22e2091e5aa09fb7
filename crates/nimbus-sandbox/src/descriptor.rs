//! Deployment descriptor (wrangler config) synthesis (spec §4.3 steps 3
//! and 6).

use nimbus_registry::Target;

/// The pre-build descriptor for Next-on-workers, written before `bunx
/// next build` runs so OpenNext packaging has a config to read.
#[must_use]
pub fn next_pre_build_descriptor(worker_name: &str) -> String {
    format!(
        "name = \"{worker_name}\"\n\
         main = \".open-next/worker.js\"\n\
         compatibility_date = \"2024-09-23\"\n\
         compatibility_flags = [\"nodejs_compat\"]\n\n\
         [assets]\n\
         directory = \".open-next/assets\"\n\
         binding = \"ASSETS\"\n"
    )
}

/// The final post-build descriptor, derived from the job's deterministic
/// worker name, the chosen `main` entry, and (where applicable) an
/// `[assets]` block.
#[must_use]
pub fn final_descriptor(worker_name: &str, main: &str, assets_dir: Option<&str>) -> String {
    let mut descriptor = format!(
        "name = \"{worker_name}\"\n\
         main = \"{main}\"\n\
         compatibility_date = \"2024-09-23\"\n\
         compatibility_flags = [\"nodejs_compat\"]\n"
    );

    if let Some(assets_dir) = assets_dir {
        descriptor.push_str(&format!(
            "\n[assets]\n\
             directory = \"{assets_dir}\"\n\
             binding = \"ASSETS\"\n"
        ));
    }

    descriptor
}

/// A trivial worker that forwards all requests to the `ASSETS` binding,
/// synthesized when a static project defines no worker entry of its own
/// (spec §4.3 step 6 "Static/default").
#[must_use]
pub fn passthrough_worker_source() -> &'static str {
    "export default {\n  async fetch(request, env) {\n    return env.ASSETS.fetch(request);\n  },\n};\n"
}

/// Which descriptor-synthesis branch a completed build falls into.
#[must_use]
pub fn requires_pre_build_descriptor(framework_id: &str, target: Target) -> bool {
    framework_id == "next" && target == Target::Workers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_pre_build_descriptor_references_opennext_paths() {
        let descriptor = next_pre_build_descriptor("nimbus-abc12345");
        assert!(descriptor.contains(".open-next/worker.js"));
        assert!(descriptor.contains(".open-next/assets"));
        assert!(descriptor.contains("nimbus-abc12345"));
    }

    #[test]
    fn final_descriptor_omits_assets_block_when_none() {
        let descriptor = final_descriptor("nimbus-abc12345", "worker.js", None);
        assert!(!descriptor.contains("[assets]"));
    }

    #[test]
    fn final_descriptor_includes_assets_block_when_present() {
        let descriptor = final_descriptor("nimbus-abc12345", "worker.js", Some("dist"));
        assert!(descriptor.contains("[assets]"));
        assert!(descriptor.contains("directory = \"dist\""));
    }

    #[test]
    fn only_next_on_workers_needs_pre_build_descriptor() {
        assert!(requires_pre_build_descriptor("next", Target::Workers));
        assert!(!requires_pre_build_descriptor("next", Target::Static));
        assert!(!requires_pre_build_descriptor("astro", Target::Workers));
    }
}
