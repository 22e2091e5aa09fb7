//! Prompt rule synthesis (spec §4.2 "Prompt synthesis"). A separate entry
//! point from detection: it only shapes the LLM system prompt and has no
//! runtime side effects on the generated tree.

use crate::frameworks::REGISTRY_ORDER;
use crate::resolve::resolve_target;
use crate::types::NimbusConfig;

const COMMON_RULES: &str =
    "Use real published package versions or \"latest\"; never invent a version string.";

const GENERIC_STATIC_RULE: &str = "Produce a plain static site (HTML/CSS/JS) with no build step.";

/// Select zero or one framework by scanning the lower-cased prompt for
/// `prompt_keywords`, and return a system-prompt fragment combining its
/// rules for the resolved target with the common rules block. Missing
/// keywords yield a generic static-site rule.
#[must_use]
pub fn prompt_rules_for(prompt: &str) -> String {
    let lower = prompt.to_lowercase();

    let selected = REGISTRY_ORDER
        .iter()
        .find(|framework| framework.prompt_keywords.iter().any(|kw| lower.contains(kw)));

    let framework_rule = match selected {
        Some(framework) => {
            let target = resolve_target(framework, &NimbusConfig::default(), prompt);
            framework.prompt_rules_for(target).unwrap_or(GENERIC_STATIC_RULE)
        }
        None => GENERIC_STATIC_RULE,
    };

    format!("{framework_rule}\n{COMMON_RULES}")
}
