//! The LLM system prompt: a static base instruction plus the framework
//! rules fragment from `nimbus_registry::prompt_rules_for` (spec §4.6
//! "one system message (static base prompt + framework rules from C4)").

/// The fixed portion of the system prompt, independent of framework or
/// prompt content.
const BASE_SYSTEM_PROMPT: &str = "You are a senior web engineer. Given a short description of a web \
application, emit a complete, minimal, working project as a JSON object of the shape \
{\"files\": [{\"path\": string, \"content\": string}, ...]}. Every file must be runnable as written: \
no placeholders, no TODOs, no omitted imports. Prefer the smallest project that satisfies the request. \
Return only the JSON object, with no surrounding prose or Markdown fences.";

#[must_use]
pub fn system_prompt_for(user_prompt: &str) -> String {
    format!("{BASE_SYSTEM_PROMPT}\n\n{}", nimbus_registry::prompt_rules_for(user_prompt))
}

/// The JSON-schema `response_format` descriptor constraining the file
/// tree shape (spec §4.6 "strict JSON-schema response-format
/// descriptor").
#[must_use]
pub fn file_tree_schema() -> serde_json::Value {
    serde_json::json!({
        "name": "file_tree",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "content": {"type": "string"}
                        },
                        "required": ["path", "content"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["files"],
            "additionalProperties": false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_includes_base_and_framework_rules() {
        let prompt = system_prompt_for("a nextjs dashboard");
        assert!(prompt.contains("senior web engineer"));
        assert!(prompt.contains("App Router"));
    }

    #[test]
    fn schema_requires_files_array_of_path_and_content() {
        let schema = file_tree_schema();
        assert_eq!(schema["schema"]["required"][0], "files");
    }
}
