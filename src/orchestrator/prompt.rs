//! Prompt construction.

use crate::models::comment::ModelOutput;
use crate::models::context::ContextPayload;

const SYSTEM_PREAMBLE: &str = "\
You are a senior reviewer for Microsoft Dynamics 365 Business Central AL extensions. \
You review pull requests and leave precise, actionable comments.

Rules:
- Only comment on lines listed under \"Commentable lines\" for the file. Any other \
line cannot receive an inline comment.
- Use new-file line numbers exactly as they appear in the numbered excerpts.
- Order comments from most to least important.
- Put replacement code in \"suggestion\" as plain text without markdown fences; it \
replaces the commented line.
- Do not comment on style that the surrounding code already follows.
- \"disposition\" MUST be exactly one of: \"approve\", \"request_changes\", \"comment\".";

/// System prompt: reviewer role, rules, and the JSON reply schema.
pub fn system_prompt() -> String {
    let schema = schemars::schema_for!(ModelOutput);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{SYSTEM_PREAMBLE}\n\n\
         Reply with a single JSON object matching this schema and nothing else:\n\n\
         ```json\n{schema}\n```"
    )
}

/// Build the user prompt from the context payload.
pub fn build_prompt(payload: &ContextPayload) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("## Pull Request: {}\n\n", payload.title.trim()));
    if !payload.description.trim().is_empty() {
        prompt.push_str(&format!("{}\n\n", payload.description.trim()));
    }

    if let Some(ref extra) = payload.extra_context {
        prompt.push_str(&format!("## Additional Context\n\n{extra}\n\n"));
    }

    if !payload.object_metadata.is_empty() {
        let json = serde_json::to_string_pretty(&payload.object_metadata)
            .unwrap_or_else(|_| "[]".to_string());
        prompt.push_str(&format!("## Objects Touched\n\n```json\n{json}\n```\n\n"));
    }

    for file in &payload.files {
        prompt.push_str(&format!(
            "## File: {}\n\n```\n{}```\n\n",
            file.path, file.context_snippet_text
        ));
    }

    let valid_lines =
        serde_json::to_string_pretty(&payload.valid_lines).unwrap_or_else(|_| "{}".to_string());
    prompt.push_str(&format!(
        "## Commentable lines\n\n```json\n{valid_lines}\n```\n\n"
    ));

    prompt.push_str(
        "## Instructions\n\n\
         Review the changes above. Return one JSON object with:\n\
         - \"summary\": an overall assessment of the pull request\n\
         - \"disposition\": \"approve\", \"request_changes\" or \"comment\"\n\
         - \"comments\": an array of {\"path\", \"line\", \"remark\", \"suggestion\"}\n\n\
         If there is nothing to comment on, return an empty \"comments\" array.\n",
    );

    prompt
}
