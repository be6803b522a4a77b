//! Prompt builders for the summarization and question-answering flows

/// Ask the model for a structured YAML summary of one file
pub fn build_file_analysis_prompt(file_path: &str, content: &str) -> String {
    format!(
        r#"You are a senior engineer documenting a codebase. Summarize the source file below.

File path: {file_path}

```
{content}
```

Respond with YAML only, using exactly this structure:

```yaml
file_description: "<one or two sentences on what the file does>"
file_info:
  file_name: "<file name>"
  package_name: "<package, module or namespace>"
  imports: ["<import>", "<import>"]
```

Rules:
- Quote every string value.
- Omit a field instead of writing an empty list or empty string.
- Do not add commentary outside the YAML block."#
    )
}

/// Ask the model which files of the summarized codebase matter for `question`
pub fn build_question_rel_files_prompt(question: &str, summary: &str) -> String {
    format!(
        r#"Below is a summary of every file in a codebase, followed by a question about it.

# Codebase summary
{summary}

# Question
{question}

List the files whose contents are needed to answer the question, most important first.
Respond with a YAML sequence only, one entry per file:

```yaml
- file: "<path exactly as written in the summary>"
  why: "<why this file is relevant>"
```

If no file is relevant, respond with an empty sequence: []"#
    )
}

/// Ask the model what one file contributes to answering `question`
pub fn build_question_rel_files_parse_prompt(
    question: &str,
    help_info: &str,
    file_path: &str,
    content: &str,
) -> String {
    let mut prompt = format!("# Question\n{question}\n\n");
    if !help_info.trim().is_empty() {
        prompt.push_str(&format!("# Known context\n{help_info}\n\n"));
    }
    prompt.push_str(&format!(
        r#"# File: {file_path}
```
{content}
```

Explain the parts of this file that help answer the question. Quote the relevant code and
describe how it behaves. If the file turns out to be irrelevant, say so in one sentence."#
    ));
    prompt
}

/// Header of the synthesis prompt; per-file analyses are appended after it in
/// discovery order
pub fn build_final_answer_prompt(question: &str, help_info: &str) -> String {
    let mut prompt = format!(
        "Answer the question below using the per-file analyses that follow. Combine them into \
         one coherent answer, cite file paths where useful, and say so if the analyses do not \
         contain enough information.\n\n# Question\n{question}\n\n"
    );
    if !help_info.trim().is_empty() {
        prompt.push_str(&format!("# Additional context\n{help_info}\n\n"));
    }
    prompt.push_str("# Per-file analyses\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_prompt_embeds_path_and_content() {
        let prompt = build_file_analysis_prompt("cmd/root.go", "package cmd");
        assert!(prompt.contains("File path: cmd/root.go"));
        assert!(prompt.contains("package cmd"));
        assert!(prompt.contains("file_description"));
        assert!(prompt.contains("package_name"));
    }

    #[test]
    fn discovery_prompt_embeds_question_and_summary() {
        let prompt = build_question_rel_files_prompt("What does it do?", "File: a.go");
        assert!(prompt.contains("What does it do?"));
        assert!(prompt.contains("File: a.go"));
        assert!(prompt.find("File: a.go") < prompt.find("What does it do?"));
    }

    #[test]
    fn file_prompt_omits_blank_help() {
        let without = build_question_rel_files_parse_prompt("q", "  ", "a.go", "code");
        assert!(!without.contains("Known context"));

        let with = build_question_rel_files_parse_prompt("q", "uses cobra", "a.go", "code");
        assert!(with.contains("# Known context\nuses cobra"));
        assert!(with.contains("# File: a.go"));
    }

    #[test]
    fn final_prompt_ends_with_analyses_header() {
        let prompt = build_final_answer_prompt("why?", "see docs");
        assert!(prompt.contains("# Question\nwhy?"));
        assert!(prompt.contains("# Additional context\nsee docs"));
        assert!(prompt.ends_with("# Per-file analyses\n"));
    }
}
