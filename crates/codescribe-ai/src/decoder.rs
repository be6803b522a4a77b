//! Structured decoding of sanitized model output.

use codescribe_core::{DecodeError, FileSummary, RelevantFileEntry};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct FileSummaryDocument {
    #[serde(default)]
    file_description: Option<String>,
    #[serde(default)]
    file_info: Option<FileInfoDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct FileInfoDocument {
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    package_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoveredFile {
    #[serde(default, alias = "file_path", alias = "path")]
    file: Option<String>,
    #[serde(default, alias = "reason", alias = "rationale")]
    why: Option<String>,
}

/// Accept a sequence of scalars, a single scalar, or null
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    })
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Decode a file-summary record (`file_description` + `file_info`)
pub fn decode_file_summary(text: &str) -> Result<FileSummary, DecodeError> {
    let value: Value = serde_yaml::from_str(text)?;
    if !value.is_mapping() {
        return Err(DecodeError::Shape(format!(
            "expected a file summary mapping, found {}",
            kind(&value)
        )));
    }

    let document: FileSummaryDocument = serde_yaml::from_value(value)?;
    let info = document.file_info.unwrap_or_default();

    Ok(FileSummary {
        file_description: document.file_description.unwrap_or_default(),
        file_name: info.file_name.unwrap_or_default(),
        package_name: info.package_name.unwrap_or_default(),
        imports: info.imports,
    })
}

/// Decode the discovery stage's list of relevant files.
///
/// Empty input and an empty sequence both decode to an empty list. A mapping
/// holding a single sequence (`files: [...]`) is unwrapped. Entries without a
/// path are dropped and repeated paths keep their first occurrence.
pub fn decode_relevant_files(text: &str) -> Result<Vec<RelevantFileEntry>, DecodeError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_yaml::from_str(text)?;
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(_) => value,
        Value::Mapping(ref map) if map.len() == 1 => match map.values().next() {
            Some(inner @ Value::Sequence(_)) => inner.clone(),
            _ => {
                return Err(DecodeError::Shape(
                    "expected a sequence of relevant files, found a mapping".to_string(),
                ))
            }
        },
        other => {
            return Err(DecodeError::Shape(format!(
                "expected a sequence of relevant files, found {}",
                kind(&other)
            )))
        }
    };

    let discovered: Vec<DiscoveredFile> = serde_yaml::from_value(items)?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(discovered.len());
    for item in discovered {
        let path = match item.file.map(|f| f.trim().to_string()) {
            Some(path) if !path.is_empty() => path,
            _ => continue,
        };
        if !seen.insert(path.clone()) {
            debug!("Dropping duplicate relevant file: {}", path);
            continue;
        }
        entries.push(RelevantFileEntry::new(
            path,
            item.why.unwrap_or_default().trim(),
        ));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::sanitize;

    #[test]
    fn decodes_file_summary() {
        let text = "file_description: \"parses CLI args\"\nfile_info:\n  file_name: main.go\n  package_name: cmd\n  imports: [\"fmt\",\"os\"]";
        let summary = decode_file_summary(text).unwrap();

        assert_eq!(summary.file_description, "parses CLI args");
        assert_eq!(summary.file_name, "main.go");
        assert_eq!(summary.package_name, "cmd");
        assert_eq!(summary.imports, vec!["fmt", "os"]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let summary = decode_file_summary("file_description: only this").unwrap();
        assert_eq!(summary.file_description, "only this");
        assert!(summary.package_name.is_empty());
        assert!(summary.imports.is_empty());
    }

    #[test]
    fn imports_tolerate_scalar_and_nulls() {
        let single = decode_file_summary("file_info:\n  imports: fmt").unwrap();
        assert_eq!(single.imports, vec!["fmt"]);

        let with_null = decode_file_summary("file_info:\n  imports:\n    - fmt\n    - ~\n    - 42").unwrap();
        assert_eq!(with_null.imports, vec!["fmt", "42"]);
    }

    #[test]
    fn prose_is_a_shape_error() {
        let err = decode_file_summary("This file parses arguments.").unwrap_err();
        assert!(matches!(err, DecodeError::Shape(_)));
    }

    #[test]
    fn broken_yaml_is_a_yaml_error() {
        let err = decode_file_summary("file_info: [unclosed").unwrap_err();
        assert!(matches!(err, DecodeError::Yaml(_)));
    }

    #[test]
    fn decodes_relevant_files_in_order() {
        let text = "- file: cmd/question.go\n  why: defines the command\n- file: internal/usecase/ai_code.go\n  why: implements the pipeline";
        let entries = decode_relevant_files(text).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_path, "cmd/question.go");
        assert_eq!(entries[0].rationale, "defines the command");
        assert_eq!(entries[1].file_path, "internal/usecase/ai_code.go");
        assert!(entries.iter().all(|e| e.analysis_result.is_empty()));
    }

    #[test]
    fn relevant_files_accept_alternate_keys() {
        let text = "- path: a.rs\n  reason: first\n- file_path: b.rs\n  rationale: second";
        let entries = decode_relevant_files(text).unwrap();
        assert_eq!(entries[0], RelevantFileEntry::new("a.rs", "first"));
        assert_eq!(entries[1], RelevantFileEntry::new("b.rs", "second"));
    }

    #[test]
    fn duplicate_and_blank_paths_are_dropped() {
        let text = "- file: a.rs\n  why: one\n- file: \"  \"\n  why: blank\n- file: a.rs\n  why: again\n- why: no path";
        let entries = decode_relevant_files(text).unwrap();
        assert_eq!(entries, vec![RelevantFileEntry::new("a.rs", "one")]);
    }

    #[test]
    fn wrapped_sequence_is_unwrapped() {
        let entries = decode_relevant_files("files:\n  - file: a.rs\n    why: x").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn empty_discovery_is_valid() {
        assert!(decode_relevant_files("").unwrap().is_empty());
        assert!(decode_relevant_files("[]").unwrap().is_empty());
        assert!(decode_relevant_files("~").unwrap().is_empty());
    }

    #[test]
    fn unstructured_discovery_is_an_error() {
        assert!(decode_relevant_files("No files seem relevant to this question.").is_err());
        assert!(decode_relevant_files("answer: nothing\nconfidence: low").is_err());
    }

    #[test]
    fn fenced_and_unfenced_summaries_decode_identically() {
        let body = "file_description: \"parses CLI args\"\nfile_info:\n  package_name: cmd\n  imports: [\"fmt\",\"os\"]";
        let fenced = format!("```yaml\n{}\n```", body);

        let from_fenced = decode_file_summary(&sanitize(&fenced)).unwrap();
        let from_plain = decode_file_summary(body).unwrap();
        assert_eq!(from_fenced, from_plain);
    }
}
