use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structured summary of one source file as reported by the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_description: String,
    pub file_name: String,
    pub package_name: String,
    pub imports: Vec<String>,
}

impl FileSummary {
    /// True when no structured field was recovered from the model output.
    /// Callers should fall back to the raw response text in that case.
    pub fn is_empty(&self) -> bool {
        self.file_description.is_empty()
            && self.file_name.is_empty()
            && self.package_name.is_empty()
            && self.imports.is_empty()
    }

    /// Render one block of a codebase summary document
    pub fn summary_entry(&self, path: &str) -> String {
        format!(
            "File: {}\nDescription: {}\nPackage: {}\nImports: {}\n---\n",
            path,
            self.file_description,
            self.package_name,
            self.imports.join(",")
        )
    }
}

/// A file the discovery stage considers relevant to a question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantFileEntry {
    /// Unique within one question's result set
    pub file_path: String,
    pub rationale: String,
    /// Filled once by the per-file analysis stage
    #[serde(default)]
    pub analysis_result: String,
    /// Error text when the file was skipped under `FileFailurePolicy::Skip`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl RelevantFileEntry {
    pub fn new(file_path: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            rationale: rationale.into(),
            analysis_result: String::new(),
            skipped: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// Final output of one question-answering call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub answer: String,
    pub files: Vec<RelevantFileEntry>,
}

/// Named stages of the answer and summarization flows, used for error attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Discovery,
    Analysis,
    Synthesis,
    Summarization,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Discovery => write!(f, "discovery"),
            PipelineStage::Analysis => write!(f, "analysis"),
            PipelineStage::Synthesis => write!(f, "synthesis"),
            PipelineStage::Summarization => write!(f, "summarization"),
        }
    }
}

/// What the answer pipeline does when a single file cannot be analyzed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFailurePolicy {
    /// Abort the whole question on the first failing file
    #[default]
    Abort,
    /// Record the error on the entry and continue with the next file
    Skip,
}

impl FromStr for FileFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(FileFailurePolicy::Abort),
            "skip" => Ok(FileFailurePolicy::Skip),
            other => Err(format!(
                "Invalid file failure policy: {}. Must be one of: abort, skip",
                other
            )),
        }
    }
}

impl fmt::Display for FileFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFailurePolicy::Abort => write!(f, "abort"),
            FileFailurePolicy::Skip => write!(f, "skip"),
        }
    }
}
