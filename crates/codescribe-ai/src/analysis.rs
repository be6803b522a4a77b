//! Single-file stages: per-file question analysis and code-file summarization

use crate::decoder::decode_file_summary;
use crate::file_provider::FileContentProvider;
use crate::llm_provider::LLMProvider;
use crate::prompts::{build_file_analysis_prompt, build_question_rel_files_parse_prompt};
use crate::sanitizer::Sanitizer;
use crate::trace_logger::{self, TraceLogger};
use codescribe_core::{CodeScribeError, FileSummary, PipelineStage, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Asks the model what one file contributes to a question
pub struct FileAnalyzer {
    provider: Arc<dyn LLMProvider>,
    files: Arc<dyn FileContentProvider>,
    trace: Arc<dyn TraceLogger>,
}

impl FileAnalyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, files: Arc<dyn FileContentProvider>) -> Self {
        Self {
            provider,
            files,
            trace: trace_logger::noop(),
        }
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceLogger>) -> Self {
        self.trace = trace;
        self
    }

    /// Read `file_path`, prompt the model with it and return the model's prose verbatim
    pub async fn analyze(&self, question: &str, prior_help: &str, file_path: &str) -> Result<String> {
        let content = self
            .files
            .read(file_path)
            .await
            .map_err(|source| CodeScribeError::FileRead {
                path: PathBuf::from(file_path),
                source,
            })?;

        let prompt = build_question_rel_files_parse_prompt(question, prior_help, file_path, &content);
        debug!(
            "Analyzing {} ({} bytes, prompt {} chars)",
            file_path,
            content.len(),
            prompt.len()
        );

        let response = self.provider.generate(&prompt).await?;

        self.trace.log_detail("######## per-file analysis ########");
        self.trace.log_detail(file_path);
        self.trace.log_detail(&response.content);
        info!("Analysis of {} complete", file_path);

        Ok(response.content)
    }
}

/// Produces a structured [`FileSummary`] for one source file
pub struct CodeSummarizer {
    provider: Arc<dyn LLMProvider>,
    sanitizer: Sanitizer,
    trace: Arc<dyn TraceLogger>,
}

impl CodeSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            sanitizer: Sanitizer::default(),
            trace: trace_logger::noop(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceLogger>) -> Self {
        self.trace = trace;
        self
    }

    /// Summarize one file.
    ///
    /// Returns the sanitized response text together with the decoded summary.
    /// When the text does not decode, the summary is all-empty (see
    /// [`FileSummary::is_empty`]) and callers should inspect the text instead.
    pub async fn summarize(&self, file_path: &str, content: &str) -> Result<(String, FileSummary)> {
        let prompt = build_file_analysis_prompt(file_path, content);
        let response = self
            .provider
            .generate(&prompt)
            .await
            .map_err(|e| CodeScribeError::from(e).in_stage(PipelineStage::Summarization))?;

        let cleaned = self.sanitizer.sanitize(&response.content);
        let summary = match decode_file_summary(&cleaned) {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Error parsing summary YAML for {}: {}", file_path, e);
                self.trace
                    .log_detail(&format!("undecodable summary for {}: {}", file_path, e));
                self.trace.log_detail(&cleaned);
                FileSummary::default()
            }
        };

        Ok((cleaned, summary))
    }
}
