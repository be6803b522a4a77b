//! Question-answering pipeline: discovery, per-file analysis, synthesis.

use crate::analysis::FileAnalyzer;
use crate::decoder::decode_relevant_files;
use crate::file_provider::FileContentProvider;
use crate::llm_provider::LLMProvider;
use crate::prompts::{build_final_answer_prompt, build_question_rel_files_prompt};
use crate::sanitizer::Sanitizer;
use crate::trace_logger::{self, FileTraceLogger, TraceLogger};
use codescribe_core::{
    FileFailurePolicy, PipelineConfig, PipelineStage, QuestionAnswer, RelevantFileEntry, Result,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

enum PipelineState {
    Discovering,
    Analyzing(Vec<RelevantFileEntry>),
    Synthesizing(Vec<RelevantFileEntry>),
    Done(QuestionAnswer),
}

impl PipelineState {
    fn name(&self) -> &'static str {
        match self {
            PipelineState::Discovering => "discovering",
            PipelineState::Analyzing(_) => "analyzing",
            PipelineState::Synthesizing(_) => "synthesizing",
            PipelineState::Done(_) => "done",
        }
    }
}

/// Answers a question about a codebase from its summary document.
///
/// Each call to [`AnswerPipeline::answer`] runs the stages once, in order, and
/// keeps no state between calls.
pub struct AnswerPipeline {
    provider: Arc<dyn LLMProvider>,
    files: Arc<dyn FileContentProvider>,
    sanitizer: Sanitizer,
    trace: Arc<dyn TraceLogger>,
    max_concurrent: usize,
    failure_policy: FileFailurePolicy,
}

impl AnswerPipeline {
    pub fn new(provider: Arc<dyn LLMProvider>, files: Arc<dyn FileContentProvider>) -> Self {
        Self {
            provider,
            files,
            sanitizer: Sanitizer::default(),
            trace: trace_logger::noop(),
            max_concurrent: 1,
            failure_policy: FileFailurePolicy::default(),
        }
    }

    /// Build a pipeline from the `[pipeline]` config section, opening the
    /// trace file when one is configured
    pub fn from_config(
        provider: Arc<dyn LLMProvider>,
        files: Arc<dyn FileContentProvider>,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let mut pipeline = Self::new(provider, files)
            .with_concurrency(config.max_concurrent_analyses)
            .with_failure_policy(config.failure_policy());

        if let Some(path) = &config.trace_log_path {
            let logger = FileTraceLogger::open(path)?;
            info!("Writing pipeline trace to {}", logger.log_path().display());
            pipeline = pipeline.with_trace(Arc::new(logger));
        }

        Ok(pipeline)
    }

    pub fn with_trace(mut self, trace: Arc<dyn TraceLogger>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Number of per-file analyses allowed in flight at once; 1 is sequential
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: FileFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FileFailurePolicy {
        self.failure_policy
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Answer `question` using the codebase `summary` document.
    ///
    /// `help_info` is optional extra context for the final answer; pass an
    /// empty string when there is none. Errors carry the stage they came from.
    pub async fn answer(
        &self,
        summary: &str,
        question: &str,
        help_info: &str,
    ) -> Result<QuestionAnswer> {
        let mut state = PipelineState::Discovering;

        loop {
            debug!("Answer pipeline state: {}", state.name());
            state = match state {
                PipelineState::Discovering => {
                    let entries = self
                        .discover(summary, question)
                        .await
                        .map_err(|e| e.in_stage(PipelineStage::Discovery))?;
                    PipelineState::Analyzing(entries)
                }
                PipelineState::Analyzing(entries) if entries.is_empty() => {
                    info!("No relevant files found, synthesizing without analyses");
                    PipelineState::Synthesizing(entries)
                }
                PipelineState::Analyzing(entries) => {
                    let entries = self
                        .analyze_all(question, entries)
                        .await
                        .map_err(|e| e.in_stage(PipelineStage::Analysis))?;
                    PipelineState::Synthesizing(entries)
                }
                PipelineState::Synthesizing(entries) => {
                    let answer = self
                        .synthesize(question, help_info, &entries)
                        .await
                        .map_err(|e| e.in_stage(PipelineStage::Synthesis))?;
                    PipelineState::Done(QuestionAnswer {
                        answer,
                        files: entries,
                    })
                }
                PipelineState::Done(answer) => return Ok(answer),
            };
        }
    }

    async fn discover(&self, summary: &str, question: &str) -> Result<Vec<RelevantFileEntry>> {
        let prompt = build_question_rel_files_prompt(question, summary);
        let response = self.provider.generate(&prompt).await?;
        let cleaned = self.sanitizer.sanitize(&response.content);

        let entries = match decode_relevant_files(&cleaned) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error parsing relevant-file list: {}", e);
                self.trace
                    .log_detail(&format!("undecodable relevant-file list: {}", e));
                self.trace.log_detail(&response.content);
                Vec::new()
            }
        };

        self.trace
            .log_detail("---------- files relevant to the question ----------");
        for entry in &entries {
            self.trace.log_detail(&entry.file_path);
            self.trace.log_detail(&entry.rationale);
            info!("Relevant file: {} ({})", entry.file_path, entry.rationale);
        }

        Ok(entries)
    }

    async fn analyze_all(
        &self,
        question: &str,
        mut entries: Vec<RelevantFileEntry>,
    ) -> Result<Vec<RelevantFileEntry>> {
        let analyzer = FileAnalyzer::new(self.provider.clone(), self.files.clone())
            .with_trace(self.trace.clone());
        let analyzer = &analyzer;
        let paths: Vec<String> = entries.iter().map(|e| e.file_path.clone()).collect();

        info!(
            "Analyzing {} files ({} at a time)",
            paths.len(),
            self.max_concurrent
        );

        // Outcomes arrive in discovery order and are applied after the last one
        let mut analyses = stream::iter(paths)
            .map(move |path| async move {
                let result = analyzer.analyze(question, "", &path).await;
                (path, result)
            })
            .buffered(self.max_concurrent);

        let mut outcomes: Vec<std::result::Result<String, String>> =
            Vec::with_capacity(entries.len());
        while let Some((path, result)) = analyses.next().await {
            match result {
                Ok(text) => outcomes.push(Ok(text)),
                Err(e) => match self.failure_policy {
                    FileFailurePolicy::Abort => {
                        error!("Analysis of {} failed: {}", path, e);
                        return Err(e);
                    }
                    FileFailurePolicy::Skip => {
                        warn!("Skipping {}: {}", path, e);
                        self.trace.log_detail(&format!("skipped {}: {}", path, e));
                        outcomes.push(Err(e.to_string()));
                    }
                },
            }
        }

        for (entry, outcome) in entries.iter_mut().zip(outcomes) {
            match outcome {
                Ok(text) => entry.analysis_result = text,
                Err(reason) => entry.skipped = Some(reason),
            }
        }

        Ok(entries)
    }

    async fn synthesize(
        &self,
        question: &str,
        help_info: &str,
        entries: &[RelevantFileEntry],
    ) -> Result<String> {
        let mut prompt = build_final_answer_prompt(question, help_info);
        for entry in entries.iter().filter(|e| !e.is_skipped()) {
            prompt.push_str(&format!("\n## {}\n{}\n", entry.file_path, entry.analysis_result));
        }

        info!("Synthesizing final answer");
        let response = self.provider.generate(&prompt).await?;
        Ok(response.content)
    }
}
