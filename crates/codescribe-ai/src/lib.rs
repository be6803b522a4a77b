pub mod analysis;
pub mod decoder;
pub mod file_provider;
pub mod llm_factory;
pub mod llm_provider;
pub mod pipeline;
pub mod prompts;
pub mod sanitizer;
pub mod trace_logger;

// Cloud LLM providers
#[cfg(feature = "openai-compatible")]
pub mod openai_compatible_provider;
#[cfg(feature = "openai-llm")]
pub mod openai_llm_provider;

pub use analysis::{CodeSummarizer, FileAnalyzer};
pub use decoder::{decode_file_summary, decode_relevant_files};
pub use file_provider::{FileContentProvider, FsFileProvider, InMemoryFileProvider};
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use pipeline::AnswerPipeline;
pub use sanitizer::{sanitize, SanitizeRule, Sanitizer};
pub use trace_logger::{FileTraceLogger, MemoryTraceLogger, NoopTraceLogger, TraceLogger};

#[cfg(feature = "openai-compatible")]
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
#[cfg(feature = "openai-llm")]
pub use openai_llm_provider::{OpenAIConfig, OpenAIProvider};
