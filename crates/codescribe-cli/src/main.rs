use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codescribe_ai::{
    AnswerPipeline, CodeSummarizer, FileContentProvider, FileTraceLogger, FsFileProvider,
    LLMProviderFactory, TraceLogger,
};
use codescribe_core::{CodeScribeConfig, ConfigManager, FileSummary, QuestionAnswer};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_SUMMARY_PATH: &str = "codebase_summary.txt";
const DEFAULT_CONFIG_PATH: &str = ".codescribe.toml";

#[derive(Parser)]
#[command(name = "codescribe")]
#[command(about = "CodeScribe - LLM-backed code summaries and codebase Q&A", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (pretty, json)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Configuration file (defaults to ./.codescribe.toml, then ~/.codescribe/config.toml)
    #[arg(short, long, global = true, env = "CODESCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize source files into structured descriptions
    Summarize {
        /// Files to summarize, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Append one summary entry per file to this document
        #[arg(long)]
        summary_out: Option<PathBuf>,

        /// Write each cleaned model response into this directory
        #[arg(long)]
        raw_dir: Option<PathBuf>,
    },

    /// Ask a question about a summarized codebase
    Question {
        /// The question to answer
        question: String,

        /// Codebase summary document produced by `summarize --summary-out`
        #[arg(short, long, default_value = DEFAULT_SUMMARY_PATH)]
        summary: PathBuf,

        /// Extra context for the final answer (overrides pipeline.help_info)
        #[arg(long)]
        help_info: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Where to write the file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path, force } = &cli.command {
        return init_config(path, *force);
    }

    let manager =
        ConfigManager::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let config = manager.config().clone();
    init_tracing(&config, cli.verbose);

    if let Some(path) = manager.config_path() {
        info!("Loaded configuration from {}", path.display());
    }

    match execute_command(&cli, &config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &CodeScribeConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let compact = config.logging.format == "compact";

    tracing_subscriber::registry()
        .with(filter)
        .with(compact.then(|| {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
        }))
        .with((!compact).then(|| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
        }))
        .init();
}

async fn execute_command(cli: &Cli, config: &CodeScribeConfig) -> Result<()> {
    match &cli.command {
        Commands::Summarize {
            files,
            summary_out,
            raw_dir,
        } => {
            handle_summarize(
                config,
                files,
                summary_out.as_deref(),
                raw_dir.as_deref(),
                cli.output,
            )
            .await
        }
        Commands::Question {
            question,
            summary,
            help_info,
        } => handle_question(config, question, summary, help_info.as_deref(), cli.output).await,
        Commands::Init { path, force } => init_config(path, *force),
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    ConfigManager::create_default_config(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{} {}",
        "Wrote default configuration to".green(),
        path.display()
    );
    Ok(())
}

fn open_trace(config: &CodeScribeConfig) -> Result<Option<Arc<dyn TraceLogger>>> {
    match &config.pipeline.trace_log_path {
        Some(path) => {
            let logger = FileTraceLogger::open(path)
                .with_context(|| format!("Failed to open trace log {}", path.display()))?;
            Ok(Some(Arc::new(logger)))
        }
        None => Ok(None),
    }
}

async fn handle_summarize(
    config: &CodeScribeConfig,
    files: &[PathBuf],
    summary_out: Option<&Path>,
    raw_dir: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let provider = LLMProviderFactory::create_from_config(&config.llm)
        .context("Failed to create LLM provider")?;
    info!(
        "Summarizing {} file(s) with {} ({})",
        files.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut summarizer = CodeSummarizer::new(provider);
    if let Some(trace) = open_trace(config)? {
        summarizer = summarizer.with_trace(trace);
    }

    if let Some(dir) = raw_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let reader = FsFileProvider::new();
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let display = path.to_string_lossy().to_string();
        let content = reader
            .read(&display)
            .await
            .with_context(|| format!("Failed to read {}", display))?;

        let (raw, summary) = summarizer.summarize(&display, &content).await?;

        if let Some(dir) = raw_dir {
            let raw_path = dir.join(raw_file_name(&display));
            std::fs::write(&raw_path, &raw)
                .with_context(|| format!("Failed to write {}", raw_path.display()))?;
        }

        if matches!(output, OutputFormat::Pretty) {
            print_summary(&display, &raw, &summary);
        }
        // Append as each file completes so earlier entries survive a later failure
        if let Some(out) = summary_out {
            append_document(out, &summary.summary_entry(&display))?;
        }
        results.push(serde_json::json!({
            "file": display,
            "summary": summary,
            "structured": !summary.is_empty(),
            "raw": raw,
        }));
    }

    if let Some(out) = summary_out {
        if matches!(output, OutputFormat::Pretty) {
            println!(
                "{} {}",
                "Summary entries appended to".green(),
                out.display()
            );
        }
    }

    if matches!(output, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}

async fn handle_question(
    config: &CodeScribeConfig,
    question: &str,
    summary_path: &Path,
    help_info: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question must not be empty");
    }

    let summary = tokio::fs::read_to_string(summary_path)
        .await
        .with_context(|| format!("Failed to read summary document {}", summary_path.display()))?;

    let provider = LLMProviderFactory::create_from_config(&config.llm)
        .context("Failed to create LLM provider")?;
    let pipeline = AnswerPipeline::from_config(
        provider,
        Arc::new(FsFileProvider::new()),
        &config.pipeline,
    )?;

    let help_info = help_info
        .or(config.pipeline.help_info.as_deref())
        .unwrap_or_default();
    let answer = pipeline.answer(&summary, question, help_info).await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&answer)?),
        OutputFormat::Pretty => print_answer(&answer),
    }

    Ok(())
}

fn raw_file_name(path: &str) -> String {
    let flattened: String = path
        .trim_start_matches("./")
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}.yaml", flattened)
}

fn append_document(path: &Path, document: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(document.as_bytes())?;
    Ok(())
}

fn print_summary(path: &str, raw: &str, summary: &FileSummary) {
    println!("{}", path.cyan().bold());
    if summary.is_empty() {
        println!(
            "  {}",
            "No structured summary; raw response follows".yellow()
        );
        for line in raw.lines() {
            println!("  {}", line);
        }
    } else {
        println!("  {}: {}", "Description".cyan(), summary.file_description.green());
        if !summary.package_name.is_empty() {
            println!("  {}: {}", "Package".cyan(), summary.package_name);
        }
        if !summary.imports.is_empty() {
            println!("  {}: {}", "Imports".cyan(), summary.imports.join(", "));
        }
    }
    println!();
}

fn print_answer(answer: &QuestionAnswer) {
    if !answer.files.is_empty() {
        println!("{}", "Files consulted".cyan().bold());
        for entry in &answer.files {
            match &entry.skipped {
                Some(reason) => println!(
                    "  {} {} ({})",
                    "✗".red(),
                    entry.file_path,
                    reason.red()
                ),
                None => println!(
                    "  {} {} {}",
                    "✓".green(),
                    entry.file_path,
                    entry.rationale.dimmed()
                ),
            }
        }
        println!();
    }

    println!("{}", "Answer".cyan().bold());
    println!("{}", answer.answer);
}
