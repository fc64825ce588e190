use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use visadoc_core::{
    classify, AnalysisMode, AnalysisOutcome, DocumentProcessor, DocumentStore, InMemoryStore,
    LlmService, ParsedDocument, ProviderKind, ServiceConfig, TextChunker,
};

#[derive(Parser)]
#[command(name = "visadoc")]
#[command(version, about = "Parse immigration PDF forms and analyze them with an LLM")]
struct Cli {
    /// Path to config file (YAML). Defaults to <config dir>/visadoc/config.yaml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log per-step extraction timings
    #[arg(long, global = true)]
    profile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse one or more PDFs and print what was extracted
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the parsed documents as one JSON array
        #[arg(long)]
        json: bool,
    },

    /// Classify a PDF, or raw text with --text
    Classify {
        file: Option<PathBuf>,

        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
    },

    /// Split a PDF's text into overlapping chunks
    Chunks {
        file: PathBuf,

        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Run an LLM analysis over a PDF
    Analyze {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "comprehensive")]
        mode: ModeArg,

        /// Question to answer (repeatable)
        #[arg(short, long = "question")]
        questions: Vec<String>,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Ask a single question about a PDF
    Ask {
        file: PathBuf,
        question: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Translate a PDF's content into another language
    Translate {
        file: PathBuf,

        #[arg(short, long)]
        language: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Rewrite a PDF's content in plain language
    Simplify {
        file: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Generate frequently asked questions for a PDF
    Faq {
        file: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Comprehensive,
    Summary,
    Qa,
}

#[derive(clap::Args)]
struct LlmArgs {
    /// LLM provider: openai, anthropic, or local
    #[arg(long)]
    provider: Option<ProviderKind>,

    #[arg(long)]
    model: Option<String>,

    /// Base URL for the provider API
    #[arg(long)]
    base_url: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());
    if cli.profile {
        config.extraction.profile_steps = true;
    }

    match cli.command {
        Command::Parse { files, json } => parse_files(&config, &files, json, &mut std::io::stdout().lock()),
        Command::Classify { file, text } => classify_input(&config, file.as_deref(), text),
        Command::Chunks {
            file,
            chunk_size,
            overlap,
        } => print_chunks(&config, &file, chunk_size, overlap),
        Command::Analyze {
            file,
            mode,
            questions,
            llm,
        } => {
            let mode = match mode {
                ModeArg::Comprehensive => AnalysisMode::Comprehensive { questions },
                ModeArg::Summary => AnalysisMode::Summary,
                ModeArg::Qa => {
                    if questions.is_empty() {
                        bail!("--mode qa needs at least one --question");
                    }
                    AnalysisMode::QuestionAnswering { questions }
                }
            };
            analyze(config, &file, mode, llm).await
        }
        Command::Ask {
            file,
            question,
            llm,
        } => {
            let mode = AnalysisMode::QuestionAnswering {
                questions: vec![question],
            };
            analyze(config, &file, mode, llm).await
        }
        Command::Translate {
            file,
            language,
            llm,
        } => {
            let mode = AnalysisMode::Translate {
                target_language: language,
            };
            analyze(config, &file, mode, llm).await
        }
        Command::Simplify { file, llm } => analyze(config, &file, AnalysisMode::Simplify, llm).await,
        Command::Faq { file, llm } => analyze(config, &file, AnalysisMode::Faq, llm).await,
    }
}

fn load_config(explicit: Option<&Path>) -> ServiceConfig {
    if let Some(path) = explicit {
        eprintln!("📋 Loaded config from: {}", path.display());
        return ServiceConfig::load_with_fallback(Some(path));
    }

    let default_path = dirs::config_dir().map(|dir| dir.join("visadoc").join("config.yaml"));
    match default_path.filter(|p| p.exists()) {
        Some(path) => {
            eprintln!("📋 Loaded config from: {}", path.display());
            ServiceConfig::load_with_fallback(Some(path))
        }
        None => ServiceConfig::default(),
    }
}

/// Results go to `out`; progress and failures go to stderr.
fn parse_files(config: &ServiceConfig, files: &[PathBuf], json: bool, out: &mut impl Write) -> Result<()> {
    let processor = DocumentProcessor::from_config(&config.extraction);
    let store = InMemoryStore::new();
    let mut parsed_json = Vec::new();
    let mut failures = 0;

    for path in files {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("❌ {}: {e}", path.display());
                failures += 1;
                continue;
            }
        };

        let hash = visadoc_core::storage::calculate_content_hash(&bytes);
        if let Some(existing) = store.find_by_hash(&hash) {
            eprintln!("↩️  {} duplicates {} ({})", path.display(), existing.filename, existing.id);
            continue;
        }

        let name = file_name(path);
        match processor.parse_bytes(&bytes, Some(&name)) {
            Ok(parsed) => {
                if json {
                    parsed_json.push(serde_json::to_value(&parsed)?);
                } else {
                    print_parsed(out, path, &parsed)?;
                }
                store.insert_document(&name, &bytes, parsed);
            }
            Err(e) => {
                eprintln!("❌ {}: {}", path.display(), e.report().message);
                failures += 1;
            }
        }
    }

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&parsed_json)?)?;
    } else {
        writeln!(out, "\n📚 Stored documents: {}", store.stats().documents)?;
        for entry in store.list_documents() {
            writeln!(
                out,
                "   - {} {} [{}] confidence {:.2}",
                entry.id, entry.filename, entry.document_type, entry.confidence_score
            )?;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed", files.len());
    }
    Ok(())
}

fn print_parsed(out: &mut impl Write, path: &Path, doc: &ParsedDocument) -> std::io::Result<()> {
    let summary = DocumentProcessor::document_summary(doc);
    writeln!(out, "✅ {}", path.display())?;
    writeln!(out, "   - Type: {}", summary.document_type)?;
    writeln!(out, "   - Pages: {}", summary.page_count)?;
    writeln!(out, "   - Characters: {}", summary.text_length)?;
    writeln!(out, "   - Form fields: {}", summary.form_fields_count)?;
    writeln!(out, "   - Tables: {}", summary.tables_count)?;
    writeln!(out, "   - Images: {}", summary.images_count)?;
    writeln!(out, "   - Confidence: {:.2}", summary.confidence_score)?;
    if !doc.metadata.title.is_empty() {
        writeln!(out, "   - Title: {}", doc.metadata.title)?;
    }
    Ok(())
}

fn classify_input(config: &ServiceConfig, file: Option<&Path>, text: Option<String>) -> Result<()> {
    let document_type = match (file, text) {
        (_, Some(text)) => classify(&text),
        (Some(path), None) => {
            let processor = DocumentProcessor::from_config(&config.extraction);
            processor.parse_file(path)?.document_type
        }
        (None, None) => bail!("provide a PDF path or --text"),
    };
    println!("{document_type}");
    Ok(())
}

fn print_chunks(
    config: &ServiceConfig,
    file: &Path,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let chunker = TextChunker::new(
        chunk_size.unwrap_or(config.chunking.chunk_size),
        overlap.unwrap_or(config.chunking.overlap),
    )?;
    let processor = DocumentProcessor::from_config(&config.extraction);
    let doc = processor.parse_file(file)?;

    let chunks = chunker.chunk(&doc.full_text);
    println!("✂️  {} chunk(s) from {}", chunks.len(), file.display());
    for (i, chunk) in chunks.iter().enumerate() {
        println!("\n--- chunk {} ({} chars) ---", i + 1, chunk.chars().count());
        println!("{chunk}");
    }
    Ok(())
}

async fn analyze(mut config: ServiceConfig, file: &Path, mode: AnalysisMode, llm: LlmArgs) -> Result<()> {
    apply_llm_overrides(&mut config, &llm);

    let processor = DocumentProcessor::from_config(&config.extraction);
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let name = file_name(file);
    let parsed = processor.parse_bytes(&bytes, Some(&name))?;

    let store = InMemoryStore::new();
    let stored = store.insert_document(&name, &bytes, parsed);

    let service = LlmService::from_config(&config)?;
    eprintln!(
        "🤖 {} analysis of {} ({}) with {}/{}",
        mode.name(),
        name,
        stored.parsed.document_type,
        service.provider().kind(),
        service.provider().model()
    );

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let outcome = service
        .run(&stored.parsed, &mode, &cancel)
        .await
        .map_err(analysis_error)?;

    if llm.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    if let Some(saved) = store.insert_analysis(&stored.id, outcome) {
        tracing::debug!(analysis = %saved.id, document = %stored.id, "analysis stored");
    }
    Ok(())
}

fn analysis_error(e: visadoc_core::Error) -> anyhow::Error {
    let report = e.report();
    anyhow!("analysis failed ({:?}): {}", report.kind, report.message)
}

/// Flags beat environment, environment beats the config file.
fn apply_llm_overrides(config: &mut ServiceConfig, llm: &LlmArgs) {
    let provider = &mut config.provider;
    if let Some(kind) = llm.provider {
        provider.kind = kind;
    }
    if let Some(model) = &llm.model {
        provider.model = model.clone();
    }
    if let Some(base_url) = &llm.base_url {
        provider.base_url = Some(base_url.clone());
    }

    let key_var = match provider.kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::Local => "LOCAL_LLM_API_KEY",
    };
    if let Ok(key) = std::env::var(key_var) {
        provider.api_key = Some(key);
    }
}

fn print_outcome(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Comprehensive(analysis) => {
            println!("\n📝 Summary\n{}", analysis.summary);
            println!("\n🔑 Key information");
            for (key, value) in &analysis.key_information {
                println!("   - {key}: {value}");
            }
            if !analysis.form_fields_analysis.is_empty() {
                println!("\n🧾 Form fields");
                for field in &analysis.form_fields_analysis {
                    println!("   - {} (page {}): {}", field.field_name, field.page_number, field.guidance);
                }
            }
            println!("\n✅ Recommendations");
            for line in analysis.recommendations.iter().filter(|l| !l.trim().is_empty()) {
                println!("   {line}");
            }
            print_answers(&analysis.questions_answered);
            println!("\n📊 Confidence: {:.2}", analysis.confidence_score);
        }
        AnalysisOutcome::Summary(summary) => println!("\n📝 Summary\n{summary}"),
        AnalysisOutcome::QuestionAnswering(answers) => print_answers(answers),
        AnalysisOutcome::Translation {
            target_language,
            text,
        } => println!("\n🌐 Translation ({target_language})\n{text}"),
        AnalysisOutcome::Simplified(text) => println!("\n📖 Plain language\n{text}"),
        AnalysisOutcome::Faq(entries) => {
            println!("\n❓ FAQ");
            for entry in entries {
                println!("\nQ: {}\nA: {}", entry.question, entry.answer);
            }
        }
    }
}

fn print_answers(answers: &std::collections::BTreeMap<String, String>) {
    for (question, answer) in answers {
        println!("\n❓ {question}\n{answer}");
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string()
}
