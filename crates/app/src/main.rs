use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_rag_core::config::{
    DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_OPENAI_BASE_URL,
};
use pdf_rag_core::{
    IngestionPipeline, QueryPipeline, RagConfig, RagContext, RawDocument,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Qdrant API key
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,

    /// OpenAI API key used for embeddings and answers
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    /// Embedding model name
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embedding vector size; must match the model and the collection
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Chat model used to answer questions
    #[arg(long, env = "COMPLETION_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
    completion_model: String,

    /// Timeout for every upstream request, in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and store a PDF, or every PDF below a folder.
    Ingest {
        /// Single PDF file to ingest.
        #[arg(long, conflicts_with = "folder", required_unless_present = "folder")]
        file: Option<PathBuf>,
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Answer a question from the ingested documents.
    Ask {
        /// Question to answer
        #[arg(long)]
        question: String,
        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Report which dependencies are initialized.
    Health {
        /// Try to initialize before reporting.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
}

impl Cli {
    fn rag_config(&self) -> RagConfig {
        RagConfig {
            qdrant_url: self.qdrant_url.clone(),
            qdrant_api_key: self.qdrant_api_key.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            embedding_model: self.embedding_model.clone(),
            embedding_dimensions: self.embedding_dimensions,
            completion_model: self.completion_model.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let context = RagContext::live(cli.rag_config());
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    match cli.command {
        Command::Ingest { file, folder } => {
            let pipeline = IngestionPipeline::default();

            if let Some(folder) = folder {
                let report = pipeline
                    .ingest_folder_best_effort(&context, &folder)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
                }
                for ingested in &report.ingested {
                    println!("{} chunks from {}", ingested.chunk_count, ingested.path.display());
                }
                println!(
                    "{} chunks ingested from {} file(s), {} skipped, at {}",
                    report.chunk_count(),
                    report.ingested.len(),
                    report.skipped_files.len(),
                    Utc::now().to_rfc3339()
                );
                if report.ingested.is_empty() {
                    return Ok(ExitCode::FAILURE);
                }
            } else if let Some(file) = file {
                let document = RawDocument::from_path(&file)
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                let chunk_count = pipeline
                    .ingest(&context, &document)
                    .await
                    .map_err(|error| anyhow::anyhow!("failed to ingest {}: {error}", file.display()))?;

                println!(
                    "PDF processed: created {chunk_count} text chunks at {}. You can ask questions now.",
                    Utc::now().to_rfc3339()
                );
            }
        }
        Command::Ask { question, json } => {
            let result = QueryPipeline::default()
                .answer(&context, &question)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("answer: {}", result.answer);
                for (rank, chunk) in result.relevant.iter().enumerate() {
                    println!("[{}] score={:.4}\n{}", rank + 1, chunk.score, chunk.content);
                }
            }
        }
        Command::Health { check } => {
            if check {
                if let Err(error) = context.ensure_ready().await {
                    warn!(error = %error, "dependencies unavailable");
                }
            }

            let health = context.health();
            println!("{}", serde_json::to_string_pretty(&health)?);
            if check && !health.is_healthy() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
