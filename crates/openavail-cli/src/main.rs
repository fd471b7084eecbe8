use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod analyzer;
mod config_file;

use analyzer::TimedAnalyzer;
use config_file::ConfigFile;
use openavail_agent::Agent;
use openavail_llm::{ChatClient, EmbeddingsClient};
use openavail_registry::DoiRegistry;
use openavail_store::{
    sanitize_filename, BlobStore, DocStore, DocumentStatus, WorkerPool,
};

const DEFAULT_ANALYZE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// Mine scientific PDFs for data and code availability statements
#[derive(Parser, Debug)]
#[command(name = "openavail", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct LlmArgs {
    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    llm_url: Option<String>,

    /// Chat model name
    #[arg(long)]
    llm_model: Option<String>,

    /// Embedding model name (enables retrieval-assisted DOI resolution)
    #[arg(long)]
    embedding_model: Option<String>,

    /// API key for the LLM endpoint
    #[arg(long)]
    api_key: Option<String>,

    /// Skip Crossref/OpenAlex verification and enrichment
    #[arg(long)]
    no_registry: bool,
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// Path to the SQLite database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Path to the blob directory
    #[arg(long)]
    blobs: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single PDF and print the result as JSON
    Analyze {
        /// Path to the PDF file
        file_path: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,

        /// Path to output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload PDFs into the store and enqueue them as one job
    Queue {
        /// Paths to the PDF files
        files: Vec<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Run a worker pool draining the job queue
    Worker {
        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Number of concurrent workers
        #[arg(long)]
        concurrency: Option<usize>,

        /// Queue poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Show a job's progress and its documents
    Status {
        /// Job id
        job_id: String,

        #[command(flatten)]
        store: StoreArgs,

        /// Also print the job's log trail
        #[arg(long)]
        logs: bool,
    },

    /// Cancel a job; queued documents are marked failed
    Cancel {
        /// Job id
        job_id: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Put a crashed or failed document back on the queue
    Requeue {
        /// Document id
        document_id: String,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_file::load_config();

    match cli.command {
        Command::Analyze {
            file_path,
            llm,
            output,
        } => analyze(file_path, llm, output, &config).await,
        Command::Queue { files, store } => queue(files, store, &config),
        Command::Worker {
            llm,
            store,
            concurrency,
            poll_interval_ms,
        } => worker(llm, store, concurrency, poll_interval_ms, &config).await,
        Command::Status {
            job_id,
            store,
            logs,
        } => status(&job_id, store, logs, &config),
        Command::Cancel { job_id, store } => cancel(&job_id, store, &config),
        Command::Requeue {
            document_id,
            store,
        } => requeue(&document_id, store, &config),
    }
}

// ── configuration resolution: CLI flags > env vars > config file ────────

fn resolve(flag: Option<String>, env_var: &str, file_value: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var(env_var).ok())
        .or(file_value)
}

fn build_agent(llm: &LlmArgs, config: &ConfigFile) -> Agent {
    let file_llm = config.llm.clone().unwrap_or_default();
    let base_url = resolve(llm.llm_url.clone(), "OPENAVAIL_LLM_URL", file_llm.base_url);
    let model = resolve(llm.llm_model.clone(), "OPENAVAIL_LLM_MODEL", file_llm.model);
    let embedding_model = resolve(
        llm.embedding_model.clone(),
        "OPENAVAIL_EMBEDDING_MODEL",
        file_llm.embedding_model,
    );
    let api_key = resolve(llm.api_key.clone(), "OPENAVAIL_API_KEY", file_llm.api_key);

    let registry_cfg = config.registry.clone().unwrap_or_default();
    let registry_enabled = !llm.no_registry && registry_cfg.enabled.unwrap_or(true);

    let mut builder = Agent::builder();

    if let (Some(url), Some(model)) = (base_url.as_deref(), model.as_deref()) {
        builder = builder.chat(
            ChatClient::builder(url, model)
                .api_key(api_key.clone())
                .build(),
        );
    } else {
        tracing::info!("no chat model configured, extraction uses heuristics only");
    }

    if let (Some(url), Some(model)) = (base_url.as_deref(), embedding_model.as_deref()) {
        builder = builder.embeddings(EmbeddingsClient::new(url, model).with_api_key(api_key));
    }

    if registry_enabled {
        let registry = match registry_cfg.timeout_secs {
            Some(secs) => DoiRegistry::default().with_timeout(Duration::from_secs(secs)),
            None => DoiRegistry::default(),
        };
        builder = builder.registry(registry);
    }

    builder.build()
}

fn open_store(args: &StoreArgs, config: &ConfigFile) -> anyhow::Result<(DocStore, BlobStore)> {
    let file_store = config.store.clone().unwrap_or_default();
    let db_path = args
        .db
        .clone()
        .or_else(|| std::env::var("OPENAVAIL_DB").ok().map(PathBuf::from))
        .or(file_store.db_path.map(PathBuf::from))
        .unwrap_or_else(|| data_dir().join("openavail.db"));
    let blob_path = args
        .blobs
        .clone()
        .or_else(|| std::env::var("OPENAVAIL_BLOBS").ok().map(PathBuf::from))
        .or(file_store.blob_path.map(PathBuf::from))
        .unwrap_or_else(|| data_dir().join("blobs"));

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = DocStore::open(&db_path)?;
    let max_bytes = file_store
        .max_upload_mb
        .unwrap_or(DEFAULT_MAX_UPLOAD_MB)
        .saturating_mul(1024 * 1024);
    let blobs = BlobStore::new(blob_path)?.with_max_size(max_bytes);
    Ok((store, blobs))
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("openavail"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// ── commands ────────────────────────────────────────────────────────────

async fn analyze(
    file_path: PathBuf,
    llm: LlmArgs,
    output: Option<PathBuf>,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let agent = build_agent(&llm, config);
    let result = agent.analyze_file(&file_path).await?;

    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };
    writeln!(writer, "{}", serde_json::to_string_pretty(&result)?)?;
    Ok(())
}

fn queue(files: Vec<PathBuf>, store_args: StoreArgs, config: &ConfigFile) -> anyhow::Result<()> {
    if files.is_empty() {
        anyhow::bail!("No files given");
    }
    let (store, blobs) = open_store(&store_args, config)?;

    let mut doc_ids = Vec::with_capacity(files.len());
    for path in &files {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        let bytes = std::fs::read(path)?;
        let checksum = BlobStore::checksum(&bytes);
        if let Some(existing) = store.find_by_checksum(&checksum)? {
            println!(
                "{}: identical content already uploaded as document {}",
                path.display(),
                existing.id
            );
        }
        let blob_ref = blobs.put(&bytes)?;
        let filename = sanitize_filename(&path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        let doc = store.create_document(
            &filename,
            "application/pdf",
            bytes.len() as u64,
            &checksum,
            &blob_ref,
            None,
        )?;
        println!("uploaded {} as document {}", path.display(), doc.id);
        doc_ids.push(doc.id);
    }

    let job = store.create_job(&doc_ids, None)?;
    println!(
        "created job {} with {} document(s); run `openavail worker` to process it",
        job.id, job.progress.total
    );
    Ok(())
}

async fn worker(
    llm: LlmArgs,
    store_args: StoreArgs,
    concurrency: Option<usize>,
    poll_interval_ms: Option<u64>,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    let (store, blobs) = open_store(&store_args, config)?;
    let worker_cfg = config.worker.clone().unwrap_or_default();
    let concurrency = concurrency.or(worker_cfg.concurrency).unwrap_or(1);
    let poll_interval = Duration::from_millis(
        poll_interval_ms
            .or(worker_cfg.poll_interval_ms)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
    );
    let budget = Duration::from_secs(
        worker_cfg
            .analyze_timeout_secs
            .unwrap_or(DEFAULT_ANALYZE_TIMEOUT_SECS),
    );

    let agent = build_agent(&llm, config);
    let analyzer = Arc::new(TimedAnalyzer::new(agent, budget));

    let cancel = CancellationToken::new();
    let pool = WorkerPool::spawn(
        Arc::new(store),
        Arc::new(blobs),
        analyzer,
        openavail_store::WorkerConfig {
            concurrency,
            poll_interval,
        },
        cancel.clone(),
    );

    tracing::info!(concurrency, "worker pool running, Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down, waiting for in-flight documents");
    pool.shutdown().await;
    Ok(())
}

fn status(
    job_id: &str,
    store_args: StoreArgs,
    logs: bool,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    let (store, _blobs) = open_store(&store_args, config)?;
    let job = store.get_job(job_id)?;

    println!("job {}", job.id);
    println!("  status:   {}", job.status.as_str());
    println!("  progress: {}/{}", job.progress.current, job.progress.total);
    if let Some(started) = job.started_at {
        println!("  started:  {}", started.to_rfc3339());
    }
    if let Some(finished) = job.finished_at {
        println!("  finished: {}", finished.to_rfc3339());
    }

    let docs: Vec<_> = store
        .list_documents(None)?
        .into_iter()
        .filter(|d| d.job_id.as_deref() == Some(job_id))
        .collect();
    println!("  documents:");
    for doc in &docs {
        let note = match doc.status {
            DocumentStatus::Error => doc.error.clone().unwrap_or_default(),
            _ => String::new(),
        };
        println!(
            "    {}  {:<10}  {}  {}",
            doc.id,
            doc.status.as_str(),
            doc.filename,
            note
        );
    }

    if logs {
        println!("  log:");
        for entry in store.list_logs(job_id)? {
            println!(
                "    {} [{}] {} {}",
                entry.ts.to_rfc3339(),
                entry.level.as_str(),
                entry.op.unwrap_or_default(),
                entry.message.unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn cancel(job_id: &str, store_args: StoreArgs, config: &ConfigFile) -> anyhow::Result<()> {
    let (store, _blobs) = open_store(&store_args, config)?;
    let job = store.cancel_job(job_id)?;
    println!("job {} cancelled (status: {})", job.id, job.status.as_str());
    Ok(())
}

fn requeue(document_id: &str, store_args: StoreArgs, config: &ConfigFile) -> anyhow::Result<()> {
    let (store, _blobs) = open_store(&store_args, config)?;
    let doc = store.requeue_document(document_id)?;
    println!(
        "document {} requeued (status: {})",
        doc.id,
        doc.status.as_str()
    );
    Ok(())
}
