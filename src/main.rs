//! Document Resolver
//!
//! Resolves one source reference and prints the outcome as JSON.

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use document_resolver::config::Config;
use document_resolver::document::{Options, SourceReference};
use document_resolver::pipeline::{DocumentPipeline, PipelineService};

#[derive(Parser, Debug)]
#[command(name = "document-resolver", version, about = "Resolve a document for viewing")]
struct Cli {
    /// Path or file:// reference of the document
    source: String,

    /// Record the document in the recent-documents list
    #[arg(long)]
    persistent: bool,

    /// Skip local viewers and escalate to a cloud viewer
    #[arg(long)]
    remote: bool,

    /// Password for encrypted office documents
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "document_resolver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Document Resolver v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Cache directory: {}", config.cache.dir.display());

    let pipeline = DocumentPipeline::from_config(&config).context("Failed to set up cache")?;
    let (handle, worker) = PipelineService::spawn(pipeline);

    let mut options = Options::new(SourceReference::parse(cli.source))
        .persistent(cli.persistent)
        .force_remote(cli.remote);
    if let Some(password) = cli.password {
        options = options.with_password(password);
    }

    let outcome = handle.open(options).await;
    handle.close().await;
    worker.await.context("Pipeline worker panicked")?;

    let report = match &outcome {
        Ok(result) => serde_json::to_value(result)?,
        Err(failure) => json!({
            "options": failure.options,
            "loaderType": failure.loader_type,
            "error": failure.error.to_string(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
