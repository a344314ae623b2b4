//! Startup wiring shared by `chat` and `ingest`: credentials, providers,
//! store builds and the router.

use ragway_agent::{Assistant, QueryRouter, RetrievalAugmentor};
use ragway_config::{AppConfig, ConfigError, RouterMode, SourceConfig};
use ragway_core::embedding::Embedder;
use ragway_core::error::IngestError;
use ragway_core::provider::{LanguageModel, ProviderModel};
use ragway_memory::{
    ConversationMemory, FileSource, IngestReport, StoreCatalog, StoreDescriptor, VectorStore,
    build_store, collect_origins,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

type BoxError = Box<dyn std::error::Error>;

pub fn load_config(path: &Path) -> Result<AppConfig, BoxError> {
    Ok(AppConfig::load_at(path).map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Fail early, with setup guidance, when no API key was resolved.
pub fn require_credentials(config: &AppConfig, config_path: &Path) -> Result<(), ConfigError> {
    if let Err(e) = config.require_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export GEMINI_KEY='...'       (Gemini, the default provider)");
        eprintln!("    export OPENAI_API_KEY='sk-...' (OpenAI)");
        eprintln!("    export RAGWAY_API_KEY='...'    (generic)");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", config_path.display());
        eprintln!();
        return Err(e);
    }
    Ok(())
}

/// The chat model (also the routing oracle) and the embedder.
pub fn model_and_embedder(
    config: &AppConfig,
) -> Result<(Arc<dyn LanguageModel>, Arc<dyn Embedder>), BoxError> {
    let registry = ragway_providers::build_from_config(config);

    let provider = ragway_providers::chat_provider(config, &registry)
        .ok_or("No default provider configured")?;
    let model: Arc<dyn LanguageModel> = Arc::new(
        ProviderModel::new(provider, &config.default_model, config.temperature)
            .with_max_tokens(config.max_tokens),
    );

    let embedder: Arc<dyn Embedder> = Arc::new(
        ragway_providers::embedder_from_config(config, &registry)
            .ok_or("No embedding provider configured")?,
    );

    Ok((model, embedder))
}

pub fn file_source(config: &AppConfig) -> Result<FileSource, IngestError> {
    FileSource::new(config.ingestion.chunk_size, config.ingestion.chunk_overlap)
}

/// Build one store from a file or directory.
pub async fn ingest_path(
    store_id: &str,
    path: &Path,
    source: &FileSource,
    embedder: &dyn Embedder,
) -> Result<(VectorStore, IngestReport), IngestError> {
    let origins: Vec<String> = collect_origins(path)
        .await?
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    build_store(store_id, &origins, source, embedder).await
}

/// Build every configured source into the catalog, in config order.
pub async fn build_catalog(
    sources: &[SourceConfig],
    source: &FileSource,
    embedder: &dyn Embedder,
) -> Result<(StoreCatalog, Vec<IngestReport>), BoxError> {
    let mut catalog = StoreCatalog::new();
    let mut reports = Vec::with_capacity(sources.len());

    for entry in sources {
        let (store, report) = ingest_path(&entry.id, &entry.path, source, embedder)
            .await
            .map_err(|e| format!("Failed to build store '{}': {e}", entry.id))?;
        let description = if entry.description.is_empty() {
            entry.id.clone()
        } else {
            entry.description.clone()
        };
        catalog.register(StoreDescriptor::new(&entry.id, description), Arc::new(store))?;
        reports.push(report);
    }

    Ok((catalog, reports))
}

pub fn build_router(config: &AppConfig, catalog: &StoreCatalog) -> Result<QueryRouter, BoxError> {
    match config.router.mode {
        RouterMode::Binary => {
            let store = catalog
                .descriptors()
                .next()
                .ok_or("No knowledge source configured; add a [[sources]] entry to config.toml")?;
            Ok(QueryRouter::binary(&store.id, &config.router.domain)
                .with_negative_markers(config.router.negative_markers.clone()))
        }
        RouterMode::Multi => Ok(QueryRouter::multi_store(catalog.descriptors().cloned().collect())),
    }
}

/// Everything `chat` needs: credentials, providers, stores, router, memory.
pub async fn build_assistant(config: &AppConfig, config_path: &Path) -> Result<Assistant, BoxError> {
    require_credentials(config, config_path)?;
    let (model, embedder) = model_and_embedder(config)?;

    let source = file_source(config)?;
    let (catalog, reports) = build_catalog(&config.sources, &source, embedder.as_ref()).await?;
    for report in &reports {
        info!(
            store = %report.store_id,
            segments = report.segments(),
            "Knowledge source ready"
        );
    }

    let router = build_router(config, &catalog)?;
    let augmentor = RetrievalAugmentor::new(router, model.clone(), embedder, catalog)
        .with_top_k(config.retrieval.top_k)
        .with_min_score(config.retrieval.min_score);

    Ok(Assistant::new(
        augmentor,
        model,
        ConversationMemory::new(config.memory.window),
    ))
}
