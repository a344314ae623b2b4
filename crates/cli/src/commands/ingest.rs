//! `ragway ingest`: build stores and report what was indexed.
//!
//! Without arguments every configured source is ingested; otherwise each
//! path becomes its own store, named after the file or directory.

use crate::startup;
use ragway_memory::IngestReport;
use std::path::{Path, PathBuf};

pub async fn run(
    config_path: &Path,
    paths: Vec<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = startup::load_config(config_path)?;
    startup::require_credentials(&config, config_path)?;
    let (_, embedder) = startup::model_and_embedder(&config)?;
    let source = startup::file_source(&config)?;

    let targets: Vec<(String, PathBuf)> = if paths.is_empty() {
        config
            .sources
            .iter()
            .map(|s| (s.id.clone(), s.path.clone()))
            .collect()
    } else {
        paths.into_iter().map(|p| (store_name(&p), p)).collect()
    };
    if targets.is_empty() {
        return Err("Nothing to ingest: pass paths or add [[sources]] to config.toml".into());
    }

    let mut reports = Vec::with_capacity(targets.len());
    for (id, path) in &targets {
        let (_, report) = startup::ingest_path(id, path, &source, embedder.as_ref()).await?;
        if !json {
            print_report(&report);
        }
        reports.push(report);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

fn store_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(report: &IngestReport) {
    println!("=== {} ===", report.store_id);
    for doc in &report.documents {
        println!("  {}: {} segments", doc.origin, doc.segments);
    }
    match report.dimension {
        Some(dim) => println!(
            "✅ {} embeddings added to store '{}' (dimension {dim})",
            report.embeddings, report.store_id
        ),
        None => println!("⚠️  Store '{}' is empty", report.store_id),
    }
    println!();
}
