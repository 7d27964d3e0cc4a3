use std::path::PathBuf;

use dotenvy::dotenv;
use tracing::{error, info, warn};

use workbench::application::use_cases::workbench::publish_document::PublishDocument;
use workbench::bootstrap::app_context::AppContext;
use workbench::bootstrap::config::Config;

const USAGE: &str = "usage: workbench [--stdout] <document.md> [image ...]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "workbench=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut to_stdout = false;
    let mut document: Option<PathBuf> = None;
    let mut images: Vec<PathBuf> = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--stdout" {
            to_stdout = true;
        } else if arg == "-h" || arg == "--help" {
            println!("{USAGE}");
            return Ok(());
        } else if document.is_none() {
            document = Some(PathBuf::from(arg));
        } else {
            images.push(PathBuf::from(arg));
        }
    }
    let Some(document) = document else {
        anyhow::bail!(USAGE);
    };

    let cfg = Config::from_env()?;
    info!(
        backend = ?cfg.transport_backend,
        style = ?cfg.reference_style,
        "starting workbench"
    );
    let ctx = AppContext::new(cfg).await?;
    let manager = ctx.image_manager();

    let uc = PublishDocument {
        manager: &manager,
        style: ctx.cfg.reference_style,
    };
    let report = uc.execute_paths(&document, &images).await?;

    for (tag, reason) in &report.failed {
        error!(tag = %tag, reason = %reason, "image_upload_failed");
    }
    for (tag, url) in &report.resolved {
        info!(tag = %tag, url = %url, "image_resolved");
    }

    if report.applied {
        if to_stdout {
            print!("{}", report.text);
        } else {
            tokio::fs::write(&document, &report.text).await?;
            info!(path = %document.display(), "document_rewritten");
        }
    } else if report.pending.is_empty() {
        info!(path = %document.display(), "no_placeholders_found");
    } else {
        let pending: Vec<String> = report.pending.iter().map(|t| t.to_string()).collect();
        warn!(pending = ?pending, "document_left_unchanged");
    }

    manager.flush_deletions().await;

    if !report.pending.is_empty() {
        anyhow::bail!("{} placeholder(s) still unresolved", report.pending.len());
    }
    Ok(())
}
