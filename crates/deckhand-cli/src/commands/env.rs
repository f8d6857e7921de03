use std::path::Path;

use anyhow::{Context, Result};
use deckhand_core::{EnvFlags, Reconciler, load_env_file};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::output::print_value;

/// One row of `env list`. Values are shown as stored.
#[derive(Serialize)]
struct EnvRow<'a> {
    key: &'a str,
    value: &'a str,
    preview: bool,
    build_time: bool,
}

pub async fn list(rec: &mut Reconciler, app: &str, format: OutputFormat) -> Result<()> {
    let app = super::require_app(rec, app).await?;
    let vars = rec.list_envs(&app).await?;
    let rows: Vec<EnvRow<'_>> = vars
        .iter()
        .map(|var| EnvRow {
            key: &var.key,
            value: &var.value,
            preview: var.is_preview,
            build_time: var.is_build_time,
        })
        .collect();
    print_value(&rows, format)
}

pub async fn sync(
    rec: &mut Reconciler,
    app: &str,
    file: &Path,
    preview: bool,
    build_time: bool,
    format: OutputFormat,
) -> Result<()> {
    let desired = load_env_file(file)
        .with_context(|| format!("Failed to read env file {}", file.display()))?;
    let app = super::require_app(rec, app).await?;
    let flags = EnvFlags {
        is_preview: preview,
        is_build_time: build_time,
        ..rec.config().env_flags
    };
    let reserved = rec.config().reserved_keys.clone();
    let report = rec
        .sync_environment_with(&app, &desired, &reserved, flags)
        .await?;
    tracing::info!(
        app = %app.name,
        created = report.created.len(),
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "env sync finished"
    );
    print_value(&report, format)
}
