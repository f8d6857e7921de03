use anyhow::Result;
use colored::Colorize;
use deckhand_core::{CreateSpec, ResourceKind, Reconciler};

use crate::cli::OutputFormat;
use crate::output::{print_value, print_warning};

pub async fn list(rec: &Reconciler, kind: ResourceKind, format: OutputFormat) -> Result<()> {
    let items = rec.list(kind).await?;
    print_value(&items, format)
}

/// A miss is reported, not treated as a failure.
pub async fn resolve(
    rec: &mut Reconciler,
    kind: ResourceKind,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    match rec.resolve(kind, name).await? {
        Some(found) => print_value(&found, format),
        None => {
            print_warning(&format!("No {kind} named {}", name.cyan()));
            Ok(())
        }
    }
}

pub async fn ensure_project(
    rec: &mut Reconciler,
    name: &str,
    description: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let project = rec
        .ensure_exists(name, &CreateSpec::Project { description })
        .await?;
    print_value(&project, format)
}
