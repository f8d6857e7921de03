use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use deckhand_core::{ApplyOptions, DesiredState, Reconciler};

use crate::cli::OutputFormat;
use crate::output::print_value;

pub async fn apply(
    rec: &mut Reconciler,
    manifest: &Path,
    deploy: bool,
    force: bool,
    wait: Option<Duration>,
    format: OutputFormat,
) -> Result<()> {
    let desired = DesiredState::load(manifest)
        .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
    let options = ApplyOptions {
        deploy,
        force,
        wait: if deploy { wait } else { None },
    };
    let report = rec.apply(&desired, &options).await?;
    print_value(&report, format)?;
    super::deploy::check_outcome(report.outcome.as_ref())
}
