use std::time::Duration;

use anyhow::Result;
use deckhand_core::{DeploymentHandle, Reconciler, TerminalStatus};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::output::print_value;

#[derive(Serialize)]
struct DeployOutput<'a> {
    #[serde(flatten)]
    handle: &'a DeploymentHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a TerminalStatus>,
}

pub async fn deploy(
    rec: &mut Reconciler,
    app: &str,
    force: bool,
    wait: Option<Duration>,
    format: OutputFormat,
) -> Result<()> {
    let app = super::require_app(rec, app).await?;
    let handle = rec.deploy(&app, force).await?;
    let outcome = match wait {
        Some(timeout) => Some(rec.wait_for_deployment(&handle, timeout).await?),
        None => None,
    };
    print_value(
        &DeployOutput {
            handle: &handle,
            outcome: outcome.as_ref(),
        },
        format,
    )?;
    check_outcome(outcome.as_ref())
}

pub async fn status(rec: &mut Reconciler, app: &str, format: OutputFormat) -> Result<()> {
    let app = super::require_app(rec, app).await?;
    let status = rec.status(&app).await?;
    print_value(&status, format)
}

/// A wait that did not succeed fails the command.
pub fn check_outcome(outcome: Option<&TerminalStatus>) -> Result<()> {
    match outcome {
        Some(status) if !status.is_success() => anyhow::bail!("Deployment {status}"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_success_passes() {
        assert!(check_outcome(None).is_ok());
        assert!(check_outcome(Some(&TerminalStatus::Succeeded)).is_ok());

        let err = check_outcome(Some(&TerminalStatus::TimedOut("building".into()))).unwrap_err();
        assert_eq!(err.to_string(), "Deployment timed out (last status: building)");
        assert!(check_outcome(Some(&TerminalStatus::Failed("exited".into()))).is_err());
    }
}
