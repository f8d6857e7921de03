pub mod apply;
pub mod auth;
pub mod deploy;
pub mod env;
pub mod resources;

use anyhow::{Context, Result};
use deckhand_core::{ResourceKind, ResourceRef, Reconciler};

/// Resolve an application by name or fail with a readable message.
pub(crate) async fn require_app(rec: &mut Reconciler, name: &str) -> Result<ResourceRef> {
    rec.resolve(ResourceKind::Application, name)
        .await?
        .with_context(|| format!("application \"{name}\" does not exist"))
}
