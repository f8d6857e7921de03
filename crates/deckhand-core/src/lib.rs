//! Reconciliation client for a deployment platform's HTTP API.
//!
//! The [`Reconciler`] drives remote projects, applications, services and
//! their environment variables toward a desired state. Every create or update
//! is preceded by a lookup by name, so running the same reconciliation twice
//! changes nothing the second time.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod envfile;
pub mod error;
pub mod manifest;
pub mod reconcile;
pub mod schema;
pub mod types;

pub use client::ApiClient;
pub use config::{ClientConfig, ReconcileConfig, mask_token};
pub use endpoints::EndpointTable;
pub use envfile::{EnvMap, load_env_file, parse_env};
pub use error::{ApiError, ApiErrorKind, Error, ErrorCategory, Result};
pub use manifest::DesiredState;
pub use reconcile::{ApplyOptions, ApplyReport, Reconciler};
pub use types::{
    AppPhase, AppStatus, ApplicationSpec, CreateSpec, DeploymentHandle, EnvFlags,
    EnvironmentVariable, ResourceKind, ResourceRef, ServiceSpec, SyncReport, TerminalStatus,
};
