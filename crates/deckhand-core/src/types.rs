//! Domain types shared by the client and the reconciler.
//!
//! These are the values callers hold on to: resolved references, env
//! variables with their flags, create requests, deployment handles and the
//! status snapshots used while waiting on a deployment. Wire-level records
//! live in [`crate::schema`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Kinds of remote resources the platform exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Project,
    Environment,
    Server,
    Application,
    Service,
    Deployment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Environment => "environment",
            Self::Server => "server",
            Self::Application => "application",
            Self::Service => "service",
            Self::Deployment => "deployment",
        }
    }

    /// Whether `resolve` can find this kind through a top-level list endpoint.
    pub fn is_listable(&self) -> bool {
        matches!(
            self,
            Self::Project | Self::Server | Self::Application | Self::Service
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote resource resolved by name during the current run.
///
/// The uuid is the durable identity; the name is what it was looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub uuid: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.name, self.uuid)
    }
}

/// Flags carried by every application environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvFlags {
    pub is_preview: bool,
    pub is_build_time: bool,
    pub is_literal: bool,
}

impl Default for EnvFlags {
    fn default() -> Self {
        Self {
            is_preview: false,
            is_build_time: false,
            is_literal: true,
        }
    }
}

/// An environment variable as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Server-assigned handle, only needed to address updates.
    #[serde(default)]
    pub uuid: Option<String>,
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    #[serde(default)]
    pub is_preview: bool,
    #[serde(default, alias = "is_buildtime")]
    pub is_build_time: bool,
    #[serde(default)]
    pub is_literal: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// What to send when `ensure_exists` misses and has to create.
///
/// The variant decides the resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSpec {
    Project {
        description: Option<String>,
    },
    Application(ApplicationSpec),
    Service(ServiceSpec),
}

impl CreateSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Project { .. } => ResourceKind::Project,
            Self::Application(_) => ResourceKind::Application,
            Self::Service(_) => ResourceKind::Service,
        }
    }

    /// The project the new resource will live in; projects have none.
    pub fn project_uuid(&self) -> Option<&str> {
        match self {
            Self::Project { .. } => None,
            Self::Application(app) => Some(&app.project_uuid),
            Self::Service(service) => Some(&service.project_uuid),
        }
    }
}

/// Git-backed application placement and build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSpec {
    pub project_uuid: String,
    pub server_uuid: String,
    pub environment_name: String,
    pub git_repository: String,
    pub git_branch: String,
    pub build_pack: String,
    pub ports_exposes: String,
    pub domains: Option<String>,
    pub instant_deploy: bool,
}

/// A managed service (database, object storage, ...) placed next to applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub service_type: String,
    pub project_uuid: String,
    pub server_uuid: String,
    pub environment_name: String,
    pub instant_deploy: bool,
}

/// Returned by `deploy`; the platform owns the deployment from here on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentHandle {
    pub deployment_uuid: String,
    pub application_uuid: String,
    pub message: Option<String>,
}

/// Coarse lifecycle phase derived from the platform's status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    Running,
    InProgress,
    Exited,
    Failed,
    Unknown,
}

impl AppPhase {
    /// Parse statuses like `running:healthy`, `exited:unhealthy` or `starting`.
    pub fn from_status(status: &str) -> Self {
        let head = status
            .split([':', ' ', '('])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match head.as_str() {
            "running" | "healthy" | "finished" | "success" | "succeeded" => Self::Running,
            "starting" | "restarting" | "building" | "in_progress" | "queued" | "deploying" => {
                Self::InProgress
            }
            "exited" | "stopped" => Self::Exited,
            "failed" | "error" | "degraded" | "cancelled" | "cancelled-by-user" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Running | Self::Exited | Self::Failed)
    }
}

/// Snapshot of an application's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppStatus {
    pub uuid: String,
    pub name: String,
    pub status: String,
    pub fqdn: Option<String>,
    pub phase: AppPhase,
}

/// How a deployment wait ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum TerminalStatus {
    Succeeded,
    Failed(String),
    TimedOut(String),
}

impl TerminalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(status) => write!(f, "failed ({status})"),
            Self::TimedOut(status) => write!(f, "timed out (last status: {status})"),
        }
    }
}

/// Keys touched by one `sync_environment` call, each list in desired order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    /// Reserved keys dropped from the desired set before diffing.
    pub excluded: Vec<String>,
}

impl SyncReport {
    /// Number of write calls the sync issued.
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}
