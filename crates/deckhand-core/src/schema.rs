//! Request and response records, one per endpoint.
//!
//! Responses ignore unknown fields so additive API changes don't break
//! parsing. List endpoints are accepted either as a bare array or wrapped in
//! `{"data": [...]}`.

use serde::{Deserialize, Serialize};

use crate::types::{ApplicationSpec, EnvFlags, ServiceSpec};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

/// Anything listed with a uuid and a name: projects, servers, applications, services.
///
/// Application and service rows may also say which project owns them.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_uuid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDetail {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub environments: Vec<EnvironmentSummary>,
}

/// Environments are addressed by name; older platform versions only expose a numeric id.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSummary {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

impl EnvironmentSummary {
    pub fn handle(&self) -> String {
        match (&self.uuid, self.id) {
            (Some(uuid), _) => uuid.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDetail {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedResponse {
    pub uuid: String,
}

/// Deploy answers come in two shapes depending on the route used.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DeployResponse {
    Batch { deployments: Vec<DeploymentEntry> },
    Single(DeploymentEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentEntry {
    pub deployment_uuid: String,
    #[serde(default)]
    pub resource_uuid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeployResponse {
    /// The entry for `app_uuid`. An entry naming no resource is taken as
    /// ours; one naming a different resource never is.
    pub fn into_entry(self, app_uuid: &str) -> Option<DeploymentEntry> {
        let entries = match self {
            Self::Single(entry) => vec![entry],
            Self::Batch { deployments } => deployments,
        };
        let mut unnamed = None;
        for entry in entries {
            match entry.resource_uuid.as_deref() {
                Some(uuid) if uuid == app_uuid => return Some(entry),
                None if unnamed.is_none() => unnamed = Some(entry),
                _ => {}
            }
        }
        unnamed
    }
}

#[derive(Debug, Serialize)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CreateApplicationRequest<'a> {
    pub name: &'a str,
    pub project_uuid: &'a str,
    pub server_uuid: &'a str,
    pub environment_name: &'a str,
    pub git_repository: &'a str,
    pub git_branch: &'a str,
    pub build_pack: &'a str,
    pub ports_exposes: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<&'a str>,
    pub instant_deploy: bool,
}

impl<'a> CreateApplicationRequest<'a> {
    pub fn new(name: &'a str, spec: &'a ApplicationSpec) -> Self {
        Self {
            name,
            project_uuid: &spec.project_uuid,
            server_uuid: &spec.server_uuid,
            environment_name: &spec.environment_name,
            git_repository: &spec.git_repository,
            git_branch: &spec.git_branch,
            build_pack: &spec.build_pack,
            ports_exposes: &spec.ports_exposes,
            domains: spec.domains.as_deref(),
            instant_deploy: spec.instant_deploy,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateServiceRequest<'a> {
    #[serde(rename = "type")]
    pub service_type: &'a str,
    pub name: &'a str,
    pub project_uuid: &'a str,
    pub server_uuid: &'a str,
    pub environment_name: &'a str,
    pub instant_deploy: bool,
}

impl<'a> CreateServiceRequest<'a> {
    pub fn new(name: &'a str, spec: &'a ServiceSpec) -> Self {
        Self {
            service_type: &spec.service_type,
            name,
            project_uuid: &spec.project_uuid,
            server_uuid: &spec.server_uuid,
            environment_name: &spec.environment_name,
            instant_deploy: spec.instant_deploy,
        }
    }
}

/// Body for both creating and updating an env variable.
#[derive(Debug, Serialize)]
pub struct EnvWriteRequest<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub is_preview: bool,
    pub is_build_time: bool,
    pub is_literal: bool,
}

impl<'a> EnvWriteRequest<'a> {
    pub fn new(key: &'a str, value: &'a str, flags: EnvFlags) -> Self {
        Self {
            key,
            value,
            is_preview: flags.is_preview,
            is_build_time: flags.is_build_time,
            is_literal: flags.is_literal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeployRequest {
    pub force: bool,
}
