//! Desired-state manifest.
//!
//! ```toml
//! environment = "production"
//!
//! [project]
//! name = "shop"
//!
//! [server]
//! name = "localhost"
//!
//! [application]
//! name = "shop-web"
//! git_repository = "https://github.com/acme/shop"
//! git_branch = "main"
//! ports_exposes = "3000"
//!
//! [env]
//! file = ".env.production"
//! reserved_keys = ["PORT"]
//!
//! [env.vars]
//! NODE_ENV = "production"
//!
//! [[services]]
//! name = "assets"
//! type = "minio"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::envfile::{EnvMap, load_env_file};
use crate::error::{Error, Result};
use crate::types::{ApplicationSpec, EnvFlags, ServiceSpec};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    #[serde(default = "default_environment")]
    pub environment: String,
    pub project: ProjectSection,
    #[serde(default)]
    pub server: ServerSection,
    pub application: ApplicationSection,
    #[serde(default)]
    pub env: EnvSection,
    #[serde(default)]
    pub services: Vec<ServiceSection>,
    /// Directory relative env file paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_server")]
    pub name: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationSection {
    pub name: String,
    pub git_repository: String,
    #[serde(default = "default_branch")]
    pub git_branch: String,
    #[serde(default = "default_build_pack")]
    pub build_pack: String,
    #[serde(default = "default_ports")]
    pub ports_exposes: String,
    #[serde(default)]
    pub domains: Option<String>,
    #[serde(default)]
    pub instant_deploy: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvSection {
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Applied after `file`, overriding it key by key.
    #[serde(default)]
    pub vars: IndexMap<String, String>,
    #[serde(default)]
    pub reserved_keys: Vec<String>,
    #[serde(default)]
    pub flags: Option<EnvFlags>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub instant_deploy: bool,
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_build_pack() -> String {
    "nixpacks".to_string()
}

fn default_ports() -> String {
    "3000".to_string()
}

impl DesiredState {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_toml_str(&content, base_dir)
    }

    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut state: DesiredState = toml::from_str(content)?;
        state.base_dir = base_dir.into();
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("environment", &self.environment),
            ("project.name", &self.project.name),
            ("server.name", &self.server.name),
            ("application.name", &self.application.name),
            ("application.git_repository", &self.application.git_repository),
        ] {
            if value.trim().is_empty() {
                return Err(Error::manifest(format!("`{field}` must not be empty")));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() || service.service_type.trim().is_empty() {
                return Err(Error::manifest("services need a name and a type"));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(Error::manifest(format!(
                    "service \"{}\" is declared twice",
                    service.name
                )));
            }
        }
        Ok(())
    }

    /// The full desired env: file contents first, then inline vars.
    pub fn desired_env(&self) -> Result<EnvMap> {
        let mut vars = match &self.env.file {
            Some(file) => load_env_file(&self.base_dir.join(file))?,
            None => EnvMap::new(),
        };
        for (key, value) in &self.env.vars {
            vars.insert(key.clone(), value.clone());
        }
        Ok(vars)
    }

    pub fn application_spec(&self, project_uuid: &str, server_uuid: &str) -> ApplicationSpec {
        let app = &self.application;
        ApplicationSpec {
            project_uuid: project_uuid.to_string(),
            server_uuid: server_uuid.to_string(),
            environment_name: self.environment.clone(),
            git_repository: app.git_repository.clone(),
            git_branch: app.git_branch.clone(),
            build_pack: app.build_pack.clone(),
            ports_exposes: app.ports_exposes.clone(),
            domains: app.domains.clone(),
            instant_deploy: app.instant_deploy,
        }
    }

    pub fn service_spec(
        &self,
        service: &ServiceSection,
        project_uuid: &str,
        server_uuid: &str,
    ) -> ServiceSpec {
        ServiceSpec {
            service_type: service.service_type.clone(),
            project_uuid: project_uuid.to_string(),
            server_uuid: server_uuid.to_string(),
            environment_name: self.environment.clone(),
            instant_deploy: service.instant_deploy,
        }
    }
}
