//! The endpoint table: one resolved path template per operation.
//!
//! Templates are relative to the API base URL and may only use the
//! placeholders their operation supplies. The table is validated once when
//! configuration is loaded; rendering afterwards cannot fail.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path templates for every call the client makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointTable {
    pub projects: String,
    pub project: String,
    pub servers: String,
    pub services: String,
    pub applications: String,
    pub application_create: String,
    pub application: String,
    pub envs: String,
    pub env: String,
    pub deploy: String,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            projects: "/projects".to_string(),
            project: "/projects/{uuid}".to_string(),
            servers: "/servers".to_string(),
            services: "/services".to_string(),
            applications: "/applications".to_string(),
            application_create: "/applications".to_string(),
            application: "/applications/{uuid}".to_string(),
            envs: "/applications/{uuid}/envs".to_string(),
            env: "/applications/{uuid}/envs/{env_uuid}".to_string(),
            deploy: "/applications/{uuid}/deploy".to_string(),
        }
    }
}

impl EndpointTable {
    /// Check every template's shape and placeholders.
    pub fn validate(&self) -> Result<()> {
        const NONE: &[&str] = &[];
        let checks = [
            ("projects", self.projects.as_str(), NONE),
            ("project", self.project.as_str(), &["uuid"][..]),
            ("servers", self.servers.as_str(), NONE),
            ("services", self.services.as_str(), NONE),
            ("applications", self.applications.as_str(), NONE),
            ("application_create", self.application_create.as_str(), NONE),
            ("application", self.application.as_str(), &["uuid"][..]),
            ("envs", self.envs.as_str(), &["uuid"][..]),
            ("env", self.env.as_str(), &["uuid", "env_uuid"][..]),
            ("deploy", self.deploy.as_str(), &["uuid", "force"][..]),
        ];
        for (name, template, allowed) in checks {
            validate_template(name, template, allowed)?;
        }
        // Detail templates must identify the resource.
        for (name, template) in [
            ("project", &self.project),
            ("application", &self.application),
            ("envs", &self.envs),
            ("deploy", &self.deploy),
        ] {
            if !template.contains("{uuid}") {
                return Err(Error::configuration(format!(
                    "endpoint `{name}` must contain {{uuid}}: {template}"
                )));
            }
        }
        if !self.env.contains("{env_uuid}") {
            return Err(Error::configuration(format!(
                "endpoint `env` must contain {{env_uuid}}: {}",
                self.env
            )));
        }
        Ok(())
    }

    pub fn project(&self, uuid: &str) -> String {
        render(&self.project, &[("uuid", uuid)])
    }

    pub fn application(&self, uuid: &str) -> String {
        render(&self.application, &[("uuid", uuid)])
    }

    pub fn envs(&self, app_uuid: &str) -> String {
        render(&self.envs, &[("uuid", app_uuid)])
    }

    pub fn env(&self, app_uuid: &str, env_uuid: &str) -> String {
        render(&self.env, &[("uuid", app_uuid), ("env_uuid", env_uuid)])
    }

    pub fn deploy(&self, app_uuid: &str, force: bool) -> String {
        let force = if force { "true" } else { "false" };
        render(&self.deploy, &[("uuid", app_uuid), ("force", force)])
    }
}

fn validate_template(name: &str, template: &str, allowed: &[&str]) -> Result<()> {
    if !template.starts_with('/') {
        return Err(Error::configuration(format!(
            "endpoint `{name}` must start with '/': {template}"
        )));
    }
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            return Err(Error::configuration(format!(
                "endpoint `{name}` has an unclosed placeholder: {template}"
            )));
        };
        let placeholder = &rest[open + 1..open + close];
        if !allowed.contains(&placeholder) {
            return Err(Error::configuration(format!(
                "endpoint `{name}` uses unknown placeholder {{{placeholder}}}: {template}"
            )));
        }
        rest = &rest[open + close + 1..];
    }
    if rest.contains('}') {
        return Err(Error::configuration(format!(
            "endpoint `{name}` has a stray '}}': {template}"
        )));
    }
    Ok(())
}

fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
