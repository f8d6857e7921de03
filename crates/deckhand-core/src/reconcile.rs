//! Idempotent reconciliation against the platform.
//!
//! A [`Reconciler`] is one run. It looks things up by name before it ever
//! creates or updates, and remembers what it resolved until it is dropped.
//! Nothing is retried: a failed call ends the operation and the error goes
//! back to the caller untouched.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep};

use crate::client::ApiClient;
use crate::config::{ClientConfig, ReconcileConfig};
use crate::envfile::EnvMap;
use crate::error::{ApiError, ApiErrorKind, Error, Result};
use crate::manifest::DesiredState;
use crate::schema::NamedResource;
use crate::types::{
    AppPhase, AppStatus, CreateSpec, DeploymentHandle, EnvFlags, EnvironmentVariable, ResourceKind,
    ResourceRef, SyncReport, TerminalStatus,
};

pub struct Reconciler {
    client: ApiClient,
    config: ReconcileConfig,
    resolved: HashMap<(ResourceKind, String), ResourceRef>,
}

/// What `apply` should do after the resources exist.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub deploy: bool,
    pub force: bool,
    /// Wait for the deployment to settle, at most this long.
    pub wait: Option<Duration>,
}

/// Everything one `apply` run resolved, created or triggered.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub project: ResourceRef,
    pub environment: ResourceRef,
    pub server: ResourceRef,
    pub application: ResourceRef,
    pub env: SyncReport,
    pub services: Vec<ResourceRef>,
    pub deployment: Option<DeploymentHandle>,
    pub outcome: Option<TerminalStatus>,
}

impl Reconciler {
    pub fn new(client_config: &ClientConfig, config: ReconcileConfig) -> Result<Self> {
        config.validate()?;
        let client = ApiClient::new(client_config, config.endpoints.clone())?;
        Ok(Self {
            client,
            config,
            resolved: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    async fn list_named(&self, kind: ResourceKind) -> Result<Vec<NamedResource>> {
        match self.client.list(kind).await {
            Ok(items) => Ok(items),
            Err(Error::Api(e)) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Every resource of a listable kind. A 404 from the list endpoint means none.
    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceRef>> {
        Ok(self
            .list_named(kind)
            .await?
            .into_iter()
            .map(|item| ResourceRef::new(kind, item.uuid, item.name))
            .collect())
    }

    /// Find a resource by exact name. `Ok(None)` when nothing matches.
    pub async fn resolve(&mut self, kind: ResourceKind, name: &str) -> Result<Option<ResourceRef>> {
        self.lookup(kind, name, None).await
    }

    /// Like [`resolve`](Self::resolve), but only inside one project.
    ///
    /// Rows that name another project are never matched. Rows that don't say
    /// which project they belong to still are.
    pub async fn resolve_in_project(
        &mut self,
        kind: ResourceKind,
        project_uuid: &str,
        name: &str,
    ) -> Result<Option<ResourceRef>> {
        self.lookup(kind, name, Some(project_uuid)).await
    }

    async fn lookup(
        &mut self,
        kind: ResourceKind,
        name: &str,
        project_uuid: Option<&str>,
    ) -> Result<Option<ResourceRef>> {
        if !kind.is_listable() {
            return Err(Error::UnsupportedLookup(kind));
        }
        let key = cache_key(kind, name, project_uuid);
        if let Some(hit) = self.resolved.get(&key) {
            return Ok(Some(hit.clone()));
        }

        let (candidates, foreign): (Vec<_>, Vec<_>) = self
            .list_named(kind)
            .await?
            .into_iter()
            .filter(|candidate| candidate.name == name)
            .partition(|candidate| in_project(candidate, project_uuid));
        let mut candidates = candidates.into_iter();
        let Some(found) = candidates.next() else {
            tracing::debug!(kind = %kind, name, foreign = foreign.len(), "not found");
            return Ok(None);
        };
        let others = candidates.count();
        if others > 0 {
            tracing::warn!(kind = %kind, name, uuid = %found.uuid, others, "name is ambiguous; using the first match");
        }
        let found = ResourceRef::new(kind, found.uuid, found.name);
        tracing::debug!(kind = %kind, name, uuid = %found.uuid, "resolved");
        self.resolved.insert(key, found.clone());
        Ok(Some(found))
    }

    /// Find a named environment inside a project.
    pub async fn resolve_environment(
        &mut self,
        project: &ResourceRef,
        name: &str,
    ) -> Result<Option<ResourceRef>> {
        let cache_key = (ResourceKind::Environment, format!("{}/{name}", project.uuid));
        if let Some(hit) = self.resolved.get(&cache_key) {
            return Ok(Some(hit.clone()));
        }
        let detail = match self.client.get_project(&project.uuid).await {
            Ok(detail) => detail,
            Err(Error::Api(e)) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(env) = detail.environments.iter().find(|env| env.name == name) else {
            return Ok(None);
        };
        let found = ResourceRef::new(ResourceKind::Environment, env.handle(), name);
        self.resolved.insert(cache_key, found.clone());
        Ok(Some(found))
    }

    /// Look `name` up and create it only if it's missing.
    ///
    /// Applications and services are looked up inside the project `spec`
    /// names, so a same-named resource elsewhere is never adopted. Calling
    /// this again for the same name returns the same reference without
    /// another create.
    pub async fn ensure_exists(&mut self, name: &str, spec: &CreateSpec) -> Result<ResourceRef> {
        let kind = spec.kind();
        let project_uuid = spec.project_uuid();
        if let Some(existing) = self.lookup(kind, name, project_uuid).await? {
            tracing::debug!(kind = %kind, name, uuid = %existing.uuid, "already exists");
            return Ok(existing);
        }

        let uuid = match spec {
            CreateSpec::Project { description } => {
                self.client
                    .create_project(name, description.as_deref())
                    .await?
            }
            CreateSpec::Application(app) => self.client.create_application(name, app).await?,
            CreateSpec::Service(service) => self.client.create_service(name, service).await?,
        };
        tracing::info!(kind = %kind, name, uuid = %uuid, "created");

        let created = ResourceRef::new(kind, uuid, name);
        self.resolved
            .insert(cache_key(kind, name, project_uuid), created.clone());
        Ok(created)
    }

    pub async fn list_envs(&self, app: &ResourceRef) -> Result<Vec<EnvironmentVariable>> {
        self.client.list_envs(&app.uuid).await
    }

    /// Bring the application's env in line with `desired`, using the configured
    /// reserved keys and flags.
    pub async fn sync_environment(&self, app: &ResourceRef, desired: &EnvMap) -> Result<SyncReport> {
        self.sync_environment_with(app, desired, &self.config.reserved_keys, self.config.env_flags)
            .await
    }

    /// Diff `desired` against the remote env fetched once up front. Missing keys
    /// are created, changed values updated, identical values left alone.
    /// Remote keys absent from `desired` are never touched.
    pub async fn sync_environment_with(
        &self,
        app: &ResourceRef,
        desired: &EnvMap,
        reserved: &BTreeSet<String>,
        flags: EnvFlags,
    ) -> Result<SyncReport> {
        let remote = self.client.list_envs(&app.uuid).await?;
        let remote: HashMap<&str, _> = remote
            .iter()
            .filter(|var| var.is_preview == flags.is_preview)
            .map(|var| (var.key.as_str(), var))
            .collect();

        let mut report = SyncReport::default();
        for (key, value) in desired {
            if reserved.contains(key) {
                tracing::warn!(app = %app.name, key = %key, "reserved key left out of sync");
                report.excluded.push(key.clone());
                continue;
            }
            match remote.get(key.as_str()) {
                None => {
                    self.client.create_env(&app.uuid, key, value, flags).await?;
                    tracing::info!(app = %app.name, key = %key, "env created");
                    report.created.push(key.clone());
                }
                Some(current) if current.value == *value => {
                    report.skipped.push(key.clone());
                }
                Some(current) => {
                    let Some(env_uuid) = current.uuid.as_deref() else {
                        return Err(ApiError::new(
                            "GET",
                            self.client.endpoints().envs(&app.uuid),
                            ApiErrorKind::MalformedResponse(format!(
                                "env variable {key} has no uuid"
                            )),
                        )
                        .into());
                    };
                    self.client
                        .update_env(&app.uuid, env_uuid, key, value, flags)
                        .await?;
                    tracing::info!(app = %app.name, key = %key, "env updated");
                    report.updated.push(key.clone());
                }
            }
        }
        Ok(report)
    }

    /// Ask the platform to deploy. Returns as soon as the request is accepted.
    pub async fn deploy(&self, app: &ResourceRef, force: bool) -> Result<DeploymentHandle> {
        let handle = self.client.deploy(&app.uuid, force).await?;
        tracing::info!(
            app = %app.name,
            deployment = %handle.deployment_uuid,
            force,
            "deployment queued"
        );
        Ok(handle)
    }

    pub async fn status(&self, app: &ResourceRef) -> Result<AppStatus> {
        self.status_of(&app.uuid).await
    }

    async fn status_of(&self, app_uuid: &str) -> Result<AppStatus> {
        let detail = self.client.get_application(app_uuid).await?;
        let status = detail.status.unwrap_or_else(|| "unknown".to_string());
        Ok(AppStatus {
            phase: AppPhase::from_status(&status),
            uuid: detail.uuid,
            name: detail.name,
            status,
            fqdn: detail.fqdn,
        })
    }

    /// Poll the application's status at the configured interval until it
    /// settles or `timeout` runs out, whichever comes first.
    ///
    /// This watches the application, not the deployment record. An app that
    /// is still `running` from its previous deployment reports `Succeeded` at
    /// the first poll, before the new deployment has started.
    pub async fn wait_for_deployment(
        &self,
        handle: &DeploymentHandle,
        timeout: Duration,
    ) -> Result<TerminalStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            let current = self.status_of(&handle.application_uuid).await?;
            tracing::debug!(
                deployment = %handle.deployment_uuid,
                status = %current.status,
                "polled"
            );
            if current.phase.is_terminal() {
                return Ok(match current.phase {
                    AppPhase::Running => TerminalStatus::Succeeded,
                    _ => TerminalStatus::Failed(current.status),
                });
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(TerminalStatus::TimedOut(current.status));
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// One full pass over a desired state.
    pub async fn apply(
        &mut self,
        desired: &DesiredState,
        options: &ApplyOptions,
    ) -> Result<ApplyReport> {
        let env = desired.desired_env()?;

        let project = self
            .ensure_exists(
                &desired.project.name,
                &CreateSpec::Project {
                    description: desired.project.description.clone(),
                },
            )
            .await?;
        let environment = self
            .resolve_environment(&project, &desired.environment)
            .await?
            .ok_or_else(|| Error::missing(ResourceKind::Environment, &desired.environment))?;
        let server = self
            .resolve(ResourceKind::Server, &desired.server.name)
            .await?
            .ok_or_else(|| Error::missing(ResourceKind::Server, &desired.server.name))?;

        let app_spec = desired.application_spec(&project.uuid, &server.uuid);
        let application = self
            .ensure_exists(
                &desired.application.name,
                &CreateSpec::Application(app_spec),
            )
            .await?;

        let mut reserved = self.config.reserved_keys.clone();
        reserved.extend(desired.env.reserved_keys.iter().cloned());
        let flags = desired.env.flags.unwrap_or(self.config.env_flags);
        let env = self
            .sync_environment_with(&application, &env, &reserved, flags)
            .await?;

        let mut services = Vec::with_capacity(desired.services.len());
        for service in &desired.services {
            let spec = desired.service_spec(service, &project.uuid, &server.uuid);
            services.push(
                self.ensure_exists(&service.name, &CreateSpec::Service(spec))
                    .await?,
            );
        }

        let mut deployment = None;
        let mut outcome = None;
        if options.deploy {
            let handle = self.deploy(&application, options.force).await?;
            if let Some(timeout) = options.wait {
                outcome = Some(self.wait_for_deployment(&handle, timeout).await?);
            }
            deployment = Some(handle);
        }

        Ok(ApplyReport {
            project,
            environment,
            server,
            application,
            env,
            services,
            deployment,
            outcome,
        })
    }
}

fn cache_key(kind: ResourceKind, name: &str, project_uuid: Option<&str>) -> (ResourceKind, String) {
    match project_uuid {
        Some(project) => (kind, format!("{project}/{name}")),
        None => (kind, name.to_string()),
    }
}

/// A row that doesn't name its project can't be ruled out.
fn in_project(candidate: &NamedResource, project_uuid: Option<&str>) -> bool {
    match (project_uuid, candidate.project_uuid.as_deref()) {
        (Some(wanted), Some(owner)) => wanted == owner,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn reconciler_for(server: &MockServer) -> Reconciler {
        let client = ClientConfig::new(&server.uri(), "t").unwrap();
        Reconciler::new(&client, ReconcileConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_caches_within_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"uuid": "p1", "name": "shop"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut rec = reconciler_for(&server).await;
        let first = rec.resolve(ResourceKind::Project, "shop").await.unwrap();
        let second = rec.resolve(ResourceKind::Project, "shop").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unwrap().uuid, "p1");
    }

    #[tokio::test]
    async fn test_resolve_list_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut rec = reconciler_for(&server).await;
        assert!(
            rec.resolve(ResourceKind::Service, "assets")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_resolve_deployment_unsupported() {
        let server = MockServer::start().await;
        let mut rec = reconciler_for(&server).await;
        let err = rec
            .resolve(ResourceKind::Deployment, "d1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLookup(ResourceKind::Deployment)));
    }

    #[tokio::test]
    async fn test_resolve_environment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uuid": "p1",
                "name": "shop",
                "environments": [{"id": 3, "name": "production"}, {"id": 4, "name": "staging"}]
            })))
            .mount(&server)
            .await;

        let mut rec = reconciler_for(&server).await;
        let project = ResourceRef::new(ResourceKind::Project, "p1", "shop");
        let env = rec
            .resolve_environment(&project, "staging")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(env.uuid, "4");
        assert!(
            rec.resolve_environment(&project, "qa")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_status_without_status_field_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/applications/a1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"uuid": "a1", "name": "web"})),
            )
            .mount(&server)
            .await;

        let rec = reconciler_for(&server).await;
        let app = ResourceRef::new(ResourceKind::Application, "a1", "web");
        let status = rec.status(&app).await.unwrap();
        assert_eq!(status.status, "unknown");
        assert_eq!(status.phase, AppPhase::Unknown);
    }
}
