//! Typed HTTP access to the platform API.
//!
//! One method per endpoint in the [`EndpointTable`]. Every call is a single
//! request: no retries, no fallbacks to alternative paths. Failures come
//! back as [`ApiError`] carrying method, endpoint and kind.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::endpoints::EndpointTable;
use crate::error::{ApiError, ApiErrorKind, Error, Result};
use crate::schema::{
    ApplicationDetail, CreateApplicationRequest, CreateProjectRequest, CreateServiceRequest,
    CreatedResponse, DeployRequest, DeployResponse, EnvWriteRequest, ListEnvelope, NamedResource,
    ProjectDetail,
};
use crate::types::{
    ApplicationSpec, DeploymentHandle, EnvFlags, EnvironmentVariable, ResourceKind, ServiceSpec,
};

type ApiResult<T> = std::result::Result<T, ApiError>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    endpoints: EndpointTable,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, endpoints: EndpointTable) -> Result<Self> {
        endpoints.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("deckhand/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            token: config.token.clone(),
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(endpoint))
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        let req = self.request(Method::GET, endpoint);
        self.execute(Method::GET, endpoint, req).await
    }

    async fn send_json<B, T>(&self, method: Method, endpoint: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self
            .request(method.clone(), endpoint)
            .header("Content-Type", "application/json")
            .json(body);
        self.execute(method, endpoint, req).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        req: reqwest::RequestBuilder,
    ) -> ApiResult<T> {
        tracing::debug!(method = %method, endpoint, "request");
        let fail = |kind: ApiErrorKind| {
            tracing::debug!(method = %method, endpoint, category = %kind.category(), "request failed");
            ApiError::new(method.as_str(), endpoint, kind)
        };

        let resp = req.send().await.map_err(|e| fail(transport_kind(e)))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| fail(transport_kind(e)))?;
        tracing::debug!(method = %method, endpoint, status = status.as_u16(), "response");

        if !status.is_success() {
            return Err(fail(ApiErrorKind::from_status(status.as_u16(), &body)));
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| fail(ApiErrorKind::MalformedResponse(e.to_string())))
    }

    /// List every resource of a top-level kind.
    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<NamedResource>> {
        let endpoint = match kind {
            ResourceKind::Project => &self.endpoints.projects,
            ResourceKind::Server => &self.endpoints.servers,
            ResourceKind::Application => &self.endpoints.applications,
            ResourceKind::Service => &self.endpoints.services,
            other => return Err(Error::UnsupportedLookup(other)),
        };
        let list: ListEnvelope<NamedResource> = self.get(endpoint).await?;
        Ok(list.into_vec())
    }

    pub async fn get_project(&self, uuid: &str) -> Result<ProjectDetail> {
        Ok(self.get(&self.endpoints.project(uuid)).await?)
    }

    pub async fn create_project(&self, name: &str, description: Option<&str>) -> Result<String> {
        let body = CreateProjectRequest { name, description };
        let created: CreatedResponse = self
            .send_json(Method::POST, &self.endpoints.projects, &body)
            .await?;
        Ok(created.uuid)
    }

    pub async fn get_application(&self, uuid: &str) -> Result<ApplicationDetail> {
        Ok(self.get(&self.endpoints.application(uuid)).await?)
    }

    pub async fn create_application(&self, name: &str, spec: &ApplicationSpec) -> Result<String> {
        let body = CreateApplicationRequest::new(name, spec);
        let created: CreatedResponse = self
            .send_json(Method::POST, &self.endpoints.application_create, &body)
            .await?;
        Ok(created.uuid)
    }

    pub async fn create_service(&self, name: &str, spec: &ServiceSpec) -> Result<String> {
        let body = CreateServiceRequest::new(name, spec);
        let created: CreatedResponse = self
            .send_json(Method::POST, &self.endpoints.services, &body)
            .await?;
        Ok(created.uuid)
    }

    pub async fn list_envs(&self, app_uuid: &str) -> Result<Vec<EnvironmentVariable>> {
        let list: ListEnvelope<EnvironmentVariable> =
            self.get(&self.endpoints.envs(app_uuid)).await?;
        Ok(list.into_vec())
    }

    pub async fn create_env(
        &self,
        app_uuid: &str,
        key: &str,
        value: &str,
        flags: EnvFlags,
    ) -> Result<()> {
        let body = EnvWriteRequest::new(key, value, flags);
        let _: serde_json::Value = self
            .send_json(Method::POST, &self.endpoints.envs(app_uuid), &body)
            .await?;
        Ok(())
    }

    pub async fn update_env(
        &self,
        app_uuid: &str,
        env_uuid: &str,
        key: &str,
        value: &str,
        flags: EnvFlags,
    ) -> Result<()> {
        let body = EnvWriteRequest::new(key, value, flags);
        let _: serde_json::Value = self
            .send_json(Method::PATCH, &self.endpoints.env(app_uuid, env_uuid), &body)
            .await?;
        Ok(())
    }

    pub async fn deploy(&self, app_uuid: &str, force: bool) -> Result<DeploymentHandle> {
        let endpoint = self.endpoints.deploy(app_uuid, force);
        let resp: DeployResponse = self
            .send_json(Method::POST, &endpoint, &DeployRequest { force })
            .await?;
        let entry = resp.into_entry(app_uuid).ok_or_else(|| {
            ApiError::new(
                "POST",
                endpoint.as_str(),
                ApiErrorKind::MalformedResponse("no deployment in response".to_string()),
            )
        })?;
        Ok(DeploymentHandle {
            deployment_uuid: entry.deployment_uuid,
            application_uuid: entry.resource_uuid.unwrap_or_else(|| app_uuid.to_string()),
            message: entry.message,
        })
    }
}

fn transport_kind(err: reqwest::Error) -> ApiErrorKind {
    if err.is_timeout() {
        return ApiErrorKind::Timeout;
    }
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    ApiErrorKind::Network(message)
}
