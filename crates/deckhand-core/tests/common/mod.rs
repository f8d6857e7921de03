//! In-process stand-in for the deployment platform.
//!
//! A single catch-all wiremock mock routes every request into a shared,
//! mutable model of projects, servers, applications, services and env
//! variables, so tests can observe exactly which writes a run issued.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use deckhand_core::{ClientConfig, ReconcileConfig, Reconciler};
use serde_json::{Value, json};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[derive(Default)]
pub struct PlatformState {
    pub projects: Vec<Value>,
    pub servers: Vec<Value>,
    pub applications: Vec<Value>,
    pub services: Vec<Value>,
    pub envs: HashMap<String, Vec<Value>>,
    /// Statuses handed out one per poll before falling back to the stored one.
    pub scripted_status: HashMap<String, VecDeque<String>>,
    /// Count of write calls keyed by "METHOD /collection".
    pub writes: HashMap<String, usize>,
    pub deploys: Vec<(String, bool)>,
    next_id: u64,
}

impl PlatformState {
    fn next_uuid(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn record(&mut self, key: &str) {
        *self.writes.entry(key.to_string()).or_default() += 1;
    }

    pub fn write_count(&self, key: &str) -> usize {
        self.writes.get(key).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        self.writes.values().sum()
    }

    pub fn env_value(&self, app_uuid: &str, key: &str) -> Option<String> {
        self.envs.get(app_uuid)?.iter().find_map(|var| {
            (var["key"] == key && var["is_preview"] == false)
                .then(|| var["value"].as_str().unwrap_or_default().to_string())
        })
    }
}

struct Router(Arc<Mutex<PlatformState>>);

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn created(uuid: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({ "uuid": uuid }))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({ "message": "Not found." }))
}

fn find<'a>(items: &'a [Value], uuid: &str) -> Option<&'a Value> {
    items.iter().find(|item| item["uuid"] == uuid)
}

impl Respond for Router {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.0.lock().unwrap();
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let segments: Vec<String> = request
            .url
            .path()
            .trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["projects"]) => ok(Value::Array(state.projects.clone())),
            ("POST", ["projects"]) => {
                state.record("POST /projects");
                let uuid = state.next_uuid("proj");
                state.projects.push(json!({
                    "uuid": uuid,
                    "name": body["name"],
                    "description": body["description"],
                    "environments": [{ "id": 1, "name": "production" }]
                }));
                created(&uuid)
            }
            ("GET", ["projects", uuid]) => match find(&state.projects, uuid) {
                Some(project) => ok(project.clone()),
                None => not_found(),
            },
            ("GET", ["servers"]) => ok(Value::Array(state.servers.clone())),
            ("GET", ["services"]) => ok(json!({ "data": state.services.clone() })),
            ("POST", ["services"]) => {
                state.record("POST /services");
                let uuid = state.next_uuid("svc");
                state.services.push(json!({
                    "uuid": uuid,
                    "name": body["name"],
                    "service_type": body["type"],
                    "project_uuid": body["project_uuid"]
                }));
                created(&uuid)
            }
            ("GET", ["applications"]) => ok(Value::Array(state.applications.clone())),
            ("POST", ["applications"]) => {
                state.record("POST /applications");
                let uuid = state.next_uuid("app");
                state.applications.push(json!({
                    "uuid": uuid,
                    "name": body["name"],
                    "git_repository": body["git_repository"],
                    "project_uuid": body["project_uuid"],
                    "status": "exited:unhealthy"
                }));
                created(&uuid)
            }
            ("GET", ["applications", uuid]) => {
                let scripted = state
                    .scripted_status
                    .get_mut(*uuid)
                    .and_then(VecDeque::pop_front);
                match find(&state.applications, uuid) {
                    Some(app) => {
                        let mut app = app.clone();
                        if let Some(status) = scripted {
                            app["status"] = json!(status);
                        }
                        ok(app)
                    }
                    None => not_found(),
                }
            }
            ("GET", ["applications", uuid, "envs"]) => {
                if find(&state.applications, uuid).is_none() {
                    return not_found();
                }
                ok(Value::Array(state.envs.get(*uuid).cloned().unwrap_or_default()))
            }
            ("POST", ["applications", uuid, "envs"]) => {
                state.record("POST /envs");
                let env_uuid = state.next_uuid("env");
                let var = json!({
                    "uuid": env_uuid,
                    "key": body["key"],
                    "value": body["value"],
                    "is_preview": body["is_preview"],
                    "is_build_time": body["is_build_time"],
                    "is_literal": body["is_literal"]
                });
                state.envs.entry(uuid.to_string()).or_default().push(var);
                created(&env_uuid)
            }
            ("PATCH", ["applications", uuid, "envs", env_uuid]) => {
                state.record("PATCH /envs");
                let Some(vars) = state.envs.get_mut(*uuid) else {
                    return not_found();
                };
                match vars.iter_mut().find(|var| var["uuid"] == *env_uuid) {
                    Some(var) => {
                        var["value"] = body["value"].clone();
                        ok(var.clone())
                    }
                    None => not_found(),
                }
            }
            ("POST", ["applications", uuid, "deploy"]) => {
                if find(&state.applications, uuid).is_none() {
                    return not_found();
                }
                let force = body["force"].as_bool().unwrap_or(false);
                state.deploys.push((uuid.to_string(), force));
                let deployment = state.next_uuid("dep");
                ok(json!({ "deployment_uuid": deployment, "message": "Deployment queued." }))
            }
            _ => not_found(),
        }
    }
}

pub struct FakePlatform {
    pub server: MockServer,
    state: Arc<Mutex<PlatformState>>,
}

impl FakePlatform {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(PlatformState::default()));
        Mock::given(any())
            .respond_with(Router(state.clone()))
            .mount(&server)
            .await;
        Self { server, state }
    }

    pub fn state(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap()
    }

    pub fn add_server(&self, name: &str) -> String {
        let mut state = self.state();
        let uuid = state.next_uuid("srv");
        state.servers.push(json!({ "uuid": uuid, "name": name, "ip": "10.0.0.1" }));
        uuid
    }

    pub fn add_application(&self, name: &str, status: &str) -> String {
        let mut state = self.state();
        let uuid = state.next_uuid("app");
        state
            .applications
            .push(json!({ "uuid": uuid, "name": name, "status": status }));
        uuid
    }

    /// A project made outside the run under test, with a `production` environment.
    pub fn add_project(&self, name: &str) -> String {
        let mut state = self.state();
        let uuid = state.next_uuid("proj");
        state.projects.push(json!({
            "uuid": uuid,
            "name": name,
            "environments": [{ "id": 1, "name": "production" }]
        }));
        uuid
    }

    pub fn add_application_in(&self, project_uuid: &str, name: &str, status: &str) -> String {
        let mut state = self.state();
        let uuid = state.next_uuid("app");
        state.applications.push(json!({
            "uuid": uuid,
            "name": name,
            "project_uuid": project_uuid,
            "status": status
        }));
        uuid
    }

    pub fn add_env(&self, app_uuid: &str, key: &str, value: &str, is_preview: bool) {
        let mut state = self.state();
        let env_uuid = state.next_uuid("env");
        state.envs.entry(app_uuid.to_string()).or_default().push(json!({
            "uuid": env_uuid,
            "key": key,
            "value": value,
            "is_preview": is_preview,
            "is_build_time": false,
            "is_literal": true
        }));
    }

    pub fn script_status(&self, app_uuid: &str, statuses: &[&str]) {
        self.state().scripted_status.insert(
            app_uuid.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn reconciler(&self) -> Reconciler {
        self.reconciler_with(ReconcileConfig::default())
    }

    pub fn reconciler_with(&self, config: ReconcileConfig) -> Reconciler {
        let client = ClientConfig::new(&self.server.uri(), "test-token").unwrap();
        let config = ReconcileConfig {
            poll_interval: Duration::from_millis(10),
            ..config
        };
        Reconciler::new(&client, config).unwrap()
    }
}
