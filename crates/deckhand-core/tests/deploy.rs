mod common;

use std::time::Duration;

use common::FakePlatform;
use deckhand_core::{
    ApiErrorKind, ClientConfig, DeploymentHandle, EndpointTable, ReconcileConfig, Reconciler,
    ResourceKind, ResourceRef, TerminalStatus,
};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_ref(uuid: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Application, uuid, "shop-web")
}

#[tokio::test]
async fn deploy_returns_handle_without_waiting() {
    let platform = FakePlatform::start().await;
    let app = platform.add_application("shop-web", "running:healthy");
    let rec = platform.reconciler();

    let handle = rec.deploy(&app_ref(&app), true).await.unwrap();

    assert!(handle.deployment_uuid.starts_with("dep-"));
    assert_eq!(handle.application_uuid, app);
    assert_eq!(handle.message.as_deref(), Some("Deployment queued."));
    assert_eq!(platform.state().deploys, [(app.clone(), true)]);
}

#[tokio::test]
async fn deploy_server_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/applications/a1/deploy"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientConfig::new(&server.uri(), "t").unwrap();
    let rec = Reconciler::new(&client, ReconcileConfig::default()).unwrap();
    let err = rec.deploy(&app_ref("a1"), false).await.unwrap_err();

    let api = err.api().expect("api error");
    assert!(matches!(api.kind, ApiErrorKind::ServerError { status: 500 }));
    assert_eq!(api.status(), Some(500));
    assert_eq!(
        err.to_string(),
        "POST /applications/a1/deploy: server error (HTTP 500)"
    );
}

#[tokio::test]
async fn deploy_through_global_route() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deploy"))
        .and(query_param("uuid", "a1"))
        .and(query_param("force", "false"))
        .and(body_json(serde_json::json!({"force": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "deployments": [
                {"message": "queued", "resource_uuid": "a1", "deployment_uuid": "d7"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientConfig::new(&server.uri(), "t").unwrap();
    let config = ReconcileConfig {
        endpoints: EndpointTable {
            deploy: "/deploy?uuid={uuid}&force={force}".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let rec = Reconciler::new(&client, config).unwrap();
    let handle = rec.deploy(&app_ref("a1"), false).await.unwrap();
    assert_eq!(handle.deployment_uuid, "d7");
}

#[tokio::test]
async fn deploy_never_adopts_another_applications_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "deployments": [{"deployment_uuid": "d-other", "resource_uuid": "other-app"}]
        })))
        .mount(&server)
        .await;

    let client = ClientConfig::new(&server.uri(), "t").unwrap();
    let config = ReconcileConfig {
        endpoints: EndpointTable {
            deploy: "/deploy?uuid={uuid}&force={force}".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let rec = Reconciler::new(&client, config).unwrap();
    let err = rec.deploy(&app_ref("a1"), false).await.unwrap_err();

    let api = err.api().expect("api error");
    assert!(matches!(api.kind, ApiErrorKind::MalformedResponse(_)));
    assert_eq!(api.endpoint, "/deploy?uuid=a1&force=false");
}

#[tokio::test]
async fn wait_succeeds_once_running() {
    let platform = FakePlatform::start().await;
    let app = platform.add_application("shop-web", "running:healthy");
    platform.script_status(&app, &["starting", "restarting", "running:healthy"]);
    let rec = platform.reconciler();

    let handle = rec.deploy(&app_ref(&app), false).await.unwrap();
    let outcome = rec
        .wait_for_deployment(&handle, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome, TerminalStatus::Succeeded);
}

#[tokio::test]
async fn wait_returns_at_first_poll_when_already_running() {
    let platform = FakePlatform::start().await;
    let app = platform.add_application("shop-web", "running:healthy");
    platform.script_status(&app, &["running:healthy", "building"]);
    let rec = platform.reconciler();

    let handle = DeploymentHandle {
        deployment_uuid: "dep-x".to_string(),
        application_uuid: app.clone(),
        message: None,
    };
    let outcome = rec
        .wait_for_deployment(&handle, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome, TerminalStatus::Succeeded);
    // Only the first scripted status was consumed.
    assert_eq!(platform.state().scripted_status[&app].len(), 1);
}

#[tokio::test]
async fn wait_reports_failure() {
    let platform = FakePlatform::start().await;
    let app = platform.add_application("shop-web", "starting");
    platform.script_status(&app, &["starting", "exited:unhealthy"]);
    let rec = platform.reconciler();

    let handle = DeploymentHandle {
        deployment_uuid: "dep-x".to_string(),
        application_uuid: app,
        message: None,
    };
    let outcome = rec
        .wait_for_deployment(&handle, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome, TerminalStatus::Failed("exited:unhealthy".to_string()));
}

#[tokio::test]
async fn wait_times_out_when_never_settled() {
    let platform = FakePlatform::start().await;
    let app = platform.add_application("shop-web", "building");
    let rec = platform.reconciler();

    let handle = DeploymentHandle {
        deployment_uuid: "dep-x".to_string(),
        application_uuid: app,
        message: None,
    };
    let outcome = rec
        .wait_for_deployment(&handle, Duration::from_millis(60))
        .await
        .unwrap();
    assert_eq!(outcome, TerminalStatus::TimedOut("building".to_string()));
}

#[tokio::test]
async fn status_reports_phase() {
    let platform = FakePlatform::start().await;
    let app = platform.add_application("shop-web", "running:healthy");
    let status = platform.reconciler().status(&app_ref(&app)).await.unwrap();
    assert_eq!(status.name, "shop-web");
    assert_eq!(status.phase, deckhand_core::AppPhase::Running);
}
