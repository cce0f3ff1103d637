use std::fs;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use dockhand::config::ServerConfig;
use dockhand::server::{AppState, create_router};
use dockhand::store::{SqliteStore, Store};
use dockhand::types::{Action, DeploymentRecord};

const ADMIN_PASSWORD: &str = "correct horse battery staple";

struct TestApp {
    state: Arc<AppState>,
    store: Arc<SqliteStore>,
    data_dir: TempDir,
}

fn test_app() -> TestApp {
    let data_dir = TempDir::new().expect("create temp dir");
    let config = ServerConfig {
        data_dir: data_dir.path().to_path_buf(),
        admin_password: ADMIN_PASSWORD.to_string(),
        secret: "api-test-secret".to_string(),
        ..Default::default()
    };
    fs::create_dir_all(config.deployments_dir()).expect("create deployments dir");

    let store = Arc::new(SqliteStore::in_memory().expect("open store"));
    store.initialize().expect("initialize store");

    TestApp {
        state: Arc::new(AppState::new(store.clone(), &config)),
        store,
        data_dir,
    }
}

impl TestApp {
    /// Seeds a record plus its on-disk directory, bypassing ssh-keygen.
    fn seed(&self, id: &str) -> DeploymentRecord {
        let record = DeploymentRecord {
            id: id.to_string(),
            name: Some("seeded".to_string()),
            directory: None,
            repository: Some("git@example.com:acme/app.git".to_string()),
            created_at: Utc::now(),
        };
        self.store.create_deployment(&record).expect("seed record");
        fs::create_dir_all(self.data_dir.path().join("deployments").join(id))
            .expect("seed directory");
        record
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = create_router(self.state.clone())
            .oneshot(request)
            .await
            .expect("dispatch request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse body")
        };
        (status, body)
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(method, uri, Some(ADMIN_PASSWORD), body).await
    }
}

#[tokio::test]
async fn test_health_is_open() {
    let app = test_app();
    let (status, _) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_reject_missing_or_wrong_password() {
    let app = test_app();

    let (status, _) = app.request("GET", "/api/admin/deployments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request("GET", "/api/admin/deployments", Some("guessed"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_maps_id_to_name() {
    let app = test_app();
    app.seed("ab12cd34");

    let (status, body) = app.admin("GET", "/api/admin/deployments", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ab12cd34"], json!("seeded"));
}

#[tokio::test]
async fn test_edit_updates_record_and_validates_directory() {
    let app = test_app();
    app.seed("ab12cd34");

    let (status, body) = app
        .admin(
            "PATCH",
            "/api/admin/deployments/ab12cd34",
            Some(json!({"name": "renamed", "directory": "services/web"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("renamed"));
    assert_eq!(body["data"]["directory"], json!("services/web"));

    let (status, _) = app
        .admin(
            "PATCH",
            "/api/admin/deployments/ab12cd34",
            Some(json!({"directory": "../../etc"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_unknown_deployment_is_not_found() {
    let app = test_app();
    let (status, _) = app
        .admin(
            "PATCH",
            "/api/admin/deployments/ffffffff",
            Some(json!({"name": "ghost"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_access_token_grants_info_but_not_webhook() {
    let app = test_app();
    app.seed("ab12cd34");

    let (status, body) = app
        .admin("POST", "/api/admin/deployments/ab12cd34/access", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, body) = app.request("POST", "/api/info", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!("ab12cd34"));

    let (status, _) = app.request("POST", "/api/webhook", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_general_token_cannot_destroy() {
    let app = test_app();
    app.seed("ab12cd34");

    let (status, body) = app
        .admin("POST", "/api/admin/deployments/ab12cd34/tokens", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let general = body["data"]["general"].as_str().expect("general token");

    let (status, _) = app.request("POST", "/api/destroy", Some(general), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = test_app();
    let (status, _) = app
        .request("POST", "/api/status", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_deployment_is_not_found() {
    let app = test_app();
    let token = app
        .state
        .authority
        .issue("ffffffff", &[Action::Info], 600)
        .expect("issue token");

    let (status, _) = app.request("POST", "/api/info", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lifecycle_action_before_clone_conflicts() {
    let app = test_app();
    app.seed("ab12cd34");

    let (_, body) = app
        .admin("POST", "/api/admin/deployments/ab12cd34/access", None)
        .await;
    let token = body["data"]["token"].as_str().expect("token");

    let (status, body) = app.request("POST", "/api/status", Some(token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("cloned")
    );
}

#[tokio::test]
async fn test_delete_removes_record_and_directory() {
    let app = test_app();
    app.seed("ab12cd34");

    let (status, _) = app
        .admin("DELETE", "/api/admin/deployments/ab12cd34", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.admin("GET", "/api/admin/deployments", None).await;
    assert!(body["data"]["ab12cd34"].is_null());
    assert!(
        !app.data_dir
            .path()
            .join("deployments")
            .join("ab12cd34")
            .exists()
    );
}

#[tokio::test]
async fn test_webhook_accepts_and_enqueues_update_job() {
    let app = test_app();
    app.seed("ab12cd34");

    let (_, body) = app
        .admin("POST", "/api/admin/deployments/ab12cd34/tokens", None)
        .await;
    let webhook = body["data"]["webhook"].as_str().expect("webhook token");

    let (status, body) = app.request("POST", "/api/webhook", Some(webhook), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_null());

    // No worker runs in this test; the job must be durably queued.
    let job = app
        .store
        .next_pending_job()
        .expect("read queue")
        .expect("queued job");
    assert_eq!(job.deployment_id, "ab12cd34");
    assert_eq!(job.action, Action::Update);
}
