use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use transit_scheduler::{
    AppConfig, AppState, InMemoryRepository, PasswordHasher, create_router,
    models::{Role, User},
    repository::{RepositoryState, new_object_id},
};

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn token_for(&self, username: &str, password: &str) -> String {
        let body: Value = self.login(username, password).await.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Inserts an admin directly; the API never creates one.
    async fn seed_admin(&self, username: &str, password: &str) {
        let hasher = PasswordHasher::new(AppConfig::default().bcrypt_cost).unwrap();
        self.repo
            .insert_user(User {
                id: new_object_id(),
                username: username.to_string(),
                email: None,
                password_hash: hasher.hash(password).await.unwrap(),
                role: Role::Admin,
            })
            .await;
    }
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(repo.clone() as RepositoryState, AppConfig::default()).unwrap();
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_register_login_and_access_walkthrough() {
    let app = spawn_app().await;

    let register = app
        .client
        .post(app.url("/api/register"))
        .json(&json!({
            "username": "alice",
            "password": "secret123",
            "password_confirmation": "secret123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::CREATED);

    let login = app.login("alice", "secret123").await;
    assert_eq!(login.status(), StatusCode::OK);
    let body: Value = login.json().await.unwrap();
    assert_eq!(body["role"], "user");
    let token = body["token"].as_str().unwrap().to_string();

    let anonymous = app.client.get(app.url("/api/rutes")).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let listed = app
        .client
        .get(app.url("/api/rutes"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let routes: Value = listed.json().await.unwrap();
    assert_eq!(routes, json!([]));

    let create = app
        .client
        .post(app.url("/api/rutes"))
        .bearer_auth(&token)
        .json(&json!({
            "kode_rute": "R-01",
            "nama_rute": "Kota - Bandara",
            "asal": "Kota",
            "tujuan": "Bandara",
            "jarak_km": 25
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_registration_conflict() {
    let app = spawn_app().await;
    let payload = json!({
        "username": "bob",
        "password": "secret123",
        "password_confirmation": "secret123"
    });

    let first = app
        .client
        .post(app.url("/api/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    let second = app
        .client
        .post(app.url("/api/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(app.repo.user_count().await, 1);
}

#[tokio::test]
async fn test_login_failures_share_one_error_body() {
    let app = spawn_app().await;
    app.seed_admin("ops", "admin-pass").await;

    let wrong = app.login("ops", "not-the-password").await;
    let unknown = app.login("ghost", "admin-pass").await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong: Value = wrong.json().await.unwrap();
    let unknown: Value = unknown.json().await.unwrap();
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["error"], "invalid username or password");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/api/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_admin_schedule_lifecycle() {
    let app = spawn_app().await;
    app.seed_admin("ops", "admin-pass").await;
    let token = app.token_for("ops", "admin-pass").await;

    let route: Value = app
        .client
        .post(app.url("/api/rutes"))
        .bearer_auth(&token)
        .json(&json!({
            "kode_rute": "R-07",
            "nama_rute": "Terminal - Pelabuhan",
            "asal": "Terminal",
            "tujuan": "Pelabuhan",
            "jarak_km": 18
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let route_id = route["_id"].as_str().unwrap().to_string();
    assert_eq!(route_id.len(), 24);

    let vehicle = app
        .client
        .post(app.url("/api/kendaraans"))
        .bearer_auth(&token)
        .json(&json!({
            "nomor_polisi": "D 4321 AB",
            "jenis": "minibus",
            "kapasitas": 15,
            "status": "aktif"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(vehicle.status(), StatusCode::CREATED);

    let created = app
        .client
        .post(app.url("/api/jadwals"))
        .bearer_auth(&token)
        .json(&json!({
            "tanggal": "2024-06-01",
            "waktu_berangkat": "06:00",
            "estimasi_tiba": "06:45",
            "kode_rute": "R-07",
            "nomor_polisi": "D 4321 AB"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let schedule: Value = created.json().await.unwrap();
    assert_eq!(schedule["rute_id"], route_id.as_str());
    let schedule_id = schedule["_id"].as_str().unwrap().to_string();

    let listed: Value = app
        .client
        .get(app.url("/api/jadwals"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["rute"]["kode_rute"], "R-07");
    assert_eq!(listed[0]["waktu_berangkat"], "06:00");

    // Deleting the route leaves the schedule readable with an empty route.
    let deleted = app
        .client
        .delete(app.url(&format!("/api/rutes/{route_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);

    let detail = app
        .client
        .get(app.url(&format!("/api/jadwals/{schedule_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    let detail: Value = detail.json().await.unwrap();
    assert_eq!(detail["rute_id"], route_id.as_str());
    assert!(detail["rute"].get("_id").is_none());
    assert_eq!(detail["rute"]["kode_rute"], "");
}

#[tokio::test]
async fn test_schedule_with_unknown_route_is_not_found() {
    let app = spawn_app().await;
    app.seed_admin("ops", "admin-pass").await;
    let token = app.token_for("ops", "admin-pass").await;

    let response = app
        .client
        .post(app.url("/api/jadwals"))
        .bearer_auth(&token)
        .json(&json!({
            "tanggal": "2024-06-01",
            "waktu_berangkat": "06:00",
            "estimasi_tiba": "06:45",
            "kode_rute": "MISSING",
            "nomor_polisi": "D 4321 AB"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "route not found");
    assert_eq!(app.repo.schedule_count().await, 0);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/api/jadwals"].is_object());
}
