#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory backend so the suite runs without PostgreSQL
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_task-manager-api"));
        cmd.args(["--store", "memory", "--port", &port.to_string()])
            .env("JWT_SECRET", "integration-test-secret")
            .env("SECURITY_ARGON2_MEMORY_KIB", "1024")
            .env("SECURITY_ARGON2_ITERATIONS", "1")
            .env("FILTER_MAX_LIMIT", "50")
            .env_remove("APP_ENV")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A registered account plus the token from registration.
pub struct Account {
    pub id: String,
    pub email: String,
    pub password: String,
    pub token: String,
}

/// The shared server lives for the whole test binary, so every account gets
/// a fresh email.
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

pub async fn register(server: &TestServer, client: &Client, name: &str) -> Result<Account> {
    let email = unique_email(name);
    let password = "sturdy-secret-42".to_string();

    let res = client
        .post(server.url("/users"))
        .json(&json!({ "name": name, "email": email, "password": password, "age": 30 }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let body: Value = res.json().await?;
    Ok(Account {
        id: body["data"]["user"]["id"].as_str().context("missing id")?.to_string(),
        email,
        password,
        token: body["data"]["token"].as_str().context("missing token")?.to_string(),
    })
}

pub async fn login(server: &TestServer, client: &Client, account: &Account) -> Result<String> {
    let res = client
        .post(server.url("/users/login"))
        .json(&json!({ "email": account.email, "password": account.password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

    let body: Value = res.json().await?;
    Ok(body["data"]["token"].as_str().context("missing token")?.to_string())
}

pub async fn create_task(server: &TestServer, client: &Client, token: &str, body: Value) -> Result<Value> {
    let res = client.post(server.url("/tasks")).bearer_auth(token).json(&body).send().await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "create task failed: {}", res.status());

    let body: Value = res.json().await?;
    Ok(body["data"].clone())
}
