use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Bootstrap SUPERADMIN credentials from the development config preset.
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-dev-password";

pub const PASSWORD: &str = "password123";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Cargo points at the compiled binary regardless of target dir
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pulse-api"));
        cmd.env("PULSE_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
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
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A name that cannot collide across tests sharing one server process.
pub fn unique(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Registers a fresh USER-role account and returns its login token plus the
/// user object from the register response.
pub async fn register_and_login(server: &TestServer, username: &str) -> Result<(String, Value)> {
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": PASSWORD
        }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "register failed: {}",
        res.status()
    );
    let body: Value = res.json().await?;
    let user = body["data"]["user"].clone();

    let token = login(server, username, PASSWORD).await?;
    Ok((token, user))
}

pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "login failed for {}: {}",
        username,
        res.status()
    );
    let body: Value = res.json().await?;
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("login response carried no token")
}

/// Token for the seeded bootstrap SUPERADMIN.
pub async fn superadmin_token(server: &TestServer) -> Result<String> {
    login(server, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

/// Registers a user and promotes it to ADMIN through the superadmin, then
/// logs in again (promotion invalidates tokens minted under the old role).
pub async fn make_admin(server: &TestServer, username: &str) -> Result<String> {
    let (_, user) = register_and_login(server, username).await?;
    let root = superadmin_token(server).await?;

    let client = reqwest::Client::new();
    let res = client
        .put(format!(
            "{}/api/users/{}",
            server.base_url,
            user["uuid"].as_str().unwrap()
        ))
        .bearer_auth(&root)
        .json(&json!({ "role": "ADMIN" }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "promotion failed: {}",
        res.status()
    );

    login(server, username, PASSWORD).await
}
