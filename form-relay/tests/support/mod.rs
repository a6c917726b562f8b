#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use tokio::net::TcpListener;
use tracing::subscriber::DefaultGuard;

use formrelay::{router, AppState, Config, Relay};

pub const VERIFICATION_KEY: &str = "gre-secret";
pub const NOTIFICATION_KEY: &str = "mg-secret";
pub const RECIPIENTS: [&str; 2] = ["owner@oneadame.com", "backup@oneadame.com"];

pub const VERIFY_OK: &str = r#"{"success": true, "challenge_ts": "2020-09-08T00:13:34Z", "hostname": "localhost"}"#;
pub const VERIFY_REJECTED: &str = r#"{"success": false, "error-codes": ["timeout-or-duplicate"]}"#;

/// How the mock remote services answer.
#[derive(Clone)]
pub struct Behavior {
    pub verify_status: StatusCode,
    pub verify_body: String,
    pub verify_delay: Duration,
    pub notify_status: StatusCode,
}

impl Behavior {
    pub fn verifying(body: &str) -> Self {
        Self {
            verify_status: StatusCode::OK,
            verify_body: body.to_string(),
            verify_delay: Duration::ZERO,
            notify_status: StatusCode::OK,
        }
    }
}

/// One request received by the mock Mailgun endpoint.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub authorization: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl Delivery {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Default)]
pub struct Recorded {
    pub verifications: Mutex<Vec<HashMap<String, String>>>,
    pub deliveries: Mutex<Vec<Delivery>>,
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    recorded: Arc<Recorded>,
}

/// reCAPTCHA and Mailgun stand-ins listening on an ephemeral port.
pub struct MockServices {
    pub base_url: String,
    pub recorded: Arc<Recorded>,
}

impl MockServices {
    pub async fn start(behavior: Behavior) -> Self {
        let recorded = Arc::new(Recorded::default());
        let state = MockState {
            behavior,
            recorded: Arc::clone(&recorded),
        };

        let app = Router::new()
            .route("/recaptcha/api/siteverify", post(siteverify))
            .route("/v3/mg.test/messages", post(messages))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self { base_url, recorded }
    }

    pub fn verification_url(&self) -> String {
        format!("{}/recaptcha/api/siteverify", self.base_url)
    }

    pub fn notification_url(&self) -> String {
        format!("{}/v3/mg.test/messages", self.base_url)
    }

    pub fn verifications(&self) -> Vec<HashMap<String, String>> {
        self.recorded.verifications.lock().unwrap().clone()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.recorded.deliveries.lock().unwrap().clone()
    }

    /// Poll until `count` deliveries arrived or the timeout passes.
    pub async fn wait_for_deliveries(&self, count: usize, timeout: Duration) -> Vec<Delivery> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let deliveries = self.deliveries();
            if deliveries.len() >= count || tokio::time::Instant::now() >= deadline {
                return deliveries;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Configuration pointing both clients at these mocks.
    pub fn config(&self, environment: &str) -> Config {
        let verification_url = self.verification_url();
        let notification_url = self.notification_url();
        config_with(&[
            ("ENV", environment),
            ("VERIFICATION_URL", verification_url.as_str()),
            ("NOTIFICATION_URL", notification_url.as_str()),
        ])
    }
}

async fn siteverify(
    State(state): State<MockState>,
    Form(fields): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.recorded.verifications.lock().unwrap().push(fields);

    if !state.behavior.verify_delay.is_zero() {
        tokio::time::sleep(state.behavior.verify_delay).await;
    }

    (state.behavior.verify_status, state.behavior.verify_body.clone())
}

async fn messages(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> StatusCode {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    state.recorded.deliveries.lock().unwrap().push(Delivery {
        authorization,
        fields,
    });

    state.behavior.notify_status
}

pub fn secrets_json() -> String {
    serde_json::json!({
        "grecaptcha": VERIFICATION_KEY,
        "mailgun": NOTIFICATION_KEY,
        "email_recipients": RECIPIENTS,
    })
    .to_string()
}

/// Build a config from the test secrets plus the given variables.
pub fn config_with(vars: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert("api".to_string(), secrets_json());
    map.entry("REQUEST_TIMEOUT_MS".to_string())
        .or_insert_with(|| "5000".to_string());

    Config::from_vars(|name| map.get(name).cloned()).unwrap()
}

/// Serve the application on an ephemeral port and return its base URL.
pub async fn spawn_app(config: &Config) -> String {
    let relay = Relay::from_config(config).unwrap();
    let app = router(AppState::new(relay));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move { axum::serve(listener, app).await });

    address
}

// =============================================================================
// Log capture
// =============================================================================

struct BufferWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install(&self) -> DefaultGuard {
        let buffer = Arc::clone(&self.buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || BufferWriter {
                buffer: Arc::clone(&buffer),
            })
            .with_ansi(false)
            .finish();

        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}
