use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use certgate_domain::{ClientConfig, Credentials};
use certgate_infra::api::{ApiClient, BackoffSleeper};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_EXPIRED: &str = "Token expired or invalid";

/// Sleeper that records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("sleeper mutex poisoned").clone()
    }
}

#[async_trait]
impl BackoffSleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().expect("sleeper mutex poisoned").push(delay);
    }
}

/// Install a test-friendly tracing subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("certgate_infra=debug")
            .with_test_writer()
            .try_init();
    });
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri(), Credentials::new("ops", "secret"))
}

/// Mount `POST /login` answering with `tokens` in order; the last token is
/// repeated for every later login.
pub async fn mount_login_sequence(server: &MockServer, tokens: &[&str]) {
    let Some((last, first)) = tokens.split_last() else {
        return;
    };

    for token in first {
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(login_ok(token))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    Mock::given(method("POST")).and(path("/login")).respond_with(login_ok(last)).mount(server).await;
}

pub fn login_ok(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token }))
}

pub fn error_response(status: u16, description: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({ "description": description }))
}

pub fn expired() -> ResponseTemplate {
    error_response(401, TOKEN_EXPIRED)
}

pub fn busy() -> ResponseTemplate {
    error_response(503, "Service busy")
}

pub fn in_progress() -> ResponseTemplate {
    error_response(202, "Operation in progress")
}

/// Connect a client whose backoff sleeps are recorded.
pub async fn connect_recording(config: ClientConfig) -> (Arc<ApiClient>, Arc<RecordingSleeper>) {
    init_tracing();
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = ApiClient::builder()
        .config(config)
        .sleeper(sleeper.clone())
        .connect()
        .await
        .expect("client should connect");

    (Arc::new(client), sleeper)
}

/// Backdate the last login past the grace period so that the next token
/// expiry performs a real login.
pub async fn age_session(client: &ApiClient) {
    let token = client.session().token().await;
    let grace = chrono::Duration::from_std(client.session().grace_period())
        .unwrap_or_else(|_| chrono::Duration::days(1));
    let past = Utc::now() - grace - chrono::Duration::seconds(1);
    client.session().record_success(token, past).await;
}

/// Number of requests the server received for `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
