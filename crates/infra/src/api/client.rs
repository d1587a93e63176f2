//! API client with token refresh and transient-failure retries
//!
//! [`ApiClient::dispatch`] drives one logical call to completion:
//!
//! 1. build the request from the [`Endpoint`] and send it under the caller's
//!    [`CallContext`]; transport failures are returned immediately
//! 2. any 2xx except 202 is success
//! 3. an expired token runs the login procedure and retries with the
//!    refreshed token without touching the retry budget (the login endpoint
//!    itself fails with [`ApiError::RecursiveLogin`] instead)
//! 4. "service busy" / "operation in progress" consume the retry budget and
//!    sleep `base_delay × retries_used` before the next attempt
//! 5. everything else is returned as a permanent [`ApiError::Service`]
//!
//! The client is `Send + Sync` and meant to be shared behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use certgate_domain::constants::HEALTH_PATH;
use certgate_domain::ClientConfig;
use reqwest::{Client as ReqwestClient, Method, Response};
use tracing::{debug, info, instrument, warn};

use super::backoff::{linear_delay, BackoffSleeper, RetryBudget, TokioSleeper};
use super::context::CallContext;
use super::endpoint::Endpoint;
use super::errors::{ApiError, ResponseClass};
use super::session::Session;
use crate::http::HttpTransportBuilder;

/// Authenticated client for the issuance service
pub struct ApiClient {
    http: ReqwestClient,
    config: ClientConfig,
    session: Session,
    sleeper: Arc<dyn BackoffSleeper>,
}

impl ApiClient {
    /// Build a client from `config` and perform the initial login
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the transport cannot be
    /// built, or the initial login fails
    pub async fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).connect().await
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Configuration the client was built from
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared session holding the bearer token
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Context bounded by the configured default timeout
    pub fn context(&self) -> CallContext {
        CallContext::with_timeout(self.config.timeout())
    }

    /// Bearer token to capture in a new [`Endpoint`]
    ///
    /// # Errors
    ///
    /// Returns error if the deadline passes while a login holds the session
    pub async fn current_token(&self, ctx: &CallContext) -> Result<String, ApiError> {
        ctx.guard(self.session.token()).await
    }

    /// Execute one logical API call
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Request descriptor, built with the current token
    /// * `ctx` - Deadline and cancellation for the whole call, including
    ///   re-logins and backoff sleeps
    ///
    /// # Returns
    ///
    /// The successful response, body unread
    ///
    /// # Errors
    ///
    /// Returns transport errors as-is, `RecursiveLogin` if the login call is
    /// told its token expired, and `Service` for permanent failures and for
    /// retryable ones once the budget is spent
    #[instrument(skip_all, fields(method = %endpoint.method(), path = %endpoint.path()))]
    pub async fn dispatch(
        &self,
        mut endpoint: Endpoint,
        ctx: &CallContext,
    ) -> Result<Response, ApiError> {
        let mut budget = RetryBudget::new(self.config.retry_budget);
        let mut relogins = 0u32;

        loop {
            let request = endpoint.build(&self.http, &self.config.base_url);
            let response = ctx.guard(request.send()).await?.map_err(|e| self.transport_error(e))?;
            let status = response.status();

            let class = ctx
                .guard(ResponseClass::from_response(response))
                .await?
                .map_err(|e| self.transport_error(e))?;

            match class {
                ResponseClass::Success(response) => {
                    debug!(%status, retries = budget.used(), relogins, "Request succeeded");
                    return Ok(response);
                }
                ResponseClass::ExpiredToken(error) => {
                    if endpoint.is_login() {
                        return Err(ApiError::RecursiveLogin);
                    }
                    if relogins >= self.config.max_relogins {
                        return Err(ApiError::Service(error));
                    }
                    relogins += 1;

                    debug!(relogins, "Token rejected as expired, refreshing session");
                    self.relogin(endpoint.token(), ctx).await?;
                    endpoint.set_token(self.current_token(ctx).await?);
                }
                ResponseClass::Retryable(error) => {
                    let Some(attempt) = budget.consume() else {
                        return Err(ApiError::Service(error));
                    };
                    let delay = linear_delay(self.config.retry_base_delay(), attempt);

                    warn!(
                        status = error.status_code,
                        description = %error.description,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Service not ready, backing off"
                    );
                    ctx.guard(self.sleeper.sleep(delay)).await?;
                }
                ResponseClass::Permanent(error) => return Err(ApiError::Service(error)),
            }
        }
    }

    /// Health check for the service
    ///
    /// # Returns
    ///
    /// `true` if the service is reachable and healthy
    ///
    /// # Errors
    ///
    /// Returns error if the service cannot be reached
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), HEALTH_PATH);
        let timeout = Duration::from_secs(5).min(self.config.timeout());

        debug!(url = %url, "Health check");

        let response = tokio::time::timeout(timeout, self.http.request(Method::GET, &url).send())
            .await
            .map_err(|_| {
                warn!("Health check timeout");
                ApiError::Timeout(timeout)
            })?;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("Service is healthy");
                Ok(true)
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Service returned non-success status");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                Err(self.transport_error(e))
            }
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        ApiError::from_transport(err, self.config.timeout())
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    http: Option<ReqwestClient>,
    sleeper: Option<Arc<dyn BackoffSleeper>>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a preconfigured transport instead of building one from the config
    pub fn http_client(mut self, http: ReqwestClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Replace the tokio sleeper used between retries
    pub fn sleeper(mut self, sleeper: Arc<dyn BackoffSleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Build the client and log in
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the transport cannot be
    /// built, or the initial login fails
    pub async fn connect(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => HttpTransportBuilder::from_config(&config).build()?,
        };

        let client = ApiClient {
            http,
            session: Session::new(config.login_grace_period()),
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
            config,
        };

        let ctx = client.context();
        client.login(&ctx).await?;

        info!(base_url = %client.config.base_url, "API client connected");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use certgate_domain::Credentials;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::errors::ServiceError;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl BackoffSleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    fn config_for(server: &MockServer) -> ClientConfig {
        ClientConfig {
            retry_base_delay_ms: 100,
            ..ClientConfig::new(server.uri(), Credentials::new("ops", "secret"))
        }
    }

    async fn mount_login(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": token
            })))
            .mount(server)
            .await;
    }

    async fn connect(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> ApiClient {
        ApiClient::builder().config(config_for(server)).sleeper(sleeper).connect().await.unwrap()
    }

    #[tokio::test]
    async fn connect_logs_in_and_stores_token() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-1").await;

        let client = connect(&server, Arc::default()).await;

        assert_eq!(client.session().token().await, "tok-1");
        assert!(client.session().last_logged_in().await.is_some());
    }

    #[tokio::test]
    async fn connect_fails_on_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "description": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let result = ApiClient::connect(config_for(&server)).await;
        match result {
            Err(ApiError::Service(err)) => assert_eq!(err, ServiceError::new(401, "Bad credentials")),
            other => panic!("expected service error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn builder_rejects_invalid_config() {
        let result = ApiClient::builder().connect().await;
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn connect_rejects_unbounded_timeout_without_sending() {
        let server = MockServer::start().await;
        mount_login(&server, "tok").await;

        let config = ClientConfig { timeout_secs: u64::MAX, ..config_for(&server) };
        let result = ApiClient::connect(config).await;

        assert!(matches!(result, Err(ApiError::Config(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatch_sends_bearer_token() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-1").await;
        Mock::given(method("GET"))
            .and(path("/certificates/c-1"))
            .and(header("Authorization", "bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = connect(&server, Arc::default()).await;
        let ctx = client.context();
        let token = client.current_token(&ctx).await.unwrap();

        let response = client.dispatch(Endpoint::get("/certificates/c-1", token), &ctx).await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn accepted_is_not_success() {
        let server = MockServer::start().await;
        mount_login(&server, "tok").await;
        Mock::given(method("GET"))
            .and(path("/certificates/c-9"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({ "description": "Queued" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = connect(&server, sleeper.clone()).await;
        let ctx = client.context();

        let result = client.dispatch(Endpoint::get("/certificates/c-9", "tok"), &ctx).await;
        assert_eq!(result.unwrap_err().status_code(), Some(202));
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let server = MockServer::start().await;
        mount_login(&server, "tok").await;
        Mock::given(method("DELETE"))
            .and(path("/claims/cl-1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("claim not found"))
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = connect(&server, sleeper.clone()).await;
        let ctx = client.context();

        let err = client.dispatch(Endpoint::delete("/claims/cl-1", "tok"), &ctx).await.unwrap_err();
        assert_eq!(err.service_error(), Some(&ServiceError::new(404, "claim not found")));
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn busy_exhausts_budget_with_increasing_delays() {
        let server = MockServer::start().await;
        mount_login(&server, "tok").await;
        Mock::given(method("GET"))
            .and(path("/certificates"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({ "description": "Service busy" })),
            )
            .expect(6)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = connect(&server, sleeper.clone()).await;
        let ctx = client.context();

        let err = client.dispatch(Endpoint::get("/certificates", "tok"), &ctx).await.unwrap_err();
        assert_eq!(err.service_error(), Some(&ServiceError::SERVICE_BUSY));

        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays.len(), 5);
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[4], Duration::from_millis(500));
        assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn transport_failure_is_not_an_api_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = MockServer::start().await;
        mount_login(&server, "tok").await;
        let client = connect(&server, Arc::default()).await;
        drop(listener);

        let mut config = client.config().clone();
        config.base_url = format!("http://{}", addr);
        let client = ApiClient { config, ..client };

        let err = client.dispatch(Endpoint::get("/claims", "tok"), &client.context()).await;
        match err {
            Err(ApiError::Network(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_health_check_success() {
        let server = MockServer::start().await;
        mount_login(&server, "tok").await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = connect(&server, Arc::default()).await;
        assert!(client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let server = MockServer::start().await;
        mount_login(&server, "tok").await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = connect(&server, Arc::default()).await;
        assert!(!client.health_check().await.unwrap()); // Unhealthy but no error
    }
}
