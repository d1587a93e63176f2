//! Login procedure with double-checked locking
//!
//! A token expiry seen by many tasks at once must cost one `POST /login`,
//! not one per task. [`ApiClient::relogin`] first checks the session under
//! the shared lock, then re-checks under the exclusive lock and only logs in
//! if no other task has done so in the meantime. The exclusive lock is held
//! across the login call so that late arrivals wait for its result.

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;
use super::context::CallContext;
use super::endpoint::Endpoint;
use super::errors::ApiError;
use super::response;
use super::session::SessionState;

/// Body of a successful `POST /login`
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

impl ApiClient {
    /// Log in unconditionally and replace the session token
    ///
    /// # Errors
    ///
    /// Returns the login failure; the session is cleared in that case
    #[instrument(skip_all)]
    pub async fn login(&self, ctx: &CallContext) -> Result<(), ApiError> {
        let mut state = ctx.guard(self.session().write()).await?;
        self.login_locked(&mut state, ctx).await
    }

    /// Refresh the session after `stale_token` was rejected as expired
    ///
    /// Skipped when any task logged in within the grace period; the
    /// dispatcher bounds repeated expiries with `max_relogins`.
    ///
    /// # Arguments
    ///
    /// * `stale_token` - Token the service just rejected, for tracing only
    /// * `ctx` - Deadline and cancellation for the lock wait and the login
    ///
    /// # Errors
    ///
    /// Returns the login failure, or a deadline/cancellation error while
    /// waiting for the session lock
    pub(crate) fn relogin<'a>(
        &'a self,
        stale_token: &'a str,
        ctx: &'a CallContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        // Boxed: the login call goes back through dispatch.
        Box::pin(async move {
            let grace = self.session().grace_period();

            {
                let state = ctx.guard(self.session().read()).await?;
                if state.is_recently_logged_in(grace, Utc::now()) {
                    debug!(reissued = state.token() == stale_token, "Recent login, skipping");
                    return Ok(());
                }
            }

            let mut state = ctx.guard(self.session().write()).await?;
            if state.is_recently_logged_in(grace, Utc::now()) {
                debug!(
                    reissued = state.token() == stale_token,
                    "Session refreshed while waiting for lock, skipping login"
                );
                return Ok(());
            }

            self.login_locked(&mut state, ctx).await
        })
    }

    async fn login_locked(&self, state: &mut SessionState, ctx: &CallContext) -> Result<(), ApiError> {
        match self.request_token(ctx).await {
            Ok(token) => {
                state.record_success(token, Utc::now());
                info!(username = %self.config().credentials.username, "Logged in");
                Ok(())
            }
            Err(err) => {
                state.record_failure();
                warn!(error = %err, "Login failed, session cleared");
                Err(err)
            }
        }
    }

    async fn request_token(&self, ctx: &CallContext) -> Result<String, ApiError> {
        let endpoint = Endpoint::login(&self.config().credentials)?;

        let resp = self.dispatch(endpoint, ctx).await?;

        let body: LoginResponse = response::decode_json(resp, ctx).await.map_err(|e| match e {
            ApiError::Decode(msg) => ApiError::Auth(format!("Unusable login response: {}", msg)),
            other => other,
        })?;

        if body.token.trim().is_empty() {
            return Err(ApiError::Auth("Login response carried an empty token".to_string()));
        }

        Ok(body.token)
    }
}
