//! Shared authentication state
//!
//! One [`Session`] is owned by each [`ApiClient`](super::client::ApiClient)
//! and shared by every task dispatching through it. The bearer token and the
//! time of the last successful login live behind a single reader/writer
//! lock: reads take the shared side, mutations the exclusive side, and no
//! operation holds the lock for more than a field copy. The login procedure
//! holds the exclusive side across its network call so that concurrent
//! refreshes serialize behind it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Token and login timestamp
///
/// `token` is empty until the first successful login and after a failed one;
/// `last_logged_in` is `None` in exactly those cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    token: String,
    last_logged_in: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Bearer token, empty when not logged in
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Time of the last successful login
    pub fn last_logged_in(&self) -> Option<DateTime<Utc>> {
        self.last_logged_in
    }

    /// True while a token is held
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// True if the last login happened less than `grace` before `now`
    pub fn is_recently_logged_in(&self, grace: Duration, now: DateTime<Utc>) -> bool {
        match self.last_logged_in {
            None => false,
            // A login stamped in the future (clock step) counts as recent.
            Some(last) => (now - last).to_std().map_or(true, |elapsed| elapsed < grace),
        }
    }

    /// Store a freshly issued token obtained at `now`
    pub fn record_success(&mut self, token: String, now: DateTime<Utc>) {
        self.token = token;
        self.last_logged_in = Some(now);
    }

    /// Forget the token and the login time after a failed login
    pub fn record_failure(&mut self) {
        self.token.clear();
        self.last_logged_in = None;
    }
}

/// Lock-protected [`SessionState`] with a fixed login grace period
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
    grace_period: Duration,
}

impl Session {
    /// Empty session using `grace_period` for [`Session::is_recently_logged_in`]
    pub fn new(grace_period: Duration) -> Self {
        Self { state: RwLock::new(SessionState::default()), grace_period }
    }

    /// Window after a login during which refreshes are skipped
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Current bearer token (empty when not logged in)
    pub async fn token(&self) -> String {
        self.state.read().await.token.clone()
    }

    /// Time of the last successful login, `None` if there is none
    pub async fn last_logged_in(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_logged_in
    }

    /// True if the last login is younger than the grace period
    pub async fn is_recently_logged_in(&self) -> bool {
        self.state.read().await.is_recently_logged_in(self.grace_period, Utc::now())
    }

    /// Store a new token under the exclusive lock
    pub async fn record_success(&self, token: String, now: DateTime<Utc>) {
        self.state.write().await.record_success(token, now);
    }

    /// Clear the session under the exclusive lock
    pub async fn record_failure(&self) {
        self.state.write().await.record_failure();
    }

    /// Shared side of the lock, for multi-step reads
    pub async fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().await
    }

    /// Exclusive side of the lock, for check-then-mutate sequences
    pub async fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    const GRACE: Duration = Duration::from_secs(60);

    #[test]
    fn fresh_state_is_not_recent() {
        let state = SessionState::default();
        assert!(!state.is_authenticated());
        assert!(!state.is_recently_logged_in(GRACE, Utc::now()));
    }

    #[test]
    fn recent_within_grace_period_only() {
        let now = Utc::now();
        let mut state = SessionState::default();
        state.record_success("tok".to_string(), now);

        assert!(state.is_recently_logged_in(GRACE, now + ChronoDuration::seconds(59)));
        assert!(!state.is_recently_logged_in(GRACE, now + ChronoDuration::seconds(60)));
        assert!(state.is_recently_logged_in(GRACE, now - ChronoDuration::seconds(5)));
        assert!(!state.is_recently_logged_in(Duration::ZERO, now));
    }

    #[test]
    fn failure_clears_token_and_timestamp() {
        let mut state = SessionState::default();
        state.record_success("tok".to_string(), Utc::now());
        state.record_failure();

        assert_eq!(state, SessionState::default());
    }

    #[tokio::test]
    async fn session_accessors_round_trip() {
        let session = Session::new(GRACE);
        assert_eq!(session.token().await, "");

        let now = Utc::now();
        session.record_success("abc".to_string(), now).await;
        assert_eq!(session.token().await, "abc");
        assert_eq!(session.last_logged_in().await, Some(now));
        assert!(session.is_recently_logged_in().await);

        session.record_failure().await;
        assert_eq!(session.token().await, "");
        assert!(!session.is_recently_logged_in().await);
    }

    #[tokio::test]
    async fn readers_wait_for_writer() {
        let session = std::sync::Arc::new(Session::new(GRACE));
        let mut guard = session.write().await;

        let reader = {
            let session = session.clone();
            tokio::spawn(async move { session.token().await })
        };
        tokio::task::yield_now().await;
        assert!(!reader.is_finished());

        guard.record_success("new".to_string(), Utc::now());
        drop(guard);

        assert_eq!(reader.await.unwrap(), "new");
    }
}
