//! Endpoint descriptors
//!
//! An [`Endpoint`] describes one remote call (method, path, query, body and
//! the bearer token captured when it was built) and can turn itself into a
//! `reqwest` request any number of times. After a re-login the dispatcher
//! swaps in the new token with [`Endpoint::set_token`]; nothing else about
//! the request has to be re-specified.
//!
//! There is one constructor per remote operation of the issuance service.

use std::fmt;

use certgate_domain::constants::{AUTHORIZATION_SCHEME, LOGIN_PATH};
use certgate_domain::{
    CertificateId, CertificateRequest, ClaimId, Credentials, DomainClaimRequest, PageRequest,
    RevocationReason, RevocationRequest,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use serde::Serialize;
use urlencoding::encode;

use super::errors::ApiError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Whether a descriptor is the login call or a normal authenticated call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// `POST /login`; never carries a token and never triggers a re-login
    Login,
    /// Any call made with the session's bearer token
    Authenticated,
}

/// Self-describing request for one remote operation
///
/// Captures everything needed to rebuild the HTTP request on each attempt,
/// so the dispatcher can swap in a refreshed token with [`Endpoint::set_token`]
/// without re-specifying the rest.
#[derive(Clone)]
pub struct Endpoint {
    kind: EndpointKind,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    token: String,
}

impl Endpoint {
    fn new(kind: EndpointKind, method: Method, path: impl Into<String>, token: String) -> Self {
        Self { kind, method, path: path.into(), query: Vec::new(), body: None, token }
    }

    /// Authenticated `GET` of `path`
    pub fn get(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(EndpointKind::Authenticated, Method::GET, path, token.into())
    }

    /// Authenticated `DELETE` of `path`
    pub fn delete(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(EndpointKind::Authenticated, Method::DELETE, path, token.into())
    }

    /// Authenticated `POST` of `body` as JSON
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if `body` cannot be serialized.
    pub fn post_json<T: Serialize>(
        path: impl Into<String>,
        body: &T,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::new(EndpointKind::Authenticated, Method::POST, path, token.into()).with_json(body)
    }

    /// Append query parameters
    #[must_use]
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::InvalidInput(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Login or authenticated
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// True for the `POST /login` descriptor
    pub fn is_login(&self) -> bool {
        self.kind == EndpointKind::Login
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL, already percent-encoded
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Serialized JSON body, if any
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Bearer token captured at construction or by the last `set_token`
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replace the bearer token in place
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// Same descriptor carrying `token`
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.set_token(token);
        self
    }

    /// Absolute URL under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }

    /// Build a fresh request for one attempt
    pub fn build(&self, http: &ReqwestClient, base_url: &str) -> RequestBuilder {
        let mut request =
            http.request(self.method.clone(), self.url(base_url)).header(ACCEPT, JSON_CONTENT_TYPE);

        if !self.query.is_empty() {
            request = request.query(&self.query);
        }

        if self.kind == EndpointKind::Authenticated {
            request =
                request.header(AUTHORIZATION, format!("{} {}", AUTHORIZATION_SCHEME, self.token));
        }

        if let Some(body) = &self.body {
            request = request.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(body.clone());
        }

        request
    }

    // === Operation descriptors ===

    /// `POST /login` with `credentials`
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if the credentials cannot be serialized.
    pub fn login(credentials: &Credentials) -> Result<Self, ApiError> {
        #[derive(Serialize)]
        struct LoginBody<'a> {
            username: &'a str,
            password: &'a str,
        }

        Self::new(EndpointKind::Login, Method::POST, LOGIN_PATH, String::new()).with_json(
            &LoginBody { username: &credentials.username, password: &credentials.password },
        )
    }

    /// `POST /certificates`
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if the request cannot be serialized.
    pub fn submit_certificate(
        request: &CertificateRequest,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::post_json("/certificates", request, token)
    }

    /// `GET /certificates/{id}`
    pub fn get_certificate(id: &CertificateId, token: impl Into<String>) -> Self {
        Self::get(format!("/certificates/{}", encode(&id.0)), token)
    }

    /// `GET /certificates/{id}/pem`
    pub fn download_certificate(id: &CertificateId, token: impl Into<String>) -> Self {
        Self::get(format!("/certificates/{}/pem", encode(&id.0)), token)
    }

    /// `GET /certificates` for one page
    pub fn list_certificates(page: PageRequest, token: impl Into<String>) -> Self {
        Self::get("/certificates", token).with_query(page.query_pairs())
    }

    /// `POST /certificates/{id}/revoke`
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if the request cannot be serialized.
    pub fn revoke_certificate(
        id: &CertificateId,
        reason: RevocationReason,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::post_json(
            format!("/certificates/{}/revoke", encode(&id.0)),
            &RevocationRequest { reason },
            token,
        )
    }

    /// `POST /claims`
    ///
    /// # Errors
    /// Returns `ApiError::InvalidInput` if the request cannot be serialized.
    pub fn submit_domain_claim(
        request: &DomainClaimRequest,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::post_json("/claims", request, token)
    }

    /// `GET /claims/{id}`
    pub fn get_domain_claim(id: &ClaimId, token: impl Into<String>) -> Self {
        Self::get(format!("/claims/{}", encode(&id.0)), token)
    }

    /// `GET /claims` for one page
    pub fn list_domain_claims(page: PageRequest, token: impl Into<String>) -> Self {
        Self::get("/claims", token).with_query(page.query_pairs())
    }

    /// `DELETE /claims/{id}`
    pub fn delete_domain_claim(id: &ClaimId, token: impl Into<String>) -> Self {
        Self::delete(format!("/claims/{}", encode(&id.0)), token)
    }
}

// Tokens and login bodies stay out of logs.
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("kind", &self.kind)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("token", &if self.token.is_empty() { "<none>" } else { "<redacted>" })
            .finish()
    }
}
