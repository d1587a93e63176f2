//! API commands for certificate and domain-claim operations
//!
//! Provides the typed interface over [`ApiClient::dispatch`]: each command
//! captures the current token in an [`Endpoint`], dispatches it under the
//! caller's [`CallContext`], and decodes the response.

use std::sync::Arc;

use certgate_domain::{
    Certificate, CertificateId, CertificateRequest, ClaimId, DomainClaim, DomainClaimRequest, Page,
    PageRequest, RevocationReason,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::client::ApiClient;
use super::context::CallContext;
use super::endpoint::Endpoint;
use super::errors::ApiError;
use super::response;

/// API commands for issuance operations
#[derive(Clone)]
pub struct ApiCommands {
    client: Arc<ApiClient>,
}

impl ApiCommands {
    /// Create a new commands instance
    ///
    /// # Arguments
    ///
    /// * `client` - Connected API client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Underlying client, e.g. for [`ApiClient::context`]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    async fn token(&self, ctx: &CallContext) -> Result<String, ApiError> {
        self.client.current_token(ctx).await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        page: PageRequest,
        ctx: &CallContext,
    ) -> Result<Page<T>, ApiError> {
        let resp = self.client.dispatch(endpoint, ctx).await?;
        let total = response::total_count(&resp)?;
        let items: Vec<T> = response::decode_json(resp, ctx).await?;

        debug!(count = items.len(), total, offset = page.offset, "Page listed");
        Ok(Page { items, total, offset: page.offset })
    }

    // === Certificate Operations ===

    /// Submit a certificate signing request
    ///
    /// # Arguments
    ///
    /// * `request` - CSR and issuance options
    /// * `ctx` - Deadline and cancellation for the call
    ///
    /// # Returns
    ///
    /// ID of the submitted certificate, from the `Location` header
    ///
    /// # Errors
    ///
    /// Returns error if the request is invalid or the API request fails
    #[instrument(skip_all)]
    pub async fn submit_certificate(
        &self,
        request: &CertificateRequest,
        ctx: &CallContext,
    ) -> Result<CertificateId, ApiError> {
        request.validate()?;

        let endpoint = Endpoint::submit_certificate(request, self.token(ctx).await?)?;
        let resp = self.client.dispatch(endpoint, ctx).await?;
        let id = CertificateId(response::resource_id(&resp)?);

        info!(certificate_id = %id, "Certificate submitted");
        Ok(id)
    }

    /// Get a certificate by ID
    ///
    /// While the service is still issuing, it answers "Operation in
    /// progress" and the dispatcher retries with backoff.
    ///
    /// # Errors
    ///
    /// Returns error if the certificate is not found or the API request fails
    #[instrument(skip(self, ctx), fields(certificate_id = %id))]
    pub async fn get_certificate(
        &self,
        id: &CertificateId,
        ctx: &CallContext,
    ) -> Result<Certificate, ApiError> {
        let endpoint = Endpoint::get_certificate(id, self.token(ctx).await?);
        let resp = self.client.dispatch(endpoint, ctx).await?;
        response::decode_json(resp, ctx).await
    }

    /// Download the issued certificate as PEM text
    ///
    /// # Errors
    ///
    /// Returns error if the certificate is not issued or the API request fails
    #[instrument(skip(self, ctx), fields(certificate_id = %id))]
    pub async fn download_certificate(
        &self,
        id: &CertificateId,
        ctx: &CallContext,
    ) -> Result<String, ApiError> {
        let endpoint = Endpoint::download_certificate(id, self.token(ctx).await?);
        let resp = self.client.dispatch(endpoint, ctx).await?;
        response::read_text(resp, ctx).await
    }

    /// List certificates with pagination
    ///
    /// # Returns
    ///
    /// One page of certificates and the total count
    ///
    /// # Errors
    ///
    /// Returns error if API request fails
    #[instrument(skip(self, ctx))]
    pub async fn list_certificates(
        &self,
        page: PageRequest,
        ctx: &CallContext,
    ) -> Result<Page<Certificate>, ApiError> {
        let endpoint = Endpoint::list_certificates(page, self.token(ctx).await?);
        self.list(endpoint, page, ctx).await
    }

    /// Revoke an issued certificate
    ///
    /// # Errors
    ///
    /// Returns error if API request fails
    #[instrument(skip(self, ctx), fields(certificate_id = %id))]
    pub async fn revoke_certificate(
        &self,
        id: &CertificateId,
        reason: RevocationReason,
        ctx: &CallContext,
    ) -> Result<(), ApiError> {
        let endpoint = Endpoint::revoke_certificate(id, reason, self.token(ctx).await?)?;
        self.client.dispatch(endpoint, ctx).await?;

        info!(certificate_id = %id, ?reason, "Certificate revoked");
        Ok(())
    }

    // === Domain Claim Operations ===

    /// Submit a domain claim
    ///
    /// # Returns
    ///
    /// ID of the claim, from the `Location` header
    ///
    /// # Errors
    ///
    /// Returns error if the domain is invalid or the API request fails
    #[instrument(skip(self, request, ctx), fields(domain = %request.domain))]
    pub async fn submit_domain_claim(
        &self,
        request: &DomainClaimRequest,
        ctx: &CallContext,
    ) -> Result<ClaimId, ApiError> {
        request.validate()?;

        let endpoint = Endpoint::submit_domain_claim(request, self.token(ctx).await?)?;
        let resp = self.client.dispatch(endpoint, ctx).await?;
        let id = ClaimId(response::resource_id(&resp)?);

        info!(claim_id = %id, "Domain claim submitted");
        Ok(id)
    }

    /// Get a domain claim by ID
    ///
    /// # Errors
    ///
    /// Returns error if the claim is not found or the API request fails
    #[instrument(skip(self, ctx), fields(claim_id = %id))]
    pub async fn get_domain_claim(
        &self,
        id: &ClaimId,
        ctx: &CallContext,
    ) -> Result<DomainClaim, ApiError> {
        let endpoint = Endpoint::get_domain_claim(id, self.token(ctx).await?);
        let resp = self.client.dispatch(endpoint, ctx).await?;
        response::decode_json(resp, ctx).await
    }

    /// List domain claims with pagination
    ///
    /// # Errors
    ///
    /// Returns error if API request fails
    #[instrument(skip(self, ctx))]
    pub async fn list_domain_claims(
        &self,
        page: PageRequest,
        ctx: &CallContext,
    ) -> Result<Page<DomainClaim>, ApiError> {
        let endpoint = Endpoint::list_domain_claims(page, self.token(ctx).await?);
        self.list(endpoint, page, ctx).await
    }

    /// Delete a domain claim
    ///
    /// # Errors
    ///
    /// Returns error if API request fails
    #[instrument(skip(self, ctx), fields(claim_id = %id))]
    pub async fn delete_domain_claim(&self, id: &ClaimId, ctx: &CallContext) -> Result<(), ApiError> {
        let endpoint = Endpoint::delete_domain_claim(id, self.token(ctx).await?);
        self.client.dispatch(endpoint, ctx).await?;

        debug!(claim_id = %id, "Domain claim deleted");
        Ok(())
    }
}
