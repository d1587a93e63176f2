//! Example: Claiming a domain and requesting a certificate
//!
//! This example demonstrates how to connect the API client and drive a
//! claim and a certificate submission through it.
//!
//! # Setup
//!
//! 1. Set up environment variables: ```bash export
//!    CERTGATE_BASE_URL=https://certs.example.com/api/v1
//!    CERTGATE_USERNAME=ops CERTGATE_PASSWORD=... ```
//!    (or place a `certgate.toml` next to the working directory)
//!
//! 2. Put a PEM certificate request in `request.csr`
//!
//! 3. Run this example: ```bash cargo run --example issue_certificate --
//!    example.com request.csr ```

use std::sync::Arc;

use certgate_domain::{CertificateRequest, DomainClaimRequest};
use certgate_infra::api::{ApiClient, ApiCommands};
use certgate_infra::config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let domain = args.next().ok_or("usage: issue_certificate <domain> <csr-file>")?;
    let csr_path = args.next().ok_or("usage: issue_certificate <domain> <csr-file>")?;

    let config = config::load()?;
    let client = Arc::new(ApiClient::connect(config).await?);
    let commands = ApiCommands::new(Arc::clone(&client));

    if !client.health_check().await? {
        tracing::warn!("Service reports unhealthy, continuing anyway");
    }

    let ctx = client.context();
    let claim_id = commands.submit_domain_claim(&DomainClaimRequest::new(&domain), &ctx).await?;
    let claim = commands.get_domain_claim(&claim_id, &ctx).await?;
    tracing::info!(claim_id = %claim_id, status = ?claim.status, "Domain claim recorded");

    let mut request = CertificateRequest::new(std::fs::read_to_string(&csr_path)?);
    request.subject_alt_names.push(domain);

    let ctx = client.context();
    let certificate_id = commands.submit_certificate(&request, &ctx).await?;
    let certificate = commands.get_certificate(&certificate_id, &ctx).await?;
    tracing::info!(
        certificate_id = %certificate_id,
        status = ?certificate.status,
        "Certificate request processed"
    );

    Ok(())
}
