//! Integration tests for typed commands over one shared client
//!
//! **Coverage:**
//! - Paging through a list with `X-Total-Count`
//! - Token expiry in the middle of a multi-call workflow
//! - Batch submission sharing the client's session

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use certgate_domain::{
    CertificateRequest, ClaimStatus, DomainClaimRequest, PageRequest, RevocationReason,
};
use certgate_infra::api::{ApiCommands, BatchConfig, BatchSubmitter};
use support::{
    age_session, config_for, connect_recording, expired, mount_login_sequence, requests_to,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn csr(n: usize) -> CertificateRequest {
    CertificateRequest::new(format!(
        "-----BEGIN CERTIFICATE REQUEST-----\nREQ{}\n-----END CERTIFICATE REQUEST-----\n",
        n
    ))
}

fn claim_json(id: &str) -> serde_json::Value {
    serde_json::json!({ "id": id, "domain": format!("{}.example.com", id), "status": "validated" })
}

#[tokio::test]
async fn test_paging_through_domain_claims() {
    let server = MockServer::start().await;
    mount_login_sequence(&server, &["t1"]).await;

    for (offset, ids) in [("0", vec!["a", "b"]), ("2", vec!["c", "d"]), ("4", vec!["e"])] {
        let body: Vec<_> = ids.iter().map(|id| claim_json(id)).collect();
        Mock::given(method("GET"))
            .and(path("/claims"))
            .and(query_param("offset", offset))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Total-Count", "5")
                    .set_body_json(body),
            )
            .mount(&server)
            .await;
    }

    let (client, _) = connect_recording(config_for(&server)).await;
    let commands = ApiCommands::new(Arc::clone(&client));
    let ctx = client.context();

    let mut request = PageRequest::new(0, 2);
    let mut seen = Vec::new();
    loop {
        let page = commands.list_domain_claims(request, &ctx).await.expect("page should load");
        seen.extend(page.items.iter().map(|claim| claim.id.0.clone()));
        assert!(page.items.iter().all(|claim| claim.status == ClaimStatus::Validated));
        if !page.has_more() {
            break;
        }
        request = request.next();
    }

    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_workflow_survives_token_expiry() {
    let server = MockServer::start().await;
    mount_login_sequence(&server, &["t1", "t2"]).await;

    Mock::given(method("POST"))
        .and(path("/claims"))
        .and(header("Authorization", "bearer t1"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/claims/cl-1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/certificates/c-1/revoke"))
        .and(header("Authorization", "bearer t1"))
        .respond_with(expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/certificates/c-1/revoke"))
        .and(header("Authorization", "bearer t2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, sleeper) = connect_recording(config_for(&server)).await;
    age_session(&client).await;
    let commands = ApiCommands::new(Arc::clone(&client));
    let ctx = client.context();

    let claim_id = commands
        .submit_domain_claim(&DomainClaimRequest::new("example.com"), &ctx)
        .await
        .expect("claim should be accepted");
    assert_eq!(claim_id.0, "cl-1");

    commands
        .revoke_certificate(&"c-1".into(), RevocationReason::Superseded, &ctx)
        .await
        .expect("revocation should succeed after relogin");

    assert_eq!(requests_to(&server, "/login").await, 2);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_batch_submission_relogs_in_once() {
    let server = MockServer::start().await;
    mount_login_sequence(&server, &["t1", "t2"]).await;

    Mock::given(method("POST"))
        .and(path("/certificates"))
        .and(header("Authorization", "bearer t1"))
        .respond_with(expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/certificates"))
        .and(header("Authorization", "bearer t2"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/certificates/new"))
        .expect(6)
        .mount(&server)
        .await;

    let (client, _) = connect_recording(config_for(&server)).await;
    age_session(&client).await;
    let submitter = BatchSubmitter::new(
        Arc::new(ApiCommands::new(Arc::clone(&client))),
        BatchConfig { max_parallel: 3 },
    );

    let requests = (0..6).map(csr).collect();
    let result = submitter
        .submit_certificates(requests, &client.context())
        .await
        .expect("batch should succeed");

    assert_eq!(result.submitted.len(), 6);
    assert_eq!(result.failed, 0);
    assert_eq!(requests_to(&server, "/login").await, 2);
}
