//! Domain types and models
//!
//! Payloads exchanged with the issuance service. Only the fields the client
//! itself reads or writes are modelled; unknown fields are ignored on input.

pub mod certificate;
pub mod claim;
pub mod page;

pub use certificate::{
    Certificate, CertificateId, CertificateRequest, CertificateStatus, RevocationReason,
    RevocationRequest,
};
pub use claim::{ClaimId, ClaimStatus, DomainClaim, DomainClaimRequest, ValidationMethod};
pub use page::{Page, PageRequest};
