// crates/pactum-core/tests/labels.rs
// ============================================================================
// Module: Enumeration Label Tests
// Description: Canonical and legacy labels for closed enumerations.
// Purpose: Ensure unknown labels are rejected at parse time.
// Dependencies: pactum-core, serde_json
// ============================================================================
//! ## Overview
//! English labels are canonical; Portuguese legacy labels parse as aliases.

#![allow(
    clippy::unwrap_used,
    reason = "Test-only assertions are permitted."
)]

use pactum_core::ContractCategory;
use pactum_core::ContractStatus;
use pactum_core::PartyRole;
use pactum_core::SignatureMethod;
use pactum_core::SignatureStatus;
use serde_json::json;

#[test]
fn legacy_labels_are_accepted_as_aliases() {
    assert_eq!("servico".parse::<ContractCategory>().unwrap(), ContractCategory::Service);
    assert_eq!("gerado".parse::<ContractStatus>().unwrap(), ContractStatus::Generated);
    assert_eq!("testemunha".parse::<PartyRole>().unwrap(), PartyRole::Witness);
    assert_eq!("govbr".parse::<SignatureMethod>().unwrap(), SignatureMethod::IdentityProvider);
    assert_eq!("expirado".parse::<SignatureStatus>().unwrap(), SignatureStatus::Expired);
    let status: SignatureStatus = serde_json::from_value(json!("assinado")).unwrap();
    assert_eq!(status, SignatureStatus::Signed);
}

#[test]
fn canonical_labels_serialize_in_english() {
    assert_eq!(serde_json::to_value(ContractStatus::Canceled).unwrap(), json!("canceled"));
    assert_eq!(serde_json::to_value(SignatureMethod::Certificate).unwrap(), json!("certificate"));
    assert_eq!(ContractCategory::Rental.to_string(), "rental");
}

#[test]
fn unknown_labels_are_rejected() {
    let err = "arquivado".parse::<ContractStatus>().unwrap_err();
    assert_eq!(err.to_string(), "unknown contract status: arquivado");
    assert!("".parse::<PartyRole>().is_err());
    assert!(serde_json::from_value::<SignatureMethod>(json!("fax")).is_err());
}
