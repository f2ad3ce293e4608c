// crates/pactum-core/tests/signing.rs
// ============================================================================
// Module: Signature Recording Tests
// Description: Provider-assisted, caller-asserted, and failing signing flows.
// Purpose: Validate hash binding, rejection records, and in-flight commits.
// Dependencies: pactum-core, serde_json
// ============================================================================
//! ## Overview
//! Signatures are always bound to the hash current at admission time. These
//! tests cover stale hashes, authority failures, expired credentials, the
//! call deadline, two concurrent provider responses, and commits that find
//! the contract regenerated or canceled while the authority was answering.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::AcceptingAuthority;
use common::BarrierAuthority;
use common::RefusingAuthority;
use common::SlowAuthority;
use common::TestEngine;
use common::complete_data;
use common::engine_with;
use common::expired_credential;
use common::live_credential;
use common::new_contract;
use common::seeded_catalog;
use common::user;
use pactum_core::ActivityAction;
use pactum_core::AuthorityError;
use pactum_core::AuthorityRequest;
use pactum_core::CallerAssertion;
use pactum_core::Clock;
use pactum_core::ContractEngine;
use pactum_core::ContractError;
use pactum_core::ContractId;
use pactum_core::ContractStatus;
use pactum_core::DocumentRenderer;
use pactum_core::EngineConfig;
use pactum_core::InMemoryAuditSink;
use pactum_core::OriginMetadata;
use pactum_core::SignatureAssertion;
use pactum_core::SignatureMethod;
use pactum_core::SignatureOutcome;
use pactum_core::SignatureRequest;
use pactum_core::SignatureStatus;
use pactum_core::SigningAuthority;
use pactum_core::SigningMethodRequest;
use pactum_core::UnconfiguredAuthority;
use serde_json::json;
use time::OffsetDateTime;

/// Creates and generates a contract, returning its id and hash.
fn generated<A: SigningAuthority + 'static>(
    engine: &TestEngine<A>,
    catalog: &common::Catalog,
) -> (ContractId, String) {
    let origin = OriginMetadata::default();
    let contract = engine.create(new_contract(catalog, complete_data()), &origin).unwrap();
    let generated = engine.generate(contract.id, user(1), &origin).unwrap().contract;
    (contract.id, generated.current_hash().unwrap().value.clone())
}

fn provider_request(contract_id: ContractId, hash: &str) -> SignatureRequest {
    SignatureRequest {
        contract_id,
        signer: user(2),
        document_hash: hash.to_string(),
        method: SigningMethodRequest::IdentityProvider {
            credential: live_credential(),
        },
        origin: OriginMetadata {
            ip_address: Some("192.0.2.10".parse().unwrap()),
            user_agent: Some("Mozilla/5.0".to_string()),
        },
    }
}

fn simple_request(contract_id: ContractId, hash: &str, signed: bool) -> SignatureRequest {
    SignatureRequest {
        contract_id,
        signer: user(3),
        document_hash: hash.to_string(),
        method: SigningMethodRequest::Simple {
            assertion: CallerAssertion {
                signature: Some("aceite-eletronico".to_string()),
                certificate_info: Some(json!({"channel": "web"})),
                signed,
            },
        },
        origin: OriginMetadata::default(),
    }
}

#[test]
fn provider_success_signs_the_contract() {
    let catalog = seeded_catalog();
    let authority = Arc::new(AcceptingAuthority::default());
    let (engine, audit) = engine_with(&catalog, Arc::clone(&authority), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);

    let outcome = engine.record_signature(provider_request(id, &hash)).unwrap();
    assert!(outcome.failure.is_none());
    assert_eq!(outcome.record.status, SignatureStatus::Signed);
    assert_eq!(outcome.record.method, SignatureMethod::IdentityProvider);
    assert_eq!(outcome.record.document_hash, hash);
    assert_eq!(outcome.record.signature.as_deref(), Some(format!("sig-{}", &hash[.. 8]).as_str()));
    assert!(outcome.record.signed_at.is_some());
    let info = outcome.record.certificate_info.clone().unwrap();
    assert_eq!(info["payload"]["certificateId"], json!("cert-1"));
    assert_eq!(info["identity"], json!({"name": "Ana Souza"}));
    assert_eq!(outcome.record.origin.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(outcome.contract.status, ContractStatus::Signed);
    assert_eq!(authority.calls.lock().unwrap().as_slice(), [hash]);

    let last = audit.events().pop().unwrap();
    assert_eq!(last.action, ActivityAction::SignatureRecorded);
    assert_eq!(last.detail["contract_status"], json!("signed"));
}

#[test]
fn authority_failure_records_rejection_and_allows_retry() {
    let catalog = seeded_catalog();
    let (engine, audit) = engine_with(&catalog, Arc::new(RefusingAuthority), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);

    let outcome = engine.record_signature(provider_request(id, &hash)).unwrap();
    assert_eq!(outcome.record.status, SignatureStatus::Rejected);
    assert_eq!(outcome.failure, Some(AuthorityError::Rejected("certificate revoked".to_string())));
    assert!(outcome.record.failure_reason.as_deref().unwrap().contains("certificate revoked"));
    assert!(outcome.record.signed_at.is_none());
    assert_eq!(outcome.contract.status, ContractStatus::Generated);
    let last = audit.events().pop().unwrap();
    assert_eq!(last.action, ActivityAction::SignatureRejected);
    assert_eq!(last.detail["error_kind"], json!("rejected"));

    let retry = engine.record_signature(simple_request(id, &hash, true)).unwrap();
    assert_eq!(retry.contract.status, ContractStatus::Signed);
    let history = engine.show(id).unwrap().signatures;
    let statuses: Vec<SignatureStatus> = history.iter().map(|record| record.status).collect();
    assert_eq!(statuses, vec![SignatureStatus::Rejected, SignatureStatus::Signed]);
}

#[test]
fn expired_credential_skips_the_authority() {
    let catalog = seeded_catalog();
    let authority = Arc::new(AcceptingAuthority::default());
    let (engine, _) = engine_with(&catalog, Arc::clone(&authority), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);

    let mut request = provider_request(id, &hash);
    request.method = SigningMethodRequest::IdentityProvider {
        credential: expired_credential(),
    };
    let outcome = engine.record_signature(request).unwrap();
    assert_eq!(outcome.record.status, SignatureStatus::Expired);
    assert_eq!(outcome.failure, Some(AuthorityError::CredentialExpired));
    assert_eq!(outcome.contract.status, ContractStatus::Generated);
    assert!(authority.calls.lock().unwrap().is_empty());
}

#[test]
fn slow_authority_times_out_as_rejection() {
    let catalog = seeded_catalog();
    let config = EngineConfig {
        signing_deadline: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let (engine, _) =
        engine_with(&catalog, Arc::new(SlowAuthority(Duration::from_millis(500))), config);
    let (id, hash) = generated(&engine, &catalog);

    let outcome = engine.record_signature(provider_request(id, &hash)).unwrap();
    assert_eq!(outcome.record.status, SignatureStatus::Rejected);
    assert_eq!(outcome.failure, Some(AuthorityError::Timeout(50)));
    assert_eq!(outcome.failure.unwrap().kind(), "timeout");
}

#[test]
fn unconfigured_authority_rejects_provider_signing() {
    let catalog = seeded_catalog();
    let (engine, _) =
        engine_with(&catalog, Arc::new(UnconfiguredAuthority), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);
    let outcome = engine.record_signature(provider_request(id, &hash)).unwrap();
    assert_eq!(outcome.record.status, SignatureStatus::Rejected);
    assert_eq!(outcome.failure.unwrap().kind(), "unavailable");
}

#[test]
fn stale_hash_is_refused_without_a_record() {
    let catalog = seeded_catalog();
    let authority = Arc::new(AcceptingAuthority::default());
    let (engine, audit) = engine_with(&catalog, Arc::clone(&authority), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);
    let events_before = audit.events().len();

    let stale = "0".repeat(64);
    let err = engine.record_signature(provider_request(id, &stale)).unwrap_err();
    let ContractError::StaleDocument {
        supplied,
        current,
    } = err
    else {
        panic!("expected stale document error");
    };
    assert_eq!(supplied, stale);
    assert_eq!(current, Some(hash));
    assert!(engine.show(id).unwrap().signatures.is_empty());
    assert!(authority.calls.lock().unwrap().is_empty());
    assert_eq!(audit.events().len(), events_before);
}

#[test]
fn signing_requires_a_generated_contract() {
    let catalog = seeded_catalog();
    let (engine, _) =
        engine_with(&catalog, Arc::new(AcceptingAuthority::default()), EngineConfig::default());
    let origin = OriginMetadata::default();
    let draft = engine.create(new_contract(&catalog, complete_data()), &origin).unwrap();
    let err = engine.record_signature(simple_request(draft.id, "abc", true)).unwrap_err();
    assert_eq!(err.kind(), "invalid_state");

    let (id, hash) = generated(&engine, &catalog);
    engine.record_signature(simple_request(id, &hash, true)).unwrap();
    let err = engine.record_signature(simple_request(id, &hash, true)).unwrap_err();
    assert_eq!(err.kind(), "invalid_state");
}

#[test]
fn unsigned_caller_assertion_stays_pending() {
    let catalog = seeded_catalog();
    let (engine, audit) =
        engine_with(&catalog, Arc::new(AcceptingAuthority::default()), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);
    let outcome = engine.record_signature(simple_request(id, &hash, false)).unwrap();
    assert_eq!(outcome.record.status, SignatureStatus::Pending);
    assert_eq!(outcome.record.certificate_info, Some(json!({"channel": "web"})));
    assert_eq!(outcome.contract.status, ContractStatus::Generated);
    assert_eq!(audit.events().pop().unwrap().action, ActivityAction::SignatureRecorded);
}

#[test]
fn regeneration_with_unchanged_data_keeps_the_hash_current() {
    let catalog = seeded_catalog();
    let (engine, _) =
        engine_with(&catalog, Arc::new(AcceptingAuthority::default()), EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);
    engine.generate(id, user(1), &OriginMetadata::default()).unwrap();
    let outcome = engine.record_signature(simple_request(id, &hash, true)).unwrap();
    assert_eq!(outcome.record.document_hash, hash);
}

#[test]
fn regeneration_at_a_later_instant_makes_old_hashes_stale() {
    let catalog = seeded_catalog();
    let engine = ContractEngine::new(
        catalog.store.clone(),
        catalog.store.clone(),
        Arc::new(AcceptingAuthority::default()),
        InMemoryAuditSink::new(),
        Arc::new(SteppingClock::default()),
        DocumentRenderer::default(),
        EngineConfig::default(),
    );
    let origin = OriginMetadata::default();
    let contract = engine.create(new_contract(&catalog, complete_data()), &origin).unwrap();
    let first = engine.generate(contract.id, user(1), &origin).unwrap().contract;
    let second = engine.generate(contract.id, user(1), &origin).unwrap().contract;
    let old_hash = first.current_hash().unwrap().value.clone();
    assert_ne!(Some(&old_hash), second.current_hash().map(|hash| &hash.value));

    let err = engine.record_signature(simple_request(contract.id, &old_hash, true)).unwrap_err();
    assert_eq!(err.kind(), "stale_document");
}

/// Clock that advances one second per reading.
#[derive(Default)]
struct SteppingClock {
    readings: AtomicI64,
}

impl Clock for SteppingClock {
    fn now(&self) -> OffsetDateTime {
        let step = self.readings.fetch_add(1, Ordering::SeqCst);
        common::FIXED_INSTANT + time::Duration::seconds(step)
    }
}

#[test]
fn concurrent_provider_successes_both_commit() {
    let catalog = seeded_catalog();
    let authority = Arc::new(BarrierAuthority {
        barrier: Barrier::new(2),
    });
    let (engine, _) = engine_with(&catalog, authority, EngineConfig::default());
    let (id, hash) = generated(&engine, &catalog);

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0 .. 2)
            .map(|_| scope.spawn(|| engine.record_signature(provider_request(id, &hash))))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for outcome in &outcomes {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.record.status, SignatureStatus::Signed);
        assert_eq!(outcome.contract.status, ContractStatus::Signed);
    }
    let view = engine.show(id).unwrap();
    assert_eq!(view.contract.status, ContractStatus::Signed);
    assert_eq!(view.signatures.len(), 2);
    assert!(view.signatures.iter().all(|record| record.document_hash == hash));
}

/// Authority that parks each call between two rendezvous with the test thread.
struct GateAuthority {
    /// Passed once when the call starts and once before it answers.
    gate: Barrier,
}

impl SigningAuthority for GateAuthority {
    fn sign(&self, request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        self.gate.wait();
        self.gate.wait();
        Ok(SignatureAssertion {
            signature: format!("sig-{}", request.credential.certificate_id),
            payload: json!({"signature": "ok"}),
            identity: None,
        })
    }
}

/// Result of a provider call with another operation interleaved.
struct Interleaved {
    /// Outcome of the signing call.
    result: Result<SignatureOutcome, ContractError>,
    /// Engine after both operations finished.
    engine: TestEngine<GateAuthority>,
    /// Captured audit trail.
    audit: InMemoryAuditSink,
    /// Contract under test.
    id: ContractId,
}

/// Runs a provider signing call and `interleave` while the authority holds it.
fn sign_across(interleave: impl FnOnce(&TestEngine<GateAuthority>, ContractId)) -> Interleaved {
    let catalog = seeded_catalog();
    let audit = InMemoryAuditSink::new();
    let authority = Arc::new(GateAuthority {
        gate: Barrier::new(2),
    });
    let engine = ContractEngine::new(
        catalog.store.clone(),
        catalog.store.clone(),
        Arc::clone(&authority),
        audit.clone(),
        Arc::new(SteppingClock::default()),
        DocumentRenderer::default(),
        EngineConfig::default(),
    );
    let (id, hash) = generated(&engine, &catalog);
    let result = std::thread::scope(|scope| {
        let signer = scope.spawn(|| engine.record_signature(provider_request(id, &hash)));
        authority.gate.wait();
        interleave(&engine, id);
        authority.gate.wait();
        signer.join().unwrap()
    });
    Interleaved {
        result,
        engine,
        audit,
        id,
    }
}

#[test]
fn regeneration_during_provider_call_discards_the_signature() {
    let run = sign_across(|engine, id| {
        engine.generate(id, user(1), &OriginMetadata::default()).unwrap();
    });

    let err = run.result.unwrap_err();
    assert_eq!(err.kind(), "stale_document");
    let view = run.engine.show(run.id).unwrap();
    assert!(view.signatures.is_empty());
    assert_eq!(view.contract.status, ContractStatus::Generated);

    let last = run.audit.events().pop().unwrap();
    assert_eq!(last.action, ActivityAction::SignatureRejected);
    assert_eq!(last.detail["error_kind"], "stale_document");
    assert_eq!(last.detail["status"], "signed");
}

#[test]
fn cancel_during_provider_call_rejects_the_commit() {
    let run = sign_across(|engine, id| {
        engine.cancel(id, user(1), &OriginMetadata::default()).unwrap();
    });

    let err = run.result.unwrap_err();
    assert_eq!(err.kind(), "invalid_state");
    let view = run.engine.show(run.id).unwrap();
    assert!(view.signatures.is_empty());
    assert_eq!(view.contract.status, ContractStatus::Canceled);

    let last = run.audit.events().pop().unwrap();
    assert_eq!(last.action, ActivityAction::SignatureRejected);
    assert_eq!(last.detail["error_kind"], "invalid_state");
}
