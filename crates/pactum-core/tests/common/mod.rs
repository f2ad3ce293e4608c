// crates/pactum-core/tests/common/mod.rs
// ============================================================================
// Module: Pactum Core Test Fixtures
// Description: Shared catalog, engine, and authority fixtures.
// Purpose: Build deterministic engines over the in-memory store.
// Dependencies: pactum-core, serde_json, time
// ============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared fixtures are used selectively by each test binary."
)]

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::Mutex;
use std::time::Duration;

use pactum_core::AuthorityError;
use pactum_core::AuthorityRequest;
use pactum_core::CatalogWriter;
use pactum_core::ContractCategory;
use pactum_core::ContractEngine;
use pactum_core::ContractTemplate;
use pactum_core::ContractTypeId;
use pactum_core::DocumentRenderer;
use pactum_core::EngineConfig;
use pactum_core::FieldSchema;
use pactum_core::FixedClock;
use pactum_core::InMemoryAuditSink;
use pactum_core::InMemoryStore;
use pactum_core::NewContract;
use pactum_core::NewContractType;
use pactum_core::NewTemplate;
use pactum_core::SignatureAssertion;
use pactum_core::SigningAuthority;
use pactum_core::SigningCredential;
use pactum_core::Timestamp;
use pactum_core::UserId;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::macros::datetime;

/// Fixed render instant: 07/03/2025 09:05:02 UTC.
pub const FIXED_INSTANT: OffsetDateTime = datetime!(2025-03-07 09:05:02 UTC);

/// Template body exercising field and clock tokens.
pub const SERVICE_BODY: &str = "CONTRATANTE: {{CONTRATANTE_NOME}} (CPF {{CONTRATANTE_CPF}})\n\
CONTRATADO: {{CONTRATADO_NOME}}, {{CONTRATADO_PROFISSAO}}\n\
VALOR: {{VALOR}}\n\
Assinado em {{DATA_ATUAL}} as {{HORA_ATUAL}}";

/// Engine type used across tests.
pub type TestEngine<A> = ContractEngine<InMemoryStore, InMemoryStore, A, InMemoryAuditSink>;

/// Catalog fixture with one type and one template.
pub struct Catalog {
    /// Shared store.
    pub store: InMemoryStore,
    /// Registered type.
    pub type_id: ContractTypeId,
    /// Published template.
    pub template: ContractTemplate,
}

/// Seeds a store with a service type and template.
pub fn seeded_catalog() -> Catalog {
    let store = InMemoryStore::new();
    let created_at = Timestamp::from_unix_millis(1_700_000_000_000);
    let contract_type = store
        .insert_contract_type(
            NewContractType {
                name: "Prestacao de Servicos".to_string(),
                description: None,
                category: ContractCategory::Service,
            },
            created_at,
        )
        .unwrap();
    let template = store
        .publish_template(
            NewTemplate {
                contract_type_id: contract_type.id,
                name: "Servico padrao".to_string(),
                body: SERVICE_BODY.to_string(),
                required_fields: FieldSchema::new()
                    .with_section("contratante", ["nome_completo", "cpf"])
                    .with_section("contrato", ["valor"]),
                optional_fields: FieldSchema::new().with_section("contratado", ["profissao"]),
                version: "1.0".to_string(),
            },
            created_at,
        )
        .unwrap();
    Catalog {
        store,
        type_id: contract_type.id,
        template,
    }
}

/// Builds an engine over the catalog with a fixed clock.
pub fn engine_with<A: SigningAuthority + 'static>(
    catalog: &Catalog,
    authority: Arc<A>,
    config: EngineConfig,
) -> (TestEngine<A>, InMemoryAuditSink) {
    let audit = InMemoryAuditSink::new();
    let engine = ContractEngine::new(
        catalog.store.clone(),
        catalog.store.clone(),
        authority,
        audit.clone(),
        Arc::new(FixedClock::new(FIXED_INSTANT)),
        DocumentRenderer::default(),
        config,
    );
    (engine, audit)
}

/// Fully populated data bag.
pub fn complete_data() -> Value {
    json!({
        "contratante": {"nome_completo": "Ana Souza", "cpf": "123.456.789-00"},
        "contratado": {"nome_completo": "Bruno Lima", "profissao": "Eletricista"},
        "contrato": {"valor": 1500}
    })
}

/// Contract creation request for the seeded template.
pub fn new_contract(catalog: &Catalog, data: Value) -> NewContract {
    NewContract {
        owner: user(1),
        contract_type_id: catalog.type_id,
        template_id: catalog.template.id,
        title: "Reforma eletrica".to_string(),
        data,
        parties: Vec::new(),
    }
}

/// Builds a user id.
pub fn user(raw: u64) -> UserId {
    UserId::from_raw(raw).unwrap()
}

/// Credential valid well past the fixed instant.
pub fn live_credential() -> SigningCredential {
    SigningCredential {
        access_token: "token-abc".to_string(),
        certificate_id: "cert-1".to_string(),
        expires_at: Timestamp::from_datetime(FIXED_INSTANT + time::Duration::hours(1)),
        identity_claims: Some(json!({"name": "Ana Souza"})),
    }
}

/// Credential that expired before the fixed instant.
pub fn expired_credential() -> SigningCredential {
    SigningCredential {
        expires_at: Timestamp::from_datetime(FIXED_INSTANT - time::Duration::minutes(5)),
        ..live_credential()
    }
}

// ============================================================================
// SECTION: Authorities
// ============================================================================

/// Authority that signs every request and counts calls.
#[derive(Default)]
pub struct AcceptingAuthority {
    /// Hashes received, in call order.
    pub calls: Mutex<Vec<String>>,
}

impl SigningAuthority for AcceptingAuthority {
    fn sign(&self, request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        self.calls.lock().unwrap().push(request.document_hash.clone());
        Ok(SignatureAssertion {
            signature: format!("sig-{}", &request.document_hash[.. 8]),
            payload: json!({"signature": "ok", "certificateId": request.credential.certificate_id}),
            identity: None,
        })
    }
}

/// Authority that always refuses.
pub struct RefusingAuthority;

impl SigningAuthority for RefusingAuthority {
    fn sign(&self, _request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        Err(AuthorityError::Rejected("certificate revoked".to_string()))
    }
}

/// Authority that answers after a delay.
pub struct SlowAuthority(pub Duration);

impl SigningAuthority for SlowAuthority {
    fn sign(&self, _request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        std::thread::sleep(self.0);
        Ok(SignatureAssertion {
            signature: "late".to_string(),
            payload: json!({}),
            identity: None,
        })
    }
}

/// Authority that holds every caller until `parties` calls are in flight.
pub struct BarrierAuthority {
    /// Rendezvous for concurrent callers.
    pub barrier: Barrier,
}

impl SigningAuthority for BarrierAuthority {
    fn sign(&self, request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        self.barrier.wait();
        Ok(SignatureAssertion {
            signature: format!("sig-{}", request.credential.certificate_id),
            payload: json!({"signature": "ok"}),
            identity: None,
        })
    }
}
