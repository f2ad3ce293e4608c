// crates/pactum-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Persistence, corruption, and engine integration tests.
// Purpose: Validate durable storage of catalog, contracts, and signatures.
// Dependencies: pactum-core, pactum-store-sqlite, rusqlite, tempfile, time
// ============================================================================

//! ## Overview
//! Covers round-trips through a real database file, reopening across store
//! instances, schema version checks, corruption detection on load, settings
//! upserts and the activity log written through the audit sink.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use pactum_core::ActivityAction;
use pactum_core::CallerAssertion;
use pactum_core::CatalogWriter;
use pactum_core::ContractCategory;
use pactum_core::ContractEngine;
use pactum_core::ContractError;
use pactum_core::ContractStatus;
use pactum_core::ContractStore;
use pactum_core::DocumentRenderer;
use pactum_core::EngineConfig;
use pactum_core::FieldSchema;
use pactum_core::FixedClock;
use pactum_core::NewContract;
use pactum_core::NewContractType;
use pactum_core::NewParty;
use pactum_core::NewTemplate;
use pactum_core::OriginMetadata;
use pactum_core::PartyIdentity;
use pactum_core::PartyRole;
use pactum_core::SettingKind;
use pactum_core::SettingValue;
use pactum_core::SettingsStore;
use pactum_core::SignatureMethod;
use pactum_core::SignatureRequest;
use pactum_core::SignatureStatus;
use pactum_core::SigningMethodRequest;
use pactum_core::StoreError;
use pactum_core::SystemSetting;
use pactum_core::TemplateId;
use pactum_core::TemplateStore;
use pactum_core::Timestamp;
use pactum_core::UnconfiguredAuthority;
use pactum_core::UserId;
use pactum_store_sqlite::SqliteStore;
use pactum_store_sqlite::SqliteStoreConfig;
use pactum_store_sqlite::SqliteStoreError;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;
use time::macros::datetime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

type SqliteEngine = ContractEngine<SqliteStore, SqliteStore, UnconfiguredAuthority, SqliteStore>;

fn store_for(path: &Path) -> SqliteStore {
    SqliteStore::new(&SqliteStoreConfig::for_path(path)).unwrap()
}

fn db_path(temp: &TempDir) -> PathBuf {
    temp.path().join("pactum.sqlite")
}

fn engine_for(store: &SqliteStore) -> SqliteEngine {
    ContractEngine::new(
        store.clone(),
        store.clone(),
        Arc::new(UnconfiguredAuthority),
        store.clone(),
        Arc::new(FixedClock::new(datetime!(2025-06-01 12:00:00 UTC))),
        DocumentRenderer::default(),
        EngineConfig::default(),
    )
}

fn user(raw: u64) -> UserId {
    UserId::from_raw(raw).unwrap()
}

fn seed_template(store: &SqliteStore) -> (pactum_core::ContractTypeId, TemplateId) {
    let at = Timestamp::from_unix_millis(1_717_000_000_000);
    let contract_type = store
        .insert_contract_type(
            NewContractType {
                name: "Aluguel".to_string(),
                description: Some("Locacao residencial".to_string()),
                category: ContractCategory::Rental,
            },
            at,
        )
        .unwrap();
    let template = store
        .publish_template(
            NewTemplate {
                contract_type_id: contract_type.id,
                name: "Aluguel padrao".to_string(),
                body: "LOCADOR: {{CONTRATANTE_NOME}}\nVALOR: {{VALOR}}".to_string(),
                required_fields: FieldSchema::new()
                    .with_section("contratante", ["nome_completo"])
                    .with_section("contrato", ["valor"]),
                optional_fields: FieldSchema::new(),
                version: "2.1".to_string(),
            },
            at,
        )
        .unwrap();
    (contract_type.id, template.id)
}

fn new_contract(type_id: pactum_core::ContractTypeId, template_id: TemplateId) -> NewContract {
    NewContract {
        owner: user(1),
        contract_type_id: type_id,
        template_id,
        title: "Apartamento 302".to_string(),
        data: json!({
            "contratante": {"nome_completo": "Carla Dias"},
            "contrato": {"valor": "2300"}
        }),
        parties: vec![NewParty {
            role: PartyRole::HiringParty,
            identity: PartyIdentity {
                full_name: "Carla Dias".to_string(),
                email: Some("carla@example.com".to_string()),
                ..PartyIdentity::default()
            },
        }],
    }
}

fn origin() -> OriginMetadata {
    OriginMetadata {
        ip_address: Some("192.168.1.20".parse().unwrap()),
        user_agent: Some("sqlite-tests".to_string()),
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

#[test]
fn catalog_roundtrips_through_the_database() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&db_path(&temp));
    let (type_id, template_id) = seed_template(&store);

    let contract_type = store.get_type(type_id).unwrap().unwrap();
    assert_eq!(contract_type.category, ContractCategory::Rental);
    assert_eq!(contract_type.description.as_deref(), Some("Locacao residencial"));

    let template = store.get_template(template_id).unwrap().unwrap();
    assert_eq!(template.version, "2.1");
    assert_eq!(template.required_fields.fields("contrato"), ["valor".to_string()]);
    assert!(template.optional_fields.is_empty());

    assert!(store.set_template_active(template_id, false).unwrap());
    assert!(store.templates_for_type(type_id).unwrap().is_empty());
    assert!(!store.set_template_active(TemplateId::from_raw(99).unwrap(), false).unwrap());

    assert!(store.set_type_active(type_id, false).unwrap());
    assert!(store.list_types(true).unwrap().is_empty());
    assert_eq!(store.list_types(false).unwrap().len(), 1);
}

#[test]
fn publishing_under_unknown_type_is_invalid() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&db_path(&temp));
    let err = store
        .publish_template(
            NewTemplate {
                contract_type_id: pactum_core::ContractTypeId::from_raw(7).unwrap(),
                name: "orphan".to_string(),
                body: String::new(),
                required_fields: FieldSchema::new(),
                optional_fields: FieldSchema::new(),
                version: "1.0".to_string(),
            },
            Timestamp::from_unix_millis(0),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

// ============================================================================
// SECTION: Contracts
// ============================================================================

#[test]
fn contracts_survive_reopening_the_store() {
    let temp = TempDir::new().unwrap();
    let path = db_path(&temp);
    let contract_id = {
        let store = store_for(&path);
        let (type_id, template_id) = seed_template(&store);
        let engine = engine_for(&store);
        let contract = engine.create(new_contract(type_id, template_id), &origin()).unwrap();
        engine.generate(contract.id, user(1), &origin()).unwrap();
        contract.id
    };

    let reopened = store_for(&path);
    let contract = reopened.load_contract(contract_id).unwrap().unwrap();
    assert_eq!(contract.status, ContractStatus::Generated);
    let document = contract.document.unwrap();
    assert_eq!(document.final_text, "LOCADOR: Carla Dias\nVALOR: 2300");
    assert_eq!(pactum_core::hash_document(&document.final_text), document.hash);

    let parties = reopened.list_parties(contract_id).unwrap();
    assert_eq!(parties.len(), 1);
    assert_eq!(parties[0].identity.email.as_deref(), Some("carla@example.com"));
    assert_eq!(reopened.list_contracts(user(1)).unwrap().len(), 1);
}

#[test]
fn signatures_and_activity_are_persisted() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&db_path(&temp));
    let (type_id, template_id) = seed_template(&store);
    let engine = engine_for(&store);
    let contract = engine.create(new_contract(type_id, template_id), &origin()).unwrap();
    let generated = engine.generate(contract.id, user(1), &origin()).unwrap().contract;
    let hash = generated.current_hash().unwrap().value.clone();

    let outcome = engine
        .record_signature(SignatureRequest {
            contract_id: contract.id,
            signer: user(2),
            document_hash: hash.clone(),
            method: SigningMethodRequest::Simple {
                assertion: CallerAssertion {
                    signature: Some("de acordo".to_string()),
                    certificate_info: Some(json!({"channel": "kiosk"})),
                    signed: true,
                },
            },
            origin: origin(),
        })
        .unwrap();
    assert_eq!(outcome.contract.status, ContractStatus::Signed);

    let signatures = store.list_signatures(contract.id).unwrap();
    assert_eq!(signatures.len(), 1);
    assert_eq!(signatures[0].method, SignatureMethod::Simple);
    assert_eq!(signatures[0].status, SignatureStatus::Signed);
    assert_eq!(signatures[0].document_hash, hash);
    assert_eq!(signatures[0].origin, origin());
    assert_eq!(signatures[0], outcome.record);

    let actions: Vec<ActivityAction> = store
        .list_activity(Some(contract.id))
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            ActivityAction::ContractCreated,
            ActivityAction::ContractGenerated,
            ActivityAction::SignatureRecorded,
        ]
    );
}

#[test]
fn tampered_text_is_reported_as_integrity_violation() {
    let temp = TempDir::new().unwrap();
    let path = db_path(&temp);
    let store = store_for(&path);
    let (type_id, template_id) = seed_template(&store);
    let engine = engine_for(&store);
    let contract = engine.create(new_contract(type_id, template_id), &origin()).unwrap();
    engine.generate(contract.id, user(1), &origin()).unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute(
        "UPDATE contracts SET final_text = 'LOCADOR: Outra Pessoa' WHERE id = ?1",
        params![i64::try_from(contract.id.get()).unwrap()],
    )
    .unwrap();
    drop(raw);

    let report = engine.verify(contract.id, Some(user(1)), &origin()).unwrap();
    assert!(!report.intact);
    assert_ne!(report.stored_hash, report.computed_hash);
    let violations = store
        .list_activity(Some(contract.id))
        .unwrap()
        .into_iter()
        .filter(|event| event.action == ActivityAction::IntegrityViolation)
        .count();
    assert_eq!(violations, 1);
}

#[test]
fn half_present_document_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = db_path(&temp);
    let store = store_for(&path);
    let (type_id, template_id) = seed_template(&store);
    let engine = engine_for(&store);
    let contract = engine.create(new_contract(type_id, template_id), &origin()).unwrap();
    engine.generate(contract.id, user(1), &origin()).unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute("UPDATE contracts SET document_hash = NULL", params![]).unwrap();
    drop(raw);

    let err = store.load_contract(contract.id).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
    let err = engine.show(contract.id).unwrap_err();
    assert!(matches!(err, ContractError::Store(StoreError::Corrupt(_))));
}

#[test]
fn unknown_status_label_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = db_path(&temp);
    let store = store_for(&path);
    let (type_id, template_id) = seed_template(&store);
    let contract = store
        .insert_contract(new_contract(type_id, template_id), Timestamp::from_unix_millis(5))
        .unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute("UPDATE contracts SET status = 'archived'", params![]).unwrap();
    drop(raw);

    let err = store.load_contract(contract.id).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

// ============================================================================
// SECTION: Settings
// ============================================================================

#[test]
fn settings_upsert_and_decode() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&db_path(&temp));
    let first = SystemSetting::from_value(
        "max_signers",
        &SettingValue::Number(3.0),
        Some("Maximum signers".to_string()),
        Timestamp::from_unix_millis(10),
    );
    store.put_setting(&first).unwrap();
    let second = SystemSetting::from_value(
        "max_signers",
        &SettingValue::Number(5.0),
        None,
        Timestamp::from_unix_millis(20),
    );
    store.put_setting(&second).unwrap();
    store
        .put_setting(&SystemSetting::from_value(
            "maintenance",
            &SettingValue::Boolean(false),
            None,
            Timestamp::from_unix_millis(30),
        ))
        .unwrap();

    let loaded = store.get_setting("max_signers").unwrap().unwrap();
    assert_eq!(loaded.kind, SettingKind::Number);
    assert_eq!(loaded.decode().unwrap(), SettingValue::Number(5.0));
    assert!(loaded.description.is_none());
    let keys: Vec<String> =
        store.list_settings().unwrap().into_iter().map(|setting| setting.key).collect();
    assert_eq!(keys, vec!["maintenance".to_string(), "max_signers".to_string()]);
    assert!(store.get_setting("absent").unwrap().is_none());
}

// ============================================================================
// SECTION: Store Setup
// ============================================================================

#[test]
fn schema_version_mismatch_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = db_path(&temp);
    drop(store_for(&path));
    let raw = Connection::open(&path).unwrap();
    raw.execute("UPDATE store_meta SET version = 99", params![]).unwrap();
    drop(raw);

    let err = SqliteStore::new(&SqliteStoreConfig::for_path(&path)).err().unwrap();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[test]
fn directory_paths_are_rejected() {
    let temp = TempDir::new().unwrap();
    let err = SqliteStore::new(&SqliteStoreConfig::for_path(temp.path())).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn overlong_path_components_are_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("x".repeat(300));
    let err = SqliteStore::new(&SqliteStoreConfig::for_path(path)).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn missing_parent_directories_are_created() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("dir").join("pactum.sqlite");
    let store = store_for(&path);
    seed_template(&store);
    assert!(path.exists());
}
