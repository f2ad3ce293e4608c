// crates/pactum-core/src/core/mod.rs
// ============================================================================
// Module: Pactum Core Types
// Description: Canonical catalog, contract, signature, and audit structures.
// Purpose: Provide stable, serializable types shared by every Pactum crate.
// Dependencies: serde, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Core types are the source of truth for the contract lifecycle. Stores,
//! providers and the CLI all speak in these types; none of them redefine
//! statuses, methods or transition rules.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod activity;
pub mod catalog;
pub mod contract;
pub mod hashing;
pub mod identifiers;
pub mod settings;
pub mod signature;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use activity::ActivityAction;
pub use activity::ActivityEvent;
pub use activity::OriginMetadata;
pub use catalog::ContractCategory;
pub use catalog::ContractTemplate;
pub use catalog::ContractType;
pub use catalog::FieldSchema;
pub use catalog::NewContractType;
pub use catalog::NewTemplate;
pub use catalog::ParseEnumError;
pub use contract::Contract;
pub use contract::ContractDocument;
pub use contract::ContractOperation;
pub use contract::ContractParty;
pub use contract::ContractStatus;
pub use contract::DataBag;
pub use contract::FieldViolation;
pub use contract::NewContract;
pub use contract::NewParty;
pub use contract::PartyIdentity;
pub use contract::PartyRole;
pub use contract::SECTION_HIRED_PARTY;
pub use contract::SECTION_HIRING_PARTY;
pub use contract::SECTION_TERMS;
pub use contract::TransitionError;
pub use contract::ValidationError;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::hash_document;
pub use identifiers::ContractId;
pub use identifiers::ContractTypeId;
pub use identifiers::PartyId;
pub use identifiers::SignatureId;
pub use identifiers::TemplateId;
pub use identifiers::UserId;
pub use settings::SettingError;
pub use settings::SettingKind;
pub use settings::SettingValue;
pub use settings::SystemSetting;
pub use signature::CallerAssertion;
pub use signature::NewSignature;
pub use signature::SignatureAssertion;
pub use signature::SignatureMethod;
pub use signature::SignatureRecord;
pub use signature::SignatureStatus;
pub use signature::SigningCredential;
pub use signature::SigningMethodRequest;
pub use time::FixedClock;
pub use time::SystemClock;
pub use time::Timestamp;
