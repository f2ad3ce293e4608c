// crates/pactum-core/src/lib.rs
// ============================================================================
// Module: Pactum Core Library
// Description: Public API surface for the Pactum core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Pactum core generates contract documents from versioned templates, anchors
//! them with a content hash, and records signatures against that hash. It is
//! storage-agnostic and reaches persistence, the signing authority and the
//! audit trail only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditSink;
pub use interfaces::AuthorityError;
pub use interfaces::AuthorityRequest;
pub use interfaces::CatalogWriter;
pub use interfaces::Clock;
pub use interfaces::CommitError;
pub use interfaces::CommitReceipt;
pub use interfaces::ContractStore;
pub use interfaces::ContractWrite;
pub use interfaces::SettingsStore;
pub use interfaces::SigningAuthority;
pub use interfaces::StoreError;
pub use interfaces::TemplateStore;
pub use runtime::ContractEngine;
pub use runtime::ContractError;
pub use runtime::ContractView;
pub use runtime::DocumentRenderer;
pub use runtime::EngineConfig;
pub use runtime::FileAuditSink;
pub use runtime::GenerateOutcome;
pub use runtime::InMemoryAuditSink;
pub use runtime::InMemoryStore;
pub use runtime::IntegrityReport;
pub use runtime::NoopAuditSink;
pub use runtime::SignatureOutcome;
pub use runtime::SignatureRequest;
pub use runtime::StderrAuditSink;
pub use runtime::TokenSource;
pub use runtime::TokenTable;
pub use runtime::TokenTableError;
pub use runtime::UnconfiguredAuthority;
pub use runtime::ValidationMode;
