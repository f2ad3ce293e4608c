// crates/pactum-core/src/runtime/mod.rs
// ============================================================================
// Module: Pactum Runtime
// Description: Contract engine, renderer, validation, signing, and stores.
// Purpose: Execute the contract lifecycle against pluggable collaborators.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement rendering, required-field validation, the
//! deadline-bounded signing call and the contract engine. The CLI and any
//! other surface call into the same engine so transition rules are applied in
//! one place.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod engine;
pub mod render;
pub mod signing;
pub mod store;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use engine::ContractEngine;
pub use engine::ContractError;
pub use engine::ContractView;
pub use engine::EngineConfig;
pub use engine::GenerateOutcome;
pub use engine::IntegrityReport;
pub use engine::SignatureOutcome;
pub use engine::SignatureRequest;
pub use render::DocumentRenderer;
pub use render::TokenSource;
pub use render::TokenTable;
pub use render::TokenTableError;
pub use signing::DEFAULT_SIGNING_DEADLINE;
pub use signing::UnconfiguredAuthority;
pub use signing::sign_with_deadline;
pub use store::InMemoryStore;
pub use validation::ValidationMode;
pub use validation::check_required_fields;
pub use validation::missing_required_fields;
