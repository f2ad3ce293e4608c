// crates/pactum-store-sqlite/src/lib.rs
// ============================================================================
// Module: Pactum SQLite Store
// Description: SQLite-backed persistence for the Pactum contract lifecycle.
// Purpose: Provide durable template, contract, settings, and audit storage.
// Dependencies: pactum-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteStore`] implements every Pactum store trait plus the audit sink
//! on a single `SQLite` database. Contract mutations are serialized with
//! immediate transactions so concurrent signers cannot interleave a
//! read-validate-write cycle.

pub mod store;

pub use store::MAX_DOCUMENT_BYTES;
pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
