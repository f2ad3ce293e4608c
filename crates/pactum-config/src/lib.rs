// crates/pactum-config/src/lib.rs
// ============================================================================
// Module: Pactum Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for pactum.toml semantics.
// Dependencies: pactum-core, pactum-providers, pactum-store-sqlite, toml
// ============================================================================

//! ## Overview
//! `pactum-config` defines the configuration model for the Pactum CLI and
//! any embedding service: store location and pragmas, rendering mode and
//! extra tokens, signing deadline and HTTP authority, and the audit sink.
//! Loading is strict and fail-closed.

pub mod config;

pub use config::*;
