// crates/pactum-providers/src/lib.rs
// ============================================================================
// Module: Pactum Providers
// Description: Signing authority clients for the contract engine.
// Purpose: Reach external signature services through the core authority trait.
// Dependencies: pactum-core, reqwest, base64
// ============================================================================

//! ## Overview
//! Providers implement [`pactum_core::SigningAuthority`]. The engine calls
//! them without holding any store lock and bounds each call with its own
//! deadline; providers additionally enforce transport limits of their own.
//! Responses from remote services are untrusted input.

pub mod http;

pub use http::HttpAuthorityConfig;
pub use http::HttpSigningAuthority;
