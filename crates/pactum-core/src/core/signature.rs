// crates/pactum-core/src/core/signature.rs
// ============================================================================
// Module: Pactum Signature Types
// Description: Signing methods, credentials, assertions, and signature records.
// Purpose: Model signature events tied to a specific document hash.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A signature record binds a signer, a signing method and an assertion to the
//! document hash that was current when the attempt was admitted. Records are
//! append-only; a rejected or expired attempt is kept and never blocks a retry.
//!
//! Provider-assisted signing carries a short-lived [`SigningCredential`]
//! explicitly, instead of relying on ambient session state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::activity::OriginMetadata;
use crate::core::catalog::ParseEnumError;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::SignatureId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Method and Status
// ============================================================================

/// How a signature was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMethod {
    /// Delegated to the external identity/signature provider.
    #[serde(alias = "govbr")]
    IdentityProvider,
    /// Certificate-based signature validated by the caller.
    #[serde(alias = "certificado_digital")]
    Certificate,
    /// Simple electronic acceptance.
    #[serde(alias = "simples")]
    Simple,
}

impl SignatureMethod {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdentityProvider => "identity_provider",
            Self::Certificate => "certificate",
            Self::Simple => "simple",
        }
    }
}

impl FromStr for SignatureMethod {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "identity_provider" | "govbr" => Ok(Self::IdentityProvider),
            "certificate" | "certificado_digital" => Ok(Self::Certificate),
            "simple" | "simples" => Ok(Self::Simple),
            _ => Err(ParseEnumError::new("signature method", value)),
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome status of a signature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Awaiting confirmation.
    #[serde(alias = "pendente")]
    Pending,
    /// Signed successfully.
    #[serde(alias = "assinado")]
    Signed,
    /// Refused by the authority or the signer.
    #[serde(alias = "rejeitado")]
    Rejected,
    /// Credential expired before the attempt could be made.
    #[serde(alias = "expirado")]
    Expired,
}

impl SignatureStatus {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for SignatureStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" | "pendente" => Ok(Self::Pending),
            "signed" | "assinado" => Ok(Self::Signed),
            "rejected" | "rejeitado" => Ok(Self::Rejected),
            "expired" | "expirado" => Ok(Self::Expired),
            _ => Err(ParseEnumError::new("signature status", value)),
        }
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Credentials and Assertions
// ============================================================================

/// Short-lived credential for the external signing authority.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningCredential {
    /// Bearer access token.
    pub access_token: String,
    /// Certificate the authority should sign with.
    pub certificate_id: String,
    /// Instant after which the token must not be used.
    pub expires_at: Timestamp,
    /// Identity claims obtained during the provider handshake.
    #[serde(default)]
    pub identity_claims: Option<Value>,
}

impl SigningCredential {
    /// Returns true when the credential is expired at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_at_or_before(now)
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("access_token", &"<redacted>")
            .field("certificate_id", &self.certificate_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Successful assertion returned by the signing authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureAssertion {
    /// Signature token produced by the authority.
    pub signature: String,
    /// Full opaque response payload.
    pub payload: Value,
    /// Identity metadata reported by the authority.
    #[serde(default)]
    pub identity: Option<Value>,
}

/// Caller-supplied assertion for certificate-based and simple signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerAssertion {
    /// Signature token or hash supplied by the signer.
    pub signature: Option<String>,
    /// Opaque certificate metadata.
    #[serde(default)]
    pub certificate_info: Option<Value>,
    /// Whether the signer asserts a completed signature.
    pub signed: bool,
}

/// Signing method together with the evidence it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SigningMethodRequest {
    /// Delegate to the external signing authority.
    IdentityProvider {
        /// Credential presented to the authority.
        credential: SigningCredential,
    },
    /// Certificate-based signature validated by the caller.
    Certificate {
        /// Caller-supplied assertion.
        assertion: CallerAssertion,
    },
    /// Simple electronic acceptance.
    Simple {
        /// Caller-supplied assertion.
        assertion: CallerAssertion,
    },
}

impl SigningMethodRequest {
    /// Returns the method kind.
    #[must_use]
    pub const fn method(&self) -> SignatureMethod {
        match self {
            Self::IdentityProvider {
                ..
            } => SignatureMethod::IdentityProvider,
            Self::Certificate {
                ..
            } => SignatureMethod::Certificate,
            Self::Simple {
                ..
            } => SignatureMethod::Simple,
        }
    }
}

// ============================================================================
// SECTION: Signature Records
// ============================================================================

/// Signature record prepared for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignature {
    /// Signing user.
    pub signer: UserId,
    /// Signing method.
    pub method: SignatureMethod,
    /// Document hash the signature is bound to.
    pub document_hash: String,
    /// Signature token, when one was produced.
    pub signature: Option<String>,
    /// Opaque certificate or assertion metadata.
    pub certificate_info: Option<Value>,
    /// Instant the signature became effective (signed records only).
    pub signed_at: Option<Timestamp>,
    /// Request origin.
    pub origin: OriginMetadata,
    /// Outcome status.
    pub status: SignatureStatus,
    /// Failure reason for rejected or expired attempts.
    pub failure_reason: Option<String>,
    /// Record creation instant.
    pub created_at: Timestamp,
}

/// Stored, immutable signature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Signature identifier.
    pub id: SignatureId,
    /// Contract the signature belongs to.
    pub contract_id: ContractId,
    /// Signing user.
    pub signer: UserId,
    /// Signing method.
    pub method: SignatureMethod,
    /// Document hash the signature is bound to.
    pub document_hash: String,
    /// Signature token, when one was produced.
    pub signature: Option<String>,
    /// Opaque certificate or assertion metadata.
    pub certificate_info: Option<Value>,
    /// Instant the signature became effective.
    pub signed_at: Option<Timestamp>,
    /// Request origin.
    pub origin: OriginMetadata,
    /// Outcome status.
    pub status: SignatureStatus,
    /// Failure reason for rejected or expired attempts.
    pub failure_reason: Option<String>,
    /// Record creation instant.
    pub created_at: Timestamp,
}

impl SignatureRecord {
    /// Builds the stored record from an insertion request.
    #[must_use]
    pub fn from_new(id: SignatureId, contract_id: ContractId, signature: NewSignature) -> Self {
        Self {
            id,
            contract_id,
            signer: signature.signer,
            method: signature.method,
            document_hash: signature.document_hash,
            signature: signature.signature,
            certificate_info: signature.certificate_info,
            signed_at: signature.signed_at,
            origin: signature.origin,
            status: signature.status,
            failure_reason: signature.failure_reason,
            created_at: signature.created_at,
        }
    }
}
