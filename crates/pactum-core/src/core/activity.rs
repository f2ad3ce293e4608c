// crates/pactum-core/src/core/activity.rs
// ============================================================================
// Module: Pactum Activity Records
// Description: Request origin metadata and append-only audit events.
// Purpose: Describe who did what to which contract, and from where.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Activity events are emitted by the runtime after each state change and
//! handed to an [`AuditSink`](crate::interfaces::AuditSink). They are
//! write-only from the engine's perspective.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::catalog::ParseEnumError;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Origin Metadata
// ============================================================================

/// Network origin of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMetadata {
    /// Client network address.
    #[serde(default)]
    pub ip_address: Option<IpAddr>,
    /// Client agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
}

// ============================================================================
// SECTION: Activity Events
// ============================================================================

/// Audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Contract created in draft.
    ContractCreated,
    /// Document rendered and hashed.
    ContractGenerated,
    /// Contract canceled.
    ContractCanceled,
    /// Signature appended with a non-rejected status.
    SignatureRecorded,
    /// Signature attempt rejected or expired.
    SignatureRejected,
    /// Stored text and hash disagree.
    IntegrityViolation,
}

impl ActivityAction {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContractCreated => "contract_created",
            Self::ContractGenerated => "contract_generated",
            Self::ContractCanceled => "contract_canceled",
            Self::SignatureRecorded => "signature_recorded",
            Self::SignatureRejected => "signature_rejected",
            Self::IntegrityViolation => "integrity_violation",
        }
    }
}

impl FromStr for ActivityAction {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "contract_created" => Ok(Self::ContractCreated),
            "contract_generated" => Ok(Self::ContractGenerated),
            "contract_canceled" => Ok(Self::ContractCanceled),
            "signature_recorded" => Ok(Self::SignatureRecorded),
            "signature_rejected" => Ok(Self::SignatureRejected),
            "integrity_violation" => Ok(Self::IntegrityViolation),
            _ => Err(ParseEnumError::new("activity action", value)),
        }
    }
}

/// Append-only audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Action performed.
    pub action: ActivityAction,
    /// Acting user, when known.
    pub actor: Option<UserId>,
    /// Affected contract, when any.
    pub contract_id: Option<ContractId>,
    /// Structured detail payload.
    pub detail: Value,
    /// Request origin.
    pub origin: OriginMetadata,
    /// Event instant.
    pub recorded_at: Timestamp,
}
