// crates/pactum-core/src/core/contract.rs
// ============================================================================
// Module: Pactum Contract Types
// Description: Contract records, data bags, parties, and lifecycle status.
// Purpose: Model the contract state machine and its transition failures.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A contract moves `draft -> generated -> signed`, with `canceled` reachable
//! from `draft` or `generated`. The rendered text and its hash travel together
//! as a [`ContractDocument`], so a contract can never hold one without the
//! other. Status guards live on [`ContractStatus`] so every store and runtime
//! path applies the same transition table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::catalog::ParseEnumError;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::ContractTypeId;
use crate::core::identifiers::PartyId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Data Sections
// ============================================================================

/// Data bag section describing the hiring party.
pub const SECTION_HIRING_PARTY: &str = "contratante";
/// Data bag section describing the hired party.
pub const SECTION_HIRED_PARTY: &str = "contratado";
/// Data bag section describing the contract terms.
pub const SECTION_TERMS: &str = "contrato";

// ============================================================================
// SECTION: Contract Status
// ============================================================================

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Created, not yet rendered.
    #[serde(alias = "rascunho")]
    Draft,
    /// Rendered and hashed; awaiting signatures.
    #[serde(alias = "gerado")]
    Generated,
    /// At least one signed signature exists; immutable.
    #[serde(alias = "assinado")]
    Signed,
    /// Abandoned before signing; terminal.
    #[serde(alias = "cancelado")]
    Canceled,
}

impl ContractStatus {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generated => "generated",
            Self::Signed => "signed",
            Self::Canceled => "canceled",
        }
    }

    /// Returns true when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Signed | Self::Canceled)
    }

    /// Checks whether `operation` may start from this status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::InvalidState`] when the transition is illegal.
    pub fn admit(self, operation: ContractOperation) -> Result<(), TransitionError> {
        let allowed = match operation {
            ContractOperation::Generate | ContractOperation::Cancel => {
                matches!(self, Self::Draft | Self::Generated)
            }
            ContractOperation::RecordSignature => matches!(self, Self::Generated),
        };
        if allowed {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                operation,
                status: self,
            })
        }
    }
}

impl FromStr for ContractStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" | "rascunho" => Ok(Self::Draft),
            "generated" | "gerado" => Ok(Self::Generated),
            "signed" | "assinado" => Ok(Self::Signed),
            "canceled" | "cancelado" => Ok(Self::Canceled),
            _ => Err(ParseEnumError::new("contract status", value)),
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that drive the contract state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractOperation {
    /// Render and hash the document.
    Generate,
    /// Append a signature record.
    RecordSignature,
    /// Cancel the contract.
    Cancel,
}

impl fmt::Display for ContractOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::RecordSignature => "record_signature",
            Self::Cancel => "cancel",
        })
    }
}

// ============================================================================
// SECTION: Data Bag
// ============================================================================

/// Flattened section -> field -> string view of contract data.
///
/// # Invariants
/// - Every leaf is a string; non-string JSON leaves are stringified and JSON
///   `null` leaves are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBag(BTreeMap<String, BTreeMap<String, String>>);

impl DataBag {
    /// Creates an empty data bag.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds a data bag from caller-supplied JSON.
    ///
    /// Non-object roots and non-object sections contribute nothing.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut sections = BTreeMap::new();
        let Value::Object(root) = value else {
            return Self(sections);
        };
        for (section, fields) in root {
            let Value::Object(fields) = fields else {
                continue;
            };
            let flattened: BTreeMap<String, String> = fields
                .iter()
                .filter_map(|(field, leaf)| stringify_leaf(leaf).map(|text| (field.clone(), text)))
                .collect();
            sections.insert(section.clone(), flattened);
        }
        Self(sections)
    }

    /// Sets a single field value.
    #[must_use]
    pub fn with(mut self, section: &str, field: &str, value: impl Into<String>) -> Self {
        self.0.entry(section.to_string()).or_default().insert(field.to_string(), value.into());
        self
    }

    /// Returns a field value when present.
    #[must_use]
    pub fn get(&self, section: &str, field: &str) -> Option<&str> {
        self.0.get(section).and_then(|fields| fields.get(field)).map(String::as_str)
    }
}

/// Stringifies a JSON leaf for substitution.
fn stringify_leaf(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

// ============================================================================
// SECTION: Contract Records
// ============================================================================

/// Rendered document text and its integrity hash, always stored together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDocument {
    /// Final rendered text.
    pub final_text: String,
    /// Hash of `final_text`.
    pub hash: HashDigest,
}

/// Durable contract record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract identifier.
    pub id: ContractId,
    /// Owning user.
    pub owner: UserId,
    /// Contract type.
    pub contract_type_id: ContractTypeId,
    /// Template version the contract renders through.
    pub template_id: TemplateId,
    /// Human-readable title.
    pub title: String,
    /// Caller-supplied data bag, stored verbatim.
    pub data: Value,
    /// Rendered document, absent until the first generation.
    pub document: Option<ContractDocument>,
    /// Lifecycle status.
    pub status: ContractStatus,
    /// Creation instant.
    pub created_at: Timestamp,
    /// Last mutation instant.
    pub updated_at: Timestamp,
}

impl Contract {
    /// Returns the flattened data bag used for rendering.
    #[must_use]
    pub fn data_bag(&self) -> DataBag {
        DataBag::from_value(&self.data)
    }

    /// Returns the current integrity hash, if generated.
    #[must_use]
    pub fn current_hash(&self) -> Option<&HashDigest> {
        self.document.as_ref().map(|document| &document.hash)
    }
}

/// Input for creating a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContract {
    /// Owning user.
    pub owner: UserId,
    /// Contract type.
    pub contract_type_id: ContractTypeId,
    /// Template version.
    pub template_id: TemplateId,
    /// Human-readable title.
    pub title: String,
    /// Data bag (JSON object of sections).
    pub data: Value,
    /// Parties captured at creation.
    #[serde(default)]
    pub parties: Vec<NewParty>,
}

// ============================================================================
// SECTION: Parties
// ============================================================================

/// Role a party plays in a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// The hiring party (`contratante`).
    #[serde(alias = "contratante")]
    HiringParty,
    /// The hired party (`contratado`).
    #[serde(alias = "contratado")]
    HiredParty,
    /// A witness (`testemunha`).
    #[serde(alias = "testemunha")]
    Witness,
}

impl PartyRole {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HiringParty => "hiring_party",
            Self::HiredParty => "hired_party",
            Self::Witness => "witness",
        }
    }
}

impl FromStr for PartyRole {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hiring_party" | "contratante" => Ok(Self::HiringParty),
            "hired_party" | "contratado" => Ok(Self::HiredParty),
            "witness" | "testemunha" => Ok(Self::Witness),
            _ => Err(ParseEnumError::new("party role", value)),
        }
    }
}

/// Identity attributes shared by new and stored parties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyIdentity {
    /// Full name.
    pub full_name: String,
    /// National taxpayer ID (CPF).
    #[serde(default)]
    pub cpf: Option<String>,
    /// General registry ID (RG).
    #[serde(default)]
    pub rg: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Profession.
    #[serde(default)]
    pub profession: Option<String>,
}

/// Input for a party captured at contract creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParty {
    /// Party role.
    pub role: PartyRole,
    /// Identity attributes.
    #[serde(flatten)]
    pub identity: PartyIdentity,
}

/// Stored party record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParty {
    /// Party identifier.
    pub id: PartyId,
    /// Owning contract.
    pub contract_id: ContractId,
    /// Party role.
    pub role: PartyRole,
    /// Identity attributes.
    #[serde(flatten)]
    pub identity: PartyIdentity,
    /// Creation instant.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Validation Errors
// ============================================================================

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted path of the field (for example `contratante.cpf`).
    pub path: String,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Input validation failure listing every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("validation failed{}", describe_violations(.violations))]
pub struct ValidationError {
    /// Violations in discovery order.
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Creates a validation error with one violation.
    #[must_use]
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                path: path.into(),
                reason: reason.into(),
            }],
        }
    }
}

/// Renders violations as `: path: reason; path: reason` (empty when none).
fn describe_violations(violations: &[FieldViolation]) -> String {
    violations.iter().enumerate().fold(String::new(), |mut out, (index, violation)| {
        out.push_str(if index == 0 { ": " } else { "; " });
        out.push_str(&violation.to_string());
        out
    })
}

// ============================================================================
// SECTION: Transition Errors
// ============================================================================

/// Reasons a contract transition is refused inside a store transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The operation is not legal from the current status.
    #[error("cannot {operation} a contract in status {status}")]
    InvalidState {
        /// Attempted operation.
        operation: ContractOperation,
        /// Status at the time of the attempt.
        status: ContractStatus,
    },
    /// The supplied hash does not name the current document.
    #[error("document hash {supplied} is stale (current: {})", .current.as_deref().unwrap_or("none"))]
    StaleDocument {
        /// Hash supplied by the caller.
        supplied: String,
        /// Hash currently stored on the contract.
        current: Option<String>,
    },
    /// Stored text and hash disagree.
    #[error("integrity violation: {0}")]
    Integrity(String),
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
