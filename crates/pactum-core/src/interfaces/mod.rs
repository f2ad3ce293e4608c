// crates/pactum-core/src/interfaces/mod.rs
// ============================================================================
// Module: Pactum Interfaces
// Description: Backend-agnostic interfaces for storage, signing, audit, and time.
// Purpose: Define the collaborator surfaces used by the Pactum runtime.
// Dependencies: crate::core, thiserror, time
// ============================================================================

//! ## Overview
//! Interfaces describe how the runtime reaches its collaborators without
//! embedding backend details. Stores own persistence and transactions, the
//! signing authority owns the network call, and the audit sink swallows its
//! own failures. Store loads fail closed on structurally invalid rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::activity::ActivityEvent;
use crate::core::catalog::ContractTemplate;
use crate::core::catalog::ContractType;
use crate::core::catalog::NewContractType;
use crate::core::catalog::NewTemplate;
use crate::core::contract::Contract;
use crate::core::contract::ContractDocument;
use crate::core::contract::ContractParty;
use crate::core::contract::ContractStatus;
use crate::core::contract::NewContract;
use crate::core::contract::TransitionError;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::ContractTypeId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::UserId;
use crate::core::settings::SystemSetting;
use crate::core::signature::NewSignature;
use crate::core::signature::SignatureAssertion;
use crate::core::signature::SignatureRecord;
use crate::core::signature::SigningCredential;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current date-time.
pub trait Clock: Send + Sync {
    /// Returns the current date-time in the clock's offset.
    fn now(&self) -> OffsetDateTime;
}

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Store errors shared by every persistence trait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Stored data version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Input data is invalid for the store.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Template Store
// ============================================================================

/// Read-only catalog access used by the runtime.
pub trait TemplateStore {
    /// Loads a template version by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_template(&self, id: TemplateId) -> Result<Option<ContractTemplate>, StoreError>;

    /// Loads a contract type by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_type(&self, id: ContractTypeId) -> Result<Option<ContractType>, StoreError>;

    /// Lists contract types ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_types(&self, active_only: bool) -> Result<Vec<ContractType>, StoreError>;

    /// Lists active templates of a type, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn templates_for_type(
        &self,
        type_id: ContractTypeId,
    ) -> Result<Vec<ContractTemplate>, StoreError>;
}

/// Catalog administration. Every write creates a row or flips a flag.
pub trait CatalogWriter {
    /// Registers a contract type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_contract_type(
        &self,
        contract_type: NewContractType,
        created_at: Timestamp,
    ) -> Result<ContractType, StoreError>;

    /// Publishes a new template version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the type does not exist.
    fn publish_template(
        &self,
        template: NewTemplate,
        created_at: Timestamp,
    ) -> Result<ContractTemplate, StoreError>;

    /// Sets the active flag of a contract type. Returns false when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn set_type_active(&self, id: ContractTypeId, active: bool) -> Result<bool, StoreError>;

    /// Sets the active flag of a template version. Returns false when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn set_template_active(&self, id: TemplateId, active: bool) -> Result<bool, StoreError>;
}

// ============================================================================
// SECTION: Contract Store
// ============================================================================

/// Write computed inside a contract transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractWrite {
    /// Store a rendered document and move the contract to `generated`.
    Document {
        /// Rendered text and its hash.
        document: ContractDocument,
        /// Mutation instant.
        updated_at: Timestamp,
    },
    /// Append a signature record and set the contract status.
    Signature {
        /// Record to append.
        signature: NewSignature,
        /// Contract status after the append.
        status: ContractStatus,
        /// Mutation instant.
        updated_at: Timestamp,
    },
    /// Change the contract status only.
    Status {
        /// New status.
        status: ContractStatus,
        /// Mutation instant.
        updated_at: Timestamp,
    },
}

impl ContractWrite {
    /// Applies the write to a contract snapshot and returns the signature to
    /// append, if any.
    pub fn apply_to(self, contract: &mut Contract) -> Option<NewSignature> {
        match self {
            Self::Document {
                document,
                updated_at,
            } => {
                contract.document = Some(document);
                contract.status = ContractStatus::Generated;
                contract.updated_at = updated_at;
                None
            }
            Self::Signature {
                signature,
                status,
                updated_at,
            } => {
                contract.status = status;
                contract.updated_at = updated_at;
                Some(signature)
            }
            Self::Status {
                status,
                updated_at,
            } => {
                contract.status = status;
                contract.updated_at = updated_at;
                None
            }
        }
    }
}

/// Result of a committed contract transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    /// Contract as persisted by the transaction.
    pub contract: Contract,
    /// Signature appended by the transaction, when any.
    pub signature: Option<SignatureRecord>,
}

/// Failures of a contract transaction.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Contract does not exist.
    #[error("contract not found: {0}")]
    NotFound(ContractId),
    /// The transition closure refused the write; nothing was persisted.
    #[error(transparent)]
    Rejected(TransitionError),
    /// The store failed; nothing was persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durable contract, party and signature storage.
///
/// # Invariants
/// - [`ContractStore::apply`] runs read, closure and write as one
///   serializable transaction per contract; partial writes are never visible.
pub trait ContractStore {
    /// Inserts a draft contract and its parties, assigning identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_contract(
        &self,
        contract: NewContract,
        created_at: Timestamp,
    ) -> Result<Contract, StoreError>;

    /// Loads a contract by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when the stored text and hash are not
    /// both present or both absent.
    fn load_contract(&self, id: ContractId) -> Result<Option<Contract>, StoreError>;

    /// Lists an owner's contracts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_contracts(&self, owner: UserId) -> Result<Vec<Contract>, StoreError>;

    /// Lists a contract's parties in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_parties(&self, id: ContractId) -> Result<Vec<ContractParty>, StoreError>;

    /// Lists a contract's signature records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_signatures(&self, id: ContractId) -> Result<Vec<SignatureRecord>, StoreError>;

    /// Runs `transition` against the current contract and persists its write
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::NotFound`] for unknown contracts,
    /// [`CommitError::Rejected`] when the closure refuses, and
    /// [`CommitError::Store`] on persistence failures.
    fn apply(
        &self,
        id: ContractId,
        transition: &mut dyn FnMut(&Contract) -> Result<ContractWrite, TransitionError>,
    ) -> Result<CommitReceipt, CommitError>;
}

// ============================================================================
// SECTION: Settings Store
// ============================================================================

/// Typed key/value settings storage.
pub trait SettingsStore {
    /// Loads a setting by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError>;

    /// Inserts or replaces a setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn put_setting(&self, setting: &SystemSetting) -> Result<(), StoreError>;

    /// Lists settings ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_settings(&self) -> Result<Vec<SystemSetting>, StoreError>;
}

// ============================================================================
// SECTION: Signing Authority
// ============================================================================

/// Request forwarded to the external signing authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRequest {
    /// Hex document hash to sign.
    pub document_hash: String,
    /// Short-lived bearer credential.
    pub credential: SigningCredential,
}

/// Signing authority failures. All of them end as a rejected record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// No authority is configured.
    #[error("signing authority unavailable: {0}")]
    Unavailable(String),
    /// The authority could not be reached.
    #[error("signing authority unreachable: {0}")]
    Unreachable(String),
    /// The call exceeded its deadline.
    #[error("signing authority timed out after {0} ms")]
    Timeout(u64),
    /// The authority refused the request.
    #[error("signing authority rejected the request: {0}")]
    Rejected(String),
    /// The authority answered with an unusable payload.
    #[error("signing authority returned an invalid response: {0}")]
    InvalidResponse(String),
    /// The credential expired before use.
    #[error("signing credential expired")]
    CredentialExpired,
}

impl AuthorityError {
    /// Returns a stable label for the failure kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Unreachable(_) => "unreachable",
            Self::Timeout(_) => "timeout",
            Self::Rejected(_) => "rejected",
            Self::InvalidResponse(_) => "invalid_response",
            Self::CredentialExpired => "credential_expired",
        }
    }
}

/// External signing authority reached over the network.
pub trait SigningAuthority: Send + Sync {
    /// Signs a document hash with the caller's credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when the authority fails or refuses.
    fn sign(&self, request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Append-only audit destination. Implementations swallow their own failures.
pub trait AuditSink: Send + Sync {
    /// Records an activity event.
    fn record(&self, event: &ActivityEvent);
}
