// crates/pactum-core/src/runtime/engine.rs
// ============================================================================
// Module: Pactum Contract Engine
// Description: Contract lifecycle orchestration over stores and collaborators.
// Purpose: Create, generate, sign, cancel, and verify contracts.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The engine is the only place transition rules are applied. Every mutation
//! runs as one [`ContractStore::apply`] transaction whose closure re-checks
//! the contract state it was handed, so prechecks made outside the
//! transaction are advisory only.
//!
//! Signing is split in three phases: a precheck against the current contract,
//! the authority call with no transaction open, and a commit that re-validates
//! the hash and status before appending the record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::activity::ActivityAction;
use crate::core::activity::ActivityEvent;
use crate::core::activity::OriginMetadata;
use crate::core::catalog::ContractTemplate;
use crate::core::contract::Contract;
use crate::core::contract::ContractDocument;
use crate::core::contract::ContractOperation;
use crate::core::contract::ContractParty;
use crate::core::contract::ContractStatus;
use crate::core::contract::FieldViolation;
use crate::core::contract::NewContract;
use crate::core::contract::TransitionError;
use crate::core::contract::ValidationError;
use crate::core::hashing::hash_document;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::UserId;
use crate::core::signature::NewSignature;
use crate::core::signature::SignatureRecord;
use crate::core::signature::SignatureStatus;
use crate::core::signature::SigningMethodRequest;
use crate::core::time::Timestamp;
use crate::interfaces::AuditSink;
use crate::interfaces::AuthorityError;
use crate::interfaces::AuthorityRequest;
use crate::interfaces::Clock;
use crate::interfaces::CommitError;
use crate::interfaces::ContractStore;
use crate::interfaces::ContractWrite;
use crate::interfaces::SigningAuthority;
use crate::interfaces::StoreError;
use crate::interfaces::TemplateStore;
use crate::runtime::render::DocumentRenderer;
use crate::runtime::signing::DEFAULT_SIGNING_DEADLINE;
use crate::runtime::signing::sign_with_deadline;
use crate::runtime::validation::ValidationMode;
use crate::runtime::validation::check_required_fields;
use crate::runtime::validation::validate_new_contract;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Required-field enforcement mode.
    pub validation: ValidationMode,
    /// Deadline for one signing authority call.
    pub signing_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validation: ValidationMode::Strict,
            signing_deadline: DEFAULT_SIGNING_DEADLINE,
        }
    }
}

// ============================================================================
// SECTION: Requests and Results
// ============================================================================

/// Request to record a signature against a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    /// Target contract.
    pub contract_id: ContractId,
    /// Signing user.
    pub signer: UserId,
    /// Hash the signer saw.
    pub document_hash: String,
    /// Method and its evidence.
    pub method: SigningMethodRequest,
    /// Request origin.
    #[serde(default)]
    pub origin: OriginMetadata,
}

/// Result of a signing attempt that produced a record.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureOutcome {
    /// Appended record.
    pub record: SignatureRecord,
    /// Contract after the append.
    pub contract: Contract,
    /// Authority failure behind a rejected or expired record.
    pub failure: Option<AuthorityError>,
}

/// Result of a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOutcome {
    /// Contract with its new document.
    pub contract: Contract,
    /// Required fields that were missing (lenient mode only).
    pub missing_fields: Vec<FieldViolation>,
}

/// Contract with its parties and signature history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractView {
    /// Contract record.
    pub contract: Contract,
    /// Parties in insertion order.
    pub parties: Vec<ContractParty>,
    /// Signatures in insertion order.
    pub signatures: Vec<SignatureRecord>,
}

/// Integrity check result for a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Checked contract.
    pub contract_id: ContractId,
    /// Contract status.
    pub status: ContractStatus,
    /// Stored hash, if generated.
    pub stored_hash: Option<String>,
    /// Hash recomputed from the stored text, if generated.
    pub computed_hash: Option<String>,
    /// True when no document exists or both hashes agree.
    pub intact: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Contract engine errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// The operation is not legal in the current status.
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
        /// Hash currently stored.
        current: Option<String>,
    },
    /// Stored text and hash disagree.
    #[error("integrity violation: {0}")]
    Integrity(String),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ContractError {
    /// Returns a stable label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound {
                ..
            } => "not_found",
            Self::InvalidState {
                ..
            } => "invalid_state",
            Self::StaleDocument {
                ..
            } => "stale_document",
            Self::Integrity(_) => "integrity",
            Self::Store(_) => "store",
        }
    }

    /// Builds a not-found error.
    fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<TransitionError> for ContractError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::InvalidState {
                operation,
                status,
            } => Self::InvalidState {
                operation,
                status,
            },
            TransitionError::StaleDocument {
                supplied,
                current,
            } => Self::StaleDocument {
                supplied,
                current,
            },
            TransitionError::Integrity(reason) => Self::Integrity(reason),
            TransitionError::Validation(error) => Self::Validation(error),
        }
    }
}

impl From<CommitError> for ContractError {
    fn from(error: CommitError) -> Self {
        match error {
            CommitError::NotFound(id) => Self::not_found("contract", id),
            CommitError::Rejected(error) => error.into(),
            CommitError::Store(error) => Self::Store(error),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Contract lifecycle engine.
pub struct ContractEngine<T, S, A: ?Sized, K> {
    /// Read-only catalog.
    templates: T,
    /// Durable contract store.
    contracts: S,
    /// External signing authority.
    authority: Arc<A>,
    /// Audit destination.
    audit: K,
    /// Time source for timestamps and clock tokens.
    clock: Arc<dyn Clock>,
    /// Renderer bound to the configured token table.
    renderer: DocumentRenderer,
    /// Engine configuration.
    config: EngineConfig,
}

impl<T, S, A, K> ContractEngine<T, S, A, K>
where
    T: TemplateStore,
    S: ContractStore,
    A: SigningAuthority + ?Sized + 'static,
    K: AuditSink,
{
    /// Creates a new engine.
    #[must_use]
    pub fn new(
        templates: T,
        contracts: S,
        authority: Arc<A>,
        audit: K,
        clock: Arc<dyn Clock>,
        renderer: DocumentRenderer,
        config: EngineConfig,
    ) -> Self {
        Self {
            templates,
            contracts,
            authority,
            audit,
            clock,
            renderer,
            config,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    /// Creates a draft contract with its parties.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Validation`] for malformed input and
    /// [`ContractError::NotFound`] for unknown or inactive catalog entries.
    pub fn create(
        &self,
        request: NewContract,
        origin: &OriginMetadata,
    ) -> Result<Contract, ContractError> {
        validate_new_contract(&request)?;
        let template = self.active_template(&request)?;
        let party_count = request.parties.len();
        let contract = self.contracts.insert_contract(request, self.timestamp())?;
        self.emit(
            ActivityAction::ContractCreated,
            Some(contract.owner),
            Some(contract.id),
            json!({
                "title": contract.title,
                "template_id": template.id,
                "template_version": template.version,
                "parties": party_count,
            }),
            origin,
        );
        Ok(contract)
    }

    /// Resolves the request's template and checks it is usable.
    fn active_template(&self, request: &NewContract) -> Result<ContractTemplate, ContractError> {
        let contract_type = self
            .templates
            .get_type(request.contract_type_id)?
            .filter(|contract_type| contract_type.active)
            .ok_or_else(|| ContractError::not_found("contract type", request.contract_type_id))?;
        let template = self
            .templates
            .get_template(request.template_id)?
            .filter(|template| template.active)
            .ok_or_else(|| ContractError::not_found("template", request.template_id))?;
        if template.contract_type_id != contract_type.id {
            return Err(ValidationError::single(
                "template_id",
                format!("template {} does not belong to type {}", template.id, contract_type.id),
            )
            .into());
        }
        Ok(template)
    }

    // ------------------------------------------------------------------------
    // Generate
    // ------------------------------------------------------------------------

    /// Renders and hashes the contract document.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidState`] once signed or canceled and
    /// [`ContractError::Validation`] in strict mode when required fields are
    /// missing.
    pub fn generate(
        &self,
        id: ContractId,
        actor: UserId,
        origin: &OriginMetadata,
    ) -> Result<GenerateOutcome, ContractError> {
        let current = self.load(id)?;
        // Templates are immutable per id, so reading outside the transaction is safe.
        let template = self
            .templates
            .get_template(current.template_id)?
            .ok_or_else(|| ContractError::not_found("template", current.template_id))?;
        let now = self.clock.now();
        let updated_at = Timestamp::from_datetime(now);
        let mode = self.config.validation;
        let mut missing = Vec::new();
        let receipt = self.contracts.apply(id, &mut |contract| {
            contract.status.admit(ContractOperation::Generate)?;
            let data = contract.data_bag();
            missing = check_required_fields(mode, &template.required_fields, &data)?;
            let final_text = self.renderer.render(&template.body, &data, now);
            let hash = hash_document(&final_text);
            Ok(ContractWrite::Document {
                document: ContractDocument {
                    final_text,
                    hash,
                },
                updated_at,
            })
        })?;
        let contract = receipt.contract;
        let mut detail = json!({
            "hash": contract.current_hash().map(|hash| hash.value.clone()),
            "template_id": template.id,
        });
        if !missing.is_empty() {
            detail["missing_fields"] =
                Value::from(missing.iter().map(|violation| violation.path.clone()).collect::<Vec<_>>());
        }
        self.emit(ActivityAction::ContractGenerated, Some(actor), Some(id), detail, origin);
        Ok(GenerateOutcome {
            contract,
            missing_fields: missing,
        })
    }

    // ------------------------------------------------------------------------
    // Cancel
    // ------------------------------------------------------------------------

    /// Cancels a draft or generated contract.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidState`] once signed or canceled.
    pub fn cancel(
        &self,
        id: ContractId,
        actor: UserId,
        origin: &OriginMetadata,
    ) -> Result<Contract, ContractError> {
        let updated_at = self.timestamp();
        let mut previous = ContractStatus::Draft;
        let receipt = self.contracts.apply(id, &mut |contract| {
            contract.status.admit(ContractOperation::Cancel)?;
            previous = contract.status;
            Ok(ContractWrite::Status {
                status: ContractStatus::Canceled,
                updated_at,
            })
        })?;
        self.emit(
            ActivityAction::ContractCanceled,
            Some(actor),
            Some(id),
            json!({ "previous_status": previous }),
            origin,
        );
        Ok(receipt.contract)
    }

    // ------------------------------------------------------------------------
    // Record Signature
    // ------------------------------------------------------------------------

    /// Records a signature attempt against the contract's current hash.
    ///
    /// Authority failures and expired credentials do not fail the call; they
    /// produce a record with status `rejected` or `expired` and set
    /// [`SignatureOutcome::failure`]. An attempt whose commit finds the
    /// contract regenerated or closed is discarded and audited as
    /// `signature_rejected`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotFound`], [`ContractError::InvalidState`],
    /// [`ContractError::StaleDocument`] (no record is created) or
    /// [`ContractError::Integrity`] when the stored text no longer matches its
    /// hash.
    pub fn record_signature(
        &self,
        request: SignatureRequest,
    ) -> Result<SignatureOutcome, ContractError> {
        let current = self.load(request.contract_id)?;
        current.status.admit(ContractOperation::RecordSignature)?;
        self.check_integrity(&current, request.signer, &request.origin)?;
        let current_hash = current.current_hash().map(|hash| hash.value.clone());
        if current_hash.as_deref() != Some(request.document_hash.as_str()) {
            return Err(ContractError::StaleDocument {
                supplied: request.document_hash,
                current: current_hash,
            });
        }

        let attempt = self.attempt(&request);
        let now = self.timestamp();
        let new_signature = NewSignature {
            signer: request.signer,
            method: request.method.method(),
            document_hash: request.document_hash.clone(),
            signature: attempt.signature,
            certificate_info: attempt.certificate_info,
            signed_at: (attempt.status == SignatureStatus::Signed).then_some(now),
            origin: request.origin.clone(),
            status: attempt.status,
            failure_reason: attempt.failure.as_ref().map(ToString::to_string),
            created_at: now,
        };

        let supplied = request.document_hash.as_str();
        let committed = self.contracts.apply(request.contract_id, &mut |contract| {
            match contract.status {
                ContractStatus::Generated | ContractStatus::Signed => {}
                status => {
                    return Err(TransitionError::InvalidState {
                        operation: ContractOperation::RecordSignature,
                        status,
                    });
                }
            }
            let stored = contract.current_hash().map(|hash| hash.value.clone());
            if stored.as_deref() != Some(supplied) {
                return Err(TransitionError::StaleDocument {
                    supplied: supplied.to_string(),
                    current: stored,
                });
            }
            let status = if new_signature.status == SignatureStatus::Signed {
                ContractStatus::Signed
            } else {
                contract.status
            };
            Ok(ContractWrite::Signature {
                signature: new_signature.clone(),
                status,
                updated_at: now,
            })
        });
        let receipt = match committed {
            Ok(receipt) => receipt,
            Err(err) => {
                let err = ContractError::from(err);
                if matches!(
                    err,
                    ContractError::StaleDocument {
                        ..
                    } | ContractError::InvalidState {
                        ..
                    }
                ) {
                    self.emit(
                        ActivityAction::SignatureRejected,
                        Some(request.signer),
                        Some(request.contract_id),
                        json!({
                            "method": new_signature.method,
                            "status": new_signature.status,
                            "document_hash": new_signature.document_hash,
                            "error_kind": err.kind(),
                            "reason": err.to_string(),
                        }),
                        &request.origin,
                    );
                }
                return Err(err);
            }
        };
        let record = receipt
            .signature
            .ok_or_else(|| StoreError::Store("signature append returned no record".to_string()))?;

        let (action, detail) = match &attempt.failure {
            Some(failure) => (
                ActivityAction::SignatureRejected,
                json!({
                    "signature_id": record.id,
                    "method": record.method,
                    "status": record.status,
                    "error_kind": failure.kind(),
                    "reason": failure.to_string(),
                }),
            ),
            None => (
                ActivityAction::SignatureRecorded,
                json!({
                    "signature_id": record.id,
                    "method": record.method,
                    "status": record.status,
                    "document_hash": record.document_hash,
                    "contract_status": receipt.contract.status,
                }),
            ),
        };
        self.emit(action, Some(request.signer), Some(request.contract_id), detail, &request.origin);
        Ok(SignatureOutcome {
            record,
            contract: receipt.contract,
            failure: attempt.failure,
        })
    }

    /// Produces the signature evidence for a request. May call the authority.
    fn attempt(&self, request: &SignatureRequest) -> Attempt {
        match &request.method {
            SigningMethodRequest::IdentityProvider {
                credential,
            } => {
                if credential.is_expired_at(self.timestamp()) {
                    return Attempt::failed(SignatureStatus::Expired, AuthorityError::CredentialExpired);
                }
                let authority_request = AuthorityRequest {
                    document_hash: request.document_hash.clone(),
                    credential: credential.clone(),
                };
                match sign_with_deadline(
                    &self.authority,
                    authority_request,
                    self.config.signing_deadline,
                ) {
                    Ok(assertion) => Attempt {
                        status: SignatureStatus::Signed,
                        signature: Some(assertion.signature),
                        certificate_info: Some(json!({
                            "payload": assertion.payload,
                            "identity": assertion.identity.or_else(|| credential.identity_claims.clone()),
                            "certificate_id": credential.certificate_id,
                        })),
                        failure: None,
                    },
                    Err(failure) => Attempt::failed(SignatureStatus::Rejected, failure),
                }
            }
            SigningMethodRequest::Certificate {
                assertion,
            }
            | SigningMethodRequest::Simple {
                assertion,
            } => Attempt {
                status: if assertion.signed {
                    SignatureStatus::Signed
                } else {
                    SignatureStatus::Pending
                },
                signature: assertion.signature.clone(),
                certificate_info: assertion.certificate_info.clone(),
                failure: None,
            },
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Loads a contract with its parties and signatures.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotFound`] for unknown contracts.
    pub fn show(&self, id: ContractId) -> Result<ContractView, ContractError> {
        let contract = self.load(id)?;
        Ok(ContractView {
            parties: self.contracts.list_parties(id)?,
            signatures: self.contracts.list_signatures(id)?,
            contract,
        })
    }

    /// Lists an owner's contracts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Store`] when listing fails.
    pub fn list(&self, owner: UserId) -> Result<Vec<Contract>, ContractError> {
        Ok(self.contracts.list_contracts(owner)?)
    }

    /// Recomputes the stored document hash and compares it with the stored one.
    ///
    /// A mismatch is reported, audited, and never repaired.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotFound`] for unknown contracts.
    pub fn verify(
        &self,
        id: ContractId,
        actor: Option<UserId>,
        origin: &OriginMetadata,
    ) -> Result<IntegrityReport, ContractError> {
        let contract = self.load(id)?;
        let computed = contract.document.as_ref().map(|document| hash_document(&document.final_text));
        let stored_hash = contract.current_hash().map(|hash| hash.value.clone());
        let computed_hash = computed.map(|hash| hash.value);
        let intact = stored_hash == computed_hash;
        if !intact {
            self.emit_integrity_violation(&contract, actor, origin, computed_hash.as_deref());
        }
        Ok(IntegrityReport {
            contract_id: id,
            status: contract.status,
            stored_hash,
            computed_hash,
            intact,
        })
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Loads a contract or fails with not-found.
    fn load(&self, id: ContractId) -> Result<Contract, ContractError> {
        self.contracts.load_contract(id)?.ok_or_else(|| ContractError::not_found("contract", id))
    }

    /// Fails with an integrity error when the stored text does not hash to the
    /// stored hash.
    fn check_integrity(
        &self,
        contract: &Contract,
        actor: UserId,
        origin: &OriginMetadata,
    ) -> Result<(), ContractError> {
        let Some(document) = &contract.document else {
            return Ok(());
        };
        let computed = hash_document(&document.final_text);
        if computed.matches_hex(&document.hash.value) {
            return Ok(());
        }
        self.emit_integrity_violation(contract, Some(actor), origin, Some(&computed.value));
        Err(ContractError::Integrity(format!(
            "contract {} text does not match stored hash {}",
            contract.id, document.hash.value
        )))
    }

    /// Emits an integrity violation event.
    fn emit_integrity_violation(
        &self,
        contract: &Contract,
        actor: Option<UserId>,
        origin: &OriginMetadata,
        computed: Option<&str>,
    ) {
        self.emit(
            ActivityAction::IntegrityViolation,
            actor,
            Some(contract.id),
            json!({
                "stored_hash": contract.current_hash().map(|hash| hash.value.clone()),
                "computed_hash": computed,
                "status": contract.status,
            }),
            origin,
        );
    }

    /// Reads the clock as a record timestamp.
    fn timestamp(&self) -> Timestamp {
        Timestamp::from_datetime(self.clock.now())
    }

    /// Hands an event to the audit sink.
    fn emit(
        &self,
        action: ActivityAction,
        actor: Option<UserId>,
        contract_id: Option<ContractId>,
        detail: Value,
        origin: &OriginMetadata,
    ) {
        self.audit.record(&ActivityEvent {
            action,
            actor,
            contract_id,
            detail,
            origin: origin.clone(),
            recorded_at: self.timestamp(),
        });
    }
}

// ============================================================================
// SECTION: Signing Attempts
// ============================================================================

/// Evidence gathered for one signing attempt, before it is committed.
struct Attempt {
    /// Record status.
    status: SignatureStatus,
    /// Signature token.
    signature: Option<String>,
    /// Opaque certificate or assertion metadata.
    certificate_info: Option<Value>,
    /// Failure behind a rejected or expired attempt.
    failure: Option<AuthorityError>,
}

impl Attempt {
    /// Builds a failed attempt.
    fn failed(status: SignatureStatus, failure: AuthorityError) -> Self {
        Self {
            status,
            signature: None,
            certificate_info: Some(json!({ "error_kind": failure.kind() })),
            failure: Some(failure),
        }
    }
}
