// crates/pactum-core/src/runtime/store.rs
// ============================================================================
// Module: Pactum In-Memory Store
// Description: In-memory catalog, contract, and settings storage.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of every store
//! trait for tests and local demos. A single mutex serializes all access, so
//! each [`ContractStore::apply`] call is trivially atomic. It is not intended
//! for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::catalog::ContractTemplate;
use crate::core::catalog::ContractType;
use crate::core::catalog::NewContractType;
use crate::core::catalog::NewTemplate;
use crate::core::contract::Contract;
use crate::core::contract::ContractParty;
use crate::core::contract::ContractStatus;
use crate::core::contract::NewContract;
use crate::core::contract::TransitionError;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::ContractTypeId;
use crate::core::identifiers::PartyId;
use crate::core::identifiers::SignatureId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::UserId;
use crate::core::settings::SystemSetting;
use crate::core::signature::SignatureRecord;
use crate::core::time::Timestamp;
use crate::interfaces::CatalogWriter;
use crate::interfaces::CommitError;
use crate::interfaces::CommitReceipt;
use crate::interfaces::ContractStore;
use crate::interfaces::ContractWrite;
use crate::interfaces::SettingsStore;
use crate::interfaces::StoreError;
use crate::interfaces::TemplateStore;

// ============================================================================
// SECTION: State
// ============================================================================

/// Everything the in-memory store holds.
#[derive(Debug, Default)]
struct MemoryState {
    /// Contract types by raw id.
    types: BTreeMap<u64, ContractType>,
    /// Templates by raw id.
    templates: BTreeMap<u64, ContractTemplate>,
    /// Contracts by raw id.
    contracts: BTreeMap<u64, Contract>,
    /// Parties by raw contract id.
    parties: BTreeMap<u64, Vec<ContractParty>>,
    /// Signatures by raw contract id.
    signatures: BTreeMap<u64, Vec<SignatureRecord>>,
    /// Settings by key.
    settings: BTreeMap<String, SystemSetting>,
    /// Last issued identifier (shared sequence across tables).
    last_id: u64,
}

impl MemoryState {
    /// Issues the next raw identifier.
    fn next_raw_id(&mut self) -> Result<u64, StoreError> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Store("identifier space exhausted".to_string()))?;
        Ok(self.last_id)
    }
}

/// Builds a typed id from a freshly issued raw id.
fn issue<T>(state: &mut MemoryState, build: fn(u64) -> Option<T>) -> Result<T, StoreError> {
    let raw = state.next_raw_id()?;
    build(raw).ok_or_else(|| StoreError::Store("issued zero identifier".to_string()))
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("in-memory store mutex poisoned".to_string()))
    }
}

impl TemplateStore for InMemoryStore {
    fn get_template(&self, id: TemplateId) -> Result<Option<ContractTemplate>, StoreError> {
        Ok(self.lock()?.templates.get(&id.get()).cloned())
    }

    fn get_type(&self, id: ContractTypeId) -> Result<Option<ContractType>, StoreError> {
        Ok(self.lock()?.types.get(&id.get()).cloned())
    }

    fn list_types(&self, active_only: bool) -> Result<Vec<ContractType>, StoreError> {
        let guard = self.lock()?;
        let mut types: Vec<ContractType> = guard
            .types
            .values()
            .filter(|contract_type| !active_only || contract_type.active)
            .cloned()
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(types)
    }

    fn templates_for_type(
        &self,
        type_id: ContractTypeId,
    ) -> Result<Vec<ContractTemplate>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .templates
            .values()
            .rev()
            .filter(|template| template.contract_type_id == type_id && template.active)
            .cloned()
            .collect())
    }
}

impl CatalogWriter for InMemoryStore {
    fn insert_contract_type(
        &self,
        contract_type: NewContractType,
        created_at: Timestamp,
    ) -> Result<ContractType, StoreError> {
        let mut guard = self.lock()?;
        let id = issue(&mut guard, ContractTypeId::from_raw)?;
        let record = ContractType {
            id,
            name: contract_type.name,
            description: contract_type.description,
            category: contract_type.category,
            active: true,
            created_at,
        };
        guard.types.insert(id.get(), record.clone());
        Ok(record)
    }

    fn publish_template(
        &self,
        template: NewTemplate,
        created_at: Timestamp,
    ) -> Result<ContractTemplate, StoreError> {
        let mut guard = self.lock()?;
        if !guard.types.contains_key(&template.contract_type_id.get()) {
            return Err(StoreError::Invalid(format!(
                "contract type {} does not exist",
                template.contract_type_id
            )));
        }
        let id = issue(&mut guard, TemplateId::from_raw)?;
        let record = ContractTemplate {
            id,
            contract_type_id: template.contract_type_id,
            name: template.name,
            body: template.body,
            required_fields: template.required_fields,
            optional_fields: template.optional_fields,
            version: template.version,
            active: true,
            created_at,
        };
        guard.templates.insert(id.get(), record.clone());
        Ok(record)
    }

    fn set_type_active(&self, id: ContractTypeId, active: bool) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        Ok(guard.types.get_mut(&id.get()).map(|record| record.active = active).is_some())
    }

    fn set_template_active(&self, id: TemplateId, active: bool) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        Ok(guard.templates.get_mut(&id.get()).map(|record| record.active = active).is_some())
    }
}

impl ContractStore for InMemoryStore {
    fn insert_contract(
        &self,
        contract: NewContract,
        created_at: Timestamp,
    ) -> Result<Contract, StoreError> {
        let mut guard = self.lock()?;
        let id = issue(&mut guard, ContractId::from_raw)?;
        let mut parties = Vec::with_capacity(contract.parties.len());
        for party in contract.parties {
            parties.push(ContractParty {
                id: issue(&mut guard, PartyId::from_raw)?,
                contract_id: id,
                role: party.role,
                identity: party.identity,
                created_at,
            });
        }
        let record = Contract {
            id,
            owner: contract.owner,
            contract_type_id: contract.contract_type_id,
            template_id: contract.template_id,
            title: contract.title,
            data: contract.data,
            document: None,
            status: ContractStatus::Draft,
            created_at,
            updated_at: created_at,
        };
        guard.contracts.insert(id.get(), record.clone());
        guard.parties.insert(id.get(), parties);
        Ok(record)
    }

    fn load_contract(&self, id: ContractId) -> Result<Option<Contract>, StoreError> {
        Ok(self.lock()?.contracts.get(&id.get()).cloned())
    }

    fn list_contracts(&self, owner: UserId) -> Result<Vec<Contract>, StoreError> {
        let guard = self.lock()?;
        let mut contracts: Vec<Contract> =
            guard.contracts.values().filter(|contract| contract.owner == owner).cloned().collect();
        contracts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(contracts)
    }

    fn list_parties(&self, id: ContractId) -> Result<Vec<ContractParty>, StoreError> {
        Ok(self.lock()?.parties.get(&id.get()).cloned().unwrap_or_default())
    }

    fn list_signatures(&self, id: ContractId) -> Result<Vec<SignatureRecord>, StoreError> {
        Ok(self.lock()?.signatures.get(&id.get()).cloned().unwrap_or_default())
    }

    fn apply(
        &self,
        id: ContractId,
        transition: &mut dyn FnMut(&Contract) -> Result<ContractWrite, TransitionError>,
    ) -> Result<CommitReceipt, CommitError> {
        let mut guard = self.lock()?;
        let mut contract =
            guard.contracts.get(&id.get()).cloned().ok_or(CommitError::NotFound(id))?;
        let write = transition(&contract).map_err(CommitError::Rejected)?;
        let signature = match write.apply_to(&mut contract) {
            Some(new_signature) => {
                let signature_id = issue(&mut guard, SignatureId::from_raw)?;
                let record = SignatureRecord::from_new(signature_id, id, new_signature);
                guard.signatures.entry(id.get()).or_default().push(record.clone());
                Some(record)
            }
            None => None,
        };
        guard.contracts.insert(id.get(), contract.clone());
        Ok(CommitReceipt {
            contract,
            signature,
        })
    }
}

impl SettingsStore for InMemoryStore {
    fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError> {
        Ok(self.lock()?.settings.get(key).cloned())
    }

    fn put_setting(&self, setting: &SystemSetting) -> Result<(), StoreError> {
        self.lock()?.settings.insert(setting.key.clone(), setting.clone());
        Ok(())
    }

    fn list_settings(&self) -> Result<Vec<SystemSetting>, StoreError> {
        Ok(self.lock()?.settings.values().cloned().collect())
    }
}
