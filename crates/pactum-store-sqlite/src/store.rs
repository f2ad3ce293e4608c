// crates/pactum-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Pactum Store
// Description: Durable catalog, contract, settings, and audit storage on SQLite.
// Purpose: Persist the contract lifecycle with per-contract transactions.
// Dependencies: pactum-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One database holds the catalog, contracts with their parties and
//! signatures, system settings and the activity log. Every contract mutation
//! runs inside a `BEGIN IMMEDIATE` transaction, so the read-validate-write of
//! [`ContractStore::apply`] is serialized against other connections too.
//!
//! Database contents are untrusted: loads parse every enumeration and refuse
//! rows whose rendered text and hash are not both present or both absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use pactum_core::ActivityAction;
use pactum_core::ActivityEvent;
use pactum_core::AuditSink;
use pactum_core::CatalogWriter;
use pactum_core::CommitError;
use pactum_core::CommitReceipt;
use pactum_core::Contract;
use pactum_core::ContractDocument;
use pactum_core::ContractId;
use pactum_core::ContractParty;
use pactum_core::ContractStatus;
use pactum_core::ContractStore;
use pactum_core::ContractTemplate;
use pactum_core::ContractType;
use pactum_core::ContractTypeId;
use pactum_core::ContractWrite;
use pactum_core::HashAlgorithm;
use pactum_core::HashDigest;
use pactum_core::NewContract;
use pactum_core::NewContractType;
use pactum_core::NewSignature;
use pactum_core::NewTemplate;
use pactum_core::OriginMetadata;
use pactum_core::PartyId;
use pactum_core::PartyIdentity;
use pactum_core::SettingsStore;
use pactum_core::SignatureId;
use pactum_core::SignatureRecord;
use pactum_core::StoreError;
use pactum_core::SystemSetting;
use pactum_core::TemplateId;
use pactum_core::TemplateStore;
use pactum_core::Timestamp;
use pactum_core::TransitionError;
use pactum_core::UserId;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum size of a template body, data bag or rendered document.
pub const MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;

/// Contract columns in the order read by [`ContractRow::read`].
const CONTRACT_COLUMNS: &str = "id, owner, contract_type_id, template_id, title, data_json, \
                                final_text, document_hash, hash_algorithm, status, created_at, \
                                updated_at";
/// Template columns in the order read by [`TemplateRow::read`].
const TEMPLATE_COLUMNS: &str = "id, contract_type_id, name, body, required_fields, \
                                optional_fields, version, active, created_at";
/// Signature columns in the order read by [`SignatureRow::read`].
const SIGNATURE_COLUMNS: &str = "id, contract_id, signer, method, document_hash, signature, \
                                 certificate_info, signed_at, ip_address, user_agent, status, \
                                 failure_reason, created_at";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for `path`.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "payload exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

impl From<SqliteStoreError> for CommitError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Store(error.into())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed Pactum store.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens an `SQLite`-backed store, creating the schema when missing.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Lists activity log entries, oldest first, optionally for one contract.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a row is invalid.
    pub fn list_activity(
        &self,
        contract_id: Option<ContractId>,
    ) -> Result<Vec<ActivityEvent>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(
            "SELECT action, actor, contract_id, detail_json, ip_address, user_agent, recorded_at \
             FROM activity_logs WHERE (?1 IS NULL OR contract_id = ?1) ORDER BY id",
        )?;
        let rows = statement
            .query_map(params![contract_id.map(|id| raw_id(id.get()))], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(statement);
        drop(guard);
        rows.into_iter()
            .map(|(action, actor, contract, detail, ip, agent, recorded_at)| {
                Ok(ActivityEvent {
                    action: parse_label::<ActivityAction>(&action, "activity action")?,
                    actor: actor.map(|raw| typed_id(raw, UserId::from_raw, "user")).transpose()?,
                    contract_id: contract
                        .map(|raw| typed_id(raw, ContractId::from_raw, "contract"))
                        .transpose()?,
                    detail: from_json::<Value>(&detail, "activity detail")?,
                    origin: origin_from_columns(ip, agent)?,
                    recorded_at: Timestamp::from_unix_millis(recorded_at),
                })
            })
            .collect()
    }

    /// Inserts an activity event.
    fn insert_activity(&self, event: &ActivityEvent) -> Result<(), SqliteStoreError> {
        let detail = serde_json::to_string(&event.detail)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = self.lock()?;
        guard.execute(
            "INSERT INTO activity_logs (action, actor, contract_id, detail_json, ip_address, \
             user_agent, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.action.as_str(),
                event.actor.map(|id| raw_id(id.get())),
                event.contract_id.map(|id| raw_id(id.get())),
                detail,
                event.origin.ip_address.map(|ip| ip.to_string()),
                event.origin.user_agent,
                event.recorded_at.as_unix_millis()
            ],
        )?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Template Store
// ============================================================================

impl TemplateStore for SqliteStore {
    fn get_template(&self, id: TemplateId) -> Result<Option<ContractTemplate>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM contract_templates WHERE id = ?1"),
                params![raw_id(id.get())],
                TemplateRow::read,
            )
            .optional()
            .map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(row.map(TemplateRow::into_template).transpose()?)
    }

    fn get_type(&self, id: ContractTypeId) -> Result<Option<ContractType>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT id, name, description, category, active, created_at FROM contract_types \
                 WHERE id = ?1",
                params![raw_id(id.get())],
                TypeRow::read,
            )
            .optional()
            .map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(row.map(TypeRow::into_type).transpose()?)
    }

    fn list_types(&self, active_only: bool) -> Result<Vec<ContractType>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, name, description, category, active, created_at FROM contract_types \
                 WHERE (?1 = 0 OR active = 1) ORDER BY name, id",
            )
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![active_only], TypeRow::read)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(SqliteStoreError::from)?;
        drop(statement);
        drop(guard);
        Ok(rows.into_iter().map(TypeRow::into_type).collect::<Result<Vec<_>, _>>()?)
    }

    fn templates_for_type(
        &self,
        type_id: ContractTypeId,
    ) -> Result<Vec<ContractTemplate>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM contract_templates WHERE contract_type_id = ?1 \
                 AND active = 1 ORDER BY id DESC"
            ))
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![raw_id(type_id.get())], TemplateRow::read)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(SqliteStoreError::from)?;
        drop(statement);
        drop(guard);
        Ok(rows.into_iter().map(TemplateRow::into_template).collect::<Result<Vec<_>, _>>()?)
    }
}

impl CatalogWriter for SqliteStore {
    fn insert_contract_type(
        &self,
        contract_type: NewContractType,
        created_at: Timestamp,
    ) -> Result<ContractType, StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO contract_types (name, description, category, active, created_at) \
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![
                    contract_type.name,
                    contract_type.description,
                    contract_type.category.as_str(),
                    created_at.as_unix_millis()
                ],
            )
            .map_err(SqliteStoreError::from)?;
        let id = typed_id(guard.last_insert_rowid(), ContractTypeId::from_raw, "contract type")?;
        Ok(ContractType {
            id,
            name: contract_type.name,
            description: contract_type.description,
            category: contract_type.category,
            active: true,
            created_at,
        })
    }

    fn publish_template(
        &self,
        template: NewTemplate,
        created_at: Timestamp,
    ) -> Result<ContractTemplate, StoreError> {
        ensure_size(template.body.len())?;
        let required = to_json(&template.required_fields)?;
        let optional = to_json(&template.optional_fields)?;
        let guard = self.lock()?;
        let type_exists: Option<i64> = guard
            .query_row(
                "SELECT id FROM contract_types WHERE id = ?1",
                params![raw_id(template.contract_type_id.get())],
                |row| row.get(0),
            )
            .optional()
            .map_err(SqliteStoreError::from)?;
        if type_exists.is_none() {
            return Err(StoreError::Invalid(format!(
                "contract type {} does not exist",
                template.contract_type_id
            )));
        }
        guard
            .execute(
                "INSERT INTO contract_templates (contract_type_id, name, body, required_fields, \
                 optional_fields, version, active, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, \
                 1, ?7)",
                params![
                    raw_id(template.contract_type_id.get()),
                    template.name,
                    template.body,
                    required,
                    optional,
                    template.version,
                    created_at.as_unix_millis()
                ],
            )
            .map_err(SqliteStoreError::from)?;
        let id = typed_id(guard.last_insert_rowid(), TemplateId::from_raw, "template")?;
        Ok(ContractTemplate {
            id,
            contract_type_id: template.contract_type_id,
            name: template.name,
            body: template.body,
            required_fields: template.required_fields,
            optional_fields: template.optional_fields,
            version: template.version,
            active: true,
            created_at,
        })
    }

    fn set_type_active(&self, id: ContractTypeId, active: bool) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE contract_types SET active = ?1 WHERE id = ?2",
                params![active, raw_id(id.get())],
            )
            .map_err(SqliteStoreError::from)?;
        Ok(changed > 0)
    }

    fn set_template_active(&self, id: TemplateId, active: bool) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE contract_templates SET active = ?1 WHERE id = ?2",
                params![active, raw_id(id.get())],
            )
            .map_err(SqliteStoreError::from)?;
        Ok(changed > 0)
    }
}

// ============================================================================
// SECTION: Contract Store
// ============================================================================

impl ContractStore for SqliteStore {
    fn insert_contract(
        &self,
        contract: NewContract,
        created_at: Timestamp,
    ) -> Result<Contract, StoreError> {
        let data_json = to_json(&contract.data)?;
        ensure_size(data_json.len())?;
        let mut guard = self.lock()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::from)?;
        tx.execute(
            "INSERT INTO contracts (owner, contract_type_id, template_id, title, data_json, \
             final_text, document_hash, hash_algorithm, status, created_at, updated_at) VALUES \
             (?1, ?2, ?3, ?4, ?5, NULL, NULL, NULL, ?6, ?7, ?7)",
            params![
                raw_id(contract.owner.get()),
                raw_id(contract.contract_type_id.get()),
                raw_id(contract.template_id.get()),
                contract.title,
                data_json,
                ContractStatus::Draft.as_str(),
                created_at.as_unix_millis()
            ],
        )
        .map_err(SqliteStoreError::from)?;
        let id = typed_id(tx.last_insert_rowid(), ContractId::from_raw, "contract")?;
        for party in &contract.parties {
            let identity = &party.identity;
            tx.execute(
                "INSERT INTO contract_parties (contract_id, role, full_name, cpf, rg, address, \
                 phone, email, profession, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, \
                 ?9, ?10)",
                params![
                    raw_id(id.get()),
                    party.role.as_str(),
                    identity.full_name,
                    identity.cpf,
                    identity.rg,
                    identity.address,
                    identity.phone,
                    identity.email,
                    identity.profession,
                    created_at.as_unix_millis()
                ],
            )
            .map_err(SqliteStoreError::from)?;
        }
        tx.commit().map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(Contract {
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
        })
    }

    fn load_contract(&self, id: ContractId) -> Result<Option<Contract>, StoreError> {
        let guard = self.lock()?;
        let row = load_contract_row(&guard, id)?;
        drop(guard);
        Ok(row.map(ContractRow::into_contract).transpose()?)
    }

    fn list_contracts(&self, owner: UserId) -> Result<Vec<Contract>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE owner = ?1 ORDER BY created_at \
                 DESC, id DESC"
            ))
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![raw_id(owner.get())], ContractRow::read)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(SqliteStoreError::from)?;
        drop(statement);
        drop(guard);
        Ok(rows.into_iter().map(ContractRow::into_contract).collect::<Result<Vec<_>, _>>()?)
    }

    fn list_parties(&self, id: ContractId) -> Result<Vec<ContractParty>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, contract_id, role, full_name, cpf, rg, address, phone, email, \
                 profession, created_at FROM contract_parties WHERE contract_id = ?1 ORDER BY id",
            )
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![raw_id(id.get())], PartyRow::read)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(SqliteStoreError::from)?;
        drop(statement);
        drop(guard);
        Ok(rows.into_iter().map(PartyRow::into_party).collect::<Result<Vec<_>, _>>()?)
    }

    fn list_signatures(&self, id: ContractId) -> Result<Vec<SignatureRecord>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {SIGNATURE_COLUMNS} FROM digital_signatures WHERE contract_id = ?1 ORDER \
                 BY id"
            ))
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![raw_id(id.get())], SignatureRow::read)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(SqliteStoreError::from)?;
        drop(statement);
        drop(guard);
        Ok(rows.into_iter().map(SignatureRow::into_record).collect::<Result<Vec<_>, _>>()?)
    }

    fn apply(
        &self,
        id: ContractId,
        transition: &mut dyn FnMut(&Contract) -> Result<ContractWrite, TransitionError>,
    ) -> Result<CommitReceipt, CommitError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::from)?;
        let row = load_contract_row(&tx, id)?.ok_or(CommitError::NotFound(id))?;
        let mut contract = row.into_contract()?;
        // Dropping `tx` on the error path rolls back.
        let write = transition(&contract).map_err(CommitError::Rejected)?;
        let signature = write.apply_to(&mut contract);
        update_contract(&tx, &contract)?;
        let record = match signature {
            Some(signature) => Some(insert_signature(&tx, id, signature)?),
            None => None,
        };
        tx.commit().map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(CommitReceipt {
            contract,
            signature: record,
        })
    }
}

// ============================================================================
// SECTION: Settings Store
// ============================================================================

impl SettingsStore for SqliteStore {
    fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT key, raw_value, description, kind, updated_at FROM system_settings WHERE \
                 key = ?1",
                params![key],
                SettingRow::read,
            )
            .optional()
            .map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(row.map(SettingRow::into_setting).transpose()?)
    }

    fn put_setting(&self, setting: &SystemSetting) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO system_settings (key, raw_value, description, kind, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(key) DO UPDATE SET raw_value = \
                 excluded.raw_value, description = excluded.description, kind = excluded.kind, \
                 updated_at = excluded.updated_at",
                params![
                    setting.key,
                    setting.raw_value,
                    setting.description,
                    setting.kind.as_str(),
                    setting.updated_at.as_unix_millis()
                ],
            )
            .map_err(SqliteStoreError::from)?;
        Ok(())
    }

    fn list_settings(&self) -> Result<Vec<SystemSetting>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT key, raw_value, description, kind, updated_at FROM system_settings ORDER \
                 BY key",
            )
            .map_err(SqliteStoreError::from)?;
        let rows = statement
            .query_map(params![], SettingRow::read)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(SqliteStoreError::from)?;
        drop(statement);
        drop(guard);
        Ok(rows.into_iter().map(SettingRow::into_setting).collect::<Result<Vec<_>, _>>()?)
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

impl AuditSink for SqliteStore {
    fn record(&self, event: &ActivityEvent) {
        // Audit writes never fail the caller.
        let _ = self.insert_activity(event);
    }
}

// ============================================================================
// SECTION: Row Types
// ============================================================================

/// Raw `contract_types` row.
struct TypeRow {
    /// Row id.
    id: i64,
    /// Display name.
    name: String,
    /// Description.
    description: Option<String>,
    /// Category label.
    category: String,
    /// Active flag.
    active: bool,
    /// Creation millis.
    created_at: i64,
}

impl TypeRow {
    /// Reads the row in column order.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            active: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// Validates and converts the row.
    fn into_type(self) -> Result<ContractType, SqliteStoreError> {
        Ok(ContractType {
            id: typed_id(self.id, ContractTypeId::from_raw, "contract type")?,
            name: self.name,
            description: self.description,
            category: parse_label(&self.category, "contract category")?,
            active: self.active,
            created_at: Timestamp::from_unix_millis(self.created_at),
        })
    }
}

/// Raw `contract_templates` row.
struct TemplateRow {
    /// Row id.
    id: i64,
    /// Owning type id.
    contract_type_id: i64,
    /// Display name.
    name: String,
    /// Body text.
    body: String,
    /// Required field schema JSON.
    required_fields: String,
    /// Optional field schema JSON.
    optional_fields: String,
    /// Version tag.
    version: String,
    /// Active flag.
    active: bool,
    /// Creation millis.
    created_at: i64,
}

impl TemplateRow {
    /// Reads the row in [`TEMPLATE_COLUMNS`] order.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_type_id: row.get(1)?,
            name: row.get(2)?,
            body: row.get(3)?,
            required_fields: row.get(4)?,
            optional_fields: row.get(5)?,
            version: row.get(6)?,
            active: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    /// Validates and converts the row.
    fn into_template(self) -> Result<ContractTemplate, SqliteStoreError> {
        Ok(ContractTemplate {
            id: typed_id(self.id, TemplateId::from_raw, "template")?,
            contract_type_id: typed_id(
                self.contract_type_id,
                ContractTypeId::from_raw,
                "contract type",
            )?,
            name: self.name,
            body: self.body,
            required_fields: from_json(&self.required_fields, "required_fields")?,
            optional_fields: from_json(&self.optional_fields, "optional_fields")?,
            version: self.version,
            active: self.active,
            created_at: Timestamp::from_unix_millis(self.created_at),
        })
    }
}

/// Raw `contracts` row.
struct ContractRow {
    /// Row id.
    id: i64,
    /// Owner id.
    owner: i64,
    /// Type id.
    contract_type_id: i64,
    /// Template id.
    template_id: i64,
    /// Title.
    title: String,
    /// Data bag JSON.
    data_json: String,
    /// Rendered text.
    final_text: Option<String>,
    /// Rendered text hash.
    document_hash: Option<String>,
    /// Hash algorithm label.
    hash_algorithm: Option<String>,
    /// Status label.
    status: String,
    /// Creation millis.
    created_at: i64,
    /// Update millis.
    updated_at: i64,
}

impl ContractRow {
    /// Reads the row in [`CONTRACT_COLUMNS`] order.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            contract_type_id: row.get(2)?,
            template_id: row.get(3)?,
            title: row.get(4)?,
            data_json: row.get(5)?,
            final_text: row.get(6)?,
            document_hash: row.get(7)?,
            hash_algorithm: row.get(8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    /// Validates and converts the row.
    fn into_contract(self) -> Result<Contract, SqliteStoreError> {
        let id = typed_id(self.id, ContractId::from_raw, "contract")?;
        let document = match (self.final_text, self.document_hash, self.hash_algorithm) {
            (None, None, None) => None,
            (Some(final_text), Some(value), Some(algorithm)) => Some(ContractDocument {
                final_text,
                hash: HashDigest {
                    algorithm: HashAlgorithm::from_label(&algorithm).ok_or_else(|| {
                        SqliteStoreError::Invalid(format!("unsupported hash algorithm: {algorithm}"))
                    })?,
                    value,
                },
            }),
            _ => {
                return Err(SqliteStoreError::Corrupt(format!(
                    "contract {id} has a partial document (text and hash must be stored together)"
                )));
            }
        };
        let status: ContractStatus = parse_label(&self.status, "contract status")?;
        if document.is_none() && status != ContractStatus::Draft && status != ContractStatus::Canceled
        {
            return Err(SqliteStoreError::Corrupt(format!(
                "contract {id} is {status} without a document"
            )));
        }
        Ok(Contract {
            id,
            owner: typed_id(self.owner, UserId::from_raw, "user")?,
            contract_type_id: typed_id(
                self.contract_type_id,
                ContractTypeId::from_raw,
                "contract type",
            )?,
            template_id: typed_id(self.template_id, TemplateId::from_raw, "template")?,
            title: self.title,
            data: from_json::<Value>(&self.data_json, "contract data")?,
            document,
            status,
            created_at: Timestamp::from_unix_millis(self.created_at),
            updated_at: Timestamp::from_unix_millis(self.updated_at),
        })
    }
}

/// Raw `contract_parties` row.
struct PartyRow {
    /// Row id.
    id: i64,
    /// Contract id.
    contract_id: i64,
    /// Role label.
    role: String,
    /// Identity attributes.
    identity: PartyIdentity,
    /// Creation millis.
    created_at: i64,
}

impl PartyRow {
    /// Reads the row in column order.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            role: row.get(2)?,
            identity: PartyIdentity {
                full_name: row.get(3)?,
                cpf: row.get(4)?,
                rg: row.get(5)?,
                address: row.get(6)?,
                phone: row.get(7)?,
                email: row.get(8)?,
                profession: row.get(9)?,
            },
            created_at: row.get(10)?,
        })
    }

    /// Validates and converts the row.
    fn into_party(self) -> Result<ContractParty, SqliteStoreError> {
        Ok(ContractParty {
            id: typed_id(self.id, PartyId::from_raw, "party")?,
            contract_id: typed_id(self.contract_id, ContractId::from_raw, "contract")?,
            role: parse_label(&self.role, "party role")?,
            identity: self.identity,
            created_at: Timestamp::from_unix_millis(self.created_at),
        })
    }
}

/// Raw `digital_signatures` row.
struct SignatureRow {
    /// Row id.
    id: i64,
    /// Contract id.
    contract_id: i64,
    /// Signer id.
    signer: i64,
    /// Method label.
    method: String,
    /// Bound document hash.
    document_hash: String,
    /// Signature token.
    signature: Option<String>,
    /// Certificate metadata JSON.
    certificate_info: Option<String>,
    /// Signing millis.
    signed_at: Option<i64>,
    /// Origin address.
    ip_address: Option<String>,
    /// Origin agent.
    user_agent: Option<String>,
    /// Status label.
    status: String,
    /// Failure reason.
    failure_reason: Option<String>,
    /// Creation millis.
    created_at: i64,
}

impl SignatureRow {
    /// Reads the row in [`SIGNATURE_COLUMNS`] order.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            signer: row.get(2)?,
            method: row.get(3)?,
            document_hash: row.get(4)?,
            signature: row.get(5)?,
            certificate_info: row.get(6)?,
            signed_at: row.get(7)?,
            ip_address: row.get(8)?,
            user_agent: row.get(9)?,
            status: row.get(10)?,
            failure_reason: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    /// Validates and converts the row.
    fn into_record(self) -> Result<SignatureRecord, SqliteStoreError> {
        Ok(SignatureRecord {
            id: typed_id(self.id, SignatureId::from_raw, "signature")?,
            contract_id: typed_id(self.contract_id, ContractId::from_raw, "contract")?,
            signer: typed_id(self.signer, UserId::from_raw, "user")?,
            method: parse_label(&self.method, "signature method")?,
            document_hash: self.document_hash,
            signature: self.signature,
            certificate_info: self
                .certificate_info
                .map(|raw| from_json::<Value>(&raw, "certificate info"))
                .transpose()?,
            signed_at: self.signed_at.map(Timestamp::from_unix_millis),
            origin: origin_from_columns(self.ip_address, self.user_agent)?,
            status: parse_label(&self.status, "signature status")?,
            failure_reason: self.failure_reason,
            created_at: Timestamp::from_unix_millis(self.created_at),
        })
    }
}

/// Raw `system_settings` row.
struct SettingRow {
    /// Key.
    key: String,
    /// Stored text.
    raw_value: String,
    /// Description.
    description: Option<String>,
    /// Kind label.
    kind: String,
    /// Update millis.
    updated_at: i64,
}

impl SettingRow {
    /// Reads the row in column order.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            raw_value: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            description: row.get(2)?,
            kind: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    /// Validates and converts the row.
    fn into_setting(self) -> Result<SystemSetting, SqliteStoreError> {
        Ok(SystemSetting {
            key: self.key,
            raw_value: self.raw_value,
            description: self.description,
            kind: parse_label(&self.kind, "setting kind")?,
            updated_at: Timestamp::from_unix_millis(self.updated_at),
        })
    }
}

// ============================================================================
// SECTION: Transaction Helpers
// ============================================================================

/// Loads a raw contract row on a connection or transaction.
fn load_contract_row(
    connection: &Connection,
    id: ContractId,
) -> Result<Option<ContractRow>, SqliteStoreError> {
    Ok(connection
        .query_row(
            &format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = ?1"),
            params![raw_id(id.get())],
            ContractRow::read,
        )
        .optional()?)
}

/// Persists the mutable contract columns.
fn update_contract(tx: &Transaction<'_>, contract: &Contract) -> Result<(), SqliteStoreError> {
    let (final_text, hash, algorithm) = match &contract.document {
        Some(document) => {
            ensure_size(document.final_text.len())?;
            (
                Some(document.final_text.as_str()),
                Some(document.hash.value.as_str()),
                Some(document.hash.algorithm.label()),
            )
        }
        None => (None, None, None),
    };
    tx.execute(
        "UPDATE contracts SET final_text = ?1, document_hash = ?2, hash_algorithm = ?3, status = \
         ?4, updated_at = ?5 WHERE id = ?6",
        params![
            final_text,
            hash,
            algorithm,
            contract.status.as_str(),
            contract.updated_at.as_unix_millis(),
            raw_id(contract.id.get())
        ],
    )?;
    Ok(())
}

/// Appends a signature record.
fn insert_signature(
    tx: &Transaction<'_>,
    contract_id: ContractId,
    signature: NewSignature,
) -> Result<SignatureRecord, SqliteStoreError> {
    let certificate_info = signature.certificate_info.as_ref().map(to_json).transpose()?;
    tx.execute(
        "INSERT INTO digital_signatures (contract_id, signer, method, document_hash, signature, \
         certificate_info, signed_at, ip_address, user_agent, status, failure_reason, \
         created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            raw_id(contract_id.get()),
            raw_id(signature.signer.get()),
            signature.method.as_str(),
            signature.document_hash,
            signature.signature,
            certificate_info,
            signature.signed_at.map(Timestamp::as_unix_millis),
            signature.origin.ip_address.map(|ip| ip.to_string()),
            signature.origin.user_agent,
            signature.status.as_str(),
            signature.failure_reason,
            signature.created_at.as_unix_millis()
        ],
    )?;
    let id = typed_id(tx.last_insert_rowid(), SignatureId::from_raw, "signature")?;
    Ok(SignatureRecord::from_new(id, contract_id, signature))
}

// ============================================================================
// SECTION: Conversion Helpers
// ============================================================================

/// Converts a typed id value to an `SQLite` integer.
fn raw_id(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Converts an `SQLite` integer into a typed id.
fn typed_id<T>(
    raw: i64,
    build: fn(u64) -> Option<T>,
    kind: &str,
) -> Result<T, SqliteStoreError> {
    u64::try_from(raw)
        .ok()
        .and_then(build)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("invalid {kind} id: {raw}")))
}

/// Parses a stored enumeration label.
fn parse_label<T: std::str::FromStr>(label: &str, kind: &str) -> Result<T, SqliteStoreError> {
    label.parse().map_err(|_| SqliteStoreError::Corrupt(format!("invalid {kind}: {label}")))
}

/// Deserializes stored JSON text.
fn from_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<T, SqliteStoreError> {
    serde_json::from_str(raw).map_err(|err| SqliteStoreError::Corrupt(format!("{what}: {err}")))
}

/// Serializes a value as JSON text.
fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, SqliteStoreError> {
    serde_json::to_string(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Rebuilds origin metadata from stored columns.
fn origin_from_columns(
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Result<OriginMetadata, SqliteStoreError> {
    let ip_address = ip_address
        .map(|raw| {
            raw.parse::<IpAddr>()
                .map_err(|_| SqliteStoreError::Corrupt(format!("invalid ip address: {raw}")))
        })
        .transpose()?;
    Ok(OriginMetadata {
        ip_address,
        user_agent,
    })
}

/// Rejects payloads above [`MAX_DOCUMENT_BYTES`].
const fn ensure_size(actual_bytes: usize) -> Result<(), SqliteStoreError> {
    if actual_bytes > MAX_DOCUMENT_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_DOCUMENT_BYTES,
            actual_bytes,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS contract_types (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    category TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS contract_templates (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    contract_type_id INTEGER NOT NULL REFERENCES contract_types(id),
                    name TEXT NOT NULL,
                    body TEXT NOT NULL,
                    required_fields TEXT NOT NULL,
                    optional_fields TEXT NOT NULL,
                    version TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS contracts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner INTEGER NOT NULL,
                    contract_type_id INTEGER NOT NULL REFERENCES contract_types(id),
                    template_id INTEGER NOT NULL REFERENCES contract_templates(id),
                    title TEXT NOT NULL,
                    data_json TEXT NOT NULL,
                    final_text TEXT,
                    document_hash TEXT,
                    hash_algorithm TEXT,
                    status TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_contracts_owner ON contracts (owner, created_at);
                CREATE TABLE IF NOT EXISTS contract_parties (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    contract_id INTEGER NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
                    role TEXT NOT NULL,
                    full_name TEXT NOT NULL,
                    cpf TEXT,
                    rg TEXT,
                    address TEXT,
                    phone TEXT,
                    email TEXT,
                    profession TEXT,
                    created_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS digital_signatures (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    contract_id INTEGER NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
                    signer INTEGER NOT NULL,
                    method TEXT NOT NULL,
                    document_hash TEXT NOT NULL,
                    signature TEXT,
                    certificate_info TEXT,
                    signed_at INTEGER,
                    ip_address TEXT,
                    user_agent TEXT,
                    status TEXT NOT NULL,
                    failure_reason TEXT,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_signatures_contract
                    ON digital_signatures (contract_id);
                CREATE TABLE IF NOT EXISTS system_settings (
                    key TEXT PRIMARY KEY,
                    raw_value TEXT,
                    description TEXT,
                    kind TEXT NOT NULL DEFAULT 'string',
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS activity_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    action TEXT NOT NULL,
                    actor INTEGER,
                    contract_id INTEGER,
                    detail_json TEXT NOT NULL,
                    ip_address TEXT,
                    user_agent TEXT,
                    recorded_at INTEGER NOT NULL
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}
