// crates/pactum-config/src/config.rs
// ============================================================================
// Module: Pactum Configuration
// Description: Configuration loading and validation for Pactum.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: pactum-core, pactum-providers, pactum-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `PACTUM_CONFIG`, then `pactum.toml`
//! in the working directory. Unknown keys are rejected and every section is
//! validated before the configuration is handed out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use pactum_core::EngineConfig;
use pactum_core::SystemClock;
use pactum_core::TokenSource;
use pactum_core::TokenTable;
use pactum_core::ValidationMode;
use pactum_providers::HttpAuthorityConfig;
use pactum_store_sqlite::SqliteStoreConfig;
use pactum_store_sqlite::SqliteStoreMode;
use pactum_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;
use time::UtcOffset;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "pactum.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PACTUM_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default `SQLite` database path.
const DEFAULT_STORE_PATH: &str = "pactum.sqlite";
/// Default busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum busy timeout in milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum UTC offset magnitude in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;
/// Maximum number of extra render tokens.
const MAX_EXTRA_TOKENS: usize = 128;
/// Default signing deadline in milliseconds.
const DEFAULT_SIGNING_DEADLINE_MS: u64 = 30_000;
/// Minimum signing deadline in milliseconds.
const MIN_SIGNING_DEADLINE_MS: u64 = 100;
/// Maximum signing deadline in milliseconds.
const MAX_SIGNING_DEADLINE_MS: u64 = 300_000;
/// Maximum authority response size in bytes.
const MAX_AUTHORITY_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum number of allowlisted authority hosts.
const MAX_ALLOWED_HOSTS: usize = 64;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Pactum configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PactumConfig {
    /// Durable store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Document rendering configuration.
    #[serde(default)]
    pub rendering: RenderingConfig,
    /// Signing configuration.
    #[serde(default)]
    pub signing: SigningConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Resolved file this configuration was loaded from (not deserialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl PactumConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// A missing default file yields the built-in defaults; a missing file
    /// named explicitly (argument or environment) is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source = Some(resolved);
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.rendering.validate()?;
        self.signing.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.store.path.clone(),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            validation: self.rendering.validation,
            signing_deadline: Duration::from_millis(self.signing.deadline_ms),
        }
    }

    /// Builds the render token table: the standard set plus configured extras.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an extra token is malformed.
    pub fn token_table(&self) -> Result<TokenTable, ConfigError> {
        self.rendering.token_table()
    }

    /// Returns the wall clock, pinned to the configured offset when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the offset is out of range.
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        Ok(match self.rendering.utc_offset()? {
            Some(offset) => SystemClock::with_offset(offset),
            None => SystemClock::new(),
        })
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// Sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Returns the default database path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Document rendering configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderingConfig {
    /// Required-field enforcement mode.
    #[serde(default)]
    pub validation: ValidationMode,
    /// Fixed UTC offset for clock tokens, in minutes; local offset when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Extra tokens keyed by full token text.
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenSource>,
}

impl RenderingConfig {
    /// Validates rendering settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.utc_offset()?;
        if self.tokens.len() > MAX_EXTRA_TOKENS {
            return Err(ConfigError::Invalid(format!(
                "rendering.tokens exceeds {MAX_EXTRA_TOKENS} entries"
            )));
        }
        for (token, source) in &self.tokens {
            if let TokenSource::Field {
                section,
                field,
            } = source
                && (section.trim().is_empty() || field.trim().is_empty())
            {
                return Err(ConfigError::Invalid(format!(
                    "rendering.tokens.{token} must name a section and a field"
                )));
            }
        }
        self.token_table()?;
        Ok(())
    }

    /// Converts the configured offset.
    fn utc_offset(&self) -> Result<Option<UtcOffset>, ConfigError> {
        let Some(minutes) = self.utc_offset_minutes else {
            return Ok(None);
        };
        if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "rendering.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        UtcOffset::from_whole_seconds(minutes * 60)
            .map(Some)
            .map_err(|err| ConfigError::Invalid(format!("rendering.utc_offset_minutes: {err}")))
    }

    /// Builds the token table.
    fn token_table(&self) -> Result<TokenTable, ConfigError> {
        let mut table = TokenTable::standard();
        for (token, source) in &self.tokens {
            table = table
                .with_token(token.clone(), source.clone())
                .map_err(|err| ConfigError::Invalid(format!("rendering.tokens: {err}")))?;
        }
        Ok(table)
    }
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Signing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Deadline for one authority call, in milliseconds.
    #[serde(default = "default_signing_deadline_ms")]
    pub deadline_ms: u64,
    /// HTTP signing authority; identity-provider signing is unavailable when unset.
    #[serde(default)]
    pub http: Option<HttpAuthorityConfig>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_SIGNING_DEADLINE_MS,
            http: None,
        }
    }
}

impl SigningConfig {
    /// Validates signing settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SIGNING_DEADLINE_MS ..= MAX_SIGNING_DEADLINE_MS).contains(&self.deadline_ms) {
            return Err(ConfigError::Invalid(format!(
                "signing.deadline_ms must be between {MIN_SIGNING_DEADLINE_MS} and \
                 {MAX_SIGNING_DEADLINE_MS}"
            )));
        }
        let Some(http) = &self.http else {
            return Ok(());
        };
        validate_endpoint("signing.http.signature_url", &http.signature_url, http.allow_http)?;
        if let Some(certificates_url) = &http.certificates_url {
            validate_endpoint("signing.http.certificates_url", certificates_url, http.allow_http)?;
        }
        if http.timeout_ms == 0 || http.timeout_ms > self.deadline_ms {
            return Err(ConfigError::Invalid(
                "signing.http.timeout_ms must be positive and at most signing.deadline_ms"
                    .to_string(),
            ));
        }
        if http.max_response_bytes == 0 || http.max_response_bytes > MAX_AUTHORITY_RESPONSE_BYTES
        {
            return Err(ConfigError::Invalid(format!(
                "signing.http.max_response_bytes must be between 1 and \
                 {MAX_AUTHORITY_RESPONSE_BYTES}"
            )));
        }
        if let Some(hosts) = &http.allowed_hosts {
            if hosts.is_empty() || hosts.len() > MAX_ALLOWED_HOSTS {
                return Err(ConfigError::Invalid(format!(
                    "signing.http.allowed_hosts must list 1 to {MAX_ALLOWED_HOSTS} hosts"
                )));
            }
            if hosts.iter().any(|host| host.trim().is_empty()) {
                return Err(ConfigError::Invalid(
                    "signing.http.allowed_hosts entries must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Returns the default signing deadline.
const fn default_signing_deadline_ms() -> u64 {
    DEFAULT_SIGNING_DEADLINE_MS
}

/// Validates an authority endpoint URL.
fn validate_endpoint(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(ConfigError::Invalid(format!(
                "{field} must use https unless allow_http is set"
            )));
        }
        other => {
            return Err(ConfigError::Invalid(format!("{field} has unsupported scheme {other}")));
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::Invalid(format!("{field} must not embed credentials")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Rows in the store's activity log.
    Store,
    /// Discard events.
    None,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the path was named explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
