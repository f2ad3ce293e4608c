// crates/pactum-cli/src/main.rs
// ============================================================================
// Module: Pactum CLI Entry Point
// Description: Command dispatcher for catalog, contract, and settings workflows.
// Purpose: Drive the contract engine against the configured SQLite store.
// Dependencies: clap, pactum-config, pactum-core, pactum-providers, pactum-store-sqlite, serde, thiserror.
// ============================================================================

//! ## Overview
//! The Pactum CLI loads `pactum.toml`, opens the configured `SQLite` store,
//! and runs one catalog, contract, settings, or audit operation per
//! invocation. Results are written to stdout as canonical JSON; failures go to
//! stderr with a non-zero exit code. Security posture: file inputs are
//! untrusted and are read with hard size limits before parsing.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use pactum_config::AuditSinkKind;
use pactum_config::PactumConfig;
use pactum_core::AuditSink;
use pactum_core::CatalogWriter;
use pactum_core::Clock;
use pactum_core::Contract;
use pactum_core::ContractCategory;
use pactum_core::ContractEngine;
use pactum_core::ContractError;
use pactum_core::ContractId;
use pactum_core::ContractTypeId;
use pactum_core::DataBag;
use pactum_core::DocumentRenderer;
use pactum_core::FieldSchema;
use pactum_core::FieldViolation;
use pactum_core::FileAuditSink;
use pactum_core::HashDigest;
use pactum_core::NewContract;
use pactum_core::NewContractType;
use pactum_core::NewTemplate;
use pactum_core::NoopAuditSink;
use pactum_core::OriginMetadata;
use pactum_core::SettingKind;
use pactum_core::SettingValue;
use pactum_core::SettingsStore;
use pactum_core::SignatureRecord;
use pactum_core::SignatureRequest;
use pactum_core::SigningAuthority;
use pactum_core::SigningCredential;
use pactum_core::StderrAuditSink;
use pactum_core::SystemSetting;
use pactum_core::TemplateId;
use pactum_core::TemplateStore;
use pactum_core::Timestamp;
use pactum_core::UnconfiguredAuthority;
use pactum_core::UserId;
use pactum_core::hash_document;
use pactum_providers::HttpSigningAuthority;
use pactum_store_sqlite::MAX_DOCUMENT_BYTES;
use pactum_store_sqlite::SqliteStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a template body file.
const MAX_TEMPLATE_BYTES: usize = 1024 * 1024;
/// Maximum size of a data bag or contract creation request.
const MAX_DATA_BYTES: usize = 1024 * 1024;
/// Maximum size of a field schema, signature request, or credential file.
const MAX_REQUEST_BYTES: usize = 256 * 1024;
/// Maximum size of a document passed to `hash`.
const MAX_HASH_INPUT_BYTES: usize = MAX_DOCUMENT_BYTES;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "pactum", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Optional config file path (defaults to pactum.toml or `PACTUM_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template body against a data bag without storing anything.
    Render(RenderCommand),
    /// Print the integrity hash of a document file.
    Hash(HashCommand),
    /// Contract type catalog.
    Type {
        /// Selected type subcommand.
        #[command(subcommand)]
        command: TypeCommand,
    },
    /// Template catalog.
    Template {
        /// Selected template subcommand.
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Contract lifecycle.
    Contract {
        /// Selected contract subcommand.
        #[command(subcommand)]
        command: ContractCommand,
    },
    /// Typed system settings.
    Settings {
        /// Selected settings subcommand.
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Stored audit trail.
    Activity {
        /// Selected activity subcommand.
        #[command(subcommand)]
        command: ActivityCommand,
    },
    /// External signing authority utilities.
    Authority {
        /// Selected authority subcommand.
        #[command(subcommand)]
        command: AuthorityCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `render`.
#[derive(Args, Debug)]
struct RenderCommand {
    /// Template body file.
    #[arg(long, value_name = "PATH")]
    template: PathBuf,
    /// Data bag JSON file (defaults to an empty bag).
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,
    /// Emit the rendered text and its hash as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    with_hash: bool,
}

/// Arguments for `hash`.
#[derive(Args, Debug)]
struct HashCommand {
    /// Document file to hash.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Contract type subcommands.
#[derive(Subcommand, Debug)]
enum TypeCommand {
    /// Register a contract type.
    Add(TypeAddCommand),
    /// List contract types.
    List(TypeListCommand),
    /// Mark a contract type inactive.
    Deactivate(TypeIdArgs),
}

/// Arguments for `type add`.
#[derive(Args, Debug)]
struct TypeAddCommand {
    /// Display name.
    #[arg(long)]
    name: String,
    /// Category label (service, dating, pets, rental, other).
    #[arg(long, value_parser = parse_category)]
    category: ContractCategory,
    /// Optional long description.
    #[arg(long)]
    description: Option<String>,
}

/// Arguments for `type list`.
#[derive(Args, Debug)]
struct TypeListCommand {
    /// Include inactive types.
    #[arg(long, action = ArgAction::SetTrue)]
    all: bool,
}

/// Contract type selector.
#[derive(Args, Debug)]
struct TypeIdArgs {
    /// Contract type identifier.
    #[arg(long)]
    id: u64,
}

/// Template subcommands.
#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Publish a new template version.
    Publish(TemplatePublishCommand),
    /// List active templates of a contract type.
    List(TemplateListCommand),
    /// Show one template version.
    Show(TemplateIdArgs),
    /// Mark a template version inactive.
    Deactivate(TemplateIdArgs),
}

/// Arguments for `template publish`.
#[derive(Args, Debug)]
struct TemplatePublishCommand {
    /// Owning contract type identifier.
    #[arg(long, value_name = "ID")]
    type_id: u64,
    /// Display name.
    #[arg(long)]
    name: String,
    /// Template body file.
    #[arg(long, value_name = "PATH")]
    body: PathBuf,
    /// Version tag.
    #[arg(long = "template-version", value_name = "TAG", default_value = "1.0")]
    version: String,
    /// Required field schema JSON file.
    #[arg(long, value_name = "PATH")]
    required: Option<PathBuf>,
    /// Optional field schema JSON file.
    #[arg(long, value_name = "PATH")]
    optional: Option<PathBuf>,
}

/// Arguments for `template list`.
#[derive(Args, Debug)]
struct TemplateListCommand {
    /// Contract type identifier.
    #[arg(long, value_name = "ID")]
    type_id: u64,
}

/// Template selector.
#[derive(Args, Debug)]
struct TemplateIdArgs {
    /// Template identifier.
    #[arg(long)]
    id: u64,
}

/// Contract subcommands.
#[derive(Subcommand, Debug)]
enum ContractCommand {
    /// Create a draft contract from a JSON request.
    Create(InputArgs),
    /// Render and hash the contract document.
    Generate(ContractActorArgs),
    /// Record a signature from a JSON request.
    Sign(InputArgs),
    /// Cancel a draft or generated contract.
    Cancel(ContractActorArgs),
    /// Show a contract with its parties and signatures.
    Show(ContractIdArgs),
    /// List an owner's contracts, newest first.
    List(ContractListCommand),
    /// Recompute the stored hash and compare it with the stored one.
    Verify(ContractVerifyCommand),
}

/// JSON request input.
#[derive(Args, Debug)]
struct InputArgs {
    /// Request JSON file.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
}

/// Contract selector with the acting user.
#[derive(Args, Debug)]
struct ContractActorArgs {
    /// Contract identifier.
    #[arg(long)]
    id: u64,
    /// Acting user identifier.
    #[arg(long, value_name = "USER_ID")]
    actor: u64,
}

/// Contract selector.
#[derive(Args, Debug)]
struct ContractIdArgs {
    /// Contract identifier.
    #[arg(long)]
    id: u64,
}

/// Arguments for `contract list`.
#[derive(Args, Debug)]
struct ContractListCommand {
    /// Owning user identifier.
    #[arg(long, value_name = "USER_ID")]
    owner: u64,
}

/// Arguments for `contract verify`.
#[derive(Args, Debug)]
struct ContractVerifyCommand {
    /// Contract identifier.
    #[arg(long)]
    id: u64,
    /// Acting user identifier, recorded on integrity violations.
    #[arg(long, value_name = "USER_ID")]
    actor: Option<u64>,
}

/// Settings subcommands.
#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Show one setting and its decoded value.
    Get(SettingsGetCommand),
    /// Create or replace a setting.
    Set(SettingsSetCommand),
    /// List all settings.
    List,
}

/// Arguments for `settings get`.
#[derive(Args, Debug)]
struct SettingsGetCommand {
    /// Setting key.
    #[arg(long)]
    key: String,
}

/// Arguments for `settings set`.
#[derive(Args, Debug)]
struct SettingsSetCommand {
    /// Setting key.
    #[arg(long)]
    key: String,
    /// Value kind (string, number, boolean, json).
    #[arg(long, value_parser = parse_setting_kind, default_value = "string")]
    kind: SettingKind,
    /// Value text, parsed according to the kind.
    #[arg(long)]
    value: String,
    /// Optional description.
    #[arg(long)]
    description: Option<String>,
}

/// Activity subcommands.
#[derive(Subcommand, Debug)]
enum ActivityCommand {
    /// List stored audit events.
    List(ActivityListCommand),
}

/// Arguments for `activity list`.
#[derive(Args, Debug)]
struct ActivityListCommand {
    /// Restrict to one contract.
    #[arg(long, value_name = "ID")]
    contract_id: Option<u64>,
}

/// Authority subcommands.
#[derive(Subcommand, Debug)]
enum AuthorityCommand {
    /// List certificates available to a credential.
    Certificates(AuthorityCertificatesCommand),
}

/// Arguments for `authority certificates`.
#[derive(Args, Debug)]
struct AuthorityCertificatesCommand {
    /// Signing credential JSON file.
    #[arg(long, value_name = "PATH")]
    credential: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration.
    Check,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// JSON shape of a generation result.
#[derive(Serialize)]
struct GenerateReport<'a> {
    /// Contract with its new document.
    contract: &'a Contract,
    /// Required fields that were missing (lenient mode only).
    missing_fields: &'a [FieldViolation],
}

/// JSON shape of a signing result.
#[derive(Serialize)]
struct SignatureReport<'a> {
    /// Appended record.
    record: &'a SignatureRecord,
    /// Contract after the append.
    contract: &'a Contract,
    /// Authority failure, when the record was rejected or expired.
    failure: Option<FailureReport>,
}

/// JSON shape of an authority failure.
#[derive(Serialize)]
struct FailureReport {
    /// Stable failure label.
    kind: &'static str,
    /// Human-readable message.
    message: String,
}

/// JSON shape of a setting with its decoded value.
#[derive(Serialize)]
struct SettingReport<'a> {
    /// Stored row.
    setting: &'a SystemSetting,
    /// Decoded value.
    value: SettingValue,
}

/// JSON shape of a rendered document.
#[derive(Serialize)]
struct RenderReport<'a> {
    /// Rendered text.
    final_text: &'a str,
    /// Hash of the rendered text.
    hash: &'a HashDigest,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("pactum {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    let config_path = cli.config.as_deref();

    match command {
        Commands::Render(command) => command_render(config_path, &command),
        Commands::Hash(command) => command_hash(&command),
        Commands::Type {
            command,
        } => command_type(config_path, command),
        Commands::Template {
            command,
        } => command_template(config_path, command),
        Commands::Contract {
            command,
        } => command_contract(config_path, command),
        Commands::Settings {
            command,
        } => command_settings(config_path, command),
        Commands::Activity {
            command,
        } => command_activity(config_path, command),
        Commands::Authority {
            command,
        } => command_authority(config_path, command),
        Commands::Config {
            command,
        } => command_config(config_path, command),
    }
}

// ============================================================================
// SECTION: Runtime Wiring
// ============================================================================

/// Engine wired to the `SQLite` store with configured authority and audit sink.
type Engine = ContractEngine<SqliteStore, SqliteStore, dyn SigningAuthority, Box<dyn AuditSink>>;

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<PactumConfig> {
    PactumConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured store.
fn open_store(config: &PactumConfig) -> CliResult<SqliteStore> {
    SqliteStore::new(&config.store_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

/// Returns the current instant from the configured clock.
fn now(config: &PactumConfig) -> CliResult<Timestamp> {
    let clock = config.clock().map_err(|err| CliError::new(err.to_string()))?;
    Ok(Timestamp::from_datetime(clock.now()))
}

/// Builds the contract engine over an open store.
fn build_engine(config: &PactumConfig, store: &SqliteStore) -> CliResult<Engine> {
    let clock: Arc<dyn Clock> =
        Arc::new(config.clock().map_err(|err| CliError::new(err.to_string()))?);
    let tokens = config.token_table().map_err(|err| CliError::new(err.to_string()))?;
    Ok(ContractEngine::new(
        store.clone(),
        store.clone(),
        build_authority(config)?,
        build_audit_sink(config, store)?,
        clock,
        DocumentRenderer::new(tokens),
        config.engine_config(),
    ))
}

/// Selects the HTTP authority when configured.
fn build_authority(config: &PactumConfig) -> CliResult<Arc<dyn SigningAuthority>> {
    match &config.signing.http {
        Some(http) => {
            let authority = HttpSigningAuthority::new(http.clone()).map_err(|err| {
                CliError::new(format!("failed to configure signing authority: {err}"))
            })?;
            Ok(Arc::new(authority))
        }
        None => Ok(Arc::new(UnconfiguredAuthority)),
    }
}

/// Selects the configured audit sink.
fn build_audit_sink(config: &PactumConfig, store: &SqliteStore) -> CliResult<Box<dyn AuditSink>> {
    match config.audit.sink {
        AuditSinkKind::Stderr => Ok(Box::new(StderrAuditSink)),
        AuditSinkKind::File => {
            let Some(path) = config.audit.path.as_deref() else {
                return Err(CliError::new("audit.path is required for the file sink"));
            };
            let sink = FileAuditSink::new(path)
                .map_err(|err| CliError::new(format!("failed to open audit log: {err}")))?;
            Ok(Box::new(sink))
        }
        AuditSinkKind::Store => Ok(Box::new(store.clone())),
        AuditSinkKind::None => Ok(Box::new(NoopAuditSink)),
    }
}

/// Origin recorded for requests issued from the CLI.
fn cli_origin() -> OriginMetadata {
    OriginMetadata {
        ip_address: None,
        user_agent: Some(format!("pactum-cli/{}", env!("CARGO_PKG_VERSION"))),
    }
}

// ============================================================================
// SECTION: Render and Hash Commands
// ============================================================================

/// Executes the `render` command.
fn command_render(config_path: Option<&Path>, command: &RenderCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let body = read_text(&command.template, MAX_TEMPLATE_BYTES, "template")?;
    let data: serde_json::Value = match &command.data {
        Some(path) => read_json(path, MAX_DATA_BYTES, "data bag")?,
        None => serde_json::Value::Object(serde_json::Map::new()),
    };
    let tokens = config.token_table().map_err(|err| CliError::new(err.to_string()))?;
    let clock = config.clock().map_err(|err| CliError::new(err.to_string()))?;
    let renderer = DocumentRenderer::new(tokens);
    let text = renderer.render(&body, &DataBag::from_value(&data), clock.now());
    if command.with_hash {
        let hash = hash_document(&text);
        write_json(&RenderReport {
            final_text: &text,
            hash: &hash,
        })?;
    } else {
        write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `hash` command.
fn command_hash(command: &HashCommand) -> CliResult<ExitCode> {
    let text = read_text(&command.input, MAX_HASH_INPUT_BYTES, "document")?;
    let digest = hash_document(&text);
    write_stdout_line(&format_hash_digest(&digest))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Catalog Commands
// ============================================================================

/// Dispatches contract type subcommands.
fn command_type(config_path: Option<&Path>, command: TypeCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    match command {
        TypeCommand::Add(command) => {
            let created = store
                .insert_contract_type(
                    NewContractType {
                        name: command.name,
                        description: command.description,
                        category: command.category,
                    },
                    now(&config)?,
                )
                .map_err(|err| CliError::new(format!("failed to add contract type: {err}")))?;
            write_json(&created)?;
        }
        TypeCommand::List(command) => {
            let types = store
                .list_types(!command.all)
                .map_err(|err| CliError::new(format!("failed to list contract types: {err}")))?;
            write_json(&types)?;
        }
        TypeCommand::Deactivate(command) => {
            let id = parse_id(command.id, ContractTypeId::from_raw, "contract type")?;
            let found = store
                .set_type_active(id, false)
                .map_err(|err| CliError::new(format!("failed to deactivate type: {err}")))?;
            if !found {
                return Err(CliError::new(format!("contract type {id} not found")));
            }
            write_stdout_line(&format!("contract type {id} deactivated"))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Dispatches template subcommands.
fn command_template(config_path: Option<&Path>, command: TemplateCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    match command {
        TemplateCommand::Publish(command) => {
            let template = NewTemplate {
                contract_type_id: parse_id(
                    command.type_id,
                    ContractTypeId::from_raw,
                    "contract type",
                )?,
                name: command.name,
                body: read_text(&command.body, MAX_TEMPLATE_BYTES, "template")?,
                required_fields: read_schema(command.required.as_deref())?,
                optional_fields: read_schema(command.optional.as_deref())?,
                version: command.version,
            };
            let published = store
                .publish_template(template, now(&config)?)
                .map_err(|err| CliError::new(format!("failed to publish template: {err}")))?;
            write_json(&published)?;
        }
        TemplateCommand::List(command) => {
            let type_id = parse_id(command.type_id, ContractTypeId::from_raw, "contract type")?;
            let templates = store
                .templates_for_type(type_id)
                .map_err(|err| CliError::new(format!("failed to list templates: {err}")))?;
            write_json(&templates)?;
        }
        TemplateCommand::Show(command) => {
            let id = parse_id(command.id, TemplateId::from_raw, "template")?;
            let template = store
                .get_template(id)
                .map_err(|err| CliError::new(format!("failed to load template: {err}")))?
                .ok_or_else(|| CliError::new(format!("template {id} not found")))?;
            write_json(&template)?;
        }
        TemplateCommand::Deactivate(command) => {
            let id = parse_id(command.id, TemplateId::from_raw, "template")?;
            let found = store
                .set_template_active(id, false)
                .map_err(|err| CliError::new(format!("failed to deactivate template: {err}")))?;
            if !found {
                return Err(CliError::new(format!("template {id} not found")));
            }
            write_stdout_line(&format!("template {id} deactivated"))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads an optional field schema file.
fn read_schema(path: Option<&Path>) -> CliResult<FieldSchema> {
    path.map_or_else(
        || Ok(FieldSchema::new()),
        |path| read_json(path, MAX_REQUEST_BYTES, "field schema"),
    )
}

// ============================================================================
// SECTION: Contract Commands
// ============================================================================

/// Dispatches contract subcommands.
fn command_contract(config_path: Option<&Path>, command: ContractCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let engine = build_engine(&config, &store)?;
    let origin = cli_origin();
    match command {
        ContractCommand::Create(command) => {
            let request: NewContract = read_json(&command.input, MAX_DATA_BYTES, "contract")?;
            let contract =
                engine.create(request, &origin).map_err(|err| engine_error("create", &err))?;
            write_json(&contract)?;
        }
        ContractCommand::Generate(command) => {
            let id = parse_id(command.id, ContractId::from_raw, "contract")?;
            let actor = parse_id(command.actor, UserId::from_raw, "user")?;
            let outcome =
                engine.generate(id, actor, &origin).map_err(|err| engine_error("generate", &err))?;
            write_json(&GenerateReport {
                contract: &outcome.contract,
                missing_fields: &outcome.missing_fields,
            })?;
        }
        ContractCommand::Sign(command) => {
            let mut request: SignatureRequest =
                read_json(&command.input, MAX_REQUEST_BYTES, "signature request")?;
            if request.origin.user_agent.is_none() {
                request.origin.user_agent = origin.user_agent;
            }
            let outcome =
                engine.record_signature(request).map_err(|err| engine_error("sign", &err))?;
            let failure = outcome.failure.as_ref().map(|failure| FailureReport {
                kind: failure.kind(),
                message: failure.to_string(),
            });
            let failed = failure.is_some();
            write_json(&SignatureReport {
                record: &outcome.record,
                contract: &outcome.contract,
                failure,
            })?;
            if failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        ContractCommand::Cancel(command) => {
            let id = parse_id(command.id, ContractId::from_raw, "contract")?;
            let actor = parse_id(command.actor, UserId::from_raw, "user")?;
            let contract =
                engine.cancel(id, actor, &origin).map_err(|err| engine_error("cancel", &err))?;
            write_json(&contract)?;
        }
        ContractCommand::Show(command) => {
            let id = parse_id(command.id, ContractId::from_raw, "contract")?;
            let view = engine.show(id).map_err(|err| engine_error("show", &err))?;
            write_json(&view)?;
        }
        ContractCommand::List(command) => {
            let owner = parse_id(command.owner, UserId::from_raw, "user")?;
            let contracts = engine.list(owner).map_err(|err| engine_error("list", &err))?;
            write_json(&contracts)?;
        }
        ContractCommand::Verify(command) => {
            let id = parse_id(command.id, ContractId::from_raw, "contract")?;
            let actor =
                command.actor.map(|raw| parse_id(raw, UserId::from_raw, "user")).transpose()?;
            let report =
                engine.verify(id, actor, &origin).map_err(|err| engine_error("verify", &err))?;
            write_json(&report)?;
            if !report.intact {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Formats an engine failure with its stable kind label.
fn engine_error(action: &str, error: &ContractError) -> CliError {
    CliError::new(format!("contract {action} failed ({}): {error}", error.kind()))
}

// ============================================================================
// SECTION: Settings Commands
// ============================================================================

/// Dispatches settings subcommands.
fn command_settings(config_path: Option<&Path>, command: SettingsCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    match command {
        SettingsCommand::Get(command) => {
            let setting = store
                .get_setting(&command.key)
                .map_err(|err| CliError::new(format!("failed to load setting: {err}")))?
                .ok_or_else(|| CliError::new(format!("setting {} not found", command.key)))?;
            let value = setting.decode().map_err(|err| {
                CliError::new(format!("setting {} is malformed: {err}", setting.key))
            })?;
            write_json(&SettingReport {
                setting: &setting,
                value,
            })?;
        }
        SettingsCommand::Set(command) => {
            let value = SettingValue::parse(command.kind, &command.value)
                .map_err(|err| CliError::new(format!("invalid setting value: {err}")))?;
            let setting =
                SystemSetting::from_value(command.key, &value, command.description, now(&config)?);
            store
                .put_setting(&setting)
                .map_err(|err| CliError::new(format!("failed to store setting: {err}")))?;
            write_json(&SettingReport {
                setting: &setting,
                value,
            })?;
        }
        SettingsCommand::List => {
            let settings = store
                .list_settings()
                .map_err(|err| CliError::new(format!("failed to list settings: {err}")))?;
            write_json(&settings)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Activity, Authority, and Config Commands
// ============================================================================

/// Dispatches activity subcommands.
fn command_activity(config_path: Option<&Path>, command: ActivityCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    match command {
        ActivityCommand::List(command) => {
            let contract_id = command
                .contract_id
                .map(|raw| parse_id(raw, ContractId::from_raw, "contract"))
                .transpose()?;
            let events = store
                .list_activity(contract_id)
                .map_err(|err| CliError::new(format!("failed to list activity: {err}")))?;
            write_json(&events)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Dispatches authority subcommands.
fn command_authority(config_path: Option<&Path>, command: AuthorityCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    match command {
        AuthorityCommand::Certificates(command) => {
            let Some(http) = config.signing.http.clone() else {
                return Err(CliError::new("no signing authority configured under [signing.http]"));
            };
            let credential: SigningCredential =
                read_json(&command.credential, MAX_REQUEST_BYTES, "credential")?;
            let authority = HttpSigningAuthority::new(http).map_err(|err| {
                CliError::new(format!("failed to configure signing authority: {err}"))
            })?;
            let certificates = authority
                .list_certificates(&credential)
                .map_err(|err| CliError::new(format!("certificate listing failed: {err}")))?;
            write_json(&certificates)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Dispatches config subcommands.
fn command_config(config_path: Option<&Path>, command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check => {
            let config = load_config(config_path)?;
            let source = config
                .source
                .as_ref()
                .map_or_else(|| "built-in defaults".to_string(), |path| path.display().to_string());
            write_stdout_line(&format!("config ok: {source}"))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a bounded utf-8 text file.
fn read_text(path: &Path, max_bytes: usize, kind: &str) -> CliResult<String> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| read_error(path, kind, &err))?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{kind} file {} is not utf-8", path.display())))
}

/// Reads and parses a bounded JSON file.
fn read_json<T: DeserializeOwned>(path: &Path, max_bytes: usize, kind: &str) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| read_error(path, kind, &err))?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("failed to parse {kind} file {}: {err}", path.display()))
    })
}

/// Formats a bounded read failure.
fn read_error(path: &Path, kind: &str, error: &ReadLimitError) -> CliError {
    match error {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {kind} file {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{kind} file {} exceeds size limit ({size} > {limit} bytes)",
            path.display()
        )),
    }
}

/// Converts a raw identifier argument, rejecting zero.
fn parse_id<T>(raw: u64, build: fn(u64) -> Option<T>, kind: &str) -> CliResult<T> {
    build(raw).ok_or_else(|| CliError::new(format!("{kind} id must be >= 1")))
}

/// Parses a contract category label for clap.
fn parse_category(value: &str) -> Result<ContractCategory, String> {
    value.parse::<ContractCategory>().map_err(|err| err.to_string())
}

/// Parses a setting kind label for clap.
fn parse_setting_kind(value: &str) -> Result<SettingKind, String> {
    value.parse::<SettingKind>().map_err(|err| err.to_string())
}

/// Formats a hash digest as `algorithm:hex`.
fn format_hash_digest(digest: &HashDigest) -> String {
    format!("{}:{}", digest.algorithm.label(), digest.value)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints the generated help text.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(&help).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a value to stdout as canonical JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
