// crates/pactum-core/src/core/catalog.rs
// ============================================================================
// Module: Pactum Catalog Types
// Description: Contract types, versioned templates, and field schemas.
// Purpose: Describe what a contract may be generated from.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The catalog is read-only from the engine's perspective. A contract type is
//! a categorized display entry; a template belongs to exactly one type and
//! carries the body text plus the required and optional field schema for each
//! data section. Templates are versioned artifacts: a changed body is a new
//! row, never an edit, so contracts keep pointing at the exact text they were
//! generated from.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ContractTypeId;
use crate::core::identifiers::TemplateId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Enumeration Parsing
// ============================================================================

/// Error returned when a closed enumeration receives an unknown label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Enumeration name.
    pub kind: &'static str,
    /// Rejected label.
    pub value: String,
}

impl ParseEnumError {
    /// Creates a parse error for the named enumeration.
    #[must_use]
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Contract Category
// ============================================================================

/// Fixed category of a contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractCategory {
    /// Service provision.
    #[serde(alias = "servico")]
    Service,
    /// Dating agreement.
    #[serde(alias = "namoro")]
    Dating,
    /// Pet care.
    Pets,
    /// Residential rental.
    #[serde(alias = "aluguel")]
    Rental,
    /// Anything else.
    #[serde(alias = "outros")]
    Other,
}

impl ContractCategory {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Dating => "dating",
            Self::Pets => "pets",
            Self::Rental => "rental",
            Self::Other => "other",
        }
    }
}

impl FromStr for ContractCategory {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "service" | "servico" => Ok(Self::Service),
            "dating" | "namoro" => Ok(Self::Dating),
            "pets" => Ok(Self::Pets),
            "rental" | "aluguel" => Ok(Self::Rental),
            "other" | "outros" => Ok(Self::Other),
            _ => Err(ParseEnumError::new("contract category", value)),
        }
    }
}

impl fmt::Display for ContractCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Contract Type
// ============================================================================

/// Catalog entry grouping templates under a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractType {
    /// Type identifier.
    pub id: ContractTypeId,
    /// Display name.
    pub name: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Fixed category.
    pub category: ContractCategory,
    /// Logical deletion flag; inactive types accept no new contracts.
    pub active: bool,
    /// Creation instant.
    pub created_at: Timestamp,
}

/// Input for registering a contract type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContractType {
    /// Display name.
    pub name: String,
    /// Optional long description.
    #[serde(default)]
    pub description: Option<String>,
    /// Fixed category.
    pub category: ContractCategory,
}

// ============================================================================
// SECTION: Field Schema
// ============================================================================

/// Field names declared per data section (`contratante`, `contratado`, `contrato`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema(BTreeMap<String, Vec<String>>);

impl FieldSchema {
    /// Creates an empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a section with its field names, replacing any previous list.
    #[must_use]
    pub fn with_section<I, S>(mut self, section: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(section.to_string(), fields.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the declared fields for a section.
    #[must_use]
    pub fn fields(&self, section: &str) -> &[String] {
        self.0.get(section).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates sections in lexicographic order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(section, fields)| (section.as_str(), fields.as_slice()))
    }

    /// Returns true when no section declares any field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

// ============================================================================
// SECTION: Contract Template
// ============================================================================

/// Versioned template body with its field schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTemplate {
    /// Template identifier.
    pub id: TemplateId,
    /// Owning contract type.
    pub contract_type_id: ContractTypeId,
    /// Display name.
    pub name: String,
    /// Body text containing `{{TOKEN}}` placeholders.
    pub body: String,
    /// Fields that must be present before generation.
    pub required_fields: FieldSchema,
    /// Fields the template may use but does not require.
    pub optional_fields: FieldSchema,
    /// Version tag.
    pub version: String,
    /// Logical deletion flag.
    pub active: bool,
    /// Creation instant.
    pub created_at: Timestamp,
}

/// Input for publishing a template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    /// Owning contract type.
    pub contract_type_id: ContractTypeId,
    /// Display name.
    pub name: String,
    /// Body text containing `{{TOKEN}}` placeholders.
    pub body: String,
    /// Fields that must be present before generation.
    #[serde(default)]
    pub required_fields: FieldSchema,
    /// Fields the template may use but does not require.
    #[serde(default)]
    pub optional_fields: FieldSchema,
    /// Version tag.
    #[serde(default = "default_template_version")]
    pub version: String,
}

/// Default version tag for newly published templates.
fn default_template_version() -> String {
    "1.0".to_string()
}
