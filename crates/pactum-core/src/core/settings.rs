// crates/pactum-core/src/core/settings.rs
// ============================================================================
// Module: Pactum System Settings
// Description: Typed key/value settings with declared value kinds.
// Purpose: Decode and encode stored setting text according to its kind.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Settings are stored as text plus a declared kind. Decoding is lenient for
//! empty values (numbers become `0`, booleans become `false`, structured
//! values become `null`) and strict otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::catalog::ParseEnumError;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Setting Kind
// ============================================================================

/// Declared value kind of a setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    /// Free text.
    #[default]
    String,
    /// Floating-point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Structured JSON value.
    Json,
}

impl SettingKind {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

impl FromStr for SettingKind {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "json" => Ok(Self::Json),
            _ => Err(ParseEnumError::new("setting kind", value)),
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Setting Values
// ============================================================================

/// Decoded setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Text value.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Structured value.
    Json(Value),
}

impl SettingValue {
    /// Returns the kind this value encodes as.
    #[must_use]
    pub const fn kind(&self) -> SettingKind {
        match self {
            Self::Text(_) => SettingKind::String,
            Self::Number(_) => SettingKind::Number,
            Self::Boolean(_) => SettingKind::Boolean,
            Self::Json(_) => SettingKind::Json,
        }
    }

    /// Encodes the value as stored text.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Boolean(flag) => flag.to_string(),
            Self::Json(value) => value.to_string(),
        }
    }

    /// Parses caller text as a value of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError`] when the text does not parse as `kind`.
    pub fn parse(kind: SettingKind, text: &str) -> Result<Self, SettingError> {
        decode_raw(kind, text)
    }
}

/// Setting decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    /// Stored number text is not a number.
    #[error("setting value {0:?} is not a number")]
    InvalidNumber(String),
    /// Stored JSON text does not parse.
    #[error("setting value is not valid json: {0}")]
    InvalidJson(String),
}

// ============================================================================
// SECTION: System Setting
// ============================================================================

/// Stored setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSetting {
    /// Unique key.
    pub key: String,
    /// Stored text.
    pub raw_value: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Declared kind.
    pub kind: SettingKind,
    /// Last update instant.
    pub updated_at: Timestamp,
}

impl SystemSetting {
    /// Builds a setting row from a typed value.
    #[must_use]
    pub fn from_value(
        key: impl Into<String>,
        value: &SettingValue,
        description: Option<String>,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            key: key.into(),
            raw_value: value.encode(),
            description,
            kind: value.kind(),
            updated_at,
        }
    }

    /// Decodes the stored text according to the declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError`] when non-empty text fails to parse.
    pub fn decode(&self) -> Result<SettingValue, SettingError> {
        decode_raw(self.kind, &self.raw_value)
    }
}

/// Decodes raw setting text for a kind.
fn decode_raw(kind: SettingKind, raw: &str) -> Result<SettingValue, SettingError> {
    match kind {
        SettingKind::String => Ok(SettingValue::Text(raw.to_string())),
        SettingKind::Number if raw.is_empty() => Ok(SettingValue::Number(0.0)),
        SettingKind::Number => raw
            .trim()
            .parse::<f64>()
            .map(SettingValue::Number)
            .map_err(|_| SettingError::InvalidNumber(raw.to_string())),
        SettingKind::Boolean => Ok(SettingValue::Boolean(raw.eq_ignore_ascii_case("true"))),
        SettingKind::Json if raw.is_empty() => Ok(SettingValue::Json(Value::Null)),
        SettingKind::Json => serde_json::from_str(raw)
            .map(SettingValue::Json)
            .map_err(|err| SettingError::InvalidJson(err.to_string())),
    }
}
