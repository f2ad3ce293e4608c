// crates/pactum-core/src/runtime/validation.rs
// ============================================================================
// Module: Pactum Input Validation
// Description: Required-field checks and contract creation validation.
// Purpose: Reject incomplete input before anything is rendered or stored.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Required fields are checked against the template's declared schema before
//! rendering. In [`ValidationMode::Strict`] any missing or blank field fails
//! generation; in [`ValidationMode::Lenient`] the violations are returned for
//! the audit trail and rendering proceeds with empty substitutions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::catalog::FieldSchema;
use crate::core::contract::DataBag;
use crate::core::contract::FieldViolation;
use crate::core::contract::NewContract;
use crate::core::contract::ValidationError;

// ============================================================================
// SECTION: Validation Mode
// ============================================================================

/// Required-field enforcement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Missing required fields fail generation.
    #[default]
    Strict,
    /// Missing required fields are reported and generation proceeds.
    Lenient,
}

// ============================================================================
// SECTION: Required Fields
// ============================================================================

/// Lists required fields that are absent or blank in `data`.
#[must_use]
pub fn missing_required_fields(schema: &FieldSchema, data: &DataBag) -> Vec<FieldViolation> {
    schema
        .sections()
        .flat_map(|(section, fields)| {
            fields.iter().filter_map(move |field| {
                let present = data.get(section, field).is_some_and(|value| !value.trim().is_empty());
                (!present).then(|| FieldViolation {
                    path: format!("{section}.{field}"),
                    reason: "required field is missing".to_string(),
                })
            })
        })
        .collect()
}

/// Applies the mode to the required-field check.
///
/// # Errors
///
/// Returns [`ValidationError`] in strict mode when any field is missing.
pub fn check_required_fields(
    mode: ValidationMode,
    schema: &FieldSchema,
    data: &DataBag,
) -> Result<Vec<FieldViolation>, ValidationError> {
    let violations = missing_required_fields(schema, data);
    match mode {
        ValidationMode::Strict if !violations.is_empty() => Err(ValidationError {
            violations,
        }),
        _ => Ok(violations),
    }
}

// ============================================================================
// SECTION: Contract Creation
// ============================================================================

/// Validates the shape of a new contract request.
///
/// # Errors
///
/// Returns [`ValidationError`] listing every problem found.
pub fn validate_new_contract(contract: &NewContract) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    if contract.title.trim().is_empty() {
        violations.push(violation("title", "title must not be blank"));
    }
    match &contract.data {
        Value::Object(sections) => {
            for (section, fields) in sections {
                if !fields.is_object() {
                    violations.push(violation(&format!("data.{section}"), "section must be an object"));
                }
            }
        }
        _ => violations.push(violation("data", "data must be an object of sections")),
    }
    for (index, party) in contract.parties.iter().enumerate() {
        if party.identity.full_name.trim().is_empty() {
            violations.push(violation(&format!("parties[{index}].full_name"), "name is required"));
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            violations,
        })
    }
}

/// Builds a violation.
fn violation(path: &str, reason: &str) -> FieldViolation {
    FieldViolation {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
