// crates/pactum-core/src/runtime/render.rs
// ============================================================================
// Module: Pactum Document Renderer
// Description: Flat token substitution over template bodies.
// Purpose: Produce final document text deterministically from a data bag.
// Dependencies: crate::core, time
// ============================================================================

//! ## Overview
//! Rendering is a single left-to-right scan. A token is the exact text
//! `{{NAME}}`; when a candidate is in the [`TokenTable`] it is replaced by its
//! resolved value, otherwise the braces are copied through unchanged.
//! Substituted values are never scanned again, so a value containing
//! `{{VALOR}}` stays literal.
//!
//! Both clock tokens come from the single instant handed to
//! [`DocumentRenderer::render`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::contract::DataBag;
use crate::core::contract::SECTION_HIRED_PARTY;
use crate::core::contract::SECTION_HIRING_PARTY;
use crate::core::contract::SECTION_TERMS;
use crate::core::time::format_date;
use crate::core::time::format_time;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Opening token delimiter.
const TOKEN_OPEN: &str = "{{";
/// Closing token delimiter.
const TOKEN_CLOSE: &str = "}}";

/// Standard field tokens as `(token, section, field)`.
const STANDARD_FIELD_TOKENS: &[(&str, &str, &str)] = &[
    ("{{CONTRATANTE_NOME}}", SECTION_HIRING_PARTY, "nome_completo"),
    ("{{CONTRATANTE_CPF}}", SECTION_HIRING_PARTY, "cpf"),
    ("{{CONTRATANTE_RG}}", SECTION_HIRING_PARTY, "rg"),
    ("{{CONTRATANTE_ENDERECO}}", SECTION_HIRING_PARTY, "endereco"),
    ("{{CONTRATANTE_TELEFONE}}", SECTION_HIRING_PARTY, "telefone"),
    ("{{CONTRATANTE_EMAIL}}", SECTION_HIRING_PARTY, "email"),
    ("{{CONTRATADO_NOME}}", SECTION_HIRED_PARTY, "nome_completo"),
    ("{{CONTRATADO_CPF}}", SECTION_HIRED_PARTY, "cpf"),
    ("{{CONTRATADO_RG}}", SECTION_HIRED_PARTY, "rg"),
    ("{{CONTRATADO_ENDERECO}}", SECTION_HIRED_PARTY, "endereco"),
    ("{{CONTRATADO_TELEFONE}}", SECTION_HIRED_PARTY, "telefone"),
    ("{{CONTRATADO_EMAIL}}", SECTION_HIRED_PARTY, "email"),
    ("{{CONTRATADO_PROFISSAO}}", SECTION_HIRED_PARTY, "profissao"),
    ("{{DATA_INICIO}}", SECTION_TERMS, "data_inicio"),
    ("{{DATA_FIM}}", SECTION_TERMS, "data_fim"),
    ("{{VALOR}}", SECTION_TERMS, "valor"),
    ("{{DESCRICAO_SERVICO}}", SECTION_TERMS, "descricao_servico"),
    ("{{FORMA_PAGAMENTO}}", SECTION_TERMS, "forma_pagamento"),
    ("{{CLAUSULAS_ESPECIAIS}}", SECTION_TERMS, "clausulas_especiais"),
];

/// Render-time date token.
pub const CURRENT_DATE_TOKEN: &str = "{{DATA_ATUAL}}";
/// Render-time time token.
pub const CURRENT_TIME_TOKEN: &str = "{{HORA_ATUAL}}";

// ============================================================================
// SECTION: Token Table
// ============================================================================

/// Where a token's replacement text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TokenSource {
    /// A data bag field; missing fields resolve to the empty string.
    Field {
        /// Data bag section.
        section: String,
        /// Field name within the section.
        field: String,
    },
    /// Render-time date as `DD/MM/YYYY`.
    CurrentDate,
    /// Render-time time as `HH:MM:SS`.
    CurrentTime,
}

impl TokenSource {
    /// Creates a field source.
    #[must_use]
    pub fn field(section: &str, field: &str) -> Self {
        Self::Field {
            section: section.to_string(),
            field: field.to_string(),
        }
    }
}

/// Token table construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenTableError {
    /// Token text is not of the form `{{NAME}}`.
    #[error("invalid token {0:?}: expected {{{{NAME}}}} with NAME of [A-Za-z0-9_]")]
    InvalidToken(String),
}

/// Immutable mapping from token text to its source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    /// Entries keyed by full token text including braces.
    entries: BTreeMap<String, TokenSource>,
}

impl TokenTable {
    /// Builds a table from explicit entries.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTableError::InvalidToken`] for malformed token text.
    pub fn new<I, S>(entries: I) -> Result<Self, TokenTableError>
    where
        I: IntoIterator<Item = (S, TokenSource)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (token, source) in entries {
            table = table.with_token(token, source)?;
        }
        Ok(table)
    }

    /// Returns the standard contract token set.
    #[must_use]
    pub fn standard() -> Self {
        let mut entries: BTreeMap<String, TokenSource> = STANDARD_FIELD_TOKENS
            .iter()
            .map(|(token, section, field)| ((*token).to_string(), TokenSource::field(section, field)))
            .collect();
        entries.insert(CURRENT_DATE_TOKEN.to_string(), TokenSource::CurrentDate);
        entries.insert(CURRENT_TIME_TOKEN.to_string(), TokenSource::CurrentTime);
        Self {
            entries,
        }
    }

    /// Returns a copy of the table with one entry added or replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTableError::InvalidToken`] for malformed token text.
    pub fn with_token(
        mut self,
        token: impl Into<String>,
        source: TokenSource,
    ) -> Result<Self, TokenTableError> {
        let token = token.into();
        if !is_valid_token(&token) {
            return Err(TokenTableError::InvalidToken(token));
        }
        self.entries.insert(token, source);
        Ok(self)
    }

    /// Looks up a full token.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&TokenSource> {
        self.entries.get(token)
    }

    /// Returns the number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates tokens in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenSource)> {
        self.entries.iter().map(|(token, source)| (token.as_str(), source))
    }
}

/// Returns true for `{{NAME}}` with a non-empty `[A-Za-z0-9_]` name.
fn is_valid_token(token: &str) -> bool {
    token
        .strip_prefix(TOKEN_OPEN)
        .and_then(|rest| rest.strip_suffix(TOKEN_CLOSE))
        .is_some_and(|name| {
            !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        })
}

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Pure template renderer bound to a token table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRenderer {
    /// Tokens recognized during rendering.
    tokens: TokenTable,
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(TokenTable::standard())
    }
}

impl DocumentRenderer {
    /// Creates a renderer for the given token table.
    #[must_use]
    pub const fn new(tokens: TokenTable) -> Self {
        Self {
            tokens,
        }
    }

    /// Returns the token table.
    #[must_use]
    pub const fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Renders `body` against `data`, resolving clock tokens from `now`.
    #[must_use]
    pub fn render(&self, body: &str, data: &DataBag, now: OffsetDateTime) -> String {
        let date = format_date(now);
        let time = format_time(now);
        let mut out = String::with_capacity(body.len());
        let mut rest = body;
        while let Some(start) = rest.find(TOKEN_OPEN) {
            out.push_str(&rest[.. start]);
            let candidate_region = &rest[start ..];
            let matched = candidate_region[TOKEN_OPEN.len() ..]
                .find(TOKEN_CLOSE)
                .map(|close| &candidate_region[.. TOKEN_OPEN.len() + close + TOKEN_CLOSE.len()])
                .and_then(|candidate| self.tokens.get(candidate).map(|source| (candidate, source)));
            match matched {
                Some((candidate, source)) => {
                    match source {
                        TokenSource::Field {
                            section,
                            field,
                        } => out.push_str(data.get(section, field).unwrap_or_default()),
                        TokenSource::CurrentDate => out.push_str(&date),
                        TokenSource::CurrentTime => out.push_str(&time),
                    }
                    rest = &candidate_region[candidate.len() ..];
                }
                None => {
                    // Emit one brace so a later `{{` inside this region can still match.
                    out.push('{');
                    rest = &candidate_region[1 ..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
