// crates/pactum-core/tests/render.rs
// ============================================================================
// Module: Document Renderer Tests
// Description: Token substitution, pass-through, and determinism checks.
// Purpose: Pin the flat substitution semantics of the renderer.
// Dependencies: pactum-core, proptest, serde_json, time
// ============================================================================
//! ## Overview
//! Exercises the standard token table, unknown-token pass-through, the
//! no-rescan rule, clock tokens and property-based determinism.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use pactum_core::DataBag;
use pactum_core::DocumentRenderer;
use pactum_core::TokenSource;
use pactum_core::TokenTable;
use pactum_core::TokenTableError;
use proptest::prelude::*;
use serde_json::json;
use time::OffsetDateTime;
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2024-12-31 23:59:58 UTC);

fn render(body: &str, data: &DataBag) -> String {
    DocumentRenderer::default().render(body, data, NOW)
}

#[test]
fn substitutes_fields_from_data_bag() {
    let data = DataBag::from_value(&json!({
        "contratante": {"nome_completo": "Ana"},
        "contrato": {"valor": "100"}
    }));
    assert_eq!(render("Hello {{CONTRATANTE_NOME}}, total {{VALOR}}", &data), "Hello Ana, total 100");
}

#[test]
fn unknown_tokens_pass_through_verbatim() {
    let data = DataBag::new();
    assert_eq!(render("x {{NOT_A_REAL_TOKEN}} y", &data), "x {{NOT_A_REAL_TOKEN}} y");
}

#[test]
fn empty_data_bag_renders_every_field_token_empty() {
    let table = TokenTable::standard();
    let body: String = table
        .iter()
        .filter(|(_, source)| matches!(source, TokenSource::Field { .. }))
        .map(|(token, _)| format!("[{token}]"))
        .collect();
    let rendered = render(&body, &DataBag::new());
    assert_eq!(rendered, "[]".repeat(19));
}

#[test]
fn clock_tokens_use_one_reading() {
    let rendered = render("{{DATA_ATUAL}} {{HORA_ATUAL}}", &DataBag::new());
    assert_eq!(rendered, "31/12/2024 23:59:58");
}

#[test]
fn substituted_values_are_not_rescanned() {
    let data = DataBag::new().with("contratante", "nome_completo", "{{VALOR}}").with(
        "contrato",
        "valor",
        "999",
    );
    assert_eq!(render("{{CONTRATANTE_NOME}}|{{VALOR}}", &data), "{{VALOR}}|999");
}

#[test]
fn matching_is_case_sensitive_and_brace_exact() {
    let data = DataBag::new().with("contrato", "valor", "10");
    assert_eq!(render("{{valor}} { {VALOR}} {{ VALOR }}", &data), "{{valor}} { {VALOR}} {{ VALOR }}");
    assert_eq!(render("{{{VALOR}}}", &data), "{10}");
}

#[test]
fn unterminated_token_is_left_alone() {
    let data = DataBag::new().with("contrato", "valor", "10");
    assert_eq!(render("total {{VALOR", &data), "total {{VALOR");
}

#[test]
fn non_string_leaves_are_stringified() {
    let data = DataBag::from_value(&json!({
        "contrato": {"valor": 1500.5, "data_inicio": true, "data_fim": null, "clausulas_especiais": ["a", 1]}
    }));
    assert_eq!(
        render("{{VALOR}}|{{DATA_INICIO}}|{{DATA_FIM}}|{{CLAUSULAS_ESPECIAIS}}", &data),
        "1500.5|true||[\"a\",1]"
    );
}

#[test]
fn custom_token_tables_are_honored() {
    let table = TokenTable::new([("{{CIDADE}}", TokenSource::field("contrato", "cidade"))]).unwrap();
    let renderer = DocumentRenderer::new(table);
    let data = DataBag::new().with("contrato", "cidade", "Recife").with("contrato", "valor", "1");
    assert_eq!(renderer.render("{{CIDADE}} {{VALOR}}", &data, NOW), "Recife {{VALOR}}");
}

#[test]
fn malformed_tokens_are_rejected() {
    for token in ["CIDADE", "{{}}", "{{CI DADE}}", "{CIDADE}", "{{CIDADE}"] {
        let err = TokenTable::new([(token, TokenSource::CurrentDate)]).unwrap_err();
        assert_eq!(err, TokenTableError::InvalidToken(token.to_string()));
    }
}

#[test]
fn multibyte_text_survives_rendering() {
    let data = DataBag::new().with("contratante", "nome_completo", "João Conceição");
    assert_eq!(render("«{{CONTRATANTE_NOME}}» ção {{", &data), "«João Conceição» ção {{");
}

proptest! {
    #[test]
    fn rendering_is_deterministic(body in "\\PC{0,256}", value in "\\PC{0,32}") {
        let data = DataBag::new().with("contrato", "valor", value);
        prop_assert_eq!(render(&body, &data), render(&body, &data));
    }

    #[test]
    fn text_without_known_tokens_is_unchanged(body in "[^{]{0,64}(\\{\\{[a-z]{1,8}\\}\\})?[^{]{0,64}") {
        prop_assert_eq!(render(&body, &DataBag::new()), body);
    }
}
