//! Persona registry construction and lookup.

use std::collections::BTreeMap;

use mailvoice::persona::{Persona, PersonaError, PersonaOverride, PersonaRegistry};

fn full_override(collection: &str) -> PersonaOverride {
    PersonaOverride {
        collection: Some(collection.to_owned()),
        author: Some("Sam".to_owned()),
        voice: Some("Sam's sales style".to_owned()),
        tone: Some("upbeat".to_owned()),
        system_instructions: Some("You draft sales replies.".to_owned()),
        style_directives: Some(vec!["Lead with the benefit".to_owned()]),
        ..PersonaOverride::default()
    }
}

#[test]
fn builtin_registry_has_personal_and_admin() {
    let registry = PersonaRegistry::builtin();
    assert_eq!(registry.ids(), vec!["admin", "personal"]);
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.collections(),
        vec!["admin-team-emails", "jordan-personal-emails"]
    );

    match registry.get("personal") {
        Ok(persona) => {
            assert_eq!(persona.author, "Jordan");
            assert!((persona.temperature - 0.7).abs() < f32::EPSILON);
            assert_eq!(persona.max_output_tokens, 400);
            assert_eq!(persona.style_directives.len(), 6);
        }
        Err(err) => panic!("personal should exist: {err}"),
    }
    match registry.get("admin") {
        Ok(persona) => assert!((persona.temperature - 0.6).abs() < f32::EPSILON),
        Err(err) => panic!("admin should exist: {err}"),
    }
}

#[test]
fn unknown_persona_is_reported() {
    assert_eq!(
        PersonaRegistry::builtin().get("sales"),
        Err(PersonaError::Unknown("sales".to_owned()))
    );
}

#[test]
fn override_patches_builtin_fields_only() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "admin".to_owned(),
        PersonaOverride {
            collection: Some("ops-emails".to_owned()),
            temperature: Some(0.2),
            ..PersonaOverride::default()
        },
    );

    let registry = match PersonaRegistry::from_overrides(&overrides) {
        Ok(registry) => registry,
        Err(err) => panic!("override should apply: {err}"),
    };
    let admin = match registry.get("admin") {
        Ok(persona) => persona,
        Err(err) => panic!("admin should exist: {err}"),
    };
    assert_eq!(admin.collection, "ops-emails");
    assert!((admin.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(admin.tone, Persona::admin().tone);
    assert_eq!(admin.style_directives, Persona::admin().style_directives);
}

#[test]
fn override_adds_new_persona_with_defaults() {
    let mut overrides = BTreeMap::new();
    overrides.insert("sales".to_owned(), full_override("sales-emails"));

    let registry = match PersonaRegistry::from_overrides(&overrides) {
        Ok(registry) => registry,
        Err(err) => panic!("new persona should be accepted: {err}"),
    };
    assert_eq!(registry.len(), 3);
    match registry.get("sales") {
        Ok(persona) => {
            assert_eq!(persona.collection, "sales-emails");
            assert_eq!(persona.style_directives, vec!["Lead with the benefit".to_owned()]);
            assert_eq!(persona.style_label, "Sam's sales style");
            assert_eq!(persona.max_output_tokens, 400);
        }
        Err(err) => panic!("sales should exist: {err}"),
    }
}

#[test]
fn new_persona_missing_field_is_rejected() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "sales".to_owned(),
        PersonaOverride {
            collection: Some("sales-emails".to_owned()),
            ..PersonaOverride::default()
        },
    );

    match PersonaRegistry::from_overrides(&overrides) {
        Err(PersonaError::MissingField { id, field }) => {
            assert_eq!(id, "sales");
            assert_eq!(field, "author");
        }
        other => panic!("expected missing field, got {other:?}"),
    }
}

#[test]
fn new_persona_without_directives_is_rejected() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "support".to_owned(),
        PersonaOverride {
            style_directives: None,
            ..full_override("support-emails")
        },
    );

    match PersonaRegistry::from_overrides(&overrides) {
        Err(PersonaError::MissingField { id, field }) => {
            assert_eq!(id, "support");
            assert_eq!(field, "style_directives");
        }
        other => panic!("expected missing style_directives, got {other:?}"),
    }
}

#[test]
fn empty_directive_list_is_rejected() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "support".to_owned(),
        PersonaOverride {
            style_directives: Some(Vec::new()),
            ..full_override("support-emails")
        },
    );
    match PersonaRegistry::from_overrides(&overrides) {
        Err(PersonaError::Invalid { id, reason }) => {
            assert_eq!(id, "support");
            assert!(reason.contains("style_directives"));
        }
        other => panic!("expected invalid persona, got {other:?}"),
    }

    let mut blank = Persona::admin();
    blank.style_directives = vec!["  ".to_owned()];
    assert!(PersonaRegistry::from_personas(vec![blank]).is_err());
}

#[test]
fn builtin_checklist_headings_are_short_style_names() {
    assert_eq!(Persona::personal().style_label, "Jordan's personal style");
    assert_eq!(Persona::admin().style_label, "admin team style");
}

#[test]
fn invalid_ids_and_ranges_are_rejected() {
    let mut overrides = BTreeMap::new();
    overrides.insert("Sales Team".to_owned(), full_override("sales-emails"));
    match PersonaRegistry::from_overrides(&overrides) {
        Err(PersonaError::InvalidId(id)) => assert_eq!(id, "Sales Team"),
        other => panic!("expected invalid id, got {other:?}"),
    }

    let mut hot = Persona::personal();
    hot.temperature = 2.5;
    match PersonaRegistry::from_personas(vec![hot]) {
        Err(PersonaError::Invalid { id, reason }) => {
            assert_eq!(id, "personal");
            assert!(reason.contains("temperature"));
        }
        other => panic!("expected invalid temperature, got {other:?}"),
    }

    let mut mute = Persona::admin();
    mute.max_output_tokens = 0;
    assert!(PersonaRegistry::from_personas(vec![mute]).is_err());
}

#[test]
fn shared_collections_are_listed_once() {
    let mut second = Persona::personal();
    second.id = "personal-short".to_owned();
    second.max_output_tokens = 150;

    let registry = match PersonaRegistry::from_personas(vec![Persona::personal(), second]) {
        Ok(registry) => registry,
        Err(err) => panic!("registry should build: {err}"),
    };
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.collections(), vec!["jordan-personal-emails"]);
}
