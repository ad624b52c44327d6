//! Wiring of the runner against the shipped configuration

use collections_flow_config::{RuntimeEnvironment, Settings};
use collections_flow_core::DecisionTier;
use collections_flow_runner::{extract_document, route_message, AppState, RunnerError, DOCUMENT_KEY};

const CONFIG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config");

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.engine.flow_definition_path = format!("{}/flows/collections.yaml", CONFIG_DIR);
    settings.engine.query_data_path = Some(format!("{}/demo_data.yaml", CONFIG_DIR));
    settings
}

const FLOW_WITH_UNKNOWN_CONDITION: &str = r#"
initial_state: start
states:
  - { id: 1, name: start }
  - { id: 2, name: fin }
conditions:
  - { id: 1, expression: cliente_feliz }
transitions:
  - { id: 1, state_id: 1, condition_id: 1, next_state_id: 2 }
"#;

#[test]
fn test_shipped_configuration_loads() {
    let state = AppState::from_settings(settings()).unwrap();
    assert_eq!(state.engine.initial_state(), "start");
    assert_eq!(state.store().state_count(), 8);

    let conv = state.start_conversation();
    assert_eq!(conv.current_state(), state.engine.initial_state());
    assert_eq!(conv.current_state(), "start");
}

#[test]
fn test_initial_state_must_match_flow() {
    let mut settings = settings();
    settings.engine.initial_state = "validar_documento".to_string();

    let err = AppState::from_settings(settings).err().unwrap();
    assert!(matches!(
        err,
        RunnerError::InitialStateMismatch { ref configured, ref flow }
            if configured == "validar_documento" && flow == "start"
    ));
}

#[test]
fn test_unknown_conditions_fail_only_in_strict_environments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.yaml");
    std::fs::write(&path, FLOW_WITH_UNKNOWN_CONDITION).unwrap();

    let mut settings = Settings::default();
    settings.engine.flow_definition_path = path.display().to_string();
    assert!(AppState::from_settings(settings.clone()).is_ok());

    settings.environment = RuntimeEnvironment::Production;
    let err = AppState::from_settings(settings).err().unwrap();
    assert!(matches!(err, RunnerError::UnknownConditions(ref names) if names == &["cliente_feliz"]));
}

#[tokio::test]
async fn test_scripted_conversation_through_dispatcher() {
    let state = AppState::from_settings(settings()).unwrap();
    let mut conv = state.start_conversation();

    for message in ["hola", "mi cédula es 93.388.915", "listo", "el plan 2 por favor", "gracias"] {
        if let Some(document) = extract_document(message) {
            conv.context_mut().insert(DOCUMENT_KEY, document);
        }
        state
            .dispatcher
            .dispatch(&mut conv, message, &route_message(message))
            .await
            .unwrap();
    }

    assert_eq!(conv.current_state(), "fin");
    assert_eq!(conv.context().get_str("nombre"), Some("Ana Martínez"));
    assert_eq!(conv.history().len(), 5);

    let summary = state.monitor.get_summary();
    assert_eq!(summary.total_requests, 5);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.tier(DecisionTier::Rule).unwrap().hits, 5);
}
