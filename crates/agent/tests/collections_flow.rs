//! End-to-end runs of the shipped collections flow

use std::sync::Arc;

use collections_flow_agent::{
    ConditionEvaluator, Conversation, FlowDispatcher, FlowEngine, InMemoryFlowStore, TierDecision,
};
use collections_flow_config::FlowDefinitionFile;
use collections_flow_core::{DecisionTier, FlowError};
use collections_flow_monitor::SystemMonitor;
use collections_flow_tools::{create_default_registry, StaticQueryBackend};

const FLOW_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/flows/collections.yaml");
const DEMO_DATA_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/demo_data.yaml");

fn setup() -> (Arc<FlowEngine>, Arc<InMemoryFlowStore>) {
    let defs = FlowDefinitionFile::load(FLOW_PATH).unwrap();
    let store = Arc::new(InMemoryFlowStore::from_definitions(&defs).unwrap());

    let backend = StaticQueryBackend::from_yaml_file(DEMO_DATA_PATH).unwrap();
    let registry = create_default_registry(Some(Arc::new(backend)));

    let mut conditions = ConditionEvaluator::new();
    conditions.register_flag("cliente_encontrado");

    let engine = FlowEngine::new(store.clone(), Arc::new(registry), Arc::new(conditions));
    (Arc::new(engine), store)
}

async fn say(engine: &FlowEngine, conv: &mut Conversation, message: &str) -> String {
    conv.handle_message(engine, message).await.unwrap();
    conv.current_state().to_string()
}

#[test]
fn test_shipped_flow_is_fully_resolvable() {
    let (engine, store) = setup();
    for expr in store.condition_expressions() {
        assert!(engine.conditions().is_known(expr), "unresolvable condition {}", expr);
    }

    let registry = create_default_registry(None);
    for action_type in store.action_types() {
        assert!(registry.has(action_type), "unregistered action {}", action_type);
    }
    assert_eq!(engine.initial_state(), "start");
}

#[tokio::test]
async fn test_agreement_path() {
    let (engine, _) = setup();
    let mut conv = Conversation::start(engine.initial_state());

    assert_eq!(say(&engine, &mut conv, "hola").await, "validar_documento");
    assert!(conv
        .context()
        .get_str("respuesta")
        .unwrap()
        .contains("cédula"));

    conv.context_mut().insert("documento", "93388915");
    assert_eq!(
        say(&engine, &mut conv, "mi cédula es 93388915").await,
        "informar_deuda"
    );
    assert!(conv.context().is_truthy("cliente_encontrado"));
    assert_eq!(conv.context().get_str("nombre"), Some("Ana Martínez"));

    assert_eq!(
        say(&engine, &mut conv, "ok, cuénteme").await,
        "proponer_planes_pago"
    );
    let plans = conv.context().get("planes_creados").unwrap();
    assert_eq!(plans["plan_1"]["monto"], serde_json::json!(1750000.0));

    assert_eq!(say(&engine, &mut conv, "me sirve el plan 1").await, "generar_acuerdo");
    assert_eq!(conv.context().get_str("canal"), Some("whatsapp"));

    assert_eq!(say(&engine, &mut conv, "gracias").await, "fin");
    assert_eq!(
        conv.context().get_str("respuesta"),
        Some("Gracias Ana Martínez, su acuerdo quedó registrado. Le enviaremos un recordatorio por whatsapp.")
    );

    let err = conv.handle_message(&engine, "adiós").await.unwrap_err();
    assert!(matches!(err, FlowError::NoApplicableTransition { .. }));
    assert_eq!(conv.history().len(), 5);
}

#[tokio::test]
async fn test_returning_frustrated_customer_is_escalated() {
    let (engine, _) = setup();
    let mut conv = Conversation::start("start");

    say(&engine, &mut conv, "buenas").await;
    conv.context_mut().insert("documento", "1020304050");
    say(&engine, &mut conv, "1020304050").await;
    assert_eq!(say(&engine, &mut conv, "ok").await, "proponer_planes_pago");

    assert_eq!(
        say(&engine, &mut conv, "no puedo pagar eso").await,
        "escalamiento"
    );
    assert_eq!(conv.context().get_str("supervisor_asignado"), Some("Supervisor_001"));

    assert_eq!(say(&engine, &mut conv, "bueno").await, "fin");
    assert!(conv
        .context()
        .get_str("respuesta")
        .unwrap()
        .contains("Supervisor_001"));
}

#[tokio::test]
async fn test_unknown_customer_is_asked_again() {
    let (engine, _) = setup();
    let mut conv = Conversation::start("start");

    say(&engine, &mut conv, "hola").await;
    conv.context_mut().insert("documento", "5555555");
    assert_eq!(say(&engine, &mut conv, "5555555").await, "informar_deuda");
    assert!(!conv.context().is_truthy("cliente_encontrado"));

    assert_eq!(say(&engine, &mut conv, "¿entonces?").await, "validar_documento");
}

#[tokio::test]
async fn test_dispatch_records_every_message() {
    let (engine, _) = setup();
    let monitor = Arc::new(SystemMonitor::default());
    let dispatcher = FlowDispatcher::new(engine.clone(), monitor.clone());
    let mut conv = Conversation::start(engine.initial_state());

    let rule = TierDecision::rule("saludo");
    dispatcher.dispatch(&mut conv, "hola", &rule).await.unwrap();

    let ml = TierDecision::new(DecisionTier::Ml)
        .with_intention("entregar_documento")
        .with_confidence(0.75);
    conv.context_mut().insert("documento", "93388915");
    dispatcher.dispatch(&mut conv, "93388915", &ml).await.unwrap();

    let summary = monitor.get_summary();
    assert_eq!(summary.total_requests, 2);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.tier(DecisionTier::Rule).unwrap().hits, 1);
    assert_eq!(summary.tier(DecisionTier::Ml).unwrap().hits, 1);
    assert_eq!(conv.context().get_str("intencion"), Some("entregar_documento"));
}
