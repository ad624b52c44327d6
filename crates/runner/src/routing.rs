//! Rule tier for the command-line driver
//!
//! Pulls the identity document out of free text and tags each message with a
//! rule-tier intention before it reaches the dispatcher.

use once_cell::sync::Lazy;
use regex::Regex;

use collections_flow_agent::{BuiltinCondition, TierDecision};
use collections_flow_core::FlowContext;

/// Context key the customer lookup reads
pub const DOCUMENT_KEY: &str = "documento";

/// Plain (`93388915`) or dotted (`93.388.915`) document numbers
static DOCUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}(?:\.\d{3}){2,3}|\d{7,10})\b").expect("document pattern is valid")
});

/// First document number in `message`, without separators
pub fn extract_document(message: &str) -> Option<String> {
    DOCUMENT
        .find(message)
        .map(|m| m.as_str().chars().filter(|c| c.is_ascii_digit()).collect())
        .filter(|digits: &String| (7..=10).contains(&digits.len()))
}

/// Rule-tier decision for one inbound message
pub fn route_message(message: &str) -> TierDecision {
    if extract_document(message).is_some() {
        return TierDecision::rule("entregar_documento");
    }

    let ctx = FlowContext::with_message(message);
    let intention = if BuiltinCondition::ShowsFrustration.evaluate(&ctx) {
        "objecion"
    } else if BuiltinCondition::PlanSelected.evaluate(&ctx) {
        "seleccionar_plan"
    } else {
        "conversacion"
    };
    TierDecision::rule(intention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collections_flow_core::DecisionTier;

    #[test]
    fn test_extract_document() {
        assert_eq!(
            extract_document("mi cédula es 93388915").as_deref(),
            Some("93388915")
        );
        assert_eq!(
            extract_document("es 1.020.304.050, gracias").as_deref(),
            Some("1020304050")
        );
        assert_eq!(extract_document("93.388.915").as_deref(), Some("93388915"));
        assert_eq!(extract_document("tengo 123456"), None);
        assert_eq!(extract_document("12345678901"), None);
        assert_eq!(extract_document("hola"), None);
    }

    #[test]
    fn test_route_message() {
        assert_eq!(
            route_message("93388915").intention.as_deref(),
            Some("entregar_documento")
        );
        assert_eq!(
            route_message("no puedo pagar eso").intention.as_deref(),
            Some("objecion")
        );
        assert_eq!(
            route_message("me sirve el plan de cuotas").intention.as_deref(),
            Some("seleccionar_plan")
        );

        let decision = route_message("buenas tardes");
        assert_eq!(decision.tier, DecisionTier::Rule);
        assert_eq!(decision.intention.as_deref(), Some("conversacion"));
    }
}
