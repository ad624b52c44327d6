//! Payment plan actions
//!
//! Both handlers derive amounts from the `saldo` context field, which may be
//! a number or a numeric string.

use async_trait::async_trait;
use serde_json::{json, Value};

use collections_flow_core::{ActionError, ContextDelta, FlowContext};

use crate::registry::{ActionHandler, ActionKind};

/// Balance assumed by `crear_planes_pago` when the context has none
pub const DEFAULT_PLAN_BALANCE: f64 = 15000.0;

/// Discount offered on a single payment
const SINGLE_PAYMENT_DISCOUNT: f64 = 0.30;

/// `saldo` from the context; `None` when present but not numeric
fn balance(context: &FlowContext, fallback: f64) -> Option<f64> {
    match context.get("saldo") {
        None | Some(Value::Null) => Some(fallback),
        Some(_) => context.get_f64("saldo").filter(|s| s.is_finite()),
    }
}

/// Rounds to cents for presentation
fn money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Builds the three standard plans offered to a debtor
pub struct CreatePaymentPlansAction;

impl CreatePaymentPlansAction {
    pub fn new() -> Self {
        Self
    }

    fn plans(saldo: f64) -> Value {
        let discount_pct = (SINGLE_PAYMENT_DISCOUNT * 100.0).round() as u32;
        json!({
            "plan_1": {
                "tipo": "Pago único con descuento",
                "monto": money(saldo * (1.0 - SINGLE_PAYMENT_DISCOUNT)),
                "descuento": format!("{}%", discount_pct),
                "cuotas": 1
            },
            "plan_2": {
                "tipo": "Plan en 2 cuotas sin interés",
                "monto": money(saldo),
                "cuota": money(saldo / 2.0),
                "cuotas": 2
            },
            "plan_3": {
                "tipo": "Plan en 6 cuotas",
                "monto": money(saldo),
                "cuota": money(saldo / 6.0),
                "cuotas": 6
            }
        })
    }
}

impl Default for CreatePaymentPlansAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for CreatePaymentPlansAction {
    fn kind(&self) -> ActionKind {
        ActionKind::CreatePaymentPlans
    }

    async fn run(&self, _payload: &Value, context: &FlowContext) -> Result<ContextDelta, ActionError> {
        let saldo = balance(context, DEFAULT_PLAN_BALANCE)
            .ok_or_else(|| ActionError::invalid_payload("crear_planes_pago", "saldo is not numeric"))?;

        tracing::debug!(saldo, "Creating payment plans");

        let mut delta = ContextDelta::new();
        delta.insert("planes_creados".to_string(), Self::plans(saldo));
        delta.insert("saldo_original".to_string(), json!(saldo));
        Ok(delta)
    }
}

/// Computes a negotiation proposal from the outstanding balance
pub struct GenerateProposalAction;

impl GenerateProposalAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenerateProposalAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for GenerateProposalAction {
    fn kind(&self) -> ActionKind {
        ActionKind::GenerateProposal
    }

    async fn run(&self, _payload: &Value, context: &FlowContext) -> Result<ContextDelta, ActionError> {
        let saldo = balance(context, 0.0)
            .ok_or_else(|| ActionError::invalid_payload("generar_propuesta", "saldo is not numeric"))?;

        let propuesta = json!({
            "pago_unico": money(saldo * (1.0 - SINGLE_PAYMENT_DISCOUNT)),
            "plan_2_cuotas": money(saldo * 0.5),
            "plan_6_cuotas": money(saldo / 6.0),
            "descuento_maximo": money(saldo * SINGLE_PAYMENT_DISCOUNT)
        });

        let mut delta = ContextDelta::new();
        delta.insert("propuesta".to_string(), propuesta);
        delta.insert("saldo_original".to_string(), json!(saldo));
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plans_from_balance() {
        let ctx = FlowContext::new().with("saldo", 12000);
        let delta = CreatePaymentPlansAction::new()
            .run(&Value::Null, &ctx)
            .await
            .unwrap();

        let plans = &delta["planes_creados"];
        assert_eq!(plans["plan_1"]["monto"], json!(8400.0));
        assert_eq!(plans["plan_1"]["descuento"], json!("30%"));
        assert_eq!(plans["plan_2"]["cuota"], json!(6000.0));
        assert_eq!(plans["plan_3"]["cuota"], json!(2000.0));
        assert_eq!(plans["plan_3"]["cuotas"], json!(6));
        assert_eq!(delta["saldo_original"], json!(12000.0));
    }

    #[tokio::test]
    async fn test_plans_default_balance() {
        let delta = CreatePaymentPlansAction::new()
            .run(&Value::Null, &FlowContext::new())
            .await
            .unwrap();
        assert_eq!(delta["saldo_original"], json!(DEFAULT_PLAN_BALANCE));
        assert_eq!(delta["planes_creados"]["plan_2"]["cuota"], json!(7500.0));
    }

    #[tokio::test]
    async fn test_plans_reject_non_numeric_balance() {
        let ctx = FlowContext::new().with("saldo", "mucho");
        let err = CreatePaymentPlansAction::new()
            .run(&Value::Null, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn test_proposal_amounts() {
        let ctx = FlowContext::new().with("saldo", "3000");
        let delta = GenerateProposalAction::new()
            .run(&Value::Null, &ctx)
            .await
            .unwrap();

        let p = &delta["propuesta"];
        assert_eq!(p["pago_unico"], json!(2100.0));
        assert_eq!(p["plan_2_cuotas"], json!(1500.0));
        assert_eq!(p["plan_6_cuotas"], json!(500.0));
        assert_eq!(p["descuento_maximo"], json!(900.0));
    }
}
