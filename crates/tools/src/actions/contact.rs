//! Contact and follow-up actions

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use collections_flow_core::{ActionError, ContextDelta, FlowContext};

use crate::registry::{ActionHandler, ActionKind};

const MIN_PHONE_LEN: usize = 10;
const DEFAULT_CHANNEL: &str = "whatsapp";
const DEFAULT_REMINDER_DELAY_HOURS: i64 = 24;
const DEFAULT_SUPERVISOR: &str = "Supervisor_001";

/// Checks the phone and email held in the context
pub struct VerifyContactAction;

impl VerifyContactAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VerifyContactAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for VerifyContactAction {
    fn kind(&self) -> ActionKind {
        ActionKind::VerifyContact
    }

    async fn run(&self, _payload: &Value, context: &FlowContext) -> Result<ContextDelta, ActionError> {
        let phone_ok = context
            .get_str("telefono")
            .map(|t| t.trim().chars().count() >= MIN_PHONE_LEN)
            .unwrap_or(false);
        let email_ok = context
            .get_str("email")
            .map(|e| e.contains('@'))
            .unwrap_or(false);

        let mut delta = ContextDelta::new();
        delta.insert("telefono_valido".to_string(), json!(phone_ok));
        delta.insert("email_valido".to_string(), json!(email_ok));
        delta.insert("requiere_actualizacion".to_string(), json!(!(phone_ok && email_ok)));
        Ok(delta)
    }
}

/// Schedules a payment reminder on the customer's preferred channel
///
/// Payload: `{ delay_hours: 24 }`. Delivery is left to whoever consumes
/// `recordatorio_en`.
pub struct ScheduleReminderAction;

impl ScheduleReminderAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScheduleReminderAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for ScheduleReminderAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ScheduleReminder
    }

    async fn run(&self, payload: &Value, context: &FlowContext) -> Result<ContextDelta, ActionError> {
        let delay_hours = match payload.get("delay_hours") {
            None | Some(Value::Null) => DEFAULT_REMINDER_DELAY_HOURS,
            Some(v) => v
                .as_i64()
                .filter(|h| *h >= 0)
                .ok_or_else(|| {
                    ActionError::invalid_payload(
                        "enviar_recordatorio",
                        "delay_hours must be a non-negative integer",
                    )
                })?,
        };

        let channel = context
            .get_str("canal_preferido")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CHANNEL);
        let at = ChronoDuration::try_hours(delay_hours)
            .and_then(|delay| Utc::now().checked_add_signed(delay))
            .ok_or_else(|| {
                ActionError::invalid_payload(
                    "enviar_recordatorio",
                    format!("delay_hours {} is out of range", delay_hours),
                )
            })?;

        tracing::info!(channel, at = %at, "Reminder scheduled");

        let mut delta = ContextDelta::new();
        delta.insert("recordatorio_programado".to_string(), json!(true));
        delta.insert("canal".to_string(), json!(channel));
        delta.insert("recordatorio_en".to_string(), json!(at.to_rfc3339()));
        Ok(delta)
    }
}

/// Hands the conversation over to a human supervisor
pub struct EscalateSupervisorAction;

impl EscalateSupervisorAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EscalateSupervisorAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for EscalateSupervisorAction {
    fn kind(&self) -> ActionKind {
        ActionKind::EscalateSupervisor
    }

    async fn run(&self, payload: &Value, _context: &FlowContext) -> Result<ContextDelta, ActionError> {
        let supervisor = payload
            .get("supervisor")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SUPERVISOR);

        let escalation_id = format!(
            "ESC{}",
            &uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        );

        tracing::info!(supervisor, escalation_id = %escalation_id, "Conversation escalated");

        let mut delta = ContextDelta::new();
        delta.insert("escalado".to_string(), json!(true));
        delta.insert("supervisor_asignado".to_string(), json!(supervisor));
        delta.insert("escalamiento_id".to_string(), json!(escalation_id));
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn test_verify_contact() {
        let ctx = FlowContext::new()
            .with("telefono", "3001234567")
            .with("email", "ana@example.com");
        let delta = VerifyContactAction::new().run(&Value::Null, &ctx).await.unwrap();
        assert_eq!(delta["telefono_valido"], json!(true));
        assert_eq!(delta["email_valido"], json!(true));
        assert_eq!(delta["requiere_actualizacion"], json!(false));

        let ctx = FlowContext::new().with("telefono", "300123");
        let delta = VerifyContactAction::new().run(&Value::Null, &ctx).await.unwrap();
        assert_eq!(delta["telefono_valido"], json!(false));
        assert_eq!(delta["email_valido"], json!(false));
        assert_eq!(delta["requiere_actualizacion"], json!(true));
    }

    #[tokio::test]
    async fn test_reminder_channel_and_time() {
        let before = Utc::now();
        let ctx = FlowContext::new().with("canal_preferido", "sms");
        let delta = ScheduleReminderAction::new()
            .run(&json!({"delay_hours": 48}), &ctx)
            .await
            .unwrap();

        assert_eq!(delta["canal"], json!("sms"));
        assert_eq!(delta["recordatorio_programado"], json!(true));
        let at = DateTime::parse_from_rfc3339(delta["recordatorio_en"].as_str().unwrap()).unwrap();
        assert!(at.with_timezone(&Utc) >= before + ChronoDuration::hours(48));
    }

    #[tokio::test]
    async fn test_reminder_defaults_to_whatsapp() {
        let delta = ScheduleReminderAction::new()
            .run(&Value::Null, &FlowContext::new())
            .await
            .unwrap();
        assert_eq!(delta["canal"], json!("whatsapp"));

        let err = ScheduleReminderAction::new()
            .run(&json!({"delay_hours": -1}), &FlowContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn test_reminder_rejects_out_of_range_delay() {
        // beyond the duration range, then beyond the representable date range
        for hours in [4_000_000_000_000_000i64, 100_000_000_000] {
            let err = ScheduleReminderAction::new()
                .run(&json!({ "delay_hours": hours }), &FlowContext::new())
                .await
                .unwrap_err();
            assert!(
                matches!(err, ActionError::InvalidPayload { ref action, .. } if action == "enviar_recordatorio"),
                "delay_hours {} gave {:?}",
                hours,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_escalation() {
        let delta = EscalateSupervisorAction::new()
            .run(&Value::Null, &FlowContext::new())
            .await
            .unwrap();
        assert_eq!(delta["escalado"], json!(true));
        assert_eq!(delta["supervisor_asignado"], json!("Supervisor_001"));
        let id = delta["escalamiento_id"].as_str().unwrap();
        assert!(id.starts_with("ESC"));
        assert_eq!(id.len(), 11);
    }
}
