//! Flow actions
//!
//! Implements the engine's `ActionExecutor` seam with an enum-tagged
//! registry. Built-in handlers cover the collections workflow: templated
//! replies, customer lookups, payment plans, contact checks, reminders and
//! supervisor escalation.

pub mod actions;
pub mod registry;

pub use actions::{
    render_template, CreatePaymentPlansAction, EscalateSupervisorAction, GenerateProposalAction,
    QueryBackend, RunQueryAction, ScheduleReminderAction, SendTemplateAction, StaticQuery,
    StaticQueryBackend, VerifyContactAction, DEFAULT_PLAN_BALANCE,
};
pub use registry::{
    create_default_registry, ActionHandler, ActionKind, ActionRegistry,
    DEFAULT_ACTION_TIMEOUT_SECS,
};
