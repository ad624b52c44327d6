//! Built-in action handlers

mod contact;
mod payment;
mod query;
mod template;

pub use contact::{EscalateSupervisorAction, ScheduleReminderAction, VerifyContactAction};
pub use payment::{CreatePaymentPlansAction, GenerateProposalAction, DEFAULT_PLAN_BALANCE};
pub use query::{QueryBackend, RunQueryAction, StaticQuery, StaticQueryBackend};
pub use template::{render_template, SendTemplateAction};
