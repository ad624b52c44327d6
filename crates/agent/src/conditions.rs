//! Condition evaluation
//!
//! Condition expressions name predicates over the conversation context.
//! Built-in predicates are a closed enum; applications register extra ones
//! by name at startup. Expressions may combine names with `or`, `and` and a
//! `not` prefix, binding in that order from loosest to tightest:
//!
//! ```text
//! tiene_documento_valido and not primera_conversacion
//! cliente_selecciona_plan or saldo_mayor_1000
//! ```
//!
//! Evaluation never fails. An expression that is malformed or names an
//! unknown predicate is unresolvable and counts as `false` as a whole.
//! Predicate errors and panics are logged and count as `false`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use collections_flow_core::{ConditionError, FlowContext};

static DOCUMENT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{7,10}\b").expect("document pattern is valid"));

const PLAN_KEYWORDS: &[&str] = &[
    "1", "2", "3", "uno", "dos", "tres", "primero", "segundo", "tercero", "pago único", "cuotas",
    "plan",
];

const FRUSTRATION_KEYWORDS: &[&str] = &[
    "no puedo",
    "imposible",
    "no tengo",
    "dificil",
    "problema",
    "no entiendo",
    "complicado",
    "ayuda",
    "perdido",
    "confundido",
    "no sé",
];

const MIN_DOCUMENT_LEN: usize = 7;
const BALANCE_THRESHOLD: f64 = 1000.0;

/// Predicate registered at runtime
pub type Predicate = dyn Fn(&FlowContext) -> Result<bool, ConditionError> + Send + Sync;

/// Predicates shipped with the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCondition {
    /// `cliente_selecciona_plan`
    PlanSelected,
    /// `cliente_muestra_frustracion`
    ShowsFrustration,
    /// `tiene_documento_valido`
    HasValidDocument,
    /// `saldo_mayor_1000`
    BalanceAboveThreshold,
    /// `primera_conversacion`
    FirstConversation,
}

impl BuiltinCondition {
    pub const ALL: [BuiltinCondition; 5] = [
        Self::PlanSelected,
        Self::ShowsFrustration,
        Self::HasValidDocument,
        Self::BalanceAboveThreshold,
        Self::FirstConversation,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "cliente_selecciona_plan" => Some(Self::PlanSelected),
            "cliente_muestra_frustracion" => Some(Self::ShowsFrustration),
            "tiene_documento_valido" => Some(Self::HasValidDocument),
            "saldo_mayor_1000" => Some(Self::BalanceAboveThreshold),
            "primera_conversacion" => Some(Self::FirstConversation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PlanSelected => "cliente_selecciona_plan",
            Self::ShowsFrustration => "cliente_muestra_frustracion",
            Self::HasValidDocument => "tiene_documento_valido",
            Self::BalanceAboveThreshold => "saldo_mayor_1000",
            Self::FirstConversation => "primera_conversacion",
        }
    }

    pub fn evaluate(&self, ctx: &FlowContext) -> bool {
        match self {
            Self::PlanSelected => {
                if ctx.is_truthy("plan_seleccionado") {
                    return true;
                }
                contains_any(ctx.message(), PLAN_KEYWORDS)
            }
            Self::ShowsFrustration => contains_any(ctx.message(), FRUSTRATION_KEYWORDS),
            Self::HasValidDocument => {
                let document_len = match ctx.get("documento") {
                    Some(Value::String(s)) => s.trim().chars().count(),
                    Some(Value::Number(n)) => n.to_string().len(),
                    _ => 0,
                };
                document_len >= MIN_DOCUMENT_LEN || DOCUMENT_NUMBER.is_match(ctx.message())
            }
            Self::BalanceAboveThreshold => ctx
                .get_f64("saldo")
                .map(|s| s > BALANCE_THRESHOLD)
                .unwrap_or(false),
            Self::FirstConversation => match ctx.get("conversaciones_previas") {
                None | Some(Value::Null) => true,
                Some(Value::Number(n)) => n.as_f64() == Some(0.0),
                Some(_) => false,
            },
        }
    }
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let message = message.to_lowercase();
    keywords.iter().any(|k| message.contains(k))
}

/// Parsed boolean expression over predicate names
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Name(String),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// Unparseable fragment; always false
    Invalid(String),
}

impl Expr {
    fn parse(expression: &str) -> Self {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        if tokens.is_empty() {
            return Self::Invalid(expression.to_string());
        }

        let mut alternatives: Vec<Expr> = tokens
            .split(|t| *t == "or")
            .map(|group| {
                let mut terms: Vec<Expr> =
                    group.split(|t| *t == "and").map(Self::parse_term).collect();
                if terms.len() == 1 {
                    terms.remove(0)
                } else {
                    Self::And(terms)
                }
            })
            .collect();

        if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            Self::Or(alternatives)
        }
    }

    fn parse_term(tokens: &[&str]) -> Self {
        match tokens {
            [] => Self::Invalid(String::new()),
            ["not", rest @ ..] => Self::Not(Box::new(Self::parse_term(rest))),
            [name] => Self::Name((*name).to_string()),
            _ => Self::Invalid(tokens.join(" ")),
        }
    }

    fn names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Name(n) => out.push(n),
            Self::Not(e) => e.names(out),
            Self::And(es) | Self::Or(es) => es.iter().for_each(|e| e.names(out)),
            Self::Invalid(_) => {}
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            Self::Name(_) => true,
            Self::Not(e) => e.is_well_formed(),
            Self::And(es) | Self::Or(es) => es.iter().all(Self::is_well_formed),
            Self::Invalid(_) => false,
        }
    }
}

/// Resolves condition expressions against a context
#[derive(Default, Clone)]
pub struct ConditionEvaluator {
    custom: HashMap<String, Arc<Predicate>>,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under `name`
    ///
    /// Built-in names cannot be overridden; returns `false` in that case.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> bool
    where
        F: Fn(&FlowContext) -> Result<bool, ConditionError> + Send + Sync + 'static,
    {
        let name = name.into();
        if BuiltinCondition::parse(&name).is_some() {
            tracing::warn!(condition = %name, "Cannot override built-in condition");
            return false;
        }
        if self.custom.insert(name.clone(), Arc::new(predicate)).is_some() {
            tracing::debug!(condition = %name, "Replaced custom condition");
        }
        true
    }

    /// Builder-style `register`
    pub fn with<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FlowContext) -> Result<bool, ConditionError> + Send + Sync + 'static,
    {
        self.register(name, predicate);
        self
    }

    /// Register `name` as a truthiness check on the context field of the
    /// same name
    pub fn register_flag(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let field = name.clone();
        self.register(name, move |ctx: &FlowContext| Ok(ctx.is_truthy(&field)))
    }

    /// Whether a single predicate name resolves
    pub fn has(&self, name: &str) -> bool {
        BuiltinCondition::parse(name).is_some() || self.custom.contains_key(name)
    }

    /// Whether the expression parses and every name in it resolves
    pub fn is_known(&self, expression: &str) -> bool {
        self.resolves(&Expr::parse(expression))
    }

    fn resolves(&self, expr: &Expr) -> bool {
        let mut names = Vec::new();
        expr.names(&mut names);
        expr.is_well_formed() && names.iter().all(|n| self.has(n))
    }

    /// Every resolvable predicate name, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BuiltinCondition::ALL
            .iter()
            .map(|b| b.name().to_string())
            .chain(self.custom.keys().cloned())
            .collect();
        names.sort();
        names
    }

    /// Evaluate an expression; never fails
    pub fn evaluate(&self, expression: &str, ctx: &FlowContext) -> bool {
        let expr = Expr::parse(expression);
        if !self.resolves(&expr) {
            tracing::warn!(condition = expression, "Unresolvable condition");
            return false;
        }
        let result = self.eval(&expr, ctx);
        tracing::trace!(condition = expression, result, "Condition evaluated");
        result
    }

    fn eval(&self, expr: &Expr, ctx: &FlowContext) -> bool {
        match expr {
            Expr::Name(name) => self.evaluate_name(name, ctx),
            Expr::Not(inner) => !self.eval(inner, ctx),
            Expr::And(terms) => terms.iter().all(|t| self.eval(t, ctx)),
            Expr::Or(terms) => terms.iter().any(|t| self.eval(t, ctx)),
            Expr::Invalid(_) => false,
        }
    }

    fn evaluate_name(&self, name: &str, ctx: &FlowContext) -> bool {
        if let Some(builtin) = BuiltinCondition::parse(name) {
            return builtin.evaluate(ctx);
        }

        let Some(predicate) = self.custom.get(name) else {
            return false;
        };

        match catch_unwind(AssertUnwindSafe(|| predicate(ctx))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(condition = name, error = %e, "Condition failed");
                false
            }
            Err(_) => {
                tracing::error!(condition = name, "Condition panicked");
                false
            }
        }
    }
}

impl std::fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
