use std::fmt;

/// A rule the loaded value breaks, reported by a [`RuleEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Dotted Rust field names rooted at the type name, e.g.
    /// `Config.server.port` or `Config.hosts[0].name`
    pub namespace: String,
    /// Name of the rule, e.g. `min` or `required`
    pub rule: String,
}

impl RuleViolation {
    pub fn new(namespace: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            rule: rule.into(),
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violates rule {:?}", self.namespace, self.rule)
    }
}

impl std::error::Error for RuleViolation {}

/// Declarative checks run on the fully loaded value.
///
/// Any `Fn(&T) -> Result<(), RuleViolation>` closure is a rule engine.
pub trait RuleEngine<T> {
    fn check(&self, value: &T) -> Result<(), RuleViolation>;
}

impl<T, F> RuleEngine<T> for F
where
    F: Fn(&T) -> Result<(), RuleViolation>,
{
    fn check(&self, value: &T) -> Result<(), RuleViolation> {
        self(value)
    }
}
