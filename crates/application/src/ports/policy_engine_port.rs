use glory_hole_domain::{DnsError, EvaluationContext, PolicyAction};

/// Verdict of evaluating the compiled rule set against one query.
#[derive(Debug, Clone)]
pub struct PolicyVerdict {
    pub rule_name: String,
    pub action: PolicyAction,
    pub action_data: Option<String>,
}

/// Compiled-expression policy engine, per spec §4.6. Rules are evaluated in
/// configured order; the first enabled rule whose expression returns `true`
/// wins. No matching rule means "no opinion" — the handler proceeds to the
/// next pipeline stage.
pub trait PolicyEnginePort: Send + Sync {
    fn evaluate(&self, ctx: &EvaluationContext) -> Option<PolicyVerdict>;

    /// Compile and atomically swap in a new rule set. A rule that fails to
    /// compile aborts the whole reload (spec §4.6 invariant b): the
    /// previously active rule set stays live.
    fn reload(&self, sources: Vec<(String, String, PolicyAction, Option<String>, bool)>) -> Result<(), DnsError>;

    fn rule_count(&self) -> usize;
}
