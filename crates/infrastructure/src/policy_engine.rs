//! Compiled-expression policy engine (spec §4.6), backed by `rhai`.
//!
//! Each rule's source expression is compiled once, at reload, into a
//! `rhai::AST`; the hot path only evaluates. A rule that raises an
//! evaluation error is treated as "does not fire" for that query (logged
//! at `warn`), never panics the handler.

use arc_swap::ArcSwap;
use fancy_regex::Regex;
use glory_hole_application::ports::{PolicyEnginePort, PolicyVerdict};
use glory_hole_domain::{DnsError, EvaluationContext, PolicyAction, PolicyRule};
use ipnetwork::IpNetwork;
use rhai::{Array, Dynamic, Engine, Scope, AST};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

fn build_engine() -> Engine {
    let mut engine = Engine::new();

    engine.register_fn("DomainMatches", |d: &str, p: &str| -> bool {
        d.to_ascii_lowercase().contains(&p.to_ascii_lowercase())
    });
    engine.register_fn("DomainEndsWith", |d: &str, s: &str| -> bool {
        d.to_ascii_lowercase().ends_with(&s.to_ascii_lowercase())
    });
    engine.register_fn("DomainStartsWith", |d: &str, p: &str| -> bool {
        d.to_ascii_lowercase().starts_with(&p.to_ascii_lowercase())
    });
    engine.register_fn("DomainRegex", |d: &str, r: &str| -> bool {
        Regex::new(r).ok().and_then(|re| re.is_match(d).ok()).unwrap_or(false)
    });
    engine.register_fn("DomainLevelCount", |d: &str| -> i64 {
        d.trim_end_matches('.').split('.').filter(|l| !l.is_empty()).count() as i64
    });
    engine.register_fn("IPInCIDR", |ip: &str, cidr: &str| -> bool {
        match (IpAddr::from_str(ip), IpNetwork::from_str(cidr)) {
            (Ok(ip), Ok(net)) => net.contains(ip),
            _ => false,
        }
    });
    engine.register_fn("IPEquals", |a: &str, b: &str| -> bool {
        match (IpAddr::from_str(a), IpAddr::from_str(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    });
    engine.register_fn("QueryTypeIn", |t: &str, candidates: Array| -> bool {
        candidates
            .into_iter()
            .any(|c| c.into_string().map(|s| s.eq_ignore_ascii_case(t)).unwrap_or(false))
    });
    engine.register_fn("IsWeekend", |wd: i64| -> bool { wd == 0 || wd == 6 });
    engine.register_fn(
        "InTimeRange",
        |h: i64, m: i64, sh: i64, sm: i64, eh: i64, em: i64| -> bool {
            let now = h * 60 + m;
            let start = sh * 60 + sm;
            let end = eh * 60 + em;
            if start <= end {
                now >= start && now < end
            } else {
                // Wraps past midnight, e.g. 22:00-06:00.
                now >= start || now < end
            }
        },
    );

    engine
}

fn scope_for(ctx: &EvaluationContext) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push("Domain", ctx.domain.clone());
    scope.push("ClientIP", ctx.client_ip.clone());
    scope.push("QueryType", ctx.query_type.clone());
    scope.push("Hour", ctx.hour as i64);
    scope.push("Minute", ctx.minute as i64);
    scope.push("Day", ctx.day as i64);
    scope.push("Month", ctx.month as i64);
    scope.push("Weekday", ctx.weekday as i64);
    scope
}

type CompiledRule = PolicyRule<Arc<AST>>;

pub struct RhaiPolicyEngine {
    engine: Engine,
    rules: ArcSwap<Vec<CompiledRule>>,
}

impl RhaiPolicyEngine {
    pub fn new() -> Self {
        Self {
            engine: build_engine(),
            rules: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl Default for RhaiPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEnginePort for RhaiPolicyEngine {
    fn evaluate(&self, ctx: &EvaluationContext) -> Option<PolicyVerdict> {
        let rules = self.rules.load();
        let mut scope = scope_for(ctx);

        for rule in rules.iter() {
            if !rule.enabled {
                continue;
            }
            match self.engine.eval_ast_with_scope::<bool>(&mut scope, &rule.program) {
                Ok(true) => {
                    return Some(PolicyVerdict {
                        rule_name: rule.name.clone(),
                        action: rule.action,
                        action_data: rule.action_data.clone(),
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(rule = %rule.name, error = %e, "policy rule raised an evaluation error, treating as no-match");
                }
            }
        }
        None
    }

    fn reload(&self, sources: Vec<(String, String, PolicyAction, Option<String>, bool)>) -> Result<(), DnsError> {
        let mut compiled = Vec::with_capacity(sources.len());
        for (name, source, action, action_data, enabled) in sources {
            let ast = self
                .engine
                .compile(&source)
                .map_err(|e| DnsError::PolicyCompile(name.clone(), e.to_string()))?;
            compiled.push(PolicyRule {
                name,
                source,
                program: Arc::new(ast),
                action,
                action_data,
                enabled,
            });
        }
        self.rules.store(Arc::new(compiled));
        Ok(())
    }

    fn rule_count(&self) -> usize {
        self.rules.load().len()
    }
}

trait DynamicStringExt {
    fn into_string(self) -> Option<String>;
}

impl DynamicStringExt for Dynamic {
    fn into_string(self) -> Option<String> {
        self.into_immutable_string().ok().map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn ctx(domain: &str, hour: u8) -> EvaluationContext {
        let mut c = EvaluationContext::new(domain, "1.2.3.4", "A", SystemTime::now());
        c.hour = hour;
        c
    }

    #[test]
    fn first_match_wins_when_multiple_rules_fire() {
        let engine = RhaiPolicyEngine::new();
        engine
            .reload(vec![
                ("r1".to_string(), "true".to_string(), PolicyAction::Block, None, true),
                ("r2".to_string(), "true".to_string(), PolicyAction::Allow, None, true),
            ])
            .unwrap();
        let verdict = engine.evaluate(&ctx("example.com", 10)).unwrap();
        assert_eq!(verdict.rule_name, "r1");
        assert_eq!(verdict.action, PolicyAction::Block);
    }

    #[test]
    fn time_based_rule_blocks_only_in_window() {
        let engine = RhaiPolicyEngine::new();
        engine
            .reload(vec![(
                "late_night_tiktok".to_string(),
                r#"Hour >= 22 && DomainMatches(Domain, "tiktok")"#.to_string(),
                PolicyAction::Block,
                None,
                true,
            )])
            .unwrap();
        assert!(engine.evaluate(&ctx("www.tiktok.com", 23)).is_some());
        assert!(engine.evaluate(&ctx("www.tiktok.com", 14)).is_none());
    }

    #[test]
    fn disabled_rule_never_fires() {
        let engine = RhaiPolicyEngine::new();
        engine
            .reload(vec![("off".to_string(), "true".to_string(), PolicyAction::Block, None, false)])
            .unwrap();
        assert!(engine.evaluate(&ctx("example.com", 10)).is_none());
    }

    #[test]
    fn compile_failure_aborts_the_whole_reload() {
        let engine = RhaiPolicyEngine::new();
        engine
            .reload(vec![("ok".to_string(), "true".to_string(), PolicyAction::Block, None, true)])
            .unwrap();
        let result = engine.reload(vec![("bad".to_string(), "this is not valid rhai (((".to_string(), PolicyAction::Block, None, true)]);
        assert!(result.is_err());
        // Previous rule set is still active.
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn query_type_in_checks_membership() {
        let engine = RhaiPolicyEngine::new();
        engine
            .reload(vec![(
                "block_mx_txt".to_string(),
                r#"QueryTypeIn(QueryType, ["MX", "TXT"])"#.to_string(),
                PolicyAction::Block,
                None,
                true,
            )])
            .unwrap();
        let mut mx_ctx = ctx("example.com", 10);
        mx_ctx.query_type = "MX".to_string();
        assert!(engine.evaluate(&mx_ctx).is_some());
        let a_ctx = ctx("example.com", 10);
        assert!(engine.evaluate(&a_ctx).is_none());
    }
}
