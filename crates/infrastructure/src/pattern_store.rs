//! Atomic hot-swap pattern store (spec §4.2/§4.3).
//!
//! A single `ArcSwap<Snapshot>` backs both the blocklist and the whitelist;
//! which one a given store instance is depends only on the `PatternSetKind`
//! it was built with. Readers do one atomic load and then consult the
//! snapshot with no further synchronization; reload builds a new snapshot
//! off to the side and publishes it with a single `store`.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use fancy_regex::Regex;
use glory_hole_application::ports::PatternSetPort;
use glory_hole_domain::{DnsError, DomainName, PatternSetKind};
use rustc_hash::FxHashSet;
use std::sync::Arc;

struct Snapshot {
    exact: FxHashSet<String>,
    wildcards: Vec<String>,
    regexes: Vec<(String, Regex)>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            exact: FxHashSet::default(),
            wildcards: Vec::new(),
            regexes: Vec::new(),
        }
    }
}

pub struct PatternStore {
    kind: PatternSetKind,
    snapshot: ArcSwap<Snapshot>,
}

impl PatternStore {
    pub fn new(kind: PatternSetKind) -> Self {
        Self {
            kind,
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }
}

#[async_trait]
impl PatternSetPort for PatternStore {
    fn kind(&self) -> PatternSetKind {
        self.kind
    }

    fn matches(&self, domain: &str) -> Option<String> {
        let snapshot = self.snapshot.load();

        if snapshot.exact.contains(domain) {
            return Some(domain.to_string());
        }

        for pattern in &snapshot.wildcards {
            if glory_hole_domain::wildcard_matches(domain, pattern) {
                return Some(pattern.clone());
            }
        }

        for (source, regex) in &snapshot.regexes {
            if matches!(regex.is_match(domain), Ok(true)) {
                return Some(source.clone());
            }
        }

        None
    }

    fn len(&self) -> usize {
        let snapshot = self.snapshot.load();
        snapshot.exact.len() + snapshot.wildcards.len() + snapshot.regexes.len()
    }

    async fn reload(&self, exact: Vec<String>, wildcards: Vec<String>, regexes: Vec<String>) -> Result<(), DnsError> {
        let exact = exact
            .into_iter()
            .map(|s| DomainName::normalize(&s).as_str().to_string())
            .collect::<FxHashSet<_>>();

        let wildcards = wildcards
            .into_iter()
            .map(|s| DomainName::normalize(&s).as_str().to_string())
            .collect::<Vec<_>>();

        // A pattern that fails to compile fails the whole reload (spec
        // §4.2: "a regex that fails to compile ... causes rule load to
        // fail — never a silent skip at query time"); the snapshot
        // currently live stays live.
        let mut compiled = Vec::with_capacity(regexes.len());
        for source in regexes {
            let regex = Regex::new(&source)
                .map_err(|e| DnsError::Config(format!("invalid blocklist regex '{source}': {e}")))?;
            compiled.push((source, regex));
        }

        self.snapshot.store(Arc::new(Snapshot {
            exact,
            wildcards,
            regexes: compiled,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn loaded_store(exact: &[&str], wildcards: &[&str], regexes: &[&str]) -> PatternStore {
        let store = PatternStore::new(PatternSetKind::Block);
        store
            .reload(
                exact.iter().map(|s| s.to_string()).collect(),
                wildcards.iter().map(|s| s.to_string()).collect(),
                regexes.iter().map(|s| s.to_string()).collect(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn exact_match_wins_before_wildcard_tier() {
        let store = loaded_store(&["doubleclick.net."], &["*.ads.example.com."], &[]).await;
        assert_eq!(store.matches("doubleclick.net."), Some("doubleclick.net.".to_string()));
    }

    #[tokio::test]
    async fn wildcard_tier_consulted_on_exact_miss() {
        let store = loaded_store(&[], &["*.ads.example.com."], &[]).await;
        assert!(store.matches("tracker.ads.example.com.").is_some());
        assert!(store.matches("ads.example.com.").is_none());
    }

    #[tokio::test]
    async fn regex_tier_consulted_last() {
        let store = loaded_store(&[], &[], &[r"^track\d+\.evil\.com\.$"]).await;
        assert!(store.matches("track42.evil.com.").is_some());
        assert!(store.matches("trackxx.evil.com.").is_none());
    }

    #[tokio::test]
    async fn invalid_regex_fails_the_whole_reload() {
        let store = PatternStore::new(PatternSetKind::Block);
        store
            .reload(vec!["a.com.".to_string()], vec![], vec![])
            .await
            .unwrap();
        let result = store.reload(vec![], vec![], vec!["(unclosed".to_string()]).await;
        assert!(result.is_err());
        // Previous snapshot is still live.
        assert_eq!(store.matches("a.com."), Some("a.com.".to_string()));
    }

    #[tokio::test]
    async fn reload_is_visible_atomically_to_new_reads() {
        let store = PatternStore::new(PatternSetKind::Allow);
        assert!(store.matches("example.com.").is_none());
        store
            .reload(vec!["example.com.".to_string()], vec![], vec![])
            .await
            .unwrap();
        assert!(store.matches("example.com.").is_some());
    }
}
