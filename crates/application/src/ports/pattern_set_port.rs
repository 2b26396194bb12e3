use async_trait::async_trait;
use glory_hole_domain::{DnsError, PatternSetKind};

/// One of the two pattern sets described in spec §4.2/§4.3: the blocklist
/// and the whitelist share this port (same three-tier lookup, same
/// atomic-snapshot reload), distinguished only by `kind()`.
#[async_trait]
pub trait PatternSetPort: Send + Sync {
    fn kind(&self) -> PatternSetKind;

    /// Exact match, then wildcard tier, then regex tier, in that order.
    /// Returns the matched pattern's source text, or `None`.
    fn matches(&self, domain: &str) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically replace the current snapshot. The swap is lock-free from
    /// the reader's point of view (spec §4.2 invariant a).
    async fn reload(
        &self,
        exact: Vec<String>,
        wildcards: Vec<String>,
        regexes: Vec<String>,
    ) -> Result<(), DnsError>;
}
