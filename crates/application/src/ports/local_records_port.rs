use glory_hole_domain::{DnsError, DomainName, LocalRecord, RecordType};

/// Result of a local lookup once CNAME chains have been followed as far as
/// the local store allows.
#[derive(Debug, Clone)]
pub enum LocalLookupOutcome {
    /// The chain (length 1 for a plain hit) terminates entirely within the
    /// local store, ending in a record set matching `qtype`.
    Resolved(Vec<LocalRecord>),
    /// The chain starts locally (one or more CNAME hops) but the final
    /// target has no local record; the handler must forward `qtype` for
    /// `escape_target` and splice the result onto `chain`.
    PartialChain {
        chain: Vec<LocalRecord>,
        escape_target: DomainName,
    },
}

/// Authoritative local zone, per spec §4.5. `reload` swaps in a freshly
/// validated record set atomically (same ArcSwap idiom as the pattern
/// sets); a partially-applied reload is never visible to readers.
pub trait LocalRecordsPort: Send + Sync {
    /// Resolve `name`/`qtype` against the local store, following CNAME
    /// chains up to `max_chain_depth` hops. Returns `LocalLookupMiss` if
    /// there is no exact or wildcard entry at all, `CnameChainOverflow` if
    /// the chain is too deep, and `CnameLoop` if a name repeats.
    fn resolve(
        &self,
        name: &str,
        qtype: RecordType,
        max_chain_depth: u32,
    ) -> Result<LocalLookupOutcome, DnsError>;

    fn reload(&self, records: Vec<LocalRecord>) -> Result<(), DnsError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
