use glory_hole_domain::{CachedResponse, DnsError, DomainName, LocalRecord, Rcode};

/// Builds and rewrites wire-format DNS messages. The only thing in the
/// pipeline that needs to know the wire format at all; every other stage
/// works with `LocalRecord`/`Rcode` values. Implemented in infrastructure
/// against `hickory-proto`'s message codec.
pub trait ResponseEncoderPort: Send + Sync {
    /// Build a NOERROR answer from the original query bytes plus the
    /// records to put in the answer section, with EDNS0 OPT preserved from
    /// the request if present.
    fn encode_answer(&self, query_wire: &[u8], records: &[LocalRecord]) -> Result<Vec<u8>, DnsError>;

    /// Build an error/empty response carrying only an RCODE (FORMERR,
    /// SERVFAIL, NXDOMAIN, REFUSED, ...).
    fn encode_rcode(&self, query_wire: &[u8], rcode: Rcode) -> Result<Vec<u8>, DnsError>;

    /// Build an answer that prepends a locally-resolved CNAME chain to the
    /// answer section of an upstream response for the chain's final
    /// target (spec §4.10 step 4, the "splice" case).
    fn encode_spliced_answer(
        &self,
        query_wire: &[u8],
        cname_chain: &[LocalRecord],
        forwarded_wire: &[u8],
    ) -> Result<Vec<u8>, DnsError>;

    /// Re-serve a cached response: decrement every answer RR's TTL by the
    /// time elapsed since it was cached, and overwrite the transaction ID
    /// with the ID from `query_wire` (spec §4.10 step 3).
    fn rewrite_cached(&self, cached: &CachedResponse, query_wire: &[u8]) -> Vec<u8>;

    /// The minimum TTL across the answer section of an upstream response,
    /// used to pick the cache entry's base TTL before clamping.
    fn answer_min_ttl(&self, wire: &[u8]) -> Option<u32>;

    /// Whether `wire` is NXDOMAIN or NOERROR-with-empty-answer, the two
    /// cases the cache charges against `negative_ttl` instead of the
    /// answer's own TTL.
    fn is_negative_response(&self, wire: &[u8]) -> bool;

    /// Rewrite `query_wire`'s question to `name`, keeping the same qtype,
    /// qclass, and EDNS0 record, for the splice case's re-query of the
    /// chain's escape target.
    fn rebuild_query_for(&self, query_wire: &[u8], name: &DomainName) -> Result<Vec<u8>, DnsError>;
}
