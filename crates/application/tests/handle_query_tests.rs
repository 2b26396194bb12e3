//! End-to-end coverage of the handler state machine (spec §4.10, §8): each
//! scenario wires a minimal mock behind every port and asserts on the wire
//! bytes the encoder mock stamps with a recognizable marker, plus the entry
//! the mock query log received.

use async_trait::async_trait;
use glory_hole_application::ports::{
    ForwardedResponse, LocalLookupOutcome, LocalRecordsPort, PatternSetPort, PolicyEnginePort, PolicyVerdict, QueryLogPort, RateLimiterPort,
    ResponseCachePort, ResponseEncoderPort, UpstreamForwarderPort,
};
use glory_hole_application::HandleQueryUseCase;
use glory_hole_domain::{
    CacheKey, CachedResponse, DnsError, DomainName, EvaluationContext, LocalRecord, PatternSetKind, PolicyAction, QueryLogEntry, QueryRequest,
    QueryStats, RateLimitAction, Rcode, RecordData, RecordType,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

const CLIENT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50));

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

fn request(qname: &str) -> QueryRequest {
    QueryRequest::new(b"wire-bytes".to_vec(), DomainName::normalize(qname), RecordType::A, CacheKey::CLASS_IN, CLIENT_IP, deadline())
}

struct MockCache {
    entry: Mutex<Option<(CacheKey, CachedResponse)>>,
}

impl MockCache {
    fn empty() -> Self {
        Self { entry: Mutex::new(None) }
    }

    fn with_entry(key: CacheKey, response: CachedResponse) -> Self {
        Self { entry: Mutex::new(Some((key, response))) }
    }
}

impl ResponseCachePort for MockCache {
    fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.entry.lock().unwrap().as_ref().and_then(|(k, v)| if k == key { Some(v.clone()) } else { None })
    }

    fn put(&self, key: CacheKey, response: CachedResponse) {
        *self.entry.lock().unwrap() = Some((key, response));
    }

    fn len(&self) -> usize {
        self.entry.lock().unwrap().is_some() as usize
    }

    fn evict_expired(&self) -> usize {
        0
    }
}

enum LocalBehavior {
    Miss,
    Resolved(Vec<LocalRecord>),
    Partial { chain: Vec<LocalRecord>, escape_target: DomainName },
}

struct MockLocalRecords {
    behavior: LocalBehavior,
}

impl LocalRecordsPort for MockLocalRecords {
    fn resolve(&self, _name: &str, _qtype: RecordType, _max_chain_depth: u32) -> Result<LocalLookupOutcome, DnsError> {
        match &self.behavior {
            LocalBehavior::Miss => Err(DnsError::LocalLookupMiss),
            LocalBehavior::Resolved(records) => Ok(LocalLookupOutcome::Resolved(records.clone())),
            LocalBehavior::Partial { chain, escape_target } => Ok(LocalLookupOutcome::PartialChain {
                chain: chain.clone(),
                escape_target: escape_target.clone(),
            }),
        }
    }

    fn reload(&self, _records: Vec<LocalRecord>) -> Result<(), DnsError> {
        Ok(())
    }

    fn len(&self) -> usize {
        0
    }
}

struct MockPatternSet {
    kind: PatternSetKind,
    blocked: Mutex<Vec<String>>,
}

impl MockPatternSet {
    fn empty(kind: PatternSetKind) -> Self {
        Self { kind, blocked: Mutex::new(Vec::new()) }
    }

    fn with_entry(kind: PatternSetKind, domain: &str) -> Self {
        Self { kind, blocked: Mutex::new(vec![domain.to_string()]) }
    }
}

#[async_trait]
impl PatternSetPort for MockPatternSet {
    fn kind(&self) -> PatternSetKind {
        self.kind
    }

    fn matches(&self, domain: &str) -> Option<String> {
        self.blocked.lock().unwrap().iter().find(|p| p.as_str() == domain).cloned()
    }

    fn len(&self) -> usize {
        self.blocked.lock().unwrap().len()
    }

    async fn reload(&self, _exact: Vec<String>, _wildcards: Vec<String>, _regexes: Vec<String>) -> Result<(), DnsError> {
        Ok(())
    }
}

struct MockPolicy {
    verdict: Option<PolicyVerdict>,
}

impl MockPolicy {
    fn none() -> Self {
        Self { verdict: None }
    }

    fn blocking(rule_name: &str) -> Self {
        Self {
            verdict: Some(PolicyVerdict {
                rule_name: rule_name.to_string(),
                action: PolicyAction::Block,
                action_data: None,
            }),
        }
    }
}

impl PolicyEnginePort for MockPolicy {
    fn evaluate(&self, _ctx: &EvaluationContext) -> Option<PolicyVerdict> {
        self.verdict.clone()
    }

    fn reload(&self, _sources: Vec<(String, String, PolicyAction, Option<String>, bool)>) -> Result<(), DnsError> {
        Ok(())
    }

    fn rule_count(&self) -> usize {
        self.verdict.is_some() as usize
    }
}

struct MockRateLimiter {
    action: Option<RateLimitAction>,
}

impl RateLimiterPort for MockRateLimiter {
    fn check(&self, _client_ip: IpAddr) -> Option<RateLimitAction> {
        self.action
    }

    fn tracked_clients(&self) -> usize {
        0
    }

    fn evict_idle(&self) -> usize {
        0
    }
}

struct MockForwarder {
    result: Mutex<Option<Result<ForwardedResponse, DnsError>>>,
}

impl MockForwarder {
    fn ok(wire: Vec<u8>) -> Self {
        Self {
            result: Mutex::new(Some(Ok(ForwardedResponse { wire, upstream: "203.0.113.1:53".to_string(), latency_ms: 7 }))),
        }
    }
}

#[async_trait]
impl UpstreamForwarderPort for MockForwarder {
    async fn forward(&self, _query_wire: &[u8], _deadline: Instant) -> Result<ForwardedResponse, DnsError> {
        self.result.lock().unwrap().take().expect("forward called more than once")
    }
}

struct MockEncoder;

impl ResponseEncoderPort for MockEncoder {
    fn encode_answer(&self, _query_wire: &[u8], records: &[LocalRecord]) -> Result<Vec<u8>, DnsError> {
        Ok(format!("ANSWER:{}", records.len()).into_bytes())
    }

    fn encode_rcode(&self, _query_wire: &[u8], rcode: Rcode) -> Result<Vec<u8>, DnsError> {
        Ok(format!("RCODE:{rcode:?}").into_bytes())
    }

    fn encode_spliced_answer(&self, _query_wire: &[u8], cname_chain: &[LocalRecord], forwarded_wire: &[u8]) -> Result<Vec<u8>, DnsError> {
        let mut out = format!("SPLICED:{}:", cname_chain.len()).into_bytes();
        out.extend_from_slice(forwarded_wire);
        Ok(out)
    }

    fn rewrite_cached(&self, cached: &CachedResponse, _query_wire: &[u8]) -> Vec<u8> {
        let mut out = b"CACHED:".to_vec();
        out.extend_from_slice(&cached.wire);
        out
    }

    fn answer_min_ttl(&self, _wire: &[u8]) -> Option<u32> {
        Some(300)
    }

    fn is_negative_response(&self, wire: &[u8]) -> bool {
        wire.starts_with(b"NXDOMAIN")
    }

    fn rebuild_query_for(&self, _query_wire: &[u8], _name: &DomainName) -> Result<Vec<u8>, DnsError> {
        Ok(b"rebuilt-query".to_vec())
    }
}

#[derive(Default)]
struct MockQueryLog {
    entries: Mutex<Vec<QueryLogEntry>>,
}

impl MockQueryLog {
    fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Vec<QueryLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryLogPort for MockQueryLog {
    fn submit(&self, entry: QueryLogEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<QueryLogEntry>, DnsError> {
        Ok(self.entries())
    }

    async fn stats(&self) -> Result<QueryStats, DnsError> {
        Ok(QueryStats::default())
    }

    async fn delete_older_than(&self, _retention_days: u32) -> Result<u64, DnsError> {
        Ok(0)
    }
}

#[allow(clippy::too_many_arguments)]
fn build_handler(
    cache: Arc<dyn ResponseCachePort>,
    local_records: Arc<dyn LocalRecordsPort>,
    policy: Arc<dyn PolicyEnginePort>,
    whitelist: Arc<dyn PatternSetPort>,
    blocklist: Arc<dyn PatternSetPort>,
    rate_limiter: Arc<dyn RateLimiterPort>,
    forwarder: Arc<dyn UpstreamForwarderPort>,
    query_log: Arc<dyn QueryLogPort>,
) -> HandleQueryUseCase {
    HandleQueryUseCase::new(
        cache,
        local_records,
        policy,
        whitelist,
        blocklist,
        rate_limiter,
        forwarder,
        Arc::new(MockEncoder),
        query_log,
        8,
        60,
        86_400,
        30,
    )
}

fn allow_everything() -> (Arc<dyn PatternSetPort>, Arc<dyn PatternSetPort>) {
    (Arc::new(MockPatternSet::empty(PatternSetKind::Allow)), Arc::new(MockPatternSet::empty(PatternSetKind::Block)))
}

#[tokio::test]
async fn local_a_record_hit_answers_without_forwarding() {
    let record = LocalRecord::new(DomainName::normalize("router.lan."), 300, RecordData::A(Ipv4Addr::new(192, 168, 1, 1)));
    let local_records: Arc<dyn LocalRecordsPort> = Arc::new(MockLocalRecords { behavior: LocalBehavior::Resolved(vec![record]) });
    let (whitelist, blocklist) = allow_everything();
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        Arc::new(MockCache::empty()),
        local_records,
        Arc::new(MockPolicy::none()),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: None }),
        Arc::new(MockForwarder::ok(Vec::new())),
        log.clone(),
    );

    let response = handler.execute(&request("router.lan.")).await;

    assert_eq!(response, b"ANSWER:1");
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].response_code, "NOERROR");
    assert!(!entries[0].blocked);
}

#[tokio::test]
async fn blocklisted_domain_returns_nxdomain_and_logs_blocked() {
    let local_records: Arc<dyn LocalRecordsPort> = Arc::new(MockLocalRecords { behavior: LocalBehavior::Miss });
    let whitelist: Arc<dyn PatternSetPort> = Arc::new(MockPatternSet::empty(PatternSetKind::Allow));
    let blocklist: Arc<dyn PatternSetPort> = Arc::new(MockPatternSet::with_entry(PatternSetKind::Block, "ads.example.com."));
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        Arc::new(MockCache::empty()),
        local_records,
        Arc::new(MockPolicy::none()),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: None }),
        Arc::new(MockForwarder::ok(Vec::new())),
        log.clone(),
    );

    let response = handler.execute(&request("ads.example.com.")).await;

    assert_eq!(response, b"RCODE:NxDomain");
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].blocked);
    assert_eq!(entries[0].response_code, "NXDOMAIN");
}

#[tokio::test]
async fn cache_hit_is_rewritten_without_touching_upstream_or_local_store() {
    let key = CacheKey::new(DomainName::normalize("cached.example."), RecordType::A, CacheKey::CLASS_IN);
    let cached = CachedResponse::new(b"original-answer".to_vec(), Duration::from_secs(120), SystemTime::now(), false);
    let cache: Arc<dyn ResponseCachePort> = Arc::new(MockCache::with_entry(key, cached));
    let (whitelist, blocklist) = allow_everything();
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        cache,
        Arc::new(MockLocalRecords { behavior: LocalBehavior::Miss }),
        Arc::new(MockPolicy::none()),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: None }),
        Arc::new(MockForwarder::ok(Vec::new())),
        log.clone(),
    );

    let response = handler.execute(&request("cached.example.")).await;

    assert_eq!(response, b"CACHED:original-answer");
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].cached);
}

#[tokio::test]
async fn partial_cname_chain_splices_local_records_onto_forwarded_answer() {
    let chain = vec![LocalRecord::new(DomainName::normalize("alias.example."), 300, RecordData::Cname(DomainName::normalize("target.example.")))];
    let local_records: Arc<dyn LocalRecordsPort> = Arc::new(MockLocalRecords {
        behavior: LocalBehavior::Partial { chain, escape_target: DomainName::normalize("target.example.") },
    });
    let (whitelist, blocklist) = allow_everything();
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        Arc::new(MockCache::empty()),
        local_records,
        Arc::new(MockPolicy::none()),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: None }),
        Arc::new(MockForwarder::ok(b"upstream-answer".to_vec())),
        log.clone(),
    );

    let response = handler.execute(&request("alias.example.")).await;

    assert_eq!(response, b"SPLICED:1:upstream-answer");
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].upstream_used.as_deref(), Some("203.0.113.1:53"));
}

#[tokio::test]
async fn policy_block_verdict_short_circuits_before_the_blocklist() {
    let local_records: Arc<dyn LocalRecordsPort> = Arc::new(MockLocalRecords { behavior: LocalBehavior::Miss });
    let (whitelist, blocklist) = allow_everything();
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        Arc::new(MockCache::empty()),
        local_records,
        Arc::new(MockPolicy::blocking("after-hours")),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: None }),
        Arc::new(MockForwarder::ok(Vec::new())),
        log.clone(),
    );

    let response = handler.execute(&request("kids-tablet.lan.")).await;

    assert_eq!(response, b"RCODE:NxDomain");
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].blocked);
}

#[tokio::test]
async fn rate_limited_client_never_reaches_cache_or_forwarder() {
    let (whitelist, blocklist) = allow_everything();
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        Arc::new(MockCache::empty()),
        Arc::new(MockLocalRecords { behavior: LocalBehavior::Miss }),
        Arc::new(MockPolicy::none()),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: Some(RateLimitAction::Nxdomain) }),
        Arc::new(MockForwarder::ok(Vec::new())),
        log.clone(),
    );

    let response = handler.execute(&request("noisy-client.example.")).await;

    assert_eq!(response, b"RCODE:NxDomain");
    let entries = log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].response_code, "NXDOMAIN");
}

#[tokio::test]
async fn dropped_rate_limit_action_returns_no_bytes() {
    let (whitelist, blocklist) = allow_everything();
    let log = Arc::new(MockQueryLog::new());

    let handler = build_handler(
        Arc::new(MockCache::empty()),
        Arc::new(MockLocalRecords { behavior: LocalBehavior::Miss }),
        Arc::new(MockPolicy::none()),
        whitelist,
        blocklist,
        Arc::new(MockRateLimiter { action: Some(RateLimitAction::Drop) }),
        Arc::new(MockForwarder::ok(Vec::new())),
        log.clone(),
    );

    let response = handler.execute(&request("flooder.example.")).await;

    assert!(response.is_empty());
    assert_eq!(log.entries().len(), 1);
}
