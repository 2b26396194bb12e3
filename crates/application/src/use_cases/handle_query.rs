use crate::ports::{
    LocalRecordsPort, PatternSetPort, PolicyEnginePort, QueryLogPort,
    RateLimiterPort, ResponseCachePort, ResponseEncoderPort, UpstreamForwarderPort,
};
use glory_hole_domain::{
    CacheKey, CachedResponse, DnsError, EvaluationContext, PolicyAction, QueryLogEntry,
    QueryRequest, RateLimitAction, Rcode,
};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Implements the orchestration state machine: validate, rate-limit, cache
/// lookup, local records, policy, whitelist, blocklist, forward. Each step
/// either answers the client directly or falls through to the next one.
pub struct HandleQueryUseCase {
    cache: Arc<dyn ResponseCachePort>,
    local_records: Arc<dyn LocalRecordsPort>,
    policy: Arc<dyn PolicyEnginePort>,
    whitelist: Arc<dyn PatternSetPort>,
    blocklist: Arc<dyn PatternSetPort>,
    rate_limiter: Arc<dyn RateLimiterPort>,
    forwarder: Arc<dyn UpstreamForwarderPort>,
    encoder: Arc<dyn ResponseEncoderPort>,
    query_log: Arc<dyn QueryLogPort>,
    max_cname_chain_depth: u32,
    min_ttl: u32,
    max_ttl: u32,
    negative_ttl: u32,
}

impl HandleQueryUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<dyn ResponseCachePort>,
        local_records: Arc<dyn LocalRecordsPort>,
        policy: Arc<dyn PolicyEnginePort>,
        whitelist: Arc<dyn PatternSetPort>,
        blocklist: Arc<dyn PatternSetPort>,
        rate_limiter: Arc<dyn RateLimiterPort>,
        forwarder: Arc<dyn UpstreamForwarderPort>,
        encoder: Arc<dyn ResponseEncoderPort>,
        query_log: Arc<dyn QueryLogPort>,
        max_cname_chain_depth: u32,
        min_ttl: u32,
        max_ttl: u32,
        negative_ttl: u32,
    ) -> Self {
        Self {
            cache,
            local_records,
            policy,
            whitelist,
            blocklist,
            rate_limiter,
            forwarder,
            encoder,
            query_log,
            max_cname_chain_depth,
            min_ttl,
            max_ttl,
            negative_ttl,
        }
    }

    fn log(&self, entry: QueryLogEntry) {
        self.query_log.submit(entry);
    }

    fn base_log(request: &QueryRequest, start: Instant) -> QueryLogEntry {
        QueryLogEntry {
            timestamp: SystemTime::now(),
            client_ip: request.client_ip,
            domain: request.qname.as_str().to_string(),
            query_type: request.qtype.as_str().to_string(),
            response_code: "NOERROR".to_string(),
            blocked: false,
            cached: false,
            response_time_ms: start.elapsed().as_millis() as u64,
            upstream_used: None,
            total_latency_ms: start.elapsed().as_millis() as u64,
            upstream_latency_ms: None,
        }
    }

    /// Step 1: a well-formed `QueryRequest` already implies exactly one
    /// question with a recognized class; the wire parser (infrastructure)
    /// rejects anything else before constructing one. This stage only
    /// checks the class, since that is the one field the handler itself is
    /// contractually responsible for per spec §4.10 step 1.
    fn validate(request: &QueryRequest) -> Result<(), DnsError> {
        if request.qclass != CacheKey::CLASS_IN {
            return Err(DnsError::MalformedRequest(format!(
                "unsupported query class {}",
                request.qclass
            )));
        }
        Ok(())
    }

    pub async fn execute(&self, request: &QueryRequest) -> Vec<u8> {
        let start = Instant::now();

        if let Err(e) = Self::validate(request) {
            tracing::debug!(error = %e, "malformed request");
            self.log(QueryLogEntry {
                response_code: "FORMERR".to_string(),
                ..Self::base_log(request, start)
            });
            return self
                .encoder
                .encode_rcode(&request.wire, Rcode::FormErr)
                .unwrap_or_default();
        }

        if let Some(action) = self.rate_limiter.check(request.client_ip) {
            return self.handle_rate_limited(request, start, action);
        }

        let key = CacheKey::new(request.qname.clone(), request.qtype, request.qclass);
        if let Some(cached) = self.cache.get(&key) {
            return self.handle_cache_hit(request, start, cached);
        }

        match self.local_records.resolve(
            request.qname.as_str(),
            request.qtype,
            self.max_cname_chain_depth,
        ) {
            Ok(crate::ports::LocalLookupOutcome::Resolved(chain)) => {
                self.log(QueryLogEntry {
                    response_code: "NOERROR".to_string(),
                    ..Self::base_log(request, start)
                });
                return self
                    .encoder
                    .encode_answer(&request.wire, &chain)
                    .unwrap_or_default();
            }
            Ok(crate::ports::LocalLookupOutcome::PartialChain { chain, escape_target }) => {
                return self.splice_and_forward(request, start, chain, escape_target).await;
            }
            Err(DnsError::LocalLookupMiss) => {}
            Err(DnsError::CnameChainOverflow) | Err(DnsError::CnameLoop) => {
                tracing::debug!(domain = %request.qname, "cname chain did not resolve locally");
            }
            Err(e) => {
                tracing::warn!(error = %e, "local lookup failed unexpectedly");
            }
        }

        let ctx = EvaluationContext::new(
            request.qname.without_trailing_dot(),
            &request.client_ip.to_string(),
            request.qtype.as_str(),
            SystemTime::now(),
        );
        if let Some(verdict) = self.policy.evaluate(&ctx) {
            match verdict.action {
                PolicyAction::Allow => {
                    return self.forward_and_cache(request, start, key).await;
                }
                PolicyAction::Block | PolicyAction::Redirect => {
                    self.log(QueryLogEntry {
                        blocked: true,
                        response_code: "NXDOMAIN".to_string(),
                        ..Self::base_log(request, start)
                    });
                    return self
                        .encoder
                        .encode_rcode(&request.wire, Rcode::NxDomain)
                        .unwrap_or_default();
                }
            }
        }

        if self.whitelist.matches(request.qname.as_str()).is_some() {
            return self.forward_and_cache(request, start, key).await;
        }

        if self.blocklist.matches(request.qname.as_str()).is_some() {
            self.log(QueryLogEntry {
                blocked: true,
                response_code: "NXDOMAIN".to_string(),
                ..Self::base_log(request, start)
            });
            return self
                .encoder
                .encode_rcode(&request.wire, Rcode::NxDomain)
                .unwrap_or_default();
        }

        self.forward_and_cache(request, start, key).await
    }

    fn handle_rate_limited(&self, request: &QueryRequest, start: Instant, action: RateLimitAction) -> Vec<u8> {
        let response_code = match action {
            RateLimitAction::Nxdomain => "NXDOMAIN",
            RateLimitAction::Drop => "DROPPED",
            RateLimitAction::Delay => "DELAYED",
        };
        self.log(QueryLogEntry {
            response_code: response_code.to_string(),
            ..Self::base_log(request, start)
        });
        match action {
            RateLimitAction::Nxdomain => self
                .encoder
                .encode_rcode(&request.wire, Rcode::NxDomain)
                .unwrap_or_default(),
            RateLimitAction::Drop | RateLimitAction::Delay => Vec::new(),
        }
    }

    fn handle_cache_hit(&self, request: &QueryRequest, start: Instant, cached: CachedResponse) -> Vec<u8> {
        self.log(QueryLogEntry {
            cached: true,
            response_code: if cached.negative { "NXDOMAIN".to_string() } else { "NOERROR".to_string() },
            ..Self::base_log(request, start)
        });
        self.encoder.rewrite_cached(&cached, &request.wire)
    }

    async fn splice_and_forward(
        &self,
        request: &QueryRequest,
        start: Instant,
        chain: Vec<glory_hole_domain::LocalRecord>,
        escape_target: glory_hole_domain::DomainName,
    ) -> Vec<u8> {
        let escape_query = match self.encoder.rebuild_query_for(&request.wire, &escape_target) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(error = %e, "failed to rebuild query for cname splice");
                return self
                    .encoder
                    .encode_rcode(&request.wire, Rcode::ServFail)
                    .unwrap_or_default();
            }
        };
        match self.forwarder.forward(&escape_query, request.deadline).await {
            Ok(forwarded) => {
                self.log(QueryLogEntry {
                    upstream_used: Some(forwarded.upstream.clone()),
                    upstream_latency_ms: Some(forwarded.latency_ms),
                    response_code: "NOERROR".to_string(),
                    ..Self::base_log(request, start)
                });
                self.encoder
                    .encode_spliced_answer(&request.wire, &chain, &forwarded.wire)
                    .unwrap_or_default()
            }
            Err(e) => {
                tracing::warn!(error = %e, domain = %escape_target, "splice forward failed");
                self.log(QueryLogEntry {
                    response_code: "SERVFAIL".to_string(),
                    ..Self::base_log(request, start)
                });
                self.encoder
                    .encode_rcode(&request.wire, Rcode::ServFail)
                    .unwrap_or_default()
            }
        }
    }

    async fn forward_and_cache(&self, request: &QueryRequest, start: Instant, key: CacheKey) -> Vec<u8> {
        match self.forwarder.forward(&request.wire, request.deadline).await {
            Ok(forwarded) => {
                let answer_ttl = self.encoder.answer_min_ttl(&forwarded.wire).unwrap_or(self.min_ttl);
                let negative = self.encoder.is_negative_response(&forwarded.wire);
                let ttl = glory_hole_domain::response_cache::effective_ttl(
                    answer_ttl,
                    negative,
                    self.min_ttl,
                    self.max_ttl,
                    self.negative_ttl,
                );
                self.cache.put(
                    key,
                    CachedResponse::new(forwarded.wire.clone(), ttl, SystemTime::now(), negative),
                );
                self.log(QueryLogEntry {
                    upstream_used: Some(forwarded.upstream.clone()),
                    upstream_latency_ms: Some(forwarded.latency_ms),
                    response_code: if negative { "NXDOMAIN".to_string() } else { "NOERROR".to_string() },
                    ..Self::base_log(request, start)
                });
                forwarded.wire
            }
            Err(e) => {
                tracing::warn!(error = %e, domain = %request.qname, "forward failed");
                self.log(QueryLogEntry {
                    response_code: "SERVFAIL".to_string(),
                    ..Self::base_log(request, start)
                });
                self.encoder
                    .encode_rcode(&request.wire, Rcode::ServFail)
                    .unwrap_or_default()
            }
        }
    }
}
