use thiserror::Error;

/// Coarse classification used for log labels and counters. Mirrors the
/// "Kind" column of the error-handling table: every recoverable failure on
/// the query path degrades to a wire-visible RCODE, never a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedRequest,
    RateLimited,
    LocalLookupMiss,
    CnameChainOverflow,
    CnameLoop,
    PolicyCompile,
    UpstreamTimeout,
    UpstreamRefused,
    UpstreamServfail,
    LogBufferFull,
    LogWriteFailure,
    BlocklistReloadFailure,
    ShutdownDeadlineExceeded,
    Panic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "malformed_request",
            Self::RateLimited => "rate_limited",
            Self::LocalLookupMiss => "local_lookup_miss",
            Self::CnameChainOverflow => "cname_chain_overflow",
            Self::CnameLoop => "cname_loop",
            Self::PolicyCompile => "policy_compile",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamRefused => "upstream_refused",
            Self::UpstreamServfail => "upstream_servfail",
            Self::LogBufferFull => "log_buffer_full",
            Self::LogWriteFailure => "log_write_failure",
            Self::BlocklistReloadFailure => "blocklist_reload_failure",
            Self::ShutdownDeadlineExceeded => "shutdown_deadline_exceeded",
            Self::Panic => "panic",
        }
    }
}

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("invalid IP address for record type: {0}")]
    InvalidIpAddress(String),

    #[error("empty mandatory target for record")]
    EmptyTarget,

    #[error("SRV record requires a non-zero port")]
    MissingSrvPort,

    #[error("TXT string exceeds 255 octets")]
    TxtStringTooLong,

    #[error("invalid CAA tag: {0}")]
    InvalidCaaTag(String),

    #[error("CNAME conflicts with existing record at {0}")]
    CnameConflict(String),

    #[error("local lookup miss")]
    LocalLookupMiss,

    #[error("CNAME chain exceeded max depth")]
    CnameChainOverflow,

    #[error("CNAME chain contains a loop")]
    CnameLoop,

    #[error("policy rule '{0}' failed to compile: {1}")]
    PolicyCompile(String, String),

    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    #[error("upstream timed out")]
    UpstreamTimeout,

    #[error("upstream connection refused: {0}")]
    UpstreamRefused(String),

    #[error("all upstreams exhausted")]
    UpstreamsExhausted,

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl DnsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::LocalLookupMiss => ErrorKind::LocalLookupMiss,
            Self::CnameChainOverflow => ErrorKind::CnameChainOverflow,
            Self::CnameLoop => ErrorKind::CnameLoop,
            Self::PolicyCompile(..) => ErrorKind::PolicyCompile,
            Self::UpstreamTimeout => ErrorKind::UpstreamTimeout,
            Self::UpstreamRefused(_) => ErrorKind::UpstreamRefused,
            Self::UpstreamsExhausted => ErrorKind::UpstreamServfail,
            Self::Database(_) | Self::Io(_) => ErrorKind::LogWriteFailure,
            Self::Config(_) => ErrorKind::BlocklistReloadFailure,
            Self::InvalidDomainName(_)
            | Self::InvalidIpAddress(_)
            | Self::EmptyTarget
            | Self::MissingSrvPort
            | Self::TxtStringTooLong
            | Self::InvalidCaaTag(_)
            | Self::CnameConflict(_)
            | Self::InvalidCidr(_) => ErrorKind::MalformedRequest,
        }
    }
}
