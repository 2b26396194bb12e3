use crate::domain_name::DomainName;
use crate::record::RecordType;
use std::net::IpAddr;
use std::time::Instant;

/// One incoming query, as handed to the handler after wire parsing. `wire`
/// keeps the original request bytes so the encoder can echo the question
/// section, the transaction ID, and any EDNS0 OPT record the client sent.
/// `deadline` is the point past which the handler must stop waiting on the
/// forwarder and synthesize SERVFAIL (spec §5 "Cancellation").
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub wire: Vec<u8>,
    pub qname: DomainName,
    pub qtype: RecordType,
    pub qclass: u16,
    pub client_ip: IpAddr,
    pub deadline: Instant,
}

impl QueryRequest {
    pub fn new(wire: Vec<u8>, qname: DomainName, qtype: RecordType, qclass: u16, client_ip: IpAddr, deadline: Instant) -> Self {
        Self {
            wire,
            qname,
            qtype,
            qclass,
            client_ip,
            deadline,
        }
    }
}
