//! Wire-format codec (spec §4.10), the only module in the whole crate that
//! knows DNS is bytes on the wire. Built directly on `hickory-proto`'s
//! message codec, the same API the teacher's forwarding module uses to
//! build queries and parse responses — here it also builds answers and
//! rewrites cached ones, which the teacher's resolver-only client never
//! needed to do.

use glory_hole_application::ports::ResponseEncoderPort;
use glory_hole_domain::{CachedResponse, CaaTag, DnsError, DomainName, LocalRecord, QueryRequest, Rcode, RecordData, RecordType};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::{CAA, MX, NS, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{rdata, DNSClass, Name, RData, Record};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;
use std::time::{Instant, SystemTime};
use url::Url;

fn parse(wire: &[u8]) -> Result<Message, DnsError> {
    Message::from_vec(wire).map_err(|e| DnsError::MalformedRequest(format!("failed to parse DNS message: {e}")))
}

fn emit(message: &Message) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| DnsError::MalformedRequest(format!("failed to serialize DNS message: {e}")))?;
    Ok(buf)
}

fn name_of(domain: &DomainName) -> Result<Name, DnsError> {
    Name::from_str(domain.as_str()).map_err(|e| DnsError::InvalidDomainName(format!("{}: {e}", domain.as_str())))
}

fn to_rcode(rcode: Rcode) -> ResponseCode {
    match rcode {
        Rcode::NoError => ResponseCode::NoError,
        Rcode::FormErr => ResponseCode::FormErr,
        Rcode::ServFail => ResponseCode::ServFail,
        Rcode::NxDomain => ResponseCode::NXDomain,
        Rcode::NotImp => ResponseCode::NotImp,
        Rcode::Refused => ResponseCode::Refused,
    }
}

/// Parses a raw datagram or length-prefix-stripped TCP message into a
/// [`QueryRequest`], the only place in the crate that turns wire bytes into
/// the application layer's input type. `wire` is kept verbatim on the
/// resulting request so the encoder can echo the question section, ID, and
/// any EDNS0 OPT record back unchanged.
pub fn parse_query_request(wire: Vec<u8>, client_ip: std::net::IpAddr, deadline: Instant) -> Result<QueryRequest, DnsError> {
    let message = parse(&wire)?;
    let question = message.queries().first().ok_or_else(|| DnsError::MalformedRequest("query has no question section".to_string()))?;
    let qname = DomainName::normalize(&question.name().to_utf8());
    let qtype = RecordType::from_u16(u16::from(question.query_type()));
    let qclass = u16::from(question.query_class());
    Ok(QueryRequest::new(wire, qname, qtype, qclass, client_ip, deadline))
}

fn rdata_of(data: &RecordData) -> Result<RData, DnsError> {
    Ok(match data {
        RecordData::A(ip) => RData::A(rdata::A(*ip)),
        RecordData::Aaaa(ip) => RData::AAAA(rdata::AAAA(*ip)),
        RecordData::Cname(target) => RData::CNAME(rdata::CNAME(name_of(target)?)),
        RecordData::Ns(target) => RData::NS(NS(name_of(target)?)),
        RecordData::Ptr(target) => RData::PTR(PTR(name_of(target)?)),
        RecordData::Mx { preference, exchange } => RData::MX(MX::new(*preference, name_of(exchange)?)),
        RecordData::Txt(strings) => RData::TXT(TXT::new(strings.clone())),
        RecordData::Srv { priority, weight, port, target } => RData::SRV(SRV::new(*priority, *weight, *port, name_of(target)?)),
        RecordData::Soa { primary_ns, mailbox, serial, refresh, retry, expire, minimum } => {
            RData::SOA(SOA::new(name_of(primary_ns)?, name_of(mailbox)?, *serial, *refresh as i32, *retry as i32, *expire as i32, *minimum))
        }
        RecordData::Caa { flag, tag, value } => {
            let critical = flag & 0x80 != 0;
            let caa = match tag {
                CaaTag::Issue => CAA::new_issue(critical, Name::from_str(value).ok(), Vec::new()),
                CaaTag::IssueWild => CAA::new_issuewild(critical, Name::from_str(value).ok(), Vec::new()),
                CaaTag::Iodef => {
                    let url = Url::parse(value).map_err(|e| DnsError::Config(format!("invalid CAA iodef URL '{value}': {e}")))?;
                    CAA::new_iodef(critical, url)
                }
            };
            RData::CAA(caa)
        }
    })
}

fn record_of(local: &LocalRecord) -> Result<Record, DnsError> {
    Ok(Record::from_rdata(name_of(&local.name)?, local.ttl, rdata_of(&local.data)?))
}

fn min_question(message: &Message) -> Option<&Query> {
    message.queries().first()
}

fn base_response(query: &Message) -> Message {
    let mut response = Message::new(query.id(), MessageType::Response, OpCode::Query);
    response.set_recursion_desired(query.recursion_desired());
    response.set_recursion_available(true);
    if let Some(q) = min_question(query) {
        response.add_query(q.clone());
    }
    if let Some(edns) = query.edns() {
        response.set_edns(edns.clone());
    }
    response
}

pub struct HickoryWireCodec;

impl HickoryWireCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HickoryWireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEncoderPort for HickoryWireCodec {
    fn encode_answer(&self, query_wire: &[u8], records: &[LocalRecord]) -> Result<Vec<u8>, DnsError> {
        let query = parse(query_wire)?;
        let mut response = base_response(&query);
        response.set_response_code(ResponseCode::NoError);
        for local in records {
            response.add_answer(record_of(local)?);
        }
        emit(&response)
    }

    fn encode_rcode(&self, query_wire: &[u8], rcode: Rcode) -> Result<Vec<u8>, DnsError> {
        let query = parse(query_wire)?;
        let mut response = base_response(&query);
        response.set_response_code(to_rcode(rcode));
        emit(&response)
    }

    fn encode_spliced_answer(&self, query_wire: &[u8], cname_chain: &[LocalRecord], forwarded_wire: &[u8]) -> Result<Vec<u8>, DnsError> {
        let query = parse(query_wire)?;
        let forwarded = parse(forwarded_wire)?;
        let mut response = base_response(&query);
        response.set_response_code(forwarded.response_code());
        for local in cname_chain {
            response.add_answer(record_of(local)?);
        }
        for record in forwarded.answers() {
            response.add_answer(record.clone());
        }
        emit(&response)
    }

    fn rewrite_cached(&self, cached: &CachedResponse, query_wire: &[u8]) -> Vec<u8> {
        let query_id = if query_wire.len() >= 2 {
            u16::from_be_bytes([query_wire[0], query_wire[1]])
        } else {
            fastrand::u16(..)
        };

        let Ok(original) = Message::from_vec(&cached.wire) else {
            // Cached bytes should always be well-formed (we built them);
            // fall back to the raw bytes with just the ID patched.
            let mut wire = cached.wire.clone();
            if wire.len() >= 2 {
                wire[0..2].copy_from_slice(&query_id.to_be_bytes());
            }
            return wire;
        };

        let remaining = cached.remaining_ttl_secs(SystemTime::now());
        let mut message = Message::new(query_id, MessageType::Response, OpCode::Query);
        message.set_recursion_desired(original.recursion_desired());
        message.set_recursion_available(original.recursion_available());
        message.set_response_code(original.response_code());
        if let Some(q) = min_question(&original) {
            message.add_query(q.clone());
        }
        if let Some(edns) = original.edns() {
            message.set_edns(edns.clone());
        }
        for record in original.answers() {
            message.add_answer(Record::from_rdata(record.name().clone(), remaining, record.data().clone()));
        }

        emit(&message).unwrap_or_else(|_| cached.wire.clone())
    }

    fn answer_min_ttl(&self, wire: &[u8]) -> Option<u32> {
        let message = parse(wire).ok()?;
        message.answers().iter().map(Record::ttl).min()
    }

    fn is_negative_response(&self, wire: &[u8]) -> bool {
        match parse(wire) {
            Ok(message) => message.response_code() == ResponseCode::NXDomain || (message.response_code() == ResponseCode::NoError && message.answer_count() == 0),
            Err(_) => false,
        }
    }

    fn rebuild_query_for(&self, query_wire: &[u8], name: &DomainName) -> Result<Vec<u8>, DnsError> {
        let original = parse(query_wire)?;
        let original_question = min_question(&original).ok_or_else(|| DnsError::MalformedRequest("query has no question section".to_string()))?;

        let mut question = Query::new();
        question.set_name(name_of(name)?);
        question.set_query_type(original_question.query_type());
        question.set_query_class(original_question.query_class());

        let mut message = Message::new();
        message.set_id(fastrand::u16(..));
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(original.recursion_desired());
        message.add_query(question);
        if let Some(edns) = original.edns() {
            message.set_edns(edns.clone());
        }

        emit(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glory_hole_domain::DomainName;
    use std::net::Ipv4Addr;

    fn build_query(domain: &str, qtype: hickory_proto::rr::RecordType) -> Vec<u8> {
        let mut query = Query::new();
        query.set_name(Name::from_str(domain).unwrap());
        query.set_query_type(qtype);
        query.set_query_class(DNSClass::IN);
        let mut message = Message::new();
        message.set_id(0xBEEF);
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);
        emit(&message).unwrap()
    }

    #[test]
    fn encode_answer_round_trips_an_a_record() {
        let codec = HickoryWireCodec::new();
        let query = build_query("example.com.", hickory_proto::rr::RecordType::A);
        let record = LocalRecord::new(DomainName::normalize("example.com."), 300, RecordData::A(Ipv4Addr::new(1, 2, 3, 4)));
        let wire = codec.encode_answer(&query, &[record]).unwrap();
        let parsed = Message::from_vec(&wire).unwrap();
        assert_eq!(parsed.id(), 0xBEEF);
        assert_eq!(parsed.answer_count(), 1);
        assert_eq!(parsed.response_code(), ResponseCode::NoError);
    }

    #[test]
    fn encode_rcode_produces_nxdomain_with_no_answers() {
        let codec = HickoryWireCodec::new();
        let query = build_query("gone.example.", hickory_proto::rr::RecordType::A);
        let wire = codec.encode_rcode(&query, Rcode::NxDomain).unwrap();
        let parsed = Message::from_vec(&wire).unwrap();
        assert_eq!(parsed.response_code(), ResponseCode::NXDomain);
        assert_eq!(parsed.answer_count(), 0);
    }

    #[test]
    fn is_negative_response_detects_nodata_and_nxdomain() {
        let codec = HickoryWireCodec::new();
        let query = build_query("x.example.", hickory_proto::rr::RecordType::A);
        let nxdomain = codec.encode_rcode(&query, Rcode::NxDomain).unwrap();
        let noerror_empty = codec.encode_rcode(&query, Rcode::NoError).unwrap();
        assert!(codec.is_negative_response(&nxdomain));
        assert!(codec.is_negative_response(&noerror_empty));
    }

    #[test]
    fn answer_min_ttl_picks_the_smallest_ttl() {
        let codec = HickoryWireCodec::new();
        let query = build_query("multi.example.", hickory_proto::rr::RecordType::A);
        let records = vec![
            LocalRecord::new(DomainName::normalize("multi.example."), 600, RecordData::A(Ipv4Addr::new(1, 1, 1, 1))),
            LocalRecord::new(DomainName::normalize("multi.example."), 60, RecordData::A(Ipv4Addr::new(2, 2, 2, 2))),
        ];
        let wire = codec.encode_answer(&query, &records).unwrap();
        assert_eq!(codec.answer_min_ttl(&wire), Some(60));
    }

    #[test]
    fn rebuild_query_for_preserves_type_and_class() {
        let codec = HickoryWireCodec::new();
        let query = build_query("alias.example.", hickory_proto::rr::RecordType::AAAA);
        let rebuilt = codec.rebuild_query_for(&query, &DomainName::normalize("target.example.")).unwrap();
        let parsed = Message::from_vec(&rebuilt).unwrap();
        let q = &parsed.queries()[0];
        assert_eq!(q.name().to_utf8(), "target.example.");
        assert_eq!(q.query_type(), hickory_proto::rr::RecordType::AAAA);
    }

    #[test]
    fn rewrite_cached_overwrites_transaction_id_and_shrinks_ttl() {
        let codec = HickoryWireCodec::new();
        let query = build_query("cached.example.", hickory_proto::rr::RecordType::A);
        let record = LocalRecord::new(DomainName::normalize("cached.example."), 300, RecordData::A(Ipv4Addr::new(9, 9, 9, 9)));
        let answer_wire = codec.encode_answer(&query, &[record]).unwrap();
        let now = SystemTime::now();
        let cached = CachedResponse::new(answer_wire, std::time::Duration::from_secs(300), now, false);

        let mut new_query = build_query("cached.example.", hickory_proto::rr::RecordType::A);
        new_query[0] = 0xAB;
        new_query[1] = 0xCD;

        let rewritten = codec.rewrite_cached(&cached, &new_query);
        let parsed = Message::from_vec(&rewritten).unwrap();
        assert_eq!(parsed.id(), 0xABCD);
        assert!(parsed.answers()[0].ttl() <= 300);
    }
}
