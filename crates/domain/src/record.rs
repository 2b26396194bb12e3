use crate::domain_name::DomainName;
use crate::errors::DnsError;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Question/record types the local store and cache reason about directly.
/// Anything else is forwarded transparently (spec §6): no local resolution,
/// no type-specific policy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    TXT,
    PTR,
    SRV,
    NS,
    SOA,
    CAA,
    Other(u16),
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::PTR => "PTR",
            Self::SRV => "SRV",
            Self::NS => "NS",
            Self::SOA => "SOA",
            Self::CAA => "CAA",
            Self::Other(_) => "OTHER",
        }
    }

    pub fn to_u16(&self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::PTR => 12,
            Self::MX => 15,
            Self::TXT => 16,
            Self::AAAA => 28,
            Self::SRV => 33,
            Self::CAA => 257,
            Self::Other(code) => *code,
        }
    }

    pub fn from_u16(code: u16) -> Self {
        match code {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            33 => Self::SRV,
            257 => Self::CAA,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::AAAA),
            "CNAME" => Ok(Self::CNAME),
            "MX" => Ok(Self::MX),
            "TXT" => Ok(Self::TXT),
            "PTR" => Ok(Self::PTR),
            "SRV" => Ok(Self::SRV),
            "NS" => Ok(Self::NS),
            "SOA" => Ok(Self::SOA),
            "CAA" => Ok(Self::CAA),
            other => Err(format!("unknown record type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaaTag {
    Issue,
    IssueWild,
    Iodef,
}

impl CaaTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::IssueWild => "issuewild",
            Self::Iodef => "iodef",
        }
    }
}

impl FromStr for CaaTag {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue" => Ok(Self::Issue),
            "issuewild" => Ok(Self::IssueWild),
            "iodef" => Ok(Self::Iodef),
            other => Err(DnsError::InvalidCaaTag(other.to_string())),
        }
    }
}

/// Type-specific payload of a `LocalRecord`. Replaces type-by-inheritance
/// polymorphism (spec §9) with a tagged union filtered by lookup callers.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(DomainName),
    Mx { preference: u16, exchange: DomainName },
    Txt(Vec<String>),
    Ptr(DomainName),
    Srv { priority: u16, weight: u16, port: u16, target: DomainName },
    Ns(DomainName),
    Soa { primary_ns: DomainName, mailbox: DomainName, serial: u32, refresh: u32, retry: u32, expire: u32, minimum: u32 },
    Caa { flag: u8, tag: CaaTag, value: String },
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::Aaaa(_) => RecordType::AAAA,
            Self::Cname(_) => RecordType::CNAME,
            Self::Mx { .. } => RecordType::MX,
            Self::Txt(_) => RecordType::TXT,
            Self::Ptr(_) => RecordType::PTR,
            Self::Srv { .. } => RecordType::SRV,
            Self::Ns(_) => RecordType::NS,
            Self::Soa { .. } => RecordType::SOA,
            Self::Caa { .. } => RecordType::CAA,
        }
    }
}

/// One authoritative record in the local zone. `enabled` lets an operator
/// disable a record without deleting it; `wildcard` marks one-label
/// wildcard entries (spec §4.5) that are tried only when the exact-name
/// table has no match for (name, type).
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRecord {
    pub name: DomainName,
    pub ttl: u32,
    pub enabled: bool,
    pub wildcard: bool,
    pub data: RecordData,
}

impl LocalRecord {
    pub fn new(name: DomainName, ttl: u32, data: RecordData) -> Self {
        let wildcard = name.as_str().starts_with("*.");
        Self {
            name,
            ttl,
            enabled: true,
            wildcard,
            data,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    /// Validate the invariants spec §4.5 lists at insert time. Does not
    /// check CNAME-exclusivity or uniqueness — those require seeing the
    /// rest of the store and are enforced by the local-records store
    /// itself, not by a single record in isolation.
    pub fn validate(&self) -> Result<(), DnsError> {
        match &self.data {
            RecordData::Mx { exchange, .. } if exchange.as_str().is_empty() => Err(DnsError::EmptyTarget),
            RecordData::Srv { port, target, .. } => {
                if *port == 0 {
                    Err(DnsError::MissingSrvPort)
                } else if target.as_str().is_empty() {
                    Err(DnsError::EmptyTarget)
                } else {
                    Ok(())
                }
            }
            RecordData::Txt(strings) => {
                if strings.iter().any(|s| s.len() > 255) {
                    Err(DnsError::TxtStringTooLong)
                } else {
                    Ok(())
                }
            }
            RecordData::Ptr(target) | RecordData::Ns(target) | RecordData::Cname(target) => {
                if target.as_str().is_empty() {
                    Err(DnsError::EmptyTarget)
                } else {
                    Ok(())
                }
            }
            RecordData::Soa { primary_ns, mailbox, .. } => {
                if primary_ns.as_str().is_empty() || mailbox.as_str().is_empty() {
                    Err(DnsError::EmptyTarget)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> DomainName {
        DomainName::normalize(s)
    }

    #[test]
    fn srv_requires_nonzero_port() {
        let rec = LocalRecord::new(
            name("_sip._tcp.example.com"),
            300,
            RecordData::Srv { priority: 0, weight: 0, port: 0, target: name("sip.example.com") },
        );
        assert!(matches!(rec.validate(), Err(DnsError::MissingSrvPort)));
    }

    #[test]
    fn txt_rejects_oversized_strings() {
        let rec = LocalRecord::new(name("example.com"), 300, RecordData::Txt(vec!["x".repeat(256)]));
        assert!(matches!(rec.validate(), Err(DnsError::TxtStringTooLong)));
    }

    #[test]
    fn caa_tag_parses_known_values() {
        assert_eq!("issue".parse::<CaaTag>().unwrap(), CaaTag::Issue);
        assert_eq!("issuewild".parse::<CaaTag>().unwrap(), CaaTag::IssueWild);
        assert_eq!("iodef".parse::<CaaTag>().unwrap(), CaaTag::Iodef);
        assert!("bogus".parse::<CaaTag>().is_err());
    }

    #[test]
    fn wildcard_flag_set_from_leading_label() {
        let rec = LocalRecord::new(name("*.lan.example.com"), 60, RecordData::A(Ipv4Addr::LOCALHOST));
        assert!(rec.wildcard);
    }
}
