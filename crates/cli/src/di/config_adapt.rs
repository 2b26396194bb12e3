//! Translates the typed config DTOs (`glory_hole_domain::config::*`) into
//! the plain domain values the core's ports take. This is the one place
//! allowed to know about the TOML-shaped config structs; every use case
//! and port downstream only ever sees `LocalRecord`, `RateLimitOverride`,
//! and the policy engine's `(name, logic, action, action_data, enabled)`
//! tuples, per the core's own non-goal of owning config parsing itself.

use glory_hole_domain::config::{LocalRecordConfig, PolicyRuleConfig, RateLimitOverrideConfig};
use glory_hole_domain::{
    DnsError, DomainName, LocalRecord, PolicyAction, RateLimitAction, RateLimitOverride, RecordData,
};
use ipnetwork::IpNetwork;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub fn local_record_from_config(cfg: &LocalRecordConfig) -> Result<LocalRecord, DnsError> {
    let name = DomainName::normalize(&cfg.name);
    let record_type = cfg
        .record_type
        .parse()
        .map_err(|e: String| DnsError::Config(format!("local record '{}': {e}", cfg.name)))?;

    let data = match record_type {
        glory_hole_domain::RecordType::A => {
            let addr = Ipv4Addr::from_str(&cfg.value).map_err(|e| DnsError::Config(format!("local record '{}': invalid A value: {e}", cfg.name)))?;
            RecordData::A(addr)
        }
        glory_hole_domain::RecordType::AAAA => {
            let addr = Ipv6Addr::from_str(&cfg.value).map_err(|e| DnsError::Config(format!("local record '{}': invalid AAAA value: {e}", cfg.name)))?;
            RecordData::Aaaa(addr)
        }
        glory_hole_domain::RecordType::CNAME => RecordData::Cname(DomainName::normalize(&cfg.value)),
        glory_hole_domain::RecordType::NS => RecordData::Ns(DomainName::normalize(&cfg.value)),
        glory_hole_domain::RecordType::PTR => RecordData::Ptr(DomainName::normalize(&cfg.value)),
        glory_hole_domain::RecordType::TXT => RecordData::Txt(vec![cfg.value.clone()]),
        glory_hole_domain::RecordType::MX => RecordData::Mx {
            preference: cfg.priority.unwrap_or(10),
            exchange: DomainName::normalize(&cfg.value),
        },
        glory_hole_domain::RecordType::SRV => RecordData::Srv {
            priority: cfg.priority.unwrap_or(0),
            weight: cfg.weight.unwrap_or(0),
            port: cfg.port.ok_or_else(|| DnsError::Config(format!("local record '{}': SRV requires a port", cfg.name)))?,
            target: DomainName::normalize(&cfg.value),
        },
        other => return Err(DnsError::Config(format!("local record '{}': unsupported record type {other:?} in configuration", cfg.name))),
    };

    let mut record = LocalRecord::new(name, cfg.ttl, data);
    record.validate()?;
    Ok(record)
}

pub fn rate_limit_override_from_config(cfg: &RateLimitOverrideConfig) -> Result<RateLimitOverride, DnsError> {
    let cidr = IpNetwork::from_str(&cfg.cidr).map_err(|e| DnsError::Config(format!("rate limit override '{}': invalid CIDR: {e}", cfg.cidr)))?;
    Ok(RateLimitOverride {
        cidr,
        requests_per_second: cfg.requests_per_second,
        burst: cfg.burst,
        on_exceed: on_exceed_action(cfg.on_exceed),
    })
}

pub fn on_exceed_action(action: glory_hole_domain::config::OnExceedAction) -> RateLimitAction {
    match action {
        glory_hole_domain::config::OnExceedAction::Drop => RateLimitAction::Drop,
        glory_hole_domain::config::OnExceedAction::Delay => RateLimitAction::Delay,
        glory_hole_domain::config::OnExceedAction::Nxdomain => RateLimitAction::Nxdomain,
    }
}

pub fn policy_rule_source(cfg: &PolicyRuleConfig) -> Result<(String, String, PolicyAction, Option<String>, bool), DnsError> {
    let action = match cfg.action.to_ascii_lowercase().as_str() {
        "block" => PolicyAction::Block,
        "allow" => PolicyAction::Allow,
        "redirect" => PolicyAction::Redirect,
        other => return Err(DnsError::Config(format!("policy rule '{}': unknown action '{other}'", cfg.name))),
    };
    Ok((cfg.name.clone(), cfg.logic.clone(), action, cfg.action_data.clone(), cfg.enabled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glory_hole_domain::config::OnExceedAction;

    fn cfg(record_type: &str, value: &str) -> LocalRecordConfig {
        LocalRecordConfig {
            name: "example.com".to_string(),
            record_type: record_type.to_string(),
            ttl: 300,
            value: value.to_string(),
            priority: None,
            weight: None,
            port: None,
        }
    }

    #[test]
    fn a_record_parses_into_local_record() {
        let record = local_record_from_config(&cfg("A", "192.0.2.1")).unwrap();
        assert_eq!(record.data, RecordData::A(Ipv4Addr::new(192, 0, 2, 1)));
    }

    #[test]
    fn invalid_address_is_rejected() {
        assert!(local_record_from_config(&cfg("A", "not-an-ip")).is_err());
    }

    #[test]
    fn srv_without_port_is_rejected() {
        assert!(local_record_from_config(&cfg("SRV", "target.example.com")).is_err());
    }

    #[test]
    fn on_exceed_action_maps_every_variant() {
        assert_eq!(on_exceed_action(OnExceedAction::Drop), RateLimitAction::Drop);
        assert_eq!(on_exceed_action(OnExceedAction::Delay), RateLimitAction::Delay);
        assert_eq!(on_exceed_action(OnExceedAction::Nxdomain), RateLimitAction::Nxdomain);
    }
}
