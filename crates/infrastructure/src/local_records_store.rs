//! Local-records authoritative store (spec §4.5).
//!
//! Two tables — exact names and one-label wildcards — held behind a single
//! `ArcSwap`, the same atomic-snapshot idiom as the pattern store: reload
//! validates the whole incoming record set and swaps it in as one unit, so
//! a reader never observes a half-applied zone.

use glory_hole_application::ports::{LocalLookupOutcome, LocalRecordsPort};
use glory_hole_domain::{DnsError, DomainName, LocalRecord, RecordData, RecordType};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

struct State {
    exact: FxHashMap<DomainName, Vec<LocalRecord>>,
    wildcards: Vec<LocalRecord>,
}

impl State {
    fn empty() -> Self {
        Self {
            exact: FxHashMap::default(),
            wildcards: Vec::new(),
        }
    }

    fn lookup_exact(&self, name: &str, qtype: RecordType) -> Vec<LocalRecord> {
        self.exact
            .get(&DomainName::from_normalized(name))
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.enabled && r.record_type() == qtype)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lookup_cname(&self, name: &str) -> Option<LocalRecord> {
        self.exact
            .get(&DomainName::from_normalized(name))
            .and_then(|records| records.iter().find(|r| r.enabled && r.record_type() == RecordType::CNAME))
            .cloned()
    }

    fn lookup_wildcard(&self, name: &str, qtype: RecordType) -> Vec<LocalRecord> {
        self.wildcards
            .iter()
            .filter(|r| r.enabled && r.record_type() == qtype && glory_hole_domain::wildcard_matches(name, r.name.as_str()))
            .cloned()
            .collect()
    }

    fn lookup(&self, name: &str, qtype: RecordType) -> Vec<LocalRecord> {
        let exact = self.lookup_exact(name, qtype);
        if !exact.is_empty() {
            return exact;
        }
        self.lookup_wildcard(name, qtype)
    }
}

/// Sort MX ascending by preference, SRV ascending by priority then
/// descending by weight; both sorts are stable (spec §9's open-question
/// decision) so equal-rank entries keep insertion order.
fn apply_ordering(records: &mut [LocalRecord]) {
    if records.is_empty() {
        return;
    }
    match &records[0].data {
        RecordData::Mx { .. } => records.sort_by_key(|r| match r.data {
            RecordData::Mx { preference, .. } => preference,
            _ => u16::MAX,
        }),
        RecordData::Srv { .. } => records.sort_by(|a, b| {
            let (ap, aw) = match a.data {
                RecordData::Srv { priority, weight, .. } => (priority, weight),
                _ => (u16::MAX, 0),
            };
            let (bp, bw) = match b.data {
                RecordData::Srv { priority, weight, .. } => (priority, weight),
                _ => (u16::MAX, 0),
            };
            ap.cmp(&bp).then(bw.cmp(&aw))
        }),
        _ => {}
    }
}

fn validate_record_set(records: &[LocalRecord]) -> Result<(), DnsError> {
    let mut by_name: FxHashMap<&DomainName, Vec<&LocalRecord>> = FxHashMap::default();
    for record in records {
        record.validate()?;
        by_name.entry(&record.name).or_default().push(record);
    }
    for (name, group) in by_name {
        let cname_count = group.iter().filter(|r| r.record_type() == RecordType::CNAME).count();
        if cname_count > 1 {
            return Err(DnsError::CnameConflict(name.as_str().to_string()));
        }
        if cname_count == 1 && group.len() > 1 {
            return Err(DnsError::CnameConflict(name.as_str().to_string()));
        }
    }
    Ok(())
}

pub struct LocalRecordsStore {
    state: RwLock<State>,
    count: AtomicUsize,
}

impl LocalRecordsStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::empty()),
            count: AtomicUsize::new(0),
        }
    }
}

impl Default for LocalRecordsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRecordsPort for LocalRecordsStore {
    fn resolve(&self, name: &str, qtype: RecordType, max_chain_depth: u32) -> Result<LocalLookupOutcome, DnsError> {
        let state = self.state.read().unwrap();
        let mut visited = rustc_hash::FxHashSet::default();
        let mut chain = Vec::new();
        let mut current = DomainName::normalize(name);

        for _ in 0..=max_chain_depth {
            if !visited.insert(current.clone()) {
                return Err(DnsError::CnameLoop);
            }

            let mut direct = state.lookup(current.as_str(), qtype);
            if !direct.is_empty() {
                apply_ordering(&mut direct);
                chain.extend(direct);
                return Ok(LocalLookupOutcome::Resolved(chain));
            }

            match state.lookup_cname(current.as_str()) {
                Some(cname_record) => {
                    let target = match &cname_record.data {
                        RecordData::Cname(target) => target.clone(),
                        _ => unreachable!("lookup_cname only returns CNAME records"),
                    };
                    chain.push(cname_record);
                    current = target;
                }
                None => {
                    return if chain.is_empty() {
                        Err(DnsError::LocalLookupMiss)
                    } else {
                        Ok(LocalLookupOutcome::PartialChain {
                            chain,
                            escape_target: current,
                        })
                    };
                }
            }
        }

        Err(DnsError::CnameChainOverflow)
    }

    fn reload(&self, records: Vec<LocalRecord>) -> Result<(), DnsError> {
        validate_record_set(&records)?;

        let mut exact: FxHashMap<DomainName, Vec<LocalRecord>> = FxHashMap::default();
        let mut wildcards = Vec::new();
        for record in records {
            if record.wildcard {
                wildcards.push(record);
            } else {
                exact.entry(record.name.clone()).or_default().push(record);
            }
        }

        let count = exact.values().map(Vec::len).sum::<usize>() + wildcards.len();
        *self.state.write().unwrap() = State { exact, wildcards };
        self.count.store(count, Ordering::Relaxed);
        Ok(())
    }

    fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> DomainName {
        DomainName::normalize(s)
    }

    #[test]
    fn resolves_direct_a_record() {
        let store = LocalRecordsStore::new();
        store
            .reload(vec![LocalRecord::new(name("nas.local"), 300, RecordData::A(Ipv4Addr::new(192, 168, 1, 100)))])
            .unwrap();
        let outcome = store.resolve("nas.local.", RecordType::A, 10).unwrap();
        match outcome {
            LocalLookupOutcome::Resolved(records) => assert_eq!(records.len(), 1),
            _ => panic!("expected a direct resolution"),
        }
    }

    #[test]
    fn follows_cname_chain_to_local_target() {
        let store = LocalRecordsStore::new();
        store
            .reload(vec![
                LocalRecord::new(name("a.local"), 60, RecordData::Cname(name("b.local"))),
                LocalRecord::new(name("b.local"), 60, RecordData::Cname(name("c.local"))),
                LocalRecord::new(name("c.local"), 600, RecordData::A(Ipv4Addr::new(10, 0, 0, 1))),
            ])
            .unwrap();
        let outcome = store.resolve("a.local.", RecordType::A, 10).unwrap();
        match outcome {
            LocalLookupOutcome::Resolved(records) => assert_eq!(records.len(), 3),
            _ => panic!("expected a fully resolved chain"),
        }
    }

    #[test]
    fn chain_escaping_local_store_returns_partial_chain() {
        let store = LocalRecordsStore::new();
        store
            .reload(vec![LocalRecord::new(name("alias.local"), 60, RecordData::Cname(name("upstream.example.com")))])
            .unwrap();
        let outcome = store.resolve("alias.local.", RecordType::A, 10).unwrap();
        match outcome {
            LocalLookupOutcome::PartialChain { chain, escape_target } => {
                assert_eq!(chain.len(), 1);
                assert_eq!(escape_target.as_str(), "upstream.example.com.");
            }
            _ => panic!("expected a partial chain"),
        }
    }

    #[test]
    fn cyclic_cname_returns_loop_error_without_hanging() {
        let store = LocalRecordsStore::new();
        store
            .reload(vec![
                LocalRecord::new(name("x.local"), 60, RecordData::Cname(name("y.local"))),
                LocalRecord::new(name("y.local"), 60, RecordData::Cname(name("x.local"))),
            ])
            .unwrap();
        let result = store.resolve("x.local.", RecordType::A, 10);
        assert!(matches!(result, Err(DnsError::CnameLoop)));
    }

    #[test]
    fn cname_cannot_coexist_with_other_types_at_same_name() {
        let store = LocalRecordsStore::new();
        let result = store.reload(vec![
            LocalRecord::new(name("dup.local"), 60, RecordData::Cname(name("target.local"))),
            LocalRecord::new(name("dup.local"), 60, RecordData::A(Ipv4Addr::LOCALHOST)),
        ]);
        assert!(matches!(result, Err(DnsError::CnameConflict(_))));
    }

    #[test]
    fn mx_results_sorted_ascending_by_preference() {
        let store = LocalRecordsStore::new();
        store
            .reload(vec![
                LocalRecord::new(name("example.com"), 300, RecordData::Mx { preference: 20, exchange: name("b.example.com") }),
                LocalRecord::new(name("example.com"), 300, RecordData::Mx { preference: 10, exchange: name("a.example.com") }),
            ])
            .unwrap();
        let outcome = store.resolve("example.com.", RecordType::MX, 10).unwrap();
        let LocalLookupOutcome::Resolved(records) = outcome else { panic!("expected resolved") };
        let prefs: Vec<u16> = records
            .iter()
            .map(|r| match r.data {
                RecordData::Mx { preference, .. } => preference,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(prefs, vec![10, 20]);
    }

    #[test]
    fn wildcard_one_label_match_serves_when_exact_table_misses() {
        let store = LocalRecordsStore::new();
        store
            .reload(vec![LocalRecord::new(name("*.lan.example.com"), 60, RecordData::A(Ipv4Addr::new(10, 1, 1, 1)))])
            .unwrap();
        let outcome = store.resolve("printer.lan.example.com.", RecordType::A, 10).unwrap();
        assert!(matches!(outcome, LocalLookupOutcome::Resolved(_)));
        assert!(store.resolve("lan.example.com.", RecordType::A, 10).is_err());
    }
}
