//! Record synthesis from registry service instances.
//!
//! Builds protocol-correct answer and additional sections for the supported
//! query types, plus the negative SOA used for authoritative name errors.

use hickory_proto::rr::rdata::{A, AAAA, SOA, SRV};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use std::net::IpAddr;

use crate::error::DnsError;
use crate::registry::ServiceInstance;

/// Fixed SRV priority; the registry carries no load-aware weighting.
const SRV_PRIORITY: u16 = 10;
/// Fixed SRV weight.
const SRV_WEIGHT: u16 = 10;

const SOA_SERIAL: u32 = 0;
const SOA_REFRESH: i32 = 3600;
const SOA_RETRY: i32 = 600;
const SOA_EXPIRE: i32 = 86400;
const SOA_MINIMUM: u32 = 30;

/// The closed set of query types answered from registry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRecordType {
    /// IPv4 address records.
    A,
    /// IPv6 address records.
    Aaaa,
    /// Service locator records with address additionals.
    Srv,
}

impl ServiceRecordType {
    /// Map a wire query type onto the supported set. `None` means the
    /// caller must answer NOTIMP.
    pub fn from_query_type(qtype: RecordType) -> Option<Self> {
        match qtype {
            RecordType::A => Some(Self::A),
            RecordType::AAAA => Some(Self::Aaaa),
            RecordType::SRV => Some(Self::Srv),
            _ => None,
        }
    }
}

/// Answer and additional sections synthesized for one query.
#[derive(Debug, Default)]
pub struct SynthesizedRecords {
    /// Records for the answer section.
    pub answers: Vec<Record>,
    /// Records for the additional section.
    pub additionals: Vec<Record>,
}

fn record(name: Name, ttl: u32, rdata: RData) -> Record {
    let mut record = Record::from_rdata(name, ttl, rdata);
    record.set_dns_class(DNSClass::IN);
    record
}

/// Build the answer set for `qtype` from the given instances.
///
/// Addresses are parsed up front; a single malformed address fails the whole
/// synthesis, so a response never carries a partial answer set. A and AAAA
/// answers are filtered to the matching address family; SRV answers cover
/// every instance, with one A or AAAA additional each, chosen by family.
pub fn synthesize(
    qtype: ServiceRecordType,
    instances: &[ServiceInstance],
    qname: &Name,
    ttl: u32,
) -> Result<SynthesizedRecords, DnsError> {
    let addrs = instances
        .iter()
        .map(|instance| {
            instance
                .address
                .parse::<IpAddr>()
                .map(|addr| (addr, instance))
                .map_err(|_| DnsError::InvalidAddress(instance.address.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = SynthesizedRecords::default();

    match qtype {
        ServiceRecordType::A => {
            for (addr, _) in &addrs {
                if let IpAddr::V4(v4) = addr {
                    out.answers
                        .push(record(qname.clone(), ttl, RData::A(A::from(*v4))));
                }
            }
        }
        ServiceRecordType::Aaaa => {
            for (addr, _) in &addrs {
                if let IpAddr::V6(v6) = addr {
                    out.answers
                        .push(record(qname.clone(), ttl, RData::AAAA(AAAA::from(*v6))));
                }
            }
        }
        ServiceRecordType::Srv => {
            for (addr, instance) in &addrs {
                out.answers.push(record(
                    qname.clone(),
                    ttl,
                    RData::SRV(SRV::new(
                        SRV_PRIORITY,
                        SRV_WEIGHT,
                        instance.port,
                        qname.clone(),
                    )),
                ));
                let extra = match addr {
                    IpAddr::V4(v4) => RData::A(A::from(*v4)),
                    IpAddr::V6(v6) => RData::AAAA(AAAA::from(*v6)),
                };
                out.additionals.push(record(qname.clone(), ttl, extra));
            }
        }
    }

    Ok(out)
}

/// Build the single SOA record attached to an authoritative name error.
///
/// Nameserver is `ns1.<qname>`; the mailbox is the canonical
/// `hostmaster.<zone>`.
pub fn negative_soa(qname: &Name, zone: &str, ttl: u32) -> Result<Record, DnsError> {
    let mname = Name::from_ascii(format!("ns1.{}", qname))?;
    let rname = Name::from_ascii(format!("hostmaster.{}.", zone.trim_matches('.')))?;

    let soa = SOA::new(
        mname,
        rname,
        SOA_SERIAL,
        SOA_REFRESH,
        SOA_RETRY,
        SOA_EXPIRE,
        SOA_MINIMUM,
    );

    Ok(record(qname.clone(), ttl, RData::SOA(soa)))
}
