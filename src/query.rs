//! Query name parsing for the authoritative zone.
//!
//! Names take the form `<service>.<namespace>.<zone>.`; anything that does
//! not carry the zone suffix belongs to the next handler in the chain.

/// A query name decomposed into its service and namespace labels.
///
/// Both labels are guaranteed non-empty when parsing succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// First label: the registered service name.
    pub service: String,
    /// Second label: the namespace the service is registered under.
    pub namespace: String,
}

/// Parse a query name against the configured zone.
///
/// Strips the zone suffix (matched case-insensitively at a label boundary)
/// and splits the remainder into labels: the first is the service name, the
/// second the namespace. Labels beyond the second are ignored. Returns
/// `None` for names outside the zone, for the zone apex, and for names with
/// fewer than two labels before the zone — the caller must delegate those.
pub fn parse(qname: &str, zone: &str) -> Option<ParsedQuery> {
    let name = qname.trim_end_matches('.');
    let zone = zone.trim_matches('.');
    if zone.is_empty() {
        return None;
    }

    let suffix = format!(".{}", zone.to_ascii_lowercase());
    if !name.to_ascii_lowercase().ends_with(&suffix) {
        return None;
    }

    let rest = &name[..name.len() - suffix.len()];
    let mut labels = rest.split('.').filter(|l| !l.is_empty());
    let service = labels.next()?;
    let namespace = labels.next()?;

    Some(ParsedQuery {
        service: service.to_string(),
        namespace: namespace.to_string(),
    })
}
