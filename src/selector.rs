//! Agent selector.
//!
//! `probe_context` builds the ordered candidate sequence of context-style
//! identifiers a request could match; `resolve_candidate` walks that
//! sequence against the registration table, applying the same >32-byte MD5
//! substitution used for long community names.

use crate::util::hash_if_long;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    UdpV4,
    UdpV6,
    Unix,
}

#[derive(Debug, Clone)]
pub struct ProbeInput {
    pub transport_domain: Vec<u32>,
    pub transport_kind: TransportKind,
    /// Pre-formatted peer address: dotted IPv4, colon-separated IPv6, or a
    /// Unix socket path, as produced by the transport layer.
    pub transport_address: String,
    pub context_engine_id: String,
    pub context_name: String,
}

/// Build the full tried-in-order candidate sequence: the primary
/// sequence, then a second pass with `context_engine_id` cleared when
/// it was non-empty (the legacy-layout fallback).
pub fn probe_context(input: &ProbeInput) -> Vec<String> {
    let mut out = Vec::new();
    generate_sequence(input, true, &mut out);
    if !input.context_engine_id.is_empty() {
        generate_sequence(input, false, &mut out);
    }
    out
}

fn generate_sequence(input: &ProbeInput, include_engine_id: bool, out: &mut Vec<String>) {
    let transport_domain_dotted = input
        .transport_domain
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".");

    let transport_specific = match input.transport_kind {
        TransportKind::UdpV4 | TransportKind::Unix => input.transport_address.clone(),
        TransportKind::UdpV6 => input.transport_address.replace(':', "_"),
    };

    let mut components = Vec::new();
    if include_engine_id && !input.context_engine_id.is_empty() {
        components.push(input.context_engine_id.clone());
    }
    components.push(input.context_name.clone());
    components.push(transport_domain_dotted);
    components.push(transport_specific);

    let mut components: Vec<String> = components.into_iter().filter(|c| !c.is_empty()).collect();

    while !components.is_empty() {
        out.push(components.join("/"));
        components.pop();
    }
}

/// Walk `candidates` in order, hashing any candidate longer than 32 bytes,
/// and return the first one `is_registered` accepts. Falls back to the
/// request's own `context_name` (hashed the same way) before giving up.
pub fn resolve_candidate(
    candidates: &[String],
    context_name: &str,
    is_registered: impl Fn(&str) -> bool,
) -> Option<String> {
    for candidate in candidates {
        let key = hash_if_long(candidate);
        if is_registered(&key) {
            return Some(key);
        }
    }

    let key = hash_if_long(context_name);
    if is_registered(&key) {
        return Some(key);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> ProbeInput {
        ProbeInput {
            transport_domain: vec![1, 3, 6, 1, 6, 1, 1],
            transport_kind: TransportKind::UdpV4,
            transport_address: "127.0.0.1".to_string(),
            context_engine_id: String::new(),
            context_name: "public".to_string(),
        }
    }

    #[test]
    fn yields_progressively_shorter_candidates() {
        let candidates = probe_context(&sample_input());
        assert_eq!(
            candidates[0],
            "public/1.3.6.1.6.1.1/127.0.0.1"
        );
        assert_eq!(candidates[1], "public/1.3.6.1.6.1.1");
        assert_eq!(candidates[2], "public");
    }

    #[test]
    fn ipv6_colons_become_underscores() {
        let mut input = sample_input();
        input.transport_kind = TransportKind::UdpV6;
        input.transport_address = "::1".to_string();
        let candidates = probe_context(&input);
        assert!(candidates[0].ends_with("__1"));
    }

    #[test]
    fn engine_id_triggers_legacy_fallback_pass() {
        let mut input = sample_input();
        input.context_engine_id = "8000000001020304".to_string();
        let candidates = probe_context(&input);
        assert!(candidates
            .iter()
            .any(|c| c.starts_with("8000000001020304/")));
        assert!(candidates.iter().any(|c| c == "public"));
    }

    #[test]
    fn resolve_picks_first_registered_candidate() {
        let candidates = vec![
            "public/1.3.6.1.6.1.1/127.0.0.1".to_string(),
            "public/1.3.6.1.6.1.1".to_string(),
            "public".to_string(),
        ];
        let registered = |k: &str| k == "public";
        let resolved = resolve_candidate(&candidates, "public", registered);
        assert_eq!(resolved, Some("public".to_string()));
    }

    #[test]
    fn resolve_falls_back_to_context_name() {
        let candidates = vec!["unmatched/one".to_string()];
        let registered = |k: &str| k == "public";
        let resolved = resolve_candidate(&candidates, "public", registered);
        assert_eq!(resolved, Some("public".to_string()));
    }

    #[test]
    fn resolve_returns_none_when_nothing_matches() {
        let candidates = vec!["unmatched".to_string()];
        let registered = |_: &str| false;
        let resolved = resolve_candidate(&candidates, "also-unmatched", registered);
        assert_eq!(resolved, None);
    }

    #[test]
    fn long_candidate_is_hashed_before_lookup() {
        let long_name = "x".repeat(40);
        let candidates = vec![long_name.clone()];
        let seen = std::cell::RefCell::new(Vec::new());
        let registered = |k: &str| {
            seen.borrow_mut().push(k.to_string());
            false
        };
        resolve_candidate(&candidates, "public", registered);
        assert_ne!(seen.borrow()[0], long_name);
        assert_eq!(seen.borrow()[0].len(), 32);
    }
}
