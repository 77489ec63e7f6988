//! The request-context record threaded through grammar evaluation, the
//! lookup engine and variation modules.
//!
//! A typed struct stands in for the open-ended dictionary the original
//! Python implementation threads through these layers: every field it is
//! known to carry gets a named slot here, plus an `extension` map for
//! variation-module-specific keys (e.g. the `hexvalue`/`hextag` pair
//! computed for SET requests).

use std::collections::HashMap;

use crate::oid::Oid;
use crate::value::SnmpValue;

/// Per-request flags and addressing info, constant for every varbind in
/// one request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub next_flag: bool,
    pub set_flag: bool,
    pub data_validation: bool,
    pub transport_domain: Vec<u32>,
    pub transport_address: String,
    pub security_model: u32,
    pub security_name: String,
    pub security_level: u32,
    pub context_name: String,
}

impl Default for RequestMeta {
    fn default() -> Self {
        RequestMeta {
            next_flag: false,
            set_flag: false,
            data_validation: false,
            transport_domain: Vec::new(),
            transport_address: String::new(),
            security_model: 0,
            security_name: String::new(),
            security_level: 0,
            context_name: String::new(),
        }
    }
}

/// Per-varbind evaluation context, including the "child context" seen by
/// nested variation-module evaluation.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub meta: RequestMeta,
    pub orig_oid: Oid,
    pub orig_value: SnmpValue,
    pub data_file: String,
    pub subtree_flag: bool,
    pub exact_match: bool,
    pub error_status: SnmpValue,
    pub vars_total: usize,
    pub vars_remaining: usize,
    pub oid_only: bool,
    /// Variation-module-specific keys, e.g. `hexvalue`/`hextag` computed
    /// for SET requests.
    pub extension: HashMap<String, String>,
}

impl EvalContext {
    pub fn oid_only(meta: RequestMeta) -> Self {
        EvalContext {
            orig_oid: Oid::root(),
            orig_value: SnmpValue::Null,
            data_file: String::new(),
            subtree_flag: false,
            exact_match: false,
            error_status: SnmpValue::NoSuchInstance,
            vars_total: 0,
            vars_remaining: 0,
            oid_only: true,
            extension: HashMap::new(),
            meta,
        }
    }
}
