//! snmpsim - SNMP agent simulator.
//!
//! A network service answering SNMPv1/v2c/v3 requests from pre-recorded
//! `OID -> (type, value)` record files, simulating many distinct agents
//! selected by community/context name, transport endpoint and peer
//! address.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod oid;
pub mod pipeline;
pub mod record;
pub mod selector;
pub mod transport;
pub mod util;
pub mod value;
pub mod variation;

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default SNMP agent UDP port.
pub const DEFAULT_AGENT_PORT: u16 = 161;
