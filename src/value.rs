//! Typed SNMP values and the tag codes used by the on-disk record format
//! and the wire codec.
//!
//! Tag numbers follow the ASN.1/BER tags SNMP itself uses (this is also
//! what `.snmprec` record files store in their `TAG` field), so the same
//! constants serve the record grammar and the wire engine.

use std::fmt;

pub const TAG_INTEGER: u32 = 0x02;
pub const TAG_OCTET_STRING: u32 = 0x04;
pub const TAG_NULL: u32 = 0x05;
pub const TAG_OBJECT_IDENTIFIER: u32 = 0x06;
pub const TAG_IP_ADDRESS: u32 = 0x40;
pub const TAG_COUNTER32: u32 = 0x41;
pub const TAG_GAUGE32: u32 = 0x42;
pub const TAG_TIME_TICKS: u32 = 0x43;
pub const TAG_OPAQUE: u32 = 0x44;
pub const TAG_COUNTER64: u32 = 0x46;
pub const TAG_NO_SUCH_OBJECT: u32 = 0x80;
pub const TAG_NO_SUCH_INSTANCE: u32 = 0x81;
pub const TAG_END_OF_MIB_VIEW: u32 = 0x82;

/// A materialized SNMP value, owned, independent of any wire encoding.
///
/// `NoSuchObject`, `NoSuchInstance` and `EndOfMibView` are the v2c
/// exception values; they travel through the lookup engine exactly like
/// any other value so error-status defaulting can just compare against
/// `Self::end_of_mib()`.
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(crate::oid::Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl SnmpValue {
    pub fn tag(&self) -> u32 {
        match self {
            SnmpValue::Integer(_) => TAG_INTEGER,
            SnmpValue::OctetString(_) => TAG_OCTET_STRING,
            SnmpValue::Null => TAG_NULL,
            SnmpValue::ObjectIdentifier(_) => TAG_OBJECT_IDENTIFIER,
            SnmpValue::IpAddress(_) => TAG_IP_ADDRESS,
            SnmpValue::Counter32(_) => TAG_COUNTER32,
            SnmpValue::Gauge32(_) => TAG_GAUGE32,
            SnmpValue::TimeTicks(_) => TAG_TIME_TICKS,
            SnmpValue::Opaque(_) => TAG_OPAQUE,
            SnmpValue::Counter64(_) => TAG_COUNTER64,
            SnmpValue::NoSuchObject => TAG_NO_SUCH_OBJECT,
            SnmpValue::NoSuchInstance => TAG_NO_SUCH_INSTANCE,
            SnmpValue::EndOfMibView => TAG_END_OF_MIB_VIEW,
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }

    /// The v2c exception value used as a varbind's value when the
    /// default error status is `endOfMib`.
    pub fn end_of_mib() -> Self {
        SnmpValue::EndOfMibView
    }

    /// The v2c exception value used when the default error status is
    /// `noSuchInstance`.
    pub fn no_such_instance() -> Self {
        SnmpValue::NoSuchInstance
    }
}

impl fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpValue::Integer(v) => write!(f, "INTEGER {}", v),
            SnmpValue::OctetString(v) => write!(f, "STRING {:?}", String::from_utf8_lossy(v)),
            SnmpValue::Null => write!(f, "NULL"),
            SnmpValue::ObjectIdentifier(v) => write!(f, "OID {}", v),
            SnmpValue::IpAddress(v) => write!(f, "IpAddress {}.{}.{}.{}", v[0], v[1], v[2], v[3]),
            SnmpValue::Counter32(v) => write!(f, "Counter32 {}", v),
            SnmpValue::Gauge32(v) => write!(f, "Gauge32 {}", v),
            SnmpValue::TimeTicks(v) => write!(f, "Timeticks {}", v),
            SnmpValue::Opaque(v) => write!(f, "Opaque {} bytes", v.len()),
            SnmpValue::Counter64(v) => write!(f, "Counter64 {}", v),
            SnmpValue::NoSuchObject => write!(f, "noSuchObject"),
            SnmpValue::NoSuchInstance => write!(f, "noSuchInstance"),
            SnmpValue::EndOfMibView => write!(f, "endOfMib"),
        }
    }
}

/// A request/response variable binding: an OID paired with a value.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: crate::oid::Oid,
    pub value: SnmpValue,
}

impl VarBind {
    pub fn new(oid: crate::oid::Oid, value: SnmpValue) -> Self {
        VarBind { oid, value }
    }
}
