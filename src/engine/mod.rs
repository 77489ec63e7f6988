//! The "external SNMP engine" boundary: BER encode/decode for
//! SNMPv1/v2c/v3 messages. Deliberately small: no MIB compiler, no trap
//! originator, no USM crypto.

pub mod ber;
pub mod message;

pub use message::{decode_message, encode_message, Pdu, PduType, SnmpMessage, UsmParameters, V3Header};
