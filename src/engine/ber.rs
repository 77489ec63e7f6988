//! BER/DER primitives for the tags SNMP itself uses. This is the whole of
//! the "external SNMP engine" boundary the crate treats as out of scope
//! for redesign — no MIB compiler, no general ASN.1, just enough TLV
//! plumbing to read and write SNMP messages.
//!
//! Grounded in the `bytes`-crate encode/decode split used for SNMPv1 PDUs
//! in the pack's `other_examples/` reference file, generalized to the
//! full SNMP tag set (IpAddress/Counter32/Gauge32/TimeTicks/Opaque/
//! Counter64, the v2c exception tags, and application-class PDU tags).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::oid::Oid;
use crate::value::{
    SnmpValue, TAG_COUNTER32, TAG_COUNTER64, TAG_END_OF_MIB_VIEW, TAG_GAUGE32, TAG_INTEGER,
    TAG_IP_ADDRESS, TAG_NO_SUCH_INSTANCE, TAG_NO_SUCH_OBJECT, TAG_NULL, TAG_OBJECT_IDENTIFIER,
    TAG_OCTET_STRING, TAG_OPAQUE, TAG_TIME_TICKS,
};

pub const TAG_SEQUENCE: u8 = 0x30;

pub const TAG_PDU_GET_REQUEST: u8 = 0xA0;
pub const TAG_PDU_GET_NEXT_REQUEST: u8 = 0xA1;
pub const TAG_PDU_GET_RESPONSE: u8 = 0xA2;
pub const TAG_PDU_SET_REQUEST: u8 = 0xA3;
pub const TAG_PDU_GET_BULK_REQUEST: u8 = 0xA5;
pub const TAG_PDU_REPORT: u8 = 0xA8;

#[derive(Debug, thiserror::Error)]
pub enum BerError {
    #[error("unexpected end of input while decoding {0}")]
    Truncated(&'static str),
    #[error("expected tag {expected:#04x}, found {found:#04x}")]
    UnexpectedTag { expected: u8, found: u8 },
    #[error("unsupported value tag {0:#04x}")]
    UnsupportedTag(u8),
    #[error("malformed length encoding")]
    BadLength,
    #[error("malformed OID encoding")]
    BadOid,
}

type Result<T> = std::result::Result<T, BerError>;

/// Write a BER length octet sequence (short form under 128, long form
/// otherwise).
pub fn encode_length(len: usize, out: &mut BytesMut) {
    if len < 0x80 {
        out.put_u8(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        let significant = &bytes[first_nonzero..];
        out.put_u8(0x80 | significant.len() as u8);
        out.put_slice(significant);
    }
}

pub fn decode_length(buf: &mut Bytes) -> Result<usize> {
    if !buf.has_remaining() {
        return Err(BerError::Truncated("length"));
    }
    let first = buf.get_u8();
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    let count = (first & 0x7F) as usize;
    if count == 0 || count > 8 || buf.remaining() < count {
        return Err(BerError::BadLength);
    }
    let mut len: usize = 0;
    for _ in 0..count {
        len = (len << 8) | buf.get_u8() as usize;
    }
    Ok(len)
}

/// Wrap `content` in a tag/length header and append to `out`.
pub fn encode_tlv(tag: u8, content: &[u8], out: &mut BytesMut) {
    out.put_u8(tag);
    encode_length(content.len(), out);
    out.put_slice(content);
}

pub fn encode_sequence(content: &[u8], tag: u8, out: &mut BytesMut) {
    encode_tlv(tag, content, out);
}

/// Peek the next tag without consuming it.
pub fn peek_tag(buf: &Bytes) -> Result<u8> {
    buf.first().copied().ok_or(BerError::Truncated("tag"))
}

/// Decode a TLV header and return the inner bytes as their own `Bytes`
/// view, advancing `buf` past the whole TLV.
pub fn decode_tlv(buf: &mut Bytes, expected_tag: u8) -> Result<Bytes> {
    let tag = peek_tag(buf)?;
    if tag != expected_tag {
        return Err(BerError::UnexpectedTag {
            expected: expected_tag,
            found: tag,
        });
    }
    buf.advance(1);
    let len = decode_length(buf)?;
    if buf.remaining() < len {
        return Err(BerError::Truncated("TLV content"));
    }
    Ok(buf.split_to(len))
}

pub fn decode_sequence(buf: &mut Bytes) -> Result<Bytes> {
    decode_tlv(buf, TAG_SEQUENCE)
}

/// Decode any tag's TLV, returning both the tag and inner content,
/// whatever it is (used for PDU dispatch, where the tag selects the
/// request type).
pub fn decode_any_tlv(buf: &mut Bytes) -> Result<(u8, Bytes)> {
    let tag = peek_tag(buf)?;
    buf.advance(1);
    let len = decode_length(buf)?;
    if buf.remaining() < len {
        return Err(BerError::Truncated("TLV content"));
    }
    Ok((tag, buf.split_to(len)))
}

pub fn encode_integer(value: i64, out: &mut BytesMut) {
    encode_signed(TAG_INTEGER, value, out);
}

fn encode_signed(tag: u8, value: i64, out: &mut BytesMut) {
    let mut bytes = value.to_be_bytes().to_vec();
    // Strip redundant leading sign-extension bytes, keeping at least one.
    while bytes.len() > 1
        && ((bytes[0] == 0x00 && bytes[1] & 0x80 == 0)
            || (bytes[0] == 0xFF && bytes[1] & 0x80 != 0))
    {
        bytes.remove(0);
    }
    encode_tlv(tag, &bytes, out);
}

pub fn decode_integer(buf: &mut Bytes) -> Result<i64> {
    let content = decode_tlv(buf, TAG_INTEGER)?;
    decode_signed_bytes(&content)
}

fn decode_signed_bytes(content: &Bytes) -> Result<i64> {
    if content.is_empty() {
        return Err(BerError::Truncated("integer"));
    }
    let negative = content[0] & 0x80 != 0;
    let mut acc: i64 = if negative { -1 } else { 0 };
    for b in content.iter() {
        acc = (acc << 8) | (*b as i64 & 0xFF);
    }
    Ok(acc)
}

pub fn encode_unsigned(tag: u8, value: u64, out: &mut BytesMut) {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1 && bytes[0] == 0 && bytes[1] & 0x80 == 0 {
        bytes.remove(0);
    }
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0); // keep it non-negative in two's complement terms
    }
    encode_tlv(tag, &bytes, out);
}

pub fn decode_unsigned(buf: &mut Bytes, expected_tag: u8) -> Result<u64> {
    let content = decode_tlv(buf, expected_tag)?;
    let mut acc: u64 = 0;
    for b in content.iter() {
        acc = (acc << 8) | *b as u64;
    }
    Ok(acc)
}

pub fn encode_octet_string(value: &[u8], out: &mut BytesMut) {
    encode_tlv(TAG_OCTET_STRING, value, out);
}

pub fn decode_octet_string(buf: &mut Bytes) -> Result<Vec<u8>> {
    Ok(decode_tlv(buf, TAG_OCTET_STRING)?.to_vec())
}

pub fn encode_null(out: &mut BytesMut) {
    encode_tlv(TAG_NULL, &[], out);
}

pub fn decode_null(buf: &mut Bytes) -> Result<()> {
    decode_tlv(buf, TAG_NULL)?;
    Ok(())
}

pub fn encode_oid(oid: &Oid, out: &mut BytesMut) {
    let components = oid.as_slice();
    let mut body = BytesMut::new();

    if components.is_empty() {
        encode_tlv(TAG_OBJECT_IDENTIFIER, &[], out);
        return;
    }

    let first = if components.len() > 1 {
        components[0] * 40 + components[1]
    } else {
        components[0] * 40
    };
    encode_base128(first, &mut body);

    let rest = if components.len() > 1 { &components[2..] } else { &[] };
    for &component in rest {
        encode_base128(component, &mut body);
    }

    encode_tlv(TAG_OBJECT_IDENTIFIER, &body, out);
}

fn encode_base128(mut value: u32, out: &mut BytesMut) {
    let mut chunks = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        chunks.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    chunks.reverse();
    out.put_slice(&chunks);
}

pub fn decode_oid(buf: &mut Bytes) -> Result<Oid> {
    let content = decode_tlv(buf, TAG_OBJECT_IDENTIFIER)?;
    if content.is_empty() {
        return Ok(Oid::root());
    }

    let mut components = Vec::new();
    let mut value: u32 = 0;
    for &byte in content.iter() {
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            components.push(value);
            value = 0;
        }
    }

    if components.is_empty() {
        return Err(BerError::BadOid);
    }

    let first_two = components.remove(0);
    let (first, second) = if first_two >= 80 {
        (2, first_two - 80)
    } else {
        (first_two / 40, first_two % 40)
    };

    let mut result = vec![first, second];
    result.extend(components);
    Ok(Oid::new(result))
}

/// Encode a typed value using its own tag: the same tag numbers serve
/// the record grammar and the wire codec.
pub fn encode_value(value: &SnmpValue, out: &mut BytesMut) {
    match value {
        SnmpValue::Integer(v) => encode_integer(*v, out),
        SnmpValue::OctetString(v) => encode_octet_string(v, out),
        SnmpValue::Null => encode_null(out),
        SnmpValue::ObjectIdentifier(v) => encode_oid(v, out),
        SnmpValue::IpAddress(v) => encode_tlv(TAG_IP_ADDRESS, v, out),
        SnmpValue::Counter32(v) => encode_unsigned(TAG_COUNTER32, *v as u64, out),
        SnmpValue::Gauge32(v) => encode_unsigned(TAG_GAUGE32, *v as u64, out),
        SnmpValue::TimeTicks(v) => encode_unsigned(TAG_TIME_TICKS, *v as u64, out),
        SnmpValue::Opaque(v) => encode_tlv(TAG_OPAQUE, v, out),
        SnmpValue::Counter64(v) => encode_unsigned(TAG_COUNTER64, *v, out),
        SnmpValue::NoSuchObject => encode_tlv(TAG_NO_SUCH_OBJECT, &[], out),
        SnmpValue::NoSuchInstance => encode_tlv(TAG_NO_SUCH_INSTANCE, &[], out),
        SnmpValue::EndOfMibView => encode_tlv(TAG_END_OF_MIB_VIEW, &[], out),
    }
}

pub fn decode_value(buf: &mut Bytes) -> Result<SnmpValue> {
    let tag = peek_tag(buf)?;
    match tag as u32 {
        TAG_INTEGER => Ok(SnmpValue::Integer(decode_integer(buf)?)),
        TAG_OCTET_STRING => Ok(SnmpValue::OctetString(decode_octet_string(buf)?)),
        TAG_NULL => {
            decode_null(buf)?;
            Ok(SnmpValue::Null)
        }
        TAG_OBJECT_IDENTIFIER => Ok(SnmpValue::ObjectIdentifier(decode_oid(buf)?)),
        TAG_IP_ADDRESS => {
            let content = decode_tlv(buf, tag)?;
            if content.len() != 4 {
                return Err(BerError::BadLength);
            }
            Ok(SnmpValue::IpAddress([content[0], content[1], content[2], content[3]]))
        }
        TAG_COUNTER32 => Ok(SnmpValue::Counter32(decode_unsigned(buf, tag)? as u32)),
        TAG_GAUGE32 => Ok(SnmpValue::Gauge32(decode_unsigned(buf, tag)? as u32)),
        TAG_TIME_TICKS => Ok(SnmpValue::TimeTicks(decode_unsigned(buf, tag)? as u32)),
        TAG_OPAQUE => Ok(SnmpValue::Opaque(decode_tlv(buf, tag)?.to_vec())),
        TAG_COUNTER64 => Ok(SnmpValue::Counter64(decode_unsigned(buf, tag)?)),
        TAG_NO_SUCH_OBJECT => {
            decode_tlv(buf, tag)?;
            Ok(SnmpValue::NoSuchObject)
        }
        TAG_NO_SUCH_INSTANCE => {
            decode_tlv(buf, tag)?;
            Ok(SnmpValue::NoSuchInstance)
        }
        TAG_END_OF_MIB_VIEW => {
            decode_tlv(buf, tag)?;
            Ok(SnmpValue::EndOfMibView)
        }
        _ => Err(BerError::UnsupportedTag(tag)),
    }
}
