//! Record grammar & value evaluator.
//!
//! Parses one `OID|TAG|VALUE` record line and materializes a typed
//! [`SnmpValue`] from it, optionally dispatching to a variation module.

use std::str::FromStr;

use crate::context::EvalContext;
use crate::error::RecordError;
use crate::oid::Oid;
use crate::util::{hex_decode, hex_encode};
use crate::value::{
    SnmpValue, TAG_COUNTER32, TAG_COUNTER64, TAG_END_OF_MIB_VIEW, TAG_GAUGE32, TAG_INTEGER,
    TAG_IP_ADDRESS, TAG_NO_SUCH_INSTANCE, TAG_NO_SUCH_OBJECT, TAG_NULL, TAG_OBJECT_IDENTIFIER,
    TAG_OCTET_STRING, TAG_OPAQUE, TAG_TIME_TICKS,
};
use crate::variation::{VariationCallContext, VariationHost, VariationOutcome};

/// The three pipe-separated fields of one record line, still textual.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub oid: Oid,
    pub tag_spec: String,
    pub raw_value: String,
}

/// A decoded `TAG` field: a numeric SNMP type code, an optional `x`
/// (hex-encoded value) suffix, and an optional `:MODULE[,args]` variation
/// dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSpec {
    pub type_code: u32,
    pub hex: bool,
    pub variation: Option<(String, String)>,
}

/// Outcome of evaluating one record line to a value.
pub enum EvalOutcome {
    Value(Oid, SnmpValue),
    Drop,
}

/// Split a record line on `|` into at most 3 fields (the value field may
/// itself contain `|`).
pub fn parse_line(line: &str) -> Result<ParsedLine, RecordError> {
    let mut parts = line.splitn(3, '|');
    let oid_str = parts
        .next()
        .ok_or_else(|| RecordError::BadRecord(line.to_string()))?;
    let tag_str = parts
        .next()
        .ok_or_else(|| RecordError::BadRecord(line.to_string()))?;
    let value_str = parts.next().unwrap_or("");

    let oid = Oid::from_str(oid_str).map_err(|_| RecordError::BadRecord(line.to_string()))?;

    Ok(ParsedLine {
        oid,
        tag_spec: tag_str.to_string(),
        raw_value: value_str.to_string(),
    })
}

/// True if this tag marks the record's OID as representing an entire
/// subtree (the record format's wildcard marker: a trailing `*` on the
/// numeric type code, before any `x`/`:module` suffix).
pub fn is_subtree_tag(tag_spec: &str) -> bool {
    tag_spec.splitn(2, ':').next().unwrap_or("").contains('*')
}

pub fn parse_tag(tag: &str) -> Result<TagSpec, RecordError> {
    let bad = || RecordError::BadRecord(tag.to_string());

    let (type_part, variation) = match tag.find(':') {
        Some(idx) => {
            let module_and_args = &tag[idx + 1..];
            let (module, args) = match module_and_args.split_once(',') {
                Some((m, a)) => (m.to_string(), a.to_string()),
                None => (module_and_args.to_string(), String::new()),
            };
            (&tag[..idx], Some((module, args)))
        }
        None => (tag, None),
    };

    let type_part = type_part.trim_end_matches('*');
    let (num_str, hex) = match type_part.strip_suffix('x') {
        Some(stripped) => (stripped, true),
        None => (type_part, false),
    };

    let type_code: u32 = num_str.parse().map_err(|_| bad())?;

    Ok(TagSpec {
        type_code,
        hex,
        variation,
    })
}

/// Decode `raw_value` into a typed [`SnmpValue`] according to `tag`.
pub fn decode_value(tag: &TagSpec, raw_value: &str) -> Result<SnmpValue, RecordError> {
    let bad_value = || RecordError::BadValue {
        tag: tag.type_code,
        value: raw_value.to_string(),
    };

    let bytes = if tag.hex {
        Some(hex_decode(raw_value).map_err(|_| bad_value())?)
    } else {
        None
    };

    match tag.type_code {
        TAG_INTEGER => {
            let v = if let Some(b) = &bytes {
                be_bytes_to_i64(b)
            } else {
                raw_value.parse::<i64>().map_err(|_| bad_value())?
            };
            Ok(SnmpValue::Integer(v))
        }
        TAG_OCTET_STRING => {
            let v = bytes.unwrap_or_else(|| raw_value.as_bytes().to_vec());
            Ok(SnmpValue::OctetString(v))
        }
        TAG_NULL => Ok(SnmpValue::Null),
        TAG_OBJECT_IDENTIFIER => {
            let s = if let Some(b) = &bytes {
                String::from_utf8(b.clone()).map_err(|_| bad_value())?
            } else {
                raw_value.to_string()
            };
            let oid = Oid::from_str(&s).map_err(|_| bad_value())?;
            Ok(SnmpValue::ObjectIdentifier(oid))
        }
        TAG_IP_ADDRESS => {
            let v = if let Some(b) = &bytes {
                if b.len() != 4 {
                    return Err(bad_value());
                }
                [b[0], b[1], b[2], b[3]]
            } else {
                let parts: Vec<&str> = raw_value.split('.').collect();
                if parts.len() != 4 {
                    return Err(bad_value());
                }
                let mut octets = [0u8; 4];
                for (i, p) in parts.iter().enumerate() {
                    octets[i] = p.parse().map_err(|_| bad_value())?;
                }
                octets
            };
            Ok(SnmpValue::IpAddress(v))
        }
        TAG_COUNTER32 => Ok(SnmpValue::Counter32(parse_u32(raw_value, &bytes, &bad_value)?)),
        TAG_GAUGE32 => Ok(SnmpValue::Gauge32(parse_u32(raw_value, &bytes, &bad_value)?)),
        TAG_TIME_TICKS => Ok(SnmpValue::TimeTicks(parse_u32(raw_value, &bytes, &bad_value)?)),
        TAG_OPAQUE => {
            let v = bytes.unwrap_or_else(|| raw_value.as_bytes().to_vec());
            Ok(SnmpValue::Opaque(v))
        }
        TAG_COUNTER64 => {
            let v = if let Some(b) = &bytes {
                be_bytes_to_u64(b)
            } else {
                raw_value.parse::<u64>().map_err(|_| bad_value())?
            };
            Ok(SnmpValue::Counter64(v))
        }
        TAG_NO_SUCH_OBJECT => Ok(SnmpValue::NoSuchObject),
        TAG_NO_SUCH_INSTANCE => Ok(SnmpValue::NoSuchInstance),
        TAG_END_OF_MIB_VIEW => Ok(SnmpValue::EndOfMibView),
        _ => Err(bad_value()),
    }
}

fn parse_u32(
    raw_value: &str,
    bytes: &Option<Vec<u8>>,
    bad_value: &dyn Fn() -> RecordError,
) -> Result<u32, RecordError> {
    if let Some(b) = bytes {
        Ok(be_bytes_to_u64(b) as u32)
    } else {
        raw_value.parse::<u32>().map_err(|_| bad_value())
    }
}

fn be_bytes_to_i64(bytes: &[u8]) -> i64 {
    be_bytes_to_u64(bytes) as i64
}

fn be_bytes_to_u64(bytes: &[u8]) -> u64 {
    let mut acc: u64 = 0;
    for b in bytes {
        acc = (acc << 8) | *b as u64;
    }
    acc
}

/// Hex-encode an already-materialized value the way `hexifyValue` does in
/// the source, for the `hexvalue`/`hextag` pair computed on SET.
pub fn hexify_value(value: &SnmpValue) -> Option<(String, String)> {
    let bytes: Vec<u8> = match value {
        SnmpValue::OctetString(b) | SnmpValue::Opaque(b) => b.clone(),
        SnmpValue::Integer(i) => i.to_be_bytes().to_vec(),
        SnmpValue::Counter32(v) | SnmpValue::Gauge32(v) | SnmpValue::TimeTicks(v) => {
            v.to_be_bytes().to_vec()
        }
        SnmpValue::Counter64(v) => v.to_be_bytes().to_vec(),
        SnmpValue::IpAddress(v) => v.to_vec(),
        SnmpValue::ObjectIdentifier(o) => o.canonical().into_bytes(),
        SnmpValue::Null
        | SnmpValue::NoSuchObject
        | SnmpValue::NoSuchInstance
        | SnmpValue::EndOfMibView => return None,
    };

    let tag = format!("{}x", value.tag());
    Some((hex_encode(&bytes), tag))
}

/// Parse a line then, unless `ctx.oid_only`, evaluate its value.
pub fn evaluate(
    line: &str,
    ctx: &mut EvalContext,
    variation_host: &mut VariationHost,
) -> Result<EvalOutcome, RecordError> {
    let parsed = parse_line(line)?;

    if ctx.oid_only {
        return Ok(EvalOutcome::Value(parsed.oid, SnmpValue::Null));
    }

    evaluate_value(
        parsed.oid,
        &parsed.tag_spec,
        &parsed.raw_value,
        ctx,
        variation_host,
    )
}

/// Evaluate an already-parsed value, dispatching to a variation module
/// when the record names one.
pub fn evaluate_value(
    oid: Oid,
    tag_spec: &str,
    raw_value: &str,
    ctx: &mut EvalContext,
    variation_host: &mut VariationHost,
) -> Result<EvalOutcome, RecordError> {
    let tag = parse_tag(tag_spec)?;

    if let Some((module, args)) = &tag.variation {
        if !variation_host.is_loaded(module) {
            return Err(RecordError::UnknownVariation(module.clone()));
        }

        if ctx.meta.data_validation {
            return Ok(EvalOutcome::Value(oid, SnmpValue::Null));
        }

        if ctx.meta.set_flag {
            if let Some((hexvalue, hextag)) = hexify_value(&ctx.orig_value) {
                ctx.extension.insert("hexvalue".to_string(), hexvalue);
                ctx.extension.insert("hextag".to_string(), hextag);
            }
        }

        let call_ctx = VariationCallContext {
            args: args.clone(),
            subtree_flag: ctx.subtree_flag,
            exact_match: ctx.exact_match,
            set_flag: ctx.meta.set_flag,
            next_flag: ctx.meta.next_flag,
            vars_total: ctx.vars_total,
            vars_remaining: ctx.vars_remaining,
            orig_oid: ctx.orig_oid.clone(),
            orig_value: ctx.orig_value.clone(),
            extension: ctx.extension.clone(),
        };

        return match variation_host.variate(module, &ctx.data_file, &oid, tag.type_code, raw_value, call_ctx) {
            Ok(VariationOutcome::Value(oid, value)) => Ok(EvalOutcome::Value(oid, value)),
            Ok(VariationOutcome::Drop) => Ok(EvalOutcome::Drop),
            Err(e) => Err(e),
        };
    }

    if ctx.meta.data_validation {
        // still validate that the record parses/decodes cleanly
        decode_value(&tag, raw_value)?;
        return Ok(EvalOutcome::Value(oid, SnmpValue::Null));
    }

    if ctx.meta.set_flag || (!ctx.meta.next_flag && !ctx.exact_match) {
        return Ok(EvalOutcome::Value(ctx.orig_oid.clone(), ctx.error_status.clone()));
    }

    let value = decode_value(&tag, raw_value)?;
    Ok(EvalOutcome::Value(oid, value))
}
