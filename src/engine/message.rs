//! SNMPv1/v2c/v3 message framing on top of the BER primitives in
//! `engine::ber`. v3's USM security parameters are parsed structurally
//! (engine ID/boots/time, user name, auth/priv parameter octets) but not
//! cryptographically verified or decrypted — this crate answers requests
//! by community/context match, and full USM auth/priv is explicitly out
//! of scope (see the crate's top-level design notes).

use bytes::{BufMut, Bytes, BytesMut};

use crate::engine::ber::{
    decode_any_tlv, decode_integer, decode_octet_string, decode_sequence, decode_value,
    encode_integer, encode_octet_string, encode_oid, encode_sequence, encode_value, peek_tag,
    BerError, TAG_PDU_GET_BULK_REQUEST, TAG_PDU_GET_NEXT_REQUEST, TAG_PDU_GET_REQUEST,
    TAG_PDU_GET_RESPONSE, TAG_PDU_REPORT, TAG_PDU_SET_REQUEST, TAG_SEQUENCE,
};
use crate::value::{SnmpValue, VarBind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    GetRequest,
    GetNextRequest,
    GetResponse,
    SetRequest,
    GetBulkRequest,
    Report,
}

impl PduType {
    fn tag(self) -> u8 {
        match self {
            PduType::GetRequest => TAG_PDU_GET_REQUEST,
            PduType::GetNextRequest => TAG_PDU_GET_NEXT_REQUEST,
            PduType::GetResponse => TAG_PDU_GET_RESPONSE,
            PduType::SetRequest => TAG_PDU_SET_REQUEST,
            PduType::GetBulkRequest => TAG_PDU_GET_BULK_REQUEST,
            PduType::Report => TAG_PDU_REPORT,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, BerError> {
        match tag {
            TAG_PDU_GET_REQUEST => Ok(PduType::GetRequest),
            TAG_PDU_GET_NEXT_REQUEST => Ok(PduType::GetNextRequest),
            TAG_PDU_GET_RESPONSE => Ok(PduType::GetResponse),
            TAG_PDU_SET_REQUEST => Ok(PduType::SetRequest),
            TAG_PDU_GET_BULK_REQUEST => Ok(PduType::GetBulkRequest),
            TAG_PDU_REPORT => Ok(PduType::Report),
            other => Err(BerError::UnsupportedTag(other)),
        }
    }
}

/// The second and third PDU integer fields double as `(errorStatus,
/// errorIndex)` for most PDUs and `(nonRepeaters, maxRepetitions)` for
/// GETBULK; callers in `pipeline` interpret them per `pdu_type`.
#[derive(Debug, Clone)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i64,
    pub field2: i64,
    pub field3: i64,
    pub var_binds: Vec<VarBind>,
}

impl Pdu {
    pub fn error_status(&self) -> i64 {
        self.field2
    }

    pub fn error_index(&self) -> i64 {
        self.field3
    }

    pub fn non_repeaters(&self) -> i64 {
        self.field2
    }

    pub fn max_repetitions(&self) -> i64 {
        self.field3
    }
}

/// USM security parameters, parsed but not verified (see module docs).
#[derive(Debug, Clone, Default)]
pub struct UsmParameters {
    pub authoritative_engine_id: Vec<u8>,
    pub authoritative_engine_boots: i64,
    pub authoritative_engine_time: i64,
    pub user_name: String,
    pub auth_params: Vec<u8>,
    pub priv_params: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct V3Header {
    pub msg_id: i64,
    pub max_size: i64,
    pub flags: u8,
    pub security_model: i64,
    pub usm: UsmParameters,
    pub context_engine_id: Vec<u8>,
    pub context_name: String,
}

#[derive(Debug, Clone)]
pub enum SnmpMessage {
    V1 { community: String, pdu: Pdu },
    V2c { community: String, pdu: Pdu },
    V3 { header: V3Header, pdu: Pdu },
}

pub fn decode_message(data: &[u8]) -> Result<SnmpMessage, BerError> {
    let mut buf = Bytes::copy_from_slice(data);
    let mut msg = decode_sequence(&mut buf)?;
    let version = decode_integer(&mut msg)?;

    match version {
        0 => {
            let community = String::from_utf8_lossy(&decode_octet_string(&mut msg)?).to_string();
            let pdu = decode_pdu(&mut msg)?;
            Ok(SnmpMessage::V1 { community, pdu })
        }
        1 => {
            let community = String::from_utf8_lossy(&decode_octet_string(&mut msg)?).to_string();
            let pdu = decode_pdu(&mut msg)?;
            Ok(SnmpMessage::V2c { community, pdu })
        }
        3 => decode_v3(&mut msg),
        other => Err(BerError::UnsupportedTag(other as u8)),
    }
}

fn decode_v3(msg: &mut Bytes) -> Result<SnmpMessage, BerError> {
    let mut global_data = decode_sequence(msg)?;
    let msg_id = decode_integer(&mut global_data)?;
    let max_size = decode_integer(&mut global_data)?;
    let flags_bytes = decode_octet_string(&mut global_data)?;
    let flags = flags_bytes.first().copied().unwrap_or(0);
    let security_model = decode_integer(&mut global_data)?;

    let security_params_bytes = decode_octet_string(msg)?;
    let mut security_params = Bytes::from(security_params_bytes);
    let mut usm_seq = decode_sequence(&mut security_params)?;
    let usm = UsmParameters {
        authoritative_engine_id: decode_octet_string(&mut usm_seq)?,
        authoritative_engine_boots: decode_integer(&mut usm_seq)?,
        authoritative_engine_time: decode_integer(&mut usm_seq)?,
        user_name: String::from_utf8_lossy(&decode_octet_string(&mut usm_seq)?).to_string(),
        auth_params: decode_octet_string(&mut usm_seq)?,
        priv_params: decode_octet_string(&mut usm_seq)?,
    };

    const PRIV_FLAG: u8 = 0x02;
    if flags & PRIV_FLAG != 0 {
        // Encrypted scopedPDU: decryption is out of scope for this
        // simulator's engine boundary.
        return Err(BerError::UnsupportedTag(peek_tag(msg).unwrap_or(0)));
    }

    let mut scoped_pdu = decode_sequence(msg)?;
    let context_engine_id = decode_octet_string(&mut scoped_pdu)?;
    let context_name = String::from_utf8_lossy(&decode_octet_string(&mut scoped_pdu)?).to_string();
    let pdu = decode_pdu(&mut scoped_pdu)?;

    Ok(SnmpMessage::V3 {
        header: V3Header {
            msg_id,
            max_size,
            flags,
            security_model,
            usm,
            context_engine_id,
            context_name,
        },
        pdu,
    })
}

fn decode_pdu(buf: &mut Bytes) -> Result<Pdu, BerError> {
    let (tag, mut content) = decode_any_tlv(buf)?;
    let pdu_type = PduType::from_tag(tag)?;

    let request_id = decode_integer(&mut content)?;
    let field2 = decode_integer(&mut content)?;
    let field3 = decode_integer(&mut content)?;
    let var_binds = decode_var_bind_list(&mut content)?;

    Ok(Pdu {
        pdu_type,
        request_id,
        field2,
        field3,
        var_binds,
    })
}

fn decode_var_bind_list(buf: &mut Bytes) -> Result<Vec<VarBind>, BerError> {
    let mut list = decode_sequence(buf)?;
    let mut var_binds = Vec::new();
    while !list.is_empty() {
        let mut entry = decode_sequence(&mut list)?;
        let oid = crate::engine::ber::decode_oid(&mut entry)?;
        let value = decode_value(&mut entry)?;
        var_binds.push(VarBind::new(oid, value));
    }
    Ok(var_binds)
}

pub fn encode_pdu(pdu: &Pdu, out: &mut BytesMut) {
    let mut body = BytesMut::new();
    encode_integer(pdu.request_id, &mut body);
    encode_integer(pdu.field2, &mut body);
    encode_integer(pdu.field3, &mut body);

    let mut list = BytesMut::new();
    for vb in &pdu.var_binds {
        let mut entry = BytesMut::new();
        encode_oid(&vb.oid, &mut entry);
        encode_value(&vb.value, &mut entry);
        encode_sequence(&entry, TAG_SEQUENCE, &mut list);
    }
    let mut wrapped_list = BytesMut::new();
    encode_sequence(&list, TAG_SEQUENCE, &mut wrapped_list);
    body.put_slice(&wrapped_list);

    encode_sequence(&body, pdu.pdu_type.tag(), out);
}

pub fn encode_message(message: &SnmpMessage, out: &mut BytesMut) {
    match message {
        SnmpMessage::V1 { community, pdu } => encode_v1_or_v2c(0, community, pdu, out),
        SnmpMessage::V2c { community, pdu } => encode_v1_or_v2c(1, community, pdu, out),
        SnmpMessage::V3 { header, pdu } => encode_v3(header, pdu, out),
    }
}

fn encode_v1_or_v2c(version: i64, community: &str, pdu: &Pdu, out: &mut BytesMut) {
    let mut msg = BytesMut::new();
    encode_integer(version, &mut msg);
    encode_octet_string(community.as_bytes(), &mut msg);
    encode_pdu(pdu, &mut msg);
    encode_sequence(&msg, TAG_SEQUENCE, out);
}

fn encode_v3(header: &V3Header, pdu: &Pdu, out: &mut BytesMut) {
    let mut msg = BytesMut::new();
    encode_integer(3, &mut msg);

    let mut global_data = BytesMut::new();
    encode_integer(header.msg_id, &mut global_data);
    encode_integer(header.max_size, &mut global_data);
    encode_octet_string(&[header.flags], &mut global_data);
    encode_integer(header.security_model, &mut global_data);
    let mut wrapped_global = BytesMut::new();
    encode_sequence(&global_data, TAG_SEQUENCE, &mut wrapped_global);
    msg.put_slice(&wrapped_global);

    let mut usm = BytesMut::new();
    encode_octet_string(&header.usm.authoritative_engine_id, &mut usm);
    encode_integer(header.usm.authoritative_engine_boots, &mut usm);
    encode_integer(header.usm.authoritative_engine_time, &mut usm);
    encode_octet_string(header.usm.user_name.as_bytes(), &mut usm);
    encode_octet_string(&header.usm.auth_params, &mut usm);
    encode_octet_string(&header.usm.priv_params, &mut usm);
    let mut wrapped_usm = BytesMut::new();
    encode_sequence(&usm, TAG_SEQUENCE, &mut wrapped_usm);
    encode_octet_string(&wrapped_usm, &mut msg);

    let mut scoped_pdu = BytesMut::new();
    encode_octet_string(&header.context_engine_id, &mut scoped_pdu);
    encode_octet_string(header.context_name.as_bytes(), &mut scoped_pdu);
    encode_pdu(pdu, &mut scoped_pdu);
    let mut wrapped_scoped = BytesMut::new();
    encode_sequence(&scoped_pdu, TAG_SEQUENCE, &mut wrapped_scoped);
    msg.put_slice(&wrapped_scoped);

    encode_sequence(&msg, TAG_SEQUENCE, out);
}

/// v2c -> v1 error translation: `Counter64` has no v1
/// representation (genErr); the v2c exception values have no v1
/// equivalent either (noSuchName). Returns `Some(error_status)` for the
/// first offending varbind index, `None` if the response is v1-safe
/// as-is.
pub fn first_v1_incompatible_index(var_binds: &[VarBind]) -> Option<(usize, i64)> {
    const GEN_ERR: i64 = 5;
    const NO_SUCH_NAME: i64 = 2;

    for (i, vb) in var_binds.iter().enumerate() {
        match &vb.value {
            SnmpValue::Counter64(_) => return Some((i, GEN_ERR)),
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView => {
                return Some((i, NO_SUCH_NAME))
            }
            _ => {}
        }
    }
    None
}
