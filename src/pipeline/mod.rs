//! Request pipeline: decode PDU, select the agent, route varbinds
//! through the lookup engine, translate the response back for v1 if
//! needed.
//!
//! The v2c fast path and the v3 path share everything after the context
//! name is known; only where that name comes from (the community string
//! vs. the scopedPDU's `contextName`) and the security metadata differ.

pub mod bulk;

use std::collections::HashMap;

use crate::context::RequestMeta;
use crate::engine::message::{first_v1_incompatible_index, Pdu, PduType, SnmpMessage, V3Header};
use crate::error::NoDataNotification;
use crate::record::cache::HandleCache;
use crate::record::store::RecordStore;
use crate::selector::{probe_context, resolve_candidate, ProbeInput};
use crate::value::VarBind;
use crate::variation::VariationHost;

/// The registration table of simulated agents plus the shared resources
/// (the handle cache, the variation host) every lookup needs. Owned by
/// the transport dispatcher, one instance per process.
pub struct Registry {
    stores: HashMap<String, RecordStore>,
    cache: HandleCache,
    variation_host: VariationHost,
    max_varbinds: usize,
}

impl Registry {
    pub fn new(cache_capacity: usize, max_varbinds: usize) -> Self {
        Registry {
            stores: HashMap::new(),
            cache: HandleCache::new(cache_capacity),
            variation_host: VariationHost::new(),
            max_varbinds,
        }
    }

    /// Register a record store under `key` (its agent identifier, or the
    /// MD5 digest of an over-long one). A duplicate key keeps the first
    /// registration and logs the collision, matching the loader's
    /// duplicate-alias-skip-and-log policy.
    pub fn register(&mut self, key: impl Into<String>, store: RecordStore) {
        let key = key.into();
        if self.stores.contains_key(&key) {
            tracing::warn!(agent = %key, "duplicate agent registration, keeping the first one");
            return;
        }
        self.stores.insert(key, store);
    }

    pub fn variation_host_mut(&mut self) -> &mut VariationHost {
        &mut self.variation_host
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    fn is_registered(&self, key: &str) -> bool {
        self.stores.contains_key(key)
    }

    /// Run one decoded request through the full pipeline: pick the
    /// matching agent, route its varbinds through the lookup engine and
    /// variation host, and for v1
    /// requests translate any v2c-only exception back to a v1-legal
    /// `GetResponse`. Returns `Err(NoDataNotification)` only when a
    /// variation module drops the whole request, matching `lookup`'s
    /// propagation.
    pub fn handle(
        &mut self,
        message: SnmpMessage,
        probe: ProbeInput,
    ) -> Result<SnmpMessage, NoDataNotification> {
        match message {
            SnmpMessage::V1 { community, pdu } => {
                let (response_pdu, context_name) =
                    self.route_community(&community, pdu, &probe, 1)?;
                let response_pdu = translate_for_v1(response_pdu);
                let _ = context_name;
                Ok(SnmpMessage::V1 {
                    community,
                    pdu: response_pdu,
                })
            }
            SnmpMessage::V2c { community, pdu } => {
                let (response_pdu, _context_name) =
                    self.route_community(&community, pdu, &probe, 2)?;
                Ok(SnmpMessage::V2c {
                    community,
                    pdu: response_pdu,
                })
            }
            SnmpMessage::V3 { header, pdu } => {
                let response_pdu = self.route_v3(&header, pdu, &probe)?;
                Ok(SnmpMessage::V3 {
                    header,
                    pdu: response_pdu,
                })
            }
        }
    }

    fn route_community(
        &mut self,
        community: &str,
        pdu: Pdu,
        probe: &ProbeInput,
        security_model: u32,
    ) -> Result<(Pdu, String), NoDataNotification> {
        let mut probe = probe.clone();
        probe.context_name = community.to_string();
        probe.context_engine_id = String::new();

        let candidates = probe_context(&probe);
        let key = resolve_candidate(&candidates, community, |k| self.is_registered(k));

        let key = match key {
            Some(k) => k,
            None => {
                tracing::error!(
                    community,
                    transport_address = %probe.transport_address,
                    "no data file selected for request"
                );
                return Err(NoDataNotification);
            }
        };

        let meta = RequestMeta {
            next_flag: pdu.pdu_type == PduType::GetNextRequest,
            set_flag: pdu.pdu_type == PduType::SetRequest,
            data_validation: false,
            transport_domain: probe.transport_domain.clone(),
            transport_address: probe.transport_address.clone(),
            security_model,
            security_name: community.to_string(),
            security_level: 1,
            context_name: community.to_string(),
        };

        let response_pdu = self.dispatch(&meta, &key, pdu)?;
        Ok((response_pdu, key))
    }

    fn route_v3(
        &mut self,
        header: &V3Header,
        pdu: Pdu,
        probe: &ProbeInput,
    ) -> Result<Pdu, NoDataNotification> {
        let context_engine_id = hex_string(&header.context_engine_id);
        let mut probe = probe.clone();
        probe.context_name = header.context_name.clone();
        probe.context_engine_id = context_engine_id;

        let candidates = probe_context(&probe);
        let key = resolve_candidate(&candidates, &header.context_name, |k| {
            self.is_registered(k)
        });

        let key = match key {
            Some(k) => k,
            None => {
                tracing::error!(
                    context_name = %header.context_name,
                    transport_address = %probe.transport_address,
                    "no data file selected for request"
                );
                return Err(NoDataNotification);
            }
        };

        const PRIV_FLAG: u8 = 0x02;
        const AUTH_FLAG: u8 = 0x01;
        let security_level = match (header.flags & AUTH_FLAG != 0, header.flags & PRIV_FLAG != 0)
        {
            (false, _) => 1,
            (true, false) => 2,
            (true, true) => 3,
        };

        let meta = RequestMeta {
            next_flag: pdu.pdu_type == PduType::GetNextRequest,
            set_flag: pdu.pdu_type == PduType::SetRequest,
            data_validation: false,
            transport_domain: probe.transport_domain.clone(),
            transport_address: probe.transport_address.clone(),
            security_model: 3,
            security_name: header.usm.user_name.clone(),
            security_level,
            context_name: header.context_name.clone(),
        };

        self.dispatch(&meta, &key, pdu)
    }

    fn dispatch(
        &mut self,
        meta: &RequestMeta,
        key: &str,
        pdu: Pdu,
    ) -> Result<Pdu, NoDataNotification> {
        let store = self
            .stores
            .get(key)
            .expect("resolve_candidate only returns registered keys");

        let response_var_binds = match pdu.pdu_type {
            PduType::GetBulkRequest => bulk::expand(
                &pdu.var_binds,
                pdu.non_repeaters(),
                pdu.max_repetitions(),
                self.max_varbinds,
                meta,
                store,
                &mut self.cache,
                &mut self.variation_host,
            )?,
            _ => crate::lookup::process_var_binds(
                &pdu.var_binds,
                meta,
                store,
                &mut self.cache,
                &mut self.variation_host,
            )?,
        };

        Ok(Pdu {
            pdu_type: PduType::GetResponse,
            request_id: pdu.request_id,
            field2: 0,
            field3: 0,
            var_binds: response_var_binds,
        })
    }
}

/// v2c -> v1 translation: on the first v1-incompatible
/// varbind, the whole response reverts to the *original request's*
/// varbinds, with `errorStatus`/`errorIndex` set to the offending pair.
fn translate_for_v1(mut pdu: Pdu) -> Pdu {
    if let Some((index, error_status)) = first_v1_incompatible_index(&pdu.var_binds) {
        let original: Vec<VarBind> = pdu
            .var_binds
            .iter()
            .map(|vb| VarBind::new(vb.oid.clone(), crate::value::SnmpValue::Null))
            .collect();
        pdu.var_binds = original;
        pdu.field2 = error_status;
        pdu.field3 = (index + 1) as i64;
    }
    pdu
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
