//! Lookup engine.
//!
//! `process_var_binds` walks each requested varbind to a matching record,
//! refining the match according to GETNEXT/subtree rules, and evaluates it
//! through the record grammar. A variation module dropping the whole
//! request (`NoDataNotification`) short-circuits the entire batch.

use crate::context::{EvalContext, RequestMeta};
use crate::error::NoDataNotification;
use crate::oid::Oid;
use crate::record::cache::HandleCache;
use crate::record::grammar::EvalOutcome;
use crate::record::store::{RecordStore, StoreLookup};
use crate::value::{SnmpValue, VarBind};
use crate::variation::VariationHost;

pub fn process_var_binds(
    var_binds: &[VarBind],
    meta: &RequestMeta,
    store: &RecordStore,
    cache: &mut HandleCache,
    variation_host: &mut VariationHost,
) -> Result<Vec<VarBind>, NoDataNotification> {
    let vars_total = var_binds.len();
    let mut out = Vec::with_capacity(vars_total);

    for (i, vb) in var_binds.iter().enumerate() {
        let vars_remaining = vars_total - i - 1;
        let result = process_one(
            &vb.oid,
            &vb.value,
            meta,
            store,
            cache,
            variation_host,
            vars_total,
            vars_remaining,
        )?;
        out.push(result);
    }

    tracing::info!(
        context = %store.agent_id,
        request = ?var_binds,
        response = ?out,
        "answered request"
    );

    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn process_one(
    oid: &Oid,
    orig_value: &SnmpValue,
    meta: &RequestMeta,
    store: &RecordStore,
    cache: &mut HandleCache,
    variation_host: &mut VariationHost,
    vars_total: usize,
    vars_remaining: usize,
) -> Result<VarBind, NoDataNotification> {
    // Step 1: default error status for this request.
    let error_status = if meta.next_flag {
        SnmpValue::end_of_mib()
    } else {
        SnmpValue::no_such_instance()
    };

    // Step 2: locate a starting record.
    let (mut exact_match, entry) = match store.lookup(oid) {
        StoreLookup::Exact(_, entry) => (true, entry),
        StoreLookup::NearestGreater(_, entry) => (false, entry),
        StoreLookup::NotFound => {
            return Ok(VarBind::new(oid.clone(), error_status));
        }
    };

    let mut subtree_flag = entry.subtree_flag;
    let mut current_offset = entry.offset;

    // Step 4 bullet 2 applies only to the initial (non-exact) locate; a
    // covering subtree record found here takes over as the match.
    if !exact_match {
        if let Some(prev_offset) = entry.prev_offset {
            if let Ok(prev_parsed) = store.read_parsed_at(cache, prev_offset) {
                if prev_parsed.oid.is_prefix_of(oid) {
                    current_offset = prev_offset;
                    subtree_flag = true;
                }
            }
        }
    }

    let max_iterations = store.record_count() + 1;
    let mut iterations = 0usize;

    loop {
        iterations += 1;
        if iterations > max_iterations {
            tracing::error!(oid = %oid, bound = max_iterations, "refinement loop exceeded bound");
            return Ok(VarBind::new(oid.clone(), error_status));
        }

        // Step 4 bullet 1: advance past an exact non-subtree hit under GETNEXT.
        if exact_match && meta.next_flag && !subtree_flag {
            match store.read_next_parsed_after(cache, current_offset) {
                Ok(Some((next_offset, next_parsed))) => match store.lookup(&next_parsed.oid) {
                    StoreLookup::Exact(_, next_entry) => {
                        current_offset = next_offset;
                        subtree_flag = next_entry.subtree_flag;
                    }
                    _ => {
                        tracing::error!(
                            oid = %next_parsed.oid,
                            "index lookup missed for successor record"
                        );
                        return Ok(VarBind::new(oid.clone(), error_status));
                    }
                },
                Ok(None) => return Ok(VarBind::new(oid.clone(), error_status)),
                Err(e) => {
                    tracing::error!(error = %e, "failed reading successor record");
                    return Ok(VarBind::new(oid.clone(), error_status));
                }
            }
        }

        // Step 5/6: read and evaluate the chosen line.
        let parsed = match store.read_parsed_at(cache, current_offset) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, oid = %oid, "failed reading matched record");
                return Ok(VarBind::new(oid.clone(), error_status));
            }
        };

        let mut ctx = EvalContext {
            meta: meta.clone(),
            orig_oid: oid.clone(),
            orig_value: orig_value.clone(),
            data_file: store.text_path().display().to_string(),
            subtree_flag,
            exact_match,
            error_status: error_status.clone(),
            vars_total,
            vars_remaining,
            oid_only: false,
            extension: Default::default(),
        };

        match store.evaluate_parsed(&parsed, subtree_flag, &mut ctx, variation_host) {
            Ok(EvalOutcome::Value(result_oid, value)) => {
                if value == SnmpValue::end_of_mib() {
                    // Step 7: a variation module or subtree record
                    // redirects GETNEXT to the next OID in the file.
                    exact_match = true;
                    subtree_flag = false;
                    continue;
                }
                return Ok(VarBind::new(result_oid, value));
            }
            Ok(EvalOutcome::Drop) => return Err(NoDataNotification),
            Err(e) => {
                tracing::error!(error = %e, oid = %oid, "record evaluation failed");
                return Ok(VarBind::new(oid.clone(), error_status));
            }
        }
    }
}
