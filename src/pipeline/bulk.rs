//! GETBULK expansion math, verbatim from RFC 1905:
//!
//! ```text
//! N = min(nonRepeaters, len(reqVarBinds))
//! R = max(len(reqVarBinds) - N, 0)
//! M = maxRepetitions; if R: M = min(M, maxVarBinds / R)
//! response = readNext(reqVarBinds[:N])
//! varBinds = reqVarBinds[-R:]
//! while M and R: response += readNext(varBinds); varBinds = response[-R:]; M -= 1
//! ```

use crate::context::RequestMeta;
use crate::error::NoDataNotification;
use crate::lookup::process_var_binds;
use crate::record::cache::HandleCache;
use crate::record::store::RecordStore;
use crate::value::VarBind;
use crate::variation::VariationHost;

#[allow(clippy::too_many_arguments)]
pub fn expand(
    req_var_binds: &[VarBind],
    non_repeaters: i64,
    max_repetitions: i64,
    max_varbinds: usize,
    meta: &RequestMeta,
    store: &RecordStore,
    cache: &mut HandleCache,
    variation_host: &mut VariationHost,
) -> Result<Vec<VarBind>, NoDataNotification> {
    let total = req_var_binds.len();
    let n = (non_repeaters.max(0) as usize).min(total);
    let r = total.saturating_sub(n);

    let mut next_meta = meta.clone();
    next_meta.next_flag = true;

    let mut response = if n > 0 {
        process_var_binds(&req_var_binds[..n], &next_meta, store, cache, variation_host)?
    } else {
        Vec::new()
    };

    if r == 0 {
        return Ok(response);
    }

    let mut m = max_repetitions.max(0) as usize;
    m = m.min(max_varbinds / r);

    let mut current: Vec<VarBind> = req_var_binds[total - r..].to_vec();

    while m > 0 {
        let round = process_var_binds(&current, &next_meta, store, cache, variation_host)?;
        response.extend(round);
        let tail_start = response.len() - r;
        current = response[tail_start..].to_vec();
        m -= 1;
    }

    Ok(response)
}
