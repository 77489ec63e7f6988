//! A demonstration variation module shipped in the crate: a free-running
//! counter seeded from the record's own value, stepped once per GET.
//!
//! Grounded on the source's bundled `variation/numeric.py`, which walks a
//! seed across repeated reads the same way: each record file/OID pair gets
//! its own running value, so two agents sharing a record file still count
//! independently.

use std::collections::HashMap;

use crate::error::RecordError;
use crate::oid::Oid;
use crate::value::SnmpValue;

use super::{VariationCallContext, VariationModule, VariationOutcome};

/// `args` accepted in the record's `:numeric` suffix: `min,max,step`, all
/// optional, defaulting to `0,2147483647,1`.
#[derive(Debug, Clone, Copy)]
struct NumericArgs {
    min: i64,
    max: i64,
    step: i64,
}

impl Default for NumericArgs {
    fn default() -> Self {
        NumericArgs {
            min: 0,
            max: i64::from(i32::MAX),
            step: 1,
        }
    }
}

fn parse_args(raw: &str) -> NumericArgs {
    let mut args = NumericArgs::default();
    let fields: Vec<&str> = raw.split(',').filter(|s| !s.is_empty()).collect();
    if let Some(v) = fields.first().and_then(|s| s.parse().ok()) {
        args.min = v;
    }
    if let Some(v) = fields.get(1).and_then(|s| s.parse().ok()) {
        args.max = v;
    }
    if let Some(v) = fields.get(2).and_then(|s| s.parse().ok()) {
        args.step = v;
    }
    args
}

#[derive(Default)]
pub struct NumericModule {
    state: HashMap<(String, String), i64>,
}

impl NumericModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariationModule for NumericModule {
    fn variate(
        &mut self,
        data_file: &str,
        oid: &Oid,
        _raw_tag: u32,
        raw_value: &str,
        ctx: VariationCallContext,
    ) -> Result<VariationOutcome, RecordError> {
        let args = parse_args(&ctx.args);
        let key = (data_file.to_string(), oid.canonical());

        let current = *self.state.entry(key.clone()).or_insert_with(|| {
            raw_value.trim().parse::<i64>().unwrap_or(args.min)
        });

        let next = if current + args.step > args.max {
            args.min
        } else {
            current + args.step
        };
        self.state.insert(key, next);

        Ok(VariationOutcome::Value(oid.clone(), SnmpValue::Integer(current)))
    }
}
