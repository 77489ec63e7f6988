//! Variation module host.
//!
//! The source loads variation modules as Python scripts with `init`,
//! `variate` and `shutdown` entry points, found on a search path and
//! imported by name. Here a variation module is a `dyn VariationModule`
//! trait object, registered by name at startup; `init`/`shutdown` still run
//! once per module, `variate` still runs once per matching record line.

use std::collections::HashMap;

use crate::error::RecordError;
use crate::oid::Oid;
use crate::value::SnmpValue;

pub mod builtin;

/// Per-call context passed to a module's `variate`, mirroring the keyword
/// arguments the source's `variate(oid, tag, value, **context)` receives.
#[derive(Debug, Clone)]
pub struct VariationCallContext {
    pub args: String,
    pub subtree_flag: bool,
    pub exact_match: bool,
    pub set_flag: bool,
    pub next_flag: bool,
    pub vars_total: usize,
    pub vars_remaining: usize,
    pub orig_oid: Oid,
    pub orig_value: SnmpValue,
    pub extension: HashMap<String, String>,
}

pub enum VariationOutcome {
    Value(Oid, SnmpValue),
    Drop,
}

/// The plugin contract itself. Modules are kept in-process as trait
/// objects rather than loaded as separate interpreters or dylibs.
pub trait VariationModule: Send {
    /// Called once, with the raw `args` string taken from the module's own
    /// `moduleOptions` record (if any), before first use against any data
    /// file.
    fn init(&mut self, _options: &str) -> Result<(), RecordError> {
        Ok(())
    }

    /// Per-record-line entry point. `raw_tag`/`raw_value` are the record's
    /// still-undecoded fields so the module can apply its own decoding
    /// rules (e.g. treat the value as a counter seed rather than a literal).
    fn variate(
        &mut self,
        data_file: &str,
        oid: &Oid,
        raw_tag: u32,
        raw_value: &str,
        ctx: VariationCallContext,
    ) -> Result<VariationOutcome, RecordError>;

    /// Called once per module at transport shutdown.
    fn shutdown(&mut self) {}
}

/// Registry + per-(module, data_file) state holder. One host is shared by
/// every record store; modules are free to key their own state off
/// `data_file` the way `DataFile`-scoped dicts do in the source.
pub struct VariationHost {
    modules: HashMap<String, Box<dyn VariationModule>>,
}

impl VariationHost {
    pub fn new() -> Self {
        VariationHost {
            modules: HashMap::new(),
        }
    }

    /// Register and initialize a module under `name`, the identifier used
    /// in a record tag's `:MODULE` suffix.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut module: Box<dyn VariationModule>,
        options: &str,
    ) -> Result<(), RecordError> {
        module.init(options)?;
        self.modules.insert(name.into(), module);
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn variate(
        &mut self,
        name: &str,
        data_file: &str,
        oid: &Oid,
        raw_tag: u32,
        raw_value: &str,
        ctx: VariationCallContext,
    ) -> Result<VariationOutcome, RecordError> {
        let module = self
            .modules
            .get_mut(name)
            .ok_or_else(|| RecordError::UnknownVariation(name.to_string()))?;
        module.variate(data_file, oid, raw_tag, raw_value, ctx)
    }

    /// Calls every loaded module's `shutdown`, in registration order is not
    /// guaranteed (`HashMap`); the source does not rely on ordering either.
    pub fn shutdown_all(&mut self) {
        for module in self.modules.values_mut() {
            module.shutdown();
        }
    }
}

impl Default for VariationHost {
    fn default() -> Self {
        Self::new()
    }
}
