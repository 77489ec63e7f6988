//! Configuration surface: CLI flags via `clap` derive, with an optional
//! YAML file providing the same knobs for batch deployments, layered
//! defaults -> file -> CLI-wins.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line surface; flag names kept close to the original tool's
/// so existing deployment scripts still work.
#[derive(Parser, Debug, Clone)]
#[command(name = "snmpsim-responder", about = "SNMP agent simulator")]
pub struct Cli {
    /// Root directory to scan for `.snmprec`/`.snmprec.gz` record files.
    /// Repeatable; later directories win on agent-identifier collision.
    #[arg(long = "data-dir")]
    pub data_dir: Vec<PathBuf>,

    /// Directory to write rebuilt index files into when `--data-dir` is
    /// read-only.
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long = "force-index-rebuild")]
    pub force_index_rebuild: bool,

    #[arg(long = "validate-data")]
    pub validate_data: bool,

    /// Kept for CLI compatibility with the original tool; this build's
    /// variation modules are compiled in, not dynamically loaded (see
    /// DESIGN.md).
    #[arg(long = "variation-modules-dir")]
    pub variation_modules_dir: Vec<PathBuf>,

    #[arg(long = "variation-module-options")]
    pub variation_module_options: Vec<String>,

    #[arg(long = "agent-udpv4-endpoint")]
    pub agent_udpv4_endpoint: Vec<String>,

    #[arg(long = "agent-udpv6-endpoint")]
    pub agent_udpv6_endpoint: Vec<String>,

    #[arg(long = "agent-unix-endpoint")]
    pub agent_unix_endpoint: Vec<String>,

    #[arg(long = "transport-id-offset", default_value_t = 0)]
    pub transport_id_offset: u32,

    #[arg(long = "max-varbinds", default_value_t = 64)]
    pub max_varbinds: usize,

    /// Max number of open record-file handles kept by the handle cache.
    #[arg(long = "cache-capacity", default_value_t = 31)]
    pub cache_capacity: usize,

    #[arg(long = "v2c-arch")]
    pub v2c_arch: bool,

    /// Starts a new v3 engine block; each subsequent `--v3-*` flag
    /// (up to the next `--v3-engine-id`) belongs to this engine.
    #[arg(long = "v3-engine-id")]
    pub v3_engine_id: Vec<String>,

    #[arg(long = "v3-context-engine-id")]
    pub v3_context_engine_id: Vec<String>,

    #[arg(long = "v3-user")]
    pub v3_user: Vec<String>,

    #[arg(long = "v3-auth-key")]
    pub v3_auth_key: Vec<String>,

    #[arg(long = "v3-auth-proto")]
    pub v3_auth_proto: Vec<String>,

    #[arg(long = "v3-priv-key")]
    pub v3_priv_key: Vec<String>,

    #[arg(long = "v3-priv-proto")]
    pub v3_priv_proto: Vec<String>,

    /// Read additional arguments from `file`, one per line, and append
    /// them to the command line before parsing.
    #[arg(long = "args-from-file")]
    pub args_from_file: Option<PathBuf>,

    /// Optional YAML file providing these same settings; CLI flags win
    /// over anything it sets.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Extra positional arguments are a fatal configuration error;
    /// captured here so the caller can report them instead of clap
    /// silently erroring.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

/// One USM engine's static identity, grouped positionally from the
/// repeated `--v3-*` flags: the Nth value of each flag belongs to the
/// Nth `--v3-engine-id` block. A flag missing for a given index is
/// treated as unset for that engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct V3EngineSettings {
    pub engine_id: String,
    pub context_engine_id: Option<String>,
    pub user: Option<String>,
    pub auth_key: Option<String>,
    pub auth_proto: Option<String>,
    pub priv_key: Option<String>,
    pub priv_proto: Option<String>,
}

/// Fully resolved settings: CLI flags layered over an optional YAML file,
/// with default -> file -> CLI-wins precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: Vec<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub force_index_rebuild: bool,
    pub validate_data: bool,
    pub variation_modules_dir: Vec<PathBuf>,
    pub variation_module_options: Vec<String>,
    pub agent_udpv4_endpoint: Vec<String>,
    pub agent_udpv6_endpoint: Vec<String>,
    pub agent_unix_endpoint: Vec<String>,
    pub transport_id_offset: u32,
    pub max_varbinds: usize,
    pub cache_capacity: usize,
    pub v2c_arch: bool,
    pub v3_engines: Vec<V3EngineSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: Vec::new(),
            cache_dir: None,
            force_index_rebuild: false,
            validate_data: false,
            variation_modules_dir: Vec::new(),
            variation_module_options: Vec::new(),
            agent_udpv4_endpoint: Vec::new(),
            agent_udpv6_endpoint: Vec::new(),
            agent_unix_endpoint: Vec::new(),
            transport_id_offset: 0,
            max_varbinds: 64,
            cache_capacity: 31,
            v2c_arch: false,
            v3_engines: Vec::new(),
        }
    }
}

impl Settings {
    /// Layer a parsed `Cli` over a YAML-sourced base. Any `Vec` the CLI
    /// left empty, or scalar field left at its clap default, keeps the
    /// base's value; a non-empty/non-default CLI value wins.
    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        if !cli.data_dir.is_empty() {
            self.data_dir = cli.data_dir.clone();
        }
        if cli.cache_dir.is_some() {
            self.cache_dir = cli.cache_dir.clone();
        }
        self.force_index_rebuild = self.force_index_rebuild || cli.force_index_rebuild;
        self.validate_data = self.validate_data || cli.validate_data;
        if !cli.variation_modules_dir.is_empty() {
            self.variation_modules_dir = cli.variation_modules_dir.clone();
        }
        if !cli.variation_module_options.is_empty() {
            self.variation_module_options = cli.variation_module_options.clone();
        }
        if !cli.agent_udpv4_endpoint.is_empty() {
            self.agent_udpv4_endpoint = cli.agent_udpv4_endpoint.clone();
        }
        if !cli.agent_udpv6_endpoint.is_empty() {
            self.agent_udpv6_endpoint = cli.agent_udpv6_endpoint.clone();
        }
        if !cli.agent_unix_endpoint.is_empty() {
            self.agent_unix_endpoint = cli.agent_unix_endpoint.clone();
        }
        if cli.transport_id_offset != 0 {
            self.transport_id_offset = cli.transport_id_offset;
        }
        if cli.max_varbinds != 64 {
            self.max_varbinds = cli.max_varbinds;
        }
        if cli.cache_capacity != 31 {
            self.cache_capacity = cli.cache_capacity;
        }
        self.v2c_arch = self.v2c_arch || cli.v2c_arch;
        if !cli.v3_engine_id.is_empty() {
            self.v3_engines = group_v3_engines(cli);
        }
        self
    }
}

fn group_v3_engines(cli: &Cli) -> Vec<V3EngineSettings> {
    cli.v3_engine_id
        .iter()
        .enumerate()
        .map(|(i, engine_id)| V3EngineSettings {
            engine_id: engine_id.clone(),
            context_engine_id: cli.v3_context_engine_id.get(i).cloned(),
            user: cli.v3_user.get(i).cloned(),
            auth_key: cli.v3_auth_key.get(i).cloned(),
            auth_proto: cli.v3_auth_proto.get(i).cloned(),
            priv_key: cli.v3_priv_key.get(i).cloned(),
            priv_proto: cli.v3_priv_proto.get(i).cloned(),
        })
        .collect()
}
