//! snmpsim-responder: the simulator daemon. Discovers record files under
//! `--data-dir`, binds the configured transport endpoints, and answers
//! SNMP requests until interrupted.

use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use snmpsim::config::load_settings;
use snmpsim::pipeline::Registry;
use snmpsim::record::discover_stores;
use snmpsim::transport::Dispatcher;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings = load_settings(std::env::args().collect()).context("invalid configuration")?;

    let mut registry = Registry::new(settings.cache_capacity, settings.max_varbinds);

    let discovered = discover_stores(
        &settings.data_dir,
        settings.cache_dir.as_deref(),
        settings.force_index_rebuild,
        settings.validate_data,
    );

    if discovered.is_empty() {
        tracing::warn!("no record files discovered under any --data-dir");
    }

    for (keys, store) in discovered {
        let mut keys = keys.into_iter();
        if let Some(first) = keys.next() {
            for extra_key in keys {
                registry.register(extra_key, store.clone());
            }
            registry.register(first, store);
        }
    }

    tracing::info!(agents = registry.len(), "snmpsim {} starting", snmpsim::VERSION);

    let mut dispatcher = Dispatcher::new(registry);
    dispatcher.bind(&settings).context("failed to bind transport endpoints")?;

    let running = AtomicBool::new(true);
    dispatcher.run(&running);

    Ok(())
}
