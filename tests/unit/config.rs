//! Config loading exercised through the public `load_settings` entry
//! point, the way the two binaries call it.

use std::fs;

use snmpsim::config::load_settings;
use snmpsim::error::ConfigError;

fn argv(extra: &[&str]) -> Vec<String> {
    std::iter::once("snmpsim-responder".to_string())
        .chain(extra.iter().map(|s| s.to_string()))
        .collect()
}

#[test]
fn loads_defaults_with_no_data_dirs() {
    let settings = load_settings(argv(&[])).unwrap();
    assert!(settings.data_dir.is_empty());
    assert_eq!(settings.max_varbinds, 64);
    assert_eq!(settings.cache_capacity, 31);
}

#[test]
fn rejects_a_data_dir_that_does_not_exist() {
    let err = load_settings(argv(&["--data-dir", "/definitely/not/a/real/path"])).unwrap_err();
    assert!(matches!(err, ConfigError::MissingDataDir(_)));
}

#[test]
fn cli_flags_win_over_config_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("snmpsim.yml");
    fs::write(&config_path, "max_varbinds: 32\ncache_capacity: 8\n").unwrap();

    let settings = load_settings(argv(&[
        "--config",
        config_path.to_str().unwrap(),
        "--max-varbinds",
        "16",
    ]))
    .unwrap();

    assert_eq!(settings.max_varbinds, 16, "CLI flag overrides the file");
    assert_eq!(settings.cache_capacity, 8, "file value kept where CLI didn't override");
}

#[test]
fn repeated_data_dir_flags_collect_every_root() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let settings = load_settings(argv(&[
        "--data-dir",
        a.path().to_str().unwrap(),
        "--data-dir",
        b.path().to_str().unwrap(),
    ]))
    .unwrap();

    assert_eq!(settings.data_dir.len(), 2);
}
