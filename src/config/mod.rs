//! Configuration: CLI parsing via `clap`, optional YAML file layering via
//! `serde_yaml`, with defaults -> file -> CLI-wins precedence.

pub mod settings;

pub use settings::{Cli, Settings, V3EngineSettings};

use clap::Parser;

use crate::error::ConfigError;

/// Splice `--args-from-file <path>` (or `=path`) into the argument list
/// before clap sees it: each non-blank line in the file becomes one
/// additional argument.
pub fn expand_args_from_file(args: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        let path = if arg == "--args-from-file" {
            Some(iter.next().ok_or_else(|| {
                ConfigError::InvalidArgs("--args-from-file requires a path argument".to_string())
            })?)
        } else {
            arg.strip_prefix("--args-from-file=").map(str::to_string)
        };

        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::ReadFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                out.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
            }
            None => out.push(arg),
        }
    }

    Ok(out)
}

/// Parse `argv` (including the program name at index 0) into a fully
/// resolved `Settings`: expand `--args-from-file`, parse with clap,
/// reject stray positional arguments, layer over an optional `--config`
/// YAML file, then validate that every `--data-dir` exists.
pub fn load_settings(argv: Vec<String>) -> Result<Settings, ConfigError> {
    let expanded = expand_args_from_file(argv)?;
    let cli = Cli::try_parse_from(expanded)
        .map_err(|e| ConfigError::InvalidArgs(e.to_string()))?;

    if !cli.extra.is_empty() {
        return Err(ConfigError::ExtraArgs(cli.extra.clone()));
    }

    let base = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                path: path.display().to_string(),
                source,
            })?;
            serde_yaml::from_str::<Settings>(&contents).map_err(|source| {
                ConfigError::ParseFile {
                    path: path.display().to_string(),
                    source,
                }
            })?
        }
        None => Settings::default(),
    };

    let settings = base.merge_cli(&cli);

    for dir in &settings.data_dir {
        if !dir.exists() {
            return Err(ConfigError::MissingDataDir(dir.display().to_string()));
        }
    }

    Ok(settings)
}
