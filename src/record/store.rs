//! Ties the grammar, index and handle cache into one record store: a
//! single data file that answers lookups for one simulated agent.

use std::io::{BufRead, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::context::EvalContext;
use crate::error::{IndexBuildError, RecordError};
use crate::oid::Oid;
use crate::record::cache::HandleCache;
use crate::record::grammar::{evaluate_value, parse_line, EvalOutcome};
use crate::record::index::{IndexEntry, LookupResult, RecordIndex};
use crate::variation::VariationHost;

/// One result of a store lookup: which record (if any) matched, and
/// whether the match was exact (the lookup engine uses this to pick
/// the default error status).
pub enum StoreLookup {
    Exact(Oid, IndexEntry),
    NearestGreater(Oid, IndexEntry),
    NotFound,
}

#[derive(Clone)]
pub struct RecordStore {
    pub agent_id: String,
    text_path: PathBuf,
    index: RecordIndex,
}

impl RecordStore {
    pub fn open(
        text_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
        agent_id: impl Into<String>,
        force_build: bool,
        validate: bool,
    ) -> Result<Self, IndexBuildError> {
        let text_path = text_path.as_ref().to_path_buf();
        let index_path = index_path.as_ref().to_path_buf();

        let resolved_text_path = if text_path.extension().is_some_and(|ext| ext == "gz") {
            decompress_gz_sidecar(&text_path, &index_path)?
        } else {
            text_path
        };

        let index = RecordIndex::create(&resolved_text_path, &index_path, force_build, validate)?;
        Ok(RecordStore {
            agent_id: agent_id.into(),
            text_path: resolved_text_path,
            index,
        })
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn lookup(&self, oid: &Oid) -> StoreLookup {
        match self.index.lookup(oid) {
            LookupResult::Exact(entry) => StoreLookup::Exact(oid.clone(), entry),
            LookupResult::NearestGreater(next_oid, entry) => {
                StoreLookup::NearestGreater(next_oid, entry)
            }
            LookupResult::NotFound => StoreLookup::NotFound,
        }
    }

    pub fn record_count(&self) -> usize {
        self.index.len()
    }

    pub fn close_index(&mut self) {
        self.index.close();
    }

    /// Read and parse the record line at `offset`, without evaluating it.
    pub fn read_parsed_at(
        &self,
        cache: &mut HandleCache,
        offset: u64,
    ) -> Result<crate::record::grammar::ParsedLine, RecordError> {
        let line = self
            .read_line_at(cache, offset)
            .map_err(|_| RecordError::BadRecord(format!("I/O error at offset {offset}")))?;
        parse_line(&line)
    }

    /// Read the record immediately following the one at `offset`
    /// (sequential successor, not an index lookup): the "move to the
    /// next record" step of a GETNEXT walk. Returns `None` at end of file.
    pub fn read_next_parsed_after(
        &self,
        cache: &mut HandleCache,
        offset: u64,
    ) -> Result<Option<(u64, crate::record::grammar::ParsedLine)>, RecordError> {
        let (current_len, next) = cache
            .with_handle(&self.text_path, |file| {
                file.seek(SeekFrom::Start(offset))?;
                let mut reader = std::io::BufReader::new(file);
                let mut current = String::new();
                let current_len = reader.read_line(&mut current)? as u64;
                if current_len == 0 {
                    return Ok((0u64, None));
                }
                let mut next = String::new();
                let next_len = reader.read_line(&mut next)?;
                if next_len == 0 {
                    Ok((current_len, None))
                } else {
                    Ok((current_len, Some(next.trim_end_matches(['\n', '\r']).to_string())))
                }
            })
            .map_err(|_| RecordError::BadRecord(format!("I/O error at offset {offset}")))?;

        match next {
            Some(line) => {
                let parsed = parse_line(&line)?;
                Ok(Some((offset + current_len, parsed)))
            }
            None => Ok(None),
        }
    }

    /// Evaluate an already-parsed line, the join point between locating
    /// and reading raw bytes and parsing/evaluating them.
    pub fn evaluate_parsed(
        &self,
        parsed: &crate::record::grammar::ParsedLine,
        subtree_flag: bool,
        ctx: &mut EvalContext,
        variation_host: &mut VariationHost,
    ) -> Result<EvalOutcome, RecordError> {
        ctx.subtree_flag = subtree_flag;
        ctx.data_file = self.text_path.display().to_string();
        evaluate_value(
            parsed.oid.clone(),
            &parsed.tag_spec,
            &parsed.raw_value,
            ctx,
            variation_host,
        )
    }

    /// Read the line at `entry.offset` and evaluate it in one step.
    pub fn read_and_evaluate(
        &self,
        entry: &IndexEntry,
        cache: &mut HandleCache,
        ctx: &mut EvalContext,
        variation_host: &mut VariationHost,
    ) -> Result<EvalOutcome, RecordError> {
        let parsed = self.read_parsed_at(cache, entry.offset)?;
        self.evaluate_parsed(&parsed, entry.subtree_flag, ctx, variation_host)
    }

    fn read_line_at(&self, cache: &mut HandleCache, offset: u64) -> std::io::Result<String> {
        cache.with_handle(&self.text_path, |file| {
            file.seek(SeekFrom::Start(offset))?;
            let mut reader = std::io::BufReader::new(file);
            let mut line = String::new();
            reader.read_line(&mut line)?;
            Ok(line.trim_end_matches(['\n', '\r']).to_string())
        })
    }
}

/// Derive an agent identifier from a record file's path relative to a data
/// root: strip the `.snmprec`/`.snmprec.gz` extension, split on path
/// separators, drop any literal `self` component (lets an agent register
/// under its parent's path too), rejoin with `/`.
pub fn derive_agent_id(relative_path: &Path) -> String {
    let mut name = relative_path.to_string_lossy().to_string();
    for ext in [".snmprec.gz", ".snmprec"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped.to_string();
            break;
        }
    }

    let components: Vec<&str> = name
        .split(std::path::is_separator)
        .filter(|c| !c.is_empty() && *c != "self")
        .collect();

    components.join("/")
}

/// Recursively discover record files under `data_dirs`, open a
/// `RecordStore` for each, and return it paired with every key it should
/// be registered under: its agent identifier, plus the MD5 digest of
/// that identifier when it exceeds 32 bytes (an agent registers under
/// both its literal identifier and its MD5 digest).
///
/// Index side files are written next to the record file unless
/// `cache_dir` is given, in which case they mirror the file's path
/// relative to the data directory it was found under.
pub fn discover_stores(
    data_dirs: &[PathBuf],
    cache_dir: Option<&Path>,
    force_build: bool,
    validate: bool,
) -> Vec<(Vec<String>, RecordStore)> {
    let mut out = Vec::new();
    let mut instrum_entries: Vec<(Vec<String>, PathBuf)> = Vec::new();

    for root in data_dirs {
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "failed to scan data directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }

                let name = path.to_string_lossy();
                if !(name.ends_with(".snmprec") || name.ends_with(".snmprec.gz")) {
                    continue;
                }

                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                let agent_id = derive_agent_id(&relative);

                let index_path = match cache_dir {
                    Some(cache) => cache.join(&relative).with_extension("index"),
                    None => path.with_extension(format!(
                        "{}.index",
                        path.extension().and_then(|e| e.to_str()).unwrap_or("")
                    )),
                };

                match RecordStore::open(&path, &index_path, agent_id.clone(), force_build, validate)
                {
                    Ok(store) => {
                        let mut keys = vec![agent_id.clone()];
                        let hashed = crate::util::hash_if_long(&agent_id);
                        if hashed != agent_id {
                            keys.push(hashed);
                        }
                        instrum_entries.push((keys.clone(), path.clone()));
                        out.push((keys, store));
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "failed to open record file, skipping");
                    }
                }
            }
        }
    }

    if let Some(store) = build_index_instrumentation_store(&instrum_entries, cache_dir) {
        out.push((vec!["_index".to_string()], store));
    }

    out
}

/// Build a read-only diagnostic record store listing every other data
/// file this process discovered, the way `DataIndexInstrumController`
/// answers a dedicated SNMP context with each registered data file's path
/// and agent identifier(s). Registered under agent identifier `_index`,
/// answerable like any other community/context.
///
/// OIDs follow the controller's own layout: a base of
/// `1.3.6.1.4.1.20408.999.1`, then `.<column>.<row>`, column-major so the
/// generated text stays in the strict ascending order the index requires.
fn build_index_instrumentation_store(
    entries: &[(Vec<String>, PathBuf)],
    cache_dir: Option<&Path>,
) -> Option<RecordStore> {
    if entries.is_empty() {
        return None;
    }

    const BASE: &str = "1.3.6.1.4.1.20408.999.1";
    let mut lines = String::new();
    for (row, (_, path)) in entries.iter().enumerate() {
        lines.push_str(&format!("{BASE}.1.{}|4|{}\n", row + 1, path.display()));
    }
    for (row, (keys, _)) in entries.iter().enumerate() {
        lines.push_str(&format!("{BASE}.2.{}|4|{}\n", row + 1, keys.join(",")));
    }

    let dir = cache_dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
    if std::fs::create_dir_all(&dir).is_err() {
        return None;
    }
    let text_path = dir.join(format!("_index.{}.snmprec", std::process::id()));
    let index_path = text_path.with_extension("snmprec.index");
    if std::fs::write(&text_path, &lines).is_err() {
        tracing::warn!("failed to write _index instrumentation store, skipping");
        return None;
    }

    match RecordStore::open(&text_path, &index_path, "_index", true, false) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build _index instrumentation store");
            None
        }
    }
}

/// Decompress a `.snmprec.gz` file into a seekable sidecar next to
/// `index_path`, since a gzip stream isn't natively seekable. Skipped
/// when the sidecar is already newer than the source.
fn decompress_gz_sidecar(gz_path: &Path, index_path: &Path) -> Result<PathBuf, IndexBuildError> {
    let sidecar = index_path.with_extension("snmprec");

    let up_to_date = match (std::fs::metadata(&sidecar), std::fs::metadata(gz_path)) {
        (Ok(side_meta), Ok(src_meta)) => match (side_meta.modified(), src_meta.modified()) {
            (Ok(side_mtime), Ok(src_mtime)) => side_mtime >= src_mtime,
            _ => false,
        },
        _ => false,
    };

    if up_to_date {
        return Ok(sidecar);
    }

    if let Some(parent) = sidecar.parent() {
        std::fs::create_dir_all(parent).map_err(|source| IndexBuildError::Io {
            path: sidecar.display().to_string(),
            source,
        })?;
    }

    let source_file = std::fs::File::open(gz_path).map_err(|source| IndexBuildError::Io {
        path: gz_path.display().to_string(),
        source,
    })?;
    let mut decoder = flate2::read::GzDecoder::new(source_file);
    let mut sidecar_file = std::fs::File::create(&sidecar).map_err(|source| IndexBuildError::Io {
        path: sidecar.display().to_string(),
        source,
    })?;
    std::io::copy(&mut decoder, &mut sidecar_file).map_err(|source| IndexBuildError::Io {
        path: sidecar.display().to_string(),
        source,
    })?;

    Ok(sidecar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn strips_extension_and_self_component() {
        let path = Path::new("public/self/agent.snmprec");
        assert_eq!(derive_agent_id(path), "public/agent");
    }

    #[test]
    fn opens_gz_compressed_record_file_via_sidecar() {
        use std::io::Write;

        let dir = tempdir().unwrap();
        let gz_path = dir.path().join("public.snmprec.gz");
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(b"1.3.6.1.2.1.1.1.0|4|Agent One\n")
            .unwrap();
        let compressed = encoder.finish().unwrap();
        fs::write(&gz_path, compressed).unwrap();

        let index_path = dir.path().join("public.snmprec.index");
        let store = RecordStore::open(&gz_path, &index_path, "public", true, false).unwrap();
        assert_eq!(store.record_count(), 1);

        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        match store.lookup(&oid) {
            StoreLookup::Exact(_, entry) => assert_eq!(entry.offset, 0),
            _ => panic!("expected exact match"),
        }
    }

    #[test]
    fn strips_gz_extension() {
        let path = Path::new("public/agent.snmprec.gz");
        assert_eq!(derive_agent_id(path), "public/agent");
    }

    #[test]
    fn opens_and_looks_up() {
        let dir = tempdir().unwrap();
        let text_path = dir.path().join("public.snmprec");
        fs::write(&text_path, "1.3.6.1.2.1.1.1.0|4|Agent One\n").unwrap();
        let index_path = dir.path().join("public.snmprec.index");

        let store = RecordStore::open(&text_path, &index_path, "public", true, false).unwrap();
        assert_eq!(store.record_count(), 1);

        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        match store.lookup(&oid) {
            StoreLookup::Exact(_, entry) => assert_eq!(entry.offset, 0),
            _ => panic!("expected exact match"),
        }
    }

    #[test]
    fn reads_and_evaluates_matched_line() {
        let dir = tempdir().unwrap();
        let text_path = dir.path().join("public.snmprec");
        fs::write(&text_path, "1.3.6.1.2.1.1.1.0|4|Agent One\n").unwrap();
        let index_path = dir.path().join("public.snmprec.index");

        let store = RecordStore::open(&text_path, &index_path, "public", true, false).unwrap();
        let mut cache = HandleCache::new(4);
        let mut host = VariationHost::new();

        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let entry = match store.lookup(&oid) {
            StoreLookup::Exact(_, entry) => entry,
            _ => panic!("expected exact match"),
        };

        let mut ctx = EvalContext {
            meta: crate::context::RequestMeta::default(),
            orig_oid: oid.clone(),
            orig_value: crate::value::SnmpValue::Null,
            data_file: String::new(),
            subtree_flag: false,
            exact_match: true,
            error_status: crate::value::SnmpValue::NoSuchInstance,
            vars_total: 1,
            vars_remaining: 0,
            oid_only: false,
            extension: Default::default(),
        };

        match store
            .read_and_evaluate(&entry, &mut cache, &mut ctx, &mut host)
            .unwrap()
        {
            EvalOutcome::Value(got_oid, value) => {
                assert_eq!(got_oid, oid);
                assert_eq!(value, crate::value::SnmpValue::OctetString(b"Agent One".to_vec()));
            }
            EvalOutcome::Drop => panic!("expected a value"),
        }
    }
}
