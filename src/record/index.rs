//! Record index.
//!
//! A sorted-by-OID side file next to each record text file, giving O(log n)
//! exact and nearest-greater lookup without a linear scan. State machine:
//! `Missing -> build -> Fresh`, `Fresh -> (text newer) -> Stale -> rebuild
//! -> Fresh`, `Fresh -> (validate) -> Fresh | Corrupt -> rebuild -> Fresh`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::IndexBuildError;
use crate::oid::Oid;
use crate::record::grammar::{is_subtree_tag, parse_line};

const REFINEMENT_LOOP_BOUND: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: u64,
    pub subtree_flag: bool,
    pub prev_offset: Option<u64>,
}

pub enum LookupResult {
    Exact(IndexEntry),
    NearestGreater(Oid, IndexEntry),
    NotFound,
}

#[derive(Clone)]
pub struct RecordIndex {
    text_path: PathBuf,
    index_path: PathBuf,
    entries: BTreeMap<Oid, IndexEntry>,
    loaded: bool,
}

impl RecordIndex {
    /// Entry point of the state machine: builds, loads, or rebuilds the
    /// side file as needed and returns a `Fresh` index.
    pub fn create(
        text_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
        force_build: bool,
        validate: bool,
    ) -> Result<Self, IndexBuildError> {
        let text_path = text_path.as_ref().to_path_buf();
        let index_path = index_path.as_ref().to_path_buf();

        let needs_build = force_build || !index_path.exists() || Self::is_stale(&text_path, &index_path)?;

        let mut index = if needs_build {
            let entries = Self::scan_and_build(&text_path)?;
            let index = RecordIndex {
                text_path,
                index_path,
                entries,
                loaded: true,
            };
            index.write_side_file()?;
            index
        } else {
            let entries = Self::load_side_file(&index_path)?;
            RecordIndex {
                text_path,
                index_path,
                entries,
                loaded: true,
            }
        };

        if validate && !needs_build && !index.validate_against_text()? {
            let entries = Self::scan_and_build(&index.text_path)?;
            index.entries = entries;
            index.write_side_file()?;
        }

        Ok(index)
    }

    fn is_stale(text_path: &Path, index_path: &Path) -> Result<bool, IndexBuildError> {
        let text_mtime = Self::mtime(text_path)?;
        let index_mtime = Self::mtime(index_path)?;
        Ok(index_mtime < text_mtime)
    }

    fn mtime(path: &Path) -> Result<SystemTime, IndexBuildError> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|source| IndexBuildError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    /// Linear scan of the record text file, tracking byte offsets and the
    /// most recent subtree-flagged record seen, to compute each entry's
    /// `prev_offset`.
    fn scan_and_build(text_path: &Path) -> Result<BTreeMap<Oid, IndexEntry>, IndexBuildError> {
        let file = fs::File::open(text_path).map_err(|source| IndexBuildError::Io {
            path: text_path.display().to_string(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let mut entries = BTreeMap::new();
        let mut offset: u64 = 0;
        let mut prev_oid: Option<Oid> = None;
        // Offset of the most recent subtree-flagged record seen so far.
        // Carried forward unconditionally; the lookup engine re-validates
        // with an `is_prefix_of` check before trusting it, so this never
        // needs popping on leaving a subtree's range.
        let mut last_subtree_offset: Option<u64> = None;
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            if iterations > REFINEMENT_LOOP_BOUND {
                return Err(IndexBuildError::RefinementLoopBound(REFINEMENT_LOOP_BOUND));
            }

            let mut line = String::new();
            let bytes_read = reader
                .read_line(&mut line)
                .map_err(|source| IndexBuildError::Io {
                    path: text_path.display().to_string(),
                    source,
                })?;
            if bytes_read == 0 {
                break;
            }

            let line_offset = offset;
            offset += bytes_read as u64;

            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }

            let parsed = parse_line(trimmed).map_err(|_| IndexBuildError::NotMonotone {
                prev: prev_oid.as_ref().map(Oid::to_string).unwrap_or_default(),
                next: trimmed.to_string(),
                offset: line_offset,
            })?;

            if let Some(prev) = &prev_oid {
                if *prev >= parsed.oid {
                    return Err(IndexBuildError::NotMonotone {
                        prev: prev.to_string(),
                        next: parsed.oid.to_string(),
                        offset: line_offset,
                    });
                }
            }

            let prev_offset = last_subtree_offset;

            let subtree_flag = is_subtree_tag(&parsed.tag_spec);
            entries.insert(
                parsed.oid.clone(),
                IndexEntry {
                    offset: line_offset,
                    subtree_flag,
                    prev_offset,
                },
            );

            if subtree_flag {
                last_subtree_offset = Some(line_offset);
            }

            prev_oid = Some(parsed.oid);
        }

        Ok(entries)
    }

    fn write_side_file(&self) -> Result<(), IndexBuildError> {
        let mut out = String::new();
        for (oid, entry) in &self.entries {
            out.push_str(&format!(
                "{},{},{},{}\n",
                oid.canonical(),
                entry.offset,
                if entry.subtree_flag { 1 } else { 0 },
                entry
                    .prev_offset
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-1".to_string()),
            ));
        }

        fs::File::create(&self.index_path)
            .and_then(|mut f| f.write_all(out.as_bytes()))
            .map_err(|source| IndexBuildError::Io {
                path: self.index_path.display().to_string(),
                source,
            })
    }

    fn load_side_file(index_path: &Path) -> Result<BTreeMap<Oid, IndexEntry>, IndexBuildError> {
        let file = fs::File::open(index_path).map_err(|source| IndexBuildError::Io {
            path: index_path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);

        let mut entries = BTreeMap::new();
        for line in reader.lines() {
            let line = line.map_err(|source| IndexBuildError::Io {
                path: index_path.display().to_string(),
                source,
            })?;
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.splitn(4, ',').collect();
            if fields.len() != 4 {
                return Err(IndexBuildError::NotMonotone {
                    prev: String::new(),
                    next: line.clone(),
                    offset: 0,
                });
            }
            let oid: Oid = fields[0].parse().map_err(|_| IndexBuildError::NotMonotone {
                prev: String::new(),
                next: line.clone(),
                offset: 0,
            })?;
            let offset: u64 = fields[1].parse().unwrap_or(0);
            let subtree_flag = fields[2] == "1";
            let prev_offset = match fields[3].parse::<i64>().unwrap_or(-1) {
                -1 => None,
                v => Some(v as u64),
            };
            entries.insert(
                oid,
                IndexEntry {
                    offset,
                    subtree_flag,
                    prev_offset,
                },
            );
        }

        Ok(entries)
    }

    /// `Fresh -> (validate) -> Fresh | Corrupt`: re-scan the text file and
    /// compare against the loaded entries.
    fn validate_against_text(&self) -> Result<bool, IndexBuildError> {
        let rescanned = Self::scan_and_build(&self.text_path)?;
        Ok(rescanned == self.entries)
    }

    pub fn lookup(&self, oid: &Oid) -> LookupResult {
        if let Some(entry) = self.entries.get(oid) {
            return LookupResult::Exact(*entry);
        }
        match self.entries.range(oid.clone()..).next() {
            Some((next_oid, entry)) => LookupResult::NearestGreater(next_oid.clone(), *entry),
            None => LookupResult::NotFound,
        }
    }

    pub fn is_open(&self) -> bool {
        self.loaded
    }

    pub fn close(&mut self) {
        self.entries.clear();
        self.loaded = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
