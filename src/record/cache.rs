//! Bounded handle cache.
//!
//! A process-wide LRU over open record-file descriptors. Eviction only
//! closes the file descriptor; the record store that owns the path keeps
//! existing independently of whether its handle is currently open (the
//! store itself lives in `record::store::RecordStore`, not here).

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_CAPACITY: usize = 31;

pub struct HandleCache {
    capacity: usize,
    handles: HashMap<PathBuf, File>,
    recency: VecDeque<PathBuf>,
}

impl HandleCache {
    pub fn new(capacity: usize) -> Self {
        HandleCache {
            capacity: capacity.max(1),
            handles: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Run `f` against the open handle for `path`, opening it (and
    /// evicting the least-recently-used handle if at capacity) on a cache
    /// miss.
    pub fn with_handle<R>(
        &mut self,
        path: &Path,
        f: impl FnOnce(&mut File) -> io::Result<R>,
    ) -> io::Result<R> {
        if !self.handles.contains_key(path) {
            self.insert(path)?;
        } else {
            self.touch(path);
        }

        let handle = self.handles.get_mut(path).expect("just inserted or present");
        f(handle)
    }

    fn insert(&mut self, path: &Path) -> io::Result<()> {
        if self.handles.len() >= self.capacity {
            self.evict_lru();
        }
        let file = File::open(path)?;
        self.handles.insert(path.to_path_buf(), file);
        self.recency.push_back(path.to_path_buf());
        Ok(())
    }

    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.recency.iter().position(|p| p == path) {
            let entry = self.recency.remove(pos).unwrap();
            self.recency.push_back(entry);
        }
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self.recency.pop_front() {
            self.handles.remove(&oldest);
        }
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.handles.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Closes every open handle, e.g. at transport shutdown.
    pub fn close_all(&mut self) {
        self.handles.clear();
        self.recency.clear();
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
