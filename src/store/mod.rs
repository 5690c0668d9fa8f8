//! `FileContentStore` (spec §4.1): owns the raw bytes of every
//! ingested file — and, as the sole owner of the path <-> `FileId`
//! mapping, everything else keyed off "which file is this": line
//! offsets for O(log n) line/column lookup, a cheap `fast_hash` for
//! change detection and a full `content_hash` for exact comparison,
//! and the file's last-known modification time. Entries are evicted
//! least-recently-used once their combined size passes a configured
//! cap.
//!
//! Concurrency discipline mirrors the teacher's index backend: many
//! readers may resolve bytes concurrently, but mutation (insert,
//! remove, eviction) takes an exclusive lock. `parking_lot::RwLock`
//! is used in place of the standard library's for its smaller,
//! non-poisoning lock.

pub mod stringref;

pub use stringref::StringRef;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::ids::{FileId, FileIdAllocator};
use crate::mask::CharacterMask;

/// Default total-byte budget before the store starts evicting.
/// 256 MiB comfortably holds a mid-sized monorepo's text files while
/// bounding resident memory for very large ones.
pub const DEFAULT_CAPACITY_BYTES: u64 = 256 * 1024 * 1024;

/// Bytes of a file's prefix that `fast_hash` actually hashes. Cheap
/// enough to run on every insert as a first-pass change check before
/// falling back to the full `content_hash`.
const FAST_HASH_PREFIX: usize = 4096;

struct Entry {
    path: String,
    bytes: Arc<Vec<u8>>,
    mask: CharacterMask,
    line_offsets: Vec<u32>,
    fast_hash: u64,
    content_hash: u64,
    last_modified: Option<SystemTime>,
    /// Monotonic access counter; larger means more recently touched.
    last_access: u64,
}

/// Byte-addressable, LRU-evicting store of file contents, keyed by
/// `FileId` and path.
pub struct FileContentStore {
    capacity_bytes: u64,
    resident_bytes: u64,
    clock: u64,
    allocator: FileIdAllocator,
    entries: RwLock<HashMap<FileId, Entry>>,
    path_to_file: RwLock<HashMap<String, FileId>>,
}

impl FileContentStore {
    pub fn new(capacity_bytes: u64) -> Self {
        FileContentStore {
            capacity_bytes,
            resident_bytes: 0,
            clock: 0,
            allocator: FileIdAllocator::new(),
            entries: RwLock::new(HashMap::new()),
            path_to_file: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY_BYTES)
    }

    /// Read `path` off disk and insert its content, allocating a fresh
    /// `FileId`. Re-loading a previously-seen path allocates a new id
    /// and drops the old entry (spec §4.1).
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<FileId> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let last_modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let (file_id, _old) = self.insert_bytes(&path.display().to_string(), bytes, last_modified);
        Ok(file_id)
    }

    /// Insert or replace the content at `path`, allocating a fresh
    /// `FileId` and evicting other files' LRU entries as needed to stay
    /// under the byte cap. A single file larger than the entire cap is
    /// still admitted — the store never refuses the file that's
    /// actively being requested — but it will be the first evicted on
    /// the next insert.
    ///
    /// Returns the new `FileId` and, if `path` was already indexed,
    /// the `FileId` it previously held (so the caller can drop that
    /// id's entries from the trigram index, symbol table, etc).
    pub fn insert_bytes(
        &mut self,
        path: &str,
        bytes: Vec<u8>,
        last_modified: Option<SystemTime>,
    ) -> (FileId, Option<FileId>) {
        let old_id = self.path_to_file.read().get(path).copied();
        if let Some(old_id) = old_id {
            self.remove(old_id);
        }

        let file_id = self.allocator.next();
        let mask = CharacterMask::from_bytes(&bytes);
        let line_offsets = compute_line_offsets(&bytes);
        let fast_hash = fnv1a(&bytes[..bytes.len().min(FAST_HASH_PREFIX)]);
        let content_hash = fnv1a(&bytes);
        let size = bytes.len() as u64;
        self.clock += 1;
        let clock = self.clock;

        let mut entries = self.entries.write();
        self.resident_bytes += size;
        entries.insert(
            file_id,
            Entry {
                path: path.to_string(),
                bytes: Arc::new(bytes),
                mask,
                line_offsets,
                fast_hash,
                content_hash,
                last_modified,
                last_access: clock,
            },
        );
        drop(entries);
        self.path_to_file.write().insert(path.to_string(), file_id);

        self.evict_if_needed(file_id);
        (file_id, old_id)
    }

    /// Legacy direct-FileId insert, for callers (and tests) that
    /// already have an id and don't need path tracking.
    pub fn insert(&mut self, file_id: FileId, bytes: Vec<u8>) -> Arc<CharacterMask> {
        let mask = CharacterMask::from_bytes(&bytes);
        let line_offsets = compute_line_offsets(&bytes);
        let fast_hash = fnv1a(&bytes[..bytes.len().min(FAST_HASH_PREFIX)]);
        let content_hash = fnv1a(&bytes);
        let size = bytes.len() as u64;
        self.clock += 1;
        let clock = self.clock;

        let mut entries = self.entries.write();
        if let Some(old) = entries.remove(&file_id) {
            self.resident_bytes -= old.bytes.len() as u64;
        }

        self.resident_bytes += size;
        entries.insert(
            file_id,
            Entry {
                path: String::new(),
                bytes: Arc::new(bytes),
                mask: mask.clone(),
                line_offsets,
                fast_hash,
                content_hash,
                last_modified: None,
                last_access: clock,
            },
        );
        drop(entries);

        self.evict_if_needed(file_id);
        Arc::new(mask)
    }

    fn evict_if_needed(&mut self, just_inserted: FileId) {
        if self.resident_bytes <= self.capacity_bytes {
            return;
        }
        let mut entries = self.entries.write();
        loop {
            if self.resident_bytes <= self.capacity_bytes {
                break;
            }
            let victim = entries
                .iter()
                .filter(|(id, _)| **id != just_inserted)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(id, _)| *id);
            match victim {
                Some(id) => {
                    if let Some(entry) = entries.remove(&id) {
                        self.resident_bytes -= entry.bytes.len() as u64;
                    }
                }
                None => break,
            }
        }
    }

    /// Fetch a file's bytes, bumping its recency. Returns `None` if
    /// the file was never indexed or has been evicted.
    pub fn get(&mut self, file_id: FileId) -> Option<Arc<Vec<u8>>> {
        self.clock += 1;
        let clock = self.clock;
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&file_id)?;
        entry.last_access = clock;
        Some(entry.bytes.clone())
    }

    /// Read-only access that does not update recency — used by
    /// concurrent search workers that must not contend on write locks
    /// for every candidate file scanned.
    pub fn peek(&self, file_id: FileId) -> Option<Arc<Vec<u8>>> {
        self.entries.read().get(&file_id).map(|e| e.bytes.clone())
    }

    /// Spec-named alias for `peek` — a non-recency-bumping byte fetch.
    pub fn get_bytes(&self, file_id: FileId) -> Option<Arc<Vec<u8>>> {
        self.peek(file_id)
    }

    pub fn mask_of(&self, file_id: FileId) -> Option<CharacterMask> {
        self.entries.read().get(&file_id).map(|e| e.mask.clone())
    }

    /// Byte offset of the start of every line in `file_id`'s content,
    /// 0-indexed by line. Precomputed at insert time.
    pub fn get_line_offsets(&self, file_id: FileId) -> Option<Vec<u32>> {
        self.entries.read().get(&file_id).map(|e| e.line_offsets.clone())
    }

    /// The 1-indexed `line`'s content, newline excluded, as a
    /// `StringRef` into the file's bytes. `None` if the file or the
    /// line number is out of range.
    pub fn get_line(&self, file_id: FileId, line: u32) -> Option<StringRef> {
        let entries = self.entries.read();
        let entry = entries.get(&file_id)?;
        let idx = line.checked_sub(1)? as usize;
        let start = *entry.line_offsets.get(idx)?;
        let end = entry
            .line_offsets
            .get(idx + 1)
            .map(|&next| next.saturating_sub(1))
            .unwrap_or(entry.bytes.len() as u32);
        let end = end.max(start);
        Some(StringRef::new(file_id, start, end - start, entry.bytes.clone()))
    }

    /// A `StringRef` over `bytes[offset..offset+length]` of `file_id`.
    pub fn get_string(&self, file_id: FileId, offset: u32, length: u32) -> Option<StringRef> {
        let entries = self.entries.read();
        let entry = entries.get(&file_id)?;
        if (offset + length) as usize > entry.bytes.len() {
            return None;
        }
        Some(StringRef::new(file_id, offset, length, entry.bytes.clone()))
    }

    pub fn fast_hash_of(&self, file_id: FileId) -> Option<u64> {
        self.entries.read().get(&file_id).map(|e| e.fast_hash)
    }

    pub fn content_hash_of(&self, file_id: FileId) -> Option<u64> {
        self.entries.read().get(&file_id).map(|e| e.content_hash)
    }

    pub fn last_modified_of(&self, file_id: FileId) -> Option<SystemTime> {
        self.entries.read().get(&file_id).and_then(|e| e.last_modified)
    }

    pub fn path_of(&self, file_id: FileId) -> Option<String> {
        self.entries.read().get(&file_id).map(|e| e.path.clone())
    }

    pub fn file_id_for_path(&self, path: &str) -> Option<FileId> {
        self.path_to_file.read().get(path).copied()
    }

    pub fn remove(&mut self, file_id: FileId) -> bool {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.remove(&file_id) {
            self.resident_bytes -= entry.bytes.len() as u64;
            drop(entries);
            self.path_to_file.write().retain(|_, id| *id != file_id);
            true
        } else {
            false
        }
    }

    /// Drop `path`'s entry entirely, e.g. in response to a filesystem
    /// delete/rename notification. Returns the `FileId` it held, if
    /// any.
    pub fn invalidate_file(&mut self, path: &str) -> Option<FileId> {
        let file_id = self.path_to_file.read().get(path).copied()?;
        self.remove(file_id);
        Some(file_id)
    }

    /// Release every resident entry and reset the store to empty,
    /// without affecting the `FileId` allocator (ids already handed
    /// out are never reused).
    pub fn close(&mut self) {
        self.entries.write().clear();
        self.path_to_file.write().clear();
        self.resident_bytes = 0;
    }

    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    pub fn file_count(&self) -> usize {
        self.entries.read().len()
    }
}

fn compute_line_offsets(bytes: &[u8]) -> Vec<u32> {
    let mut offsets = vec![0u32];
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            offsets.push((i + 1) as u32);
        }
    }
    offsets
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
