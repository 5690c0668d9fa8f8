//! Trigram inverted index (spec §4.3): every 3-byte window of a file's
//! content maps to a 24-bit key, and each key's posting list holds the
//! ids of files containing at least one occurrence.
//!
//! The index only ever proves a *candidate superset* — every file
//! that actually contains a pattern is guaranteed to be a candidate,
//! but candidates must still be confirmed against the real bytes
//! (spec §8 invariant 4).

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::ids::FileId;

/// A 24-bit trigram key: `(b0 << 16) | (b1 << 8) | b2`.
pub type TrigramKey = u32;

pub fn trigram_key(window: [u8; 3]) -> TrigramKey {
    (window[0] as u32) << 16 | (window[1] as u32) << 8 | window[2] as u32
}

/// Every trigram key occurring in `bytes`, in order of first
/// appearance is not preserved — callers that need candidate sets
/// should dedupe via the returned iterator's natural HashSet usage.
pub fn trigrams_of(bytes: &[u8]) -> impl Iterator<Item = TrigramKey> + '_ {
    bytes
        .windows(3)
        .map(|w| trigram_key([w[0], w[1], w[2]]))
}

/// Inline posting-list capacity before falling back to a heap
/// allocation; most trigrams in real source code occur in a small
/// number of files relative to the corpus.
const INLINE_POSTING_CAP: usize = 8;

type Posting = SmallVec<[FileId; INLINE_POSTING_CAP]>;

#[derive(Debug, Default)]
struct PostingEntry {
    files: Posting,
    /// Length of `files` the last time this entry was compacted
    /// (deduplicated and sorted). Used to decide when compaction is
    /// due again (spec §9 open question: size-triggered cadence).
    compacted_at: usize,
}

impl PostingEntry {
    fn push(&mut self, file_id: FileId) {
        self.files.push(file_id);
        if self.should_compact() {
            self.compact();
        }
    }

    /// Compact whenever the posting has grown to at least twice the
    /// length it had after the previous compaction. Chosen over a
    /// fixed-count or every-insert policy because file ingestion is
    /// bursty (whole directories land at once) — a size-doubling
    /// trigger keeps compaction amortized O(1) per insert without
    /// compacting on every single push.
    fn should_compact(&self) -> bool {
        let threshold = (self.compacted_at * 2).max(INLINE_POSTING_CAP);
        self.files.len() >= threshold
    }

    fn compact(&mut self) {
        self.files.sort_unstable();
        self.files.dedup();
        self.compacted_at = self.files.len();
    }
}

/// Inverted index from trigram key to the set of files containing it.
#[derive(Debug, Default)]
pub struct TrigramIndex {
    postings: HashMap<TrigramKey, PostingEntry>,
}

impl TrigramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index all trigrams occurring in `bytes` under `file_id`.
    /// Re-indexing the same file under a new `FileId` (spec §4.1: a
    /// reload always allocates a fresh id) naturally leaves the old
    /// id's postings stale; callers must pair this with
    /// `remove_file` for the old id.
    pub fn index_file(&mut self, file_id: FileId, bytes: &[u8]) {
        let mut seen = std::collections::HashSet::new();
        for key in trigrams_of(bytes) {
            if seen.insert(key) {
                self.postings.entry(key).or_default().push(file_id);
            }
        }
    }

    /// Remove every posting referencing `file_id`. O(number of
    /// distinct trigrams in the index); callers that expect frequent
    /// removal should batch them.
    pub fn remove_file(&mut self, file_id: FileId) {
        for entry in self.postings.values_mut() {
            entry.files.retain(|&id| id != file_id);
        }
    }

    /// Candidate files containing every trigram of `pattern`. Returns
    /// `None` if `pattern` is shorter than 3 bytes — the trigram index
    /// has no opinion and callers must fall back to a full scan.
    pub fn find_candidates(&self, pattern: &[u8]) -> Option<Vec<FileId>> {
        if pattern.len() < 3 {
            return None;
        }

        let mut keys: Vec<TrigramKey> = trigrams_of(pattern).collect();
        keys.sort_unstable();
        keys.dedup();

        let mut postings: Vec<&Posting> = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.postings.get(key) {
                Some(entry) => postings.push(&entry.files),
                // A key with no posting at all means no file contains
                // it, so the intersection is empty.
                None => return Some(Vec::new()),
            }
        }

        postings.sort_by_key(|p| p.len());

        let mut candidates: std::collections::HashSet<FileId> =
            postings.first().map(|p| p.iter().copied().collect()).unwrap_or_default();
        for posting in &postings[1..] {
            let set: std::collections::HashSet<FileId> = posting.iter().copied().collect();
            candidates.retain(|id| set.contains(id));
            if candidates.is_empty() {
                break;
            }
        }

        let mut result: Vec<FileId> = candidates.into_iter().collect();
        result.sort_unstable();
        Some(result)
    }

    pub fn trigram_count(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_and_finds_exact_pattern() {
        let mut idx = TrigramIndex::new();
        idx.index_file(FileId(1), b"fn main() {}");
        let candidates = idx.find_candidates(b"main").unwrap();
        assert_eq!(candidates, vec![FileId(1)]);
    }

    #[test]
    fn short_pattern_returns_none() {
        let idx = TrigramIndex::new();
        assert!(idx.find_candidates(b"ab").is_none());
    }

    #[test]
    fn unseen_trigram_yields_empty_candidates() {
        let mut idx = TrigramIndex::new();
        idx.index_file(FileId(1), b"fn main() {}");
        assert_eq!(idx.find_candidates(b"xyz123").unwrap(), Vec::<FileId>::new());
    }

    /// S5: three files A, B, C where only A and B share a trigram
    /// sequence that C lacks; intersection over a multi-trigram
    /// pattern must exclude C.
    #[test]
    fn scenario_s5_intersection_across_three_files() {
        let mut idx = TrigramIndex::new();
        idx.index_file(FileId(1), b"let needle = 1;"); // A
        idx.index_file(FileId(2), b"fn needle_search() {}"); // B
        idx.index_file(FileId(3), b"fn haystack() {}"); // C

        let candidates = idx.find_candidates(b"needle").unwrap();
        assert_eq!(candidates, vec![FileId(1), FileId(2)]);
    }

    #[test]
    fn remove_file_drops_its_postings() {
        let mut idx = TrigramIndex::new();
        idx.index_file(FileId(1), b"needle");
        idx.index_file(FileId(2), b"needle");
        idx.remove_file(FileId(1));
        assert_eq!(idx.find_candidates(b"needle").unwrap(), vec![FileId(2)]);
    }

    #[test]
    fn posting_membership_matches_literal_occurrence() {
        // §8 invariant 2: if a trigram occurs in a file's bytes, that
        // file's id is in the posting for that trigram's key.
        let mut idx = TrigramIndex::new();
        let bytes = b"abcdef";
        idx.index_file(FileId(7), bytes);
        for key in trigrams_of(bytes) {
            let entry = idx.postings.get(&key).unwrap();
            assert!(entry.files.contains(&FileId(7)));
        }
    }
}
