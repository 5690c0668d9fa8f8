//! `MasterIndex` (spec §4.10): the aggregator that owns every other
//! component and exposes the ingestion and query surface. This is the
//! crate's single entry point — callers never touch `TrigramIndex`,
//! `SymbolTable` or `ReferenceTracker` directly.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use ignore::WalkBuilder;
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::error::{IndexError, Result};
use crate::ids::{FileId, SymbolId};
use crate::mask::CharacterMask;
use crate::objectid::ObjectId;
use crate::parser::{NullParser, Parser};
use crate::references::ReferenceTracker;
use crate::search::{EngineContext, SearchEngine, SearchOptions, SearchResponse, SymbolSummary};
use crate::store::FileContentStore;
use crate::symbols::{Span, SymbolKind, SymbolTable};
use crate::trigram::TrigramIndex;

/// One file's outcome from an `index_directory` walk: either a
/// `FileId` or the reason it was skipped. Per-file failures never
/// abort the whole directory walk (spec §7: recoverable errors are
/// accumulated, not propagated).
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Indexed { path: String, file_id: FileId },
    Skipped { path: String, reason: String },
}

/// Summary returned from `index_directory`, in place of a bare file
/// count, so callers can surface what was skipped and why.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub outcomes: Vec<FileOutcome>,
    pub files_indexed: usize,
    pub files_skipped: usize,
    /// Set when `max_file_count`/`max_total_bytes` cut the walk short.
    /// The walk still completes and returns `Ok` — resource exhaustion
    /// halts cleanly into this report rather than failing the call.
    pub resource_limit_hit: bool,
}

/// Options controlling a directory walk: glob include/exclude and
/// gitignore handling are delegated to `ignore`/`globset`, matching
/// how the teacher's own directory walker is built.
#[derive(Debug, Clone)]
pub struct IndexDirectoryOptions {
    pub respect_gitignore: bool,
    pub follow_symlinks: bool,
    /// Files larger than this are skipped rather than indexed, to
    /// bound memory and per-file scan cost for pathological inputs
    /// (vendored binaries, generated data dumps).
    pub max_file_bytes: u64,
    /// If non-empty, only paths matching at least one glob are
    /// walked. Applied before `exclude_globs`.
    pub include_globs: Vec<String>,
    /// Paths matching any of these globs are skipped even if they
    /// match `include_globs`.
    pub exclude_globs: Vec<String>,
    /// Hard cap on the number of files a single `index_directory` call
    /// will index. `None` means unlimited. Candidate paths beyond the
    /// cap are recorded as `Skipped` with a `ResourceExhausted` reason
    /// rather than silently dropped.
    pub max_file_count: Option<usize>,
    /// Hard cap on the cumulative bytes of files a single
    /// `index_directory` call will read. `None` means unlimited.
    pub max_total_bytes: Option<u64>,
}

impl Default for IndexDirectoryOptions {
    fn default() -> Self {
        IndexDirectoryOptions {
            respect_gitignore: true,
            follow_symlinks: false,
            max_file_bytes: 16 * 1024 * 1024,
            include_globs: Vec::new(),
            exclude_globs: Vec::new(),
            max_file_count: None,
            max_total_bytes: None,
        }
    }
}

/// Compiled include/exclude glob sets, built once per `index_directory`
/// call rather than per candidate path.
struct GlobFilter {
    include: Option<globset::GlobSet>,
    exclude: Option<globset::GlobSet>,
}

impl GlobFilter {
    fn build(options: &IndexDirectoryOptions) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Option<globset::GlobSet>> {
            if patterns.is_empty() {
                return Ok(None);
            }
            let mut builder = globset::GlobSetBuilder::new();
            for pattern in patterns {
                let glob = globset::Glob::new(pattern)
                    .map_err(|e| IndexError::Invariant(format!("invalid glob {pattern:?}: {e}")))?;
                builder.add(glob);
            }
            builder
                .build()
                .map(Some)
                .map_err(|e| IndexError::Invariant(format!("failed to build glob set: {e}")))
        };

        Ok(GlobFilter {
            include: compile(&options.include_globs)?,
            exclude: compile(&options.exclude_globs)?,
        })
    }

    fn admits(&self, path: &Path) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }
}

struct MaskIndex {
    masks: RwLock<std::collections::HashMap<FileId, CharacterMask>>,
}

impl MaskIndex {
    fn new() -> Self {
        MaskIndex { masks: RwLock::new(std::collections::HashMap::new()) }
    }

    fn insert(&self, file_id: FileId, mask: CharacterMask) {
        self.masks.write().insert(file_id, mask);
    }

    fn remove(&self, file_id: FileId) {
        self.masks.write().remove(&file_id);
    }

    fn get(&self, file_id: FileId) -> Option<CharacterMask> {
        self.masks.read().get(&file_id).cloned()
    }
}

/// Full relational context around one symbol, keyed by its wire-level
/// `ObjectId` (spec §4.7/§4.10's `GetObjectContext`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ObjectContext {
    pub object_id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub span: Span,
    pub callers: Vec<String>,
    pub callees: Vec<String>,
}

/// The aggregate index: file content, trigram postings, symbols,
/// references, all keyed by `FileId`.
pub struct MasterIndex {
    store: RwLock<FileContentStore>,
    trigrams: RwLock<TrigramIndex>,
    symbols: RwLock<SymbolTable>,
    references: RwLock<ReferenceTracker>,
    masks: MaskIndex,
    indexed_files: RwLock<Vec<FileId>>,
    parser: Box<dyn Parser>,
}

impl Default for MasterIndex {
    fn default() -> Self {
        Self::new(Box::new(NullParser))
    }
}

impl MasterIndex {
    pub fn new(parser: Box<dyn Parser>) -> Self {
        MasterIndex {
            store: RwLock::new(FileContentStore::with_default_capacity()),
            trigrams: RwLock::new(TrigramIndex::new()),
            symbols: RwLock::new(SymbolTable::new()),
            references: RwLock::new(ReferenceTracker::new()),
            masks: MaskIndex::new(),
            indexed_files: RwLock::new(Vec::new()),
            parser,
        }
    }

    /// Index a single file's content. Re-indexing a previously-known
    /// path allocates a brand-new `FileId` and drops the old one's
    /// data (spec §4.1) — callers must not hold on to the old id.
    #[instrument(skip(self, bytes), fields(path = %path))]
    pub fn index_file(&self, path: &str, bytes: Vec<u8>, language: &str) -> Result<FileId> {
        let (file_id, old_id) = self.store.write().insert_bytes(path, bytes.clone(), None);
        if let Some(old_id) = old_id {
            self.drop_file_data(old_id);
        }

        let mask = self.store.read().mask_of(file_id).unwrap_or_else(CharacterMask::empty);
        self.masks.insert(file_id, mask);
        self.trigrams.write().index_file(file_id, &bytes);

        let output = self.parser.parse(&bytes, language);
        {
            let mut symbols = self.symbols.write();
            for symbol in output.symbols {
                symbols.insert(file_id, symbol);
            }
            for scope in output.scopes {
                symbols.insert_scope(scope);
            }
        }
        {
            let mut references = self.references.write();
            for reference in output.references {
                references.add_reference(reference);
            }
        }

        self.indexed_files.write().push(file_id);

        Ok(file_id)
    }

    /// Remove a previously-indexed file, looked up by path, from every
    /// substructure. Returns `false` if `path` was never indexed.
    pub fn remove_file(&self, path: &str) -> bool {
        let Some(file_id) = self.store.read().file_id_for_path(path) else {
            return false;
        };
        self.store.write().invalidate_file(path);
        self.drop_file_data(file_id);
        true
    }

    /// Drop `file_id`'s entries from every substructure except the
    /// content store, which the caller has already updated.
    fn drop_file_data(&self, file_id: FileId) {
        self.trigrams.write().remove_file(file_id);
        self.symbols.write().remove_file(file_id);
        self.masks.remove(file_id);
        self.indexed_files.write().retain(|id| *id != file_id);
    }

    /// Walk `root`, indexing every file the walker yields. Per-file
    /// I/O or size-limit failures are recorded in the returned
    /// `IndexReport` rather than aborting the walk; a `root` that
    /// doesn't exist at all is the one condition that short-circuits.
    #[instrument(skip(self, options), fields(root = %root.as_ref().display()))]
    pub fn index_directory(
        &self,
        root: impl AsRef<Path>,
        options: &IndexDirectoryOptions,
    ) -> Result<IndexReport> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(IndexError::PathNotFound(root.display().to_string()));
        }

        let glob_filter = GlobFilter::build(options)?;

        let mut walker = WalkBuilder::new(root);
        walker
            .git_ignore(options.respect_gitignore)
            .follow_links(options.follow_symlinks)
            .standard_filters(options.respect_gitignore);

        let mut paths: Vec<std::path::PathBuf> = walker
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
            .filter(|path| glob_filter.admits(path))
            .collect();

        let mut resource_limit_hit = false;
        let mut dropped: Vec<std::path::PathBuf> = Vec::new();
        if options.max_file_count.is_some() || options.max_total_bytes.is_some() {
            let mut cum_count = 0usize;
            let mut cum_bytes = 0u64;
            let mut cutoff = paths.len();
            for (i, path) in paths.iter().enumerate() {
                cum_count += 1;
                cum_bytes += std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let over_count = options.max_file_count.is_some_and(|m| cum_count > m);
                let over_bytes = options.max_total_bytes.is_some_and(|m| cum_bytes > m);
                if over_count || over_bytes {
                    cutoff = i;
                    resource_limit_hit = true;
                    break;
                }
            }
            if resource_limit_hit {
                dropped = paths.split_off(cutoff);
            }
        }

        let indexed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        let mut outcomes: Vec<FileOutcome> = paths
            .par_iter()
            .map(|path| {
                let path_str = path.display().to_string();
                match std::fs::metadata(path) {
                    Ok(meta) if meta.len() > options.max_file_bytes => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        FileOutcome::Skipped {
                            path: path_str,
                            reason: format!("exceeds max_file_bytes ({} bytes)", meta.len()),
                        }
                    }
                    Ok(_) => match std::fs::read(path) {
                        Ok(bytes) => {
                            let language = language_for_path(path);
                            match self.index_file(&path_str, bytes, language) {
                                Ok(file_id) => {
                                    indexed.fetch_add(1, Ordering::Relaxed);
                                    FileOutcome::Indexed { path: path_str, file_id }
                                }
                                Err(e) => {
                                    skipped.fetch_add(1, Ordering::Relaxed);
                                    warn!(path = %path_str, error = %e, "failed to index file");
                                    FileOutcome::Skipped { path: path_str, reason: e.to_string() }
                                }
                            }
                        }
                        Err(e) => {
                            skipped.fetch_add(1, Ordering::Relaxed);
                            FileOutcome::Skipped { path: path_str, reason: e.to_string() }
                        }
                    },
                    Err(e) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        FileOutcome::Skipped { path: path_str, reason: e.to_string() }
                    }
                }
            })
            .collect();

        if resource_limit_hit {
            let reason = IndexError::ResourceExhausted(format!(
                "directory walk halted after {} files; {} more files were not indexed",
                outcomes.len(),
                dropped.len()
            ))
            .to_string();
            for path in &dropped {
                skipped.fetch_add(1, Ordering::Relaxed);
                outcomes.push(FileOutcome::Skipped { path: path.display().to_string(), reason: reason.clone() });
            }
            warn!(dropped = dropped.len(), "index_directory halted on resource limits");
        }

        let report = IndexReport {
            outcomes,
            files_indexed: indexed.load(Ordering::Relaxed),
            files_skipped: skipped.load(Ordering::Relaxed),
            resource_limit_hit,
        };
        info!(files_indexed = report.files_indexed, files_skipped = report.files_skipped, "directory indexed");
        Ok(report)
    }

    pub fn get_file_count(&self) -> usize {
        self.indexed_files.read().len()
    }

    pub fn get_symbol_count(&self) -> usize {
        self.symbols.read().symbol_count()
    }

    pub fn get_reference_count(&self) -> usize {
        self.references.read().reference_count()
    }

    pub fn search(&self, options: SearchOptions) -> Result<SearchResponse> {
        let store = self.store.read();
        let trigrams = self.trigrams.read();
        let symbols = self.symbols.read();
        let indexed_files = self.indexed_files.read();

        let lookup = |file_id: FileId| self.masks.get(file_id);
        let ctx = EngineContext {
            store: &store,
            mask_index: &lookup,
            trigram_index: &trigrams,
            symbols: &symbols,
            indexed_files: &indexed_files,
        };
        SearchEngine::search(options, ctx)
    }

    pub fn references(&self) -> parking_lot::RwLockReadGuard<'_, ReferenceTracker> {
        self.references.read()
    }

    pub fn get_trigram_index(&self) -> parking_lot::RwLockReadGuard<'_, TrigramIndex> {
        self.trigrams.read()
    }

    /// Every symbol defined in `path`, as compact summaries. Empty if
    /// `path` was never indexed or has since been removed.
    pub fn get_file_symbols(&self, path: &str) -> Vec<SymbolSummary> {
        let Some(file_id) = self.store.read().file_id_for_path(path) else {
            return Vec::new();
        };
        self.symbols
            .read()
            .symbols_in_file(file_id)
            .into_iter()
            .map(|s| SymbolSummary {
                object_id: ObjectId::encode(s.id).as_str().to_string(),
                name: s.name.clone(),
                kind: s.kind,
            })
            .collect()
    }

    /// The full relational context around a single symbol, addressed
    /// by its `ObjectId` string.
    pub fn get_object_context(&self, object_id: &str) -> Result<ObjectContext> {
        let id: SymbolId = ObjectId(object_id.to_string()).parse()?;
        let symbols = self.symbols.read();
        let symbol = symbols
            .get(id)
            .ok_or_else(|| IndexError::Invariant(format!("no symbol for object id {object_id}")))?;

        let file_path = self.store.read().path_of(symbol.file_id).unwrap_or_default();

        let references = self.references.read();
        let encode = |ids: Vec<SymbolId>| -> Vec<String> {
            ids.into_iter().filter(|&s| s != id).map(|s| ObjectId::encode(s).as_str().to_string()).collect()
        };
        let callers = encode(references.get_callers(id, 1));
        let callees = encode(references.get_callees(id, 1));

        Ok(ObjectContext {
            object_id: object_id.to_string(),
            name: symbol.name.clone(),
            kind: symbol.kind,
            file_path,
            span: symbol.span,
            callers,
            callees,
        })
    }
}

fn language_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("rs") => "rust",
        Some("ts") | Some("tsx") => "typescript",
        Some("js") | Some("jsx") => "javascript",
        Some("cpp") | Some("cc") | Some("hpp") | Some("h") => "cpp",
        Some("py") => "python",
        Some("go") => "go",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn index_file_then_search_finds_the_match() {
        let index = MasterIndex::default();
        index.index_file("a.rs", b"fn needle() {}".to_vec(), "rust").unwrap();

        let response = index.search(SearchOptions::new("needle")).unwrap();
        assert_eq!(response.hits.len(), 1);
    }

    #[test]
    fn reindexing_same_path_allocates_a_fresh_file_id() {
        let index = MasterIndex::default();
        let first = index.index_file("a.rs", b"v1".to_vec(), "rust").unwrap();
        let second = index.index_file("a.rs", b"v2".to_vec(), "rust").unwrap();
        assert_ne!(first, second);
        assert_eq!(index.get_file_count(), 1);
    }

    #[test]
    fn index_directory_walks_and_indexes_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lib.rs"), b"fn main() {}").unwrap();
        fs::write(dir.path().join("util.rs"), b"fn helper() {}").unwrap();

        let index = MasterIndex::default();
        let report = index.index_directory(dir.path(), &IndexDirectoryOptions::default()).unwrap();
        assert_eq!(report.files_indexed, 2);
        assert_eq!(index.get_file_count(), 2);
        assert!(!report.resource_limit_hit);
    }

    #[test]
    fn index_directory_on_missing_path_errors() {
        let index = MasterIndex::default();
        let err = index
            .index_directory("/path/does/not/exist/anywhere", &IndexDirectoryOptions::default())
            .unwrap_err();
        assert!(matches!(err, IndexError::PathNotFound(_)));
    }

    #[test]
    fn remove_file_by_path_makes_it_unsearchable() {
        let index = MasterIndex::default();
        index.index_file("a.rs", b"fn needle() {}".to_vec(), "rust").unwrap();
        assert!(index.remove_file("a.rs"));
        let response = index.search(SearchOptions::new("needle")).unwrap();
        assert_eq!(response.hits.len(), 0);
        assert!(!index.remove_file("a.rs"));
    }

    #[test]
    fn exclude_globs_skip_matching_paths() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lib.rs"), b"fn main() {}").unwrap();
        fs::write(dir.path().join("lib.generated.rs"), b"fn generated() {}").unwrap();

        let index = MasterIndex::default();
        let mut options = IndexDirectoryOptions::default();
        options.exclude_globs.push("**/*.generated.rs".to_string());
        let report = index.index_directory(dir.path(), &options).unwrap();

        assert_eq!(report.files_indexed, 1);
    }

    #[test]
    fn max_file_count_halts_cleanly_and_records_skip_reasons() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.rs")), b"fn f() {}").unwrap();
        }

        let index = MasterIndex::default();
        let mut options = IndexDirectoryOptions::default();
        options.max_file_count = Some(2);
        let report = index.index_directory(dir.path(), &options).unwrap();

        assert!(report.resource_limit_hit);
        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.files_skipped, 3);
        assert!(report
            .outcomes
            .iter()
            .any(|o| matches!(o, FileOutcome::Skipped { reason, .. } if reason.contains("resource limit"))));
    }

    #[test]
    fn get_file_symbols_and_object_context_round_trip() {
        use crate::parser::{ParseOutput, Parser};
        use crate::symbols::{Span, Symbol};

        struct FixtureParser;
        impl Parser for FixtureParser {
            fn parse(&self, _bytes: &[u8], _language: &str) -> ParseOutput {
                let symbol = Symbol::new("run", SymbolKind::Function, Span { start: 0, end: 3 });
                ParseOutput { symbols: vec![symbol], ..Default::default() }
            }
        }

        let index = MasterIndex::new(Box::new(FixtureParser));
        index.index_file("a.rs", b"run".to_vec(), "rust").unwrap();

        let symbols = index.get_file_symbols("a.rs");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "run");

        let ctx = index.get_object_context(&symbols[0].object_id).unwrap();
        assert_eq!(ctx.name, "run");
        assert_eq!(ctx.file_path, "a.rs");
    }
}
