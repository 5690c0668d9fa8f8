//! `SearchEngine` (spec §4.8): the funnel that turns a
//! [`options::SearchOptions`] into ranked matches, running each stage
//! only over the candidates the previous stage couldn't rule out.
//!
//! Pipeline: normalize options -> detect literal/regex -> extract
//! required literals from a regex pattern -> reject by
//! `CharacterMask` -> narrow via `TrigramIndex` -> confirm against
//! real bytes (byte search or regex) -> apply `SemanticFilter` ->
//! attach relational context -> score and rank -> cap.

pub mod filter;
pub mod options;
pub mod rank;
pub mod regexheuristic;

pub use options::{OutputSize, SearchOptions, SemanticFilter};

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::ids::{FileId, SymbolId};
use crate::mask::CharacterMask;
use crate::objectid::ObjectId;
use crate::store::FileContentStore;
use crate::symbols::SymbolTable;
use crate::trigram::TrigramIndex;

use filter::{passes, MatchContext, MatchRegion};
use rank::{rank_and_cap, score, ScoreInputs, ScoredMatch};
use regexheuristic::looks_like_regex;

/// One confirmed, filtered, scored match returned to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub file_id: FileId,
    pub file_path: String,
    pub offset: u32,
    pub length: u32,
    pub line: u32,
    pub column: u32,
    /// First line of the attached `context_lines` window.
    pub start_line: u32,
    /// Last line of the attached `context_lines` window.
    pub end_line: u32,
    pub match_text: String,
    pub context_lines: Vec<String>,
    pub score: f32,
    pub enclosing_symbol: Option<SymbolSummary>,
}

/// A compact, wire-friendly projection of a `Symbol`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SymbolSummary {
    pub object_id: String,
    pub name: String,
    pub kind: crate::symbols::SymbolKind,
}

/// Response returned from `SearchEngine::search`: ranked hits plus
/// stats about how much of the corpus was touched, for callers that
/// want to show "N files scanned" style feedback.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub files_candidate: usize,
    pub files_scanned: usize,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

/// Read-only view the engine needs to run a query. `MasterIndex` owns
/// all four structures and hands out this bundle of references rather
/// than the engine owning them directly, since the same structures are
/// also mutated by ingestion.
pub struct EngineContext<'a> {
    pub store: &'a FileContentStore,
    pub mask_index: &'a dyn Fn(FileId) -> Option<CharacterMask>,
    pub trigram_index: &'a TrigramIndex,
    pub symbols: &'a SymbolTable,
    pub indexed_files: &'a [FileId],
}

pub struct SearchEngine;

impl SearchEngine {
    #[instrument(skip(ctx), fields(pattern = %options.pattern))]
    pub fn search(options: SearchOptions, ctx: EngineContext<'_>) -> crate::error::Result<SearchResponse> {
        let options = options.normalize();
        if options.pattern.is_empty() {
            return Err(crate::error::IndexError::EmptyPattern);
        }

        let mut warnings = Vec::new();
        let heuristic_regex = !options.force_regex && looks_like_regex(&options.pattern);
        let is_regex = options.force_regex || heuristic_regex;
        debug!(is_regex, heuristic_regex, "classified pattern");

        let regex = if is_regex {
            match Regex::new(&build_regex_source(&options)) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(error = %e, "pattern failed to compile as regex");
                    return Err(crate::error::IndexError::Regex(e));
                }
            }
        } else {
            None
        };

        let pattern_bytes = options.pattern.as_bytes();
        let candidates: Vec<FileId> = if is_regex {
            narrow_regex_candidates(&ctx, &options.pattern, ctx.indexed_files)
        } else {
            ctx.trigram_index.find_candidates(pattern_bytes).unwrap_or_else(|| ctx.indexed_files.to_vec())
        };

        let files_candidate = candidates.len();
        let mut files_scanned = 0usize;
        let mut scored: Vec<ScoredMatch<SearchHit>> = Vec::new();
        let mut per_file_counts: std::collections::HashMap<FileId, usize> = std::collections::HashMap::new();

        for file_id in candidates {
            let path = ctx.store.path_of(file_id).unwrap_or_default();
            if options.exclude_tests && looks_like_test_path(&path) {
                continue;
            }

            let mask = (ctx.mask_index)(file_id);
            if let Some(mask) = &mask {
                let admits = if options.case_sensitive {
                    mask.has_all_bytes(pattern_bytes)
                } else {
                    mask.has_all_bytes_ignore_case(pattern_bytes)
                };
                if regex.is_none() && !admits && !options.invert_match {
                    continue;
                }
            }

            let Some(bytes) = ctx.store.get_bytes(file_id) else {
                continue;
            };
            files_scanned += 1;
            let line_offsets = ctx.store.get_line_offsets(file_id).unwrap_or_default();

            let occurrences = if options.invert_match {
                find_non_matching_lines(&bytes, &line_offsets, &options, regex.as_ref())
            } else {
                find_occurrences(&bytes, &options, regex.as_ref())
            };

            for (offset, length) in occurrences {
                if let Some(max) = options.max_count_per_file {
                    let count = per_file_counts.entry(file_id).or_insert(0);
                    if *count >= max {
                        continue;
                    }
                }

                let enclosing = ctx.symbols.find_enclosing_symbol(file_id, offset);
                let is_declaration = enclosing.map(|s| s.span.start == offset).unwrap_or(false);
                let in_test_file = looks_like_test_path(&path);

                let match_ctx = MatchContext {
                    region: classify_region(&bytes, offset),
                    is_declaration,
                    in_test_file,
                };

                if !passes(&options.semantic, match_ctx, enclosing) {
                    continue;
                }

                if let Some(max) = options.max_count_per_file {
                    let count = per_file_counts.entry(file_id).or_insert(0);
                    if *count >= max {
                        continue;
                    }
                    *count += 1;
                }

                let (line, column) = line_and_column(&line_offsets, &bytes, offset);
                let symbol_kind_matches = !options.semantic.symbol_kinds.is_empty() && enclosing.is_some();
                let inputs = ScoreInputs {
                    case_exact: options.case_sensitive,
                    whole_word: options.whole_word,
                    is_declaration,
                    reference_strength: None,
                    symbol_kind_matches,
                    column,
                    file_size_bytes: bytes.len() as u64,
                    heuristic_regex,
                };
                let s = score(inputs, enclosing);

                let (start_line, end_line) = context_window(&line_offsets, line, enclosing, &options);
                let context_lines = (start_line..=end_line)
                    .filter_map(|n| ctx.store.get_line(file_id, n))
                    .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned())
                    .collect();

                let hit = SearchHit {
                    file_id,
                    file_path: path.clone(),
                    offset,
                    length,
                    line,
                    column,
                    start_line,
                    end_line,
                    match_text: String::from_utf8_lossy(&bytes[offset as usize..(offset + length) as usize])
                        .into_owned(),
                    context_lines,
                    score: s,
                    enclosing_symbol: enclosing.map(|symbol| SymbolSummary {
                        object_id: ObjectId::encode(symbol.id).as_str().to_string(),
                        name: symbol.name.clone(),
                        kind: symbol.kind,
                    }),
                };
                scored.push(ScoredMatch { item: hit, score: s });
            }
        }

        let scored = apply_output_shape(scored, &options);

        let total_before_cap = scored.len();
        let ranked = rank_and_cap(scored, options.max_results);
        let truncated = total_before_cap > ranked.len();
        if truncated {
            warnings.push(format!(
                "result set truncated to {} of {} matches",
                ranked.len(),
                total_before_cap
            ));
        }

        Ok(SearchResponse {
            hits: ranked.into_iter().map(|m| m.item).collect(),
            files_candidate,
            files_scanned,
            truncated,
            warnings,
        })
    }
}

/// Collapse per-match hits according to `files_only`/`count_per_file`/
/// `merge_file_results`, which all reduce "one hit per match" down to
/// "one hit per file" in different ways. At most one of the three is
/// expected to be set; `files_only` wins if more than one is set.
fn apply_output_shape(
    scored: Vec<ScoredMatch<SearchHit>>,
    options: &SearchOptions,
) -> Vec<ScoredMatch<SearchHit>> {
    if !options.files_only && !options.count_per_file && !options.merge_file_results {
        return scored;
    }

    let mut by_file: std::collections::HashMap<FileId, Vec<ScoredMatch<SearchHit>>> =
        std::collections::HashMap::new();
    for m in scored {
        by_file.entry(m.item.file_id).or_default().push(m);
    }

    by_file
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|m| m.item.offset);
            let best_score = group.iter().map(|m| m.score).fold(f32::MIN, f32::max);
            let mut merged = group[0].clone();
            merged.score = best_score;

            if options.files_only {
                merged.item.offset = 0;
                merged.item.length = 0;
                merged.item.match_text.clear();
                merged.item.context_lines.clear();
            } else if options.count_per_file {
                let count = group.len();
                merged.item.length = count as u32;
                merged.item.match_text = format!("{count} match{}", if count == 1 { "" } else { "es" });
            } else if options.merge_file_results {
                // Spec §4.8 step 8: one result per file with per-line
                // detail for every match, not just the best match.
                merged.item.context_lines = group
                    .iter()
                    .map(|m| format!("L{}: {}", m.item.line, m.item.match_text))
                    .collect();
            }
            merged
        })
        .collect()
}

/// Which files a regex pattern could possibly match, narrowed via the
/// literal substrings `regex-syntax` can prove are required — e.g.
/// `foo[a-z]bar` requires both `foo` and `bar`, so only files
/// containing both are candidates. Patterns with no literal of at
/// least trigram length (`.*`, pure character classes) fall back to
/// scanning every indexed file.
fn narrow_regex_candidates(ctx: &EngineContext<'_>, pattern: &str, all_files: &[FileId]) -> Vec<FileId> {
    let literals = required_literals(pattern);
    let usable: Vec<&Vec<u8>> = literals.iter().filter(|l| l.len() >= 3).collect();
    if usable.is_empty() {
        return all_files.to_vec();
    }

    let mut intersection: Option<HashSet<FileId>> = None;
    for literal in usable {
        let Some(found) = ctx.trigram_index.find_candidates(literal) else {
            continue;
        };
        let set: HashSet<FileId> = found.into_iter().collect();
        intersection = Some(match intersection {
            Some(acc) => acc.intersection(&set).copied().collect(),
            None => set,
        });
    }

    match intersection {
        Some(set) => {
            let mut result: Vec<FileId> = set.into_iter().collect();
            result.sort_unstable();
            result
        }
        None => all_files.to_vec(),
    }
}

/// Literal byte sequences `regex-syntax` can prove are required for
/// `pattern` to match at all. Returns an empty vec for a pattern that
/// fails to parse (the caller already validated it compiles with
/// `regex`, so this is only reached for regex syntax `regex-syntax`
/// and `regex` disagree on, which should not occur in practice).
fn required_literals(pattern: &str) -> Vec<Vec<u8>> {
    let Ok(hir) = regex_syntax::Parser::new().parse(pattern) else {
        return Vec::new();
    };
    let seq = regex_syntax::hir::literal::Extractor::new().extract(&hir);
    match seq.literals() {
        Some(literals) => literals.iter().map(|l| l.as_bytes().to_vec()).collect(),
        None => Vec::new(),
    }
}

/// Path-convention test-file detection: common per-language markers for
/// "this file is test code," not AST-derived — used for the cheap,
/// file-level `exclude_tests` cut before bytes are even scanned.
fn looks_like_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("/test/")
        || lower.contains("/tests/")
        || lower.contains("\\test\\")
        || lower.contains("\\tests\\")
        || lower.ends_with("_test.rs")
        || lower.ends_with("_test.go")
        || lower.ends_with(".test.ts")
        || lower.ends_with(".test.js")
        || lower.ends_with(".spec.ts")
        || lower.ends_with(".spec.js")
        || lower.starts_with("test_")
        || lower.contains("/test_")
}

fn build_regex_source(options: &SearchOptions) -> String {
    let mut source = options.pattern.clone();
    if options.whole_word && !options.force_regex {
        source = format!(r"\b{}\b", regex::escape(&source));
    }
    if !options.case_sensitive {
        source = format!("(?i){source}");
    }
    source
}

fn find_occurrences(bytes: &[u8], options: &SearchOptions, regex: Option<&Regex>) -> Vec<(u32, u32)> {
    if let Some(re) = regex {
        let text = String::from_utf8_lossy(bytes);
        return re
            .find_iter(&text)
            .map(|m| (m.start() as u32, (m.end() - m.start()) as u32))
            .collect();
    }

    let pattern = options.pattern.as_bytes();
    let mut result = Vec::new();
    if pattern.is_empty() || pattern.len() > bytes.len() {
        return result;
    }
    let mut i = 0;
    while i + pattern.len() <= bytes.len() {
        let window = &bytes[i..i + pattern.len()];
        let matched = if options.case_sensitive {
            window == pattern
        } else {
            window.eq_ignore_ascii_case(pattern)
        };
        if matched && (!options.whole_word || is_word_boundary_match(bytes, i, pattern.len())) {
            result.push((i as u32, pattern.len() as u32));
        }
        i += 1;
    }
    result
}

/// Lines that contain no occurrence of `pattern` at all, the grep
/// `-v` sense. Each result is `(line_start_offset, line_byte_length)`.
fn find_non_matching_lines(
    bytes: &[u8],
    line_offsets: &[u32],
    options: &SearchOptions,
    regex: Option<&Regex>,
) -> Vec<(u32, u32)> {
    let matches = find_occurrences(bytes, options, regex);
    let matched_lines: HashSet<u32> =
        matches.iter().map(|&(offset, _)| line_and_column(line_offsets, bytes, offset).0).collect();

    let mut result = Vec::new();
    for (idx, &start) in line_offsets.iter().enumerate() {
        let line_no = (idx + 1) as u32;
        if matched_lines.contains(&line_no) {
            continue;
        }
        let end = line_offsets
            .get(idx + 1)
            .map(|&next| next.saturating_sub(1))
            .unwrap_or(bytes.len() as u32)
            .max(start);
        result.push((start, end - start));
    }
    result
}

fn is_word_boundary_match(bytes: &[u8], start: usize, len: usize) -> bool {
    let is_word_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
    let end = start + len;
    let after_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
    before_ok && after_ok
}

fn classify_region(bytes: &[u8], offset: u32) -> MatchRegion {
    // Best-effort, parser-free region classification: a real
    // classification comes from the collaborator's AST; absent that,
    // this looks only at whether the match sits inside a `"..."`,
    // `` `...` `` or `//`/`/* */` span found by a simple forward scan
    // from the start of the line.
    let offset = offset as usize;
    let line_start = bytes[..offset].iter().rposition(|&b| b == b'\n').map(|p| p + 1).unwrap_or(0);
    let line = &bytes[line_start..offset];

    if find_subslice(line, b"//").is_some() {
        return MatchRegion::Comment;
    }

    let quote_count = line.iter().filter(|&&b| b == b'"').count();
    let backtick_count = line.iter().filter(|&&b| b == b'`').count();

    if quote_count % 2 == 1 {
        return MatchRegion::StringLiteral;
    }
    if backtick_count % 2 == 1 {
        return MatchRegion::TemplateString;
    }

    MatchRegion::Code
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// `(line, column)` of `offset`, both 1-indexed. Uses the
/// precomputed, sorted `line_offsets` for an O(log n) lookup rather
/// than rescanning `bytes` from the start on every call; falls back
/// to a linear scan when `line_offsets` is empty (e.g. a test
/// constructing bytes that were never run through the content store).
fn line_and_column(line_offsets: &[u32], bytes: &[u8], offset: u32) -> (u32, u32) {
    if line_offsets.is_empty() {
        let mut line = 1u32;
        let mut line_start = 0usize;
        for (i, &b) in bytes[..offset as usize].iter().enumerate() {
            if b == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        return (line, offset - line_start as u32 + 1);
    }

    let idx = line_offsets.partition_point(|&o| o <= offset).max(1);
    let line_start = line_offsets[idx - 1];
    (idx as u32, offset - line_start + 1)
}

/// `(start_line, end_line)`, both 1-indexed and inclusive, of the
/// context window to attach to a hit on `line`. With `full_function`
/// and an enclosing symbol, the window covers the symbol's own span
/// (capped at `max_function_line_count`, then padded); otherwise it's
/// a fixed `max_context_lines` window centered on `line`.
fn context_window(
    line_offsets: &[u32],
    line: u32,
    enclosing: Option<&crate::symbols::Symbol>,
    options: &SearchOptions,
) -> (u32, u32) {
    if options.full_function {
        if let Some(symbol) = enclosing {
            let start = offset_to_line(line_offsets, symbol.span.start);
            let mut end = offset_to_line(line_offsets, symbol.span.end);
            end = end.min(start + options.max_function_line_count.saturating_sub(1));
            let padded_start = start.saturating_sub(options.context_padding).max(1);
            let padded_end = (end + options.context_padding).min(line_offsets.len() as u32);
            return (padded_start, padded_end.max(padded_start));
        }
    }

    if options.max_context_lines == 0 {
        return (line, line);
    }
    let start = line.saturating_sub(options.max_context_lines).max(1);
    let end = (line + options.max_context_lines).min(line_offsets.len().max(1) as u32);
    (start, end.max(start))
}

fn offset_to_line(line_offsets: &[u32], offset: u32) -> u32 {
    line_offsets.partition_point(|&o| o <= offset).max(1) as u32
}
