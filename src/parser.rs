//! The `Parser` collaborator contract (spec §1, §5): language-specific
//! AST parsing is explicitly out of scope for this crate. Anything
//! that wants to feed real symbols and references into a
//! [`crate::index::MasterIndex`] implements this trait; this crate
//! ships no concrete implementation, only the boundary and a minimal
//! in-memory stand-in used by tests.

use crate::references::Reference;
use crate::symbols::{ScopeInfo, Symbol};

/// Everything a collaborator parser reports about one file's bytes.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub scopes: Vec<ScopeInfo>,
    /// Opaque, implementation-defined performance data (e.g.
    /// microseconds spent parsing); surfaced verbatim in
    /// `IndexReport` for observability but never interpreted here.
    pub perf_data: Option<PerfData>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PerfData {
    pub parse_micros: u64,
    pub node_count: u32,
}

/// A pure function from file bytes to the symbols/references/scopes
/// found in them. Implementations must not perform I/O, hold onto
/// `bytes` past the call, or depend on global state — the contract a
/// `MasterIndex` relies on to call this safely from parallel workers.
pub trait Parser: Send + Sync {
    /// `language` is a short identifier (`"rust"`, `"typescript"`, ...)
    /// the caller derives from the file extension; implementations are
    /// free to return an empty `ParseOutput` for languages they don't
    /// support.
    fn parse(&self, bytes: &[u8], language: &str) -> ParseOutput;
}

/// A `Parser` that reports nothing for any input. Used as the default
/// when a `MasterIndex` is built without a collaborator wired in —
/// indexing still proceeds for trigram search, just without symbols
/// or references.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullParser;

impl Parser for NullParser {
    fn parse(&self, _bytes: &[u8], _language: &str) -> ParseOutput {
        ParseOutput::default()
    }
}
