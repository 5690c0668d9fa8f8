//! `SymbolTable` (spec §4.5): per-file symbol definitions plus the
//! indices needed to look them up by name, position or kind, and a
//! cross-file global name index for whole-corpus symbol search.

use std::collections::HashMap;

use crate::ids::{FileId, LocalSymbolId, SymbolId};

/// Closed set of symbol kinds a collaborator `Parser` can report.
/// Kept closed (rather than an open string) so callers can exhaustively
/// match and so `SemanticFilter`'s kind filters stay type-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Interface,
    Trait,
    Module,
    Variable,
    Constant,
    Field,
    Parameter,
    TypeAlias,
    Macro,
    Impl,
    Property,
    EnumMember,
    Namespace,
    Constructor,
    Operator,
}

/// Byte-offset span within a file, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Crate,
}

/// A single symbol definition, as reported by a collaborator `Parser`
/// and enriched with its containing file and assigned id.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub file_id: FileId,
    pub span: Span,
    pub visibility: Visibility,
    pub is_mutable: bool,
    pub is_global: bool,
    pub is_exported: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_variadic: bool,
    pub is_deprecated: bool,
    pub is_experimental: bool,
    /// No observable side effects, as far as the parser's analysis can
    /// tell - a best-effort signal, not a soundness guarantee.
    pub is_pure: bool,
    pub is_unsafe: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub signature: Option<String>,
    pub doc_comment: Option<String>,
    pub receiver_type: Option<String>,
    /// Cyclomatic-complexity-style estimate; `None` when the parser
    /// does not compute one for this kind of symbol.
    pub complexity: Option<u32>,
    pub parameter_count: Option<u32>,
    pub scope_id: Option<ScopeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeId(pub u32);

/// A lexical scope, chained to its parent to support enclosing-symbol
/// and scope-qualified lookups.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScopeInfo {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub span: Span,
    pub owning_symbol: Option<SymbolId>,
}

/// Per-file symbol storage plus the indices needed for name/position/
/// kind lookups, and the cross-file global name index.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<SymbolId, Symbol>,
    scopes: HashMap<ScopeId, ScopeInfo>,
    by_file: HashMap<FileId, Vec<SymbolId>>,
    by_name: HashMap<String, Vec<SymbolId>>,
    by_kind: HashMap<SymbolKind, Vec<SymbolId>>,
    next_local_id: HashMap<FileId, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh `SymbolId` for `file_id` and insert `symbol`
    /// under it. The caller supplies everything except the id.
    pub fn insert(&mut self, file_id: FileId, mut symbol: Symbol) -> SymbolId {
        let counter = self.next_local_id.entry(file_id).or_insert(0);
        *counter += 1;
        let local = LocalSymbolId(*counter);
        let id = SymbolId::new(file_id, local);

        symbol.id = id;
        symbol.file_id = file_id;

        self.by_file.entry(file_id).or_default().push(id);
        self.by_name.entry(symbol.name.clone()).or_default().push(id);
        self.by_kind.entry(symbol.kind).or_default().push(id);
        self.symbols.insert(id, symbol);
        id
    }

    pub fn insert_scope(&mut self, scope: ScopeInfo) {
        self.scopes.insert(scope.id, scope);
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    pub fn scope(&self, id: ScopeId) -> Option<&ScopeInfo> {
        self.scopes.get(&id)
    }

    /// All definitions of `name`, across every indexed file.
    pub fn find_definitions(&self, name: &str) -> Vec<&Symbol> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.symbols.get(id))
            .collect()
    }

    pub fn find_by_kind(&self, kind: SymbolKind) -> Vec<&Symbol> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|id| self.symbols.get(id))
            .collect()
    }

    pub fn symbols_in_file(&self, file_id: FileId) -> Vec<&Symbol> {
        self.by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.symbols.get(id))
            .collect()
    }

    /// The innermost symbol whose span contains `offset` in `file_id`,
    /// i.e. the smallest enclosing span. Used to attach "defined
    /// inside function X" context to a search hit.
    pub fn find_enclosing_symbol(&self, file_id: FileId, offset: u32) -> Option<&Symbol> {
        self.symbols_in_file(file_id)
            .into_iter()
            .filter(|s| s.span.contains(offset))
            .min_by_key(|s| s.span.len())
    }

    /// Remove every symbol and scope belonging to `file_id`, e.g. when
    /// a file is re-ingested under a new `FileId` and the old entry
    /// must be dropped.
    pub fn remove_file(&mut self, file_id: FileId) {
        if let Some(ids) = self.by_file.remove(&file_id) {
            for id in ids {
                if let Some(symbol) = self.symbols.remove(&id) {
                    if let Some(names) = self.by_name.get_mut(&symbol.name) {
                        names.retain(|i| *i != id);
                    }
                    if let Some(kinds) = self.by_kind.get_mut(&symbol.kind) {
                        kinds.retain(|i| *i != id);
                    }
                }
            }
        }
        self.scopes.retain(|_, s| {
            s.owning_symbol
                .map(|owner| owner.file_id() != file_id)
                .unwrap_or(true)
        });
        self.next_local_id.remove(&file_id);
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

fn default_span() -> Span {
    Span { start: 0, end: 0 }
}

impl Symbol {
    /// Convenience constructor for collaborators that don't yet know
    /// the id/file_id they'll be assigned — those fields are
    /// overwritten by `SymbolTable::insert`.
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: Span) -> Self {
        Symbol {
            id: SymbolId(0),
            name: name.into(),
            kind,
            file_id: FileId::INVALID,
            span,
            visibility: Visibility::Private,
            is_mutable: false,
            is_global: false,
            is_exported: false,
            is_async: false,
            is_generator: false,
            is_variadic: false,
            is_deprecated: false,
            is_experimental: false,
            is_pure: false,
            is_unsafe: false,
            is_static: false,
            is_virtual: false,
            is_abstract: false,
            is_final: false,
            signature: None,
            doc_comment: None,
            receiver_type: None,
            complexity: None,
            parameter_count: None,
            scope_id: None,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        default_span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_symbol(name: &str, kind: SymbolKind, span: Span) -> Symbol {
        Symbol::new(name, kind, span)
    }

    #[test]
    fn insert_assigns_consistent_file_and_symbol_id() {
        let mut table = SymbolTable::new();
        let file = FileId(5);
        let id = table.insert(file, sample_symbol("foo", SymbolKind::Function, Span { start: 0, end: 10 }));
        assert_eq!(id.file_id(), file);
        assert!(table.get(id).is_some());
    }

    #[test]
    fn find_definitions_finds_across_files() {
        let mut table = SymbolTable::new();
        table.insert(FileId(1), sample_symbol("run", SymbolKind::Function, Span { start: 0, end: 5 }));
        table.insert(FileId(2), sample_symbol("run", SymbolKind::Method, Span { start: 0, end: 5 }));
        assert_eq!(table.find_definitions("run").len(), 2);
    }

    #[test]
    fn enclosing_symbol_picks_smallest_containing_span() {
        let mut table = SymbolTable::new();
        let file = FileId(1);
        table.insert(file, sample_symbol("outer", SymbolKind::Class, Span { start: 0, end: 100 }));
        table.insert(file, sample_symbol("inner", SymbolKind::Method, Span { start: 10, end: 20 }));

        let found = table.find_enclosing_symbol(file, 15).unwrap();
        assert_eq!(found.name, "inner");
    }

    #[test]
    fn remove_file_drops_all_its_symbols_and_name_index_entries() {
        let mut table = SymbolTable::new();
        let id = table.insert(FileId(1), sample_symbol("temp", SymbolKind::Variable, Span::default()));
        table.remove_file(FileId(1));
        assert!(table.get(id).is_none());
        assert!(table.find_definitions("temp").is_empty());
    }

    #[test]
    fn span_ordering_invariant_holds_for_inserted_symbols() {
        // §8 invariant 5: span.start <= span.end, and the SymbolId's
        // embedded FileId matches the file it was inserted under.
        let mut table = SymbolTable::new();
        let id = table.insert(FileId(9), sample_symbol("x", SymbolKind::Variable, Span { start: 3, end: 7 }));
        let symbol = table.get(id).unwrap();
        assert!(symbol.span.start <= symbol.span.end);
        assert_eq!(id.file_id(), FileId(9));
    }
}
