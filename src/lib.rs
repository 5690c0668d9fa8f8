//! In-process code intelligence index: trigram search over file content,
//! symbol tables and a reference graph, served through a single
//! [`index::MasterIndex`] entry point.
//!
//! The crate is memory-resident and rebuilt per process (see
//! [`index`] module docs for the ingestion contract). Language-specific
//! parsing, the CLI front-end, the RPC transport, config-file loading
//! and watch-mode file monitoring are treated as external collaborators
//! and are not implemented here; [`parser::Parser`] is the trait a
//! collaborator implements to feed this engine.

pub mod error;
pub mod ids;
pub mod objectid;
pub mod store;
pub mod mask;
pub mod trigram;
pub mod symbols;
pub mod references;
pub mod parser;
pub mod search;
pub mod index;

pub use error::{IndexError, Result};
pub use ids::{FileId, LocalSymbolId, SymbolId};
pub use index::MasterIndex;
pub use objectid::ObjectId;
