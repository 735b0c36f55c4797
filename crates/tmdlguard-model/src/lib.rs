//! Project assembly and symbol resolution
//!
//! This crate handles:
//! - Discovering definition files under a project folder
//! - Merging per-file object trees into one model
//! - Building the symbol table and resolving cross-object references

pub mod merged;
pub mod project;
pub mod symbols;

pub use merged::{MergeError, MergedModel};
pub use project::{AssemblyError, LoadedProject, ProjectLoader, SourceFile};
pub use symbols::{
    ColumnTarget, QualifiedName, RelationshipEndpoints, ResolveError, ResolvedLink, ResolvedModel,
    Resolver, SymbolTable,
};
