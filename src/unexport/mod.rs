//! Unexport module - exported-symbol extraction and rename planning.
//!
//! This module provides the core of the unexport tool:
//! - **Model**: package scopes and type shapes via [`PackageScope`]
//! - **Extraction**: exported symbols per package via [`extract::extract`]
//! - **Filtering**: blacklist subtraction via [`Blacklist`]
//! - **Rendering**: CSV rows and gorename directives via [`render`]
//! - **Pipeline**: async coordinator via [`pipeline::UnexportPipeline`]
//! - **Providers**: Go implementations of the collaborators in [`providers`]

pub mod blacklist;
pub mod extract;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod traits;

// Re-export commonly used types
pub use traits::{
    is_exported, BlacklistFormatError, ConfigurationError, FieldDecl, ObjectKind,
    PackageEnumerator, PackageScope, RunError, ScopeObject, TypeExpr, TypeShape,
};

pub use blacklist::{filter, Blacklist};
pub use pipeline::{ScanResult, ScanStats, UnexportPipeline, DEFAULT_CONCURRENCY};
