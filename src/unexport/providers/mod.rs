//! Go implementations of the package collaborators.
//!
//! - `go_list` - package enumeration and source location via `go list`
//! - `go_source` - declaration scopes parsed from Go sources with tree-sitter

pub mod go_list;
pub mod go_source;

pub use go_list::{GoListPackage, GoTool};
pub use go_source::{GoSourceProvider, ScopeBuilder};
