//! Package type model and error kinds for the unexport system.
//!
//! This module defines what a [`PackageTypeProvider`](crate::PackageTypeProvider)
//! hands back for one package:
//! - The declaration scope via [`PackageScope`]
//! - Type shapes via [`TypeExpr`] and [`TypeShape`]
//! - Struct fields and pointer method sets
//!
//! It also defines the package enumeration seam and the fatal error kinds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Package Type Model
// ============================================================================

/// Declaration scope of one package.
///
/// Names iterate in sorted order. Methods are kept apart from the scope,
/// keyed by their receiver's base type name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageScope {
    /// Fully-qualified package path
    pub path: String,

    objects: BTreeMap<String, ScopeObject>,

    methods: HashMap<String, BTreeSet<String>>,
}

/// A top-level declared name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeObject {
    pub name: String,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Func,
    Var,
    Const,

    /// A declared type. `alias` is set for `type A = B`.
    TypeName { ty: TypeExpr, alias: bool },
}

/// The parts of a type expression that classification needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    Struct(Vec<FieldDecl>),

    /// Interface with its own method names and embedded local interfaces
    Interface {
        methods: Vec<String>,
        embedded: Vec<String>,
    },

    /// Reference to a type declared in the same package (or a predeclared one)
    Named(String),

    /// Anything else: pointers, slices, maps, funcs, qualified types
    Other,
}

/// One struct field as listed by the struct type itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,

    /// Base type name for embedded fields whose type is declared in the
    /// same package. `None` for named fields and foreign embeddings.
    pub embedded: Option<String>,
}

impl FieldDecl {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            embedded: None,
        }
    }
}

/// Shape of an object's underlying type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    Struct,
    Interface,
    Other,
}

/// Where a name's underlying type comes from.
#[derive(Debug, Clone, Copy)]
enum Underlying<'a> {
    Declared(&'a TypeExpr),

    /// `error`, `any` or `comparable`, with their method names
    Predeclared(&'static [&'static str]),
}

/// Predeclared interface types and their methods.
fn predeclared_interface(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "error" => Some(&["Error"]),
        "any" | "comparable" => Some(&[]),
        _ => None,
    }
}

/// Go's visibility rule: upper-case first letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

impl PackageScope {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, kind: ObjectKind) {
        let name = name.into();
        self.objects.insert(name.clone(), ScopeObject { name, kind });
    }

    /// Records a method declared on `receiver` (value or pointer receiver).
    pub fn add_method(&mut self, receiver: impl Into<String>, method: impl Into<String>) {
        self.methods
            .entry(receiver.into())
            .or_default()
            .insert(method.into());
    }

    /// Top-level names in scope order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn lookup(&self, name: &str) -> Option<&ScopeObject> {
        self.objects.get(name)
    }

    /// Follows local named types and aliases to the type expression that
    /// defines `name`'s underlying type. Names not declared here resolve
    /// only when they are predeclared interfaces; local declarations
    /// shadow them.
    fn underlying(&self, name: &str) -> Option<Underlying<'_>> {
        let mut seen = HashSet::new();
        let mut current = name;
        loop {
            if !seen.insert(current) {
                return None;
            }
            let Some(object) = self.objects.get(current) else {
                return predeclared_interface(current).map(Underlying::Predeclared);
            };
            match &object.kind {
                ObjectKind::TypeName {
                    ty: TypeExpr::Named(next),
                    ..
                } => current = next,
                ObjectKind::TypeName { ty, .. } => return Some(Underlying::Declared(ty)),
                _ => return None,
            }
        }
    }

    /// Classifies the underlying type of a top-level object.
    pub fn shape(&self, name: &str) -> TypeShape {
        match self.underlying(name) {
            Some(Underlying::Declared(TypeExpr::Struct(_))) => TypeShape::Struct,
            Some(Underlying::Declared(TypeExpr::Interface { .. }))
            | Some(Underlying::Predeclared(_)) => TypeShape::Interface,
            _ => TypeShape::Other,
        }
    }

    /// Fields of `name`'s underlying struct, in declaration order.
    pub fn struct_fields(&self, name: &str) -> &[FieldDecl] {
        match self.underlying(name) {
            Some(Underlying::Declared(TypeExpr::Struct(fields))) => fields,
            _ => &[],
        }
    }

    /// Resolves alias chains to the type that owns the methods.
    fn method_owner<'a>(&'a self, name: &'a str) -> &'a str {
        let mut seen = HashSet::new();
        let mut current = name;
        while seen.insert(current) {
            match self.objects.get(current).map(|o| &o.kind) {
                Some(ObjectKind::TypeName {
                    ty: TypeExpr::Named(next),
                    alias: true,
                }) => current = next,
                _ => break,
            }
        }
        current
    }

    /// Names declared directly on `owner`: its methods, plus its fields or
    /// interface methods, and the local types it embeds.
    fn direct_selectors(&self, owner: &str) -> (Vec<String>, Vec<String>, Vec<String>) {
        let methods: Vec<String> = self
            .methods
            .get(owner)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();

        match self.underlying(owner) {
            Some(Underlying::Declared(TypeExpr::Struct(fields))) => (
                methods,
                fields.iter().map(|f| f.name.clone()).collect(),
                fields.iter().filter_map(|f| f.embedded.clone()).collect(),
            ),
            Some(Underlying::Declared(TypeExpr::Interface {
                methods: own,
                embedded,
            })) => {
                let mut all = methods;
                all.extend(own.iter().cloned());
                (all, Vec::new(), embedded.clone())
            }
            Some(Underlying::Predeclared(own)) => {
                let mut all = methods;
                all.extend(own.iter().map(|m| m.to_string()));
                (all, Vec::new(), Vec::new())
            }
            _ => (methods, Vec::new(), Vec::new()),
        }
    }

    /// Method set of `*name`, sorted by method name.
    ///
    /// Includes methods with value and pointer receivers, and methods
    /// promoted through embedded types of this package. At each embedding
    /// depth a name already seen at a shallower depth is shadowed, and a
    /// name contributed more than once is ambiguous and dropped. A type
    /// reached through two embedding paths at one depth counts twice.
    ///
    /// Methods promoted from other packages' types (e.g. an embedded
    /// `sync.Mutex`) are not resolved and never appear.
    pub fn pointer_method_set(&self, name: &str) -> Vec<String> {
        let owner = self.method_owner(name);
        let mut result: BTreeSet<String> = BTreeSet::new();
        let mut shadowed: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut level = vec![owner.to_string()];

        while !level.is_empty() {
            let mut method_hits: HashMap<String, usize> = HashMap::new();
            let mut field_hits: HashSet<String> = HashSet::new();
            let mut next = Vec::new();

            let mut occurrences: HashMap<String, usize> = HashMap::new();
            for ty in level {
                *occurrences
                    .entry(self.method_owner(&ty).to_string())
                    .or_default() += 1;
            }
            occurrences.retain(|ty, _| !visited.contains(ty));

            for (ty, count) in &occurrences {
                let (methods, fields, embedded) = self.direct_selectors(ty);
                for m in methods {
                    *method_hits.entry(m).or_default() += count;
                }
                field_hits.extend(fields);
                for e in embedded {
                    next.extend(std::iter::repeat(e).take(*count));
                }
            }
            visited.extend(occurrences.into_keys());

            for (method, hits) in &method_hits {
                if hits == &1 && !shadowed.contains(method) && !field_hits.contains(method) {
                    result.insert(method.clone());
                }
            }
            shadowed.extend(method_hits.into_keys());
            shadowed.extend(field_hits);
            level = next;
        }

        result.into_iter().collect()
    }
}

// ============================================================================
// Package Enumeration
// ============================================================================

/// Expands a package pattern into fully-qualified package paths.
#[async_trait]
pub trait PackageEnumerator: Send + Sync {
    async fn enumerate(&self, pattern: &str) -> Result<Vec<String>, ConfigurationError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// The blacklist could not be loaded. Always fatal.
#[derive(Error, Debug)]
pub enum BlacklistFormatError {
    #[error("Failed to open blacklist {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read blacklist: {0}")]
    Csv(#[from] csv::Error),

    /// A row does not have exactly `package,receiver,name`
    #[error("Blacklist line {line}: expected 3 fields, found {found}")]
    FieldCount { line: u64, found: usize },
}

/// The run is misconfigured or its package set could not be determined.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Must specify -l (list) or -r (run)")]
    MissingMode,

    #[error("Package enumeration for '{pattern}' failed: {reason}")]
    Enumeration { pattern: String, reason: String },

    #[error("Pattern '{0}' matched no packages")]
    NoPackages(String),
}

/// Fatal errors that abort a whole run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Blacklist(#[from] BlacklistFormatError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to write output: {0}")]
    Output(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn struct_type(fields: Vec<FieldDecl>) -> ObjectKind {
        ObjectKind::TypeName {
            ty: TypeExpr::Struct(fields),
            alias: false,
        }
    }

    fn embedded(name: &str) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            embedded: Some(name.to_string()),
        }
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("Widget"));
        assert!(is_exported("Ärger"));
        assert!(!is_exported("widget"));
        assert!(!is_exported("_"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut scope = PackageScope::new("p");
        scope.insert("Zeta", ObjectKind::Func);
        scope.insert("Alpha", ObjectKind::Var);
        scope.insert("Mid", ObjectKind::Const);
        let names: Vec<&str> = scope.names().collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn test_shape_follows_named_types() {
        let mut scope = PackageScope::new("p");
        scope.insert("Base", struct_type(vec![FieldDecl::named("X")]));
        scope.insert(
            "Derived",
            ObjectKind::TypeName {
                ty: TypeExpr::Named("Base".into()),
                alias: false,
            },
        );
        scope.insert(
            "Loop",
            ObjectKind::TypeName {
                ty: TypeExpr::Named("Loop".into()),
                alias: false,
            },
        );
        scope.insert(
            "ID",
            ObjectKind::TypeName {
                ty: TypeExpr::Named("int".into()),
                alias: false,
            },
        );

        assert_eq!(scope.shape("Derived"), TypeShape::Struct);
        assert_eq!(scope.struct_fields("Derived"), &[FieldDecl::named("X")]);
        assert_eq!(scope.shape("Loop"), TypeShape::Other);
        assert_eq!(scope.shape("ID"), TypeShape::Other);
        assert_eq!(scope.shape("Missing"), TypeShape::Other);
    }

    #[test]
    fn test_predeclared_interfaces_classify_as_interface() {
        let mut scope = PackageScope::new("p");
        for (name, target, alias) in [
            ("MyErr", "error", false),
            ("Any", "any", true),
            ("C", "comparable", false),
        ] {
            scope.insert(
                name,
                ObjectKind::TypeName {
                    ty: TypeExpr::Named(target.into()),
                    alias,
                },
            );
        }
        scope.insert("Failure", struct_type(vec![embedded("error")]));

        assert_eq!(scope.shape("MyErr"), TypeShape::Interface);
        assert_eq!(scope.shape("Any"), TypeShape::Interface);
        assert_eq!(scope.shape("C"), TypeShape::Interface);
        assert_eq!(scope.shape("Failure"), TypeShape::Struct);
        assert_eq!(scope.pointer_method_set("Failure"), vec!["Error"]);
    }

    #[test]
    fn test_local_declaration_shadows_predeclared_name() {
        let mut scope = PackageScope::new("p");
        scope.insert("error", struct_type(vec![]));
        scope.insert(
            "Wrapped",
            ObjectKind::TypeName {
                ty: TypeExpr::Named("error".into()),
                alias: false,
            },
        );
        assert_eq!(scope.shape("Wrapped"), TypeShape::Struct);
    }

    #[test]
    fn test_defined_type_does_not_inherit_methods() {
        let mut scope = PackageScope::new("p");
        scope.insert("Base", struct_type(vec![]));
        scope.insert(
            "Derived",
            ObjectKind::TypeName {
                ty: TypeExpr::Named("Base".into()),
                alias: false,
            },
        );
        scope.insert(
            "Same",
            ObjectKind::TypeName {
                ty: TypeExpr::Named("Base".into()),
                alias: true,
            },
        );
        scope.add_method("Base", "Run");

        assert!(scope.pointer_method_set("Derived").is_empty());
        assert_eq!(scope.pointer_method_set("Same"), vec!["Run"]);
    }

    #[test]
    fn test_promoted_methods_by_depth() {
        let mut scope = PackageScope::new("p");
        scope.insert("Outer", struct_type(vec![embedded("Left"), embedded("Right")]));
        scope.insert("Left", struct_type(vec![]));
        scope.insert("Right", struct_type(vec![]));
        scope.add_method("Outer", "Close");
        scope.add_method("Left", "Close");
        scope.add_method("Left", "Read");
        scope.add_method("Left", "Both");
        scope.add_method("Right", "Write");
        scope.add_method("Right", "Both");

        // Close is shadowed by Outer's own, Both is ambiguous, and the
        // embedded fields shadow nothing here.
        assert_eq!(
            scope.pointer_method_set("Outer"),
            vec!["Close", "Read", "Write"]
        );
    }

    #[test]
    fn test_diamond_embedding_is_ambiguous() {
        let mut scope = PackageScope::new("p");
        scope.insert("S", struct_type(vec![embedded("A"), embedded("B")]));
        scope.insert("A", struct_type(vec![embedded("C")]));
        scope.insert("B", struct_type(vec![embedded("C")]));
        scope.insert("C", struct_type(vec![]));
        scope.add_method("C", "M");
        scope.add_method("A", "Run");

        assert_eq!(scope.pointer_method_set("S"), vec!["Run"]);
        assert_eq!(scope.pointer_method_set("A"), vec!["M", "Run"]);
    }

    #[test]
    fn test_field_shadows_promoted_method() {
        let mut scope = PackageScope::new("p");
        scope.insert(
            "Outer",
            struct_type(vec![FieldDecl::named("Name"), embedded("Inner")]),
        );
        scope.insert("Inner", struct_type(vec![]));
        scope.add_method("Inner", "Name");
        scope.add_method("Inner", "Size");

        assert_eq!(scope.pointer_method_set("Outer"), vec!["Size"]);
    }

    #[test]
    fn test_embedded_interface_methods_promote() {
        let mut scope = PackageScope::new("p");
        scope.insert("Holder", struct_type(vec![embedded("Reader")]));
        scope.insert(
            "Reader",
            ObjectKind::TypeName {
                ty: TypeExpr::Interface {
                    methods: vec!["Read".into()],
                    embedded: vec!["Closer".into()],
                },
                alias: false,
            },
        );
        scope.insert(
            "Closer",
            ObjectKind::TypeName {
                ty: TypeExpr::Interface {
                    methods: vec!["Close".into()],
                    embedded: vec![],
                },
                alias: false,
            },
        );

        assert_eq!(scope.pointer_method_set("Holder"), vec!["Close", "Read"]);
    }

    #[test]
    fn test_recursive_embedding_terminates() {
        let mut scope = PackageScope::new("p");
        scope.insert("Node", struct_type(vec![embedded("Node")]));
        scope.add_method("Node", "Walk");
        assert_eq!(scope.pointer_method_set("Node"), vec!["Walk"]);
    }
}
