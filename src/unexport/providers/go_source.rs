//! Package type provider backed by tree-sitter parsing of Go sources.
//!
//! Only declarations are read: top-level funcs, vars, consts and types,
//! methods keyed by receiver base type, struct field lists and interface
//! method names. Nothing is type-checked.

use crate::traits::{PackageLoadError, PackageTypeProvider};
use crate::unexport::providers::go_list::GoTool;
use crate::unexport::traits::{FieldDecl, ObjectKind, PackageScope, TypeExpr};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

/// Loads packages by locating them with `go list` and parsing their files.
#[derive(Debug, Clone, Default)]
pub struct GoSourceProvider {
    tool: GoTool,
}

impl GoSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_go_binary(mut self, go_binary: impl Into<PathBuf>) -> Self {
        self.tool = GoTool::new(go_binary);
        self
    }
}

#[async_trait]
impl PackageTypeProvider for GoSourceProvider {
    fn provider_id(&self) -> &str {
        "go-source"
    }

    async fn load(&self, package: &str) -> Result<PackageScope, PackageLoadError> {
        let listed = self.tool.locate(package).await?;
        let files = listed.source_files();
        debug!(package, dir = %listed.dir.display(), files = files.len(), "Located package");

        let path = package.to_string();
        tokio::task::spawn_blocking(move || parse_files(&path, &files))
            .await
            .map_err(|e| PackageLoadError::Unresolved {
                package: package.to_string(),
                reason: format!("Task join error: {}", e),
            })?
    }
}

/// Reads and parses every file of one package into a single scope.
pub fn parse_files(package: &str, files: &[PathBuf]) -> Result<PackageScope, PackageLoadError> {
    let mut builder = ScopeBuilder::new(package)?;
    for file in files {
        let source = std::fs::read_to_string(file).map_err(|source| PackageLoadError::Io {
            path: file.clone(),
            source,
        })?;
        builder.add_source(file, &source)?;
    }
    Ok(builder.finish())
}

/// Accumulates the declarations of a package's files.
pub struct ScopeBuilder {
    parser: Parser,
    scope: PackageScope,
}

impl ScopeBuilder {
    pub fn new(package: &str) -> Result<Self, PackageLoadError> {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| PackageLoadError::Parser(e.to_string()))?;

        Ok(Self {
            parser,
            scope: PackageScope::new(package),
        })
    }

    /// Adds one file's top-level declarations. A file with syntax errors
    /// fails the whole package.
    pub fn add_source(&mut self, path: &Path, source: &str) -> Result<(), PackageLoadError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| PackageLoadError::Parser(format!("no tree for {}", path.display())))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(PackageLoadError::Syntax {
                path: path.to_path_buf(),
                line: first_error_line(root),
            });
        }

        let src = source.as_bytes();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "function_declaration" => {
                    if let Some(name) = field_text(node, "name", src) {
                        self.scope.insert(name, ObjectKind::Func);
                    }
                }
                "method_declaration" => {
                    let receiver = node
                        .child_by_field_name("receiver")
                        .and_then(|r| receiver_base(r, src));
                    if let (Some(receiver), Some(name)) = (receiver, field_text(node, "name", src)) {
                        self.scope.add_method(receiver, name);
                    }
                }
                "var_declaration" => self.add_specs(node, "var_spec", ObjectKind::Var, src),
                "const_declaration" => self.add_specs(node, "const_spec", ObjectKind::Const, src),
                "type_declaration" => self.add_types(node, src),
                _ => {}
            }
        }
        Ok(())
    }

    fn add_specs(&mut self, decl: Node, spec_kind: &str, kind: ObjectKind, src: &[u8]) {
        let mut specs = Vec::new();
        let mut cursor = decl.walk();
        for child in decl.named_children(&mut cursor) {
            if child.kind() == spec_kind {
                specs.push(child);
            } else if child.kind().ends_with("_spec_list") {
                let mut inner = child.walk();
                specs.extend(child.named_children(&mut inner).filter(|c| c.kind() == spec_kind));
            }
        }

        for spec in specs {
            let mut names = spec.walk();
            for ident in spec
                .children_by_field_name("name", &mut names)
                .filter(|n| n.is_named())
            {
                self.scope.insert(text(ident, src), kind.clone());
            }
        }
    }

    fn add_types(&mut self, decl: Node, src: &[u8]) {
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            let alias = match spec.kind() {
                "type_spec" => false,
                "type_alias" => true,
                _ => continue,
            };
            let Some(name) = field_text(spec, "name", src) else {
                continue;
            };
            let ty = spec
                .child_by_field_name("type")
                .map(|t| type_expr(t, src))
                .unwrap_or(TypeExpr::Other);
            self.scope.insert(name, ObjectKind::TypeName { ty, alias });
        }
    }

    pub fn finish(self) -> PackageScope {
        self.scope
    }
}

fn text<'s>(node: Node, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or_default()
}

fn field_text<'s>(node: Node, field: &str, src: &'s [u8]) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| text(n, src))
}

fn first_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let first = node.named_children(&mut cursor).next();
    first
}

fn last_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let last = node.named_children(&mut cursor).last();
    last
}

/// 1-based line of the first error or missing node.
fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return node.start_position().row + 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    node.start_position().row + 1
}

/// Base type name of a method receiver: `T` for `(t T)`, `(t *T)` and
/// `(l *List[T])`.
fn receiver_base<'s>(params: Node, src: &'s [u8]) -> Option<&'s str> {
    let mut cursor = params.walk();
    let param = params
        .named_children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    base_type_name(param.child_by_field_name("type")?, src)
}

fn base_type_name<'s>(node: Node, src: &'s [u8]) -> Option<&'s str> {
    match node.kind() {
        "type_identifier" => Some(text(node, src)),
        "pointer_type" => base_type_name(last_named_child(node)?, src),
        "generic_type" => base_type_name(node.child_by_field_name("type")?, src),
        "parenthesized_type" => base_type_name(first_named_child(node)?, src),
        _ => None,
    }
}

fn type_expr(node: Node, src: &[u8]) -> TypeExpr {
    match node.kind() {
        "struct_type" => TypeExpr::Struct(struct_fields(node, src)),
        "interface_type" => interface_type(node, src),
        "type_identifier" => TypeExpr::Named(text(node, src).to_string()),
        "generic_type" => match node.child_by_field_name("type") {
            Some(base) if base.kind() == "type_identifier" => {
                TypeExpr::Named(text(base, src).to_string())
            }
            _ => TypeExpr::Other,
        },
        "parenthesized_type" => first_named_child(node)
            .map(|inner| type_expr(inner, src))
            .unwrap_or(TypeExpr::Other),
        _ => TypeExpr::Other,
    }
}

fn struct_fields(node: Node, src: &[u8]) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    let mut cursor = node.walk();
    let Some(list) = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "field_declaration_list")
    else {
        return fields;
    };

    let mut list_cursor = list.walk();
    for decl in list.named_children(&mut list_cursor) {
        if decl.kind() != "field_declaration" {
            continue;
        }
        let mut names = decl.walk();
        let named: Vec<FieldDecl> = decl
            .children_by_field_name("name", &mut names)
            .filter(|n| n.is_named())
            .map(|n| FieldDecl::named(text(n, src)))
            .collect();
        if !named.is_empty() {
            fields.extend(named);
        } else if let Some(field) = decl
            .child_by_field_name("type")
            .and_then(|t| embedded_field(t, src))
        {
            fields.push(field);
        }
    }
    fields
}

/// An embedded field is named after its type; only unqualified types can
/// be followed for promoted methods.
fn embedded_field(node: Node, src: &[u8]) -> Option<FieldDecl> {
    match node.kind() {
        "type_identifier" => {
            let name = text(node, src).to_string();
            Some(FieldDecl {
                name: name.clone(),
                embedded: Some(name),
            })
        }
        "qualified_type" => Some(FieldDecl::named(field_text(node, "name", src)?)),
        "pointer_type" => embedded_field(last_named_child(node)?, src),
        "generic_type" => embedded_field(node.child_by_field_name("type")?, src),
        _ => None,
    }
}

fn interface_type(node: Node, src: &[u8]) -> TypeExpr {
    let mut methods = Vec::new();
    let mut embedded = Vec::new();
    let mut cursor = node.walk();
    for elem in node.named_children(&mut cursor) {
        match elem.kind() {
            "method_elem" | "method_spec" => {
                if let Some(name) = field_text(elem, "name", src) {
                    methods.push(name.to_string());
                }
            }
            "type_elem" => {
                let mut inner = elem.walk();
                embedded.extend(
                    elem.named_children(&mut inner)
                        .filter(|t| t.kind() == "type_identifier")
                        .map(|t| text(t, src).to_string()),
                );
            }
            "type_identifier" => embedded.push(text(elem, src).to_string()),
            _ => {}
        }
    }
    TypeExpr::Interface { methods, embedded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::flatten;
    use crate::unexport::extract::extract;
    use crate::unexport::traits::TypeShape;

    fn parse(source: &str) -> PackageScope {
        let mut builder = ScopeBuilder::new("example.org/m").unwrap();
        builder.add_source(Path::new("m.go"), source).unwrap();
        builder.finish()
    }

    fn listing(scope: &PackageScope) -> Vec<String> {
        flatten(extract(scope))
            .into_iter()
            .map(|s| format!("{},{},{}", s.package, s.receiver, s.name))
            .collect()
    }

    #[test]
    fn test_widget_scenario() {
        let scope = parse(
            r#"
package m

type Widget struct {
	Label string
}

func (w *Widget) Show() {}
"#,
        );
        assert_eq!(
            listing(&scope),
            vec![
                "example.org/m,,Widget",
                "example.org/m,Widget,Show",
                "example.org/m,Widget,Label",
            ]
        );
    }

    #[test]
    fn test_declaration_kinds() {
        let scope = parse(
            r#"
package m

import "sync"

const (
	MaxSize = 10
	minSize = 1
	A, B    = 2, 3
)

var Default, other = 1, 2

var (
	Registry map[string]int
)

type (
	ID     int
	Handle = ID
)

type Runner interface {
	Run() error
	stop()
}

type Pair[K comparable, V any] struct {
	Key   K
	value V
}

func (p Pair[K, V]) Swap() {}
func (p *Pair[K, V]) reset() {}

type Server struct {
	sync.Mutex
	*Base
	Name, addr string
}

type Base struct{ ID int }

func (b *Base) Close() error { return nil }
func (s Server) Start()      {}

func New() *Server { return nil }
func init()         {}
"#,
        );

        assert_eq!(scope.lookup("New").map(|o| &o.kind), Some(&ObjectKind::Func));
        assert_eq!(scope.lookup("MaxSize").map(|o| &o.kind), Some(&ObjectKind::Const));
        assert_eq!(scope.lookup("Registry").map(|o| &o.kind), Some(&ObjectKind::Var));
        assert!(scope.lookup("stop").is_none());
        assert_eq!(scope.shape("Runner"), TypeShape::Interface);
        assert_eq!(scope.shape("Pair"), TypeShape::Struct);
        assert_eq!(scope.shape("ID"), TypeShape::Other);
        assert_eq!(scope.shape("Handle"), TypeShape::Other);
        assert_eq!(scope.pointer_method_set("Pair"), vec!["Swap", "reset"]);
        assert_eq!(scope.pointer_method_set("Server"), vec!["Close", "Start"]);

        let names: Vec<String> = scope
            .struct_fields("Server")
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, vec!["Mutex", "Base", "Name", "addr"]);

        assert_eq!(
            listing(&scope),
            vec![
                "example.org/m,,A",
                "example.org/m,,B",
                "example.org/m,,Base",
                "example.org/m,Base,Close",
                "example.org/m,Base,ID",
                "example.org/m,,Default",
                "example.org/m,,Handle",
                "example.org/m,,ID",
                "example.org/m,,MaxSize",
                "example.org/m,,New",
                "example.org/m,,Pair",
                "example.org/m,Pair,Swap",
                "example.org/m,Pair,Key",
                "example.org/m,,Registry",
                "example.org/m,,Server",
                "example.org/m,Server,Close",
                "example.org/m,Server,Start",
                "example.org/m,Server,Mutex",
                "example.org/m,Server,Base",
                "example.org/m,Server,Name",
            ]
        );
    }

    #[test]
    fn test_predeclared_interface_types_are_skipped() {
        let scope = parse(
            r#"
package m

type MyErr error

type Any = any

type Failure struct {
	error
	Code int
}
"#,
        );
        assert_eq!(
            listing(&scope),
            vec![
                "example.org/m,,Failure",
                "example.org/m,Failure,Error",
                "example.org/m,Failure,Code",
            ]
        );
    }

    #[test]
    fn test_diamond_embedding_drops_ambiguous_method() {
        let scope = parse(
            r#"
package m

type C struct{}

func (c *C) M() {}

type A struct{ C }
type B struct{ C }
type S struct {
	A
	B
}
"#,
        );
        let rows = listing(&scope);
        assert!(rows.contains(&"example.org/m,A,M".to_string()));
        assert!(!rows.contains(&"example.org/m,S,M".to_string()));
    }

    #[test]
    fn test_interface_embedding_in_struct() {
        let scope = parse(
            r#"
package m

type Reader interface{ Read() }

type Closer interface {
	Reader
	Close()
}

type File struct {
	Closer
}
"#,
        );
        assert_eq!(scope.pointer_method_set("File"), vec!["Close", "Read"]);
    }

    #[test]
    fn test_methods_across_files_share_scope() {
        let mut builder = ScopeBuilder::new("example.org/m").unwrap();
        builder
            .add_source(Path::new("a.go"), "package m\n\nfunc (w *Widget) Show() {}\n")
            .unwrap();
        builder
            .add_source(Path::new("b.go"), "package m\n\ntype Widget struct{}\n")
            .unwrap();
        let scope = builder.finish();
        assert_eq!(scope.pointer_method_set("Widget"), vec!["Show"]);
    }

    #[test]
    fn test_syntax_error_fails_package() {
        let mut builder = ScopeBuilder::new("example.org/m").unwrap();
        let err = builder
            .add_source(Path::new("bad.go"), "package m\n\nfunc Broken( {\n")
            .unwrap_err();
        match err {
            PackageLoadError::Syntax { path, line } => {
                assert_eq!(path, PathBuf::from("bad.go"));
                assert!(line >= 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_files_reports_missing_file() {
        let err = parse_files("example.org/m", &[PathBuf::from("/nonexistent/m.go")]).unwrap_err();
        assert!(matches!(err, PackageLoadError::Io { .. }));
    }

    #[test]
    fn test_parse_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("widget.go");
        std::fs::write(&file, "package m\n\ntype Widget struct{ Label string }\n").unwrap();

        let scope = parse_files("example.org/m", &[file]).unwrap();
        assert_eq!(scope.path, "example.org/m");
        assert_eq!(scope.shape("Widget"), TypeShape::Struct);
    }
}
