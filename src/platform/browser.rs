// src/platform/browser.rs

//! Bundle acquisition for the `browser` platform.
//!
//! Starting at the entry module, every dependency reachable through ES
//! `import` / `export ... from`, dynamic `import()` or CommonJS `require()`
//! is resolved, transpiled and wrapped into a function inside a small module
//! registry. The result is one unit carrying an inline source map that
//! points every module line back at its original file.
//!
//! Module syntax is found by walking the parsed program, so comments and
//! string contents never count as imports. Rewrites are line preserving: a
//! statement spanning three lines is replaced by one that still spans three
//! lines, so per-module line maps stay valid after rewriting.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, BindingPatternKind, CallExpression, Declaration, ExportAllDeclaration,
    ExportDefaultDeclaration, ExportDefaultDeclarationKind, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportDeclarationSpecifier, ImportExpression, ModuleExportName,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::{GetSpan, Span};
use tracing::{debug, info};

use crate::errors::{PipewrightError, Result, TransformError};
use crate::fs::FileSystem;
use crate::logging::report_failure;
use crate::pipeline::source_map::{
    self, ConcatSourceMapBuilder, Lookup, SourceMap, SourceMapBuilder,
};
use crate::pipeline::syntax::{SyntaxFailure, parse_program, position_of};
use crate::pipeline::{Artifact, BuildContext, SourceBatch};

/// How a dependency is pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import x from 'm'`, `import 'm'`.
    Static,
    /// `import('m')`.
    Dynamic,
    /// `require('m')`.
    Require,
    /// `export * from 'm'`, `export { a } from 'm'`.
    ReExport,
}

/// A name bound by an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Default(String),
    Namespace(String),
    Named { imported: String, local: String },
}

/// What a dependency reference brings into the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `require()`, `import()` and `import 'm'`.
    Bare,
    Import(Vec<Binding>),
    /// `export * from 'm'`.
    ReexportAll,
    /// `export * as ns from 'm'`.
    ReexportNamespace(String),
    /// `export { a, b as c } from 'm'`, as `(local, exported)` pairs.
    Reexport(Vec<(String, String)>),
}

/// A dependency reference found in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub kind: ImportKind,
    /// Byte range of the statement, or of the call for `require()` and
    /// `import()`.
    pub span: Range<usize>,
    pub clause: Clause,
}

/// Local export syntax that the rewrite turns into `exports.*` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ExportSite {
    /// `export default <expr>`; the range covers `export default `.
    Default(Range<usize>),
    /// `export const a = ...`; the range covers the `export` keyword(s).
    Declaration {
        prefix: Range<usize>,
        pairs: Vec<(String, String)>,
    },
    /// `export { a, b as c };`
    List {
        span: Range<usize>,
        pairs: Vec<(String, String)>,
    },
}

#[derive(Debug, Default)]
struct ModuleSyntax {
    imports: Vec<ImportRef>,
    exports: Vec<ExportSite>,
}

const PRELUDE: &[&str] = &[
    "(function (modules, entry) {",
    "  var cache = {};",
    "  function __pw_require(id) {",
    "    if (cache[id]) return cache[id].exports;",
    "    var module = (cache[id] = { exports: {} });",
    "    modules[id].call(module.exports, module, module.exports, __pw_require);",
    "    return module.exports;",
    "  }",
    "  __pw_require.interop = function (m) {",
    "    return m && Object.prototype.hasOwnProperty.call(m, \"default\") ? m[\"default\"] : m;",
    "  };",
    "  __pw_require.reexport = function (target, source) {",
    "    Object.keys(source).forEach(function (k) {",
    "      if (k !== \"default\") target[k] = source[k];",
    "    });",
    "  };",
    "  return __pw_require(entry);",
    "})({",
];

fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn declared_names(decl: &Declaration<'_>) -> Vec<String> {
    match decl {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .filter_map(|d| match &d.id.kind {
                BindingPatternKind::BindingIdentifier(ident) => Some(ident.name.to_string()),
                _ => None,
            })
            .collect(),
        Declaration::FunctionDeclaration(func) => {
            func.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(class) => {
            class.id.iter().map(|id| id.name.to_string()).collect()
        }
        _ => Vec::new(),
    }
}

/// `require('m')` with a single string literal argument.
fn required_specifier<'c>(call: &'c CallExpression<'_>) -> Option<&'c str> {
    let Expression::Identifier(callee) = &call.callee else {
        return None;
    };
    if callee.name.as_str() != "require" || call.arguments.len() != 1 {
        return None;
    }
    match &call.arguments[0] {
        Argument::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}

#[derive(Default)]
struct SyntaxCollector {
    syntax: ModuleSyntax,
}

impl SyntaxCollector {
    fn import(&mut self, specifier: &str, kind: ImportKind, span: Span, clause: Clause) {
        self.syntax.imports.push(ImportRef {
            specifier: specifier.to_string(),
            kind,
            span: range(span),
            clause,
        });
    }
}

impl<'a> Visit<'a> for SyntaxCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let clause = match &decl.specifiers {
            None => Clause::Bare,
            Some(specifiers) => Clause::Import(
                specifiers
                    .iter()
                    .map(|spec| match spec {
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            Binding::Default(s.local.name.to_string())
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            Binding::Namespace(s.local.name.to_string())
                        }
                        ImportDeclarationSpecifier::ImportSpecifier(s) => Binding::Named {
                            imported: export_name(&s.imported),
                            local: s.local.name.to_string(),
                        },
                    })
                    .collect(),
            ),
        };
        self.import(decl.source.value.as_str(), ImportKind::Static, decl.span, clause);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        let clause = match &decl.exported {
            Some(name) => Clause::ReexportNamespace(export_name(name)),
            None => Clause::ReexportAll,
        };
        self.import(decl.source.value.as_str(), ImportKind::ReExport, decl.span, clause);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        let pairs: Vec<(String, String)> = decl
            .specifiers
            .iter()
            .map(|s| (export_name(&s.local), export_name(&s.exported)))
            .collect();
        if let Some(source) = &decl.source {
            let clause = Clause::Reexport(pairs);
            self.import(source.value.as_str(), ImportKind::ReExport, decl.span, clause);
        } else if let Some(declaration) = &decl.declaration {
            self.syntax.exports.push(ExportSite::Declaration {
                prefix: decl.span.start as usize..declaration.span().start as usize,
                pairs: declared_names(declaration)
                    .into_iter()
                    .map(|name| (name.clone(), name))
                    .collect(),
            });
        } else {
            self.syntax.exports.push(ExportSite::List {
                span: range(decl.span),
                pairs,
            });
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_default_declaration(&mut self, decl: &ExportDefaultDeclaration<'a>) {
        let prefix = decl.span.start as usize..decl.declaration.span().start as usize;
        // Named declarations keep their binding; everything else becomes
        // the right-hand side of the assignment.
        let named = match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                func.id.as_ref().map(|id| id.name.to_string())
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                class.id.as_ref().map(|id| id.name.to_string())
            }
            _ => None,
        };
        self.syntax.exports.push(match named {
            Some(name) => ExportSite::Declaration {
                prefix,
                pairs: vec![(name, "default".to_string())],
            },
            None => ExportSite::Default(prefix),
        });
        walk::walk_export_default_declaration(self, decl);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        match &expr.source {
            Expression::StringLiteral(lit) => {
                self.import(lit.value.as_str(), ImportKind::Dynamic, expr.span, Clause::Bare);
            }
            _ => walk::walk_import_expression(self, expr),
        }
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        match required_specifier(call) {
            Some(specifier) => {
                self.import(specifier, ImportKind::Require, call.span, Clause::Bare);
            }
            None => walk::walk_call_expression(self, call),
        }
    }
}

fn parse_module(code: &str, name: &str) -> std::result::Result<ModuleSyntax, SyntaxFailure> {
    let allocator = Allocator::default();
    let program = parse_program(&allocator, code, name)?;
    let mut collector = SyntaxCollector::default();
    collector.visit_program(&program);

    let mut syntax = collector.syntax;
    syntax.imports.sort_by_key(|r| r.span.start);
    Ok(syntax)
}

/// Every dependency reference in `code`, in source order.
pub fn scan_imports(code: &str) -> std::result::Result<Vec<ImportRef>, TransformError> {
    parse_module(code, "module.js")
        .map(|syntax| syntax.imports)
        .map_err(|failure| failure.into_error("SyntaxError", code))
}

/// Resolve `specifier` as imported from `importer`.
///
/// Relative specifiers try the path itself, then `.js`, then `/index.js`.
/// Bare specifiers are looked up in `<root>/node_modules`, honouring the
/// package's `main` field.
pub fn resolve_specifier(
    fs: &dyn FileSystem,
    root: &Path,
    importer: &Path,
    specifier: &str,
) -> Option<PathBuf> {
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        let base = importer.parent().unwrap_or(root);
        let target = if specifier.starts_with('/') {
            root.join(specifier.trim_start_matches('/'))
        } else {
            base.join(specifier)
        };
        return resolve_file(fs, &clean_keep_dot(&target));
    }

    let mut parts = specifier.splitn(if specifier.starts_with('@') { 3 } else { 2 }, '/');
    let name = if specifier.starts_with('@') {
        let scope = parts.next()?;
        let pkg = parts.next()?;
        format!("{scope}/{pkg}")
    } else {
        parts.next()?.to_string()
    };
    let subpath = parts.next();

    let package_dir = root.join("node_modules").join(&name);
    if !fs.is_dir(&package_dir) {
        return None;
    }
    if let Some(sub) = subpath {
        return resolve_file(fs, &package_dir.join(sub));
    }
    let main = package_main(fs, &package_dir).unwrap_or_else(|| "index.js".to_string());
    resolve_file(fs, &clean_keep_dot(&package_dir.join(main)))
}

fn resolve_file(fs: &dyn FileSystem, target: &Path) -> Option<PathBuf> {
    if fs.is_file(target) {
        return Some(target.to_path_buf());
    }
    let mut with_ext = target.as_os_str().to_owned();
    with_ext.push(".js");
    let with_ext = PathBuf::from(with_ext);
    if fs.is_file(&with_ext) {
        return Some(with_ext);
    }
    let index = target.join("index.js");
    fs.is_file(&index).then_some(index)
}

fn package_main(fs: &dyn FileSystem, package_dir: &Path) -> Option<String> {
    let text = fs.read_to_string(&package_dir.join("package.json")).ok()?;
    let json: serde_json::Value = serde_json::from_str(&text).ok()?;
    json.get("main")?.as_str().map(str::to_string)
}

/// Lexically clean `path`, keeping a leading `./` when the input had one so
/// the result still lines up with paths produced by directory walks.
fn clean_keep_dot(path: &Path) -> PathBuf {
    let cleaned = path_clean::clean(path);
    if path.starts_with(".") && !cleaned.starts_with(".") && !cleaned.is_absolute() {
        Path::new(".").join(cleaned)
    } else {
        cleaned
    }
}

/// One module after transpiling and rewriting.
#[derive(Debug)]
struct BundledModule {
    id: String,
    original: String,
    body: String,
    /// Body lines before this one are the transpiled code; later lines are
    /// appended export assignments.
    mapped_lines: u32,
    /// The transpiler's map, when it produced one.
    map: Option<SourceMap>,
}

/// Bundle the entry module and everything it reaches.
pub async fn acquire(ctx: &BuildContext) -> SourceBatch {
    let mut batch = SourceBatch::default();
    match bundle(ctx).await {
        Ok(artifact) => batch.units.push(artifact),
        Err(failures) => {
            for err in failures {
                report_failure("bundle", &err);
                batch.failures.push(err);
            }
        }
    }
    batch
}

async fn bundle(ctx: &BuildContext) -> std::result::Result<Artifact, Vec<PipewrightError>> {
    let layout = &ctx.layout;
    let fs = ctx.fs.as_ref();
    let entry = layout.root.join(&layout.entry);
    let entry_id = layout.relative(&entry);

    if !fs.is_file(&entry) {
        return Err(vec![
            TransformError::new("BundleError", "entry module not found")
                .in_file(entry_id)
                .into(),
        ]);
    }

    let mut modules = Vec::new();
    let mut failures = Vec::new();
    let mut seen: HashMap<PathBuf, String> = HashMap::new();
    let mut queue = VecDeque::from([entry.clone()]);
    seen.insert(entry.clone(), entry_id.clone());

    while let Some(path) = queue.pop_front() {
        let id = layout.relative(&path);
        let loaded = match load_module(ctx, &path, &id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                failures.push(err);
                continue;
            }
        };
        let syntax = match parse_module(&loaded.code, &id) {
            Ok(syntax) => syntax,
            Err(failure) => {
                let (line, column) = loaded.locate(failure.offset);
                failures.push(
                    TransformError::new("SyntaxError", failure.message)
                        .in_file(id.clone())
                        .at(line, column)
                        .into(),
                );
                continue;
            }
        };

        let mut resolved: HashMap<String, String> = HashMap::new();
        let mut attempted: HashSet<&str> = HashSet::new();
        for import in &syntax.imports {
            if !attempted.insert(import.specifier.as_str()) {
                continue;
            }
            match resolve_specifier(fs, &layout.root, &path, &import.specifier) {
                Some(dep) => {
                    let dep_id = seen
                        .entry(dep.clone())
                        .or_insert_with(|| {
                            queue.push_back(dep.clone());
                            layout.relative(&dep)
                        })
                        .clone();
                    resolved.insert(import.specifier.clone(), dep_id);
                }
                None => {
                    let (line, column) = loaded.locate(import.span.start);
                    failures.push(
                        TransformError::new(
                            "ResolveError",
                            format!("Cannot find module '{}'", import.specifier),
                        )
                        .in_file(id.clone())
                        .at(line, column)
                        .into(),
                    );
                }
            }
        }

        let body = rewrite_module(&loaded.code, &syntax, &resolved);
        debug!(module = %id, deps = resolved.len(), "module bundled");
        modules.push(BundledModule {
            id,
            body,
            mapped_lines: source_map::line_count(&loaded.code),
            original: loaded.original,
            map: loaded.map,
        });
    }

    if !failures.is_empty() {
        return Err(failures);
    }

    info!(modules = modules.len(), entry = %entry_id, "bundle assembled");
    Ok(Artifact {
        relative: PathBuf::from(&layout.bundle),
        contents: render_bundle(&layout.bundle, &entry_id, &modules),
        origin: entry_id,
    })
}

struct LoadedModule {
    original: String,
    code: String,
    map: Option<SourceMap>,
}

impl LoadedModule {
    /// One-based line and column of `offset` in the transpiled code, mapped
    /// back to the original file.
    fn locate(&self, offset: usize) -> (u32, u32) {
        let (line, column) = position_of(&self.code, offset);
        let (line, column) = self
            .map
            .as_ref()
            .and_then(|map| source_map::original_position(map, line, column))
            .map_or((line, column), |origin| (origin.line, origin.column));
        (line + 1, column + 1)
    }
}

async fn load_module(ctx: &BuildContext, path: &Path, id: &str) -> Result<LoadedModule> {
    let original = ctx.fs.read_to_string(path)?;
    let transpiled = ctx.transpiler.transpile(&original, id).await?;
    Ok(match source_map::extract_inline(&transpiled)? {
        Some((code, map)) => LoadedModule {
            original,
            code,
            map: Some(map),
        },
        None => LoadedModule {
            original,
            code: transpiled,
            map: None,
        },
    })
}

/// Newlines in `text`, to pad a replacement to the same height.
fn padding(text: &str) -> String {
    "\n".repeat(text.matches('\n').count())
}

fn quoted(id: &str) -> String {
    serde_json::Value::String(id.to_string()).to_string()
}

/// `.name`, or `["name"]` when `name` is not an identifier.
fn member(name: &str) -> String {
    let identifier = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if identifier {
        format!(".{name}")
    } else {
        format!("[{}]", quoted(name))
    }
}

fn binding_decl(binding: &Binding, module: &str) -> String {
    match binding {
        Binding::Default(local) => format!("{local} = __pw_require.interop({module})"),
        Binding::Namespace(local) => format!("{local} = {module}"),
        Binding::Named { imported, local } => format!("{local} = {module}{}", member(imported)),
    }
}

/// Rewrite module syntax into registry calls. `resolved` maps each
/// specifier to the id of the module it resolved to.
fn rewrite_module(code: &str, syntax: &ModuleSyntax, resolved: &HashMap<String, String>) -> String {
    let target = |spec: &str| {
        let id = resolved.get(spec).map(String::as_str).unwrap_or(spec);
        format!("__pw_require({})", quoted(id))
    };
    let mut temp = 0usize;
    let mut next_temp = || {
        temp += 1;
        format!("__pw{temp}")
    };
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut exported: Vec<(String, String)> = Vec::new();

    for import in &syntax.imports {
        let source = target(&import.specifier);
        let replacement = match &import.clause {
            Clause::Bare => match import.kind {
                ImportKind::Dynamic => {
                    format!("Promise.resolve().then(function () {{ return {source}; }})")
                }
                ImportKind::Static => format!("{source};"),
                ImportKind::Require | ImportKind::ReExport => source,
            },
            Clause::Import(bindings) => {
                let module = next_temp();
                let mut decls = vec![format!("{module} = {source}")];
                decls.extend(bindings.iter().map(|b| binding_decl(b, &module)));
                format!("var {};", decls.join(", "))
            }
            Clause::ReexportAll => format!("__pw_require.reexport(exports, {source});"),
            Clause::ReexportNamespace(ns) => format!("exports{} = {source};", member(ns)),
            Clause::Reexport(pairs) => {
                let module = next_temp();
                let assigns: Vec<String> = pairs
                    .iter()
                    .map(|(local, name)| format!("exports{} = {module}{};", member(name), member(local)))
                    .collect();
                format!("var {module} = {source}; {}", assigns.join(" "))
            }
        };
        let height = padding(&code[import.span.clone()]);
        edits.push((import.span.clone(), replacement + &height));
    }

    for site in &syntax.exports {
        match site {
            ExportSite::Default(prefix) => {
                let height = padding(&code[prefix.clone()]);
                edits.push((prefix.clone(), format!("exports.default = {height}")));
            }
            ExportSite::Declaration { prefix, pairs } => {
                edits.push((prefix.clone(), padding(&code[prefix.clone()])));
                exported.extend(pairs.iter().cloned());
            }
            ExportSite::List { span, pairs } => {
                edits.push((span.clone(), padding(&code[span.clone()])));
                exported.extend(pairs.iter().cloned());
            }
        }
    }

    edits.sort_by_key(|(range, _)| range.start);
    let mut body = String::with_capacity(code.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            continue;
        }
        body.push_str(&code[cursor..range.start]);
        body.push_str(&replacement);
        cursor = range.end;
    }
    body.push_str(&code[cursor..]);

    if !exported.is_empty() {
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        let assigns: Vec<String> = exported
            .iter()
            .map(|(local, name)| format!("exports{} = {local};", member(name)))
            .collect();
        body.push_str(&assigns.join(" "));
        body.push('\n');
    }
    body
}

/// Body lines of `module` mapped onto its original file.
fn module_map(module: &BundledModule) -> SourceMap {
    let mut builder = SourceMapBuilder::default();
    let source = builder.set_source_and_content(&module.id, &module.original);
    let lookup = module.map.as_ref().map(Lookup::new);

    for line in 0..module.mapped_lines {
        let origin = match &lookup {
            Some(lookup) => lookup.original(line, 0).map(|o| (o.line, o.column)),
            None => Some((line, 0)),
        };
        if let Some((src_line, src_column)) = origin {
            builder.add_token(line, 0, src_line, src_column, Some(source), None);
        }
    }
    builder.into_sourcemap()
}

/// Assemble the registry and the inline map.
fn render_bundle(bundle_name: &str, entry_id: &str, modules: &[BundledModule]) -> String {
    let mut lines: Vec<String> = PRELUDE.iter().map(|l| l.to_string()).collect();
    let mut maps: Vec<(SourceMap, u32)> = Vec::with_capacity(modules.len());

    for module in modules {
        lines.push(format!(
            "{}: function (module, exports, __pw_require) {{",
            quoted(&module.id)
        ));
        maps.push((module_map(module), lines.len() as u32));
        lines.extend(module.body.lines().map(str::to_string));
        lines.push("},".to_string());
    }
    lines.push(format!("}}, {});", quoted(entry_id)));

    let parts: Vec<(&SourceMap, u32)> = maps.iter().map(|(map, offset)| (map, *offset)).collect();
    let mut map = ConcatSourceMapBuilder::from_sourcemaps(&parts).into_sourcemap();
    map.set_file(bundle_name);

    let mut code = lines.join("\n");
    code.push('\n');
    code.push_str(&source_map::to_inline_comment(&map));
    code.push('\n');
    code
}
