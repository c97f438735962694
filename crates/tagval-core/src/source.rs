//! Builds a [`Package`] from Rust source files.
//!
//! Directives live in doc comments: a field line `/// validate: required,min=3`
//! carries the field's rules, a struct line `/// validate: crate::checks:window`
//! binds a record validator and `/// validate: skip` opts the struct out. An
//! inner `//! validate: skip` opts the whole file out.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode, Location, Phase};
use crate::directive::{parse_binding, parse_directive, DirectiveError};
use crate::model::{
    FieldDescriptor, Package, RecordDescriptor, SourceUnit, StructValidator, UnitId,
};
use crate::util::is_ident;

const DIRECTIVE_PREFIX: &str = "validate:";

impl Package {
    /// Parses in-memory sources, given as `(file_name, source)` pairs, into one package.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Package, Diagnostic>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut package = Package::default();
        for (file_name, src) in sources {
            package.add_unit(file_name.into(), None, src.as_ref())?;
        }
        Ok(package)
    }

    /// Loads every `*.rs` file directly inside `dir`, except previously generated ones.
    pub fn load_dir(dir: &Path, suffix: &str) -> anyhow::Result<Package> {
        let mut paths = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("read package dir: {}", dir.display()))?
        {
            let path = entry
                .with_context(|| format!("read package dir: {}", dir.display()))?
                .path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || !name.ends_with(".rs") || name.ends_with(&format!("{suffix}.rs"))
            {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut package = Package::default();
        for path in paths {
            let src = std::fs::read_to_string(&path)
                .with_context(|| format!("read Rust source: {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            package
                .add_unit(file_name, Some(path.clone()), &src)
                .map_err(|d| anyhow::anyhow!("{d}"))
                .with_context(|| format!("tagval parse failed: {}", path.display()))?;
        }
        debug!(
            dir = %dir.display(),
            units = package.units.len(),
            records = package.records.len(),
            "loaded package"
        );
        Ok(package)
    }

    fn add_unit(
        &mut self,
        file_name: String,
        path: Option<std::path::PathBuf>,
        src: &str,
    ) -> Result<(), Diagnostic> {
        let file = syn::parse_file(src).map_err(|e| {
            Diagnostic::error(DiagnosticCode::TV0002SourceParse, Phase::Load, e.to_string()).at(
                Location {
                    unit: file_name.clone(),
                    record: None,
                    field: None,
                },
            )
        })?;

        let id = UnitId(self.units.len());
        let module_name = file_name
            .strip_suffix(".rs")
            .unwrap_or(&file_name)
            .to_string();
        let mut unit = SourceUnit {
            id,
            file_name,
            module_name,
            path,
            skip: doc_lines(&file.attrs)
                .iter()
                .filter_map(|l| directive_text(l))
                .any(|d| d == "skip"),
            imports: BTreeMap::new(),
            aliases: BTreeMap::new(),
        };

        for item in &file.items {
            match item {
                syn::Item::Use(item_use) => {
                    collect_use_tree(&item_use.tree, &mut Vec::new(), &mut unit.imports);
                }
                syn::Item::Type(alias) => {
                    let handle = self.types.intern((*alias.ty).clone());
                    unit.aliases.insert(alias.ident.to_string(), handle);
                }
                syn::Item::Struct(item) => {
                    if let Some(record) = self.record_from_struct(id, item) {
                        self.records.push(record);
                    }
                }
                _ => {}
            }
        }
        self.units.push(unit);
        Ok(())
    }

    fn record_from_struct(&mut self, unit: UnitId, item: &syn::ItemStruct) -> Option<RecordDescriptor> {
        let syn::Fields::Named(named) = &item.fields else {
            return None;
        };

        let mut skip = false;
        let mut validators = Vec::new();
        let mut annotation_errors = Vec::new();
        for line in doc_lines(&item.attrs) {
            let Some(text) = directive_text(&line) else {
                continue;
            };
            if text == "skip" {
                skip = true;
            } else if text.contains(':') {
                match parse_binding(text) {
                    Some((module, function)) => validators.push(StructValidator {
                        module: Some(module),
                        function,
                    }),
                    None => annotation_errors.push(DirectiveError::MalformedBinding {
                        segment: text.to_string(),
                    }),
                }
            } else if is_ident(text) {
                validators.push(StructValidator {
                    module: None,
                    function: text.to_string(),
                });
            } else if !text.is_empty() {
                annotation_errors.push(DirectiveError::MalformedBinding {
                    segment: text.to_string(),
                });
            }
        }

        let mut fields = Vec::new();
        for field in &named.named {
            let Some(ident) = &field.ident else {
                continue;
            };
            let lines: Vec<String> = doc_lines(&field.attrs)
                .iter()
                .filter_map(|l| directive_text(l).map(str::to_string))
                .collect();
            let directive = (!lines.is_empty()).then(|| lines.join(","));
            let (rules, parse_error) = match directive.as_deref().map(parse_directive) {
                None => (Vec::new(), None),
                Some(Ok(rules)) => (rules, None),
                Some(Err(err)) => (Vec::new(), Some(err)),
            };
            fields.push(FieldDescriptor {
                name: ident.to_string(),
                ty: self.types.intern(field.ty.clone()),
                directive,
                rules,
                parse_error,
            });
        }

        Some(RecordDescriptor {
            name: item.ident.to_string(),
            unit,
            generics: item.generics.clone(),
            fields,
            validators,
            annotation_errors,
            skip,
            needs_generation: false,
        })
    }
}

fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut out = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let syn::Meta::NameValue(nv) = &attr.meta else {
            continue;
        };
        let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) = &nv.value
        else {
            continue;
        };
        out.extend(s.value().lines().map(|l| l.trim().to_string()));
    }
    out
}

fn directive_text(line: &str) -> Option<&str> {
    line.trim().strip_prefix(DIRECTIVE_PREFIX).map(str::trim)
}

fn collect_use_tree(tree: &syn::UseTree, prefix: &mut Vec<String>, out: &mut BTreeMap<String, String>) {
    match tree {
        syn::UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            collect_use_tree(&p.tree, prefix, out);
            prefix.pop();
        }
        syn::UseTree::Name(n) => {
            let name = n.ident.to_string();
            if name == "self" {
                if let Some(last) = prefix.last() {
                    out.insert(last.clone(), prefix.join("::"));
                }
            } else {
                out.insert(name.clone(), join_path(prefix, &name));
            }
        }
        syn::UseTree::Rename(r) => {
            let name = r.ident.to_string();
            let path = if name == "self" {
                prefix.join("::")
            } else {
                join_path(prefix, &name)
            };
            out.insert(r.rename.to_string(), path);
        }
        syn::UseTree::Group(g) => {
            for item in &g.items {
                collect_use_tree(item, prefix, out);
            }
        }
        syn::UseTree::Glob(_) => {}
    }
}

fn join_path(prefix: &[String], name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}::{name}", prefix.join("::"))
    }
}
