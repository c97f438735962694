//! The package graph handed to the generator: units, records and their fields.

use std::collections::BTreeMap;
use std::path::PathBuf;

use quote::ToTokens;

use crate::directive::{DirectiveError, ParsedRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub(crate) usize);

/// Opaque handle to a field's declared type, owned by the package's [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(usize);

#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    types: Vec<syn::Type>,
}

impl TypeArena {
    pub(crate) fn intern(&mut self, ty: syn::Type) -> TypeHandle {
        self.types.push(ty);
        TypeHandle(self.types.len() - 1)
    }

    pub fn get(&self, handle: TypeHandle) -> &syn::Type {
        &self.types[handle.0]
    }

    /// The declared type re-rendered as source text, for diagnostics.
    pub fn display(&self, handle: TypeHandle) -> String {
        self.get(handle)
            .to_token_stream()
            .to_string()
            .replace(" < ", "<")
            .replace(" >", ">")
            .replace(" :: ", "::")
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeHandle,
    /// Raw directive text, `None` when the field carries no `validate:` line.
    pub directive: Option<String>,
    pub rules: Vec<ParsedRule>,
    pub parse_error: Option<DirectiveError>,
}

impl FieldDescriptor {
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }
}

/// A record-level validator bound with `validate: path:function` on the struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructValidator {
    pub module: Option<String>,
    pub function: String,
}

#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    pub name: String,
    pub unit: UnitId,
    pub generics: syn::Generics,
    pub fields: Vec<FieldDescriptor>,
    pub validators: Vec<StructValidator>,
    /// Malformed record-level directive lines.
    pub annotation_errors: Vec<DirectiveError>,
    pub skip: bool,
    pub needs_generation: bool,
}

impl RecordDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the record asks for validation on its own, before any dive forcing.
    pub fn has_own_validation(&self) -> bool {
        !self.validators.is_empty()
            || !self.annotation_errors.is_empty()
            || self
                .fields
                .iter()
                .any(|f| f.has_rules() || f.parse_error.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: UnitId,
    /// File name, e.g. `user.rs`.
    pub file_name: String,
    /// Module the unit declares, e.g. `user`.
    pub module_name: String,
    pub path: Option<PathBuf>,
    pub skip: bool,
    /// Local name -> full path, from `use` items.
    pub imports: BTreeMap<String, String>,
    /// `type Name = ...;` items.
    pub aliases: BTreeMap<String, TypeHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct Package {
    pub units: Vec<SourceUnit>,
    pub records: Vec<RecordDescriptor>,
    pub types: TypeArena,
}

impl Package {
    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.0]
    }

    pub fn records_in(&self, id: UnitId) -> impl Iterator<Item = &RecordDescriptor> + '_ {
        self.records.iter().filter(move |r| r.unit == id)
    }

    pub fn record(&self, name: &str) -> Option<&RecordDescriptor> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Finds a record by name, preferring one declared in `scope`.
    pub(crate) fn record_index_near(&self, scope: UnitId, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.unit == scope && r.name == name)
            .or_else(|| self.records.iter().position(|r| r.name == name))
    }

    pub(crate) fn record_near(&self, scope: UnitId, name: &str) -> Option<&RecordDescriptor> {
        self.record_index_near(scope, name).map(|idx| &self.records[idx])
    }
}
