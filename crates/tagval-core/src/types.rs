//! Structural classification of declared field types.

use tracing::trace;

use crate::model::UnitId;
use crate::oracle::{NamedType, TypeOracle};

const MAX_ALIAS_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    W128,
    Size,
}

impl IntWidth {
    /// Storage bits; `usize`/`isize` are taken as 64-bit.
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 | IntWidth::Size => 64,
            IntWidth::W128 => 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float32,
    Float64,
    String,
    /// A number carried in another representation, converted with a method call.
    NumericWrapper,
    Slice,
    Array,
    Map,
    Record,
    /// `Option<T>`; the element is `T`.
    Pointer,
    Interface,
    Unknown,
}

impl Kind {
    pub fn is_integer(self) -> bool {
        matches!(self, Kind::Int(_) | Kind::Uint(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_collection(self) -> bool {
        matches!(self, Kind::Slice | Kind::Array | Kind::Map)
    }

    pub fn is_sequence(self) -> bool {
        matches!(self, Kind::Slice | Kind::Array)
    }

    /// Records and types the resolver could not see into are both assumed to carry `validate()`.
    pub fn is_record_like(self) -> bool {
        matches!(self, Kind::Record | Kind::Unknown)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int(_) => "signed integer",
            Kind::Uint(_) => "unsigned integer",
            Kind::Float32 | Kind::Float64 => "float",
            Kind::String => "string",
            Kind::NumericWrapper => "numeric wrapper",
            Kind::Slice => "sequence",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Pointer => "Option",
            Kind::Interface => "trait object",
            Kind::Unknown => "unresolved type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub kind: Kind,
    /// Pointee, sequence element or map value.
    pub element: Option<Box<TypeDescriptor>>,
    /// Set when the type is declared outside the package being generated.
    pub package: Option<String>,
    pub name: Option<String>,
    /// Conversion method for numeric wrappers.
    pub to_number: Option<String>,
    /// References and smart pointers (`&T`, `Box<T>`, `Rc<T>`, `Arc<T>`, `Cow<str>`)
    /// stepped through to reach `kind`; a value place needs this many `*`.
    pub deref: u8,
}

impl TypeDescriptor {
    pub fn basic(kind: Kind) -> Self {
        TypeDescriptor {
            kind,
            element: None,
            package: None,
            name: None,
            to_number: None,
            deref: 0,
        }
    }

    pub fn unknown() -> Self {
        TypeDescriptor::basic(Kind::Unknown)
    }

    pub fn wrapping(kind: Kind, element: TypeDescriptor) -> Self {
        TypeDescriptor {
            element: Some(Box::new(element)),
            ..TypeDescriptor::basic(kind)
        }
    }

    pub fn record(name: impl Into<String>, package: Option<String>) -> Self {
        TypeDescriptor {
            name: Some(name.into()),
            package,
            ..TypeDescriptor::basic(Kind::Record)
        }
    }

    /// The same type seen through one more reference or smart pointer.
    pub fn indirect(mut self) -> Self {
        self.deref = self.deref.saturating_add(1);
        self
    }

    pub fn element(&self) -> TypeDescriptor {
        self.element
            .as_deref()
            .cloned()
            .unwrap_or_else(TypeDescriptor::unknown)
    }

    /// Strips any number of `Option` layers.
    pub fn through_pointer(&self) -> &TypeDescriptor {
        let mut ty = self;
        while ty.kind == Kind::Pointer {
            match ty.element.as_deref() {
                Some(inner) => ty = inner,
                None => break,
            }
        }
        ty
    }

    /// The innermost non-container type: `Vec<Option<Item>>` yields `Item`.
    pub fn ultimate(&self) -> &TypeDescriptor {
        let mut ty = self;
        while matches!(
            ty.kind,
            Kind::Pointer | Kind::Slice | Kind::Array | Kind::Map
        ) {
            match ty.element.as_deref() {
                Some(inner) => ty = inner,
                None => break,
            }
        }
        ty
    }

    pub fn is_external(&self) -> bool {
        self.package.is_some()
    }
}

/// Maps declared `syn::Type`s to [`TypeDescriptor`]s, consulting an oracle for named types.
pub struct TypeResolver<'a> {
    oracle: &'a dyn TypeOracle,
}

impl<'a> TypeResolver<'a> {
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        TypeResolver { oracle }
    }

    pub fn resolve(&self, scope: UnitId, ty: &syn::Type) -> TypeDescriptor {
        self.resolve_depth(scope, ty, 0)
    }

    fn resolve_depth(&self, scope: UnitId, ty: &syn::Type, depth: usize) -> TypeDescriptor {
        if depth > MAX_ALIAS_DEPTH {
            trace!(depth, "alias chain too deep, treating as unknown");
            return TypeDescriptor::unknown();
        }
        match ty {
            syn::Type::Paren(p) => self.resolve_depth(scope, &p.elem, depth),
            syn::Type::Group(g) => self.resolve_depth(scope, &g.elem, depth),
            syn::Type::Reference(r) => self.resolve_depth(scope, &r.elem, depth).indirect(),
            syn::Type::Slice(s) => {
                TypeDescriptor::wrapping(Kind::Slice, self.resolve_depth(scope, &s.elem, depth))
            }
            syn::Type::Array(a) => {
                TypeDescriptor::wrapping(Kind::Array, self.resolve_depth(scope, &a.elem, depth))
            }
            syn::Type::TraitObject(_) | syn::Type::ImplTrait(_) => {
                TypeDescriptor::basic(Kind::Interface)
            }
            syn::Type::Path(p) if p.qself.is_none() => self.resolve_path(scope, &p.path, depth),
            _ => TypeDescriptor::unknown(),
        }
    }

    fn resolve_path(&self, scope: UnitId, path: &syn::Path, depth: usize) -> TypeDescriptor {
        let Some(last) = path.segments.last() else {
            return TypeDescriptor::unknown();
        };
        let name = last.ident.to_string();
        let args = type_args(last);
        let prefix: Vec<String> = path
            .segments
            .iter()
            .take(path.segments.len() - 1)
            .map(|s| s.ident.to_string())
            .collect();

        if path.segments.len() == 1 {
            if let Some(kind) = primitive_kind(&name) {
                return TypeDescriptor::basic(kind);
            }
        }
        if is_std_prefix(&prefix, &name) {
            if let Some(desc) = self.resolve_std(scope, &name, &args, depth) {
                return desc;
            }
        }

        match self.oracle.lookup(scope, path) {
            NamedType::Alias(target) => self.resolve_depth(scope, &target, depth + 1),
            NamedType::LocalRecord { name } => TypeDescriptor::record(name, None),
            NamedType::External { package, name } => TypeDescriptor::record(name, Some(package)),
            NamedType::NumericWrapper { name, to_number } => TypeDescriptor {
                name: Some(name),
                to_number: Some(to_number),
                ..TypeDescriptor::basic(Kind::NumericWrapper)
            },
            NamedType::Unknown => TypeDescriptor {
                name: Some(name),
                ..TypeDescriptor::unknown()
            },
        }
    }

    fn resolve_std(
        &self,
        scope: UnitId,
        name: &str,
        args: &[&syn::Type],
        depth: usize,
    ) -> Option<TypeDescriptor> {
        let arg = |idx: usize| {
            args.get(idx)
                .map(|ty| self.resolve_depth(scope, ty, depth))
                .unwrap_or_else(TypeDescriptor::unknown)
        };
        let desc = match name {
            "String" => TypeDescriptor::basic(Kind::String),
            "Cow" => {
                let inner = arg(0);
                if inner.kind == Kind::String {
                    inner.indirect()
                } else {
                    return None;
                }
            }
            "Option" => TypeDescriptor::wrapping(Kind::Pointer, arg(0)),
            "Box" | "Rc" | "Arc" => arg(0).indirect(),
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" => {
                TypeDescriptor::wrapping(Kind::Slice, arg(0))
            }
            "HashMap" | "BTreeMap" | "IndexMap" => TypeDescriptor::wrapping(Kind::Map, arg(1)),
            _ => return None,
        };
        Some(desc)
    }
}

fn primitive_kind(name: &str) -> Option<Kind> {
    let kind = match name {
        "bool" => Kind::Bool,
        "i8" => Kind::Int(IntWidth::W8),
        "i16" => Kind::Int(IntWidth::W16),
        "i32" => Kind::Int(IntWidth::W32),
        "i64" => Kind::Int(IntWidth::W64),
        "i128" => Kind::Int(IntWidth::W128),
        "isize" => Kind::Int(IntWidth::Size),
        "u8" => Kind::Uint(IntWidth::W8),
        "u16" => Kind::Uint(IntWidth::W16),
        "u32" => Kind::Uint(IntWidth::W32),
        "u64" => Kind::Uint(IntWidth::W64),
        "u128" => Kind::Uint(IntWidth::W128),
        "usize" => Kind::Uint(IntWidth::Size),
        "f32" => Kind::Float32,
        "f64" => Kind::Float64,
        "str" => Kind::String,
        _ => return None,
    };
    Some(kind)
}

fn is_std_prefix(prefix: &[String], name: &str) -> bool {
    match prefix.first().map(String::as_str) {
        None => true,
        Some("std" | "core" | "alloc") => true,
        Some("indexmap") => matches!(name, "IndexMap" | "IndexSet"),
        Some(_) => false,
    }
}

fn type_args(segment: &syn::PathSegment) -> Vec<&syn::Type> {
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(a) => a
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerateOptions;
    use crate::model::Package;
    use crate::oracle::SourceOracle;

    const MODELS: &str = r#"
use serde_json::Number;
use crate::billing::Invoice;
use std::borrow::Cow;

pub type Email = String;
pub type Emails = Vec<Email>;
pub type Loop = Loop2;
pub type Loop2 = Loop;

pub struct Item { pub price: f64 }
"#;

    fn resolve(src: &str) -> TypeDescriptor {
        let pkg = Package::from_sources([("models.rs", MODELS)]).expect("load");
        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(&pkg, &opts);
        let ty: syn::Type = syn::parse_str(src).expect("type");
        TypeResolver::new(&oracle).resolve(UnitId(0), &ty)
    }

    #[test]
    fn primitives() {
        assert_eq!(resolve("u8").kind, Kind::Uint(IntWidth::W8));
        assert_eq!(resolve("isize").kind, Kind::Int(IntWidth::Size));
        assert_eq!(resolve("f32").kind, Kind::Float32);
        assert_eq!(resolve("bool").kind, Kind::Bool);
        assert_eq!(resolve("&'a str").kind, Kind::String);
        assert_eq!(resolve("std::string::String").kind, Kind::String);
        assert_eq!(resolve("Cow<'a, str>").kind, Kind::String);
    }

    #[test]
    fn containers() {
        let opt = resolve("Option<i64>");
        assert_eq!(opt.kind, Kind::Pointer);
        assert_eq!(opt.element().kind, Kind::Int(IntWidth::W64));

        let list = resolve("Vec<Option<Item>>");
        assert_eq!(list.kind, Kind::Slice);
        assert_eq!(list.element().kind, Kind::Pointer);
        assert_eq!(list.ultimate().name.as_deref(), Some("Item"));

        assert_eq!(resolve("[u8; 4]").kind, Kind::Array);
        assert_eq!(resolve("&[String]").kind, Kind::Slice);
        assert_eq!(resolve("Box<Item>").kind, Kind::Record);
        assert_eq!(resolve("std::sync::Arc<str>").kind, Kind::String);

        let map = resolve("std::collections::HashMap<String, Item>");
        assert_eq!(map.kind, Kind::Map);
        assert_eq!(map.element().name.as_deref(), Some("Item"));
        assert_eq!(resolve("BTreeSet<u32>").kind, Kind::Slice);
        assert_eq!(resolve("Box<dyn std::error::Error>").kind, Kind::Interface);
    }

    #[test]
    fn aliases_resolve_recursively() {
        assert_eq!(resolve("Email").kind, Kind::String);
        let emails = resolve("Emails");
        assert_eq!(emails.kind, Kind::Slice);
        assert_eq!(emails.element().kind, Kind::String);
        assert_eq!(resolve("Option<Email>").element().kind, Kind::String);
        assert_eq!(resolve("Loop").kind, Kind::Unknown);
    }

    #[test]
    fn named_types() {
        let item = resolve("Item");
        assert_eq!(item.kind, Kind::Record);
        assert!(!item.is_external());

        let number = resolve("Number");
        assert_eq!(number.kind, Kind::NumericWrapper);
        assert_eq!(number.to_number.as_deref(), Some("as_f64"));
        assert_eq!(resolve("serde_json::Number").kind, Kind::NumericWrapper);

        let invoice = resolve("Invoice");
        assert_eq!(invoice.kind, Kind::Record);
        assert_eq!(invoice.package.as_deref(), Some("crate::billing"));

        let ext = resolve("chrono::DateTime<chrono::Utc>");
        assert_eq!(ext.kind, Kind::Record);
        assert_eq!(ext.package.as_deref(), Some("chrono"));

        let generic = resolve("T");
        assert_eq!(generic.kind, Kind::Unknown);
        assert_eq!(generic.name.as_deref(), Some("T"));
    }

    #[test]
    fn indirection_is_counted() {
        assert_eq!(resolve("i32").deref, 0);
        assert_eq!(resolve("Box<i32>").deref, 1);
        assert_eq!(resolve("&'a str").deref, 1);
        assert_eq!(resolve("Cow<'a, str>").deref, 1);
        let arc = resolve("std::sync::Arc<String>");
        assert_eq!((arc.kind, arc.deref), (Kind::String, 1));
        assert_eq!(resolve("&Box<Item>").deref, 2);

        let opt = resolve("Option<Box<u32>>");
        assert_eq!(opt.deref, 0);
        assert_eq!(opt.element().deref, 1);
        assert_eq!(resolve("&[String]").element().deref, 0);
    }

    #[test]
    fn through_pointer_strips_every_option() {
        let ty = resolve("Option<Option<String>>");
        assert_eq!(ty.through_pointer().kind, Kind::String);
    }
}
