//! Name lookup for types the resolver cannot classify structurally.

use crate::config::GenerateOptions;
use crate::model::{Package, UnitId};

/// What a type name refers to, as seen from one source unit.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedType {
    /// `type Name = Target;`
    Alias(syn::Type),
    /// A struct declared in the package being generated.
    LocalRecord { name: String },
    /// A type declared elsewhere; its validation is not this package's concern.
    External { package: String, name: String },
    NumericWrapper { name: String, to_number: String },
    Unknown,
}

pub trait TypeOracle {
    fn lookup(&self, scope: UnitId, path: &syn::Path) -> NamedType;

    fn is_externally_defined(&self, scope: UnitId, path: &syn::Path) -> bool {
        matches!(self.lookup(scope, path), NamedType::External { .. })
    }
}

/// Answers lookups from the package's own sources plus the configured numeric wrappers.
pub struct SourceOracle<'a> {
    package: &'a Package,
    options: &'a GenerateOptions,
}

impl<'a> SourceOracle<'a> {
    pub fn new(package: &'a Package, options: &'a GenerateOptions) -> Self {
        SourceOracle { package, options }
    }

    fn wrapper(&self, full: &str) -> Option<NamedType> {
        self.options.wrapper_for(full).map(|w| NamedType::NumericWrapper {
            name: w.name().to_string(),
            to_number: w.to_number.clone(),
        })
    }

    fn lookup_single(&self, scope: UnitId, name: &str) -> NamedType {
        let unit = self.package.unit(scope);
        if let Some(handle) = unit.aliases.get(name) {
            return NamedType::Alias(self.package.types.get(*handle).clone());
        }
        if self.package.records_in(scope).any(|r| r.name == name) {
            return NamedType::LocalRecord {
                name: name.to_string(),
            };
        }
        if let Some(full) = unit.imports.get(name) {
            let segments: Vec<&str> = full.split("::").collect();
            return self.lookup_qualified(scope, &segments);
        }
        // Glob imports and sibling modules: fall back to package-wide names.
        if self.package.record(name).is_some() {
            return NamedType::LocalRecord {
                name: name.to_string(),
            };
        }
        if let Some(handle) = self
            .package
            .units
            .iter()
            .find_map(|u| u.aliases.get(name))
        {
            return NamedType::Alias(self.package.types.get(*handle).clone());
        }
        NamedType::Unknown
    }

    fn lookup_qualified(&self, scope: UnitId, segments: &[&str]) -> NamedType {
        let mut expanded: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        if let Some(full) = segments
            .first()
            .and_then(|head| self.package.unit(scope).imports.get(*head))
        {
            if full != segments[0] {
                let mut head: Vec<String> = full.split("::").map(str::to_string).collect();
                head.extend(expanded.drain(1..));
                expanded = head;
            }
        }
        let full = expanded.join("::");
        if let Some(wrapper) = self.wrapper(&full) {
            return wrapper;
        }

        let Some((name, prefix)) = expanded.split_last() else {
            return NamedType::Unknown;
        };
        if self.is_package_path(prefix, name) {
            return NamedType::LocalRecord { name: name.clone() };
        }
        NamedType::External {
            package: prefix.join("::"),
            name: name.clone(),
        }
    }

    /// `crate::user::User`, `super::User` or `user::User` naming a record of this package.
    fn is_package_path(&self, prefix: &[String], name: &str) -> bool {
        let Some(record) = self.package.record(name) else {
            return false;
        };
        let module = &self.package.unit(record.unit).module_name;
        match prefix.last().map(String::as_str) {
            Some("crate" | "self" | "super") => true,
            Some(last) => last == module,
            None => true,
        }
    }
}

impl TypeOracle for SourceOracle<'_> {
    fn lookup(&self, scope: UnitId, path: &syn::Path) -> NamedType {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        match segments.as_slice() {
            [] => NamedType::Unknown,
            [single] if path.leading_colon.is_none() => self.lookup_single(scope, single),
            _ => {
                let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
                self.lookup_qualified(scope, &refs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> Package {
        Package::from_sources([
            (
                "user.rs",
                r#"
use crate::shared::Address;
use super::order::Order;
use serde_json as json;
pub type Id = u64;
pub struct User { pub id: Id }
"#,
            ),
            ("order.rs", "pub struct Order { pub total: f64 }\n"),
        ])
        .expect("load")
    }

    fn lookup(pkg: &Package, scope: usize, path: &str) -> NamedType {
        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(pkg, &opts);
        let path: syn::Path = syn::parse_str(path).expect("path");
        oracle.lookup(UnitId(scope), &path)
    }

    #[test]
    fn local_names() {
        let pkg = package();
        assert!(matches!(lookup(&pkg, 0, "Id"), NamedType::Alias(_)));
        assert_eq!(
            lookup(&pkg, 0, "User"),
            NamedType::LocalRecord {
                name: "User".to_string()
            }
        );
        assert_eq!(
            lookup(&pkg, 0, "Order"),
            NamedType::LocalRecord {
                name: "Order".to_string()
            }
        );
        assert_eq!(
            lookup(&pkg, 1, "User"),
            NamedType::LocalRecord {
                name: "User".to_string()
            }
        );
    }

    #[test]
    fn qualified_package_paths() {
        let pkg = package();
        for path in ["crate::order::Order", "order::Order", "super::Order"] {
            assert_eq!(
                lookup(&pkg, 0, path),
                NamedType::LocalRecord {
                    name: "Order".to_string()
                },
                "{path}"
            );
        }
        assert_eq!(
            lookup(&pkg, 0, "billing::Order"),
            NamedType::External {
                package: "billing".to_string(),
                name: "Order".to_string()
            }
        );
    }

    #[test]
    fn imports_and_wrappers() {
        let pkg = package();
        assert_eq!(
            lookup(&pkg, 0, "Address"),
            NamedType::External {
                package: "crate::shared".to_string(),
                name: "Address".to_string()
            }
        );
        assert!(matches!(
            lookup(&pkg, 0, "json::Number"),
            NamedType::NumericWrapper { .. }
        ));
        assert!(matches!(
            lookup(&pkg, 0, "::serde_json::Number"),
            NamedType::NumericWrapper { .. }
        ));
        assert_eq!(lookup(&pkg, 0, "Mystery"), NamedType::Unknown);

        let opts = GenerateOptions::default();
        let oracle = SourceOracle::new(&pkg, &opts);
        let path: syn::Path = syn::parse_str("Address").expect("path");
        assert!(oracle.is_externally_defined(UnitId(0), &path));
    }
}
