//! Per-unit emission state: module imports, shared statics and fresh local names.

use std::collections::BTreeMap;

use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use crate::util::{make_ident, path_tokens, sha256_hex, unit_prefix, PATH_ROOTS};

const CHAINED_ERROR: &str = "ValidationError";

#[derive(Debug, Clone)]
struct Artifact {
    symbol: Ident,
    definition: TokenStream,
}

#[derive(Debug, Clone)]
pub struct GenerationContext {
    prefix: String,
    /// Module path (as seen from the generated module) -> alias.
    imports: BTreeMap<String, String>,
    /// Content digest -> shared static.
    artifacts: BTreeMap<String, Artifact>,
    /// Set once some check wraps a nested error and needs the chained error type.
    chained_error: bool,
    counter: u32,
}

impl GenerationContext {
    pub fn new(unit_file_name: &str) -> Self {
        GenerationContext {
            prefix: unit_prefix(unit_file_name),
            imports: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            chained_error: false,
            counter: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the name generated code should use to reach `module`, importing it once.
    ///
    /// `module` is written relative to the source unit; generated code lives one
    /// module deeper, so `self` and `super` roots are shifted.
    pub fn add_import(&mut self, module: &str) -> String {
        let module = relocate(module);
        let last = module.rsplit("::").next().unwrap_or(&module).to_string();
        if PATH_ROOTS.contains(&last.as_str()) {
            return module;
        }
        if let Some(alias) = self.imports.get(&module) {
            return alias.clone();
        }
        let mut alias = last.clone();
        let mut n = 1;
        while self.imports.values().any(|a| *a == alias) {
            alias = format!("{last}{n}");
            n += 1;
        }
        self.imports.insert(module, alias.clone());
        alias
    }

    pub fn fresh(&mut self, stem: &str) -> Ident {
        self.counter += 1;
        Ident::new(&format!("{stem}_{}", self.counter), Span::call_site())
    }

    /// Error type that keeps a nested or custom validator error reachable through
    /// `Error::source`, defined once per unit on first use.
    pub fn chained_error(&mut self) -> Ident {
        self.chained_error = true;
        Ident::new(CHAINED_ERROR, Span::call_site())
    }

    /// A lazily compiled `regex::Regex` static, shared by every use of the same pattern.
    pub fn pattern(&mut self, stem: &str, pattern: &str) -> Ident {
        self.artifact(stem, "pattern", pattern, |symbol| {
            quote! {
                static #symbol: ::std::sync::LazyLock<::regex::Regex> =
                    ::std::sync::LazyLock::new(|| {
                        ::regex::Regex::new(#pattern).expect("generated pattern is valid")
                    });
            }
        })
    }

    /// A sorted code table, checked with `binary_search`.
    pub fn code_table(&mut self, stem: &str, codes: &[&str]) -> Ident {
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let len = sorted.len();
        let content = sorted.join(",");
        self.artifact(stem, "table", &content, |symbol| {
            quote! {
                static #symbol: [&str; #len] = [#(#sorted),*];
            }
        })
    }

    fn artifact(
        &mut self,
        stem: &str,
        kind: &str,
        content: &str,
        define: impl FnOnce(&Ident) -> TokenStream,
    ) -> Ident {
        let digest = sha256_hex(format!("{kind}\0{content}").as_bytes());
        if let Some(existing) = self.artifacts.get(&digest) {
            return existing.symbol.clone();
        }
        let mut width = 8;
        let name = loop {
            let candidate = format!("{}_{}_{}", self.prefix, stem, &digest[..width])
                .to_ascii_uppercase();
            let taken = self
                .artifacts
                .values()
                .any(|a| a.symbol == candidate.as_str());
            if !taken || width >= digest.len() {
                break candidate;
            }
            width = (width + 4).min(digest.len());
        };
        let symbol = Ident::new(&name, Span::call_site());
        let definition = define(&symbol);
        self.artifacts.insert(
            digest,
            Artifact {
                symbol: symbol.clone(),
                definition,
            },
        );
        symbol
    }

    /// `use` items for every imported module, in path order.
    pub(crate) fn import_items(&self) -> Vec<TokenStream> {
        self.imports
            .iter()
            .map(|(module, alias)| {
                let path = path_tokens(module);
                let alias = make_ident(alias);
                quote!(use #path as #alias;)
            })
            .collect()
    }

    /// Helper types the unit's checks refer to.
    pub(crate) fn support_items(&self) -> Vec<TokenStream> {
        if !self.chained_error {
            return Vec::new();
        }
        let name = Ident::new(CHAINED_ERROR, Span::call_site());
        vec![quote! {
            #[derive(Debug)]
            struct #name {
                message: ::std::string::String,
                source: ::std::boxed::Box<
                    dyn ::std::error::Error + ::core::marker::Send + ::core::marker::Sync,
                >,
            }

            impl #name {
                fn new(
                    message: impl ::core::convert::Into<::std::string::String>,
                    source: impl ::core::convert::Into<
                        ::std::boxed::Box<
                            dyn ::std::error::Error + ::core::marker::Send + ::core::marker::Sync,
                        >,
                    >,
                ) -> Self {
                    #name {
                        message: message.into(),
                        source: source.into(),
                    }
                }
            }

            impl ::core::fmt::Display for #name {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.write_str(&self.message)
                }
            }

            impl ::std::error::Error for #name {
                fn source(&self) -> ::core::option::Option<&(dyn ::std::error::Error + 'static)> {
                    ::core::option::Option::Some(&*self.source)
                }
            }
        }]
    }

    /// Shared statics, ordered by symbol name.
    pub(crate) fn artifact_items(&self) -> Vec<TokenStream> {
        let mut items: Vec<&Artifact> = self.artifacts.values().collect();
        items.sort_by_key(|a| a.symbol.to_string());
        items.iter().map(|a| a.definition.clone()).collect()
    }
}

fn relocate(module: &str) -> String {
    if module == "self" {
        "super".to_string()
    } else if let Some(rest) = module.strip_prefix("self::") {
        format!("super::{rest}")
    } else if module == "super" || module.starts_with("super::") {
        format!("super::{module}")
    } else {
        module.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pattern_is_emitted_once() {
        let mut ctx = GenerationContext::new("user.rs");
        let a = ctx.pattern("EMAIL_RE", "^a+$");
        let b = ctx.pattern("EMAIL_RE", "^a+$");
        let c = ctx.pattern("EMAIL_RE", "^b+$");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.to_string().starts_with("USER_EMAIL_RE_"));
        assert_eq!(ctx.artifact_items().len(), 2);
    }

    #[test]
    fn tables_are_sorted_and_shared() {
        let mut ctx = GenerationContext::new("billing.rs");
        let a = ctx.code_table("ISO4217", &["USD", "EUR", "AED", "EUR"]);
        let b = ctx.code_table("ISO4217", &["AED", "USD", "EUR"]);
        assert_eq!(a, b);
        let items = ctx.artifact_items();
        assert_eq!(items.len(), 1);
        let text: String = items[0]
            .to_string()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        assert!(text.contains(r#"["AED","EUR","USD"]"#), "{text}");
    }

    #[test]
    fn import_aliases_get_counter_suffixes() {
        let mut ctx = GenerationContext::new("user.rs");
        assert_eq!(ctx.add_import("crate::a::validators"), "validators");
        assert_eq!(ctx.add_import("crate::b::validators"), "validators1");
        assert_eq!(ctx.add_import("crate::c::validators"), "validators2");
        assert_eq!(ctx.add_import("crate::a::validators"), "validators");
        assert_eq!(ctx.import_items().len(), 3);
    }

    #[test]
    fn relative_roots_shift_one_level() {
        let mut ctx = GenerationContext::new("user.rs");
        assert_eq!(ctx.add_import("self::checks"), "checks");
        assert_eq!(ctx.add_import("super"), "super::super");
        assert_eq!(ctx.add_import("crate"), "crate");
        let text: String = ctx.import_items()[0]
            .to_string()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        assert_eq!(text, "usesuper::checksaschecks;");
    }

    #[test]
    fn chained_error_is_defined_only_when_used() {
        let mut ctx = GenerationContext::new("user.rs");
        assert!(ctx.support_items().is_empty());
        let checkpoint = ctx.clone();
        assert_eq!(ctx.chained_error().to_string(), "ValidationError");
        assert_eq!(ctx.support_items().len(), 1);
        let text = ctx.support_items()[0].to_string();
        syn::parse_file(&text).unwrap();
        assert!(text.contains("fn source"), "{text}");
        assert!(checkpoint.support_items().is_empty());
    }

    #[test]
    fn fresh_names_are_unique() {
        let mut ctx = GenerationContext::new("user.rs");
        let a = ctx.fresh("item");
        let b = ctx.fresh("item");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "item_1");
    }
}
