//! Turns one source unit into the text of its generated validation file.

use proc_macro2::TokenStream;
use quote::quote;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{GenerateOptions, UnknownDirectiveMode};
use crate::context::GenerationContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Location};
use crate::directive::ParsedRule;
use crate::model::{FieldDescriptor, Package, RecordDescriptor, SourceUnit};
use crate::rules::{self, custom, presence, Applicability, Subject};
use crate::types::{TypeDescriptor, TypeResolver};
use crate::util::make_ident;

/// Generated code for one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutput {
    pub source_file: String,
    pub output_file: String,
    #[serde(skip)]
    pub source_path: Option<std::path::PathBuf>,
    /// Records that received a `validate()` method, in source order.
    pub records: Vec<String>,
    pub code: String,
}

/// State threaded through the emission of one record.
pub(crate) struct Emitter<'a> {
    pub(crate) ctx: &'a mut GenerationContext,
    pub(crate) package: &'a Package,
    pub(crate) record: &'a RecordDescriptor,
    resolver: &'a TypeResolver<'a>,
    options: &'a GenerateOptions,
    unit_name: &'a str,
    field: Option<String>,
    warnings: Vec<Diagnostic>,
}

impl<'a> Emitter<'a> {
    fn new(
        ctx: &'a mut GenerationContext,
        package: &'a Package,
        record: &'a RecordDescriptor,
        resolver: &'a TypeResolver<'a>,
        options: &'a GenerateOptions,
    ) -> Self {
        Emitter {
            ctx,
            package,
            record,
            resolver,
            options,
            unit_name: &package.unit(record.unit).file_name,
            field: None,
            warnings: Vec::new(),
        }
    }

    fn location(&self) -> Location {
        Location {
            unit: self.unit_name.to_string(),
            record: Some(self.record.name.clone()),
            field: self.field.clone(),
        }
    }

    pub(crate) fn error(&self, code: DiagnosticCode, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(code, code.default_phase(), message).at(self.location())
    }

    pub(crate) fn warn(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        let diagnostic =
            Diagnostic::warning(code, code.default_phase(), message).at(self.location());
        warn!(
            code = code.code_str(),
            location = %self.location(),
            "{}",
            diagnostic.message
        );
        self.warnings.push(diagnostic);
    }

    pub(crate) fn field_type(&self, field: &FieldDescriptor) -> TypeDescriptor {
        self.resolver
            .resolve(self.record.unit, self.package.types.get(field.ty))
    }

    fn field_type_text(&self) -> String {
        self.field
            .as_deref()
            .and_then(|name| self.record.field(name))
            .map(|f| self.package.types.display(f.ty))
            .unwrap_or_default()
    }
}

/// Runs `rules` against `subject`: `omitempty` guards everything, unknown segments
/// follow the configured mode and inapplicable rules fail the record.
pub(crate) fn emit_rules(
    em: &mut Emitter<'_>,
    subject: &Subject,
    rules: &[ParsedRule],
) -> Result<TokenStream, Diagnostic> {
    let mut body = TokenStream::new();
    let mut omit_empty = false;
    for rule in rules {
        match rule {
            ParsedRule::OmitEmpty => {
                omit_empty = true;
                continue;
            }
            ParsedRule::Unknown { raw } => match em.options.unknown_directives {
                UnknownDirectiveMode::Skip => {
                    em.warn(
                        DiagnosticCode::TV0200UnknownDirective,
                        format!("skipping unknown validation directive `{raw}`"),
                    );
                    continue;
                }
                UnknownDirectiveMode::Fail => {
                    return Err(em.error(
                        DiagnosticCode::TV0200UnknownDirective,
                        format!("unknown validation directive `{raw}`"),
                    ));
                }
            },
            _ => {}
        }
        match rules::check(rule, &subject.ty) {
            Applicability::Applies => body.extend(rules::emit(em, rule, subject)?),
            Applicability::NoOp(reason) => {
                debug!(
                    record = %em.record.name,
                    field = em.field.as_deref().unwrap_or(""),
                    rule = rule.name(),
                    reason = %reason,
                    "rule is a no-op for this type"
                );
            }
            Applicability::Unsupported(reason) => {
                let code = match rule {
                    ParsedRule::Dive { .. } => DiagnosticCode::TV0400DiveTypeError,
                    _ => DiagnosticCode::TV0100UnsupportedRuleForType,
                };
                return Err(em.error(
                    code,
                    format!(
                        "rule `{}` cannot apply to `{}`: {reason}",
                        rule.name(),
                        em.field_type_text()
                    ),
                ));
            }
        }
    }
    if omit_empty && !body.is_empty() {
        if let Some(empty) = presence::emptiness(subject) {
            return Ok(quote! {
                if !(#empty) {
                    #body
                }
            });
        }
    }
    Ok(body)
}

fn emit_record(em: &mut Emitter<'_>) -> Result<TokenStream, Diagnostic> {
    let record = em.record;
    if let Some(err) = record.annotation_errors.first() {
        return Err(em.error(DiagnosticCode::TV0001DirectiveParse, err.to_string()));
    }

    let mut body = TokenStream::new();
    for field in &record.fields {
        em.field = Some(field.name.clone());
        if let Some(err) = &field.parse_error {
            return Err(em.error(DiagnosticCode::TV0001DirectiveParse, err.to_string()));
        }
        if !field.has_rules() {
            continue;
        }
        let ty = em.field_type(field);
        debug!(
            record = %record.name,
            field = %field.name,
            kind = ?ty.kind,
            "resolved field type"
        );
        let subject = Subject::field(&field.name, ty);
        body.extend(emit_rules(em, &subject, &field.rules)?);
    }
    em.field = None;
    for validator in &record.validators {
        body.extend(custom::emit_struct_validator(em, validator));
    }

    let name = make_ident(&record.name);
    let (impl_generics, ty_generics, where_clause) = record.generics.split_for_impl();
    Ok(quote! {
        #[allow(unused_variables, clippy::all)]
        impl #impl_generics #name #ty_generics #where_clause {
            pub fn validate(&self) -> ::core::result::Result<
                (),
                ::std::boxed::Box<
                    dyn ::std::error::Error + ::core::marker::Send + ::core::marker::Sync,
                >,
            > {
                #body
                ::core::result::Result::Ok(())
            }
        }
    })
}

fn first_unknown(rules: &[ParsedRule]) -> Option<&str> {
    rules.iter().find_map(|rule| match rule {
        ParsedRule::Unknown { raw } => Some(raw.as_str()),
        ParsedRule::Dive { elements } => first_unknown(elements),
        _ => None,
    })
}

/// Emits the validation file for `unit`, or `None` when nothing in it needs one.
///
/// A failing record is dropped along with anything it registered in the unit's
/// context; an unknown directive in `fail` mode drops the whole unit.
pub(crate) fn emit_unit(
    package: &Package,
    unit: &SourceUnit,
    resolver: &TypeResolver<'_>,
    options: &GenerateOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<UnitOutput> {
    if unit.skip {
        debug!(unit = %unit.file_name, "unit is marked skip");
        return None;
    }
    let records: Vec<&RecordDescriptor> = package
        .records_in(unit.id)
        .filter(|r| r.needs_generation && !r.skip)
        .collect();
    if records.is_empty() {
        return None;
    }

    if options.unknown_directives == UnknownDirectiveMode::Fail {
        for record in &records {
            for field in &record.fields {
                if let Some(raw) = first_unknown(&field.rules) {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::TV0200UnknownDirective,
                            DiagnosticCode::TV0200UnknownDirective.default_phase(),
                            format!("unknown validation directive `{raw}`; no output for this unit"),
                        )
                        .at(Location {
                            unit: unit.file_name.clone(),
                            record: Some(record.name.clone()),
                            field: Some(field.name.clone()),
                        }),
                    );
                    return None;
                }
            }
        }
    }

    let mut ctx = GenerationContext::new(&unit.file_name);
    let mut impls = Vec::new();
    let mut generated = Vec::new();
    for record in records {
        let checkpoint = ctx.clone();
        let (result, warnings) = {
            let mut em = Emitter::new(&mut ctx, package, record, resolver, options);
            let result = emit_record(&mut em);
            (result, em.warnings)
        };
        diagnostics.extend(warnings);
        match result {
            Ok(code) => {
                impls.push(code);
                generated.push(record.name.clone());
            }
            Err(diagnostic) => {
                warn!(
                    record = %record.name,
                    code = diagnostic.code.code_str(),
                    "record validation not generated"
                );
                diagnostics.push(diagnostic);
                ctx = checkpoint;
            }
        }
    }
    if impls.is_empty() {
        return None;
    }

    let code = render(&unit.file_name, &ctx, &impls);
    if let Err(diagnostic) = check_rendered(&unit.file_name, &code) {
        diagnostics.push(diagnostic);
        return None;
    }
    let stem = unit.file_name.strip_suffix(".rs").unwrap_or(&unit.file_name);
    Some(UnitOutput {
        source_file: unit.file_name.clone(),
        output_file: format!("{stem}{}.rs", options.suffix),
        source_path: unit.path.clone(),
        records: generated,
        code,
    })
}

/// Rendered output must parse as a Rust file; a unit that does not is withheld.
fn check_rendered(unit: &str, code: &str) -> Result<(), Diagnostic> {
    syn::parse_file(code).map(|_| ()).map_err(|err| {
        Diagnostic::error(
            DiagnosticCode::TV0901InternalBug,
            DiagnosticCode::TV0901InternalBug.default_phase(),
            format!("generated code does not parse: {err}"),
        )
        .at(Location {
            unit: unit.to_string(),
            record: None,
            field: None,
        })
    })
}

fn render(source_file: &str, ctx: &GenerationContext, impls: &[TokenStream]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "// @generated by tagval from {source_file}. Do not edit.\n\n"
    ));
    let prelude = quote! {
        #[allow(unused_imports)]
        use super::*;
    };
    out.push_str(&prelude.to_string());
    out.push('\n');
    for item in ctx.import_items() {
        out.push_str(&item.to_string());
        out.push('\n');
    }
    for item in ctx.support_items() {
        out.push('\n');
        out.push_str(&item.to_string());
        out.push('\n');
    }
    for item in ctx.artifact_items() {
        out.push('\n');
        out.push_str(&item.to_string());
        out.push('\n');
    }
    for item in impls {
        out.push('\n');
        out.push_str(&item.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Phase;

    #[test]
    fn unparsable_output_is_an_internal_bug() {
        let err = check_rendered("user.rs", "impl User { pub fn validate(&self) {").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::TV0901InternalBug);
        assert_eq!(err.phase, Phase::Internal);
        assert_eq!(err.location.map(|l| l.unit).as_deref(), Some("user.rs"));
    }

    #[test]
    fn rendered_context_parses() {
        let mut ctx = GenerationContext::new("user.rs");
        ctx.add_import("crate::checks");
        ctx.chained_error();
        ctx.pattern("SLUG_RE", "^[a-z]+$");
        let code = render("user.rs", &ctx, &[quote!(impl User {})]);
        check_rendered("user.rs", &code).unwrap();
    }
}
