//! String shape rules: `regexp`, `uuid`, `email` and the ISO code tables.

use proc_macro2::TokenStream;
use quote::quote;

use super::dive::for_each_element;
use super::tables::{ISO3166_ALPHA2, ISO4217};
use super::{as_str, through_pointer, Applicability, Subject};
use crate::diagnostics::Diagnostic;
use crate::emit::Emitter;
use crate::types::{Kind, TypeDescriptor};
use crate::util::path_tokens;

pub(crate) const UUID_PATTERN: &str =
    "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$";
pub(crate) const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn is_string(ty: &TypeDescriptor) -> bool {
    ty.through_pointer().kind == Kind::String
}

/// `regexp` silently ignores non-string fields.
pub(crate) fn check_regexp(ty: &TypeDescriptor) -> Applicability {
    if is_string(ty) {
        Applicability::Applies
    } else {
        Applicability::NoOp(format!(
            "regexp only inspects strings, found a {}",
            ty.kind.describe()
        ))
    }
}

pub(crate) fn check_string(rule: &str, ty: &TypeDescriptor) -> Applicability {
    if is_string(ty) {
        Applicability::Applies
    } else {
        Applicability::Unsupported(format!(
            "`{rule}` needs a string, found a {}",
            ty.through_pointer().kind.describe()
        ))
    }
}

pub(crate) fn check_email(ty: &TypeDescriptor) -> Applicability {
    let ty = ty.through_pointer();
    if ty.kind.is_sequence() && is_string(&ty.element()) {
        return Applicability::Applies;
    }
    check_string("email", ty)
}

pub(crate) fn emit_regexp(
    em: &mut Emitter<'_>,
    module: &str,
    name: &str,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    let module = em.ctx.add_import(module);
    let pattern = path_tokens(&format!("{module}::{name}"));
    through_pointer(em, subject, |_, subject| {
        let value = as_str(&subject.expr);
        let fail = subject.fail("does not match required pattern");
        Ok(quote! {
            if !#pattern.is_match(#value) {
                #fail
            }
        })
    })
}

pub(crate) fn emit_uuid(em: &mut Emitter<'_>, subject: &Subject) -> Result<TokenStream, Diagnostic> {
    let symbol = em.ctx.pattern("UUID_RE", UUID_PATTERN);
    through_pointer(em, subject, |_, subject| {
        let value = as_str(&subject.expr);
        let fail = subject.fail("must be a valid UUID");
        Ok(quote! {
            if !#symbol.is_match(#value) {
                #fail
            }
        })
    })
}

pub(crate) fn emit_email(em: &mut Emitter<'_>, subject: &Subject) -> Result<TokenStream, Diagnostic> {
    let symbol = em.ctx.pattern("EMAIL_RE", EMAIL_PATTERN);
    through_pointer(em, subject, |em, subject| {
        if subject.ty.kind.is_sequence() {
            return for_each_element(em, subject, |em, element| {
                through_pointer(em, element, |_, element| Ok(email_check(&symbol, element)))
            });
        }
        Ok(email_check(&symbol, subject))
    })
}

fn email_check(symbol: &proc_macro2::Ident, subject: &Subject) -> TokenStream {
    let value = as_str(&subject.expr);
    let fail = subject.fail("must be a valid email address");
    quote! {
        if !#symbol.is_match(#value) {
            #fail
        }
    }
}

pub(crate) fn emit_iso4217(em: &mut Emitter<'_>, subject: &Subject) -> Result<TokenStream, Diagnostic> {
    let table = em.ctx.code_table("ISO4217", ISO4217);
    table_check(em, subject, table, "must be a valid ISO 4217 currency code")
}

pub(crate) fn emit_iso3166(em: &mut Emitter<'_>, subject: &Subject) -> Result<TokenStream, Diagnostic> {
    let table = em.ctx.code_table("ISO3166_ALPHA2", ISO3166_ALPHA2);
    table_check(
        em,
        subject,
        table,
        "must be a valid ISO 3166-1 alpha-2 country code",
    )
}

fn table_check(
    em: &mut Emitter<'_>,
    subject: &Subject,
    table: proc_macro2::Ident,
    message: &str,
) -> Result<TokenStream, Diagnostic> {
    through_pointer(em, subject, |_, subject| {
        let value = as_str(&subject.expr);
        let fail = subject.fail(message);
        Ok(quote! {
            if #table.binary_search(&#value).is_err() {
                #fail
            }
        })
    })
}
