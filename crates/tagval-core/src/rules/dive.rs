//! `dive`: per-element validation of collections and nested records.
//!
//! Elements that are records (or unresolved types, assumed to be records) get
//! their own `validate()` called, with `None` elements skipped. `unique` in the
//! element rules then applies to the whole collection and the remaining rules
//! to each element. Primitive elements run the element rules in a loop.

use proc_macro2::TokenStream;
use quote::quote;
use tracing::debug;

use super::{place, through_pointer, Applicability, Message, Subject};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::directive::ParsedRule;
use crate::emit::{emit_rules, Emitter};
use crate::types::{Kind, TypeDescriptor};

pub(crate) fn check(ty: &TypeDescriptor) -> Applicability {
    match ty.kind {
        Kind::Pointer => check(&ty.element()),
        Kind::Slice | Kind::Array | Kind::Map | Kind::Record | Kind::Unknown => {
            Applicability::Applies
        }
        kind => Applicability::Unsupported(format!(
            "dive needs a collection, a record or an Option of either, found a {}",
            kind.describe()
        )),
    }
}

pub(crate) fn emit(
    em: &mut Emitter<'_>,
    elements: &[ParsedRule],
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    through_pointer(em, subject, |em, subject| match subject.ty.kind {
        kind if kind.is_collection() => emit_collection(em, elements, subject),
        _ => {
            let mut code = call_entry(em, subject);
            code.extend(emit_rules(em, subject, elements)?);
            Ok(code)
        }
    })
}

fn emit_collection(
    em: &mut Emitter<'_>,
    elements: &[ParsedRule],
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    let element = subject.ty.element();
    if !element.through_pointer().kind.is_record_like() {
        return for_each_element(em, subject, |em, element| {
            emit_rules(em, element, elements)
        });
    }

    let (collection_rules, element_rules): (Vec<ParsedRule>, Vec<ParsedRule>) = elements
        .iter()
        .cloned()
        .partition(|r| matches!(r, ParsedRule::Unique { .. }));

    let mut code = for_each_element(em, subject, |em, element| {
        let mut body = through_pointer(em, element, |em, record| Ok(call_entry(em, record)))?;
        body.extend(emit_rules(em, element, &element_rules)?);
        Ok(body)
    })?;
    code.extend(emit_rules(em, subject, &collection_rules)?);
    Ok(code)
}

/// Loops over a sequence or map, running `body` on each element subject.
///
/// Sequence elements are labelled `field[i]`, map values `field["key"]`.
pub(crate) fn for_each_element<F>(
    em: &mut Emitter<'_>,
    subject: &Subject,
    body: F,
) -> Result<TokenStream, Diagnostic>
where
    F: FnOnce(&mut Emitter<'_>, &Subject) -> Result<TokenStream, Diagnostic>,
{
    let item = em.ctx.fresh("item");
    let expr = &subject.expr;
    let element_ty = subject.ty.element();

    if subject.ty.kind == Kind::Map {
        let key = em.ctx.fresh("key");
        let element = Subject {
            expr: place(quote!((*#item)), &element_ty),
            label: subject
                .label
                .clone()
                .append(Message::new("[").debug(quote!(#key)).text("]")),
            ty: element_ty,
        };
        let code = body(em, &element)?;
        if code.is_empty() {
            return Ok(code);
        }
        return Ok(quote! {
            for (#key, #item) in #expr.iter() {
                #code
            }
        });
    }

    let index = em.ctx.fresh("index");
    let element = Subject {
        expr: place(quote!((*#item)), &element_ty),
        label: subject
            .label
            .clone()
            .append(Message::new("[").display(quote!(#index)).text("]")),
        ty: element_ty,
    };
    let code = body(em, &element)?;
    if code.is_empty() {
        return Ok(code);
    }
    Ok(quote! {
        for (#index, #item) in #expr.iter().enumerate() {
            #code
        }
    })
}

/// `subject.validate()`, unless the target has no generated entry point.
fn call_entry(em: &mut Emitter<'_>, subject: &Subject) -> TokenStream {
    let target = &subject.ty;
    if let Some(package) = &target.package {
        debug!(
            package = %package,
            name = target.name.as_deref().unwrap_or("?"),
            "dive target is external; not called"
        );
        return TokenStream::new();
    }
    if let Some(name) = &target.name {
        let skipped = em
            .package
            .record_near(em.record.unit, name)
            .is_some_and(|r| r.skip || em.package.unit(r.unit).skip);
        if skipped {
            em.warn(
                DiagnosticCode::TV0401SkippedDiveTarget,
                format!("dive target `{name}` is marked skip; its elements are not validated"),
            );
            return TokenStream::new();
        }
    }
    let err = em.ctx.fresh("err");
    let error_type = em.ctx.chained_error();
    let expr = &subject.expr;
    let fail = subject.fail_caused_by(
        &error_type,
        Message::new(" validation failed: ").display(quote!(#err)),
        &err,
    );
    quote! {
        if let ::core::result::Result::Err(#err) = #expr.validate() {
            #fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dive_targets_by_kind() {
        let list = TypeDescriptor::wrapping(Kind::Slice, TypeDescriptor::record("Item", None));
        assert_eq!(check(&list), Applicability::Applies);
        assert_eq!(
            check(&TypeDescriptor::wrapping(Kind::Pointer, list)),
            Applicability::Applies
        );
        assert_eq!(check(&TypeDescriptor::unknown()), Applicability::Applies);
        assert!(matches!(
            check(&TypeDescriptor::basic(Kind::String)),
            Applicability::Unsupported(_)
        ));
        assert!(matches!(
            check(&TypeDescriptor::wrapping(
                Kind::Pointer,
                TypeDescriptor::basic(Kind::Float64)
            )),
            Applicability::Unsupported(_)
        ));
    }
}
