use proc_macro2::TokenStream;
use quote::quote;

use super::{as_str, place, through_pointer, Applicability, Message, Subject};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::emit::Emitter;
use crate::types::{Kind, TypeDescriptor};
use crate::util::{is_ident, make_ident};

/// `unique` only looks at sequences; maps and scalars are left alone.
pub(crate) fn check(ty: &TypeDescriptor) -> Applicability {
    let inner = ty.through_pointer();
    if inner.kind.is_sequence() {
        Applicability::Applies
    } else {
        Applicability::NoOp(format!(
            "unique only inspects sequences, found a {}",
            inner.kind.describe()
        ))
    }
}

pub(crate) fn emit(
    em: &mut Emitter<'_>,
    field: Option<&str>,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    if let Some(field) = field {
        if !is_ident(field) {
            return Err(em.error(
                DiagnosticCode::TV0101InvalidParameter,
                format!("`unique={field}` does not name a field"),
            ));
        }
    }
    through_pointer(em, subject, |em, subject| {
        emit_sequence(em, field, subject)
    })
}

fn emit_sequence(
    em: &mut Emitter<'_>,
    field: Option<&str>,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    let element = subject.ty.element();
    let seen = em.ctx.fresh("seen");
    let index = em.ctx.fresh("index");
    let item = em.ctx.fresh("item");
    let expr = &subject.expr;

    let (unwrap, key, what) = match field {
        Some(name) => {
            let member = make_ident(name);
            let unwrap = if element.kind == Kind::Pointer {
                quote! {
                    let ::core::option::Option::Some(#item) = #item else {
                        continue;
                    };
                }
            } else {
                TokenStream::new()
            };
            (unwrap, quote!(&#item.#member), name.to_string())
        }
        None => {
            let key = match element.kind {
                Kind::String => as_str(&place(quote!((*#item)), &element)),
                kind if kind.is_numeric() || kind == Kind::Bool => {
                    quote!(::std::string::ToString::to_string(#item))
                }
                _ => quote!(::std::format!("{:?}", #item)),
            };
            (TokenStream::new(), key, "value".to_string())
        }
    };

    let fail = subject.fail_with(
        Message::new(format!(" has duplicate {what} at index ")).display(quote!(#index)),
    );
    Ok(quote! {
        {
            let mut #seen = ::std::collections::HashSet::with_capacity(#expr.len());
            for (#index, #item) in #expr.iter().enumerate() {
                #unwrap
                if !#seen.insert(#key) {
                    #fail
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sequences_apply() {
        let list = TypeDescriptor::wrapping(Kind::Slice, TypeDescriptor::basic(Kind::String));
        assert_eq!(check(&list), Applicability::Applies);
        let opt_list = TypeDescriptor::wrapping(Kind::Pointer, list);
        assert_eq!(check(&opt_list), Applicability::Applies);
        let map = TypeDescriptor::wrapping(Kind::Map, TypeDescriptor::basic(Kind::String));
        assert!(matches!(check(&map), Applicability::NoOp(_)));
        assert!(matches!(
            check(&TypeDescriptor::basic(Kind::String)),
            Applicability::NoOp(_)
        ));
    }
}
