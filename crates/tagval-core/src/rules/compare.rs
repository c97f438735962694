use proc_macro2::TokenStream;
use quote::quote;

use super::{place, Subject};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::emit::Emitter;
use crate::types::Kind;
use crate::util::{display_name, is_ident, make_ident};

/// `eqfield=Other`, with `None` handled on either side:
///
/// | self    | other   | passes when                  |
/// |---------|---------|------------------------------|
/// | Option  | Option  | both `None`, or both equal   |
/// | Option  | value   | `Some` and equal             |
/// | value   | Option  | `Some` and equal             |
/// | value   | value   | equal                        |
pub(crate) fn emit_eqfield(
    em: &mut Emitter<'_>,
    other: &str,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    if !is_ident(other) {
        return Err(em.error(
            DiagnosticCode::TV0101InvalidParameter,
            format!("`eqfield={other}` does not name a field"),
        ));
    }
    let other_ty = match em.record.field(other) {
        Some(field) => em.field_type(field),
        None => {
            em.warn(
                DiagnosticCode::TV0300UnresolvedSibling,
                format!(
                    "sibling field `{other}` not found on `{}`; assuming it has the same type",
                    em.record.name
                ),
            );
            subject.ty.clone()
        }
    };

    let this = &subject.expr;
    let member = make_ident(other);
    let that = place(quote!(self.#member), &other_ty);
    let mismatch = subject.fail(&format!("must equal field {}", display_name(other)));
    let left = em.ctx.fresh("left");
    let right = em.ctx.fresh("right");
    let left_value = place(quote!((*#left)), &subject.ty.element());
    let right_value = place(quote!((*#right)), &other_ty.element());

    let code = match (subject.ty.kind == Kind::Pointer, other_ty.kind == Kind::Pointer) {
        (true, true) => quote! {
            match (&#this, &#that) {
                (::core::option::Option::Some(#left), ::core::option::Option::Some(#right)) => {
                    if #left_value != #right_value {
                        #mismatch
                    }
                }
                (::core::option::Option::None, ::core::option::Option::None) => {}
                _ => {
                    #mismatch
                }
            }
        },
        (true, false) => {
            let missing = subject.fail(&format!(
                "must equal field {} (pointer is nil)",
                display_name(other)
            ));
            quote! {
                match &#this {
                    ::core::option::Option::Some(#left) => {
                        if #left_value != #that {
                            #mismatch
                        }
                    }
                    ::core::option::Option::None => {
                        #missing
                    }
                }
            }
        }
        (false, true) => {
            let missing = subject.fail(&format!(
                "must equal field {} (comparison field is nil)",
                display_name(other)
            ));
            quote! {
                match &#that {
                    ::core::option::Option::Some(#right) => {
                        if #this != #right_value {
                            #mismatch
                        }
                    }
                    ::core::option::Option::None => {
                        #missing
                    }
                }
            }
        }
        (false, false) => quote! {
            if #this != #that {
                #mismatch
            }
        },
    };
    Ok(code)
}
