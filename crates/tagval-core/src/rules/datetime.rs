use proc_macro2::TokenStream;
use quote::quote;

use super::{as_str, through_pointer, Applicability, Message, Subject};
use crate::diagnostics::Diagnostic;
use crate::emit::Emitter;
use crate::types::{Kind, TypeDescriptor};

pub(crate) fn check(ty: &TypeDescriptor) -> Applicability {
    let inner = ty.through_pointer();
    if inner.kind == Kind::String {
        Applicability::Applies
    } else {
        Applicability::Unsupported(format!(
            "datetime needs a string, found a {}",
            inner.kind.describe()
        ))
    }
}

/// Parses the value with `chrono`'s strftime parser, then builds the date and time the
/// format describes so calendar-impossible values such as `2023-02-30` fail too. A
/// format without date (or without time) fields only checks the part it has.
pub(crate) fn emit(
    em: &mut Emitter<'_>,
    format: &str,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    through_pointer(em, subject, |em, subject| {
        let parsed = em.ctx.fresh("parsed");
        let err = em.ctx.fresh("err");
        let value = as_str(&subject.expr);
        let fail = subject.fail_with(
            Message::new(format!(" must be a valid datetime in format {format}: "))
                .display(quote!(#err)),
        );
        Ok(quote! {
            {
                let mut #parsed = ::chrono::format::Parsed::new();
                let outcome = ::chrono::format::parse(
                    &mut #parsed,
                    #value,
                    ::chrono::format::StrftimeItems::new(#format),
                )
                .and_then(|()| {
                    let present = |err: ::chrono::format::ParseError| {
                        if err.kind() == ::chrono::format::ParseErrorKind::NotEnough {
                            ::core::result::Result::Ok(())
                        } else {
                            ::core::result::Result::Err(err)
                        }
                    };
                    #parsed
                        .to_naive_date()
                        .map(|_| ())
                        .or_else(present)?;
                    #parsed.to_naive_time().map(|_| ()).or_else(present)
                });
                if let ::core::result::Result::Err(#err) = outcome {
                    #fail
                }
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_to_strings_only() {
        assert_eq!(
            check(&TypeDescriptor::wrapping(
                Kind::Pointer,
                TypeDescriptor::basic(Kind::String)
            )),
            Applicability::Applies
        );
        assert!(matches!(
            check(&TypeDescriptor::basic(Kind::Int(crate::types::IntWidth::W64))),
            Applicability::Unsupported(_)
        ));
    }
}
