use proc_macro2::TokenStream;
use quote::quote;
use tracing::debug;

use super::{Applicability, Subject};
use crate::diagnostics::DiagnosticCode;
use crate::emit::Emitter;
use crate::types::{Kind, TypeDescriptor};
use crate::util::{display_name, is_ident};

/// Expression that is true when the subject holds its empty value, if the type has one.
pub(crate) fn emptiness(subject: &Subject) -> Option<TokenStream> {
    let expr = &subject.expr;
    match subject.ty.kind {
        Kind::Pointer => Some(quote!(#expr.is_none())),
        Kind::String | Kind::Slice | Kind::Array | Kind::Map => Some(quote!(#expr.is_empty())),
        Kind::Int(_) | Kind::Uint(_) => Some(quote!(#expr == 0)),
        Kind::Float32 | Kind::Float64 => Some(quote!(#expr == 0.0)),
        Kind::Bool
        | Kind::NumericWrapper
        | Kind::Record
        | Kind::Interface
        | Kind::Unknown => None,
    }
}

fn has_emptiness(ty: &TypeDescriptor) -> bool {
    !matches!(
        ty.kind,
        Kind::Bool | Kind::NumericWrapper | Kind::Record | Kind::Interface | Kind::Unknown
    )
}

pub(crate) fn check_required(ty: &TypeDescriptor) -> Applicability {
    if has_emptiness(ty) {
        Applicability::Applies
    } else {
        Applicability::NoOp(format!("a {} has no empty value", ty.kind.describe()))
    }
}

pub(crate) fn check_required_without(ty: &TypeDescriptor) -> Applicability {
    check_required(ty)
}

pub(crate) fn emit_required(subject: &Subject) -> TokenStream {
    let Some(empty) = emptiness(subject) else {
        return TokenStream::new();
    };
    let fail = subject.fail("is required");
    quote! {
        if #empty {
            #fail
        }
    }
}

/// Required only when the sibling `other` is empty. A sibling that cannot be found is
/// assumed to share the subject's type.
pub(crate) fn emit_required_without(
    em: &mut Emitter<'_>,
    subject: &Subject,
    other: &str,
) -> TokenStream {
    if !is_ident(other) {
        em.warn(
            DiagnosticCode::TV0300UnresolvedSibling,
            format!("`required_without={other}` does not name a field"),
        );
        return TokenStream::new();
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
    let sibling = Subject::field(other, other_ty);
    let (Some(other_empty), Some(self_empty)) = (emptiness(&sibling), emptiness(subject)) else {
        debug!(
            record = %em.record.name,
            other,
            other_kind = ?sibling.ty.kind,
            "required_without has no emptiness test; skipped"
        );
        return TokenStream::new();
    };
    let fail = subject.fail(&format!(
        "is required when {} is not provided",
        display_name(other)
    ));
    quote! {
        if #other_empty && #self_empty {
            #fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::squash;
    use crate::types::IntWidth;

    #[test]
    fn emptiness_by_kind() {
        let cases = [
            (TypeDescriptor::basic(Kind::String), "self.name.is_empty()"),
            (
                TypeDescriptor::wrapping(Kind::Pointer, TypeDescriptor::basic(Kind::String)),
                "self.name.is_none()",
            ),
            (TypeDescriptor::basic(Kind::Uint(IntWidth::W32)), "self.name==0"),
            (TypeDescriptor::basic(Kind::Float64), "self.name==0.0"),
            (
                TypeDescriptor::wrapping(Kind::Map, TypeDescriptor::basic(Kind::Bool)),
                "self.name.is_empty()",
            ),
        ];
        for (ty, want) in cases {
            let subject = Subject::field("name", ty);
            let got = emptiness(&subject).expect("emptiness");
            assert_eq!(squash(&got.to_string()), want);
        }
        let flag = Subject::field("flag", TypeDescriptor::basic(Kind::Bool));
        assert!(emptiness(&flag).is_none());
    }

    #[test]
    fn required_is_noop_for_bool_and_records() {
        assert!(matches!(
            check_required(&TypeDescriptor::basic(Kind::Bool)),
            Applicability::NoOp(_)
        ));
        assert!(matches!(
            check_required(&TypeDescriptor::record("Item", None)),
            Applicability::NoOp(_)
        ));
        assert_eq!(
            check_required(&TypeDescriptor::basic(Kind::Int(IntWidth::W8))),
            Applicability::Applies
        );
    }

    #[test]
    fn required_emits_message() {
        let subject = Subject::field("name", TypeDescriptor::basic(Kind::String));
        let code = squash(&emit_required(&subject).to_string());
        assert!(code.starts_with("ifself.name.is_empty(){"), "{code}");
        assert!(code.contains(r#""fieldnameisrequired""#), "{code}");
    }
}
