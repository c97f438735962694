//! `min`, `max`, `gt`, `lt`, `gte` and `lte`.
//!
//! On numbers these compare the value. `min` and `max` also bound the length of
//! strings (in chars) and collections (in elements).

use proc_macro2::{Literal, TokenStream};
use quote::{quote, ToTokens};

use super::{through_pointer, Applicability, Subject};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::emit::Emitter;
use crate::types::{Kind, TypeDescriptor};
use crate::util::{is_path, make_ident, path_tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Min,
    Max,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Bound {
    fn name(self) -> &'static str {
        match self {
            Bound::Min => "min",
            Bound::Max => "max",
            Bound::Gt => "gt",
            Bound::Lt => "lt",
            Bound::Gte => "gte",
            Bound::Lte => "lte",
        }
    }

    /// Operator that is true when the bound is violated.
    fn violated(self) -> TokenStream {
        match self {
            Bound::Min | Bound::Gte => quote!(<),
            Bound::Max | Bound::Lte => quote!(>),
            Bound::Gt => quote!(<=),
            Bound::Lt => quote!(>=),
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Bound::Min | Bound::Gte => "at least",
            Bound::Max | Bound::Lte => "at most",
            Bound::Gt => "greater than",
            Bound::Lt => "less than",
        }
    }

    fn bounds_length(self) -> bool {
        matches!(self, Bound::Min | Bound::Max)
    }
}

pub(crate) fn check(bound: Bound, ty: &TypeDescriptor) -> Applicability {
    match ty.kind {
        Kind::Pointer => check(bound, &ty.element()),
        Kind::String | Kind::Slice | Kind::Array | Kind::Map if bound.bounds_length() => {
            Applicability::Applies
        }
        kind if kind.is_numeric() || kind == Kind::NumericWrapper => Applicability::Applies,
        kind => Applicability::Unsupported(format!(
            "`{}` needs a number{}, found a {}",
            bound.name(),
            if bound.bounds_length() {
                ", string or collection"
            } else {
                ""
            },
            kind.describe()
        )),
    }
}

pub(crate) fn emit(
    em: &mut Emitter<'_>,
    bound: Bound,
    param: &str,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    through_pointer(em, subject, |em, subject| {
        emit_direct(em, bound, param, subject)
    })
}

fn emit_direct(
    em: &mut Emitter<'_>,
    bound: Bound,
    param: &str,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    let expr = &subject.expr;
    let op = bound.violated();
    let invalid = |em: &Emitter<'_>| {
        em.error(
            DiagnosticCode::TV0101InvalidParameter,
            format!(
                "`{}={param}` is not a valid bound for a {}",
                bound.name(),
                subject.ty.kind.describe()
            ),
        )
    };

    match subject.ty.kind {
        Kind::String => {
            let n = length_literal(param).ok_or_else(|| invalid(&*em))?;
            let fail = subject.fail(&format!("must be {} {param} characters", bound.phrase()));
            Ok(quote! {
                if #expr.chars().count() #op #n {
                    #fail
                }
            })
        }
        Kind::Slice | Kind::Array | Kind::Map => {
            let n = length_literal(param).ok_or_else(|| invalid(&*em))?;
            let verb = if bound == Bound::Min {
                "at least"
            } else {
                "at most"
            };
            let fail = subject.fail(&format!("must have {verb} {param} elements"));
            Ok(quote! {
                if #expr.len() #op #n {
                    #fail
                }
            })
        }
        Kind::NumericWrapper => {
            let n = numeric_literal(param, Kind::Float64).ok_or_else(|| invalid(&*em))?;
            let to_number = subject.ty.to_number.as_deref().unwrap_or("as_f64");
            let to_number = make_ident(to_number);
            let number = em.ctx.fresh("number");
            let not_number = subject.fail("must be a valid number");
            let fail = subject.fail(&format!("must be {} {param}", bound.phrase()));
            Ok(quote! {
                match #expr.#to_number() {
                    ::core::option::Option::Some(#number) => {
                        if #number #op #n {
                            #fail
                        }
                    }
                    ::core::option::Option::None => {
                        #not_number
                    }
                }
            })
        }
        kind if kind.is_numeric() => {
            let n = numeric_literal(param, kind).ok_or_else(|| invalid(&*em))?;
            let fail = subject.fail(&format!("must be {} {param}", bound.phrase()));
            Ok(quote! {
                if #expr #op #n {
                    #fail
                }
            })
        }
        kind => Err(em.error(
            DiagnosticCode::TV0100UnsupportedRuleForType,
            format!("`{}` cannot bound a {}", bound.name(), kind.describe()),
        )),
    }
}

/// A literal suited to `kind` and within its range, or a constant path.
pub(crate) fn numeric_literal(param: &str, kind: Kind) -> Option<TokenStream> {
    let param = param.trim();
    if is_path(param) {
        return Some(path_tokens(param));
    }
    match kind {
        Kind::Float32 | Kind::Float64 | Kind::NumericWrapper => param
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .filter(|v| kind != Kind::Float32 || v.abs() <= f64::from(f32::MAX))
            .map(|v| Literal::f64_unsuffixed(v).into_token_stream()),
        Kind::Uint(width) => param
            .parse::<u128>()
            .ok()
            .filter(|v| *v <= u128::MAX >> (128 - width.bits()))
            .map(|v| Literal::u128_unsuffixed(v).into_token_stream()),
        Kind::Int(width) => {
            let max = i128::MAX >> (128 - width.bits());
            param
                .parse::<i128>()
                .ok()
                .filter(|v| (-max - 1..=max).contains(v))
                .map(|v| Literal::i128_unsuffixed(v).into_token_stream())
        }
        _ => None,
    }
}

fn length_literal(param: &str) -> Option<TokenStream> {
    let param = param.trim();
    if is_path(param) {
        return Some(path_tokens(param));
    }
    param
        .parse::<usize>()
        .ok()
        .map(|v| Literal::usize_unsuffixed(v).into_token_stream())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntWidth;

    #[test]
    fn literals_follow_kind() {
        let lit = |p: &str, k: Kind| numeric_literal(p, k).map(|t| t.to_string());
        assert_eq!(lit("18", Kind::Int(IntWidth::W32)).as_deref(), Some("18"));
        assert_eq!(lit("-5", Kind::Int(IntWidth::W64)).as_deref(), Some("-5"));
        assert_eq!(lit("-5", Kind::Uint(IntWidth::W64)), None);
        assert_eq!(lit("1.5", Kind::Int(IntWidth::W32)), None);
        assert_eq!(lit("0", Kind::Float64).as_deref(), Some("0.0"));
        assert_eq!(lit("99.5", Kind::Float32).as_deref(), Some("99.5"));
        assert_eq!(
            lit("limits::MAX_AGE", Kind::Uint(IntWidth::W8)).map(|s| s.replace(' ', "")),
            Some("limits::MAX_AGE".to_string())
        );
        assert_eq!(lit("abc-1", Kind::Int(IntWidth::W8)), None);
    }

    #[test]
    fn literals_fit_the_width() {
        let lit = |p: &str, k: Kind| numeric_literal(p, k).map(|t| t.to_string());
        assert_eq!(lit("255", Kind::Uint(IntWidth::W8)).as_deref(), Some("255"));
        assert_eq!(lit("300", Kind::Uint(IntWidth::W8)), None);
        assert_eq!(lit("-128", Kind::Int(IntWidth::W8)).as_deref(), Some("-128"));
        assert_eq!(lit("128", Kind::Int(IntWidth::W8)), None);
        assert_eq!(lit("65536", Kind::Uint(IntWidth::W16)), None);
        assert_eq!(lit("4294967296", Kind::Int(IntWidth::W32)), None);
        assert!(lit("18446744073709551615", Kind::Uint(IntWidth::Size)).is_some());
        assert!(lit("18446744073709551616", Kind::Uint(IntWidth::W64)).is_none());
        assert!(lit("340282366920938463463374607431768211455", Kind::Uint(IntWidth::W128)).is_some());
        assert_eq!(lit("1e39", Kind::Float32), None);
        assert!(lit("1e39", Kind::Float64).is_some());
    }

    #[test]
    fn applicability() {
        let string = TypeDescriptor::basic(Kind::String);
        assert_eq!(check(Bound::Min, &string), Applicability::Applies);
        assert!(matches!(
            check(Bound::Gt, &string),
            Applicability::Unsupported(_)
        ));
        let opt_int = TypeDescriptor::wrapping(
            Kind::Pointer,
            TypeDescriptor::basic(Kind::Int(IntWidth::W32)),
        );
        assert_eq!(check(Bound::Gte, &opt_int), Applicability::Applies);
        assert!(matches!(
            check(Bound::Lte, &TypeDescriptor::basic(Kind::Bool)),
            Applicability::Unsupported(_)
        ));
        assert_eq!(
            check(Bound::Gt, &TypeDescriptor::basic(Kind::NumericWrapper)),
            Applicability::Applies
        );
    }
}
