//! Rule applicability checks and emission.
//!
//! Every rule is checked against the resolved type of its subject first. A rule
//! either applies, is a silent no-op for that type, or is unsupported, which
//! fails the whole record.

pub(crate) mod bounds;
pub(crate) mod compare;
pub(crate) mod custom;
pub(crate) mod datetime;
pub(crate) mod dive;
pub(crate) mod patterns;
pub(crate) mod presence;
pub(crate) mod tables;
pub(crate) mod unique;

use proc_macro2::{Ident, TokenStream};
use quote::quote;

use crate::diagnostics::Diagnostic;
use crate::directive::ParsedRule;
use crate::emit::Emitter;
use crate::types::{Kind, TypeDescriptor};
use crate::util::{display_name, make_ident};

use self::bounds::Bound;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Applicability {
    Applies,
    NoOp(String),
    Unsupported(String),
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Display(TokenStream),
    Debug(TokenStream),
}

/// A runtime error message: literal text interleaved with formatted values.
#[derive(Debug, Clone, Default)]
pub(crate) struct Message {
    pieces: Vec<Piece>,
}

impl Message {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Message::default().text(text)
    }

    pub(crate) fn text(mut self, text: impl Into<String>) -> Self {
        self.pieces.push(Piece::Text(text.into()));
        self
    }

    pub(crate) fn display(mut self, value: TokenStream) -> Self {
        self.pieces.push(Piece::Display(value));
        self
    }

    pub(crate) fn debug(mut self, value: TokenStream) -> Self {
        self.pieces.push(Piece::Debug(value));
        self
    }

    pub(crate) fn append(mut self, other: Message) -> Self {
        self.pieces.extend(other.pieces);
        self
    }

    /// An expression of type `&'static str` or `String`.
    pub(crate) fn to_expr(&self) -> TokenStream {
        let has_args = self
            .pieces
            .iter()
            .any(|p| !matches!(p, Piece::Text(_)));
        if !has_args {
            let text: String = self
                .pieces
                .iter()
                .filter_map(|p| match p {
                    Piece::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect();
            return quote!(#text);
        }
        let mut format = String::new();
        let mut args = Vec::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(t) => format.push_str(&t.replace('{', "{{").replace('}', "}}")),
                Piece::Display(v) => {
                    format.push_str("{}");
                    args.push(v.clone());
                }
                Piece::Debug(v) => {
                    format.push_str("{:?}");
                    args.push(v.clone());
                }
            }
        }
        quote!(::std::format!(#format, #(#args),*))
    }
}

/// The value a rule inspects: a place expression, its message label and its type.
#[derive(Debug, Clone)]
pub(crate) struct Subject {
    pub(crate) expr: TokenStream,
    pub(crate) label: Message,
    pub(crate) ty: TypeDescriptor,
}

impl Subject {
    pub(crate) fn field(name: &str, ty: TypeDescriptor) -> Self {
        let ident = make_ident(name);
        Subject {
            expr: place(quote!(self.#ident), &ty),
            label: Message::new(format!("field {}", display_name(name))),
            ty,
        }
    }

    /// Same label, new place expression of type `ty`.
    pub(crate) fn rebind(&self, expr: TokenStream, ty: TypeDescriptor) -> Self {
        Subject {
            expr: place(expr, &ty),
            label: self.label.clone(),
            ty,
        }
    }

    /// `return Err(..)` with `"<label> <tail>"`.
    pub(crate) fn fail(&self, tail: &str) -> TokenStream {
        self.fail_with(Message::new(format!(" {tail}")))
    }

    pub(crate) fn fail_caused_by(
        &self,
        error_type: &Ident,
        tail: Message,
        cause: &Ident,
    ) -> TokenStream {
        fail_caused_by(error_type, self.label.clone().append(tail), cause)
    }

    pub(crate) fn fail_with(&self, tail: Message) -> TokenStream {
        let message = self.label.clone().append(tail).to_expr();
        quote! {
            return ::core::result::Result::Err(::core::convert::From::from(#message));
        }
    }
}

/// Fails with `label` + `tail`, keeping `cause` as the error's source. `tail` may
/// display `cause`; the message is built before `cause` moves.
pub(crate) fn fail_caused_by(error_type: &Ident, message: Message, cause: &Ident) -> TokenStream {
    let message = message.to_expr();
    quote! {
        return ::core::result::Result::Err(::core::convert::From::from(
            #error_type::new(#message, #cause),
        ));
    }
}

/// `expr` dereferenced through the references and smart pointers recorded on `ty`.
pub(crate) fn place(expr: TokenStream, ty: &TypeDescriptor) -> TokenStream {
    (0..ty.deref).fold(expr, |expr, _| quote!((*#expr)))
}

/// `&str` view of a string-like place expression.
pub(crate) fn as_str(expr: &TokenStream) -> TokenStream {
    quote!(::core::convert::AsRef::<str>::as_ref(&#expr))
}

/// Runs `body` on the value inside any `Option` layers, skipping `None`.
pub(crate) fn through_pointer<F>(
    em: &mut Emitter<'_>,
    subject: &Subject,
    body: F,
) -> Result<TokenStream, Diagnostic>
where
    F: FnOnce(&mut Emitter<'_>, &Subject) -> Result<TokenStream, Diagnostic>,
{
    if subject.ty.kind != Kind::Pointer {
        return body(em, subject);
    }
    let binding = em.ctx.fresh("value");
    let inner = subject.rebind(quote!((*#binding)), subject.ty.element());
    let inner_code = through_pointer(em, &inner, body)?;
    if inner_code.is_empty() {
        return Ok(TokenStream::new());
    }
    let expr = &subject.expr;
    Ok(quote! {
        if let ::core::option::Option::Some(#binding) = &#expr {
            #inner_code
        }
    })
}

/// Applicability of `rule` to a value of type `ty`.
pub(crate) fn check(rule: &ParsedRule, ty: &TypeDescriptor) -> Applicability {
    match rule {
        ParsedRule::Required => presence::check_required(ty),
        ParsedRule::RequiredWithout { .. } => presence::check_required_without(ty),
        ParsedRule::OmitEmpty => Applicability::NoOp("modifier".to_string()),
        ParsedRule::Min(_) => bounds::check(Bound::Min, ty),
        ParsedRule::Max(_) => bounds::check(Bound::Max, ty),
        ParsedRule::Gt(_) => bounds::check(Bound::Gt, ty),
        ParsedRule::Lt(_) => bounds::check(Bound::Lt, ty),
        ParsedRule::Gte(_) => bounds::check(Bound::Gte, ty),
        ParsedRule::Lte(_) => bounds::check(Bound::Lte, ty),
        ParsedRule::Regexp { .. } => patterns::check_regexp(ty),
        ParsedRule::Uuid | ParsedRule::Iso4217 | ParsedRule::Iso3166Alpha2 => {
            patterns::check_string(rule.name(), ty)
        }
        ParsedRule::Email => patterns::check_email(ty),
        ParsedRule::DateTime { .. } => datetime::check(ty),
        ParsedRule::Unique { .. } => unique::check(ty),
        ParsedRule::Dive { .. } => dive::check(ty),
        ParsedRule::EqField { .. } | ParsedRule::Custom { .. } => Applicability::Applies,
        ParsedRule::Unknown { raw } => Applicability::Unsupported(format!("`{raw}` is not a rule")),
    }
}

/// Emits the check for a rule already known to apply.
pub(crate) fn emit(
    em: &mut Emitter<'_>,
    rule: &ParsedRule,
    subject: &Subject,
) -> Result<TokenStream, Diagnostic> {
    match rule {
        ParsedRule::Required => Ok(presence::emit_required(subject)),
        ParsedRule::RequiredWithout { other } => {
            Ok(presence::emit_required_without(em, subject, other))
        }
        ParsedRule::Min(p) => bounds::emit(em, Bound::Min, p, subject),
        ParsedRule::Max(p) => bounds::emit(em, Bound::Max, p, subject),
        ParsedRule::Gt(p) => bounds::emit(em, Bound::Gt, p, subject),
        ParsedRule::Lt(p) => bounds::emit(em, Bound::Lt, p, subject),
        ParsedRule::Gte(p) => bounds::emit(em, Bound::Gte, p, subject),
        ParsedRule::Lte(p) => bounds::emit(em, Bound::Lte, p, subject),
        ParsedRule::Regexp { module, name } => patterns::emit_regexp(em, module, name, subject),
        ParsedRule::Uuid => patterns::emit_uuid(em, subject),
        ParsedRule::Email => patterns::emit_email(em, subject),
        ParsedRule::Iso4217 => patterns::emit_iso4217(em, subject),
        ParsedRule::Iso3166Alpha2 => patterns::emit_iso3166(em, subject),
        ParsedRule::DateTime { format } => datetime::emit(em, format, subject),
        ParsedRule::Unique { field } => unique::emit(em, field.as_deref(), subject),
        ParsedRule::Dive { elements } => dive::emit(em, elements, subject),
        ParsedRule::EqField { other } => compare::emit_eqfield(em, other, subject),
        ParsedRule::Custom { module, function } => {
            Ok(custom::emit_field_validator(em, module, function, subject))
        }
        ParsedRule::OmitEmpty | ParsedRule::Unknown { .. } => Ok(TokenStream::new()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    /// Generated code with all whitespace removed, for layout-independent assertions.
    pub(crate) fn squash(code: &str) -> String {
        code.chars().filter(|c| !c.is_whitespace()).collect()
    }
}
