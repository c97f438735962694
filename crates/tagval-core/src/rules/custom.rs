use proc_macro2::TokenStream;
use quote::quote;

use super::{fail_caused_by, Message, Subject};
use crate::emit::Emitter;
use crate::model::StructValidator;
use crate::util::{make_ident, path_tokens};

fn callee(em: &mut Emitter<'_>, module: Option<&str>, function: &str) -> TokenStream {
    match module {
        Some(module) => {
            let module = em.ctx.add_import(module);
            path_tokens(&format!("{module}::{function}"))
        }
        None => {
            let function = make_ident(function);
            quote!(#function)
        }
    }
}

/// `path:function` on a field: `function(&value)` must return `Ok(())`. Its error
/// becomes the source of the reported one.
pub(crate) fn emit_field_validator(
    em: &mut Emitter<'_>,
    module: &str,
    function: &str,
    subject: &Subject,
) -> TokenStream {
    let callee = callee(em, Some(module), function);
    let err = em.ctx.fresh("err");
    let error_type = em.ctx.chained_error();
    let expr = &subject.expr;
    let fail = subject.fail_caused_by(
        &error_type,
        Message::new(" custom validation failed: ").display(quote!(#err)),
        &err,
    );
    quote! {
        if let ::core::result::Result::Err(#err) = #callee(&#expr) {
            #fail
        }
    }
}

/// Record-level validator: `function(self)` runs after every field check passed.
pub(crate) fn emit_struct_validator(
    em: &mut Emitter<'_>,
    validator: &StructValidator,
) -> TokenStream {
    let callee = callee(em, validator.module.as_deref(), &validator.function);
    let err = em.ctx.fresh("err");
    let error_type = em.ctx.chained_error();
    let fail = fail_caused_by(
        &error_type,
        Message::new(format!("{} validation failed: ", em.record.name)).display(quote!(#err)),
        &err,
    );
    quote! {
        if let ::core::result::Result::Err(#err) = #callee(self) {
            #fail
        }
    }
}
