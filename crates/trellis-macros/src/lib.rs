use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, FnArg, Ident, ItemFn, LitStr, Pat, PatType};

/// Turns a render function into a component factory.
///
/// The first parameter receives the `&mut RenderCx` of the render call, the
/// remaining ones become the factory's parameters and are cloned into every
/// render. The factory returns a `Ui` tagged with a component type issued
/// once for the function.
///
/// `#[component(stateful)]` marks a component that must request its state
/// exactly once per render.
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_tokens = TokenStream2::from(attr);
    let mut stateful = false;
    if !attr_tokens.is_empty() {
        match syn::parse2::<Ident>(attr_tokens) {
            Ok(ident) if ident == "stateful" => stateful = true,
            Ok(ident) if ident == "stateless" => stateful = false,
            Ok(other) => {
                return syn::Error::new_spanned(other, "unsupported component attribute")
                    .to_compile_error()
                    .into();
            }
            Err(err) => return err.to_compile_error().into(),
        }
    }

    let func = parse_macro_input!(item as ItemFn);
    match expand(func, stateful) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(func: ItemFn, stateful: bool) -> syn::Result<TokenStream2> {
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.generics,
            "components cannot be generic",
        ));
    }

    let mut inputs = func.sig.inputs.iter();
    let cx_param = match inputs.next() {
        Some(FnArg::Typed(param)) => param.clone(),
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new_spanned(
                receiver,
                "components cannot take `self`",
            ));
        }
        None => {
            return Err(syn::Error::new_spanned(
                &func.sig,
                "components take a `&mut RenderCx` as their first parameter",
            ));
        }
    };

    let mut render_params = vec![cx_param];
    let mut outer_params = Vec::new();
    let mut arg_idents = Vec::new();
    for (index, arg) in inputs.enumerate() {
        let FnArg::Typed(PatType { pat, ty, .. }) = arg else {
            return Err(syn::Error::new_spanned(arg, "unexpected receiver"));
        };
        if !matches!(**pat, Pat::Ident(_)) {
            return Err(syn::Error::new_spanned(
                pat,
                "component parameters must be plain identifiers",
            ));
        }
        let ident = Ident::new(&format!("__arg{index}"), Span::call_site());
        outer_params.push(quote! { #ident: #ty });
        arg_idents.push(ident);
        if let FnArg::Typed(param) = arg {
            render_params.push(param.clone());
        }
    }

    let attrs = &func.attrs;
    let vis = &func.vis;
    let name = &func.sig.ident;
    let name_lit = LitStr::new(&name.to_string(), name.span());
    let output = &func.sig.output;
    let block = &func.block;
    let requirement = if stateful {
        quote! { ::trellis_core::StateRequirement::Stateful }
    } else {
        quote! { ::trellis_core::StateRequirement::Stateless }
    };

    Ok(quote! {
        #(#attrs)*
        #vis fn #name(#(#outer_params),*) -> ::trellis_core::Ui {
            fn __render(#(#render_params),*) #output #block

            static COMPONENT_TYPE: ::trellis_core::ComponentTypeCell =
                ::trellis_core::ComponentTypeCell::new(#name_lit);

            ::trellis_core::Ui::from(::trellis_core::Descriptor::new(
                ::core::option::Option::Some(COMPONENT_TYPE.get()),
                #requirement,
                move |cx| __render(cx, #(::core::clone::Clone::clone(&#arg_idents)),*),
            ))
        }
    })
}
