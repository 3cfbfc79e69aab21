use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies backed by fresh in-memory state.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::storage::Stores` (shared with the client), and
/// `crate::mail::Outbox` (receiving everything the client sends).
///
/// `#[backend_test(debug)]` builds the server with debug endpoints and
/// error detail enabled.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Pick the config variant.
    let config = match parse_macro_input!(args as Option<Ident>) {
        None => quote! { crate::Config::example() },
        Some(arg) if arg == "debug" => quote! { crate::Config::example_debug() },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `debug`")
                .into_compile_error()
                .into();
        }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::storage::Stores,
                crate::mail::Outbox,
            ) {
                let stores = crate::storage::Stores::memory();
                let outbox = crate::mail::Outbox::default();
                let mailer: crate::mail::Mailer = std::sync::Arc::new(outbox.clone());
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_test(#config, stores.clone(), mailer),
                )
                .await
                .unwrap();
                (rocket_client, stores, outbox)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, stores, outbox) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut args = vec![];
    let mut seen = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Match on the last segment so both `Client` and full paths work.
                    if let Some(segment) = type_path.path.segments.last() {
                        let injected = if segment.ident == "Client" {
                            Some(quote! { rocket_client })
                        } else if segment.ident == "Stores" {
                            Some(quote! { stores.clone() })
                        } else if segment.ident == "Outbox" {
                            Some(quote! { outbox.clone() })
                        } else {
                            None
                        };
                        if let Some(injected) = injected {
                            if seen.contains(&segment.ident) {
                                return Err(syn::Error::new(
                                    input.span(),
                                    format!("Test cannot accept more than one `{}`", segment.ident),
                                ));
                            }
                            seen.push(segment.ident.clone());
                            args.push(injected);
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `stores_ident: Stores` or `outbox_ident: Outbox`",
        ));
    }

    Ok(args)
}
