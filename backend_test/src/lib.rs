use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject dependencies.
///
/// Every test gets its own rocket and an outbox in place of the mail relay, so
/// tests never share state. Storage is in memory unless a `db_uri` is
/// configured, in which case each test gets a fresh database.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`crate::model::store::Store`], and [`crate::notify::Outbox`].
///
/// `#[backend_test(owner)]` registers the example owner first, leaving the
/// client signed in.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
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

    // Sign the client in as an owner if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "owner" => quote! {{
            let response = rocket_client
                .post("/auth/owners")
                .header(rocket::http::ContentType::JSON)
                .body(crate::model::api::auth::OwnerRegistration::example().to_request_body())
                .dispatch()
                .await;
            assert_eq!(rocket::http::Status::Created, response.status());
        }},
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `owner` or nothing")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_tests())
                    .await
                    .unwrap();
                #[allow(unused_variables)]
                let store = rocket_client
                    .rocket()
                    .state::<crate::model::store::Store>()
                    .unwrap()
                    .clone();
                #[allow(unused_variables)]
                let outbox = rocket_client
                    .rocket()
                    .state::<crate::notify::Outbox>()
                    .unwrap()
                    .clone();

                #maybe_login

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
    let mut seen: Vec<String> = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        let injected = if type_ident == "Client" {
                            Some(quote! { rocket_client })
                        } else if type_ident == "Store" {
                            Some(quote! { store.clone() })
                        } else if type_ident == "Outbox" {
                            Some(quote! { outbox.clone() })
                        } else {
                            None
                        };
                        if let Some(injected) = injected {
                            let type_name = type_ident.to_string();
                            if seen.contains(&type_name) {
                                return Err(syn::Error::new(
                                    input.span(),
                                    format!("Test cannot accept more than one `{type_name}`"),
                                ));
                            }
                            seen.push(type_name);
                            args.push(injected);
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `store_ident: Store` or `outbox_ident: Outbox`",
        ));
    }

    Ok(args)
}
