//! `#[rxcore_macro::test]`: one attribute for every rxcore test.
//!
//! - sync fn: expands to `#[test]`
//! - async fn: expands to `#[tokio::test]`; `(local)` picks the current-thread
//!   runtime, `(shared)` the multi-thread runtime
//! - `#[rxcore_macro::test(virtual_time)]` on a sync fn installs a
//!   `tracing` subscriber for the test thread so scheduler drain logs show up
//!   with `RUST_LOG=rxcore=debug`

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

enum Flavor {
  Default,
  Local,
  Shared,
  Traced,
}

fn parse_flavor(raw_args: proc_macro2::TokenStream) -> Result<Flavor, syn::Error> {
  if raw_args.is_empty() {
    return Ok(Flavor::Default);
  }
  let (name, span) = if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
    (ident.to_string(), ident.span())
  } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
    (lit.value(), lit.span())
  } else {
    return Err(syn::Error::new(
      raw_args.span(),
      "rxcore_macro::test only accepts: #[rxcore_macro::test], #[rxcore_macro::test(local)], \
       #[rxcore_macro::test(shared)] or #[rxcore_macro::test(virtual_time)]",
    ));
  };
  match name.as_str() {
    "local" => Ok(Flavor::Local),
    "shared" => Ok(Flavor::Shared),
    "virtual_time" => Ok(Flavor::Traced),
    _ => Err(syn::Error::new(
      span,
      "rxcore_macro::test flavor must be one of: local, shared, virtual_time",
    )),
  }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let mut input = parse_macro_input!(item as ItemFn);
  let is_async = input.sig.asyncness.is_some();

  let raw_args = proc_macro2::TokenStream::from(attr);
  let flavor = match parse_flavor(raw_args.clone()) {
    Ok(flavor) => flavor,
    Err(err) => return TokenStream::from(err.to_compile_error()),
  };

  let expanded = match (is_async, flavor) {
    (true, Flavor::Default) => quote! {
      #[tokio::test]
      #input
    },
    (true, Flavor::Local) => quote! {
      #[tokio::test(flavor = "current_thread")]
      #input
    },
    (true, Flavor::Shared) => quote! {
      #[tokio::test(flavor = "multi_thread")]
      #input
    },
    (false, Flavor::Default) => quote! {
      #[test]
      #input
    },
    (false, Flavor::Traced) => {
      let body = &input.block;
      let traced: syn::Block = syn::parse_quote!({
        let _tracing_guard = tracing::subscriber::set_default(
          tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish(),
        );
        #body
      });
      input.block = Box::new(traced);
      quote! {
        #[test]
        #input
      }
    }
    (true, Flavor::Traced) | (false, Flavor::Local) | (false, Flavor::Shared) => {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "rxcore_macro::test: `local`/`shared` need an async fn, `virtual_time` needs a sync fn",
        )
        .to_compile_error(),
      );
    }
  };

  TokenStream::from(expanded)
}
