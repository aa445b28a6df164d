#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # redirect-demo
//!
//! An HTTP client whose redirect policy is a required, explicit part of its
//! construction, together with a tiny server that demonstrates the
//! difference.
//!
//! Two client objects that look alike can disagree on whether a `302 Found`
//! is followed. This crate removes the guesswork: there is no default
//! [`redirect::Policy`], so every [`Client`] states up front whether it
//! follows redirects or hands them back to the caller.
//!
//! - [`Client`] and [`ClientBuilder`]: the async client.
//! - [`blocking`]: the same client behind a synchronous API.
//! - [`ClientSet`]: one pre-built client per [`Profile`].
//! - [`server`]: serves `GET /hello` and `GET /jump`.
//!
//! ## Following, or not
//!
//! ```no_run
//! use redirect_demo::{redirect, Client};
//!
//! # async fn run() -> Result<(), redirect_demo::Error> {
//! let following = Client::new(redirect::Policy::follow());
//! let res = following.get("http://localhost:8080/jump").send().await?;
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.text().await?, "hello, world");
//!
//! let never = Client::new(redirect::Policy::none());
//! let res = never.get("http://localhost:8080/jump").send().await?;
//! assert_eq!(res.status(), 302);
//! assert_eq!(res.headers()["location"], "/hello");
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - **blocking** *(enabled by default)*: Provides the [blocking][] client API.
//!
//! [blocking]: ./blocking/index.html

pub use http::header;
pub use http::Method;
pub use http::{StatusCode, Version};
pub use url::Url;

mod error;
mod into_url;

pub use self::error::{Error, Result};
pub use self::into_url::IntoUrl;

/// Shortcut method to quickly make a `GET` request.
///
/// The redirect policy is required here too; a new `Client` is built for
/// the single request.
///
/// **NOTE**: This function creates a new internal `Client` on each call,
/// and so should not be used if making many requests. Create a
/// [`Client`](./struct.Client.html) instead.
///
/// # Examples
///
/// ```rust
/// # async fn run() -> Result<(), redirect_demo::Error> {
/// use redirect_demo::redirect::Policy;
///
/// let body = redirect_demo::get("http://localhost:8080/jump", Policy::follow())
///     .await?
///     .text()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// This function fails if:
///
/// - the native client cannot be initialized
/// - the supplied `Url` cannot be parsed
/// - there was an error while sending request
/// - the redirect hop limit was exhausted
pub async fn get<T: IntoUrl>(url: T, policy: redirect::Policy) -> crate::Result<Response> {
    Client::builder(policy).build()?.get(url).send().await
}

fn _assert_impls() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    fn assert_clone<T: Clone>() {}

    assert_send::<Client>();
    assert_sync::<Client>();
    assert_clone::<Client>();

    assert_send::<Request>();
    assert_send::<RequestBuilder>();
    assert_send::<Response>();

    assert_send::<Error>();
    assert_sync::<Error>();

    assert_send::<ClientSet>();
    assert_sync::<ClientSet>();
}

pub use self::async_impl::{Client, ClientBuilder, Request, RequestBuilder, Response};
pub use self::clients::{ClientSet, Profile};

mod async_impl;
#[cfg(feature = "blocking")]
#[cfg_attr(docsrs, doc(cfg(feature = "blocking")))]
pub mod blocking;
mod clients;
pub mod redirect;
pub mod server;
mod util;
