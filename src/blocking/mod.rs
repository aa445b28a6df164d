//! A blocking Client API.
//!
//! The blocking `Client` will block the current thread to execute, instead
//! of returning futures that need to be executed on a runtime.
//!
//! Conversely, the functionality in `redirect_demo::blocking` must *not* be
//! executed within an async runtime, or it will panic when attempting to
//! block.
//!
//! Like its async counterpart, a blocking `Client` is always built with an
//! explicit [`redirect::Policy`](crate::redirect::Policy).
//!
//! # Making a GET request
//!
//! ```no_run
//! use redirect_demo::redirect::Policy;
//!
//! # fn run() -> Result<(), redirect_demo::Error> {
//! let body = redirect_demo::blocking::get("http://localhost:8080/jump", Policy::follow())?
//!     .text()?;
//!
//! println!("body = {body:?}");
//! # Ok(())
//! # }
//! ```

mod client;
mod request;
mod response;

pub use self::client::{Client, ClientBuilder};
pub use self::request::RequestBuilder;
pub use self::response::Response;
pub use crate::async_impl::Request;

/// Shortcut method to quickly make a *blocking* `GET` request.
///
/// **NOTE**: This function creates a new internal `Client` on each call,
/// and so should not be used if making many requests. Create a
/// [`Client`](./struct.Client.html) instead.
///
/// # Errors
///
/// This function fails if:
///
/// - the runtime thread cannot be started
/// - the supplied `Url` cannot be parsed
/// - there was an error while sending request
/// - the redirect hop limit was exhausted
pub fn get<T: crate::IntoUrl>(url: T, policy: crate::redirect::Policy) -> crate::Result<Response> {
    Client::builder(policy).build()?.get(url).send()
}
