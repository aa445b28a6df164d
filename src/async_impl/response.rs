use std::fmt;

use bytes::Bytes;
use http::header::HeaderMap;
use http_body::Body as _;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use log::debug;

use crate::{StatusCode, Url, Version};

/// A Response to a submitted `Request`.
///
/// This is the terminal response: the one the redirect policy settled on.
/// Under `Policy::none()` a redirect status is delivered here unchanged.
pub struct Response {
    res: http::Response<Incoming>,
    // Boxed to save space (11 words to 1 word), and it's not accessed
    // frequently internally.
    url: Box<Url>,
}

impl Response {
    pub(super) fn new(res: http::Response<Incoming>, url: Url) -> Response {
        debug!("response '{}' for {}", res.status(), url);
        Response {
            res,
            url: Box::new(url),
        }
    }

    /// Get the `StatusCode` of this `Response`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.res.status()
    }

    /// Get the HTTP `Version` of this `Response`.
    #[inline]
    pub fn version(&self) -> Version {
        self.res.version()
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.res.headers()
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.res.headers_mut()
    }

    /// Get the content-length of this response, if known.
    ///
    /// It is not known when the server didn't send a `content-length`
    /// header.
    pub fn content_length(&self) -> Option<u64> {
        self.res.body().size_hint().exact()
    }

    /// Get the final `Url` of this `Response`.
    ///
    /// After a followed redirect this is the `Location` target; when the
    /// redirect was not followed it is the URL originally requested.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the full response text.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be read, or if it is not valid UTF-8.
    pub async fn text(self) -> crate::Result<String> {
        let url = self.url.clone();
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| crate::error::decode(e).with_url(*url))
    }

    /// Get the full response body as `Bytes`.
    pub async fn bytes(self) -> crate::Result<Bytes> {
        let Response { res, url } = self;
        BodyExt::collect(res.into_body())
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| crate::error::body(e).with_url(*url))
    }

    /// Turn a response into an error if the server returned an error.
    ///
    /// Redirect statuses are not errors, so a 302 delivered under
    /// `Policy::none()` passes through.
    ///
    /// # Example
    ///
    /// ```
    /// # use redirect_demo::Response;
    /// fn on_response(res: Response) {
    ///     match res.error_for_status() {
    ///         Ok(_res) => (),
    ///         Err(err) => {
    ///             // asserting a 400 as an example
    ///             // it could be any status between 400...599
    ///             assert_eq!(
    ///                 err.status(),
    ///                 Some(redirect_demo::StatusCode::BAD_REQUEST)
    ///             );
    ///         }
    ///     }
    /// }
    /// # fn main() {}
    /// ```
    pub fn error_for_status(self) -> crate::Result<Self> {
        let status = self.status();
        if status.is_client_error() || status.is_server_error() {
            Err(crate::error::status_code(*self.url, status))
        } else {
            Ok(self)
        }
    }

    /// Turn a reference to a response into an error if the server returned an error.
    pub fn error_for_status_ref(&self) -> crate::Result<&Self> {
        let status = self.status();
        if status.is_client_error() || status.is_server_error() {
            Err(crate::error::status_code(*self.url.clone(), status))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url().as_str())
            .field("status", &self.status())
            .field("headers", self.headers())
            .finish()
    }
}
