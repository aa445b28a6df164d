use std::fmt;

use bytes::Bytes;
use http::header::HeaderMap;

use crate::{async_impl, StatusCode, Url, Version};

/// A Response to a submitted `Request`.
///
/// The body has already been read in full by the time the response is
/// handed back, so reading it again never touches the network.
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Box<Url>,
    body: Bytes,
}

impl Response {
    pub(super) async fn buffer(res: async_impl::Response) -> crate::Result<Response> {
        let status = res.status();
        let version = res.version();
        let headers = res.headers().clone();
        let url = Box::new(res.url().clone());
        let body = res.bytes().await?;
        Ok(Response {
            status,
            version,
            headers,
            url,
            body,
        })
    }

    /// Get the `StatusCode` of this `Response`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use redirect_demo::redirect::Policy;
    ///
    /// # fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let resp = redirect_demo::blocking::get("http://localhost:8080/jump", Policy::none())?;
    /// assert_eq!(resp.status(), redirect_demo::StatusCode::FOUND);
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP `Version` of this `Response`.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the final `Url` of this `Response`.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the length of the buffered body.
    pub fn content_length(&self) -> Option<u64> {
        Some(self.body.len() as u64)
    }

    /// Get the full response body as `Bytes`.
    pub fn bytes(self) -> crate::Result<Bytes> {
        Ok(self.body)
    }

    /// Get the response text.
    ///
    /// # Errors
    ///
    /// Fails if the body is not valid UTF-8.
    pub fn text(self) -> crate::Result<String> {
        let Response { url, body, .. } = self;
        String::from_utf8(body.to_vec()).map_err(|e| crate::error::decode(e).with_url(*url))
    }

    /// Turn a response into an error if the server returned an error.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use redirect_demo::redirect::Policy;
    /// # fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let res = redirect_demo::blocking::get("http://localhost:8080/nope", Policy::follow())?
    ///     .error_for_status();
    /// if let Err(err) = res {
    ///     assert_eq!(err.status(), Some(redirect_demo::StatusCode::NOT_FOUND));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn error_for_status(self) -> crate::Result<Self> {
        let status = self.status;
        if status.is_client_error() || status.is_server_error() {
            Err(crate::error::status_code(*self.url, status))
        } else {
            Ok(self)
        }
    }

    /// Turn a reference to a response into an error if the server returned an error.
    pub fn error_for_status_ref(&self) -> crate::Result<&Self> {
        let status = self.status;
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
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}
