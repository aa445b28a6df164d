use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, ACCEPT, LOCATION, USER_AGENT};
use http_body_util::Empty;
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use log::{debug, trace};

use super::request::{Request, RequestBuilder};
use super::response::Response;
use crate::into_url::try_uri;
use crate::redirect::{self, ActionKind};
use crate::{IntoUrl, Method, Url};

static DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An asynchronous `Client` to make Requests with.
///
/// A `Client` is always bound to one [`redirect::Policy`], given when it is
/// constructed. The policy cannot be changed afterwards and applies to every
/// request the client sends.
///
/// The `Client` holds a connection pool internally, so it is advised that
/// you create one and **reuse** it.
///
/// You do **not** have to wrap the `Client` in an [`Rc`] or [`Arc`] to **reuse** it,
/// because it already uses an [`Arc`] internally.
///
/// [`Rc`]: std::rc::Rc
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientRef>,
}

/// A `ClientBuilder` can be used to create a `Client` with custom configuration.
#[must_use]
pub struct ClientBuilder {
    config: Config,
}

struct Config {
    // NOTE: When adding a new field, update `fmt::Debug for ClientBuilder`
    error: Option<crate::Error>,
    headers: HeaderMap,
    redirect_policy: redirect::Policy,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder` bound to the given redirect policy.
    pub fn new(policy: redirect::Policy) -> ClientBuilder {
        let mut headers: HeaderMap<HeaderValue> = HeaderMap::with_capacity(2);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        ClientBuilder {
            config: Config {
                error: None,
                headers,
                redirect_policy: policy,
                timeout: None,
                connect_timeout: None,
            },
        }
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// This method fails if an invalid value was given to one of the
    /// builder methods, such as an unparseable user agent.
    pub fn build(self) -> crate::Result<Client> {
        let config = self.config;

        if let Some(err) = config.error {
            return Err(err);
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(config.connect_timeout);
        connector.set_nodelay(true);

        let hyper = hyper_util::client::legacy::Client::builder(TokioExecutor::new())
            .build(connector);

        Ok(Client {
            inner: Arc::new(ClientRef {
                headers: config.headers,
                hyper,
                redirect_policy: config.redirect_policy,
                request_timeout: config.timeout,
            }),
        })
    }

    // Higher-level options

    /// Sets the `User-Agent` header to be used by this client.
    ///
    /// Defaults to `redirect-demo/<version>`.
    pub fn user_agent<V>(mut self, value: V) -> ClientBuilder
    where
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        match value.try_into() {
            Ok(value) => {
                self.config.headers.insert(USER_AGENT, value);
            }
            Err(e) => {
                self.config.error = Some(crate::error::builder(e.into()));
            }
        };
        self
    }

    /// Sets the default headers for every request, including every
    /// redirect hop.
    pub fn default_headers(mut self, headers: HeaderMap) -> ClientBuilder {
        for (key, value) in headers.iter() {
            self.config.headers.insert(key, value.clone());
        }
        self
    }

    // Timeout options

    /// Enables a total request timeout.
    ///
    /// The timeout is applied from when the request starts connecting until
    /// the head of the terminal response has been received, covering every
    /// redirect hop in between.
    ///
    /// Default is no timeout.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set a timeout for only the connect phase of a `Client`.
    ///
    /// Default is `None`.
    pub fn connect_timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.config.connect_timeout = Some(timeout);
        self
    }
}

type HyperClient = hyper_util::client::legacy::Client<HttpConnector, Empty<Bytes>>;

impl Client {
    /// Constructs a new `Client` that applies `policy` to every request.
    ///
    /// # Panics
    ///
    /// This method panics if the client cannot be initialized. Use
    /// `Client::builder()` if you wish to handle the failure as an `Error`
    /// instead of panicking.
    pub fn new(policy: redirect::Policy) -> Client {
        ClientBuilder::new(policy).build().expect("Client::new()")
    }

    /// Creates a `ClientBuilder` to configure a `Client`.
    ///
    /// This is the same as `ClientBuilder::new(policy)`.
    pub fn builder(policy: redirect::Policy) -> ClientBuilder {
        ClientBuilder::new(policy)
    }

    /// The redirect policy this client was built with.
    pub fn redirect_policy(&self) -> redirect::Policy {
        self.inner.redirect_policy
    }

    /// Convenience method to make a `GET` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        let req = url.into_url().map(Request::new);
        RequestBuilder::new(self.clone(), req)
    }

    /// Executes a `Request`.
    ///
    /// A `Request` can be built manually with `Request::new()` or obtained
    /// from a RequestBuilder with `RequestBuilder::build()`.
    ///
    /// You should prefer to use the `RequestBuilder` and
    /// `RequestBuilder::send()`.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending the request,
    /// or if the redirect policy's hop limit was exceeded.
    pub fn execute(&self, request: Request) -> impl Future<Output = Result<Response, crate::Error>> {
        let client = self.inner.clone();
        async move { client.execute_request(request).await }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("Client");
        self.inner.fmt_fields(&mut builder);
        builder.finish()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("ClientBuilder");
        builder
            .field("headers", &self.config.headers)
            .field("redirect_policy", &self.config.redirect_policy);

        if let Some(ref d) = self.config.timeout {
            builder.field("timeout", d);
        }
        if let Some(ref d) = self.config.connect_timeout {
            builder.field("connect_timeout", d);
        }
        if let Some(ref e) = self.config.error {
            builder.field("error", e);
        }

        builder.finish()
    }
}

struct ClientRef {
    headers: HeaderMap,
    hyper: HyperClient,
    redirect_policy: redirect::Policy,
    request_timeout: Option<Duration>,
}

impl ClientRef {
    fn fmt_fields(&self, f: &mut fmt::DebugStruct<'_, '_>) {
        f.field("headers", &self.headers)
            .field("redirect_policy", &self.redirect_policy);

        if let Some(ref d) = self.request_timeout {
            f.field("timeout", d);
        }
    }

    async fn execute_request(&self, req: Request) -> crate::Result<Response> {
        let (url, user_headers) = req.pieces();

        let mut headers = self.headers.clone(); // default headers
        crate::util::replace_headers(&mut headers, user_headers);

        match self.request_timeout {
            Some(timeout) => {
                let timeout_url = url.clone();
                tokio::time::timeout(timeout, self.follow(url, headers))
                    .await
                    .map_err(|_| crate::error::request(crate::error::TimedOut).with_url(timeout_url))?
            }
            None => self.follow(url, headers).await,
        }
    }

    /// Sends `GET url`, then walks the redirect chain as far as the policy
    /// allows.
    async fn follow(&self, mut url: Url, headers: HeaderMap) -> crate::Result<Response> {
        let mut urls: Vec<Url> = Vec::new();

        loop {
            let res = self.send_once(&url, &headers).await?;
            let status = res.status();

            if !redirect::is_redirect_status(status) {
                return Ok(Response::new(res, url));
            }

            let loc = match res.headers().get(LOCATION) {
                Some(val) => match resolve_location(&url, val) {
                    Some(loc) => loc,
                    None => {
                        debug!("Location header had invalid URI: {val:?}");
                        return Ok(Response::new(res, url));
                    }
                },
                None => {
                    debug!("{status} response for '{url}' had no Location header");
                    return Ok(Response::new(res, url));
                }
            };

            urls.push(url.clone());

            match self.redirect_policy.check(status, &loc, &urls) {
                ActionKind::Follow => {
                    debug!("redirecting '{url}' to '{loc}'");
                    url = loc;
                }
                ActionKind::Stop => {
                    debug!("redirect policy disallowed redirection to '{loc}'");
                    return Ok(Response::new(res, url));
                }
                ActionKind::Error(err) => {
                    return Err(crate::error::redirect(err, url));
                }
            }
        }
    }

    async fn send_once(&self, url: &Url, headers: &HeaderMap) -> crate::Result<http::Response<Incoming>> {
        let uri = try_uri(url)?;

        let mut req = http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Empty::new())
            .map_err(crate::error::builder)?;
        *req.headers_mut() = headers.clone();

        trace!("GET {url}");
        self.hyper
            .request(req)
            .await
            .map_err(|e| crate::error::request(e).with_url(url.clone()))
    }
}

fn resolve_location(base: &Url, val: &HeaderValue) -> Option<Url> {
    // Some servers send a UTF-8 Location header; the bytes are opaque in
    // theory, but only valid UTF-8 can be joined onto a Url.
    let loc = std::str::from_utf8(val.as_bytes()).ok()?;
    let next = base.join(loc).ok()?;
    match next.scheme() {
        "http" | "https" => Some(next),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_location() {
        let base = Url::parse("http://127.0.0.1:8080/jump").unwrap();
        let loc = resolve_location(&base, &HeaderValue::from_static("/hello")).unwrap();
        assert_eq!(loc.as_str(), "http://127.0.0.1:8080/hello");
    }

    #[test]
    fn resolve_absolute_location() {
        let base = Url::parse("http://127.0.0.1:8080/jump").unwrap();
        let loc = resolve_location(&base, &HeaderValue::from_static("http://example.com/x")).unwrap();
        assert_eq!(loc.as_str(), "http://example.com/x");
    }

    #[test]
    fn resolve_rejects_non_http_scheme() {
        let base = Url::parse("http://127.0.0.1:8080/jump").unwrap();
        assert!(resolve_location(&base, &HeaderValue::from_static("ftp://example.com/x")).is_none());
    }

    #[test]
    fn resolve_rejects_non_utf8() {
        let base = Url::parse("http://127.0.0.1:8080/jump").unwrap();
        let val = HeaderValue::from_bytes(b"/h\xffllo").unwrap();
        assert!(resolve_location(&base, &val).is_none());
    }

    #[test]
    fn builder_reports_bad_user_agent() {
        let err = Client::builder(redirect::Policy::follow())
            .user_agent("bad\nagent")
            .build()
            .unwrap_err();
        assert!(err.is_builder());
    }

    #[test]
    fn client_keeps_its_policy() {
        let client = Client::new(redirect::Policy::limited(3));
        assert_eq!(client.redirect_policy(), redirect::Policy::limited(3));
        assert_eq!(client.clone().redirect_policy(), redirect::Policy::limited(3));
    }

    #[test]
    fn client_debug_shows_policy() {
        let client = Client::new(redirect::Policy::none());
        let dbg = format!("{client:?}");
        assert!(dbg.contains("Policy(None)"), "{dbg}");
    }
}
