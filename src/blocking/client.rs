use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use http::header::{HeaderMap, HeaderValue};
use log::{error, trace};
use tokio::sync::{mpsc, oneshot};

use super::request::RequestBuilder;
use super::response::Response;
use crate::{async_impl, redirect, IntoUrl, Url};

/// A `Client` to make Requests with.
///
/// The Client is bound to one redirect policy, given at construction, and
/// holds a connection pool on a dedicated runtime thread. Create one and
/// **reuse** it; clones share the same thread.
///
/// # Examples
///
/// ```rust
/// use redirect_demo::blocking::Client;
/// use redirect_demo::redirect::Policy;
/// #
/// # fn run() -> Result<(), redirect_demo::Error> {
/// let client = Client::new(Policy::none());
/// let resp = client.get("http://localhost:8080/jump").send()?;
/// #   drop(resp);
/// #   Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: ClientHandle,
}

/// A `ClientBuilder` can be used to create a `Client` with custom configuration.
///
/// # Example
///
/// ```
/// # fn run() -> Result<(), redirect_demo::Error> {
/// use std::time::Duration;
/// use redirect_demo::redirect::Policy;
///
/// let client = redirect_demo::blocking::Client::builder(Policy::follow())
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct ClientBuilder {
    inner: async_impl::ClientBuilder,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Constructs a new `ClientBuilder` bound to the given redirect policy.
    pub fn new(policy: redirect::Policy) -> ClientBuilder {
        ClientBuilder {
            inner: async_impl::ClientBuilder::new(policy),
            timeout: None,
        }
    }

    /// Returns a `Client` that uses this `ClientBuilder` configuration.
    ///
    /// # Errors
    ///
    /// This method fails if the runtime thread cannot be started, or if the
    /// configuration is invalid.
    ///
    /// # Panics
    ///
    /// This method panics if called from within an async runtime.
    pub fn build(self) -> crate::Result<Client> {
        ClientHandle::new(self).map(|handle| Client { inner: handle })
    }

    /// Sets the `User-Agent` header to be used by this client.
    pub fn user_agent<V>(self, value: V) -> ClientBuilder
    where
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        self.with_inner(move |inner| inner.user_agent(value))
    }

    /// Sets the default headers for every request.
    pub fn default_headers(self, headers: HeaderMap) -> ClientBuilder {
        self.with_inner(move |inner| inner.default_headers(headers))
    }

    /// Enables a total timeout for `send()`.
    ///
    /// It covers every redirect hop and reading the terminal response's
    /// body, since the blocking `Response` is handed back fully buffered.
    ///
    /// Default is no timeout.
    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.timeout = Some(timeout);
        self.with_inner(move |inner| inner.timeout(timeout))
    }

    /// Set a timeout for only the connect phase of a `Client`.
    pub fn connect_timeout(self, timeout: Duration) -> ClientBuilder {
        self.with_inner(move |inner| inner.connect_timeout(timeout))
    }

    fn with_inner<F>(mut self, func: F) -> ClientBuilder
    where
        F: FnOnce(async_impl::ClientBuilder) -> async_impl::ClientBuilder,
    {
        self.inner = func(self.inner);
        self
    }
}

impl Client {
    /// Constructs a new `Client` that applies `policy` to every request.
    ///
    /// # Panics
    ///
    /// This method panics if the runtime thread cannot be started, or if
    /// called from within an async runtime. Use `Client::builder()` if you
    /// wish to handle the failure as an `Error` instead of panicking.
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
        self.inner.policy
    }

    /// Convenience method to make a `GET` request to a URL.
    ///
    /// # Errors
    ///
    /// This method fails whenever the supplied `Url` cannot be parsed.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        let req = url.into_url().map(async_impl::Request::new);
        RequestBuilder::new(self.clone(), req)
    }

    /// Executes a `Request`.
    ///
    /// # Errors
    ///
    /// This method fails if there was an error while sending the request,
    /// or if the redirect policy's hop limit was exceeded.
    pub fn execute(&self, request: async_impl::Request) -> crate::Result<Response> {
        self.inner.execute_request(request)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("Client");
        builder.field("redirect_policy", &self.inner.policy);
        if let Some(ref d) = self.inner.timeout {
            builder.field("timeout", d);
        }
        builder.finish()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

#[derive(Clone)]
struct ClientHandle {
    policy: redirect::Policy,
    timeout: Option<Duration>,
    inner: Arc<InnerClientHandle>,
}

type OneshotResponse = oneshot::Sender<crate::Result<Response>>;
type ThreadSender = mpsc::UnboundedSender<(async_impl::Request, OneshotResponse)>;

struct InnerClientHandle {
    tx: Option<ThreadSender>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for InnerClientHandle {
    fn drop(&mut self) {
        let id = self
            .thread
            .as_ref()
            .map(|h| h.thread().id())
            .expect("thread not dropped yet");

        trace!("closing runtime thread ({id:?})");
        self.tx.take();
        trace!("signaled close for runtime thread ({id:?})");
        self.thread.take().map(|h| h.join());
        trace!("closed runtime thread ({id:?})");
    }
}

impl ClientHandle {
    fn new(builder: ClientBuilder) -> crate::Result<ClientHandle> {
        let timeout = builder.timeout;
        let builder = builder.inner;
        let (tx, mut rx) = mpsc::unbounded_channel::<(async_impl::Request, OneshotResponse)>();
        let (spawn_tx, spawn_rx) = oneshot::channel::<crate::Result<redirect::Policy>>();
        let handle = thread::Builder::new()
            .name("redirect-demo-internal-sync-runtime".into())
            .spawn(move || {
                use tokio::runtime;
                let rt = match runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(crate::error::builder)
                {
                    Err(e) => {
                        if let Err(e) = spawn_tx.send(Err(e)) {
                            error!("Failed to communicate runtime creation failure: {e:?}");
                        }
                        return;
                    }
                    Ok(v) => v,
                };

                let f = async move {
                    let client = match builder.build() {
                        Err(e) => {
                            if let Err(e) = spawn_tx.send(Err(e)) {
                                error!("Failed to communicate client creation failure: {e:?}");
                            }
                            return;
                        }
                        Ok(v) => v,
                    };
                    if let Err(e) = spawn_tx.send(Ok(client.redirect_policy())) {
                        error!("Failed to communicate successful startup: {e:?}");
                        return;
                    }

                    while let Some((req, req_tx)) = rx.recv().await {
                        let url = req.url().clone();
                        let req_fut = client.execute(req);
                        tokio::spawn(forward(req_fut, req_tx, url, timeout));
                    }

                    trace!("({:?}) Receiver is shutdown", thread::current().id());
                };

                trace!("({:?}) start runtime::block_on", thread::current().id());
                rt.block_on(f);
                trace!("({:?}) end runtime::block_on", thread::current().id());
                drop(rt);
                trace!("({:?}) finished", thread::current().id());
            })
            .map_err(crate::error::builder)?;

        // Wait for the runtime thread to start up...
        let policy = match spawn_rx.blocking_recv() {
            Ok(Ok(policy)) => policy,
            Ok(Err(err)) => return Err(err),
            Err(_canceled) => event_loop_panicked(),
        };

        let inner_handle = Arc::new(InnerClientHandle {
            tx: Some(tx),
            thread: Some(handle),
        });

        Ok(ClientHandle {
            policy,
            timeout,
            inner: inner_handle,
        })
    }

    fn execute_request(&self, req: async_impl::Request) -> crate::Result<Response> {
        let (tx, rx) = oneshot::channel();
        let url = req.url().clone();

        self.inner
            .tx
            .as_ref()
            .ok_or_else(crate::error::runtime_gone)?
            .send((req, tx))
            .map_err(|_| crate::error::runtime_gone().with_url(url.clone()))?;

        match rx.blocking_recv() {
            Ok(res) => res,
            Err(_canceled) => event_loop_panicked(),
        }
    }
}

async fn forward<F>(fut: F, mut tx: OneshotResponse, url: Url, timeout: Option<Duration>)
where
    F: Future<Output = crate::Result<async_impl::Response>>,
{
    let buffered = async move {
        let res = fut.await?;
        Response::buffer(res).await
    };

    // the async client only bounds the chain up to the response head
    let buffered = async move {
        match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, buffered).await {
                Ok(res) => res,
                Err(_elapsed) => Err(crate::error::request(crate::error::TimedOut).with_url(url)),
            },
            None => buffered.await,
        }
    };

    let res = tokio::select! {
        _ = tx.closed() => {
            // receiver dropped
            trace!("response receiver is canceled");
            return;
        }
        res = buffered => res,
    };

    let _ = tx.send(res);
}

#[cold]
#[inline(never)]
fn event_loop_panicked() -> ! {
    // The only possible reason there would be a Canceled error
    // is if the thread running the event loop panicked. We could return
    // an Err here, like a BrokenPipe, but the Client is not
    // recoverable. Additionally, the panic in the other thread
    // is not normal, and should likely be propagated.
    panic!("event loop thread panicked");
}
