//! The redirecting endpoint.
//!
//! Two routes, both stateless:
//!
//! | Method | Path     | Response                                    |
//! |--------|----------|---------------------------------------------|
//! | GET    | `/hello` | 200, body `hello, world`                    |
//! | GET    | `/jump`  | 302, header `Location: /hello`, empty body  |
//!
//! `HEAD` is answered like `GET` without a body. Other methods on these
//! paths get a 405, and every other path a 404.
//!
//! ```no_run
//! use redirect_demo::server::Server;
//!
//! # async fn run() -> std::io::Result<()> {
//! let server = Server::bind(([127, 0, 0, 1], 0).into()).await?;
//! println!("try {}", server.url("/jump"));
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION};
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use log::{debug, trace};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Path of the terminal resource.
pub const HELLO_PATH: &str = "/hello";

/// Path that redirects to [`HELLO_PATH`].
pub const JUMP_PATH: &str = "/jump";

/// Body served at [`HELLO_PATH`].
pub const HELLO_BODY: &str = "hello, world";

const TEXT_PLAIN_UTF_8: &str = "text/plain;charset=UTF-8";

/// Route a single request.
///
/// Only the method and path are looked at; the body is ignored.
pub fn route<B>(req: &Request<B>) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    if path != HELLO_PATH && path != JUMP_PATH {
        return empty(StatusCode::NOT_FOUND);
    }

    match *req.method() {
        Method::GET | Method::HEAD => (),
        _ => {
            let mut res = empty(StatusCode::METHOD_NOT_ALLOWED);
            res.headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
            return res;
        }
    }

    if path == HELLO_PATH {
        hello()
    } else {
        jump()
    }
}

fn hello() -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from_static(HELLO_BODY.as_bytes())));
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
    res
}

fn jump() -> Response<Full<Bytes>> {
    let mut res = empty(StatusCode::FOUND);
    res.headers_mut()
        .insert(LOCATION, HeaderValue::from_static(HELLO_PATH));
    res
}

fn empty(status: StatusCode) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

/// A running server.
///
/// Dropping the handle signals shutdown; use [`Server::shutdown`] to also
/// wait for open connections to finish.
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Server {
    /// Bind `addr` and start serving in a background task.
    ///
    /// Use port `0` to let the OS pick a free port, then read it back with
    /// [`Server::addr`].
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(addr: SocketAddr) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(serve(listener, shutdown_rx));
        debug!("listening on http://{addr}");

        Ok(Server {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// The address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// An absolute `http://` URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop accepting connections and wait for the open ones to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!("server task failed: {err}");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Server").field("addr", &self.addr).finish()
    }
}

async fn serve(listener: TcpListener, mut shutdown_rx: oneshot::Receiver<()>) {
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("shutting down server");
                break;
            }
            accepted = listener.accept() => {
                let (stream, remote) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        debug!("accept error: {err}");
                        continue;
                    }
                };
                trace!("accepted connection from {remote}");

                let svc = service_fn(|req: Request<hyper::body::Incoming>| async move {
                    trace!("{} {}", req.method(), req.uri());
                    Ok::<_, Infallible>(route(&req))
                });
                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn);

                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        debug!("connection error: {err}");
                    }
                });
            }
        }
    }

    graceful.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn request(method: Method, path: &str) -> Request<()> {
        Request::builder().method(method).uri(path).body(()).unwrap()
    }

    async fn body_of(res: Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn hello_is_ok() {
        let res = route(&request(Method::GET, "/hello"));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], TEXT_PLAIN_UTF_8);
        assert!(res.headers().get(LOCATION).is_none());
        assert_eq!(body_of(res).await, HELLO_BODY);
    }

    #[tokio::test]
    async fn jump_is_found() {
        let res = route(&request(Method::GET, "/jump"));
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[LOCATION], "/hello");
        assert!(body_of(res).await.is_empty());
    }

    #[test]
    fn head_matches_get() {
        for path in [HELLO_PATH, JUMP_PATH] {
            let get = route(&request(Method::GET, path));
            let head = route(&request(Method::HEAD, path));
            assert_eq!(get.status(), head.status());
            assert_eq!(get.headers(), head.headers());
        }
    }

    #[test]
    fn other_methods_not_allowed() {
        let res = route(&request(Method::POST, "/jump"));
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, HEAD");
    }

    #[test]
    fn unknown_path_not_found() {
        let res = route(&request(Method::GET, "/nope"));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = route(&request(Method::GET, "/hello/"));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn query_is_ignored() {
        let res = route(&request(Method::GET, "/jump?x=1"));
        assert_eq!(res.status(), StatusCode::FOUND);
    }
}
