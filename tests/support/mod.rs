#![allow(dead_code)]

pub mod server;

use std::future::Future;

use bytes::Bytes;
use http_body_util::Full;
use redirect_demo::server::Server;

pub static DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An empty response with `status` and, when given, a `Location` header.
pub fn redirect_to(status: u16, location: Option<&str>) -> http::Response<Full<Bytes>> {
    let mut builder = http::Response::builder().status(status);
    if let Some(location) = location {
        builder = builder.header("location", location);
    }
    builder.body(Full::default()).unwrap()
}

/// A `200 OK` with a text body.
pub fn text(body: &'static str) -> http::Response<Full<Bytes>> {
    http::Response::new(Full::new(Bytes::from_static(body.as_bytes())))
}

/// Run `test` against the demo server bound to a random local port, then
/// shut the server down.
pub async fn with_demo_server<F, Fut>(test: F)
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = ()>,
{
    let server = Server::bind(([127, 0, 0, 1], 0).into())
        .await
        .expect("bind demo server");
    let base = format!("http://{}", server.addr());
    test(base).await;
    server.shutdown().await;
}
