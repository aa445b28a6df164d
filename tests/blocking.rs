mod support;
use support::server;

use std::time::Duration;

use http::header::USER_AGENT;
use redirect_demo::blocking::Client;
use redirect_demo::redirect::Policy;
use redirect_demo::server::Server;
use redirect_demo::StatusCode;

/// The demo server on a runtime of its own, since blocking clients must not
/// run inside one.
struct DemoServer {
    server: Option<Server>,
    _rt: tokio::runtime::Runtime,
}

impl DemoServer {
    fn start() -> DemoServer {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("new rt");
        let server = rt
            .block_on(Server::bind(([127, 0, 0, 1], 0).into()))
            .expect("bind demo server");
        DemoServer {
            server: Some(server),
            _rt: rt,
        }
    }

    fn url(&self, path: &str) -> String {
        self.server.as_ref().unwrap().url(path)
    }
}

impl Drop for DemoServer {
    fn drop(&mut self) {
        // signal shutdown before the runtime goes away
        self.server.take();
    }
}

#[test]
fn test_follow_jump() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let res = Client::new(Policy::follow()).get(demo.url("/jump")).send().unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.url().as_str(), demo.url("/hello"));
    assert!(res.headers().get("location").is_none());
    assert_eq!(res.content_length(), Some(12));
    assert_eq!(res.text().unwrap(), "hello, world");
}

#[test]
fn test_never_redirecting_jump() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let url = demo.url("/jump");
    let res = Client::new(Policy::none()).get(&url).send().unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.url().as_str(), url);
    assert_eq!(res.headers()["location"], "/hello");
    assert!(res.bytes().unwrap().is_empty());
}

#[test]
fn test_get_shortcut() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let body = redirect_demo::blocking::get(demo.url("/jump"), Policy::follow())
        .unwrap()
        .text()
        .unwrap();
    assert_eq!(body, "hello, world");

    let res = redirect_demo::blocking::get(demo.url("/jump"), Policy::none()).unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
}

#[test]
fn test_client_is_reusable_across_threads() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let client = Client::new(Policy::none());
    let url = demo.url("/jump");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            std::thread::spawn(move || client.get(&url).send().unwrap().status())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), StatusCode::FOUND);
    }
}

#[test]
fn test_redirect_loop_is_an_error() {
    let _ = env_logger::try_init();

    let server = server::http(move |_req| async { support::redirect_to(302, Some("/loop")) });

    let url = server.url("/loop");
    let err = Client::new(Policy::follow()).get(&url).send().unwrap_err();
    assert!(err.is_redirect());
    assert_eq!(err.url().map(|u| u.as_str()), Some(url.as_str()));
}

#[test]
fn test_user_agent_and_headers() {
    let _ = env_logger::try_init();

    let server = server::http(move |req| async move {
        assert_eq!(req.headers()["user-agent"], "blocking-agent");
        assert_eq!(req.headers()["x-hop"], "1");
        if req.uri().path() == "/dst" {
            support::text("ok")
        } else {
            support::redirect_to(303, Some("/dst"))
        }
    });

    let client = Client::builder(Policy::follow())
        .user_agent("blocking-agent")
        .build()
        .unwrap();
    let res = client.get(server.url("/src")).header("x-hop", "1").send().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().unwrap(), "ok");
}

#[test]
fn test_default_user_agent() {
    let _ = env_logger::try_init();

    let server = server::http(move |req| async move {
        assert_eq!(req.headers()[USER_AGENT], support::DEFAULT_USER_AGENT);
        support::text("")
    });

    let res = Client::new(Policy::none()).get(server.url("/ua")).send().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[test]
fn test_timeout() {
    let _ = env_logger::try_init();

    let server = server::http(move |_req| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        support::text("late")
    });

    let client = Client::builder(Policy::follow())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let url = server.url("/slow");
    let err = client.get(&url).send().unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.url().map(|u| u.as_str()), Some(url.as_str()));
}

#[test]
fn test_timeout_covers_a_stalled_body() {
    use std::io::{Read, Write};

    let _ = env_logger::try_init();

    // headers arrive at once, the body never completes
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
    let stall = std::thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut buf = [0; 1024];
        let _ = socket.read(&mut buf);
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\nhel")
            .unwrap();
        let _ = done_rx.recv_timeout(Duration::from_secs(5));
    });

    let client = Client::builder(Policy::follow())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let url = format!("http://{addr}/stall");
    let start = std::time::Instant::now();
    let err = client.get(&url).send().unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(3), "{:?}", start.elapsed());
    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(err.url().map(|u| u.as_str()), Some(url.as_str()));

    let _ = done_tx.send(());
    stall.join().unwrap();
}

#[test]
fn test_following_is_repeatable() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let url = demo.url("/jump");

    let first = Client::new(Policy::follow());
    let second = Client::new(Policy::follow());
    for client in [&first, &first, &first, &second, &second] {
        let res = client.get(&url).send().unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.url().as_str(), demo.url("/hello"));
        assert!(res.headers().get("location").is_none());
        assert_eq!(res.text().unwrap(), "hello, world");
    }
}

#[test]
fn test_error_for_status() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let err = Client::new(Policy::follow())
        .get(demo.url("/nope"))
        .send()
        .unwrap()
        .error_for_status()
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[test]
fn test_execute_built_request() {
    let _ = env_logger::try_init();

    let demo = DemoServer::start();
    let client = Client::new(Policy::follow());
    let req = client.get(demo.url("/jump")).build().unwrap();
    assert_eq!(req.url().path(), "/jump");

    let res = client.execute(req).unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[test]
fn test_blocking_client_keeps_its_policy() {
    let client = Client::new(Policy::limited(2));
    assert_eq!(client.redirect_policy(), Policy::limited(2));
    assert!(format!("{client:?}").contains("Limit(2)"));
}
