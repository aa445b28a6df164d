pub use self::client::{Client, ClientBuilder};
pub use self::request::{Request, RequestBuilder};
pub use self::response::Response;

mod client;
pub(crate) mod request;
mod response;
