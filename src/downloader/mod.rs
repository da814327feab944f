//! The transport invoked between the two middleware chains.

mod http;
mod phantom;

pub use http::HttpDownloader;
pub use phantom::{BrowserBridge, PhantomBridge};

use async_trait::async_trait;

use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

/// Produces a response for a request.
///
/// Failures are reported inside [`Response::err`], never as a Rust error:
/// the response always comes back for the chains (retry in particular) to
/// inspect. The returned response carries the request's URL and aliases its
/// meta map.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, req: &Request, spider: &Spider) -> Response;
}
