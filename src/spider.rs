//! The immutable description of one crawl.

use serde::{Deserialize, Serialize};

use crate::request::Request;

/// A named crawl: its seed requests and the domains it may stay on.
///
/// Built by the caller, handed to [`Engine::run`] and never mutated by the
/// engine afterwards.
///
/// [`Engine::run`]: crate::engine::Engine::run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spider {
    pub name: String,
    pub start_urls: Vec<Request>,
    /// Suffix-matched against request hosts by the offsite middleware.
    /// Empty means every host is allowed.
    pub allowed_domains: Vec<String>,
}

impl Spider {
    pub fn new(name: impl Into<String>) -> Self {
        Spider {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_urls.push(Request::new(url));
        self
    }

    /// Seeds the crawl with a pre-built request (custom parser or meta).
    pub fn start_request(mut self, req: Request) -> Self {
        self.start_urls.push(req);
        self
    }

    pub fn allow_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_domains.push(domain.into());
        self
    }
}
