//! The downloaded result of a request.

use std::borrow::Cow;

use bytes::Bytes;

use crate::error::ResponseError;
use crate::meta::Meta;
use crate::request::Request;

/// What came back from the downloader for one request.
///
/// `status_code` is 0 when no HTTP exchange took place (transport failure,
/// file branch). `meta` aliases the originating request's map, so chain
/// steps after the downloader see and share the same annotations.
#[derive(Debug)]
pub struct Response {
    pub url: String,
    pub status_code: u16,
    pub body: Bytes,
    pub err: Option<ResponseError>,
    pub meta: Meta,
}

impl Response {
    pub fn from_request(req: &Request) -> Self {
        Response {
            url: req.url.clone(),
            status_code: 0,
            body: Bytes::new(),
            err: None,
            meta: req.meta.clone(),
        }
    }

    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_err(mut self, err: ResponseError) -> Self {
        self.err = Some(err);
        self
    }

    /// The body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
