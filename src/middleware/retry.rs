//! Re-yields failed downloads until the retry budget runs out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{DownloadMiddleware, MiddlewareAction, OpenClose};
use crate::engine::Yield;
use crate::error::{CrawlError, ResponseError};
use crate::meta::keys;
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

pub struct RetryMiddleware {
    enabled: bool,
    retry_times: i64,
    yielder: Arc<dyn Yield>,
}

impl RetryMiddleware {
    pub fn new(enabled: bool, retry_times: i64, yielder: Arc<dyn Yield>) -> Self {
        RetryMiddleware {
            enabled,
            retry_times,
            yielder,
        }
    }
}

#[async_trait]
impl OpenClose for RetryMiddleware {
    async fn open(&self, spider: &Spider) -> Result<(), CrawlError> {
        debug!(
            spider = %spider.name,
            "Init success with retry_enabled: {}, retry_times: {}",
            self.enabled, self.retry_times
        );
        Ok(())
    }
}

#[async_trait]
impl DownloadMiddleware for RetryMiddleware {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn process_response(
        &self,
        res: &mut Response,
        req: &mut Request,
        _spider: &Spider,
    ) -> MiddlewareAction {
        match res.err.clone() {
            None => MiddlewareAction::Continue,
            // Drop-kind errors are intentional stops; never retried.
            Some(ResponseError::Drop(message)) => MiddlewareAction::Drop(message),
            Some(ResponseError::Fail(message)) => {
                let attempt = req.meta.get_int(keys::RETRY).unwrap_or(0) + 1;
                req.meta.set(keys::RETRY, attempt);
                if self.enabled && attempt <= self.retry_times {
                    // The re-yield carries no parent: the request re-enters
                    // the queue without passing the admission hooks again.
                    self.yielder.yield_request(req.clone(), None).await;
                }
                MiddlewareAction::Drop(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingYielder {
        requests: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Yield for RecordingYielder {
        async fn yield_request(&self, req: Request, _parent: Option<&Response>) {
            self.requests.lock().push(req);
        }

        async fn yield_item(&self, _item: Item) {}
    }

    fn fixture(enabled: bool, times: i64) -> (RetryMiddleware, Arc<RecordingYielder>) {
        let yielder = Arc::new(RecordingYielder::default());
        let mw = RetryMiddleware::new(enabled, times, yielder.clone());
        (mw, yielder)
    }

    #[tokio::test]
    async fn clean_response_continues() {
        let (mw, yielder) = fixture(true, 3);
        let mut req = Request::new("http://a/");
        let mut res = Response::from_request(&req);
        assert!(mw
            .process_response(&mut res, &mut req, &Spider::new("s"))
            .await
            .is_continue());
        assert!(yielder.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn drop_kind_error_is_propagated_not_retried() {
        let (mw, yielder) = fixture(true, 3);
        let mut req = Request::new("http://a/x.jpg");
        let mut res =
            Response::from_request(&req).with_err(ResponseError::Drop("Saving file completed".into()));
        let action = mw
            .process_response(&mut res, &mut req, &Spider::new("s"))
            .await;
        assert!(matches!(action, MiddlewareAction::Drop(msg) if msg == "Saving file completed"));
        assert!(yielder.requests.lock().is_empty());
        assert_eq!(req.meta.get_int(keys::RETRY), None);
    }

    #[tokio::test]
    async fn failure_is_reyielded_until_the_budget_runs_out() {
        let (mw, yielder) = fixture(true, 2);
        let spider = Spider::new("s");
        let mut req = Request::new("http://a/");

        for expected_attempt in 1..=2 {
            let mut res =
                Response::from_request(&req).with_err(ResponseError::Fail("timeout".into()));
            let action = mw.process_response(&mut res, &mut req, &spider).await;
            assert!(matches!(action, MiddlewareAction::Drop(msg) if msg == "timeout"));
            assert_eq!(req.meta.get_int(keys::RETRY), Some(expected_attempt));
            assert_eq!(yielder.requests.lock().len(), expected_attempt as usize);
        }

        // Third failure exceeds retry_times = 2: counted but not re-yielded.
        let mut res = Response::from_request(&req).with_err(ResponseError::Fail("timeout".into()));
        mw.process_response(&mut res, &mut req, &spider).await;
        assert_eq!(req.meta.get_int(keys::RETRY), Some(3));
        assert_eq!(yielder.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn zero_budget_never_retries() {
        let (mw, yielder) = fixture(true, 0);
        let mut req = Request::new("http://a/");
        let mut res = Response::from_request(&req).with_err(ResponseError::Fail("refused".into()));
        mw.process_response(&mut res, &mut req, &Spider::new("s")).await;
        assert!(yielder.requests.lock().is_empty());
        assert_eq!(req.meta.get_int(keys::RETRY), Some(1));
    }

    #[tokio::test]
    async fn disabled_retry_only_counts() {
        let (mw, yielder) = fixture(false, 3);
        let mut req = Request::new("http://a/");
        let mut res = Response::from_request(&req).with_err(ResponseError::Fail("refused".into()));
        mw.process_response(&mut res, &mut req, &Spider::new("s")).await;
        assert!(yielder.requests.lock().is_empty());
        assert_eq!(req.meta.get_int(keys::RETRY), Some(1));
    }
}
