//! Drops responses whose status is anything but 200.

use async_trait::async_trait;
use tracing::debug;

use super::{MiddlewareAction, OpenClose, SpiderMiddleware};
use crate::request::Request;
use crate::response::Response;
use crate::spider::Spider;

pub struct HttpErrorMiddleware;

#[async_trait]
impl OpenClose for HttpErrorMiddleware {}

#[async_trait]
impl SpiderMiddleware for HttpErrorMiddleware {
    fn name(&self) -> &'static str {
        "http-error"
    }

    async fn process_response(
        &self,
        res: &mut Response,
        req: &mut Request,
        spider: &Spider,
    ) -> MiddlewareAction {
        debug!(spider = %spider.name, "Status code of {}: {}", req.url, res.status_code);
        if res.status_code != 200 {
            MiddlewareAction::Drop(format!("[HTTP ERROR] {}", res.status_code))
        } else {
            MiddlewareAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ok_passes_everything_else_drops() {
        let mw = HttpErrorMiddleware;
        let spider = Spider::new("s");
        let mut req = Request::new("http://a/");

        let mut ok = Response::from_request(&req).with_status(200);
        assert!(mw
            .process_response(&mut ok, &mut req, &spider)
            .await
            .is_continue());

        for code in [0, 301, 404, 500] {
            let mut res = Response::from_request(&req).with_status(code);
            let action = mw.process_response(&mut res, &mut req, &spider).await;
            assert!(matches!(action, MiddlewareAction::Drop(_)), "code {code}");
        }
    }
}
