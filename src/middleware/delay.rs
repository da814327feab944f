//! Pauses before each download so the target site gets breathing room.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use super::{DownloadMiddleware, MiddlewareAction, OpenClose};
use crate::request::Request;
use crate::spider::Spider;

pub struct DelayMiddleware {
    delay_secs: f64,
    randomize: bool,
}

impl DelayMiddleware {
    /// `delay_secs` is the base pause; with `randomize` each pause is
    /// multiplied by a uniform factor in `[0.5, 1.5)`.
    pub fn new(delay_secs: f64, randomize: bool) -> Self {
        DelayMiddleware {
            delay_secs,
            randomize,
        }
    }
}

#[async_trait]
impl OpenClose for DelayMiddleware {}

#[async_trait]
impl DownloadMiddleware for DelayMiddleware {
    fn name(&self) -> &'static str {
        "delay"
    }

    async fn process_request(&self, req: &mut Request, spider: &Spider) -> MiddlewareAction {
        let mut delay = self.delay_secs;
        if self.randomize {
            delay *= rand::thread_rng().gen::<f64>() + 0.5;
        }
        if delay > 0.0 {
            debug!(spider = %spider.name, "Delay request {} for {:.3}s", req.url, delay);
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
        MiddlewareAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_delay_continues_immediately() {
        let mw = DelayMiddleware::new(0.0, true);
        let mut req = Request::new("http://a/");
        let started = std::time::Instant::now();
        assert!(mw
            .process_request(&mut req, &Spider::new("s"))
            .await
            .is_continue());
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
