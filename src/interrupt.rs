//! The user-interrupt watch.
//!
//! Registered as an open/close listener by the default builder. When the
//! interrupt arrives the crawl is not aborted: the status object flips to
//! interrupted, `yield_request` stops admitting work, in-flight requests
//! and items run to completion and the engine drains normally.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CrawlError;
use crate::middleware::OpenClose;
use crate::spider::Spider;
use crate::status::StatusInfo;

pub struct InterruptWatch {
    status: Arc<StatusInfo>,
    trip: CancellationToken,
    closed: CancellationToken,
}

impl InterruptWatch {
    pub fn new(status: Arc<StatusInfo>) -> Self {
        InterruptWatch {
            status,
            trip: CancellationToken::new(),
            closed: CancellationToken::new(),
        }
    }

    /// A token that trips the watch programmatically, equivalent to the OS
    /// signal.
    pub fn trigger(&self) -> CancellationToken {
        self.trip.clone()
    }
}

#[async_trait]
impl OpenClose for InterruptWatch {
    async fn open(&self, spider: &Spider) -> Result<(), CrawlError> {
        let status = Arc::clone(&self.status);
        let trip = self.trip.clone();
        let closed = self.closed.clone();
        let name = spider.name.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    status.interrupt();
                    info!(spider = %name, "Got user interrupt signal, waiting for the running requests to complete");
                }
                _ = trip.cancelled() => {
                    status.interrupt();
                    info!(spider = %name, "Interrupt requested, waiting for the running requests to complete");
                }
                _ = closed.cancelled() => {}
            }
        });
        Ok(())
    }

    async fn close(&self, _reason: &str, _spider: &Spider) -> Result<(), CrawlError> {
        self.closed.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_flips_status_to_interrupted() {
        let status = StatusInfo::new();
        let watch = InterruptWatch::new(Arc::clone(&status));
        let trigger = watch.trigger();
        let spider = Spider::new("s");

        watch.open(&spider).await.unwrap();
        assert!(!status.is_interrupted());

        trigger.cancel();
        for _ in 0..100 {
            if status.is_interrupted() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(status.is_interrupted());

        watch.close("done", &spider).await.unwrap();
    }
}
