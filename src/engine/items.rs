//! Item traversal through the pipeline chain.

use std::sync::Arc;

use log::debug;

use super::core::EngineCore;
use crate::item::Item;
use crate::middleware::MiddlewareAction;

impl EngineCore {
    /// Runs an emitted item through the pipelines in its own unit of work.
    ///
    /// Pipeline tasks are counted by the in-flight counter like request
    /// tasks, so drain waits for them, but they are not gated by the
    /// request semaphore.
    pub(crate) async fn yield_item(self: &Arc<Self>, item: Item) {
        let Some(spider) = self.current_spider() else {
            return;
        };

        self.status.add_item();
        self.counter.add();

        let core = Arc::clone(self);
        tokio::spawn(async move {
            let mut item = item;
            for pipeline in &core.pipelines {
                match pipeline.process(&mut item, &spider).await {
                    MiddlewareAction::Continue => {}
                    MiddlewareAction::Drop(msg) => {
                        debug!("Drop item {}, {}", item, msg);
                        break;
                    }
                    MiddlewareAction::Fail(err) => {
                        pipeline.handle_err(&err, &spider).await;
                        break;
                    }
                }
            }
            core.counter.done();
        });
    }
}
