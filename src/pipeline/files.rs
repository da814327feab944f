//! Turns items carrying `fileurls` into static-file download requests.
//!
//! The pipeline never downloads anything itself. For every URL still
//! missing on the writer's side it yields a regular request tagged with
//! `__type__ = "file"` and the target path, so the download rides through
//! the whole chain (delay, offsite, retry) like any other request. The
//! downloader recognizes the tag, hands the body to the writer and stops
//! propagation with a drop-kind response error.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::ItemPipeline;
use crate::engine::Yield;
use crate::error::CrawlError;
use crate::item::Item;
use crate::meta::keys;
use crate::middleware::{MiddlewareAction, OpenClose};
use crate::request::Request;
use crate::spider::Spider;
use crate::writer::FileWriter;

pub struct FilePipeline {
    save_dir: PathBuf,
    writer: Arc<dyn FileWriter>,
    yielder: Arc<dyn Yield>,
}

impl FilePipeline {
    pub fn new(
        save_dir: impl Into<PathBuf>,
        writer: Arc<dyn FileWriter>,
        yielder: Arc<dyn Yield>,
    ) -> Self {
        FilePipeline {
            save_dir: save_dir.into(),
            writer,
            yielder,
        }
    }
}

#[async_trait]
impl OpenClose for FilePipeline {
    async fn open(&self, _spider: &Spider) -> Result<(), CrawlError> {
        debug!("Init success with file directory: {}", self.save_dir.display());
        Ok(())
    }
}

#[async_trait]
impl ItemPipeline for FilePipeline {
    fn name(&self) -> &'static str {
        "files"
    }

    async fn process(&self, item: &mut Item, _spider: &Spider) -> MiddlewareAction {
        // Items without file URLs pass through untouched.
        let Some(urls) = item.str_seq("fileurls") else {
            return MiddlewareAction::Continue;
        };
        let exts = item.str_seq("exts").unwrap_or_default();

        // An optional per-item sub-directory under the save root.
        let mut dir = self.save_dir.clone();
        if let Some(sub) = item.get_str("filepath") {
            dir.push(sub);
        }

        for (idx, url) in urls.iter().enumerate() {
            let ext = exts.get(idx).cloned().unwrap_or_else(|| {
                url.rfind('.')
                    .map(|dot| url[dot..].to_owned())
                    .unwrap_or_default()
            });
            let filename = format!("{:x}{}", md5::compute(url.as_bytes()), ext);
            let path = dir.join(filename);

            if self.writer.not_exists(&path).await {
                debug!("Scheduling download of {} to {}", url, path.display());
                let req = Request::new(url.clone())
                    .with_meta(keys::TYPE, keys::FILE_TYPE)
                    .with_meta(keys::FILEPATH, path);
                self.yielder.yield_request(req, None).await;
            }
        }

        MiddlewareAction::Continue
    }
}
