//! Sub-process bridge to a headless browser.
//!
//! AJAX-heavy pages are delegated to a helper script running inside a
//! headless WebKit: the script loads the page, waits for scripts to settle
//! and prints a JSON object `{"err": "...", "body": "..."}` on stdout.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::CrawlError;

/// Fetches a fully rendered page body for a URL.
#[async_trait]
pub trait BrowserBridge: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, CrawlError>;
}

/// Default bridge: spawns `phantomjs download.js <url>` per request.
///
/// Both the binary and the script must be reachable from the working
/// directory (or given as absolute paths).
pub struct PhantomBridge {
    command: String,
    script: PathBuf,
}

impl PhantomBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(command: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        PhantomBridge {
            command: command.into(),
            script: script.into(),
        }
    }
}

impl Default for PhantomBridge {
    fn default() -> Self {
        PhantomBridge {
            command: "phantomjs".to_owned(),
            script: PathBuf::from("download.js"),
        }
    }
}

#[derive(Deserialize)]
struct BridgeReply {
    #[serde(default, alias = "Err")]
    err: String,
    #[serde(default, alias = "Body")]
    body: String,
}

#[async_trait]
impl BrowserBridge for PhantomBridge {
    async fn fetch(&self, url: &str) -> Result<Bytes, CrawlError> {
        let output = Command::new(&self.command)
            .arg(&self.script)
            .arg(url)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CrawlError::Bridge(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        let reply: BridgeReply = serde_json::from_slice(&output.stdout)
            .map_err(|err| CrawlError::Bridge(format!("bad reply: {err}")))?;
        if !reply.err.is_empty() {
            return Err(CrawlError::Bridge(reply.err));
        }
        Ok(Bytes::from(reply.body))
    }
}
