//! Filesystem-backed file writer.

use std::path::Path;

use async_trait::async_trait;

use super::FileWriter;
use crate::error::ResponseError;
use crate::meta::keys;
use crate::request::Request;

/// Files smaller than this are treated as truncated leftovers and re-fetched.
pub const MIN_FILE_BYTES: u64 = 512;

/// Writes file bodies to the path carried in the request meta, creating
/// parent directories as needed.
#[derive(Debug, Default)]
pub struct FsWriter;

impl FsWriter {
    pub fn new() -> Self {
        FsWriter
    }
}

#[async_trait]
impl FileWriter for FsWriter {
    async fn not_exists(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len() < MIN_FILE_BYTES,
            Err(_) => true,
        }
    }

    async fn write_file(&self, req: &Request, body: &[u8]) -> (String, ResponseError) {
        let Some(path) = req.meta.get_path(keys::FILEPATH) else {
            return (
                format!("File request {} carries no target path", req.url),
                ResponseError::Fail("missing __filepath__ meta".to_owned()),
            );
        };

        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                return (
                    format!("Creating directory for {} failed", path.display()),
                    ResponseError::Fail(err.to_string()),
                );
            }
        }

        match tokio::fs::write(&path, body).await {
            Ok(()) => (
                format!("Saved {} to {}", req.url, path.display()),
                ResponseError::Drop("Saving file completed".to_owned()),
            ),
            Err(err) => (
                format!("Saving {} failed", req.url),
                ResponseError::Fail(err.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file_request(path: PathBuf) -> Request {
        Request::new("http://a/pic.jpg")
            .with_meta(keys::TYPE, keys::FILE_TYPE)
            .with_meta(keys::FILEPATH, path)
    }

    #[tokio::test]
    async fn write_then_not_exists_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sub").join("pic.jpg");
        let writer = FsWriter::new();

        assert!(writer.not_exists(&target).await);

        let body = vec![0u8; MIN_FILE_BYTES as usize];
        let (info, err) = writer.write_file(&file_request(target.clone()), &body).await;
        assert!(err.is_drop(), "successful write must report a drop: {info}");
        assert_eq!(tokio::fs::read(&target).await.unwrap().len(), body.len());

        assert!(!writer.not_exists(&target).await);
    }

    #[tokio::test]
    async fn undersized_files_count_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tiny.jpg");
        tokio::fs::write(&target, b"stub").await.unwrap();

        assert!(FsWriter::new().not_exists(&target).await);
    }

    #[tokio::test]
    async fn missing_target_path_is_a_failure() {
        let req = Request::new("http://a/pic.jpg");
        let (_, err) = FsWriter::new().write_file(&req, b"body").await;
        assert!(!err.is_drop());
    }
}
