//! Where the annotation table comes from
//!
//! A source is identified by a single string: an `http(s)://` URL is
//! downloaded, anything else is read as a local path. Gzip content is
//! detected from its magic bytes, not the file extension.

use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;

use flate2::read::MultiGzDecoder;

use super::AnnotationError;

/// Default annotation table: GENCODE release 46 on GRCh38
pub const DEFAULT_ANNOTATION_SOURCE: &str =
    "https://ftp.ebi.ac.uk/pub/databases/gencode/Gencode_human/release_46/gencode.v46.annotation.gtf.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A fetchable annotation table
#[async_trait::async_trait]
pub trait AnnotationSource: Send + Sync {
    /// Stable identifier (URL, path) used in logs
    fn identifier(&self) -> String;

    /// Fetch the raw table bytes (possibly gzip-compressed)
    async fn fetch(&self) -> Result<Vec<u8>, AnnotationError>;
}

/// Annotation table served over HTTP(S)
pub struct UrlSource {
    url: String,
    client: reqwest::Client,
}

impl UrlSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AnnotationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnnotationError::Fetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl AnnotationSource for UrlSource {
    fn identifier(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>, AnnotationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AnnotationError::Fetch(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnnotationError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AnnotationError::Fetch(format!("{}: {}", self.url, e)))?;
        Ok(bytes.to_vec())
    }
}

/// Annotation table on the local filesystem
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl AnnotationSource for FileSource {
    fn identifier(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>, AnnotationError> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            AnnotationError::Io(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }
}

/// In-memory annotation table
pub struct StaticSource {
    name: String,
    content: Vec<u8>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[async_trait::async_trait]
impl AnnotationSource for StaticSource {
    fn identifier(&self) -> String {
        self.name.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>, AnnotationError> {
        Ok(self.content.clone())
    }
}

/// Pick a source implementation for an identifier
pub fn source_from_identifier(
    identifier: &str,
    fetch_timeout: Duration,
) -> Result<Box<dyn AnnotationSource>, AnnotationError> {
    if identifier.starts_with("http://") || identifier.starts_with("https://") {
        Ok(Box::new(UrlSource::new(identifier, fetch_timeout)?))
    } else {
        Ok(Box::new(FileSource::new(identifier)))
    }
}

/// Whether the bytes start with the gzip magic number
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// Wrap fetched bytes in a line reader, decompressing gzip transparently
pub fn open_reader(bytes: Vec<u8>) -> Box<dyn BufRead + Send> {
    if is_gzip(&bytes) {
        let decoder: Box<dyn Read + Send> = Box::new(MultiGzDecoder::new(Cursor::new(bytes)));
        Box::new(BufReader::new(decoder))
    } else {
        Box::new(Cursor::new(bytes))
    }
}
