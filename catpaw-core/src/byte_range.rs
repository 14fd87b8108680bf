//! Byte range responses.
//!
//! A `Range: bytes=0-99, 200-` request is answered with `206 Partial
//! Content`. One range streams the bytes directly with a `Content-Range`
//! header; several ranges stream a `multipart/byteranges` body whose parts
//! are separated by a random boundary. Ranges that start past the end of the
//! content are answered with `416 Range Not Satisfiable`.
//!
//! The source of the bytes is abstracted by [`ByteRangeWriter`];
//! [`FileRangeWriter`] reads them from a file.

use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::logging::{debug, warn};
use crate::mime::find_content_type;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Largest chunk read from the source at once.
pub const CHUNK_SIZE: u64 = 64 * 1024;

/// Source of ranged content.
#[async_trait]
pub trait ByteRangeWriter: Send + 'static {
    /// Raw value of the `Range` header.
    fn range_query(&self) -> &str;

    async fn content_type(&self) -> Result<String>;

    async fn content_length(&self) -> Result<u64>;

    /// Prepare the source for reading.
    async fn start(&mut self) -> Result<()>;

    /// Read `length` bytes starting at `start`.
    async fn send(&mut self, start: u64, length: u64) -> Result<Bytes>;

    async fn close(&mut self) -> Result<()>;
}

/// Reads ranges from a file on disk.
#[derive(Debug)]
pub struct FileRangeWriter {
    path: PathBuf,
    range_query: String,
    file: Option<File>,
}

impl FileRangeWriter {
    pub fn new(path: impl Into<PathBuf>, range_query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            range_query: range_query.into(),
            file: None,
        }
    }
}

#[async_trait]
impl ByteRangeWriter for FileRangeWriter {
    fn range_query(&self) -> &str {
        &self.range_query
    }

    async fn content_type(&self) -> Result<String> {
        Ok(find_content_type(&self.path.to_string_lossy()).to_string())
    }

    async fn content_length(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    async fn start(&mut self) -> Result<()> {
        self.file = Some(File::open(&self.path).await?);
        Ok(())
    }

    async fn send(&mut self, start: u64, length: u64) -> Result<Bytes> {
        let file = self.file.as_mut().ok_or_else(|| {
            Error::Internal("Trying to send payload but the file is not opened.".into())
        })?;
        file.seek(SeekFrom::Start(start)).await?;
        let mut buffer = Vec::with_capacity(length as usize);
        file.take(length).read_to_end(&mut buffer).await?;
        Ok(Bytes::from(buffer))
    }

    async fn close(&mut self) -> Result<()> {
        match self.file.take() {
            Some(_) => Ok(()),
            None => Err(Error::Internal(
                "Trying to close the stream but the file is not opened.".into(),
            )),
        }
    }
}

/// Requested range; an `end` of `-1` is open.
pub type ByteRange = (i64, i64);

/// Parses `Range` headers and builds partial responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteRangeService;

impl ByteRangeService {
    /// Parse `bytes=a-b, c-d`; a missing end is `-1` and a missing start `0`.
    pub fn parse(range_query: &str) -> Result<Vec<ByteRange>> {
        let query = range_query.trim();
        let query = query.strip_prefix("bytes=").unwrap_or(query);

        let ranges: Vec<&str> = query.split(',').map(str::trim).collect();
        if ranges.first().is_none_or(|first| first.is_empty()) {
            return Err(Error::InvalidRange(
                "Byte range query does not include any ranges.".into(),
            ));
        }

        ranges
            .into_iter()
            .map(|range| {
                let (start, end) = range.split_once('-').ok_or_else(|| {
                    Error::InvalidRange(format!("Invalid byte range `{range}`."))
                })?;
                let start = match start.trim() {
                    "" => 0,
                    start => start
                        .parse()
                        .map_err(|_| Error::InvalidRange(format!("Invalid byte range `{range}`.")))?,
                };
                let end = match end.trim() {
                    "" => -1,
                    end => end
                        .parse()
                        .map_err(|_| Error::InvalidRange(format!("Invalid byte range `{range}`.")))?,
                };
                Ok((start, end))
            })
            .collect()
    }

    /// Close an open range the way browsers expect.
    ///
    /// Starting at 0 reads the whole content; starting exactly at the
    /// content length yields `(len, len)`; any other start reads to the end.
    pub fn fix_client_ambiguity(start: i64, end: i64, content_length: i64) -> ByteRange {
        if end != -1 {
            return (start, end);
        }
        if start == 0 {
            (start, content_length - 1)
        } else if start == content_length {
            (start, content_length)
        } else {
            (start, content_length - 1)
        }
    }

    /// Satisfiable form of a range, `None` when it cannot be served.
    fn satisfiable(range: ByteRange, content_length: i64) -> Option<(u64, u64)> {
        let (start, end) = Self::fix_client_ambiguity(range.0, range.1, content_length);
        if start < 0 || start >= content_length || end < start {
            return None;
        }
        let end = end.min(content_length - 1);
        Some((start as u64, end as u64))
    }

    /// Partial response for the ranges requested by `writer`.
    pub async fn response<W: ByteRangeWriter>(mut writer: W) -> Result<HttpResponse> {
        let ranges = Self::parse(writer.range_query())?;
        let content_length = writer.content_length().await?;
        let content_type = writer.content_type().await?;
        let total = content_length as i64;

        let mut satisfiable = Vec::with_capacity(ranges.len());
        for range in &ranges {
            match Self::satisfiable(*range, total) {
                Some(range) => satisfiable.push(range),
                None => {
                    debug!(range = ?range, content_length, "Range not satisfiable");
                    return Ok(HttpResponse::new(416)
                        .with_header("Content-Range", format!("bytes */{content_length}")));
                }
            }
        }

        writer.start().await?;
        let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(8);

        let response = if let [(start, end)] = satisfiable[..] {
            HttpResponse::new(206)
                .with_header("Content-Type", content_type.clone())
                .with_header("Content-Length", (end - start + 1).to_string())
                .with_header("Content-Range", format!("bytes {start}-{end}/{content_length}"))
                .with_header("Accept-Ranges", "bytes")
        } else {
            let boundary = uuid::Uuid::new_v4().to_string();
            let response = HttpResponse::new(206)
                .with_header("Content-Type", format!("multipart/byteranges; boundary={boundary}"))
                .with_header("Accept-Ranges", "bytes");
            let parts = satisfiable.clone();
            let content_type = content_type.clone();
            tokio::spawn(async move {
                let result = write_parts(&mut writer, &tx, &parts, &boundary, &content_type, content_length).await;
                finish(&mut writer, &tx, result).await;
            });
            return Ok(response.with_stream(Box::pin(ReceiverStream::new(rx))));
        };

        let (start, end) = satisfiable[0];
        tokio::spawn(async move {
            let result = write_range(&mut writer, &tx, start, end).await;
            finish(&mut writer, &tx, result).await;
        });
        Ok(response.with_stream(Box::pin(ReceiverStream::new(rx))))
    }

    /// Partial response for `path`.
    pub async fn file(path: impl Into<PathBuf>, range_query: impl Into<String>) -> Result<HttpResponse> {
        Self::response(FileRangeWriter::new(path, range_query)).await
    }
}

type Sender = mpsc::Sender<std::io::Result<Bytes>>;

async fn emit(tx: &Sender, chunk: impl Into<Bytes>) -> Result<()> {
    tx.send(Ok(chunk.into()))
        .await
        .map_err(|_| Error::Server("Client disconnected during byte range transfer".into()))
}

async fn write_range<W: ByteRangeWriter>(writer: &mut W, tx: &Sender, start: u64, end: u64) -> Result<()> {
    let mut offset = start;
    while offset <= end {
        let length = (end - offset + 1).min(CHUNK_SIZE);
        let chunk = writer.send(offset, length).await?;
        if chunk.is_empty() {
            break;
        }
        offset += chunk.len() as u64;
        emit(tx, chunk).await?;
    }
    Ok(())
}

async fn write_parts<W: ByteRangeWriter>(
    writer: &mut W,
    tx: &Sender,
    parts: &[(u64, u64)],
    boundary: &str,
    content_type: &str,
    content_length: u64,
) -> Result<()> {
    for &(start, end) in parts {
        emit(
            tx,
            format!(
                "--{boundary}\r\nContent-Type: {content_type}\r\nContent-Range: bytes {start}-{end}/{content_length}\r\n\r\n"
            ),
        )
        .await?;
        write_range(writer, tx, start, end).await?;
        emit(tx, "\r\n").await?;
    }
    emit(tx, format!("--{boundary}--")).await
}

async fn finish<W: ByteRangeWriter>(writer: &mut W, tx: &Sender, result: Result<()>) {
    if let Err(e) = result {
        warn!(error = %e, "Byte range transfer failed");
        let _ = tx.send(Err(std::io::Error::other(e.to_string()))).await;
    }
    if let Err(e) = writer.close().await {
        warn!(error = %e, "Failed to close byte range source");
    }
}
