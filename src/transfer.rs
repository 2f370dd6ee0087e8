// src/transfer.rs

//! Chunked image upload
//!
//! Images are POSTed to the appliance's software-image upload endpoint one
//! chunk per request, each request labelled with a
//! `Content-Range: <start>-<end>/<total>` header (end inclusive). Requests go
//! out strictly in order and nothing is kept for resumption: a failed upload
//! must be restarted from the beginning.
//!
//! Responses to individual chunks are not treated as failures. The uploaded
//! file is checked as a whole afterwards by comparing checksums.

use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::session::{Credentials, build_client};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default upload chunk size (512 KiB)
pub const UPLOAD_CHUNK_SIZE: usize = 512 * 1024;

/// Endpoint path images are posted to
pub const UPLOAD_PATH: &str = "/mgmt/cm/autodeploy/software-image-uploads";

/// One span of the file being uploaded
#[derive(Debug)]
pub struct Chunk<'a> {
    pub start: u64,
    /// Inclusive end offset
    pub end: u64,
    pub total: u64,
    pub data: &'a [u8],
}

impl Chunk<'_> {
    /// Value of the `Content-Range` header for this chunk
    pub fn content_range(&self) -> String {
        format!("{}-{}/{}", self.start, self.end, self.total)
    }
}

/// Destination for uploaded chunks
pub trait ChunkSink {
    fn send_chunk(&mut self, filename: &str, chunk: &Chunk<'_>) -> Result<()>;
}

/// Sink posting chunks to the appliance over HTTPS
pub struct HttpChunkSink {
    client: Client,
    credentials: Credentials,
}

impl HttpChunkSink {
    pub fn new(credentials: Credentials, request_timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(request_timeout)?,
            credentials,
        })
    }

    /// Upload URL for `filename` on `host`
    ///
    /// The file name is percent-encoded as a single path segment.
    pub fn upload_url(host: &str, filename: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("https://{host}{UPLOAD_PATH}"))
            .map_err(|e| Error::HttpError(format!("Invalid upload URL for {host}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::HttpError(format!("Host {host} cannot take an upload path")))?
            .push(filename);
        Ok(url)
    }
}

impl ChunkSink for HttpChunkSink {
    fn send_chunk(&mut self, filename: &str, chunk: &Chunk<'_>) -> Result<()> {
        let url = Self::upload_url(&self.credentials.host, filename)?;
        let range = chunk.content_range();
        debug!("POST {} Content-Range: {}", url, range);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_RANGE, range.as_str())
            .body(chunk.data.to_vec())
            .send()
            .map_err(|e| Error::HttpError(format!("Failed to upload chunk {range}: {e}")))?;

        if !response.status().is_success() {
            warn!("Chunk {} of {} answered HTTP {}", range, filename, response.status());
        }
        Ok(())
    }
}

/// State of one upload in progress
pub struct UploadSession<R> {
    reader: R,
    filename: String,
    total: u64,
    chunk_size: usize,
    offset: u64,
}

impl<R: Read> UploadSession<R> {
    pub fn new(reader: R, filename: impl Into<String>, total: u64, chunk_size: usize) -> Self {
        Self {
            reader,
            filename: filename.into(),
            total,
            chunk_size,
            offset: 0,
        }
    }

    /// Send every chunk in order, returning the number of requests made
    pub fn run<K: ChunkSink>(
        mut self,
        sink: &mut K,
        progress: &dyn ProgressTracker,
    ) -> Result<usize> {
        let mut buffer = vec![0u8; self.chunk_size];
        let mut requests = 0;

        progress.set_length(self.total);

        loop {
            let n = read_full(&mut self.reader, &mut buffer).map_err(|e| {
                Error::IoError(format!("Failed to read {}: {e}", self.filename))
            })?;
            if n == 0 {
                break;
            }

            let start = self.offset;
            let end = start + n as u64 - 1;
            let chunk = Chunk {
                start,
                end,
                total: self.total,
                data: &buffer[..n],
            };

            if let Err(e) = sink.send_chunk(&self.filename, &chunk) {
                progress.finish_with_error(&e.to_string());
                return Err(e);
            }

            self.offset += n as u64;
            requests += 1;
            progress.increment(n as u64);
        }

        progress.finish_with_message(&format!("{} uploaded", self.filename));
        Ok(requests)
    }
}

/// Fill `buf` as far as the reader allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// File name an image will have in the appliance's image store
pub fn image_filename(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::ParseError(format!("No file name in {}", path.display())))
}

/// Upload a local image file, returning its name in the image store
pub fn upload_image<K: ChunkSink>(
    sink: &mut K,
    path: &Path,
    chunk_size: usize,
    progress: &dyn ProgressTracker,
) -> Result<String> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let filename = image_filename(path)?;
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {e}", path.display())))?;
    let total = file.metadata()?.len();

    info!("Uploading {} ({} bytes) as {}", path.display(), total, filename);
    let requests = UploadSession::new(file, filename.clone(), total, chunk_size).run(sink, progress)?;
    info!("Uploaded {} in {} chunks", filename, requests);

    Ok(filename)
}
