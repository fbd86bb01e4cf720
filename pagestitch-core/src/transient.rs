//! Transient output files and chunked read-back
//!
//! A generated document lives on disk only while it is being streamed out.
//! [`TransientFile`] owns the path and deletes it when dropped;
//! [`ChunkedDocument`] reads it back in fixed-size chunks and carries the
//! guard along, so the file disappears whenever the reader goes away:
//! after the last chunk, after a read error, or when the consumer stops
//! polling (client disconnect).

use bytes::Bytes;
use futures::stream::{self, Stream};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

const FILE_PREFIX: &str = "pagestitch-";
const FILE_SUFFIX: &str = ".pdf";

/// Remove `path`, treating "already gone" as success
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// A uniquely named file that is deleted when the guard is dropped
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    /// Write `contents` to a fresh randomly named file inside `dir`
    pub fn write_new(dir: &Path, contents: &[u8]) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut named = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)?;
        named.write_all(contents)?;
        named.flush()?;
        // From here on the guard, not tempfile, owns deletion.
        let (_, path) = named.keep().map_err(|e| e.error)?;
        Ok(Self { path })
    }

    /// [`TransientFile::write_new`] on the blocking pool
    pub async fn write_in_background(dir: PathBuf, contents: Vec<u8>) -> io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::write_new(&dir, &contents))
            .await
            .map_err(io::Error::other)?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. Safe to call any number of times.
    pub fn remove(&self) -> io::Result<()> {
        if remove_if_exists(&self.path)? {
            info!("Cleaned up file: {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Single-pass chunked reader over a [`TransientFile`]
#[derive(Debug)]
pub struct ChunkedDocument {
    handle: tokio::fs::File,
    file: TransientFile,
    chunk_size: usize,
}

impl ChunkedDocument {
    pub async fn open(file: TransientFile, chunk_size: usize) -> io::Result<Self> {
        let handle = tokio::fs::File::open(file.path()).await?;
        Ok(Self {
            handle,
            file,
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the next chunk; every chunk but the last is exactly
    /// `chunk_size` bytes. `None` means end of file.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.handle.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(Bytes::from(buf)))
    }

    /// Turn the reader into a lazy stream of chunks. The transient file is
    /// deleted as soon as the stream ends, fails or is dropped.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::try_unfold(self, |mut reader| async move {
            match reader.next_chunk().await? {
                Some(chunk) => Ok(Some((chunk, reader))),
                None => {
                    reader.close();
                    Ok(None)
                }
            }
        })
    }

    /// Close the handle, then delete the file
    pub fn close(self) {
        let ChunkedDocument { handle, file, .. } = self;
        drop(handle);
        drop(file);
    }
}
