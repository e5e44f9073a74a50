//! Downloadable WAV resource handle
//!
//! The most recent encoded WAV lives in one temporary file. [`ResourceSlot`]
//! owns it: installing new audio releases (deletes) the previous file before
//! the replacement is written, and dropping the slot releases whatever is
//! left. At most one file is live per slot.

use crate::error::Result;
use sonora_common::config::WAV_MIME_TYPE;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// One encoded WAV held in a temporary file
#[derive(Debug)]
pub struct WavResource {
    file: NamedTempFile,
    url: String,
    size_bytes: usize,
}

impl WavResource {
    fn create(bytes: &[u8], dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sonora-").suffix(".wav");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        let url = format!("file://{}", file.path().display());
        Ok(Self {
            file,
            url,
            size_bytes: bytes.len(),
        })
    }

    /// Locator handed to the UI
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn mime_type(&self) -> &'static str {
        WAV_MIME_TYPE
    }

    /// Read the whole WAV back
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.file.path())?)
    }

    /// Copy the WAV to `dest`, returning the bytes written
    pub fn save_to(&self, dest: &Path) -> Result<u64> {
        Ok(fs::copy(self.file.path(), dest)?)
    }

    fn release(self) -> String {
        let Self { file, url, .. } = self;
        let path = file.path().to_path_buf();
        if let Err(e) = file.close() {
            warn!(path = %path.display(), "Failed to remove WAV resource: {}", e);
        }
        url
    }
}

/// Owner of the single live WAV resource
#[derive(Debug, Default)]
pub struct ResourceSlot {
    dir: Option<PathBuf>,
    current: Option<WavResource>,
    live: usize,
}

impl ResourceSlot {
    /// Slot creating files in `dir` (system temp dir when `None`)
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            current: None,
            live: 0,
        }
    }

    /// Replace the live resource with `bytes`.
    ///
    /// The previous file is removed before the new one is created; if
    /// creation fails the slot is left empty.
    pub fn install(&mut self, bytes: &[u8]) -> Result<&WavResource> {
        self.release();

        let resource = WavResource::create(bytes, self.dir.as_deref())?;
        debug!(url = %resource.url(), size_bytes = resource.size_bytes(), "WAV resource created");
        self.live += 1;
        Ok(&*self.current.insert(resource))
    }

    /// Remove the live resource, returning its URL. No-op when empty.
    pub fn release(&mut self) -> Option<String> {
        let resource = self.current.take()?;
        self.live -= 1;
        let url = resource.release();
        debug!(url = %url, "WAV resource released");
        Some(url)
    }

    pub fn current(&self) -> Option<&WavResource> {
        self.current.as_ref()
    }

    /// Number of files this slot currently keeps on disk (0 or 1)
    pub fn live_count(&self) -> usize {
        self.live
    }
}

impl Drop for ResourceSlot {
    fn drop(&mut self) {
        self.release();
    }
}
