//! Output file storage
//!
//! Writes decoded renders as `render-<kind>-<timestamp>.<ext>` under the
//! output directory. Files are created with `create_new`, so an existing
//! render is never overwritten: a name collision retries with a numeric
//! suffix.

use super::error::UploadError;
use super::kind::{ImageFormat, RenderKind};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Upper bound on `-N` suffixes tried for one timestamp
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Build the file name for a render captured at `timestamp`
///
/// `attempt` 0 yields the plain name; later attempts append `-<attempt>`
/// before the extension.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use render_sink::upload::{render_file_name, ImageFormat, RenderKind};
///
/// let ts = Utc.timestamp_opt(1_697_712_345, 123_456_000).unwrap();
/// assert_eq!(
///     render_file_name(RenderKind::Image, ImageFormat::Jpeg, ts, 0),
///     "render-image-1697712345.123456.jpg"
/// );
/// ```
pub fn render_file_name(
    kind: RenderKind,
    format: ImageFormat,
    timestamp: DateTime<Utc>,
    attempt: u32,
) -> String {
    let stamp = format!(
        "{}.{:06}",
        timestamp.timestamp(),
        timestamp.timestamp_subsec_micros()
    );
    if attempt == 0 {
        format!("render-{kind}-{stamp}{}", format.extension())
    } else {
        format!("render-{kind}-{stamp}-{attempt}{}", format.extension())
    }
}

/// Write-once store rooted at the output directory
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Persist `data` named after the current time and return the path written
    pub async fn save(
        &self,
        kind: RenderKind,
        format: ImageFormat,
        data: &[u8],
    ) -> Result<PathBuf, UploadError> {
        self.save_at(kind, format, data, Utc::now()).await
    }

    /// Persist `data` named after `timestamp`
    ///
    /// A missing output directory is created once (single level) and the
    /// write retried. A taken name moves on to the next `-N` suffix until
    /// `MAX_COLLISION_SUFFIX` is exhausted.
    pub async fn save_at(
        &self,
        kind: RenderKind,
        format: ImageFormat,
        data: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<PathBuf, UploadError> {
        let mut created_dir = false;
        let mut attempt = 0;

        loop {
            let path = self
                .dir
                .join(render_file_name(kind, format, timestamp, attempt));

            match write_new_file(&path, data).await {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound && !created_dir => {
                    self.create_dir().await?;
                    created_dir = true;
                }
                Err(e)
                    if e.kind() == io::ErrorKind::AlreadyExists
                        && attempt < MAX_COLLISION_SUFFIX =>
                {
                    attempt += 1;
                }
                Err(source) => return Err(UploadError::Write { path, source }),
            }
        }
    }

    /// Create the output directory; losing a creation race is fine
    async fn create_dir(&self) -> Result<(), UploadError> {
        match fs::create_dir(&self.dir).await {
            Ok(()) => {
                crate::logger::log_info(&format!(
                    "Created output directory '{}'",
                    self.dir.display()
                ));
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(UploadError::CreateDir {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}

async fn write_new_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = async {
        file.write_all(data).await?;
        file.flush().await
    }
    .await;

    if written.is_err() {
        // Do not leave a truncated render behind
        let _ = fs::remove_file(path).await;
    }
    written
}
