//! Getting a picked file onto the surface: read the bytes, then decode them.
//!
//! Both stages run on the tokio runtime. Each finished upload is posted to a
//! channel as an [`UploadCompletion`]; the UI thread drains that channel and
//! applies the result, so the surface itself is never touched off-thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::error::{DecodingError, ImageFormatHint};
use image::{ImageError, ImageFormat, RgbaImage};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::error::UploadError;

pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// A file the user picked, with the media type the picker would report.
#[derive(Clone, Debug)]
pub struct SelectedFile {
    path: PathBuf,
    name: String,
    media_type: String,
}

impl SelectedFile {
    /// Media type is guessed from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = ImageFormat::from_path(&path)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MEDIA_TYPE)
            .to_owned();
        Self::with_media_type(path, media_type)
    }

    pub fn with_media_type(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            media_type: media_type.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Extensions the decoder understands and that carry an `image/` media
/// type, for the file picker filter.
pub fn image_extensions() -> Vec<&'static str> {
    ImageFormat::all()
        .filter(|format| format.reading_enabled())
        .filter(|format| format.to_mime_type().starts_with("image/"))
        .flat_map(|format| format.extensions_str().iter().copied())
        .collect()
}

#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub pixels: RgbaImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

pub async fn read_file(file: &SelectedFile) -> Result<Vec<u8>, UploadError> {
    tokio::fs::read(file.path())
        .await
        .map_err(|source| UploadError::Read {
            name: file.name().to_owned(),
            source,
        })
}

pub fn decode_image(name: &str, bytes: &[u8]) -> Result<DecodedImage, UploadError> {
    let image = image::load_from_memory(bytes).map_err(|source| UploadError::Decode {
        name: name.to_owned(),
        source,
    })?;
    Ok(DecodedImage {
        pixels: image.to_rgba8(),
    })
}

/// Read then decode, one stage after the other.
async fn load(file: SelectedFile) -> Result<DecodedImage, UploadError> {
    let bytes = read_file(&file).await?;
    debug!(file = file.name(), len = bytes.len(), "file read");
    let name = file.name().to_owned();
    tokio::task::spawn_blocking(move || decode_image(&name, &bytes))
        .await
        .map_err(|err| UploadError::Decode {
            name: file.name().to_owned(),
            source: ImageError::Decoding(DecodingError::new(ImageFormatHint::Unknown, err)),
        })?
}

/// Orders uploads; a later ticket supersedes an earlier one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadTicket(u64);

#[derive(Debug)]
pub struct UploadCompletion {
    pub ticket: UploadTicket,
    pub file_name: String,
    pub outcome: Result<DecodedImage, UploadError>,
}

type Notify = Arc<dyn Fn() + Send + Sync>;

pub struct UploadPipeline {
    runtime: Handle,
    sender: UnboundedSender<UploadCompletion>,
    receiver: UnboundedReceiver<UploadCompletion>,
    next_ticket: u64,
    notify: Option<Notify>,
}

impl UploadPipeline {
    pub fn new(runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            runtime,
            sender,
            receiver,
            next_ticket: 0,
            notify: None,
        }
    }

    /// Called from the runtime after each completion is posted.
    pub fn on_complete(mut self, notify: impl Fn() + Send + Sync + 'static) -> Self {
        self.notify = Some(Arc::new(notify));
        self
    }

    pub fn start(&mut self, file: SelectedFile) -> UploadTicket {
        let ticket = UploadTicket(self.next_ticket);
        self.next_ticket += 1;
        info!(file = file.name(), ?ticket, "upload started");

        let sender = self.sender.clone();
        let notify = self.notify.clone();
        self.runtime.spawn(async move {
            let file_name = file.name().to_owned();
            let outcome = load(file).await;
            // the receiver only goes away with the controller
            let _ = sender.send(UploadCompletion {
                ticket,
                file_name,
                outcome,
            });
            if let Some(notify) = notify {
                notify();
            }
        });
        ticket
    }

    pub fn try_next(&mut self) -> Option<UploadCompletion> {
        self.receiver.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<UploadCompletion> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        RgbaImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(SelectedFile::from_path("a/photo.PNG").media_type(), "image/png");
        assert_eq!(SelectedFile::from_path("photo.jpg").media_type(), "image/jpeg");
        let notes = SelectedFile::from_path("/tmp/notes.txt");
        assert_eq!(notes.media_type(), FALLBACK_MEDIA_TYPE);
        assert_eq!(notes.name(), "notes.txt");
        assert!(!notes.is_image());
    }

    #[test]
    fn extensions_cover_common_formats() {
        let exts = image_extensions();
        assert!(exts.contains(&"png"));
        assert!(exts.contains(&"jpg"));
    }

    #[test]
    fn picker_extensions_pass_type_check() {
        for ext in image_extensions() {
            let file = SelectedFile::from_path(format!("picked.{ext}"));
            assert!(file.is_image(), "{ext} maps to {}", file.media_type());
        }
    }

    #[test]
    fn decode_reports_natural_size() {
        let decoded = decode_image("tiny.png", &png_bytes(7, 3)).expect("decodes");
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
    }

    #[test]
    fn decode_garbage_fails() {
        let err = decode_image("broken.png", b"definitely not a png").unwrap_err();
        assert!(matches!(err, UploadError::Decode { ref name, .. } if name == "broken.png"));
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let file = SelectedFile::from_path("/nonexistent/dir/missing.png");
        let err = read_file(&file).await.unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }

    #[tokio::test]
    async fn pipeline_reads_then_decodes() {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(&png_bytes(12, 9)).unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let mut pipeline = UploadPipeline::new(Handle::current()).on_complete(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let first = pipeline.start(SelectedFile::from_path(tmp.path()));
        let second = pipeline.start(SelectedFile::from_path("/nonexistent/other.png"));
        assert!(first < second);

        let mut seen = Vec::new();
        for _ in 0..2 {
            seen.push(pipeline.next().await.expect("completion"));
        }
        seen.sort_by_key(|c| c.ticket);
        let decoded = seen[0].outcome.as_ref().expect("first decodes");
        assert_eq!((decoded.width(), decoded.height()), (12, 9));
        assert!(matches!(seen[1].outcome, Err(UploadError::Read { .. })));
        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert!(pipeline.try_next().is_none());
    }
}
