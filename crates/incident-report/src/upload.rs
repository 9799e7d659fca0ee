//! Image upload widget.
//!
//! The widget validates a batch of picked files, reads the accepted ones
//! concurrently, and keeps them as base64 data URLs. A batch is all or
//! nothing: a single invalid file discards the whole batch.
//!
//! The document's `incidents.image_upload` array is the source of truth.
//! The widget's list (name plus data URL) is a cache derived from it; names
//! only survive for files picked in the current session.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use futures::future::join_all;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;

/// Bytes read from the head of a file to sniff its type.
const SNIFF_LEN: usize = 8192;

/// MIME type reported when content cannot be identified.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// A user-facing upload failure.
///
/// `Display` yields the message shown under the widget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The file's MIME type is not an accepted image type.
    #[error("Invalid file type: {mime}")]
    InvalidType {
        /// The rejected MIME type.
        mime: String,
    },

    /// The file exceeds the size limit.
    #[error("File \"{name}\" is too large (max {max_mb}MB).")]
    TooLarge {
        /// File name.
        name: String,
        /// Limit in mebibytes, rounded up.
        max_mb: u64,
    },

    /// The file's content could not be read.
    #[error("Failed to read \"{name}\"")]
    ReadFailed {
        /// File name.
        name: String,
    },
}

/// A file picked by the user.
#[async_trait]
pub trait FileSource: Send + Sync + fmt::Debug {
    /// Display name of the file.
    fn name(&self) -> &str;

    /// Declared MIME type; empty when unknown.
    fn mime_type(&self) -> &str;

    /// Size in bytes.
    fn size(&self) -> u64;

    /// Read the whole content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read.
    async fn read(&self) -> std::io::Result<Vec<u8>>;
}

/// A file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFileSource {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl MemoryFileSource {
    /// Create an in-memory file.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// A file on disk, typed by sniffing its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFileSource {
    path: PathBuf,
    name: String,
    mime_type: String,
    size: u64,
}

impl PathFileSource {
    /// Stat the file and sniff its MIME type.
    ///
    /// SVG is text, so it is recognised by its `.svg` extension; anything
    /// unidentifiable is `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn probe(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let size = tokio::fs::metadata(&path).await?.len();

        let mut head = vec![0u8; SNIFF_LEN];
        let mut file = tokio::fs::File::open(&path).await?;
        let read = file.read(&mut head).await?;
        head.truncate(read);

        let mime_type = sniff_mime(&path, &head);
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        debug!("Probed {} as {} ({} bytes)", path.display(), mime_type, size);
        Ok(Self {
            path,
            name,
            mime_type,
            size,
        })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for PathFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

fn sniff_mime(path: &Path, head: &[u8]) -> String {
    // SVG often starts with `<?xml`, which infer reports as text/xml.
    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        return "image/svg+xml".to_string();
    }
    infer::get(head).map_or_else(|| UNKNOWN_MIME.to_string(), |kind| kind.mime_type().to_string())
}

/// Encode bytes as a base64 data URL.
#[must_use]
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.is_empty() {
        UNKNOWN_MIME
    } else {
        mime_type
    };
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

/// An uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name shown in the list.
    pub name: String,
    /// Base64 data URL of the content.
    pub data_url: String,
}

/// What happened to a selected batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Nothing was selected.
    Empty,
    /// At least one file failed validation; the batch was discarded and the
    /// picker should be cleared.
    Rejected(Vec<UploadError>),
    /// A file could not be read; existing entries are unchanged.
    ReadFailed(UploadError),
    /// Every file was added.
    Added(usize),
}

/// Limits applied to each picked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum size in bytes.
    pub max_file_size: u64,
    /// Accepted MIME types.
    pub accepted_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for UploadPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes,
            accepted_types: config.accepted_types.clone(),
        }
    }
}

impl UploadPolicy {
    /// Check a single file: type first, then size.
    ///
    /// # Errors
    ///
    /// Returns the user-facing reason the file is rejected.
    pub fn check(&self, file: &dyn FileSource) -> Result<(), UploadError> {
        if !self.accepted_types.iter().any(|t| t == file.mime_type()) {
            return Err(UploadError::InvalidType {
                mime: file.mime_type().to_string(),
            });
        }
        if file.size() > self.max_file_size {
            return Err(UploadError::TooLarge {
                name: file.name().to_string(),
                max_mb: self.max_file_size.div_ceil(1024 * 1024),
            });
        }
        Ok(())
    }
}

/// The upload widget's state.
#[derive(Debug, Clone, Default)]
pub struct FileUploadWidget {
    policy: UploadPolicy,
    files: Vec<UploadedFile>,
    error: Option<String>,
}

impl FileUploadWidget {
    /// Create an empty widget.
    #[must_use]
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            files: Vec::new(),
            error: None,
        }
    }

    /// The limits in force.
    #[must_use]
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Current entries, in upload order.
    #[must_use]
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// The value mirrored into the document: data URLs only.
    #[must_use]
    pub fn value(&self) -> Vec<String> {
        self.files.iter().map(|f| f.data_url.clone()).collect()
    }

    /// The message shown under the picker, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Status line for the list; hidden while an error is shown.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        if self.files.is_empty() || self.error.is_some() {
            None
        } else {
            Some(format!("{} image(s) uploaded", self.files.len()))
        }
    }

    /// Bring the list in line with the external value.
    ///
    /// An empty value clears the list. Otherwise entries are rebuilt from the
    /// data URLs, keeping the name of any matching existing entry and naming
    /// the rest `image-<n>`.
    pub fn sync_value(&mut self, value: &[String]) {
        if value.is_empty() {
            self.files.clear();
            return;
        }
        if self.value() == value {
            return;
        }

        let mut previous = std::mem::take(&mut self.files);
        self.files = value
            .iter()
            .enumerate()
            .map(|(index, data_url)| {
                let name = previous
                    .iter()
                    .position(|f| &f.data_url == data_url)
                    .map_or_else(
                        || format!("image-{}", index + 1),
                        |pos| previous.remove(pos).name,
                    );
                UploadedFile {
                    name,
                    data_url: data_url.clone(),
                }
            })
            .collect();
    }

    /// Validate, read and append a batch of picked files.
    ///
    /// All reads run concurrently and are joined before the list changes, so
    /// the merge never sees a partial batch.
    pub async fn select(&mut self, batch: &[Box<dyn FileSource>]) -> SelectionOutcome {
        self.error = None;
        if batch.is_empty() {
            return SelectionOutcome::Empty;
        }

        let rejections: Vec<UploadError> = batch
            .iter()
            .filter_map(|file| self.policy.check(file.as_ref()).err())
            .collect();
        if !rejections.is_empty() {
            let message = rejections
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            warn!("Rejected upload batch of {}: {}", batch.len(), message);
            self.error = Some(message);
            return SelectionOutcome::Rejected(rejections);
        }

        let reads = join_all(batch.iter().map(|file| read_entry(file.as_ref()))).await;
        let mut added = Vec::with_capacity(reads.len());
        for read in reads {
            match read {
                Ok(entry) => added.push(entry),
                Err(err) => {
                    warn!("{}", err);
                    self.error = Some(err.to_string());
                    return SelectionOutcome::ReadFailed(err);
                }
            }
        }

        let count = added.len();
        self.files.extend(added);
        info!("Added {} image(s), {} total", count, self.files.len());
        SelectionOutcome::Added(count)
    }

    /// Remove the entry at `index`; out of range is a no-op.
    pub fn remove(&mut self, index: usize) -> Option<UploadedFile> {
        if index >= self.files.len() {
            return None;
        }
        let removed = self.files.remove(index);
        debug!("Removed upload {} ({})", index, removed.name);
        Some(removed)
    }

    /// Drop every entry and any error.
    pub fn clear(&mut self) {
        self.files.clear();
        self.error = None;
    }
}

async fn read_entry(file: &dyn FileSource) -> Result<UploadedFile, UploadError> {
    let bytes = file.read().await.map_err(|e| {
        debug!("Read of {} failed: {}", file.name(), e);
        UploadError::ReadFailed {
            name: file.name().to_string(),
        }
    })?;
    Ok(UploadedFile {
        name: file.name().to_string(),
        data_url: to_data_url(file.mime_type(), &bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    #[derive(Debug)]
    struct UnreadableFile(&'static str);

    #[async_trait]
    impl FileSource for UnreadableFile {
        fn name(&self) -> &str {
            self.0
        }

        fn mime_type(&self) -> &str {
            "image/png"
        }

        fn size(&self) -> u64 {
            4
        }

        async fn read(&self) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            ))
        }
    }

    fn png(name: &str, bytes: &[u8]) -> Box<dyn FileSource> {
        Box::new(MemoryFileSource::new(name, "image/png", bytes.to_vec()))
    }

    fn file(name: &str, mime: &str, size: usize) -> Box<dyn FileSource> {
        Box::new(MemoryFileSource::new(name, mime, vec![0u8; size]))
    }

    #[test]
    fn test_data_url_encoding() {
        assert_eq!(to_data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
        assert_eq!(
            to_data_url("", b""),
            "data:application/octet-stream;base64,"
        );
    }

    #[test]
    fn test_error_messages() {
        let invalid = UploadError::InvalidType {
            mime: "application/pdf".to_string(),
        };
        assert_eq!(invalid.to_string(), "Invalid file type: application/pdf");

        let large = UploadError::TooLarge {
            name: "scan.png".to_string(),
            max_mb: 10,
        };
        assert_eq!(large.to_string(), "File \"scan.png\" is too large (max 10MB).");

        let unread = UploadError::ReadFailed {
            name: "a.png".to_string(),
        };
        assert_eq!(unread.to_string(), "Failed to read \"a.png\"");
    }

    #[test]
    fn test_policy_checks_type_before_size() {
        let policy = UploadPolicy::default();
        let pdf = file("huge.pdf", "application/pdf", 11 * MIB);
        assert!(matches!(
            policy.check(pdf.as_ref()),
            Err(UploadError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_policy_size_limit_is_inclusive() {
        let policy = UploadPolicy::default();
        assert!(policy.check(file("ok.png", "image/png", 10 * MIB).as_ref()).is_ok());
        assert!(matches!(
            policy.check(file("big.png", "image/png", 10 * MIB + 1).as_ref()),
            Err(UploadError::TooLarge { max_mb: 10, .. })
        ));
    }

    #[test]
    fn test_policy_small_limit_reports_whole_megabytes() {
        let policy = UploadPolicy {
            max_file_size: 300 * 1024,
            ..UploadPolicy::default()
        };
        let err = policy
            .check(file("big.png", "image/png", MIB).as_ref())
            .unwrap_err();
        assert_eq!(err.to_string(), "File \"big.png\" is too large (max 1MB).");
    }

    #[test]
    fn test_policy_accepts_every_image_type() {
        let policy = UploadPolicy::default();
        for mime in [
            "image/jpeg",
            "image/png",
            "image/gif",
            "image/webp",
            "image/bmp",
            "image/svg+xml",
        ] {
            assert!(policy.check(file("f", mime, 1).as_ref()).is_ok(), "{mime}");
        }
        assert!(policy.check(file("f", "image/tiff", 1).as_ref()).is_err());
        assert!(policy.check(file("f", "", 1).as_ref()).is_err());
    }

    #[tokio::test]
    async fn test_valid_batch_grows_list_by_batch_size() {
        let mut widget = FileUploadWidget::default();
        let outcome = widget
            .select(&[png("a.png", b"a"), png("b.png", b"b")])
            .await;
        assert_eq!(outcome, SelectionOutcome::Added(2));

        let outcome = widget.select(&[png("c.png", b"c")]).await;
        assert_eq!(outcome, SelectionOutcome::Added(1));

        let names: Vec<_> = widget.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(widget.value().len(), 3);
        assert_eq!(widget.value()[0], "data:image/png;base64,YQ==");
        assert_eq!(widget.summary().as_deref(), Some("3 image(s) uploaded"));
        assert!(widget.error().is_none());
    }

    #[tokio::test]
    async fn test_any_invalid_file_discards_whole_batch() {
        let mut widget = FileUploadWidget::default();
        widget.select(&[png("keep.png", b"k")]).await;

        let outcome = widget
            .select(&[
                png("fine.png", b"f"),
                file("doc.pdf", "application/pdf", 10),
                file("huge.jpg", "image/jpeg", 10 * MIB + 1),
            ])
            .await;

        let SelectionOutcome::Rejected(errors) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(widget.files().len(), 1);
        assert_eq!(
            widget.error(),
            Some("Invalid file type: application/pdf\nFile \"huge.jpg\" is too large (max 10MB).")
        );
        assert!(widget.summary().is_none());
    }

    #[tokio::test]
    async fn test_read_failure_leaves_entries_untouched() {
        let mut widget = FileUploadWidget::default();
        widget.select(&[png("keep.png", b"k")]).await;

        let batch: Vec<Box<dyn FileSource>> =
            vec![png("ok.png", b"o"), Box::new(UnreadableFile("locked.png"))];
        let outcome = widget.select(&batch).await;

        assert!(matches!(outcome, SelectionOutcome::ReadFailed(_)));
        assert_eq!(widget.error(), Some("Failed to read \"locked.png\""));
        assert_eq!(widget.files().len(), 1);
        assert_eq!(widget.files()[0].name, "keep.png");
    }

    #[tokio::test]
    async fn test_new_selection_clears_previous_error() {
        let mut widget = FileUploadWidget::default();
        widget
            .select(&[file("doc.pdf", "application/pdf", 1)])
            .await;
        assert!(widget.error().is_some());

        assert_eq!(widget.select(&[]).await, SelectionOutcome::Empty);
        assert!(widget.error().is_none());
    }

    #[tokio::test]
    async fn test_remove_preserves_order() {
        let mut widget = FileUploadWidget::default();
        widget
            .select(&[png("a.png", b"a"), png("b.png", b"b"), png("c.png", b"c")])
            .await;

        let removed = widget.remove(1).unwrap();
        assert_eq!(removed.name, "b.png");
        let names: Vec<_> = widget.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
        assert_eq!(widget.value().len(), 2);

        assert!(widget.remove(5).is_none());
        assert_eq!(widget.files().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_value_clears_on_external_reset() {
        let mut widget = FileUploadWidget::default();
        widget.select(&[png("a.png", b"a")]).await;

        widget.sync_value(&[]);
        assert!(widget.files().is_empty());
    }

    #[tokio::test]
    async fn test_sync_value_keeps_known_names() {
        let mut widget = FileUploadWidget::default();
        widget.select(&[png("a.png", b"a")]).await;
        let known = widget.value()[0].clone();

        widget.sync_value(&["data:image/gif;base64,R0lG".to_string(), known]);
        let names: Vec<_> = widget.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["image-1", "a.png"]);
    }

    #[tokio::test]
    async fn test_path_file_source_sniffs_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.bin");
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        std::fs::write(&path, png_header).unwrap();

        let source = PathFileSource::probe(&path).await.unwrap();
        assert_eq!(source.mime_type(), "image/png");
        assert_eq!(source.name(), "photo.bin");
        assert_eq!(source.size(), 12);
        assert_eq!(source.read().await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_path_file_source_svg_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("body.svg");
        std::fs::write(&svg, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "plain notes").unwrap();

        let svg = PathFileSource::probe(&svg).await.unwrap();
        assert_eq!(svg.mime_type(), "image/svg+xml");

        let text = PathFileSource::probe(&text).await.unwrap();
        assert_eq!(text.mime_type(), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_path_file_source_missing_file() {
        assert!(PathFileSource::probe("/nonexistent/photo.png").await.is_err());
    }
}
