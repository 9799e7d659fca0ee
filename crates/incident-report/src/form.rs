//! The form's state container.
//!
//! [`FormState`] owns the report document and keeps the widgets and the
//! persisted copy in line with it. Every change goes through one path: the
//! in-memory document is replaced, the widgets are re-derived from it, and
//! the serialized document is written to the store under a single key.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diagram::{BodyDiagram, BoundingRect, ImageSize};
use crate::document::{MarkerPosition, ReportDocument};
use crate::error::{Error, Result};
use crate::multiselect::MultiSelectWidget;
use crate::schema::{SchemaValidator, ValidationError};
use crate::storage::StateStore;
use crate::upload::{FileSource, FileUploadWidget, SelectionOutcome, UploadPolicy, UploadedFile};
use crate::visibility;

/// Acknowledgement returned by [`FormState::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Always `true`: submission is acknowledged locally and never blocked.
    pub accepted: bool,
    /// Schema violations found at submit time.
    pub errors: Vec<ValidationError>,
}

/// The form's document, widgets and backing store.
#[derive(Debug)]
pub struct FormState<S: StateStore> {
    store: S,
    key: String,
    image_url: String,
    document: ReportDocument,
    diagram: BodyDiagram,
    uploads: FileUploadWidget,
    validator: SchemaValidator,
}

impl<S: StateStore> FormState<S> {
    /// Create a form over `store` and load any persisted document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. A stored value that is
    /// not a valid document is not an error; the form starts empty.
    pub fn open(store: S, config: &Config) -> Result<Self> {
        let mut form = Self {
            store,
            key: config.storage.key.clone(),
            image_url: config.diagram.image_url.clone(),
            document: ReportDocument::new(),
            diagram: BodyDiagram::new(),
            uploads: FileUploadWidget::new(UploadPolicy::from(&config.upload)),
            validator: SchemaValidator::default(),
        };
        form.load()?;
        Ok(form)
    }

    /// Reload the document from the store.
    ///
    /// Absent or malformed text yields an empty document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(&mut self) -> Result<()> {
        let document = match self.store.get_item(&self.key)? {
            None => {
                debug!("No stored report under '{}'", self.key);
                ReportDocument::new()
            }
            Some(text) => ReportDocument::parse(&text).unwrap_or_else(|e| {
                warn!("Discarding stored report under '{}': {}", self.key, e);
                ReportDocument::new()
            }),
        };
        self.document = document;
        self.diagram.reset();
        self.uploads.clear();
        self.sync_widgets();
        Ok(())
    }

    /// The current document.
    #[must_use]
    pub fn get(&self) -> &ReportDocument {
        &self.document
    }

    /// The body diagram state.
    #[must_use]
    pub fn diagram(&self) -> &BodyDiagram {
        &self.diagram
    }

    /// The upload widget state.
    #[must_use]
    pub fn uploads(&self) -> &FileUploadWidget {
        &self.uploads
    }

    /// The storage key in use.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the backing store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Replace the whole document and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails. The in-memory document is
    /// replaced regardless.
    pub fn replace(&mut self, document: ReportDocument) -> Result<()> {
        self.document = document;
        self.sync_widgets();
        self.persist()
    }

    /// Deep-merge `patch` into the document and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if `patch` is not a JSON object or the store write
    /// fails.
    pub fn set(&mut self, patch: &Value) -> Result<()> {
        let mut next = self.document.clone();
        next.merge(patch)?;
        self.replace(next)
    }

    /// Set one field by dotted path and persist the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the store write fails.
    pub fn set_field(&mut self, path: &str, value: Value) -> Result<()> {
        let mut next = self.document.clone();
        next.set(path, value)?;
        self.replace(next)
    }

    /// Clear the document, the marker and the uploads, and drop the stored
    /// copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored copy cannot be removed.
    pub fn reset(&mut self) -> Result<()> {
        self.document = ReportDocument::new();
        self.diagram.reset();
        self.uploads.clear();
        self.store.remove_item(&self.key)?;
        info!("Report reset");
        Ok(())
    }

    /// Place the diagram marker from a click inside `rect`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot hold the marker or the store
    /// write fails.
    pub fn click_diagram(
        &mut self,
        client_x: f64,
        client_y: f64,
        rect: BoundingRect,
    ) -> Result<MarkerPosition> {
        let position = BodyDiagram::locate(client_x, client_y, rect);
        let mut next = self.document.clone();
        next.set_marker(position, &self.image_url)?;
        // The overlay keeps the click-time box, not the last loaded size.
        self.diagram.place(position, rect);
        self.document = next;
        self.persist()?;
        Ok(position)
    }

    /// Record that the diagram image rendered at `width` x `height`.
    pub fn image_loaded(&mut self, width: f64, height: f64) {
        self.diagram
            .image_loaded(ImageSize { width, height }, self.document.marker_position());
    }

    /// Add a batch of picked files to the uploads.
    ///
    /// Rejected or unreadable batches leave the document untouched; the
    /// reason is on [`FileUploadWidget::error`].
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot hold the uploads, in which
    /// case the list is left as it was, or if the store write fails.
    pub async fn upload(&mut self, batch: &[Box<dyn FileSource>]) -> Result<SelectionOutcome> {
        let before = self.uploads.clone();
        let outcome = self.uploads.select(batch).await;
        if let SelectionOutcome::Added(_) = outcome {
            self.commit_uploads(before)?;
        }
        Ok(outcome)
    }

    /// Remove the uploaded image at `index`; out of range is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot hold the uploads or the store
    /// write fails.
    pub fn remove_upload(&mut self, index: usize) -> Result<Option<UploadedFile>> {
        let before = self.uploads.clone();
        let Some(removed) = self.uploads.remove(index) else {
            return Ok(None);
        };
        self.commit_uploads(before)?;
        Ok(Some(removed))
    }

    /// The multi-select widget for the field at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a field with enumerated options.
    pub fn multi_select(&self, path: &str) -> Result<MultiSelectWidget> {
        self.validator
            .schema()
            .field_at(path)
            .and_then(MultiSelectWidget::for_field)
            .ok_or_else(|| Error::field_path(path, "not a field with options"))
    }

    /// Replace the selection of the multi-select field at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` has no options or the store write fails.
    pub fn select_options<V: AsRef<str>>(&mut self, path: &str, selection: &[V]) -> Result<()> {
        let value = self.multi_select(path)?.change(selection);
        self.set_field(path, value)
    }

    /// Whether the field at `path` is currently shown.
    #[must_use]
    pub fn is_visible(&self, path: &str) -> bool {
        visibility::is_visible(&self.document, path)
    }

    /// Conditional fields currently hidden.
    #[must_use]
    pub fn hidden_fields(&self) -> Vec<String> {
        visibility::hidden_fields(&self.document)
    }

    /// Conditional fields currently shown.
    #[must_use]
    pub fn visible_conditional_fields(&self) -> Vec<String> {
        visibility::visible_conditional_fields(&self.document)
    }

    /// UI schema for the current document.
    #[must_use]
    pub fn ui_schema(&self) -> Value {
        visibility::ui_schema(&self.document)
    }

    /// Schema violations in the current document.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        self.validator.validate(&self.document)
    }

    /// Acknowledge a submission. Nothing is transmitted.
    #[must_use]
    pub fn submit(&self) -> SubmitReceipt {
        let errors = self.validate();
        for error in &errors {
            warn!("Submitted report: {}", error);
        }
        info!("Report submitted with {} validation error(s)", errors.len());
        SubmitReceipt {
            accepted: true,
            errors,
        }
    }

    /// Mirror the upload list into the document, restoring `before` if the
    /// document cannot take it.
    fn commit_uploads(&mut self, before: FileUploadWidget) -> Result<()> {
        let mut next = self.document.clone();
        if let Err(e) = next.set_image_uploads(&self.uploads.value()) {
            self.uploads = before;
            return Err(e);
        }
        self.replace(next)
    }

    fn sync_widgets(&mut self) {
        self.uploads.sync_value(&self.document.image_uploads());
        self.diagram.document_changed(self.document.marker_position());
    }

    fn persist(&mut self) -> Result<()> {
        let text = self.document.to_json_string()?;
        self.store.set_item(&self.key, &text).map_err(|e| {
            warn!("Failed to persist report under '{}': {}", self.key, e);
            e
        })
    }
}
